//! Central server configuration.

use std::time::Duration;

use duelnet_registry::RegistryConfig;
use duelnet_transport::Endpoint;
use serde::{Deserialize, Serialize};

/// Settings for [`CentralServer`](crate::CentralServer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the server listens on.
    pub bind: Endpoint,

    /// How long a connection may sit between requests before the server
    /// closes it. Clients connect before their user has decided what to do,
    /// so this covers human think time.
    pub idle_timeout: Duration,

    /// How long a client may take to finish a request once its first byte
    /// has arrived.
    pub request_timeout: Duration,

    /// How long a creator's connection is parked waiting for a joiner
    /// before the game is dropped.
    pub peer_join_timeout: Duration,

    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Endpoint::loopback_v4(60001),
            idle_timeout: Duration::from_secs(600),
            request_timeout: Duration::from_secs(30),
            peer_join_timeout: Duration::from_secs(60),
            registry: RegistryConfig::default(),
        }
    }
}
