//! Client configuration.

use std::time::Duration;

use duelnet_transport::Endpoint;
use serde::{Deserialize, Serialize};

/// Where the client connects, where it listens, and how long it waits.
///
/// Every network step of the rendezvous has its own budget; nothing in the
/// client waits without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The matchmaking server.
    pub central_server: Endpoint,

    /// Our own bound address. The peer will see (and dial) this port, so
    /// it must be an explicit one.
    pub own_endpoint: Endpoint,

    /// Budget for the TCP handshake with the central server.
    pub connect_timeout: Duration,

    /// Budget for each request/response exchange with the central server.
    pub request_timeout: Duration,

    /// How long a game creator waits for somebody to join.
    pub peer_join_timeout: Duration,

    /// How long the acceptor role waits for the peer to dial in.
    pub peer_accept_timeout: Duration,

    /// How long the connector role keeps dialling the peer.
    pub peer_connect_timeout: Duration,

    /// Pause between dials while the peer is not listening yet.
    pub connect_retry_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            central_server: Endpoint::loopback_v4(60001),
            own_endpoint: Endpoint::loopback_v4(60000),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            peer_join_timeout: Duration::from_secs(60),
            peer_accept_timeout: Duration::from_secs(10),
            peer_connect_timeout: Duration::from_secs(10),
            connect_retry_interval: Duration::from_millis(100),
        }
    }
}
