//! Registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for a [`GameRegistry`](crate::GameRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum number of games held at once. Creation fails when full.
    pub capacity: usize,

    /// Games older than this are dropped on the next creation.
    pub game_ttl: Duration,

    /// Fixed seed for the id generator. `None` seeds from OS entropy.
    ///
    /// Only tests should set this: a fixed seed makes every id predictable.
    pub seed: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            game_ttl: Duration::from_secs(60 * 60),
            seed: None,
        }
    }
}
