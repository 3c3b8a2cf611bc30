//! Game registry for the duelnet central server.
//!
//! The registry is the server's only shared state: a map from [`GameId`]
//! to the one or two players in that game, bounded in size.
//!
//! # Key types
//!
//! - [`GameRegistry`]: create games, add the second player, expire old ones
//! - [`GameEntry`]: who is in a game and since when
//! - [`RegistryConfig`]: capacity, time-to-live, id seed
//! - [`CreateGameError`] / [`JoinGameError`]: why an operation was refused
//!
//! The registry itself is not synchronised. The server keeps it behind a
//! single mutex, which is what makes id allocation and player counting
//! race-free.
//!
//! [`GameId`]: duelnet_protocol::GameId

mod config;
mod error;
mod registry;

pub use config::RegistryConfig;
pub use error::{CreateGameError, JoinGameError};
pub use registry::{GameEntry, GameRegistry};
