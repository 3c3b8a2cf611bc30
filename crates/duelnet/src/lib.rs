//! # Duelnet
//!
//! Peer-to-peer rendezvous for two-player games.
//!
//! Two players meet through a central matchmaking server: one creates a
//! game and gets a numeric id, the other joins with that id, and the
//! server hands each player the other's address. From then on the players
//! talk over a direct TCP link and the server is out of the picture.
//!
//! This crate ties the layers together:
//!
//! - [`CentralServer`]: the async matchmaking service (`duelnet-server`).
//! - [`Rendezvous`](prelude::Rendezvous): the synchronous client state
//!   machine (`duelnet-client`).
//! - [`cli`]: argument parsing, config files and logging for both binaries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelnet::prelude::*;
//!
//! # async fn serve() -> Result<(), DuelnetError> {
//! let server = CentralServer::builder()
//!     .bind(Endpoint::any_v4(60001))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod cli;
mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::DuelnetError;
pub use server::{CentralServer, CentralServerBuilder};

/// Everything a binary or game needs, in one import.
pub mod prelude {
    pub use crate::{CentralServer, CentralServerBuilder, DuelnetError, ServerConfig};

    pub use duelnet_protocol::{GameId, JoinGameResult, MessageType, PlayerId};
    pub use duelnet_registry::RegistryConfig;
    pub use duelnet_rendezvous::{
        AfterPeer, ClientConfig, ConsoleUser, ErrorState, Intent, Rendezvous, State,
        UserInteraction,
    };
    pub use duelnet_transport::{Endpoint, TcpClient};
}
