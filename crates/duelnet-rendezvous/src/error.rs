//! Error types for the rendezvous layer.
//!
//! Failures *during* a rendezvous are not errors in the `Result` sense: the
//! state machine turns each one into a failure [`State`](crate::State)
//! carrying an [`ErrorState`](crate::ErrorState). What is left here is what
//! can go wrong before the machine runs, and console input that could not
//! be understood.

use duelnet_protocol::GameIdParseError;
use duelnet_transport::TransportError;

/// The client could not be set up.
#[derive(Debug, thiserror::Error)]
pub enum RendezvousError {
    /// Binding the client socket to its own endpoint failed (port in use,
    /// bad address).
    #[error("failed to bind the client socket: {0}")]
    Bind(#[source] TransportError),
}

/// A console line that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("couldn't interpret action \"{0}\"")]
    Unknown(String),

    #[error("couldn't parse game id: {0}")]
    InvalidGameId(#[from] GameIdParseError),
}
