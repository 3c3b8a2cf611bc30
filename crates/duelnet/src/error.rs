//! Unified error type for the Duelnet binaries and central server.

use std::io;
use std::path::PathBuf;

use duelnet_protocol::{DecodeError, MessageType, UnknownMessageType};
use duelnet_rendezvous::RendezvousError;
use duelnet_transport::{SystemError, TransportError};

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each layer's variant auto-generates `From`
/// impls, so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DuelnetError {
    /// Creating or binding a socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A socket syscall failed.
    #[error(transparent)]
    System(#[from] SystemError),

    /// The rendezvous client could not start.
    #[error(transparent)]
    Rendezvous(#[from] RendezvousError),

    /// I/O on an async connection of the central server.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A frame started with a tag no message kind uses.
    #[error(transparent)]
    UnknownMessageType(#[from] UnknownMessageType),

    /// A request frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A client sent a message kind the server does not accept as a request.
    #[error("{0} is not a request")]
    UnexpectedMessage(MessageType),

    /// A client did not finish a request in time.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
