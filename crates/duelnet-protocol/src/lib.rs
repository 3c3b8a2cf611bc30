//! Wire protocol for duelnet.
//!
//! This crate defines the bytes that clients and the central server
//! exchange:
//!
//! - **Codec** ([`codec`]): fixed-width little-endian integers, the leaf
//!   every field is built from.
//! - **Framework** ([`Message`], [`serialize`], [`deserialize`],
//!   [`MessageType`]): the `[tag][fixed-size payload]` frame and tag
//!   validation.
//! - **Messages** ([`CreateNewGameRequest`], [`JoinGameResponse`], ...):
//!   the concrete kinds and their payload layouts.
//! - **Errors** ([`DecodeError`] and the per-kind payload errors).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets. Transport moves bytes;
//! this crate turns them into typed values and back.
//!
//! ```text
//! Transport (bytes) → Protocol (typed message) → Rendezvous / Server
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

pub mod codec;
mod error;
mod message;
mod messages;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::{
    CreateNewGameResponseError, DecodeError, UnknownAddressFamily,
    UnknownMessageType, UnknownResultError,
};
pub use message::{Message, MessageType, deserialize, frame_size, serialize};
pub use messages::{
    CreateNewGameError, CreateNewGameRequest, CreateNewGameResponse,
    JoinGameRequest, JoinGameResponse, JoinGameResult, SocketAddress,
};
pub use types::{GameId, GameIdParseError, PlayerId};
