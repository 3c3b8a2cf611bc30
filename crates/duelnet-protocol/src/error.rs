//! Error types for the protocol layer.
//!
//! Decoding distinguishes three situations, because they mean different
//! things when two builds of the protocol talk to each other:
//!
//! - the tag byte is not a kind this build knows ([`DecodeError::UnknownMessageType`]):
//!   the peer is probably newer;
//! - the tag is known but not the one the caller was waiting for
//!   ([`DecodeError::WrongMessageType`]): the conversation is out of step;
//! - the tag matches but the payload contains a value this build does not
//!   recognise ([`DecodeError::Payload`]), e.g. a result code added later.
//!
//! In every case the raw, unrecognised value is kept so it can be logged.

use std::convert::Infallible;

use crate::MessageType;

/// The tag byte does not name any [`MessageType`] this build knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown message type: {0}")]
pub struct UnknownMessageType(pub u8);

/// Errors from [`deserialize`](crate::deserialize).
///
/// `E` is the payload error of the expected kind
/// ([`Message::Error`](crate::Message::Error)); kinds that cannot fail to
/// decode use [`Infallible`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError<E: std::error::Error + 'static = Infallible> {
    /// The tag byte is not a known message type.
    #[error("unknown message type: {raw}")]
    UnknownMessageType { raw: u8 },

    /// The tag byte is a known type, but not the expected one.
    #[error("wrong message type: expected {expected}, got {got}")]
    WrongMessageType {
        expected: MessageType,
        got: MessageType,
    },

    /// The frame is not `1 + PAYLOAD_SIZE` bytes long.
    #[error("frame size mismatch: expected {expected} bytes, got {got}")]
    FrameSize { expected: usize, got: usize },

    /// The payload contains a value the kind's decoder does not recognise.
    #[error(transparent)]
    Payload(E),
}

// ---------------------------------------------------------------------------
// Per-kind payload errors
// ---------------------------------------------------------------------------

/// Payload errors for [`CreateNewGameResponse`](crate::CreateNewGameResponse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CreateNewGameResponseError {
    /// The first payload byte is neither the "game id" nor the "error" arm.
    #[error("CreateNewGameResponse: unknown variant index (value: {0})")]
    UnknownVariantIndex(u8),

    /// The error arm carries an error code this build does not know.
    #[error("CreateNewGameResponse: unknown CreateNewGame error (value: {0})")]
    UnknownCreateNewGameError(u8),
}

/// The result code of a [`JoinGameResponse`](crate::JoinGameResponse) is
/// not one this build knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("JoinGameResponse: unknown result code (value: {0})")]
pub struct UnknownResultError(pub u8);

/// The address family byte of a [`SocketAddress`](crate::SocketAddress)
/// message is neither IPv4 nor IPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("SocketAddress: unknown address family (value: {0})")]
pub struct UnknownAddressFamily(pub u8);
