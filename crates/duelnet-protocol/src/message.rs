//! The typed-message framework.
//!
//! Every frame on the wire is `[1-byte MessageType][payload]`, and the
//! payload length is a constant of the kind. So the reader always knows
//! how many bytes to wait for before it has seen any of them.
//! There is no length prefix and no delimiter.
//!
//! ```text
//! ┌──────┬───────────────────────────────┐
//! │ tag  │ payload (PAYLOAD_SIZE bytes)  │
//! └──────┴───────────────────────────────┘
//!   1 B     0 / 9 / 8 / 1 / 19 bytes
//! ```
//!
//! Each kind implements [`Message`]: its tag, its payload width, and an
//! encode/decode pair over exactly that many bytes. [`serialize`] and
//! [`deserialize`] wrap that with the tag byte and tag validation.

use std::fmt;

use crate::error::{DecodeError, UnknownMessageType};
use crate::messages::{
    CreateNewGameRequest, CreateNewGameResponse, JoinGameRequest,
    JoinGameResponse, SocketAddress,
};

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// The 1-byte wire tag of every message.
///
/// These values are part of the wire contract. Once a version ships, a
/// value is never reassigned; new kinds get new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    CreateNewGameRequest = 70,
    CreateNewGameResponse = 71,
    JoinGameRequest = 72,
    JoinGameResponse = 73,
    SocketAddress = 74,
}

impl MessageType {
    /// Every known kind, in tag order.
    pub const ALL: [MessageType; 5] = [
        MessageType::CreateNewGameRequest,
        MessageType::CreateNewGameResponse,
        MessageType::JoinGameRequest,
        MessageType::JoinGameResponse,
        MessageType::SocketAddress,
    ];

    /// The raw tag byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Fixed payload width of this kind, in bytes (tag excluded).
    ///
    /// This is the runtime mirror of [`Message::PAYLOAD_SIZE`], for code
    /// that learns the kind from the tag byte (the server reading whatever
    /// request arrives next).
    pub fn payload_size(self) -> usize {
        match self {
            Self::CreateNewGameRequest => CreateNewGameRequest::PAYLOAD_SIZE,
            Self::CreateNewGameResponse => CreateNewGameResponse::PAYLOAD_SIZE,
            Self::JoinGameRequest => JoinGameRequest::PAYLOAD_SIZE,
            Self::JoinGameResponse => JoinGameResponse::PAYLOAD_SIZE,
            Self::SocketAddress => SocketAddress::PAYLOAD_SIZE,
        }
    }

    /// Human-readable kind name.
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateNewGameRequest => "CreateNewGameRequest",
            Self::CreateNewGameResponse => "CreateNewGameResponse",
            Self::JoinGameRequest => "JoinGameRequest",
            Self::JoinGameResponse => "JoinGameResponse",
            Self::SocketAddress => "SocketAddress",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = UnknownMessageType;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_u8() == raw)
            .ok_or(UnknownMessageType(raw))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Message trait
// ---------------------------------------------------------------------------

/// A message kind with a fixed-size payload.
///
/// Implementors promise that `encode` fills exactly `PAYLOAD_SIZE` bytes
/// and `decode` accepts exactly `PAYLOAD_SIZE` bytes. The framework checks
/// frame lengths before calling `decode`, so implementations can split the
/// payload with `split_at` without re-validating.
pub trait Message: Sized {
    /// The wire tag of this kind.
    const KIND: MessageType;

    /// Payload width in bytes (may be zero).
    const PAYLOAD_SIZE: usize;

    /// What can be wrong with a payload of the right length.
    ///
    /// Kinds whose every byte pattern is valid use
    /// [`Infallible`](std::convert::Infallible).
    type Error: std::error::Error + 'static;

    /// Writes the payload into `out` (exactly `PAYLOAD_SIZE` bytes).
    fn encode(&self, out: &mut [u8]);

    /// Reads a payload from `bytes` (exactly `PAYLOAD_SIZE` bytes).
    fn decode(bytes: &[u8]) -> Result<Self, Self::Error>;
}

/// Total frame width of `M` on the wire: tag byte plus payload.
pub const fn frame_size<M: Message>() -> usize {
    1 + M::PAYLOAD_SIZE
}

/// Serializes `msg` into a `[tag][payload]` frame.
pub fn serialize<M: Message>(msg: &M) -> Vec<u8> {
    let mut frame = vec![0u8; frame_size::<M>()];
    frame[0] = M::KIND.as_u8();
    msg.encode(&mut frame[1..]);
    frame
}

/// Deserializes a `[tag][payload]` frame that is expected to hold an `M`.
///
/// The tag is checked before the payload is looked at: an unknown tag
/// yields [`DecodeError::UnknownMessageType`], a known but different tag
/// yields [`DecodeError::WrongMessageType`], and only then is the payload
/// handed to `M::decode`.
pub fn deserialize<M: Message>(frame: &[u8]) -> Result<M, DecodeError<M::Error>> {
    let Some((&tag, payload)) = frame.split_first() else {
        return Err(DecodeError::FrameSize {
            expected: frame_size::<M>(),
            got: 0,
        });
    };

    let got = MessageType::try_from(tag)
        .map_err(|UnknownMessageType(raw)| DecodeError::UnknownMessageType { raw })?;
    if got != M::KIND {
        return Err(DecodeError::WrongMessageType {
            expected: M::KIND,
            got,
        });
    }

    if payload.len() != M::PAYLOAD_SIZE {
        return Err(DecodeError::FrameSize {
            expected: frame_size::<M>(),
            got: frame.len(),
        });
    }

    M::decode(payload).map_err(DecodeError::Payload)
}
