//! The concrete message kinds.
//!
//! | Kind | Tag | Payload |
//! |---|---|---|
//! | [`CreateNewGameRequest`] | 70 | none |
//! | [`CreateNewGameResponse`] | 71 | variant byte + 8 bytes |
//! | [`JoinGameRequest`] | 72 | game id (8 bytes) |
//! | [`JoinGameResponse`] | 73 | result code (1 byte) |
//! | [`SocketAddress`] | 74 | family + port + 16 address bytes |
//!
//! Any byte that names an enum value is matched exhaustively with an
//! explicit "unknown" arm: wire input is untrusted, and a value added by a
//! newer build must come back as a typed error carrying the raw byte.

use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::codec::{LeInt, int_from_bytes, int_to_bytes};
use crate::error::{
    CreateNewGameResponseError, UnknownAddressFamily, UnknownResultError,
};
use crate::message::{Message, MessageType};
use crate::types::GameId;

// ---------------------------------------------------------------------------
// CreateNewGameRequest
// ---------------------------------------------------------------------------

/// "Please allocate a new game for me." Carries nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreateNewGameRequest;

impl Message for CreateNewGameRequest {
    const KIND: MessageType = MessageType::CreateNewGameRequest;
    const PAYLOAD_SIZE: usize = 0;
    type Error = Infallible;

    fn encode(&self, _out: &mut [u8]) {}

    fn decode(_bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

// ---------------------------------------------------------------------------
// CreateNewGameResponse
// ---------------------------------------------------------------------------

/// Why the server could not create a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CreateNewGameError {
    /// The registry is at capacity.
    NoAvailableSpaceInGameDb = 1,
}

impl CreateNewGameError {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CreateNewGameError {
    type Error = CreateNewGameResponseError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Self::NoAvailableSpaceInGameDb),
            other => Err(CreateNewGameResponseError::UnknownCreateNewGameError(other)),
        }
    }
}

impl fmt::Display for CreateNewGameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAvailableSpaceInGameDb => {
                f.write_str("no available space in the game database")
            }
        }
    }
}

/// The server's answer to a [`CreateNewGameRequest`].
///
/// Layout: `[variant: u8][body: 8 bytes]`. Variant 0 carries the new
/// [`GameId`]; variant 1 carries a [`CreateNewGameError`] byte followed by
/// seven zero bytes of padding, so both arms have the same width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateNewGameResponse {
    Created(GameId),
    Failed(CreateNewGameError),
}

impl CreateNewGameResponse {
    const VARIANT_GAME_ID: u8 = 0;
    const VARIANT_ERROR: u8 = 1;
}

impl Message for CreateNewGameResponse {
    const KIND: MessageType = MessageType::CreateNewGameResponse;
    const PAYLOAD_SIZE: usize = 1 + GameId::SERIALIZED_SIZE;
    type Error = CreateNewGameResponseError;

    fn encode(&self, out: &mut [u8]) {
        out.fill(0);
        match self {
            Self::Created(id) => {
                let body = int_to_bytes(Self::VARIANT_GAME_ID, out);
                id.write_to(body);
            }
            Self::Failed(error) => {
                let body = int_to_bytes(Self::VARIANT_ERROR, out);
                int_to_bytes(error.as_u8(), body);
            }
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self, Self::Error> {
        let (variant, body): (u8, _) = int_from_bytes(bytes);
        match variant {
            Self::VARIANT_GAME_ID => Ok(Self::Created(GameId::read_from(body))),
            Self::VARIANT_ERROR => {
                let (code, _padding): (u8, _) = int_from_bytes(body);
                CreateNewGameError::try_from(code).map(Self::Failed)
            }
            other => Err(CreateNewGameResponseError::UnknownVariantIndex(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// JoinGameRequest
// ---------------------------------------------------------------------------

/// "Put me into game `game_id`."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinGameRequest {
    pub game_id: GameId,
}

impl Message for JoinGameRequest {
    const KIND: MessageType = MessageType::JoinGameRequest;
    const PAYLOAD_SIZE: usize = GameId::SERIALIZED_SIZE;
    type Error = Infallible;

    fn encode(&self, out: &mut [u8]) {
        self.game_id.write_to(out);
    }

    fn decode(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self {
            game_id: GameId::read_from(bytes),
        })
    }
}

// ---------------------------------------------------------------------------
// JoinGameResponse
// ---------------------------------------------------------------------------

/// Outcome of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JoinGameResult {
    Success = 0,
    GameIdDoesNotExist = 1,
    GameAlreadyHasTwoPlayers = 2,
}

impl JoinGameResult {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for JoinGameResult {
    type Error = UnknownResultError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Success),
            1 => Ok(Self::GameIdDoesNotExist),
            2 => Ok(Self::GameAlreadyHasTwoPlayers),
            other => Err(UnknownResultError(other)),
        }
    }
}

impl fmt::Display for JoinGameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::GameIdDoesNotExist => "game id does not exist",
            Self::GameAlreadyHasTwoPlayers => "game already has two players",
        };
        f.write_str(text)
    }
}

/// The server's answer to a [`JoinGameRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinGameResponse {
    pub result: JoinGameResult,
}

impl Message for JoinGameResponse {
    const KIND: MessageType = MessageType::JoinGameResponse;
    const PAYLOAD_SIZE: usize = u8::WIDTH;
    type Error = UnknownResultError;

    fn encode(&self, out: &mut [u8]) {
        self.result.as_u8().write_le(out);
    }

    fn decode(bytes: &[u8]) -> Result<Self, Self::Error> {
        let result = JoinGameResult::try_from(u8::read_le(bytes))?;
        Ok(Self { result })
    }
}

// ---------------------------------------------------------------------------
// SocketAddress
// ---------------------------------------------------------------------------

/// The other player's address, relayed by the central server.
///
/// Layout: `[family: 4 | 6][port: u16 big-endian][address: 16 bytes]`.
/// The port is the one field in the protocol that is not little-endian: it
/// is kept in network byte order, exactly as the OS hands it out. IPv4
/// addresses occupy the first four address bytes, the rest is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketAddress(pub SocketAddr);

impl SocketAddress {
    const FAMILY_V4: u8 = 4;
    const FAMILY_V6: u8 = 6;
    const ADDRESS_WIDTH: usize = 16;
}

impl Message for SocketAddress {
    const KIND: MessageType = MessageType::SocketAddress;
    const PAYLOAD_SIZE: usize = 1 + 2 + Self::ADDRESS_WIDTH;
    type Error = UnknownAddressFamily;

    fn encode(&self, out: &mut [u8]) {
        out.fill(0);
        let (family, rest) = out.split_at_mut(1);
        let (port, address) = rest.split_at_mut(2);
        port.copy_from_slice(&self.0.port().to_be_bytes());
        match self.0.ip() {
            IpAddr::V4(ip) => {
                family[0] = Self::FAMILY_V4;
                address[..4].copy_from_slice(&ip.octets());
            }
            IpAddr::V6(ip) => {
                family[0] = Self::FAMILY_V6;
                address.copy_from_slice(&ip.octets());
            }
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self, Self::Error> {
        let (family, rest) = bytes.split_at(1);
        let (port, address) = rest.split_at(2);
        let port = u16::from_be_bytes([port[0], port[1]]);
        let ip = match family[0] {
            Self::FAMILY_V4 => {
                IpAddr::V4(Ipv4Addr::new(address[0], address[1], address[2], address[3]))
            }
            Self::FAMILY_V6 => {
                let mut octets = [0u8; Self::ADDRESS_WIDTH];
                octets.copy_from_slice(address);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            other => return Err(UnknownAddressFamily(other)),
        };
        Ok(Self(SocketAddr::new(ip, port)))
    }
}
