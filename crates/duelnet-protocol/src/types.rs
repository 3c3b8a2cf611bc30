//! Identity types shared by the client, the server and the registry.

use std::fmt;
use std::str::FromStr;

use crate::codec::LeInt;

// ---------------------------------------------------------------------------
// GameId
// ---------------------------------------------------------------------------

/// Opaque 64-bit token identifying one game.
///
/// The central server hands one out per created game; both players quote
/// it back (the joiner types it in, as a decimal number). On the wire it
/// is 8 bytes, little-endian.
///
/// `Display`/`FromStr` use the plain decimal form, because that is what a
/// human copies from one console into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameId(pub u64);

impl GameId {
    /// Serialized width in bytes.
    pub const SERIALIZED_SIZE: usize = u64::WIDTH;

    /// Writes the id into `out` (exactly [`Self::SERIALIZED_SIZE`] bytes).
    pub fn write_to(self, out: &mut [u8]) {
        self.0.write_le(out);
    }

    /// Reads an id from `bytes` (exactly [`Self::SERIALIZED_SIZE`] bytes).
    pub fn read_from(bytes: &[u8]) -> Self {
        Self(u64::read_le(bytes))
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The text could not be read as a decimal game id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{input}` is not a valid game id: {reason}")]
pub struct GameIdParseError {
    /// The rejected text, verbatim.
    pub input: String,
    /// Why the integer parser rejected it.
    pub reason: std::num::ParseIntError,
}

impl FromStr for GameId {
    type Err = GameIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(GameId)
            .map_err(|reason| GameIdParseError {
                input: s.to_string(),
                reason,
            })
    }
}

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// Server-side identity of a connected player.
///
/// Assigned by the central server per accepted connection. It never
/// travels on the wire; the registry uses it to remember who created and
/// who joined each game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}
