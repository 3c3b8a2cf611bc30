//! Fixed-width little-endian integer codec.
//!
//! This is the leaf of the protocol stack: every multi-byte field on the
//! wire is written and read through [`LeInt`]. The rest of the crate never
//! touches byte order directly, so the whole protocol stays little-endian
//! regardless of the host.
//!
//! The one exception is the port inside a socket address, which travels
//! in network byte order (big-endian) to match what the OS reports. That
//! conversion lives next to the socket address message, not here.

/// An integer that can be written to / read from exactly `WIDTH` bytes,
/// least significant byte first.
///
/// `read_le` and `write_le` take slices rather than arrays so callers can
/// carve fields out of a larger frame with `split_at`. Passing a slice
/// whose length is not `WIDTH` is a bug in the caller and panics.
pub trait LeInt: Copy + Sized {
    /// Number of bytes this integer occupies on the wire.
    const WIDTH: usize;

    /// Writes `self` into `out` (which must be exactly `WIDTH` bytes).
    fn write_le(self, out: &mut [u8]);

    /// Reads a value from `bytes` (which must be exactly `WIDTH` bytes).
    fn read_le(bytes: &[u8]) -> Self;
}

// One impl per primitive. A macro keeps the ten impls identical; they
// only differ in the type name.
macro_rules! impl_le_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl LeInt for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_le_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

/// Writes `value` into the first `I::WIDTH` bytes of `out` and returns the
/// rest of the slice, so consecutive fields can be chained:
///
/// ```rust
/// use duelnet_protocol::codec::{int_to_bytes, int_from_bytes};
///
/// let mut frame = [0u8; 3];
/// let rest = int_to_bytes(0x0102u16, &mut frame);
/// int_to_bytes(7u8, rest);
/// assert_eq!(frame, [0x02, 0x01, 7]);
///
/// let (port, rest): (u16, _) = int_from_bytes(&frame);
/// assert_eq!(port, 0x0102);
/// assert_eq!(rest, &[7]);
/// ```
pub fn int_to_bytes<I: LeInt>(value: I, out: &mut [u8]) -> &mut [u8] {
    let (field, rest) = out.split_at_mut(I::WIDTH);
    value.write_le(field);
    rest
}

/// Reads an `I` from the first `I::WIDTH` bytes of `bytes` and returns it
/// together with the unread remainder.
pub fn int_from_bytes<I: LeInt>(bytes: &[u8]) -> (I, &[u8]) {
    let (field, rest) = bytes.split_at(I::WIDTH);
    (I::read_le(field), rest)
}
