//! Error types for the transport layer.
//!
//! Every syscall failure is a [`SystemError`]: the OS error plus the name of
//! the call that produced it. The operation-level enums ([`ConnectError`],
//! [`SendError`], [`ReceiveError`], [`AcceptError`]) add the outcomes that
//! are not OS errors at all: timeouts, a peer that went away, cancellation,
//! an unexpected peer.

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use duelnet_protocol::DecodeError;

/// An OS-level failure, tagged with the syscall that reported it.
#[derive(Debug, thiserror::Error)]
#[error("{context} failed: {source}")]
pub struct SystemError {
    /// Name of the failing call (`"connect"`, `"poll"`, ...).
    pub context: &'static str,
    #[source]
    pub source: io::Error,
}

impl SystemError {
    pub fn new(context: &'static str, source: io::Error) -> Self {
        Self { context, source }
    }

    /// Captures `errno` right after a failed libc call.
    pub fn last_os_error(context: &'static str) -> Self {
        Self::new(context, io::Error::last_os_error())
    }

    /// Builds an error from a raw errno value.
    pub fn from_errno(context: &'static str, errno: i32) -> Self {
        Self::new(context, io::Error::from_raw_os_error(errno))
    }

    /// The raw OS error code, if this came from the OS.
    pub fn code(&self) -> Option<i32> {
        self.source.raw_os_error()
    }
}

/// An address literal could not be turned into an IP address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IpAddrParsingError {
    #[error("empty address")]
    Empty,

    #[error("`{input}` is not a valid address")]
    InvalidFormat { input: String },

    /// Neither `.` (IPv4) nor `:` (IPv6) appears in the literal.
    #[error("cannot tell the address family of `{input}`")]
    UnknownFamily { input: String },
}

/// Creating, binding or re-purposing a socket failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    System(#[from] SystemError),

    #[error(transparent)]
    IpAddrParsing(#[from] IpAddrParsingError),
}

/// Errors from [`TcpClient::connect`](crate::TcpClient::connect).
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    System(#[from] SystemError),

    #[error(transparent)]
    IpAddrParsing(#[from] IpAddrParsingError),

    #[error("connect timed out after {elapsed:?} (configured timeout {configured:?})")]
    Timeout {
        configured: Duration,
        elapsed: Duration,
    },
}

impl ConnectError {
    /// The remote end actively refused (nobody listening on that port).
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::System(err) if err.code() == Some(libc::ECONNREFUSED))
    }
}

/// Errors from the `send` family on [`TcpClient`](crate::TcpClient).
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    System(#[from] SystemError),

    #[error(
        "send timed out after {elapsed:?} (configured timeout {configured:?}, \
         {sent} of {total} bytes sent)"
    )]
    Timeout {
        configured: Duration,
        elapsed: Duration,
        sent: usize,
        total: usize,
    },

    #[error("connection terminated by peer: {message}")]
    ConnectionTerminatedByPeer { message: String },
}

/// Errors from the `receive` family on [`TcpClient`](crate::TcpClient).
///
/// `E` is the payload error of the expected message kind; raw byte reads
/// use the default [`Infallible`].
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError<E: std::error::Error + 'static = Infallible> {
    #[error(transparent)]
    System(#[from] SystemError),

    #[error(
        "receive timed out after {elapsed:?} (configured timeout {configured:?}, \
         {received} of {total} bytes received)"
    )]
    Timeout {
        configured: Duration,
        elapsed: Duration,
        received: usize,
        total: usize,
    },

    #[error("connection terminated by peer: {message}")]
    ConnectionTerminatedByPeer { message: String },

    #[error("receive cancelled after {received} bytes")]
    Cancelled { received: usize },

    #[error(transparent)]
    Decode(DecodeError<E>),
}

impl ReceiveError {
    /// Re-types a raw-bytes error for a typed receive.
    pub(crate) fn with_payload<E: std::error::Error + 'static>(self) -> ReceiveError<E> {
        match self {
            Self::System(err) => ReceiveError::System(err),
            Self::Timeout {
                configured,
                elapsed,
                received,
                total,
            } => ReceiveError::Timeout {
                configured,
                elapsed,
                received,
                total,
            },
            Self::ConnectionTerminatedByPeer { message } => {
                ReceiveError::ConnectionTerminatedByPeer { message }
            }
            Self::Cancelled { received } => ReceiveError::Cancelled { received },
            Self::Decode(err) => match err {
                DecodeError::UnknownMessageType { raw } => {
                    ReceiveError::Decode(DecodeError::UnknownMessageType { raw })
                }
                DecodeError::WrongMessageType { expected, got } => {
                    ReceiveError::Decode(DecodeError::WrongMessageType { expected, got })
                }
                DecodeError::FrameSize { expected, got } => {
                    ReceiveError::Decode(DecodeError::FrameSize { expected, got })
                }
                DecodeError::Payload(never) => match never {},
            },
        }
    }
}

/// Errors from [`TcpAcceptor::accept_expected_peer`](crate::TcpAcceptor::accept_expected_peer).
#[derive(Debug, thiserror::Error)]
pub enum AcceptError {
    #[error(transparent)]
    System(#[from] SystemError),

    #[error("no connection arrived after {elapsed:?} (configured timeout {configured:?})")]
    Timeout {
        configured: Duration,
        elapsed: Duration,
    },

    /// Somebody connected, but not the peer we were told to expect. The
    /// stray connection has already been closed.
    #[error("expected a connection from {expected}, got one from {actual}")]
    PeerAddressMismatch {
        expected: SocketAddr,
        actual: SocketAddr,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_error_display_names_the_call() {
        let err = SystemError::from_errno("connect", libc::ECONNREFUSED);
        assert!(err.to_string().starts_with("connect failed: "));
        assert_eq!(err.code(), Some(libc::ECONNREFUSED));
    }

    #[test]
    fn test_connect_error_is_refused_only_for_econnrefused() {
        let refused: ConnectError = SystemError::from_errno("connect", libc::ECONNREFUSED).into();
        assert!(refused.is_refused());

        let other: ConnectError = SystemError::from_errno("connect", libc::ENETUNREACH).into();
        assert!(!other.is_refused());

        let timeout = ConnectError::Timeout {
            configured: Duration::from_secs(1),
            elapsed: Duration::from_secs(1),
        };
        assert!(!timeout.is_refused());
    }

    #[test]
    fn test_accept_timeout_message_embeds_both_durations() {
        let err = AcceptError::Timeout {
            configured: Duration::from_millis(200),
            elapsed: Duration::from_millis(203),
        };
        let text = err.to_string();
        assert!(text.contains("203ms"), "{text}");
        assert!(text.contains("200ms"), "{text}");
    }

    #[test]
    fn test_receive_timeout_message_embeds_both_durations() {
        let err: ReceiveError = ReceiveError::Timeout {
            configured: Duration::from_millis(1000),
            elapsed: Duration::from_millis(1001),
            received: 3,
            total: 10,
        };
        let text = err.to_string();
        assert!(text.contains("1.001s"), "{text}");
        assert!(text.contains("1s"), "{text}");
        assert!(text.contains("3 of 10"), "{text}");
    }
}
