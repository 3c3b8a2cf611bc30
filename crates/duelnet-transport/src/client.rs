//! The connecting side: [`TcpClient`].

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::time::{Duration, Instant};

use duelnet_protocol::{DecodeError, Message, MessageType, deserialize, frame_size, serialize};
use socket2::{Protocol, SockAddr, Socket, Type};

use crate::cancel::CancelToken;
use crate::endpoint::{AddressFamily, Endpoint};
use crate::error::{ConnectError, ReceiveError, SendError, SystemError, TransportError};
use crate::io::{ReadOutcome, WriteOutcome, read_full, wait_writable, write_full};

/// A non-blocking TCP stream socket that sends and receives whole frames.
///
/// The handle owns its descriptor; dropping it closes the socket. It can be
/// turned into a listener with [`TcpAcceptor::from_client`](crate::TcpAcceptor::from_client),
/// which keeps the bound local port. That is what lets a client that
/// talked to the central server accept its peer on the very address the
/// server relayed.
#[derive(Debug)]
pub struct TcpClient {
    socket: Socket,
}

impl TcpClient {
    /// Opens an unbound socket of the given family.
    pub fn new(family: AddressFamily) -> Result<Self, TransportError> {
        Ok(Self {
            socket: new_stream_socket(family)?,
        })
    }

    /// Opens a socket bound to `endpoint`.
    ///
    /// Bind to an explicit port if the socket will later become an
    /// acceptor: an ephemeral port is released on disconnect.
    pub fn bind_to(endpoint: &Endpoint) -> Result<Self, TransportError> {
        let addr = endpoint.resolve()?;
        let socket = new_stream_socket(AddressFamily::of(&addr))?;
        socket
            .bind(&addr.into())
            .map_err(|e| SystemError::new("bind", e))?;
        tracing::debug!(%addr, "client socket bound");
        Ok(Self { socket })
    }

    pub(crate) fn from_socket(socket: Socket) -> Self {
        Self { socket }
    }

    pub(crate) fn into_socket(self) -> Socket {
        self.socket
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Connects to `endpoint`, waiting at most `timeout` for the handshake.
    pub fn connect(&mut self, endpoint: &Endpoint, timeout: Duration) -> Result<(), ConnectError> {
        let addr = endpoint.resolve()?;
        self.connect_addr(addr, timeout)
    }

    /// Connects to an already-resolved address.
    pub fn connect_addr(&mut self, addr: SocketAddr, timeout: Duration) -> Result<(), ConnectError> {
        let start = Instant::now();
        match self.socket.connect(&SockAddr::from(addr)) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(libc::EISCONN) => {}
            Err(e) if e.raw_os_error() == Some(libc::EINPROGRESS) => {
                if !wait_writable(self.as_fd(), timeout)? {
                    return Err(ConnectError::Timeout {
                        configured: timeout,
                        elapsed: start.elapsed(),
                    });
                }
                match self.socket.take_error() {
                    Ok(None) => {}
                    Ok(Some(e)) | Err(e) => return Err(SystemError::new("connect", e).into()),
                }
            }
            Err(e) => return Err(SystemError::new("connect", e).into()),
        }
        tracing::debug!(%addr, elapsed = ?start.elapsed(), "connected");
        Ok(())
    }

    /// Detaches from the remote end without closing the descriptor.
    ///
    /// Issues `connect` with an `AF_UNSPEC` address. The socket keeps its
    /// explicitly bound local address and can then listen or connect again.
    /// On a listening socket this stops listening.
    pub fn disconnect(&mut self) -> Result<(), SystemError> {
        disconnect_socket(&self.socket)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SystemError> {
        socket_addr(self.socket.local_addr(), "getsockname")
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, SystemError> {
        socket_addr(self.socket.peer_addr(), "getpeername")
    }

    // -----------------------------------------------------------------------
    // Raw bytes
    // -----------------------------------------------------------------------

    /// Sends all of `bytes` within `timeout`.
    pub fn send_bytes(&mut self, bytes: &[u8], timeout: Duration) -> Result<(), SendError> {
        let transfer = write_full(self.as_fd(), bytes, timeout);
        match transfer.outcome {
            WriteOutcome::Success => Ok(()),
            WriteOutcome::Timeout => Err(SendError::Timeout {
                configured: timeout,
                elapsed: transfer.elapsed,
                sent: transfer.transferred,
                total: bytes.len(),
            }),
            WriteOutcome::PeerHangup { revents } => Err(SendError::ConnectionTerminatedByPeer {
                message: format!(
                    "peer hung up after {} of {} bytes were sent (poll revents {revents:#x})",
                    transfer.transferred,
                    bytes.len()
                ),
            }),
            WriteOutcome::SystemError(err) => Err(err.into()),
        }
    }

    /// Fills `buf` within `timeout`, optionally watching `cancel`.
    pub fn receive_bytes(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<(), ReceiveError> {
        let total = buf.len();
        let transfer = read_full(self.as_fd(), buf, timeout, cancel);
        let received = transfer.transferred;
        match transfer.outcome {
            ReadOutcome::Success => Ok(()),
            ReadOutcome::Timeout => Err(ReceiveError::Timeout {
                configured: timeout,
                elapsed: transfer.elapsed,
                received,
                total,
            }),
            ReadOutcome::PrematureEof => Err(ReceiveError::ConnectionTerminatedByPeer {
                message: format!("peer closed the connection after {received} of {total} bytes"),
            }),
            ReadOutcome::PeerHangup { revents } => Err(ReceiveError::ConnectionTerminatedByPeer {
                message: format!(
                    "peer hung up after {received} of {total} bytes (poll revents {revents:#x})"
                ),
            }),
            ReadOutcome::Cancelled => Err(ReceiveError::Cancelled { received }),
            ReadOutcome::SystemError(err) => Err(err.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Typed messages
    // -----------------------------------------------------------------------

    pub fn send<M: Message>(&mut self, msg: &M, timeout: Duration) -> Result<(), SendError> {
        tracing::debug!(kind = %M::KIND, "sending message");
        self.send_bytes(&serialize(msg), timeout)
    }

    /// Receives one frame of kind `M`.
    ///
    /// The tag byte is read and checked first, so a frame of a different
    /// kind is reported as such even when its payload is shorter than `M`'s
    /// (the remaining bytes are not consumed).
    pub fn receive<M: Message>(&mut self, timeout: Duration) -> Result<M, ReceiveError<M::Error>> {
        self.receive_inner(timeout, None)
    }

    /// Like [`receive`](Self::receive), but gives up as soon as `cancel`
    /// fires.
    pub fn receive_cancellable<M: Message>(
        &mut self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<M, ReceiveError<M::Error>> {
        self.receive_inner(timeout, Some(cancel))
    }

    fn receive_inner<M: Message>(
        &mut self,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<M, ReceiveError<M::Error>> {
        let start = Instant::now();
        let mut frame = vec![0u8; frame_size::<M>()];

        let (tag, payload) = frame.split_at_mut(1);
        self.receive_bytes(tag, timeout, cancel)
            .map_err(|err| err.with_payload())?;
        match MessageType::try_from(tag[0]) {
            Ok(kind) if kind == M::KIND => {}
            Ok(got) => {
                return Err(ReceiveError::Decode(DecodeError::WrongMessageType {
                    expected: M::KIND,
                    got,
                }));
            }
            Err(unknown) => {
                return Err(ReceiveError::Decode(DecodeError::UnknownMessageType {
                    raw: unknown.0,
                }));
            }
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        self.receive_bytes(payload, remaining, cancel)
            .map_err(|err| match err {
                ReceiveError::Cancelled { received } => ReceiveError::Cancelled {
                    received: received + 1,
                },
                ReceiveError::Timeout { received, total, .. } => ReceiveError::Timeout {
                    configured: timeout,
                    elapsed: start.elapsed(),
                    received: received + 1,
                    total: total + 1,
                },
                other => other,
            })
            .map_err(|err| err.with_payload())?;

        let msg = deserialize::<M>(&frame).map_err(ReceiveError::Decode)?;
        tracing::debug!(kind = %M::KIND, "received message");
        Ok(msg)
    }
}

impl AsFd for TcpClient {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

// ---------------------------------------------------------------------------
// Shared socket helpers
// ---------------------------------------------------------------------------

/// A non-blocking, close-on-exec, `SO_REUSEADDR` stream socket.
pub(crate) fn new_stream_socket(family: AddressFamily) -> Result<Socket, SystemError> {
    let socket = Socket::new(family.domain(), Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| SystemError::new("socket", e))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| SystemError::new("setsockopt(SO_REUSEADDR)", e))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| SystemError::new("fcntl(O_NONBLOCK)", e))?;
    Ok(socket)
}

pub(crate) fn disconnect_socket(socket: &Socket) -> Result<(), SystemError> {
    // SAFETY: an all-zero sockaddr is a valid value; only the family is set.
    let mut addr: libc::sockaddr = unsafe { std::mem::zeroed() };
    addr.sa_family = libc::AF_UNSPEC as libc::sa_family_t;
    // SAFETY: `addr` is a valid sockaddr of the length we pass.
    let rc = unsafe {
        libc::connect(
            socket.as_raw_fd(),
            &addr,
            std::mem::size_of::<libc::sockaddr>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(SystemError::last_os_error("connect(AF_UNSPEC)"));
    }
    tracing::debug!(fd = socket.as_raw_fd(), "socket disconnected");
    Ok(())
}

pub(crate) fn socket_addr(
    addr: io::Result<SockAddr>,
    context: &'static str,
) -> Result<SocketAddr, SystemError> {
    let addr = addr.map_err(|e| SystemError::new(context, e))?;
    addr.as_socket().ok_or_else(|| {
        SystemError::new(
            context,
            io::Error::new(io::ErrorKind::InvalidData, "not an IP socket address"),
        )
    })
}
