//! The listening side: [`TcpServer`].

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsFd, BorrowedFd};

use socket2::Socket;

use crate::client::{TcpClient, new_stream_socket, socket_addr};
use crate::endpoint::{AddressFamily, Endpoint};
use crate::error::{SystemError, TransportError};

/// Backlog passed to `listen(2)`.
pub const LISTEN_BACKLOG: i32 = 128;

/// A freshly accepted connection.
#[derive(Debug)]
pub struct ClientId {
    /// The peer's address as the OS reported it.
    pub peer: SocketAddr,
    /// The new connection. Already non-blocking.
    pub client: TcpClient,
}

/// What a non-blocking [`TcpServer::accept`] found.
#[derive(Debug)]
pub enum AcceptOutcome {
    Accepted(ClientId),
    /// No pending connection; try again later.
    WouldBlock,
}

/// A non-blocking listening socket.
///
/// `accept` never waits. Callers decide how to wait for readiness, either
/// with their own poll loop or by handing the socket to an async runtime
/// through [`into_std`](Self::into_std).
#[derive(Debug)]
pub struct TcpServer {
    socket: Socket,
}

impl TcpServer {
    /// Creates a socket bound to `endpoint`. Call [`listen`](Self::listen)
    /// before accepting.
    pub fn bind(endpoint: &Endpoint) -> Result<Self, TransportError> {
        let addr = endpoint.resolve()?;
        let socket = new_stream_socket(AddressFamily::of(&addr))?;
        socket
            .bind(&addr.into())
            .map_err(|e| SystemError::new("bind", e))?;
        Ok(Self { socket })
    }

    pub fn listen(&self) -> Result<(), SystemError> {
        listen_socket(&self.socket)?;
        tracing::info!(addr = ?self.local_addr().ok(), "listening");
        Ok(())
    }

    pub fn accept(&self) -> Result<AcceptOutcome, SystemError> {
        accept_socket(&self.socket)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SystemError> {
        socket_addr(self.socket.local_addr(), "getsockname")
    }

    /// Releases the listener as a std socket (still non-blocking), e.g. for
    /// `tokio::net::TcpListener::from_std`.
    pub fn into_std(self) -> std::net::TcpListener {
        self.socket.into()
    }
}

impl AsFd for TcpServer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

pub(crate) fn listen_socket(socket: &Socket) -> Result<(), SystemError> {
    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|e| SystemError::new("listen", e))
}

pub(crate) fn accept_socket(socket: &Socket) -> Result<AcceptOutcome, SystemError> {
    let (conn, addr) = match socket.accept() {
        Ok(accepted) => accepted,
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            return Ok(AcceptOutcome::WouldBlock);
        }
        Err(e) => return Err(SystemError::new("accept", e)),
    };
    conn.set_nonblocking(true)
        .map_err(|e| SystemError::new("fcntl(O_NONBLOCK)", e))?;
    let peer = socket_addr(Ok(addr), "accept")?;
    tracing::debug!(%peer, "accepted connection");
    Ok(AcceptOutcome::Accepted(ClientId {
        peer,
        client: TcpClient::from_socket(conn),
    }))
}
