//! [`TcpAcceptor`]: a client socket turned listener, waiting for one peer.

use std::net::SocketAddr;
use std::os::fd::{AsFd, BorrowedFd};
use std::time::{Duration, Instant};

use socket2::Socket;

use crate::client::{TcpClient, disconnect_socket, socket_addr};
use crate::endpoint::canonical_addr;
use crate::error::{AcceptError, SystemError};
use crate::io::wait_readable;
use crate::server::{AcceptOutcome, accept_socket, listen_socket};

/// A listener built from a [`TcpClient`]'s descriptor.
///
/// The central server relays to each player the address it saw the *other*
/// player connect from. For the creator to be reachable there, it has to
/// listen on the same local port it used to talk to the server. So rather
/// than opening a new socket, the acceptor takes over the client's.
#[derive(Debug)]
pub struct TcpAcceptor {
    socket: Socket,
}

impl TcpAcceptor {
    /// Disconnects `client` and starts listening on its bound address.
    pub fn from_client(mut client: TcpClient) -> Result<Self, SystemError> {
        client.disconnect()?;
        let socket = client.into_socket();
        listen_socket(&socket)?;
        let acceptor = Self { socket };
        tracing::debug!(addr = ?acceptor.local_addr().ok(), "acceptor listening");
        Ok(acceptor)
    }

    /// Waits up to `timeout` for one connection and checks it comes from
    /// `expected`.
    ///
    /// A connection from anyone else is closed and reported as
    /// [`AcceptError::PeerAddressMismatch`]; the acceptor does not keep
    /// waiting for the right peer after that.
    pub fn accept_expected_peer(
        &self,
        expected: SocketAddr,
        timeout: Duration,
    ) -> Result<TcpClient, AcceptError> {
        let start = Instant::now();
        let expected = canonical_addr(expected);

        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            if !wait_readable(self.as_fd(), remaining)? {
                return Err(AcceptError::Timeout {
                    configured: timeout,
                    elapsed: start.elapsed(),
                });
            }

            match accept_socket(&self.socket)? {
                AcceptOutcome::WouldBlock => continue,
                AcceptOutcome::Accepted(accepted) => {
                    let actual = canonical_addr(accepted.peer);
                    if actual != expected {
                        tracing::warn!(%expected, %actual, "unexpected peer, closing");
                        return Err(AcceptError::PeerAddressMismatch { expected, actual });
                    }
                    tracing::info!(peer = %actual, "accepted expected peer");
                    return Ok(accepted.client);
                }
            }
        }
    }

    /// Stops listening and gives the socket back as an unconnected client,
    /// still bound to the same local address.
    pub fn into_client(self) -> Result<TcpClient, SystemError> {
        disconnect_socket(&self.socket)?;
        Ok(TcpClient::from_socket(self.socket))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SystemError> {
        socket_addr(self.socket.local_addr(), "getsockname")
    }
}

impl AsFd for TcpAcceptor {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}
