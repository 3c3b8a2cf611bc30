//! TCP transport for duelnet.
//!
//! Everything here is synchronous and bounded in time. There is no async
//! runtime underneath: the only place a call waits is a `poll(2)` inside
//! [`io`], and it always carries a timeout.
//!
//! # Layers
//!
//! ```text
//! TcpClient / TcpServer / TcpAcceptor   (socket handles)
//!              │
//!        io::read_full / io::write_full (robust partial I/O)
//!              │
//!        poll(2) + read(2) / write(2)
//! ```
//!
//! - [`io`]: exact-length reads and writes with a deadline and optional
//!   [cancellation](cancellation).
//! - [`TcpClient`]: connect, send and receive typed
//!   [`Message`](duelnet_protocol::Message)s.
//! - [`TcpServer`]: listen and non-blocking accept.
//! - [`TcpAcceptor`]: a connected client turned listener that accepts one
//!   expected peer.
//!
//! Each handle owns exactly one descriptor and is move-only; converting
//! between them consumes the source.

pub mod io;

mod acceptor;
mod cancel;
mod client;
mod endpoint;
mod error;
mod server;

pub use acceptor::TcpAcceptor;
pub use cancel::{CancelToken, Canceller, cancellation};
pub use client::TcpClient;
pub use endpoint::{AddressFamily, Endpoint, Host, canonical_addr};
pub use error::{
    AcceptError, ConnectError, IpAddrParsingError, ReceiveError, SendError,
    SystemError, TransportError,
};
pub use server::{AcceptOutcome, ClientId, LISTEN_BACKLOG, TcpServer};
