//! Client-side rendezvous for duelnet.
//!
//! This crate drives one player from "not connected" to "directly
//! connected to the other player":
//!
//! 1. **Matchmaking**: connect to the central server, create or join a
//!    game, receive the other player's address.
//! 2. **Peer link**: accept the other player on our own port, or dial
//!    theirs, falling back to the other role once.
//!
//! # How it fits in the stack
//!
//! ```text
//! UserInteraction (console, tests)  ← decides what to do, shows failures
//!     ↕
//! Rendezvous (this crate)           ← State → State transitions
//!     ↕
//! Transport + Protocol (below)      ← sockets, bounded I/O, typed frames
//! ```
//!
//! # Key types
//!
//! - [`State`] / [`ErrorState`]: where the client is, what went wrong
//! - [`Rendezvous`]: performs transitions ([`step`](Rendezvous::step),
//!   [`run`](Rendezvous::run))
//! - [`UserInteraction`]: the human side; [`ConsoleUser`] implements it
//!   over stdin/stdout
//! - [`ClientConfig`]: endpoints and timeouts

mod config;
mod console;
mod error;
mod machine;
mod state;
mod user;

pub use config::ClientConfig;
pub use console::{Command, ConsoleUser, parse_command};
pub use error::{CommandError, RendezvousError};
pub use machine::Rendezvous;
pub use state::{ErrorState, State};
pub use user::{AfterPeer, Intent, UserInteraction};
