//! Client application states.

use std::fmt;
use std::net::SocketAddr;

use duelnet_protocol::GameId;
use duelnet_transport::TcpClient;

// ---------------------------------------------------------------------------
// ErrorState
// ---------------------------------------------------------------------------

/// What went wrong, and what the user could do about it.
///
/// Every failure state carries one of these; the presentation layer shows
/// the description and, if present, the hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    pub description: String,
    pub hint: Option<String>,
}

impl ErrorState {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({hint})")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The client's current position in the rendezvous.
///
/// Exactly one value is live at a time; [`Rendezvous::step`] consumes it
/// and returns the next one.
///
/// ```text
/// NeedToConnectToCentralServer → ConnectedToCentralServer
///   ├─ NeedToCreateNewGame → CreatedNewGame → NeedToAcceptConnectionFromExpectedPeer ─┐
///   └─ NeedToJoinGame      → JoinedGame     → NeedToConnectToPeer ───────────────────┤
///                                       (each may fall back to the other role once)   │
///                                                      EstablishedConnectionWithPeer ←┘
/// ```
///
/// [`Rendezvous::step`]: crate::Rendezvous::step
#[derive(Debug)]
pub enum State {
    NeedToConnectToCentralServer,
    ConnectedToCentralServer,
    NeedToCreateNewGame,
    CreatedNewGame {
        game_id: GameId,
    },
    NeedToJoinGame {
        game_id: GameId,
    },
    JoinedGame {
        game_id: GameId,
    },
    /// Listen on our own address for `peer` to dial in.
    NeedToAcceptConnectionFromExpectedPeer {
        peer: SocketAddr,
        tried_connect_already: bool,
    },
    /// Dial `peer` ourselves.
    NeedToConnectToPeer {
        peer: SocketAddr,
        tried_accept_already: bool,
    },
    /// The direct link is up; `link` is ours.
    EstablishedConnectionWithPeer {
        link: TcpClient,
    },
    FailedToConnectToCentralServer(ErrorState),
    FailedToCreateNewGame(ErrorState),
    FailedToJoinGame(ErrorState),
    FailedToEstablishConnectionWithPeer(ErrorState),
    NeedToExit,
}

impl State {
    /// Failure states and `NeedToExit` end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FailedToConnectToCentralServer(_)
                | Self::FailedToCreateNewGame(_)
                | Self::FailedToJoinGame(_)
                | Self::FailedToEstablishConnectionWithPeer(_)
                | Self::NeedToExit
        )
    }

    /// The error carried by a failure state.
    pub fn error(&self) -> Option<&ErrorState> {
        match self {
            Self::FailedToConnectToCentralServer(err)
            | Self::FailedToCreateNewGame(err)
            | Self::FailedToJoinGame(err)
            | Self::FailedToEstablishConnectionWithPeer(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error().is_some()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NeedToConnectToCentralServer => "NeedToConnectToCentralServer",
            Self::ConnectedToCentralServer => "ConnectedToCentralServer",
            Self::NeedToCreateNewGame => "NeedToCreateNewGame",
            Self::CreatedNewGame { .. } => "CreatedNewGame",
            Self::NeedToJoinGame { .. } => "NeedToJoinGame",
            Self::JoinedGame { .. } => "JoinedGame",
            Self::NeedToAcceptConnectionFromExpectedPeer { .. } => {
                "NeedToAcceptConnectionFromExpectedPeer"
            }
            Self::NeedToConnectToPeer { .. } => "NeedToConnectToPeer",
            Self::EstablishedConnectionWithPeer { .. } => "EstablishedConnectionWithPeer",
            Self::FailedToConnectToCentralServer(_) => "FailedToConnectToCentralServer",
            Self::FailedToCreateNewGame(_) => "FailedToCreateNewGame",
            Self::FailedToJoinGame(_) => "FailedToJoinGame",
            Self::FailedToEstablishConnectionWithPeer(_) => "FailedToEstablishConnectionWithPeer",
            Self::NeedToExit => "NeedToExit",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
