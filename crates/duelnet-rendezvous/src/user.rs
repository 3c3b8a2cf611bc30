//! The user-interaction boundary of the state machine.

use std::time::Duration;

use duelnet_protocol::GameId;
use duelnet_transport::TcpClient;

use crate::{ErrorState, State};

/// What the user wants to do once connected to the central server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CreateNewGame,
    JoinGame(GameId),
    /// Leave without playing (e.g. end of input).
    Quit,
}

/// What to do after a game over the direct link is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterPeer {
    /// Go back to the central server for another game.
    PlayAgain,
    Exit,
}

/// Everything the state machine needs from a human (or a test script).
///
/// Only [`choose_intent`](Self::choose_intent) and
/// [`peer_connected`](Self::peer_connected) decide anything; the other
/// methods are notifications with empty defaults.
pub trait UserInteraction {
    /// Called in `ConnectedToCentralServer`.
    fn choose_intent(&mut self) -> Intent;

    /// A game was created; the user should pass `game_id` to the other
    /// player, who has `wait` to join.
    fn game_created(&mut self, game_id: GameId, wait: Duration) {
        let _ = (game_id, wait);
    }

    /// The direct link is up. This is where gameplay would happen.
    fn peer_connected(&mut self, link: &mut TcpClient) -> AfterPeer;

    /// A run ended in a failure state.
    fn report_failure(&mut self, state: &State, error: &ErrorState) {
        let _ = (state, error);
    }
}
