//! Error types for the registry.
//!
//! One enum per operation, so that every variant has a wire counterpart
//! and the `From` conversions below are total.

use duelnet_protocol::{CreateNewGameError, GameId, JoinGameResult};

/// Why [`create_game`](crate::GameRegistry::create_game) refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CreateGameError {
    #[error("game registry is full ({capacity} games)")]
    RegistryFull { capacity: usize },
}

/// Why [`add_player`](crate::GameRegistry::add_player) refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinGameError {
    #[error("game {0} does not exist")]
    GameNotFound(GameId),

    #[error("game {0} already has two players")]
    GameAlreadyHasTwoPlayers(GameId),
}

impl From<CreateGameError> for CreateNewGameError {
    fn from(err: CreateGameError) -> Self {
        match err {
            CreateGameError::RegistryFull { .. } => Self::NoAvailableSpaceInGameDb,
        }
    }
}

impl From<JoinGameError> for JoinGameResult {
    fn from(err: JoinGameError) -> Self {
        match err {
            JoinGameError::GameNotFound(_) => Self::GameIdDoesNotExist,
            JoinGameError::GameAlreadyHasTwoPlayers(_) => Self::GameAlreadyHasTwoPlayers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_game_error_maps_to_wire_result() {
        assert_eq!(
            JoinGameResult::from(JoinGameError::GameNotFound(GameId(1))),
            JoinGameResult::GameIdDoesNotExist
        );
        assert_eq!(
            JoinGameResult::from(JoinGameError::GameAlreadyHasTwoPlayers(GameId(1))),
            JoinGameResult::GameAlreadyHasTwoPlayers
        );
    }

    #[test]
    fn test_create_game_error_maps_to_wire_error() {
        assert_eq!(
            CreateNewGameError::from(CreateGameError::RegistryFull { capacity: 3 }),
            CreateNewGameError::NoAvailableSpaceInGameDb
        );
    }
}
