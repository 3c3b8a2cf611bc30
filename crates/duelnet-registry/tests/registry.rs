//! Integration tests for the game registry: capacity and join rules.

use duelnet_protocol::{CreateNewGameError, GameId, JoinGameResult, PlayerId};
use duelnet_registry::{CreateGameError, GameRegistry, JoinGameError, RegistryConfig};

fn registry() -> GameRegistry {
    GameRegistry::new(RegistryConfig {
        seed: Some(42),
        ..Default::default()
    })
}

// =========================================================================
// Capacity
// =========================================================================

#[test]
fn test_create_game_beyond_capacity_fails_closed() {
    let mut registry = registry();
    assert_eq!(registry.capacity(), 100);

    for n in 0..100 {
        registry.create_game(PlayerId(n)).unwrap();
    }
    let err = registry.create_game(PlayerId(100)).unwrap_err();

    assert_eq!(err, CreateGameError::RegistryFull { capacity: 100 });
    assert_eq!(
        CreateNewGameError::from(err),
        CreateNewGameError::NoAvailableSpaceInGameDb
    );
    assert_eq!(registry.len(), 100);
}

#[test]
fn test_create_game_after_removal_succeeds_again() {
    let mut registry = GameRegistry::new(RegistryConfig {
        capacity: 1,
        seed: Some(1),
        ..Default::default()
    });
    let first = registry.create_game(PlayerId(1)).unwrap();
    assert!(registry.create_game(PlayerId(2)).is_err());

    registry.remove_game(first);
    assert!(registry.create_game(PlayerId(2)).is_ok());
}

// =========================================================================
// Joining
// =========================================================================

#[test]
fn test_add_player_to_unknown_game_reports_missing() {
    let mut registry = registry();
    let err = registry.add_player(GameId(12345), PlayerId(1)).unwrap_err();

    assert_eq!(err, JoinGameError::GameNotFound(GameId(12345)));
    assert_eq!(JoinGameResult::from(err), JoinGameResult::GameIdDoesNotExist);
}

#[test]
fn test_add_player_to_game_with_one_player_succeeds() {
    let mut registry = registry();
    let id = registry.create_game(PlayerId(1)).unwrap();

    registry.add_player(id, PlayerId(2)).unwrap();

    let entry = registry.get(id).unwrap();
    assert_eq!(entry.joiner, Some(PlayerId(2)));
    assert_eq!(entry.player_count(), 2);
}

#[test]
fn test_add_player_to_full_game_is_rejected() {
    let mut registry = registry();
    let id = registry.create_game(PlayerId(1)).unwrap();
    registry.add_player(id, PlayerId(2)).unwrap();

    let err = registry.add_player(id, PlayerId(3)).unwrap_err();

    assert_eq!(err, JoinGameError::GameAlreadyHasTwoPlayers(id));
    assert_eq!(
        JoinGameResult::from(err),
        JoinGameResult::GameAlreadyHasTwoPlayers
    );
    // The original joiner is kept.
    assert_eq!(registry.get(id).unwrap().joiner, Some(PlayerId(2)));
}
