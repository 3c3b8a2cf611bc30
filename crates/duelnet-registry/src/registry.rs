//! The game registry.

use std::collections::HashMap;
use std::time::Instant;

use duelnet_protocol::{GameId, PlayerId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{CreateGameError, JoinGameError, RegistryConfig};

/// Who is in a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEntry {
    /// The player who created the game.
    pub creator: PlayerId,
    /// The player who joined it, once somebody has.
    pub joiner: Option<PlayerId>,
    pub created_at: Instant,
}

impl GameEntry {
    pub fn player_count(&self) -> usize {
        1 + usize::from(self.joiner.is_some())
    }

    pub fn is_full(&self) -> bool {
        self.joiner.is_some()
    }
}

/// Capacity-bounded map of live games.
///
/// Ids come from a [`StdRng`]: unpredictable by default, deterministic
/// when [`RegistryConfig::seed`] is set. A generated id that is already in
/// use is simply drawn again.
#[derive(Debug)]
pub struct GameRegistry {
    config: RegistryConfig,
    games: HashMap<GameId, GameEntry>,
    rng: StdRng,
}

impl GameRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            games: HashMap::with_capacity(config.capacity),
            config,
            rng,
        }
    }

    /// Allocates a fresh id for a game created by `creator`.
    ///
    /// Expired games are dropped first. Fails closed when the registry is
    /// still at capacity after that.
    pub fn create_game(&mut self, creator: PlayerId) -> Result<GameId, CreateGameError> {
        self.expire_stale();
        if self.games.len() >= self.config.capacity {
            tracing::warn!(capacity = self.config.capacity, %creator, "game registry full");
            return Err(CreateGameError::RegistryFull {
                capacity: self.config.capacity,
            });
        }

        let game_id = loop {
            let candidate = GameId(self.rng.random());
            if !self.games.contains_key(&candidate) {
                break candidate;
            }
        };

        self.games.insert(
            game_id,
            GameEntry {
                creator,
                joiner: None,
                created_at: Instant::now(),
            },
        );
        tracing::info!(%game_id, %creator, "game created");
        Ok(game_id)
    }

    /// Adds `player` as the second player of `game_id`.
    pub fn add_player(&mut self, game_id: GameId, player: PlayerId) -> Result<(), JoinGameError> {
        let entry = self
            .games
            .get_mut(&game_id)
            .ok_or(JoinGameError::GameNotFound(game_id))?;
        if entry.is_full() {
            return Err(JoinGameError::GameAlreadyHasTwoPlayers(game_id));
        }
        entry.joiner = Some(player);
        tracing::info!(%game_id, %player, "player joined game");
        Ok(())
    }

    /// Forgets a game. Returns whether it existed.
    pub fn remove_game(&mut self, game_id: GameId) -> bool {
        let removed = self.games.remove(&game_id).is_some();
        if removed {
            tracing::debug!(%game_id, "game removed");
        }
        removed
    }

    /// Drops every game older than the configured time-to-live.
    pub fn expire_stale(&mut self) -> Vec<GameId> {
        self.expire_stale_at(Instant::now())
    }

    /// [`expire_stale`](Self::expire_stale) with an explicit "now".
    pub fn expire_stale_at(&mut self, now: Instant) -> Vec<GameId> {
        let ttl = self.config.game_ttl;
        let expired: Vec<GameId> = self
            .games
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.created_at) > ttl)
            .map(|(id, _)| *id)
            .collect();
        for game_id in &expired {
            self.games.remove(game_id);
            tracing::info!(%game_id, "game expired");
        }
        expired
    }

    pub fn get(&self, game_id: GameId) -> Option<&GameEntry> {
        self.games.get(&game_id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }
}
