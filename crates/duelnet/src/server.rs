//! `CentralServer` builder and accept loop.
//!
//! This is the matchmaking side of Duelnet. It owns the game registry and
//! the lobby of creators waiting for a joiner; each accepted connection is
//! served by its own Tokio task running [`handle_connection`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use duelnet_protocol::{GameId, PlayerId};
use duelnet_registry::GameRegistry;
use duelnet_transport::{Endpoint, TcpServer, canonical_addr};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

use crate::handler::handle_connection;
use crate::{DuelnetError, ServerConfig};

/// A creator parked until somebody joins its game.
pub(crate) struct Waiting {
    /// The creator's address as the server sees it.
    pub(crate) creator: SocketAddr,
    /// Wakes the creator's task with the joiner's address.
    pub(crate) notify: oneshot::Sender<SocketAddr>,
}

/// Registry plus waiting creators. Always locked as a whole so a join
/// sees a game and its creator together.
pub(crate) struct Lobby {
    pub(crate) registry: GameRegistry,
    pub(crate) waiting: HashMap<GameId, Waiting>,
}

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) lobby: Mutex<Lobby>,
    next_player: AtomicU64,
}

impl ServerState {
    /// Each connection is one player.
    pub(crate) fn next_player_id(&self) -> PlayerId {
        PlayerId(self.next_player.fetch_add(1, Ordering::Relaxed))
    }
}

/// Builder for configuring and starting a [`CentralServer`].
///
/// # Example
///
/// ```rust,ignore
/// let server = CentralServer::builder()
///     .bind(Endpoint::any_v4(60001))
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Default)]
pub struct CentralServerBuilder {
    config: ServerConfig,
}

impl CentralServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to listen on, overriding the config's `bind`.
    pub fn bind(mut self, endpoint: Endpoint) -> Self {
        self.config.bind = endpoint;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listening socket and hands it to Tokio.
    pub async fn build(self) -> Result<CentralServer, DuelnetError> {
        let server = TcpServer::bind(&self.config.bind)?;
        server.listen()?;
        let listener = TcpListener::from_std(server.into_std())?;

        let state = Arc::new(ServerState {
            lobby: Mutex::new(Lobby {
                registry: GameRegistry::new(self.config.registry.clone()),
                waiting: HashMap::new(),
            }),
            config: self.config,
            next_player: AtomicU64::new(1),
        });

        Ok(CentralServer { listener, state })
    }
}

/// A bound central server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CentralServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl CentralServer {
    pub fn builder() -> CentralServerBuilder {
        CentralServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), DuelnetError> {
        tracing::info!(addr = ?self.local_addr().ok(), "central server running");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let peer = canonical_addr(peer);
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, state).await {
                            tracing::debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
