//! The rendezvous driver.
//!
//! [`Rendezvous::step`] takes the current [`State`] by value and returns the
//! next one. Each state has one handler; handlers talk to the network
//! through the client socket the driver owns and to the user through the
//! [`UserInteraction`] collaborator.
//!
//! # Role fallback
//!
//! After matchmaking the creator first tries to *accept* the joiner and the
//! joiner first tries to *connect* to the creator. Whichever role fails is
//! swapped for the other one exactly once; the `tried_*` flag in the state
//! records that the swap has happened, and a second failure is final.
//! Only a timeout or a connection from the wrong address triggers the swap
//! away from accepting; an OS-level listen or accept error is final.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use duelnet_protocol::{
    CreateNewGameRequest, CreateNewGameResponse, GameId, JoinGameRequest, JoinGameResponse,
    JoinGameResult, Message, SocketAddress,
};
use duelnet_transport::{AcceptError, ConnectError, TcpAcceptor, TcpClient};

use crate::{AfterPeer, ClientConfig, ErrorState, Intent, RendezvousError, State, UserInteraction};

/// Drives one client through matchmaking and peer connection.
pub struct Rendezvous<U> {
    config: ClientConfig,
    user: U,
    /// The socket bound to `own_endpoint`. Taken out while a handler
    /// repurposes it, and rebound on demand after it has been handed to
    /// the peer link.
    socket: Option<TcpClient>,
}

impl<U: UserInteraction> Rendezvous<U> {
    /// Binds the client socket to `config.own_endpoint`.
    pub fn new(config: ClientConfig, user: U) -> Result<Self, RendezvousError> {
        let socket = TcpClient::bind_to(&config.own_endpoint).map_err(RendezvousError::Bind)?;
        Ok(Self {
            config,
            user,
            socket: Some(socket),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn user(&self) -> &U {
        &self.user
    }

    pub fn into_user(self) -> U {
        self.user
    }

    /// Steps until a terminal state is reached and returns it. Failures are
    /// reported to the user first.
    pub fn run(&mut self, mut state: State) -> State {
        while !state.is_terminal() {
            state = self.step(state);
        }
        if let Some(error) = state.error() {
            tracing::warn!(state = state.name(), %error, "rendezvous failed");
            self.user.report_failure(&state, error);
        }
        state
    }

    /// Performs one transition. Terminal states are returned unchanged.
    pub fn step(&mut self, state: State) -> State {
        let from = state.name();
        let next = match state {
            State::NeedToConnectToCentralServer => self.connect_to_central_server(),
            State::ConnectedToCentralServer => self.choose_intent(),
            State::NeedToCreateNewGame => self.create_new_game(),
            State::NeedToJoinGame { game_id } => self.join_game(game_id),
            State::CreatedNewGame { .. } => self.wait_for_peer_address(true),
            State::JoinedGame { .. } => self.wait_for_peer_address(false),
            State::NeedToAcceptConnectionFromExpectedPeer {
                peer,
                tried_connect_already,
            } => self.accept_peer(peer, tried_connect_already),
            State::NeedToConnectToPeer {
                peer,
                tried_accept_already,
            } => self.connect_to_peer(peer, tried_accept_already),
            State::EstablishedConnectionWithPeer { mut link } => {
                match self.user.peer_connected(&mut link) {
                    AfterPeer::PlayAgain => State::NeedToConnectToCentralServer,
                    AfterPeer::Exit => State::NeedToExit,
                }
            }
            terminal => terminal,
        };
        tracing::debug!(from, to = next.name(), "state transition");
        next
    }

    // -----------------------------------------------------------------------
    // Central server
    // -----------------------------------------------------------------------

    fn connect_to_central_server(&mut self) -> State {
        let mut socket = match self.take_socket() {
            Ok(socket) => socket,
            Err(error) => return State::FailedToConnectToCentralServer(error),
        };
        let endpoint = self.config.central_server.clone();
        match socket.connect(&endpoint, self.config.connect_timeout) {
            Ok(()) => {
                tracing::info!(%endpoint, "connected to central server");
                self.socket = Some(socket);
                State::ConnectedToCentralServer
            }
            Err(err) => State::FailedToConnectToCentralServer(
                ErrorState::new(err.to_string())
                    .with_hint(format!("Make sure the central server is running at {endpoint}")),
            ),
        }
    }

    fn choose_intent(&mut self) -> State {
        match self.user.choose_intent() {
            Intent::CreateNewGame => State::NeedToCreateNewGame,
            Intent::JoinGame(game_id) => State::NeedToJoinGame { game_id },
            Intent::Quit => State::NeedToExit,
        }
    }

    fn create_new_game(&mut self) -> State {
        let response = match self.request::<_, CreateNewGameResponse>(&CreateNewGameRequest) {
            Ok(response) => response,
            Err(error) => return State::FailedToCreateNewGame(error),
        };
        match response {
            CreateNewGameResponse::Created(game_id) => {
                tracing::info!(%game_id, "created new game");
                self.user.game_created(game_id, self.config.peer_join_timeout);
                State::CreatedNewGame { game_id }
            }
            CreateNewGameResponse::Failed(err) => State::FailedToCreateNewGame(
                ErrorState::new(format!("The server could not create a game: {err}"))
                    .with_hint("Try again in a few minutes"),
            ),
        }
    }

    fn join_game(&mut self, game_id: GameId) -> State {
        let response = match self.request::<_, JoinGameResponse>(&JoinGameRequest { game_id }) {
            Ok(response) => response,
            Err(error) => return State::FailedToJoinGame(error),
        };
        match response.result {
            JoinGameResult::Success => {
                tracing::info!(%game_id, "joined game");
                State::JoinedGame { game_id }
            }
            JoinGameResult::GameIdDoesNotExist => State::FailedToJoinGame(
                ErrorState::new(format!("Game id [{game_id}] does not exist on the server"))
                    .with_hint("Check the game id with the player who created the game"),
            ),
            JoinGameResult::GameAlreadyHasTwoPlayers => State::FailedToJoinGame(
                ErrorState::new(format!("Game id [{game_id}] already has two players"))
                    .with_hint("Create a new game instead"),
            ),
        }
    }

    /// Waits for the central server to relay the other player's address.
    ///
    /// The creator waits as long as a joiner may take to show up; the
    /// joiner gets the address right after its join succeeded.
    fn wait_for_peer_address(&mut self, creator: bool) -> State {
        let timeout = if creator {
            self.config.peer_join_timeout
        } else {
            self.config.request_timeout
        };
        let Some(socket) = self.socket.as_mut() else {
            return State::FailedToEstablishConnectionWithPeer(not_connected());
        };
        match socket.receive::<SocketAddress>(timeout) {
            Ok(SocketAddress(peer)) => {
                tracing::info!(%peer, creator, "received peer address");
                if creator {
                    State::NeedToAcceptConnectionFromExpectedPeer {
                        peer,
                        tried_connect_already: false,
                    }
                } else {
                    State::NeedToConnectToPeer {
                        peer,
                        tried_accept_already: false,
                    }
                }
            }
            Err(err) => State::FailedToEstablishConnectionWithPeer(
                ErrorState::new(format!("Did not receive the other player's address: {err}"))
                    .with_hint(if creator {
                        "Nobody joined in time; create a new game and share its id again"
                    } else {
                        "The central server did not answer; try joining again"
                    }),
            ),
        }
    }

    /// One request/response exchange with the central server.
    fn request<Req: Message, Resp: Message>(&mut self, request: &Req) -> Result<Resp, ErrorState> {
        let timeout = self.config.request_timeout;
        let socket = self.socket.as_mut().ok_or_else(not_connected)?;
        socket.send(request, timeout).map_err(|err| {
            ErrorState::new(format!("Failed to send {}: {err}", Req::KIND))
                .with_hint("Check the connection to the central server")
        })?;
        socket.receive::<Resp>(timeout).map_err(|err| {
            ErrorState::new(format!("Failed to receive {}: {err}", Resp::KIND))
                .with_hint("The central server may be overloaded or running another protocol version")
        })
    }

    // -----------------------------------------------------------------------
    // Peer link
    // -----------------------------------------------------------------------

    fn accept_peer(&mut self, peer: SocketAddr, tried_connect_already: bool) -> State {
        let socket = match self.take_socket() {
            Ok(socket) => socket,
            Err(error) => return State::FailedToEstablishConnectionWithPeer(error),
        };

        let acceptor = match TcpAcceptor::from_client(socket) {
            Ok(acceptor) => acceptor,
            Err(err) => return peer_unreachable(peer, &err),
        };

        let err = match acceptor.accept_expected_peer(peer, self.config.peer_accept_timeout) {
            Ok(link) => {
                tracing::info!(%peer, "peer connected to us");
                return State::EstablishedConnectionWithPeer { link };
            }
            Err(err @ AcceptError::System(_)) => return peer_unreachable(peer, &err),
            Err(err) => err,
        };

        if tried_connect_already {
            return peer_unreachable(peer, &err);
        }
        // Keep the bound socket for the connector role.
        match acceptor.into_client() {
            Ok(client) => self.socket = Some(client),
            Err(into_err) => tracing::debug!(%into_err, "dropping acceptor"),
        }
        tracing::info!(%peer, %err, "accepting failed, trying to connect instead");
        State::NeedToConnectToPeer {
            peer,
            tried_accept_already: true,
        }
    }

    fn connect_to_peer(&mut self, peer: SocketAddr, tried_accept_already: bool) -> State {
        let mut socket = match self.take_socket() {
            Ok(socket) => socket,
            Err(error) => return State::FailedToEstablishConnectionWithPeer(error),
        };

        match dial(
            &mut socket,
            peer,
            self.config.peer_connect_timeout,
            self.config.connect_retry_interval,
        ) {
            Ok(()) => {
                tracing::info!(%peer, "connected to peer");
                State::EstablishedConnectionWithPeer { link: socket }
            }
            Err(err) => {
                if tried_accept_already {
                    return State::FailedToEstablishConnectionWithPeer(
                        ErrorState::new(format!("Could not connect to {peer}: {err}"))
                            .with_hint("Both players must be able to reach each other directly"),
                    );
                }
                if let Err(disconnect_err) = socket.disconnect() {
                    tracing::debug!(%disconnect_err, "dropping client socket");
                } else {
                    self.socket = Some(socket);
                }
                tracing::info!(%peer, %err, "connecting failed, trying to accept instead");
                State::NeedToAcceptConnectionFromExpectedPeer {
                    peer,
                    tried_connect_already: true,
                }
            }
        }
    }

    /// The bound client socket, or a freshly bound one if it was given away.
    fn take_socket(&mut self) -> Result<TcpClient, ErrorState> {
        if let Some(socket) = self.socket.take() {
            return Ok(socket);
        }
        TcpClient::bind_to(&self.config.own_endpoint).map_err(|err| {
            ErrorState::new(format!(
                "Failed to bind to {}: {err}",
                self.config.own_endpoint
            ))
            .with_hint("Another program may be using this port")
        })
    }
}

/// Dials `peer`, retrying while it refuses (it may not be listening yet),
/// until `budget` is spent.
fn dial(
    socket: &mut TcpClient,
    peer: SocketAddr,
    budget: Duration,
    retry_interval: Duration,
) -> Result<(), ConnectError> {
    let start = Instant::now();
    // Leaves the central server connection, if any.
    socket.disconnect()?;
    loop {
        let remaining = budget.saturating_sub(start.elapsed());
        match socket.connect_addr(peer, remaining) {
            Ok(()) => return Ok(()),
            Err(err) if err.is_refused() && start.elapsed() + retry_interval < budget => {
                tracing::debug!(%peer, "peer refused, retrying");
                socket.disconnect()?;
                thread::sleep(retry_interval);
            }
            Err(err) => return Err(err),
        }
    }
}

fn peer_unreachable(peer: SocketAddr, err: &dyn std::fmt::Display) -> State {
    State::FailedToEstablishConnectionWithPeer(
        ErrorState::new(format!("Could not accept a connection from {peer}: {err}"))
            .with_hint("Both players must be able to reach each other directly"),
    )
}

fn not_connected() -> ErrorState {
    ErrorState::new("Not connected to the central server")
        .with_hint("Connect to the central server first")
}
