//! Integration tests for the rendezvous state machine.
//!
//! The central server is faked by a worker thread that accepts one
//! connection and follows a script, so every server answer (including
//! malformed ones) can be produced on demand.

use std::collections::VecDeque;
use std::net::{SocketAddr, TcpListener};
use std::os::fd::AsFd;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use duelnet_protocol::{
    CreateNewGameError, CreateNewGameRequest, CreateNewGameResponse, GameId, JoinGameRequest,
    JoinGameResponse, JoinGameResult, MessageType, SocketAddress,
};
use duelnet_rendezvous::{AfterPeer, ClientConfig, ErrorState, Intent, Rendezvous, State, UserInteraction};
use duelnet_transport::io::wait_readable;
use duelnet_transport::{AcceptOutcome, Endpoint, TcpClient, TcpServer};

const TIMEOUT: Duration = Duration::from_secs(2);

// =========================================================================
// Helpers
// =========================================================================

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn config(central_port: u16) -> ClientConfig {
    ClientConfig {
        central_server: Endpoint::loopback_v4(central_port),
        own_endpoint: Endpoint::loopback_v4(free_port()),
        connect_timeout: TIMEOUT,
        request_timeout: TIMEOUT,
        peer_join_timeout: TIMEOUT,
        peer_accept_timeout: Duration::from_millis(200),
        peer_connect_timeout: Duration::from_millis(300),
        connect_retry_interval: Duration::from_millis(20),
    }
}

/// A user that follows a fixed list of intents and records what it was
/// told.
#[derive(Default)]
struct ScriptedUser {
    intents: VecDeque<Intent>,
    after_peer: Option<AfterPeer>,
    created: Vec<GameId>,
    peers: Vec<SocketAddr>,
    failures: Vec<String>,
}

impl ScriptedUser {
    fn with_intents(intents: impl IntoIterator<Item = Intent>) -> Self {
        Self {
            intents: intents.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl UserInteraction for ScriptedUser {
    fn choose_intent(&mut self) -> Intent {
        self.intents.pop_front().unwrap_or(Intent::Quit)
    }

    fn game_created(&mut self, game_id: GameId, _wait: Duration) {
        self.created.push(game_id);
    }

    fn peer_connected(&mut self, link: &mut TcpClient) -> AfterPeer {
        self.peers.push(link.peer_addr().unwrap());
        self.after_peer.unwrap_or(AfterPeer::Exit)
    }

    fn report_failure(&mut self, state: &State, error: &ErrorState) {
        self.failures.push(format!("{state}: {error}"));
    }
}

/// Starts a fake central server that accepts one connection and hands it
/// to `script`. Returns its port and the worker thread.
fn fake_central<F>(script: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(TcpClient) + Send + 'static,
{
    let server = TcpServer::bind(&Endpoint::loopback_v4(0)).unwrap();
    server.listen().unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        loop {
            assert!(wait_readable(server.as_fd(), TIMEOUT).unwrap(), "client never came");
            if let AcceptOutcome::Accepted(id) = server.accept().unwrap() {
                script(id.client);
                return;
            }
        }
    });
    (port, handle)
}

// =========================================================================
// Central server phase
// =========================================================================

#[test]
fn test_run_without_central_server_fails_to_connect() {
    let mut machine = Rendezvous::new(config(free_port()), ScriptedUser::default()).unwrap();

    let end = machine.run(State::NeedToConnectToCentralServer);

    assert!(matches!(end, State::FailedToConnectToCentralServer(_)), "{end:?}");
    let error = end.error().unwrap();
    assert!(error.hint.as_deref().unwrap().contains("central server"));
    assert_eq!(machine.user().failures.len(), 1);
}

#[test]
fn test_run_quit_intent_exits_cleanly() {
    let (port, server) = fake_central(|_client| {});
    let mut machine = Rendezvous::new(config(port), ScriptedUser::default()).unwrap();

    let end = machine.run(State::NeedToConnectToCentralServer);

    assert!(matches!(end, State::NeedToExit), "{end:?}");
    assert!(machine.user().failures.is_empty());
    server.join().unwrap();
}

#[test]
fn test_step_create_new_game_reaches_created_state() {
    let (port, server) = fake_central(|mut client| {
        let _: CreateNewGameRequest = client.receive(TIMEOUT).unwrap();
        client
            .send(&CreateNewGameResponse::Created(GameId(77)), TIMEOUT)
            .unwrap();
    });
    let user = ScriptedUser::with_intents([Intent::CreateNewGame]);
    let mut machine = Rendezvous::new(config(port), user).unwrap();

    let state = machine.step(State::NeedToConnectToCentralServer);
    assert!(matches!(state, State::ConnectedToCentralServer));
    let state = machine.step(state);
    assert!(matches!(state, State::NeedToCreateNewGame));
    let state = machine.step(state);

    assert!(
        matches!(state, State::CreatedNewGame { game_id: GameId(77) }),
        "{state:?}"
    );
    assert_eq!(machine.user().created, vec![GameId(77)]);
    server.join().unwrap();
}

#[test]
fn test_run_create_new_game_when_server_full_fails() {
    let (port, server) = fake_central(|mut client| {
        let _: CreateNewGameRequest = client.receive(TIMEOUT).unwrap();
        let full = CreateNewGameResponse::Failed(CreateNewGameError::NoAvailableSpaceInGameDb);
        client.send(&full, TIMEOUT).unwrap();
    });
    let user = ScriptedUser::with_intents([Intent::CreateNewGame]);
    let mut machine = Rendezvous::new(config(port), user).unwrap();

    let end = machine.run(State::NeedToConnectToCentralServer);

    assert!(matches!(end, State::FailedToCreateNewGame(_)), "{end:?}");
    assert!(end.error().unwrap().description.contains("no available space"));
    server.join().unwrap();
}

#[test]
fn test_run_join_unknown_game_fails_with_game_id_in_message() {
    let (port, server) = fake_central(|mut client| {
        let request: JoinGameRequest = client.receive(TIMEOUT).unwrap();
        assert_eq!(request.game_id, GameId(12345));
        let response = JoinGameResponse {
            result: JoinGameResult::GameIdDoesNotExist,
        };
        client.send(&response, TIMEOUT).unwrap();
    });
    let user = ScriptedUser::with_intents([Intent::JoinGame(GameId(12345))]);
    let mut machine = Rendezvous::new(config(port), user).unwrap();

    let end = machine.run(State::NeedToConnectToCentralServer);

    assert!(matches!(end, State::FailedToJoinGame(_)), "{end:?}");
    assert!(end.error().unwrap().description.contains("[12345]"));
    server.join().unwrap();
}

#[test]
fn test_run_join_with_unknown_result_code_fails() {
    let (port, server) = fake_central(|mut client| {
        let _: JoinGameRequest = client.receive(TIMEOUT).unwrap();
        client
            .send_bytes(&[MessageType::JoinGameResponse.as_u8(), 200], TIMEOUT)
            .unwrap();
    });
    let user = ScriptedUser::with_intents([Intent::JoinGame(GameId(1))]);
    let mut machine = Rendezvous::new(config(port), user).unwrap();

    let end = machine.run(State::NeedToConnectToCentralServer);

    let error = end.error().unwrap();
    assert!(error.description.contains("unknown result code"), "{error}");
    assert!(error.description.contains("200"), "{error}");
    server.join().unwrap();
}

#[test]
fn test_step_joined_game_receives_peer_address() {
    let peer = loopback(45678);
    let (port, server) = fake_central(move |mut client| {
        let _: JoinGameRequest = client.receive(TIMEOUT).unwrap();
        let response = JoinGameResponse {
            result: JoinGameResult::Success,
        };
        client.send(&response, TIMEOUT).unwrap();
        client.send(&SocketAddress(peer), TIMEOUT).unwrap();
    });
    let user = ScriptedUser::with_intents([Intent::JoinGame(GameId(5))]);
    let mut machine = Rendezvous::new(config(port), user).unwrap();

    let mut state = State::NeedToConnectToCentralServer;
    for _ in 0..4 {
        state = machine.step(state);
    }

    match state {
        State::NeedToConnectToPeer {
            peer: got,
            tried_accept_already,
        } => {
            assert_eq!(got, peer);
            assert!(!tried_accept_already);
        }
        other => panic!("expected NeedToConnectToPeer, got {other:?}"),
    }
    server.join().unwrap();
}

// =========================================================================
// Peer phase
// =========================================================================

#[test]
fn test_step_connect_to_listening_peer_establishes_link() {
    let peer_server = TcpServer::bind(&Endpoint::loopback_v4(0)).unwrap();
    peer_server.listen().unwrap();
    let peer = peer_server.local_addr().unwrap();
    let mut machine = Rendezvous::new(config(free_port()), ScriptedUser::default()).unwrap();

    let state = machine.step(State::NeedToConnectToPeer {
        peer,
        tried_accept_already: false,
    });

    assert!(
        matches!(state, State::EstablishedConnectionWithPeer { .. }),
        "{state:?}"
    );
    let state = machine.step(state);
    assert!(matches!(state, State::NeedToExit));
    assert_eq!(machine.user().peers, vec![peer]);
}

#[test]
fn test_step_connect_to_late_listener_retries_until_it_listens() {
    let peer = loopback(free_port());
    let late = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        let server = TcpServer::bind(&Endpoint::from(peer)).unwrap();
        server.listen().unwrap();
        // Keep the listener open until the client has connected.
        assert!(wait_readable(server.as_fd(), TIMEOUT).unwrap());
    });
    let mut machine = Rendezvous::new(config(free_port()), ScriptedUser::default()).unwrap();

    let state = machine.step(State::NeedToConnectToPeer {
        peer,
        tried_accept_already: false,
    });

    assert!(
        matches!(state, State::EstablishedConnectionWithPeer { .. }),
        "{state:?}"
    );
    late.join().unwrap();
}

#[test]
fn test_step_accept_from_expected_peer_establishes_link() {
    let config = config(free_port());
    let own = config.own_endpoint.resolve().unwrap();
    let peer_addr = loopback(free_port());
    let mut machine = Rendezvous::new(config, ScriptedUser::default()).unwrap();

    let dialer = thread::spawn(move || {
        let mut peer = TcpClient::bind_to(&Endpoint::from(peer_addr)).unwrap();
        for _ in 0..50 {
            if peer.connect_addr(own, TIMEOUT).is_ok() {
                return peer;
            }
            peer.disconnect().unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        panic!("could not reach the acceptor");
    });

    let state = machine.step(State::NeedToAcceptConnectionFromExpectedPeer {
        peer: peer_addr,
        tried_connect_already: false,
    });

    assert!(
        matches!(state, State::EstablishedConnectionWithPeer { .. }),
        "{state:?}"
    );
    let _peer = dialer.join().unwrap();
}

#[test]
fn test_step_accept_timeout_falls_back_to_connect_once() {
    let peer = loopback(free_port());
    let mut machine = Rendezvous::new(config(free_port()), ScriptedUser::default()).unwrap();

    let state = machine.step(State::NeedToAcceptConnectionFromExpectedPeer {
        peer,
        tried_connect_already: false,
    });

    match state {
        State::NeedToConnectToPeer {
            peer: got,
            tried_accept_already,
        } => {
            assert_eq!(got, peer);
            assert!(tried_accept_already);
        }
        other => panic!("expected NeedToConnectToPeer, got {other:?}"),
    }

    // Nobody listens at `peer` either: the second role fails for good.
    let state = machine.step(state);
    assert!(
        matches!(state, State::FailedToEstablishConnectionWithPeer(_)),
        "{state:?}"
    );
}

#[test]
fn test_step_accept_from_wrong_address_falls_back_to_connect() {
    let config = config(free_port());
    let own = config.own_endpoint.resolve().unwrap();
    let expected = loopback(free_port());
    let stranger_addr = loopback(free_port());
    let mut machine = Rendezvous::new(config, ScriptedUser::default()).unwrap();

    let stranger = thread::spawn(move || {
        let mut stranger = TcpClient::bind_to(&Endpoint::from(stranger_addr)).unwrap();
        for _ in 0..50 {
            if stranger.connect_addr(own, TIMEOUT).is_ok() {
                return stranger;
            }
            stranger.disconnect().unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        panic!("could not reach the acceptor");
    });

    let state = machine.step(State::NeedToAcceptConnectionFromExpectedPeer {
        peer: expected,
        tried_connect_already: false,
    });

    match state {
        State::NeedToConnectToPeer {
            peer,
            tried_accept_already,
        } => {
            assert_eq!(peer, expected);
            assert!(tried_accept_already);
        }
        other => panic!("expected NeedToConnectToPeer, got {other:?}"),
    }
    let _stranger = stranger.join().unwrap();
}

#[test]
fn test_step_accept_from_wrong_address_after_connect_failed_is_final() {
    let config = config(free_port());
    let own = config.own_endpoint.resolve().unwrap();
    let expected = loopback(free_port());
    let stranger_addr = loopback(free_port());
    let mut machine = Rendezvous::new(config, ScriptedUser::default()).unwrap();

    let stranger = thread::spawn(move || {
        let mut stranger = TcpClient::bind_to(&Endpoint::from(stranger_addr)).unwrap();
        for _ in 0..50 {
            if stranger.connect_addr(own, TIMEOUT).is_ok() {
                return stranger;
            }
            stranger.disconnect().unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        panic!("could not reach the acceptor");
    });

    let state = machine.step(State::NeedToAcceptConnectionFromExpectedPeer {
        peer: expected,
        tried_connect_already: true,
    });

    match state {
        State::FailedToEstablishConnectionWithPeer(error) => {
            assert!(error.description.contains(&stranger_addr.to_string()), "{error:?}");
        }
        other => panic!("expected FailedToEstablishConnectionWithPeer, got {other:?}"),
    }
    let _stranger = stranger.join().unwrap();
}

#[test]
fn test_step_connect_failure_falls_back_to_accept_once() {
    let peer = loopback(free_port());
    let mut machine = Rendezvous::new(config(free_port()), ScriptedUser::default()).unwrap();

    let state = machine.step(State::NeedToConnectToPeer {
        peer,
        tried_accept_already: false,
    });
    match state {
        State::NeedToAcceptConnectionFromExpectedPeer {
            tried_connect_already,
            ..
        } => assert!(tried_connect_already),
        ref other => panic!("expected NeedToAcceptConnectionFromExpectedPeer, got {other:?}"),
    }

    let state = machine.step(state);
    assert!(
        matches!(state, State::FailedToEstablishConnectionWithPeer(_)),
        "{state:?}"
    );
}

#[test]
fn test_step_terminal_state_is_returned_unchanged() {
    let mut machine = Rendezvous::new(config(free_port()), ScriptedUser::default()).unwrap();
    assert!(matches!(machine.step(State::NeedToExit), State::NeedToExit));
}
