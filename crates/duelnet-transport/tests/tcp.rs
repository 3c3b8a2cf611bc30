//! Integration tests for the TCP handles over loopback.
//!
//! Sockets that later become acceptors are bound to an explicit port: a
//! disconnect releases an ephemeral port, so the tests reserve a free one
//! first and bind to it.

use std::net::{SocketAddr, TcpListener};
use std::os::fd::AsFd;
use std::time::Duration;

use duelnet_protocol::{
    DecodeError, GameId, JoinGameRequest, JoinGameResponse, JoinGameResult, MessageType,
};
use duelnet_transport::io::wait_readable;
use duelnet_transport::{
    AcceptError, AcceptOutcome, AddressFamily, ClientId, ConnectError, Endpoint, ReceiveError,
    TcpAcceptor, TcpClient, TcpServer, cancellation,
};

const TIMEOUT: Duration = Duration::from_secs(2);

/// Asks the OS for a currently unused loopback port.
fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn listening_server() -> TcpServer {
    let server = TcpServer::bind(&Endpoint::loopback_v4(0)).unwrap();
    server.listen().unwrap();
    server
}

/// Waits for and accepts one connection.
fn accept_one(server: &TcpServer) -> ClientId {
    loop {
        assert!(wait_readable(server.as_fd(), TIMEOUT).unwrap(), "no connection arrived");
        if let AcceptOutcome::Accepted(id) = server.accept().unwrap() {
            return id;
        }
    }
}

/// Connects a fresh client to `server` and returns both ends.
fn connected_pair(server: &TcpServer) -> (TcpClient, TcpClient) {
    let mut client = TcpClient::new(AddressFamily::Ipv4).unwrap();
    client.connect_addr(server.local_addr().unwrap(), TIMEOUT).unwrap();
    let accepted = accept_one(server);
    (client, accepted.client)
}

// =========================================================================
// TcpServer
// =========================================================================

#[test]
fn test_accept_without_pending_connection_would_block() {
    let server = listening_server();
    assert!(matches!(server.accept().unwrap(), AcceptOutcome::WouldBlock));
}

#[test]
fn test_accept_reports_peer_address() {
    let server = listening_server();
    let port = free_port();
    let mut client = TcpClient::bind_to(&Endpoint::loopback_v4(port)).unwrap();
    client.connect_addr(server.local_addr().unwrap(), TIMEOUT).unwrap();

    let accepted = accept_one(&server);
    assert_eq!(accepted.peer, SocketAddr::from(([127, 0, 0, 1], port)));
    assert_eq!(client.local_addr().unwrap(), accepted.peer);
}

// =========================================================================
// TcpClient
// =========================================================================

#[test]
fn test_send_and_receive_typed_message() {
    let server = listening_server();
    let (mut client, mut remote) = connected_pair(&server);

    let request = JoinGameRequest {
        game_id: GameId(12345),
    };
    client.send(&request, TIMEOUT).unwrap();
    let received: JoinGameRequest = remote.receive(TIMEOUT).unwrap();
    assert_eq!(received, request);

    let response = JoinGameResponse {
        result: JoinGameResult::GameAlreadyHasTwoPlayers,
    };
    remote.send(&response, TIMEOUT).unwrap();
    assert_eq!(client.receive::<JoinGameResponse>(TIMEOUT).unwrap(), response);
}

#[test]
fn test_receive_other_kind_reports_wrong_message_type() {
    let server = listening_server();
    let (mut client, mut remote) = connected_pair(&server);

    client
        .send(&JoinGameResponse { result: JoinGameResult::Success }, TIMEOUT)
        .unwrap();
    let err = remote.receive::<JoinGameRequest>(TIMEOUT).unwrap_err();
    assert!(matches!(
        err,
        ReceiveError::Decode(DecodeError::WrongMessageType {
            expected: MessageType::JoinGameRequest,
            got: MessageType::JoinGameResponse,
        })
    ));
}

#[test]
fn test_receive_unknown_result_code_keeps_raw_value() {
    let server = listening_server();
    let (mut client, mut remote) = connected_pair(&server);

    client.send_bytes(&[MessageType::JoinGameResponse.as_u8(), 99], TIMEOUT).unwrap();
    let err = remote.receive::<JoinGameResponse>(TIMEOUT).unwrap_err();
    match err {
        ReceiveError::Decode(DecodeError::Payload(inner)) => assert_eq!(inner.0, 99),
        other => panic!("expected payload error, got {other:?}"),
    }
}

#[test]
fn test_receive_after_peer_closes_reports_termination() {
    let server = listening_server();
    let (mut client, remote) = connected_pair(&server);
    drop(remote);

    let err = client.receive::<JoinGameResponse>(TIMEOUT).unwrap_err();
    assert!(
        matches!(err, ReceiveError::ConnectionTerminatedByPeer { .. }),
        "{err:?}"
    );
}

#[test]
fn test_receive_with_silent_peer_times_out() {
    let server = listening_server();
    let (mut client, _remote) = connected_pair(&server);

    let err = client
        .receive::<JoinGameResponse>(Duration::from_millis(100))
        .unwrap_err();
    match err {
        ReceiveError::Timeout { configured, received, .. } => {
            assert_eq!(configured, Duration::from_millis(100));
            assert_eq!(received, 0);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn test_receive_cancellable_stops_on_cancel() {
    let server = listening_server();
    let (mut client, _remote) = connected_pair(&server);
    let (token, canceller) = cancellation().unwrap();
    canceller.cancel().unwrap();

    let err = client
        .receive_cancellable::<JoinGameResponse>(TIMEOUT, &token)
        .unwrap_err();
    assert!(matches!(err, ReceiveError::Cancelled { received: 0 }));
}

#[test]
fn test_connect_to_closed_port_is_refused() {
    let mut client = TcpClient::new(AddressFamily::Ipv4).unwrap();
    let err = client
        .connect(&Endpoint::loopback_v4(free_port()), TIMEOUT)
        .unwrap_err();
    assert!(err.is_refused(), "{err:?}");
}

#[test]
fn test_connect_with_unparseable_host_fails_before_io() {
    let mut client = TcpClient::new(AddressFamily::Ipv4).unwrap();
    let endpoint = Endpoint::new(duelnet_transport::Host::Literal("nope".into()), 1);
    assert!(matches!(
        client.connect(&endpoint, TIMEOUT),
        Err(ConnectError::IpAddrParsing(_))
    ));
}

// =========================================================================
// TcpAcceptor
// =========================================================================

/// A client bound to an explicit port, connected to `server`, then turned
/// into an acceptor. Returns the acceptor and its address.
fn acceptor_after_server_talk(server: &TcpServer) -> (TcpAcceptor, SocketAddr) {
    let addr = SocketAddr::from(([127, 0, 0, 1], free_port()));
    let mut client = TcpClient::bind_to(&Endpoint::from(addr)).unwrap();
    client.connect_addr(server.local_addr().unwrap(), TIMEOUT).unwrap();
    let _server_side = accept_one(server);

    let acceptor = TcpAcceptor::from_client(client).unwrap();
    assert_eq!(acceptor.local_addr().unwrap(), addr);
    (acceptor, addr)
}

#[test]
fn test_acceptor_accepts_expected_peer_on_reused_port() {
    let server = listening_server();
    let (acceptor, acceptor_addr) = acceptor_after_server_talk(&server);

    let peer_addr = SocketAddr::from(([127, 0, 0, 1], free_port()));
    let mut peer = TcpClient::bind_to(&Endpoint::from(peer_addr)).unwrap();
    peer.connect_addr(acceptor_addr, TIMEOUT).unwrap();

    let mut link = acceptor.accept_expected_peer(peer_addr, TIMEOUT).unwrap();
    peer.send(&JoinGameRequest { game_id: GameId(1) }, TIMEOUT).unwrap();
    assert_eq!(
        link.receive::<JoinGameRequest>(TIMEOUT).unwrap().game_id,
        GameId(1)
    );
}

#[test]
fn test_acceptor_rejects_unexpected_peer() {
    let server = listening_server();
    let (acceptor, acceptor_addr) = acceptor_after_server_talk(&server);

    let mut stranger = TcpClient::new(AddressFamily::Ipv4).unwrap();
    stranger.connect_addr(acceptor_addr, TIMEOUT).unwrap();

    let expected = SocketAddr::from(([127, 0, 0, 1], 9));
    match acceptor.accept_expected_peer(expected, TIMEOUT) {
        Err(AcceptError::PeerAddressMismatch { expected: e, actual }) => {
            assert_eq!(e, expected);
            assert_eq!(actual, stranger.local_addr().unwrap());
        }
        other => panic!("expected PeerAddressMismatch, got {other:?}"),
    }
}

#[test]
fn test_acceptor_without_peer_times_out() {
    let server = listening_server();
    let (acceptor, _) = acceptor_after_server_talk(&server);

    let err = acceptor
        .accept_expected_peer(SocketAddr::from(([127, 0, 0, 1], 9)), Duration::from_millis(100))
        .unwrap_err();
    match err {
        AcceptError::Timeout { configured, elapsed } => {
            assert_eq!(configured, Duration::from_millis(100));
            assert!(elapsed >= configured, "{elapsed:?}");
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[test]
fn test_acceptor_into_client_keeps_local_port_and_can_connect() {
    let server = listening_server();
    let (acceptor, acceptor_addr) = acceptor_after_server_talk(&server);

    let mut client = acceptor.into_client().unwrap();
    let other = listening_server();
    client.connect_addr(other.local_addr().unwrap(), TIMEOUT).unwrap();

    let accepted = accept_one(&other);
    assert_eq!(accepted.peer, acceptor_addr);
}
