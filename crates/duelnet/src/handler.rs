//! Per-connection handler: read requests, match players, relay addresses.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Read one request frame: the tag byte within `idle_timeout`, then
//!      the kind's fixed payload within `request_timeout`
//!   2. `CreateNewGameRequest` → answer, then park until a joiner arrives
//!      and send the creator the joiner's address
//!   3. `JoinGameRequest` → answer, and on success wake the creator and
//!      send the joiner the creator's address
//!   4. A refused request leaves the connection open for another one;
//!      a completed match closes it.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use duelnet_protocol::{
    CreateNewGameRequest, CreateNewGameResponse, GameId, JoinGameRequest, JoinGameResponse,
    JoinGameResult, Message, MessageType, PlayerId, SocketAddress, deserialize, serialize,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::DuelnetError;
use crate::server::{ServerState, Waiting};

/// One complete request frame, tag included.
struct Frame {
    kind: MessageType,
    bytes: Vec<u8>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    state: Arc<ServerState>,
) -> Result<(), DuelnetError> {
    let player = state.next_player_id();
    tracing::debug!(%peer, %player, "handling new connection");

    loop {
        let Some(frame) = read_request(&mut stream, &state).await? else {
            tracing::debug!(%peer, "connection closed cleanly");
            return Ok(());
        };

        let should_close = match frame.kind {
            MessageType::CreateNewGameRequest => {
                deserialize::<CreateNewGameRequest>(&frame.bytes)?;
                handle_create(&mut stream, peer, player, &state).await?
            }
            MessageType::JoinGameRequest => {
                let request: JoinGameRequest = deserialize(&frame.bytes)?;
                handle_join(&mut stream, peer, player, request.game_id, &state).await?
            }
            other => {
                tracing::warn!(%peer, kind = %other, "client sent a non-request message");
                return Err(DuelnetError::UnexpectedMessage(other));
            }
        };
        if should_close {
            break;
        }
    }

    stream.shutdown().await?;
    Ok(())
}

/// Reads the next request. The tag byte may take up to `idle_timeout`; the
/// rest of the frame must follow within `request_timeout` of it. `None`
/// means the client closed the connection between requests.
async fn read_request(
    stream: &mut TcpStream,
    state: &ServerState,
) -> Result<Option<Frame>, DuelnetError> {
    let tag = match timeout(state.config.idle_timeout, stream.read_u8()).await {
        Ok(Ok(tag)) => tag,
        Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(DuelnetError::Timeout("a request")),
    };
    let kind = MessageType::try_from(tag).inspect_err(|err| {
        tracing::warn!(error = %err, "closing connection after unknown message type");
    })?;

    let mut bytes = vec![0u8; 1 + kind.payload_size()];
    bytes[0] = tag;
    match timeout(state.config.request_timeout, stream.read_exact(&mut bytes[1..])).await {
        Ok(result) => {
            result?;
        }
        Err(_) => return Err(DuelnetError::Timeout("the rest of the request")),
    }
    Ok(Some(Frame { kind, bytes }))
}

async fn send<M: Message>(stream: &mut TcpStream, msg: &M) -> Result<(), DuelnetError> {
    stream.write_all(&serialize(msg)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Returns `true` if the connection should close.
async fn handle_create(
    stream: &mut TcpStream,
    peer: SocketAddr,
    player: PlayerId,
    state: &ServerState,
) -> Result<bool, DuelnetError> {
    let (notify, mut joined) = oneshot::channel();

    // The game and its waiting creator appear together.
    let created = {
        let mut lobby = state.lobby.lock().await;
        let created = lobby.registry.create_game(player);
        if let Ok(game_id) = created {
            lobby.waiting.insert(
                game_id,
                Waiting {
                    creator: peer,
                    notify,
                },
            );
        }
        created
    };

    let game_id = match created {
        Ok(game_id) => game_id,
        Err(err) => {
            tracing::warn!(%peer, error = %err, "cannot create game");
            send(stream, &CreateNewGameResponse::Failed(err.into())).await?;
            return Ok(false);
        }
    };
    tracing::info!(%game_id, %peer, "game created");

    if let Err(e) = send(stream, &CreateNewGameResponse::Created(game_id)).await {
        abandon(state, game_id).await;
        return Err(e);
    }

    // Parked: the creator has nothing more to say, so any read result
    // (EOF, stray bytes, error) means it is gone.
    let mut probe = [0u8; 1];
    let joiner = timeout(state.config.peer_join_timeout, async {
        tokio::select! {
            joiner = &mut joined => joiner.ok(),
            _ = stream.read(&mut probe) => None,
        }
    })
    .await
    .ok()
    .flatten();

    // A joiner may have claimed the game right as we gave up on it; if so
    // its address is already in the channel.
    let joiner = match joiner {
        Some(joiner) => Some(joiner),
        None => {
            if abandon(state, game_id).await {
                None
            } else {
                joined.try_recv().ok()
            }
        }
    };

    match joiner {
        Some(joiner) => {
            tracing::info!(%game_id, creator = %peer, %joiner, "relaying joiner address");
            send(stream, &SocketAddress(joiner)).await?;
        }
        None => {
            tracing::info!(%game_id, %peer, "nobody joined in time or creator left, game dropped");
        }
    }
    Ok(true)
}

/// Drops a game nobody joined. Returns `false` if a joiner got there first.
async fn abandon(state: &ServerState, game_id: GameId) -> bool {
    let mut lobby = state.lobby.lock().await;
    if lobby.waiting.remove(&game_id).is_none() {
        return false;
    }
    lobby.registry.remove_game(game_id);
    true
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Returns `true` if the connection should close.
async fn handle_join(
    stream: &mut TcpStream,
    peer: SocketAddr,
    player: PlayerId,
    game_id: GameId,
    state: &ServerState,
) -> Result<bool, DuelnetError> {
    let outcome = {
        let mut lobby = state.lobby.lock().await;
        match lobby.registry.add_player(game_id, player) {
            Ok(()) => match lobby.waiting.remove(&game_id) {
                // Sent under the lock so `abandon` cannot miss it.
                Some(waiting) => match waiting.notify.send(peer) {
                    Ok(()) => Ok(waiting.creator),
                    Err(_) => {
                        lobby.registry.remove_game(game_id);
                        Err(JoinGameResult::GameIdDoesNotExist)
                    }
                },
                None => {
                    lobby.registry.remove_game(game_id);
                    Err(JoinGameResult::GameIdDoesNotExist)
                }
            },
            Err(err) => Err(JoinGameResult::from(err)),
        }
    };

    match outcome {
        Ok(creator) => {
            tracing::info!(%game_id, %creator, joiner = %peer, "game joined");
            let response = JoinGameResponse {
                result: JoinGameResult::Success,
            };
            send(stream, &response).await?;
            send(stream, &SocketAddress(creator)).await?;
            Ok(true)
        }
        Err(result) => {
            tracing::info!(%game_id, %peer, %result, "join refused");
            send(stream, &JoinGameResponse { result }).await?;
            Ok(false)
        }
    }
}
