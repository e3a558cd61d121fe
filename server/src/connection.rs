//! The accept loop and per-connection tasks.
//!
//! Each connection gets a reader task (this module's read loop) and a
//! writer task draining the session's outbound channel. The reader parses
//! framed requests and dispatches them into the shared state; the writer
//! is the only place the socket is written, keeping all I/O outside the
//! state lock.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use noughts_protocol::{ClientToServer, FrameCodec, Role, ServerToClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ConnectionError;
use crate::game::Effect;
use crate::registry;
use crate::state::AppState;

/// Accept connections forever, one handler task per socket. The server
/// outlives any number of session pairs.
pub async fn run(
    listener: TcpListener,
    state: AppState,
    idle_timeout: Option<Duration>,
) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(handle_connection(stream, addr, state, idle_timeout));
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: AppState,
    idle_timeout: Option<Duration>,
) {
    let (mut read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
    tokio::spawn(write_loop(rx, write_half));

    let registered = {
        let mut shared = state.lock();
        match shared.registry.register(tx.clone()) {
            Ok((id, role)) => {
                shared
                    .registry
                    .send_to(id, &ServerToClient::Symbol { symbol: role });
                if role == Role::O {
                    // The guest joins blind; show it the host's mode choice.
                    let mode = shared.game.mode();
                    shared
                        .registry
                        .send_to(id, &ServerToClient::ModeUpdate { mode });
                }
                if shared.registry.is_full() {
                    let effects = shared.game.opponent_joined();
                    shared.apply_effects(id, effects);
                }
                Some((id, role))
            }
            Err(_) => {
                registry::send_direct(&tx, &ServerToClient::ServerFull);
                None
            }
        }
    };

    let Some((id, role)) = registered else {
        // tx drops here; the writer drains the notice, then the socket
        // closes without the session ever reaching the match.
        warn!(%addr, "connection rejected, server full");
        return;
    };
    drop(tx);
    info!(%addr, %role, "player connected");

    if let Err(e) = read_loop(&mut read_half, &state, id, role, idle_timeout).await {
        debug!(%addr, %role, error = %e, "read loop ended");
    }

    state.lock().drop_session(id);
    info!(%addr, %role, "connection closed");
}

async fn write_loop(mut rx: UnboundedReceiver<Bytes>, mut write_half: OwnedWriteHalf) {
    while let Some(framed) = rx.recv().await {
        if let Err(e) = write_half.write_all(&framed).await {
            debug!(error = %e, "write failed, stopping writer");
            break;
        }
    }
}

async fn read_loop(
    read_half: &mut OwnedReadHalf,
    state: &AppState,
    id: Uuid,
    role: Role,
    idle_timeout: Option<Duration>,
) -> Result<(), ConnectionError> {
    let mut codec = FrameCodec::new();
    let mut buf = vec![0u8; 4096];

    loop {
        let n = read_some(read_half, &mut buf, idle_timeout).await?;
        if n == 0 {
            return Ok(());
        }
        codec.feed(&buf[..n]);

        loop {
            match codec.decode_next() {
                Ok(Some(payload)) => match serde_json::from_slice::<ClientToServer>(&payload) {
                    Ok(request) => dispatch(state, id, role, request),
                    // One bad record, not a broken stream: drop the frame,
                    // keep the connection.
                    Err(e) => warn!(%role, error = %e, "dropping malformed frame"),
                },
                Ok(None) => break,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

async fn read_some(
    read_half: &mut OwnedReadHalf,
    buf: &mut [u8],
    idle_timeout: Option<Duration>,
) -> Result<usize, ConnectionError> {
    match idle_timeout {
        Some(limit) => Ok(tokio::time::timeout(limit, read_half.read(buf))
            .await
            .map_err(|_| ConnectionError::IdleTimeout)??),
        None => Ok(read_half.read(buf).await?),
    }
}

/// Apply one parsed request under the state lock and queue the resulting
/// events. Rejections answer the sender alone; nothing else changes.
fn dispatch(state: &AppState, id: Uuid, role: Role, request: ClientToServer) {
    debug!(%role, ?request, "request");
    let mut shared = state.lock();

    let effects = match request {
        ClientToServer::Move { x, y } => match shared.game.apply_move(role, x, y) {
            Ok(effects) => effects,
            Err(e) => {
                debug!(%role, error = %e, "move rejected");
                vec![Effect::Reply(ServerToClient::Error {
                    message: e.to_string(),
                })]
            }
        },
        ClientToServer::Restart => {
            let opponent_present = shared.registry.is_full();
            match shared.game.restart(opponent_present) {
                Ok(effects) => effects,
                Err(e) => vec![Effect::Reply(ServerToClient::Error {
                    message: e.to_string(),
                })],
            }
        }
        ClientToServer::ModeSelect { mode } => shared.game.select_mode(role, mode),
        ClientToServer::ScoreRequest => shared.game.score(),
        ClientToServer::ChatMessage { text } => {
            vec![Effect::Broadcast(ServerToClient::ChatMessage {
                player: role,
                text,
                timestamp: Utc::now().to_rfc3339(),
            })]
        }
    };

    shared.apply_effects(id, effects);
}
