use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ConnectInfo, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::{
    common::{RoomId, UserId, valid_id},
    room::ClientSession,
    server::AppState,
};

/// Join parameters carried on the upgrade URL.
#[derive(Debug, Default, Deserialize)]
pub struct JoinQuery {
    #[serde(default)]
    pub roomid: Option<String>,
    #[serde(default, alias = "userId")]
    pub userid: Option<String>,
}

impl JoinQuery {
    /// Both ids must be present and within length limits.
    pub fn validate(self) -> Result<(RoomId, UserId), &'static str> {
        let room_id = self
            .roomid
            .filter(|id| valid_id(id))
            .ok_or("Missing or invalid roomid")?;
        let user_id = self
            .userid
            .filter(|id| valid_id(id))
            .ok_or("Missing or invalid userid")?;
        Ok((RoomId::from(room_id), UserId::from(user_id)))
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<JoinQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, (StatusCode, &'static str)> {
    let (room_id, user_id) = match query.validate() {
        Ok(ids) => ids,
        Err(reason) => {
            warn!("Rejected connection from {}: {}", peer, reason);
            return Err((StatusCode::BAD_REQUEST, reason));
        }
    };

    info!("Incoming connection: user={} room={} peer={}", user_id, room_id, peer);
    let session = ClientSession::new(user_id, peer.ip().to_string());
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, session)))
}

pub async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    room_id: RoomId,
    session: Arc<ClientSession>,
) {
    state.registry.join(room_id, session.clone()).await;
    let session_id = session.id().clone();
    info!("WebSocket connected: session={} user={}", session_id, session.user_id());

    loop {
        tokio::select! {
            _ = session.ready() => {
                if let Err(e) = flush(&mut socket, &session).await {
                    error!("Socket send error: session={} err={}", session_id, e);
                    break;
                }
                if session.is_closed() {
                    info!("Session closed by room: session={}", session_id);
                    break;
                }
            }
            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("WebSocket error: session={} err={}", session_id, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => state.router.dispatch(&session, text.as_str()).await,
                    Message::Close(_) => break,
                    other => debug!("Ignoring non-text frame: session={} frame={:?}", session_id, other),
                }
            }
        }
    }

    state.registry.leave(&session).await;
    info!("Connection closed: session={}", session_id);
}

/// Writes the pending unicast, then the pending broadcast.
async fn flush(socket: &mut WebSocket, session: &ClientSession) -> Result<(), axum::Error> {
    for text in session.take_pending() {
        socket.send(Message::Text(text.into())).await?;
    }
    Ok(())
}
