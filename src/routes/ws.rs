use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use tokio::sync::broadcast::{Receiver, error::RecvError};

use crate::{middleware::auth::AuthUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(ws_handler))
}

/// Real-time order updates. Every client gets their own channel; admins are
/// additionally fed the broadcast channel used by dashboards.
pub async fn ws_handler(
    State(state): State<AppState>,
    user: AuthUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let user_rx = state.sockets.subscribe_user(user.user_id).await;
    let admin_rx = (user.role == "admin").then(|| state.sockets.subscribe_broadcast());

    tracing::debug!(user_id = %user.user_id, role = %user.role, "websocket connected");
    ws.on_upgrade(move |socket| stream_events(socket, user_rx, admin_rx))
}

async fn stream_events(
    mut socket: WebSocket,
    mut user_rx: Receiver<String>,
    mut admin_rx: Option<Receiver<String>>,
) {
    loop {
        let next = async {
            match admin_rx.as_mut() {
                Some(rx) => tokio::select! {
                    msg = user_rx.recv() => msg,
                    msg = rx.recv() => msg,
                },
                None => user_rx.recv().await,
            }
        };

        tokio::select! {
            msg = next => match msg {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Best-effort channel; drop what we missed and move on.
                    tracing::debug!(skipped, "socket subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
}
