//! The real-time socket endpoint.
//!
//! `GET /ws` upgrades to a WebSocket. Each connection joins a game, then
//! issues combat commands against it; broadcasts for the game and for
//! watched characters are pushed back as they happen.

mod connection;
pub mod hub;
pub mod protocol;
pub mod rate_limit;

use std::time::Instant;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::response::Response;
use axum::routing::get;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tavern_combat::application::broadcasts::ServerEvent;
use tavern_core::error::DomainError;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::realtime::connection::Connection;
use crate::state::AppState;

/// Header carrying the authenticated user, set by the gateway in front of
/// this service.
pub const USER_ID_HEADER: &str = "x-user-id";

const OUTBOX_CAPACITY: usize = 64;

/// The authenticated user behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Uuid);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(Caller)
            .ok_or_else(|| {
                ApiError(DomainError::Unauthorized(format!(
                    "missing or invalid {USER_ID_HEADER} header"
                )))
            })
    }
}

/// Returns the router for the socket endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

/// GET /ws
#[instrument(skip_all, fields(user_id = %caller.0))]
async fn upgrade(caller: Caller, State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    info!("upgrading real-time connection");
    ws.on_upgrade(move |socket| serve(socket, state, caller.0))
}

#[instrument(skip(socket, state))]
async fn serve(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::channel(OUTBOX_CAPACITY);
    let mut connection = Connection::new(user_id, state, outbox);

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let replies = connection.handle_text(text.as_str(), Instant::now()).await;
                    if send_all(&mut sink, &replies).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "socket read failed");
                    break;
                }
            },
            Some(event) = inbox.recv() => {
                if send_all(&mut sink, std::slice::from_ref(&event)).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("real-time connection closed");
}

async fn send_all(
    sink: &mut SplitSink<WebSocket, Message>,
    events: &[ServerEvent],
) -> Result<(), axum::Error> {
    for event in events {
        match protocol::encode(event) {
            Ok(text) => sink.send(Message::Text(text.into())).await?,
            Err(e) => warn!(event = event.name(), error = %e, "dropping unencodable event"),
        }
    }
    Ok(())
}
