//! State and frame handling of one socket connection.

use std::collections::HashMap;
use std::time::Instant;

use tavern_combat::application::broadcasts::{Audience, ServerEvent};
use tavern_combat::domain::commands::{CombatCommand, CommandEnvelope};
use tavern_core::error::DomainError;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::realtime::protocol::{self, ClientMessage, FrameError, SessionMessage};
use crate::realtime::rate_limit::RateLimiter;
use crate::state::AppState;

/// Rate limit bucket shared by every frame that fails to decode.
const MALFORMED_FRAMES: &str = "malformed";

/// One caller's connection: its rate limiter, joined game and audience
/// subscriptions. Frames are handled one at a time, in arrival order.
pub(crate) struct Connection {
    user_id: Uuid,
    state: AppState,
    limiter: RateLimiter,
    game_id: Option<Uuid>,
    subscriptions: HashMap<Audience, JoinHandle<()>>,
    outbox: mpsc::Sender<ServerEvent>,
}

impl Connection {
    /// Broadcasts for subscribed audiences are forwarded into `outbox`.
    pub(crate) fn new(user_id: Uuid, state: AppState, outbox: mpsc::Sender<ServerEvent>) -> Self {
        let limiter = RateLimiter::per_second(state.events_per_second);
        Self {
            user_id,
            state,
            limiter,
            game_id: None,
            subscriptions: HashMap::new(),
            outbox,
        }
    }

    /// Handles one text frame and returns the events addressed to this
    /// connection alone. Failures become a single `error` event.
    pub(crate) async fn handle_text(&mut self, text: &str, now: Instant) -> Vec<ServerEvent> {
        match self.handle(text, now).await {
            Ok(replies) => replies,
            Err(e) => {
                debug!(user_id = %self.user_id, error = %e, "frame rejected");
                vec![ServerEvent::Error {
                    message: e.to_string(),
                }]
            }
        }
    }

    async fn handle(&mut self, text: &str, now: Instant) -> Result<Vec<ServerEvent>, FrameError> {
        let decoded = protocol::event_name(text)
            .and_then(|event| protocol::decode(&event, text).map(|message| (event, message)));
        let message = match decoded {
            Ok((event, message)) => {
                self.limiter.check(&event, now)?;
                message
            }
            Err(e) => {
                self.limiter.check(MALFORMED_FRAMES, now)?;
                return Err(e);
            }
        };

        match message {
            ClientMessage::Session(SessionMessage::JoinGame { game_id }) => {
                self.join_game(game_id).await
            }
            ClientMessage::Session(SessionMessage::WatchCharacter { character_id }) => {
                self.watch_character(character_id).await
            }
            ClientMessage::Combat(command) => self.dispatch(command).await,
        }
    }

    async fn join_game(&mut self, game_id: Uuid) -> Result<Vec<ServerEvent>, FrameError> {
        let authorization = self.state.orchestrator.authorization();
        if !authorization.is_participant(game_id, self.user_id).await? {
            return Err(DomainError::Unauthorized(format!(
                "user {} is not a participant of game {game_id}",
                self.user_id
            ))
            .into());
        }

        if self.game_id.is_some_and(|joined| joined != game_id) {
            self.unsubscribe_all();
        }
        self.game_id = Some(game_id);
        self.subscribe(Audience::Game(game_id));

        info!(user_id = %self.user_id, %game_id, "joined game");
        Ok(vec![ServerEvent::JoinedGame { game_id }])
    }

    async fn watch_character(&mut self, character_id: Uuid) -> Result<Vec<ServerEvent>, FrameError> {
        let game_id = self.joined_game()?;
        let authorization = self.state.orchestrator.authorization();
        if !authorization
            .controls_character(game_id, self.user_id, character_id)
            .await?
        {
            return Err(DomainError::Unauthorized(format!(
                "user {} does not control character {character_id}",
                self.user_id
            ))
            .into());
        }

        self.subscribe(Audience::Character(character_id));
        Ok(vec![ServerEvent::WatchingCharacter { character_id }])
    }

    async fn dispatch(&mut self, command: CombatCommand) -> Result<Vec<ServerEvent>, FrameError> {
        let envelope = CommandEnvelope {
            correlation_id: Uuid::new_v4(),
            game_id: self.joined_game()?,
            issuer: self.user_id,
            command,
        };

        let broadcasts = self.state.orchestrator.dispatch(&envelope).await?;

        let mut replies = Vec::new();
        for broadcast in broadcasts {
            if broadcast.audience == Audience::Caller {
                replies.push(broadcast.event);
            } else {
                self.state.hub.publish(&broadcast);
            }
        }
        Ok(replies)
    }

    fn joined_game(&self) -> Result<Uuid, DomainError> {
        self.game_id.ok_or_else(|| {
            DomainError::Validation("join a game before sending combat commands".to_owned())
        })
    }

    fn subscribe(&mut self, audience: Audience) {
        if self.subscriptions.contains_key(&audience) {
            return;
        }
        if let Some(receiver) = self.state.hub.subscribe(audience) {
            let handle = tokio::spawn(forward(receiver, self.outbox.clone()));
            self.subscriptions.insert(audience, handle);
        }
    }

    fn unsubscribe_all(&mut self) {
        for (_, handle) in self.subscriptions.drain() {
            handle.abort();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

async fn forward(mut receiver: broadcast::Receiver<ServerEvent>, outbox: mpsc::Sender<ServerEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                if outbox.send(event).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "connection fell behind its broadcasts");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
