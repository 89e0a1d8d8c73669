//! Wire format of socket frames.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Session messages manage what the connection listens to; everything else
//! is a combat command.

use serde::Deserialize;
use tavern_combat::application::broadcasts::ServerEvent;
use tavern_combat::domain::commands::CombatCommand;
use tavern_core::error::DomainError;
use thiserror::Error;
use uuid::Uuid;

use crate::realtime::rate_limit::RateLimitExceeded;

/// Messages that manage a connection's subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SessionMessage {
    /// Listen to a game's broadcasts. Later commands target this game.
    JoinGame {
        /// The game to join.
        game_id: Uuid,
    },
    /// Listen to a character's personal channel.
    WatchCharacter {
        /// The character to watch.
        character_id: Uuid,
    },
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Subscription management.
    Session(SessionMessage),
    /// A combat command for the joined game.
    Combat(CombatCommand),
}

/// Why a frame produced an `error` event.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame is not valid JSON or names no known message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The connection sent too many frames with this name.
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    /// The command was rejected.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Deserialize)]
struct FrameHeader {
    event: String,
}

/// Reads the event name of a frame without decoding its payload.
///
/// # Errors
///
/// Returns `FrameError::Malformed` if the frame is not an object with a
/// string `event` field.
pub fn event_name(text: &str) -> Result<String, FrameError> {
    let header: FrameHeader = serde_json::from_str(text)?;
    Ok(header.event)
}

/// Decodes a frame whose event name is `event`.
///
/// # Errors
///
/// Returns `FrameError::Malformed` if the name is unknown or the payload does
/// not match it.
pub fn decode(event: &str, text: &str) -> Result<ClientMessage, FrameError> {
    match event {
        "join-game" | "watch-character" => Ok(ClientMessage::Session(serde_json::from_str(text)?)),
        _ => Ok(ClientMessage::Combat(serde_json::from_str(text)?)),
    }
}

/// Encodes an outbound event.
///
/// # Errors
///
/// Returns an error if the event cannot be serialized.
pub fn encode(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_game_decodes_as_session_message() {
        // Arrange
        let game_id = Uuid::new_v4();
        let text = format!(r#"{{"event":"join-game","data":{{"game_id":"{game_id}"}}}}"#);

        // Act
        let event = event_name(&text).unwrap();
        let message = decode(&event, &text).unwrap();

        // Assert
        assert_eq!(event, "join-game");
        assert_eq!(
            message,
            ClientMessage::Session(SessionMessage::JoinGame { game_id })
        );
    }

    #[test]
    fn test_combat_command_decodes_with_payload() {
        // Arrange
        let character_id = Uuid::new_v4();
        let text = format!(
            r#"{{"event":"modify-hp","data":{{"character_id":"{character_id}","amount":-4,"reason":"arrow"}}}}"#
        );

        // Act
        let message = decode("modify-hp", &text).unwrap();

        // Assert
        assert_eq!(
            message,
            ClientMessage::Combat(CombatCommand::ModifyHp {
                character_id,
                amount: -4,
                reason: Some("arrow".to_owned()),
            })
        );
    }

    #[test]
    fn test_unknown_event_is_malformed() {
        let text = r#"{"event":"cast-fireball","data":{}}"#;

        let result = decode("cast-fireball", text);

        assert!(matches!(result, Err(FrameError::Malformed(_))));
    }

    #[test]
    fn test_frame_without_event_name_is_malformed() {
        assert!(matches!(
            event_name(r#"{"data":{}}"#),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(event_name("not json"), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn test_error_event_encodes_with_message() {
        let event = ServerEvent::Error {
            message: "unauthorized: nope".to_owned(),
        };

        let text = encode(&event).unwrap();

        assert_eq!(
            text,
            r#"{"event":"error","data":{"message":"unauthorized: nope"}}"#
        );
    }
}
