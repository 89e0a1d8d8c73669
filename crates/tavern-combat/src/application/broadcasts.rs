//! Outbound real-time events and their audiences.

use serde::Serialize;
use uuid::Uuid;

use crate::application::query_handlers::TurnOrderView;
use crate::domain::aggregates::{PoolChange, TurnStartReport};
use crate::domain::events::RemovalCause;
use crate::domain::ties::TieGroup;

/// Why the order changed, carried by `turn-order-updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOrderChange {
    /// Tie groups were resolved manually.
    TieResolved,
    /// The order was rearranged manually.
    ManualUpdate,
    /// A participant joined.
    ParticipantAdded {
        /// The new participant.
        character_id: Uuid,
    },
    /// A participant left.
    ParticipantRemoved {
        /// The removed participant.
        character_id: Uuid,
        /// What removed them.
        cause: RemovalCause,
    },
    /// Combat ended.
    CombatEnded,
}

/// An event pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A fresh order was calculated.
    TurnOrderCalculated {
        /// The new order.
        turn_order: TurnOrderView,
        /// Equal-initiative runs awaiting manual resolution.
        tie_groups: Vec<TieGroup>,
    },
    /// The order was changed without recalculation.
    TurnOrderUpdated {
        /// The changed order.
        turn_order: TurnOrderView,
        /// What changed.
        change: TurnOrderChange,
    },
    /// The turn advanced and the new participant's turn started.
    TurnAdvanced {
        /// The order after advancing.
        turn_order: TurnOrderView,
        /// Status and knockout processing for the new participant.
        turn_start: TurnStartReport,
    },
    /// The turn was forced onto a participant without turn-start processing.
    TurnForced {
        /// The order after the jump.
        turn_order: TurnOrderView,
        /// The participant now acting.
        character_id: Uuid,
    },
    /// The order, in answer to `get-turn-order`.
    TurnOrderState {
        /// The current order.
        turn_order: TurnOrderView,
    },
    /// A character's HP changed.
    HpModified(PoolChange),
    /// A character's mana changed.
    ManaModified(PoolChange),
    /// A knocked-out character was revived.
    CharacterRevived {
        /// The revived character.
        character_id: Uuid,
        /// HP after revival.
        hp: i32,
    },
    /// The connection joined a game's audience.
    JoinedGame {
        /// The joined game.
        game_id: Uuid,
    },
    /// The connection subscribed to a character's personal channel.
    WatchingCharacter {
        /// The watched character.
        character_id: Uuid,
    },
    /// A command failed. Sent to the originating connection only.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerEvent {
    /// Returns the wire event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnOrderCalculated { .. } => "turn-order-calculated",
            Self::TurnOrderUpdated { .. } => "turn-order-updated",
            Self::TurnAdvanced { .. } => "turn-advanced",
            Self::TurnForced { .. } => "turn-forced",
            Self::TurnOrderState { .. } => "turn-order-state",
            Self::HpModified(_) => "hp-modified",
            Self::ManaModified(_) => "mana-modified",
            Self::CharacterRevived { .. } => "character-revived",
            Self::JoinedGame { .. } => "joined-game",
            Self::WatchingCharacter { .. } => "watching-character",
            Self::Error { .. } => "error",
        }
    }
}

/// Who receives a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    /// Everyone who joined the game.
    Game(Uuid),
    /// Everyone watching a character's personal channel.
    Character(Uuid),
    /// Only the connection that issued the command.
    Caller,
}

/// An outbound event addressed to an audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    /// Recipients.
    pub audience: Audience,
    /// Payload.
    pub event: ServerEvent,
}

impl Broadcast {
    /// Addresses `event` to a game's audience.
    #[must_use]
    pub fn to_game(game_id: Uuid, event: ServerEvent) -> Self {
        Self {
            audience: Audience::Game(game_id),
            event,
        }
    }

    /// Addresses `event` to a character's personal channel.
    #[must_use]
    pub fn to_character(character_id: Uuid, event: ServerEvent) -> Self {
        Self {
            audience: Audience::Character(character_id),
            event,
        }
    }

    /// Addresses `event` to the calling connection.
    #[must_use]
    pub fn to_caller(event: ServerEvent) -> Self {
        Self {
            audience: Audience::Caller,
            event,
        }
    }
}
