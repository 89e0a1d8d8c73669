//! Collaborators the combat context consumes but does not own.
//!
//! Game membership, character ownership and item data live in other
//! services; the orchestrator only sees them through these traits.

use std::collections::HashMap;

use async_trait::async_trait;
use tavern_core::error::DomainError;
use uuid::Uuid;

/// Answers privilege questions about a caller within a game.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Returns `true` if `user_id` runs the game (the DM).
    async fn is_controlling_party(&self, game_id: Uuid, user_id: Uuid)
    -> Result<bool, DomainError>;

    /// Returns `true` if `user_id` may observe the game. The controlling
    /// party always counts as a participant.
    async fn is_participant(&self, game_id: Uuid, user_id: Uuid) -> Result<bool, DomainError>;

    /// Returns `true` if `user_id` owns `character_id` or controls the game.
    async fn controls_character(
        &self,
        game_id: Uuid,
        user_id: Uuid,
        character_id: Uuid,
    ) -> Result<bool, DomainError>;
}

/// A character eligible to take part in combat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterMember {
    /// The character identifier.
    pub character_id: Uuid,
    /// Items the character currently has equipped.
    pub equipped_item_ids: Vec<Uuid>,
}

/// Supplies the live combat roster of a game: player characters plus active
/// non-player participants.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Returns every roster member of the game, in roster order.
    async fn combat_roster(&self, game_id: Uuid) -> Result<Vec<RosterMember>, DomainError>;

    /// Returns a single roster member, or `None` if the character is not an
    /// active member of the game.
    async fn roster_member(
        &self,
        game_id: Uuid,
        character_id: Uuid,
    ) -> Result<Option<RosterMember>, DomainError>;
}

/// Resolves dexterity modifiers for equipped items.
#[async_trait]
pub trait EquipmentBonusLookup: Send + Sync {
    /// Returns the dexterity modifier of each known item. Unknown items are
    /// absent from the map.
    async fn dexterity_bonuses(&self, item_ids: &[Uuid]) -> Result<HashMap<Uuid, i32>, DomainError>;
}
