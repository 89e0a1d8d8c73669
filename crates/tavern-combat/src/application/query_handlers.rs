//! Query handlers for the Combat context.
//!
//! This module contains query handlers that reconstitute aggregates
//! from stored events and return read-only view DTOs.

use serde::Serialize;
use tavern_core::error::DomainError;
use tavern_core::repository::EventRepository;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::aggregates::Encounter;
use crate::domain::status_effects::StatusEffect;
use crate::domain::turn_order::{TurnOrder, TurnOrderEntry};

/// Read-only view of a game's turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOrderView {
    /// The owning game.
    pub game_id: Uuid,
    /// Entries in turn order.
    pub entries: Vec<TurnOrderEntry>,
    /// Index of the active entry.
    pub current_turn_index: usize,
    /// Whether combat is running.
    pub combat_started: bool,
    /// The active participant, while combat is running.
    pub current_character_id: Option<Uuid>,
}

impl TurnOrderView {
    /// Builds the view from an order.
    #[must_use]
    pub fn new(game_id: Uuid, order: &TurnOrder) -> Self {
        Self {
            game_id,
            entries: order.entries.clone(),
            current_turn_index: order.current_turn_index,
            combat_started: order.combat_started,
            current_character_id: order.current_character_id(),
        }
    }

    /// Builds the view from an encounter.
    #[must_use]
    pub fn of(encounter: &Encounter) -> Self {
        Self::new(encounter.id, encounter.turn_order())
    }
}

/// Read-only view of a combatant aggregate.
#[derive(Debug, Serialize)]
pub struct CombatantView {
    /// The character identifier.
    pub character_id: Uuid,
    /// The owning game.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether this is a non-player participant.
    pub is_npc: bool,
    /// Base dexterity.
    pub dexterity: i32,
    /// Current HP.
    pub hp: i32,
    /// Maximum HP.
    pub max_hp: i32,
    /// Current mana.
    pub mana: i32,
    /// Maximum mana.
    pub max_mana: i32,
    /// Active status effects.
    pub status_effects: Vec<StatusEffect>,
    /// Whether the combatant is knocked out.
    pub is_ko: bool,
    /// Whether a knockout is pending.
    pub ko_warning: bool,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves the turn order of a game. A game that never entered combat
/// has an empty, idle order.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event loading or
/// deserialization fails.
pub async fn get_turn_order(
    game_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<TurnOrderView, DomainError> {
    let stored_events = repo.load_events(game_id).await?;
    let encounter = command_handlers::reconstitute_encounter(game_id, &stored_events)?;
    Ok(TurnOrderView::of(&encounter))
}

/// Retrieves a combatant by its character ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_combatant_by_id(
    character_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<CombatantView, DomainError> {
    let stored_events = repo.load_events(character_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(character_id));
    }
    let combatant = command_handlers::reconstitute_combatant(character_id, &stored_events)?;
    Ok(CombatantView {
        character_id,
        game_id: combatant.game_id,
        name: combatant.name.clone(),
        is_npc: combatant.is_npc,
        dexterity: combatant.dexterity,
        hp: combatant.hp,
        max_hp: combatant.max_hp,
        mana: combatant.mana,
        max_mana: combatant.max_mana,
        status_effects: combatant.status_effects.clone(),
        is_ko: combatant.is_ko,
        ko_warning: combatant.ko_warning,
        version: combatant.version,
    })
}
