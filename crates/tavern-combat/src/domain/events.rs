//! Domain events for the Combat context.

use serde::{Deserialize, Serialize};
use tavern_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

use super::status_effects::{StatusEffect, StatusTick};
use super::turn_order::TurnOrderEntry;

pub const TURN_ORDER_CALCULATED_EVENT_TYPE: &str = "combat.turn_order_calculated";
pub const TURN_ADVANCED_EVENT_TYPE: &str = "combat.turn_advanced";
pub const TURN_FORCED_EVENT_TYPE: &str = "combat.turn_forced";
pub const COMBAT_ENDED_EVENT_TYPE: &str = "combat.combat_ended";
pub const TURN_ORDER_REARRANGED_EVENT_TYPE: &str = "combat.turn_order_rearranged";
pub const PARTICIPANT_ADDED_EVENT_TYPE: &str = "combat.participant_added";
pub const PARTICIPANT_REMOVED_EVENT_TYPE: &str = "combat.participant_removed";
pub const PARTICIPANT_KNOCKED_OUT_EVENT_TYPE: &str = "combat.participant_knocked_out";
pub const PARTICIPANT_REVIVED_EVENT_TYPE: &str = "combat.participant_revived";

pub const COMBATANT_ENROLLED_EVENT_TYPE: &str = "combatant.enrolled";
pub const HP_MODIFIED_EVENT_TYPE: &str = "combatant.hp_modified";
pub const MANA_MODIFIED_EVENT_TYPE: &str = "combatant.mana_modified";
pub const STATUS_EFFECT_APPLIED_EVENT_TYPE: &str = "combatant.status_effect_applied";
pub const STATUS_EFFECT_REMOVED_EVENT_TYPE: &str = "combatant.status_effect_removed";
pub const STATUS_EFFECTS_TICKED_EVENT_TYPE: &str = "combatant.status_effects_ticked";
pub const KO_WARNING_RAISED_EVENT_TYPE: &str = "combatant.ko_warning_raised";
pub const KO_WARNING_CLEARED_EVENT_TYPE: &str = "combatant.ko_warning_cleared";
pub const KNOCKED_OUT_EVENT_TYPE: &str = "combatant.knocked_out";
pub const REVIVED_EVENT_TYPE: &str = "combatant.revived";

// --- Encounter events ---

/// Emitted when the full order is computed from the live roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOrderCalculated {
    /// The owning game.
    pub game_id: Uuid,
    /// Ranked entries.
    pub entries: Vec<TurnOrderEntry>,
}

/// Emitted when the turn pointer moves, either by advancing or forcing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMoved {
    /// The owning game.
    pub game_id: Uuid,
    /// Index before the move.
    pub from_index: usize,
    /// Index after the move.
    pub to_index: usize,
    /// The participant who is now active.
    pub character_id: Uuid,
}

/// Emitted when combat ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatEnded {
    /// The owning game.
    pub game_id: Uuid,
}

/// Why an order was rearranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RearrangeReason {
    /// Tie groups were resolved manually.
    TieResolved,
    /// The controlling party submitted a full order.
    ManualUpdate,
}

/// Emitted when entries are rearranged without changing membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOrderRearranged {
    /// The owning game.
    pub game_id: Uuid,
    /// Entries in their new order.
    pub entries: Vec<TurnOrderEntry>,
    /// Why the order changed.
    pub reason: RearrangeReason,
}

/// Emitted when a participant joins a running (or starting) combat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantAdded {
    /// The owning game.
    pub game_id: Uuid,
    /// The participant added.
    pub character_id: Uuid,
    /// Entries after the re-sort.
    pub entries: Vec<TurnOrderEntry>,
    /// Relocated turn pointer.
    pub current_turn_index: usize,
}

/// Why a participant left the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalCause {
    /// Removed by the controlling party.
    Dismissed,
    /// A non-player participant was killed.
    NpcKilled,
    /// A non-player participant was deleted.
    NpcDeleted,
}

/// Emitted when a participant leaves the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRemoved {
    /// The owning game.
    pub game_id: Uuid,
    /// The participant removed.
    pub character_id: Uuid,
    /// Why it was removed.
    pub cause: RemovalCause,
    /// Entries after the splice.
    pub entries: Vec<TurnOrderEntry>,
    /// Adjusted turn pointer.
    pub current_turn_index: usize,
    /// Whether combat is still running.
    pub combat_started: bool,
}

/// Emitted when a participant's entry changes knockout status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantKoChanged {
    /// The owning game.
    pub game_id: Uuid,
    /// The participant.
    pub character_id: Uuid,
}

/// Event payload variants for the encounter aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EncounterEventKind {
    /// The order was calculated and combat started.
    TurnOrderCalculated(TurnOrderCalculated),
    /// The turn advanced to the next participant.
    TurnAdvanced(TurnMoved),
    /// The turn was forced onto a participant.
    TurnForced(TurnMoved),
    /// Combat ended.
    CombatEnded(CombatEnded),
    /// The order was rearranged.
    TurnOrderRearranged(TurnOrderRearranged),
    /// A participant was added.
    ParticipantAdded(ParticipantAdded),
    /// A participant was removed.
    ParticipantRemoved(ParticipantRemoved),
    /// A participant's entry was marked knocked out.
    ParticipantKnockedOut(ParticipantKoChanged),
    /// A participant's entry was cleared of knockout.
    ParticipantRevived(ParticipantKoChanged),
}

/// Domain event envelope for the encounter aggregate.
#[derive(Debug, Clone)]
pub struct EncounterEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: EncounterEventKind,
}

impl EncounterEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TurnOrderCalculated(_) => TURN_ORDER_CALCULATED_EVENT_TYPE,
            Self::TurnAdvanced(_) => TURN_ADVANCED_EVENT_TYPE,
            Self::TurnForced(_) => TURN_FORCED_EVENT_TYPE,
            Self::CombatEnded(_) => COMBAT_ENDED_EVENT_TYPE,
            Self::TurnOrderRearranged(_) => TURN_ORDER_REARRANGED_EVENT_TYPE,
            Self::ParticipantAdded(_) => PARTICIPANT_ADDED_EVENT_TYPE,
            Self::ParticipantRemoved(_) => PARTICIPANT_REMOVED_EVENT_TYPE,
            Self::ParticipantKnockedOut(_) => PARTICIPANT_KNOCKED_OUT_EVENT_TYPE,
            Self::ParticipantRevived(_) => PARTICIPANT_REVIVED_EVENT_TYPE,
        }
    }
}

impl DomainEvent for EncounterEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("EncounterEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

// --- Combatant events ---

/// Emitted when a character enters the combat system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantEnrolled {
    /// The character identifier.
    pub character_id: Uuid,
    /// The game the character belongs to.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether this is a non-player participant.
    pub is_npc: bool,
    /// Base dexterity.
    pub dexterity: i32,
    /// Starting HP.
    pub hp: i32,
    /// Maximum HP.
    pub max_hp: i32,
    /// Starting mana.
    pub mana: i32,
    /// Maximum mana.
    pub max_mana: i32,
}

/// Emitted when HP or mana changes by direct modification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolModified {
    /// The character identifier.
    pub character_id: Uuid,
    /// Requested change.
    pub amount: i32,
    /// Value before the change.
    pub previous: i32,
    /// Value after clamping.
    pub current: i32,
    /// Free-text reason supplied by the caller.
    pub reason: Option<String>,
}

/// Emitted when a status effect is attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEffectApplied {
    /// The character identifier.
    pub character_id: Uuid,
    /// The effect.
    pub effect: StatusEffect,
}

/// Emitted when a status effect is detached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEffectRemoved {
    /// The character identifier.
    pub character_id: Uuid,
    /// The effect identifier.
    pub effect_id: Uuid,
}

/// Emitted when a combatant's effects tick at the start of its turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEffectsTicked {
    /// The character identifier.
    pub character_id: Uuid,
    /// Tick outcome, including resulting pools and remaining effects.
    pub tick: StatusTick,
}

/// Emitted for knockout lifecycle transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KoStateChanged {
    /// The character identifier.
    pub character_id: Uuid,
}

/// Emitted when a combatant is revived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revived {
    /// The character identifier.
    pub character_id: Uuid,
    /// HP after revival.
    pub hp: i32,
}

/// Event payload variants for the combatant aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CombatantEventKind {
    /// The combatant was enrolled.
    CombatantEnrolled(CombatantEnrolled),
    /// HP changed.
    HpModified(PoolModified),
    /// Mana changed.
    ManaModified(PoolModified),
    /// A status effect was attached.
    StatusEffectApplied(StatusEffectApplied),
    /// A status effect was detached.
    StatusEffectRemoved(StatusEffectRemoved),
    /// Status effects ticked.
    StatusEffectsTicked(StatusEffectsTicked),
    /// HP reached zero; knockout pending.
    KoWarningRaised(KoStateChanged),
    /// Pending knockout cancelled by healing.
    KoWarningCleared(KoStateChanged),
    /// Knockout confirmed.
    KnockedOut(KoStateChanged),
    /// Revived from knockout.
    Revived(Revived),
}

impl CombatantEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CombatantEnrolled(_) => COMBATANT_ENROLLED_EVENT_TYPE,
            Self::HpModified(_) => HP_MODIFIED_EVENT_TYPE,
            Self::ManaModified(_) => MANA_MODIFIED_EVENT_TYPE,
            Self::StatusEffectApplied(_) => STATUS_EFFECT_APPLIED_EVENT_TYPE,
            Self::StatusEffectRemoved(_) => STATUS_EFFECT_REMOVED_EVENT_TYPE,
            Self::StatusEffectsTicked(_) => STATUS_EFFECTS_TICKED_EVENT_TYPE,
            Self::KoWarningRaised(_) => KO_WARNING_RAISED_EVENT_TYPE,
            Self::KoWarningCleared(_) => KO_WARNING_CLEARED_EVENT_TYPE,
            Self::KnockedOut(_) => KNOCKED_OUT_EVENT_TYPE,
            Self::Revived(_) => REVIVED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the combatant aggregate.
#[derive(Debug, Clone)]
pub struct CombatantEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: CombatantEventKind,
}

impl DomainEvent for CombatantEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("CombatantEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
