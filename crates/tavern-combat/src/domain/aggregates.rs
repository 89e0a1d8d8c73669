//! Aggregate roots for the Combat context.
//!
//! Domain methods validate, then record an event: the event is queued for
//! persistence and its state change is applied to the in-memory aggregate
//! immediately, so a handler can chain several methods in one command.
//! `version` always reflects persisted events only.

use serde::Serialize;
use tavern_core::aggregate::AggregateRoot;
use tavern_core::clock::Clock;
use tavern_core::error::DomainError;
use tavern_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{
    CombatEnded, CombatantEnrolled, CombatantEvent, CombatantEventKind, EncounterEvent,
    EncounterEventKind, KoStateChanged, ParticipantAdded, ParticipantKoChanged, ParticipantRemoved,
    PoolModified, RearrangeReason, RemovalCause, Revived, StatusEffectApplied,
    StatusEffectRemoved, StatusEffectsTicked, TurnMoved, TurnOrderCalculated, TurnOrderRearranged,
};
use super::knockout::{self, KoState, KoTransition};
use super::roster::{self, TieMove};
use super::status_effects::{self, Pools, StatusEffect, StatusTick, clamp_pool};
use super::turn_order::{TurnOrder, TurnOrderEntry};

fn event_metadata(
    aggregate_id: Uuid,
    event_type: &str,
    sequence_number: i64,
    correlation_id: Uuid,
    clock: &dyn Clock,
) -> EventMetadata {
    EventMetadata {
        event_id: Uuid::new_v4(),
        event_type: event_type.to_owned(),
        aggregate_id,
        sequence_number,
        correlation_id,
        causation_id: correlation_id,
        occurred_at: clock.now(),
    }
}

// =============================================================================
// Encounter
// =============================================================================

/// The combat state of one game.
#[derive(Debug)]
pub struct Encounter {
    /// Aggregate identifier (the owning game's id).
    pub id: Uuid,
    /// Current version (persisted event count).
    pub(crate) version: i64,
    /// The persisted turn order.
    pub(crate) turn_order: TurnOrder,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<EncounterEvent>,
}

impl Encounter {
    /// Creates an idle encounter with an empty order.
    #[must_use]
    pub fn new(game_id: Uuid) -> Self {
        Self {
            id: game_id,
            version: 0,
            turn_order: TurnOrder::default(),
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the turn order.
    #[must_use]
    pub fn turn_order(&self) -> &TurnOrder {
        &self.turn_order
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(&mut self, kind: EncounterEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let metadata = event_metadata(
            self.id,
            kind.event_type(),
            self.next_sequence_number(),
            correlation_id,
            clock,
        );
        self.mutate(&kind);
        self.uncommitted_events.push(EncounterEvent { metadata, kind });
    }

    fn mutate(&mut self, kind: &EncounterEventKind) {
        let order = &mut self.turn_order;
        match kind {
            EncounterEventKind::TurnOrderCalculated(payload) => {
                order.entries.clone_from(&payload.entries);
                order.current_turn_index = 0;
                order.combat_started = true;
            }
            EncounterEventKind::TurnAdvanced(payload) | EncounterEventKind::TurnForced(payload) => {
                order.current_turn_index = payload.to_index;
            }
            EncounterEventKind::CombatEnded(_) => {
                order.combat_started = false;
                order.current_turn_index = 0;
            }
            EncounterEventKind::TurnOrderRearranged(payload) => {
                order.entries.clone_from(&payload.entries);
            }
            EncounterEventKind::ParticipantAdded(payload) => {
                order.entries.clone_from(&payload.entries);
                order.current_turn_index = payload.current_turn_index;
                order.combat_started = true;
            }
            EncounterEventKind::ParticipantRemoved(payload) => {
                order.entries.clone_from(&payload.entries);
                order.current_turn_index = payload.current_turn_index;
                order.combat_started = payload.combat_started;
            }
            EncounterEventKind::ParticipantKnockedOut(payload) => {
                set_entry_ko(order, payload.character_id, true);
            }
            EncounterEventKind::ParticipantRevived(payload) => {
                set_entry_ko(order, payload.character_id, false);
            }
        }
    }

    fn require_started(&self) -> Result<(), DomainError> {
        if !self.turn_order.combat_started {
            return Err(DomainError::Validation(
                "combat has not started".to_owned(),
            ));
        }
        if self.turn_order.is_empty() {
            return Err(DomainError::Validation("turn order is empty".to_owned()));
        }
        Ok(())
    }

    /// Replaces the order with freshly ranked entries and starts combat at
    /// the top of the order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `entries` is empty.
    pub fn calculate(
        &mut self,
        entries: Vec<TurnOrderEntry>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if entries.is_empty() {
            return Err(DomainError::Validation(
                "no participants to order".to_owned(),
            ));
        }
        self.record(
            EncounterEventKind::TurnOrderCalculated(TurnOrderCalculated {
                game_id: self.id,
                entries,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Advances to the next entry, wrapping at the end.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if combat is not running.
    pub fn advance(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<TurnOrderEntry, DomainError> {
        self.require_started()?;
        let from_index = self.turn_order.current_turn_index;
        let to_index = (from_index + 1) % self.turn_order.len();
        let next = self.turn_order.entries[to_index].clone();
        self.record(
            EncounterEventKind::TurnAdvanced(TurnMoved {
                game_id: self.id,
                from_index,
                to_index,
                character_id: next.character_id,
            }),
            correlation_id,
            clock,
        );
        Ok(next)
    }

    /// Jumps the turn pointer directly to `character_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if combat is not running and
    /// `DomainError::NotFound` if the participant is not in the order.
    pub fn force_turn(
        &mut self,
        character_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<TurnOrderEntry, DomainError> {
        self.require_started()?;
        let to_index = self.turn_order.index_of(character_id).ok_or_else(|| {
            DomainError::NotFound(format!("character {character_id} is not in the turn order"))
        })?;
        let target = self.turn_order.entries[to_index].clone();
        self.record(
            EncounterEventKind::TurnForced(TurnMoved {
                game_id: self.id,
                from_index: self.turn_order.current_turn_index,
                to_index,
                character_id,
            }),
            correlation_id,
            clock,
        );
        Ok(target)
    }

    /// Ends combat, keeping the order inert. Returns `false` when combat was
    /// already idle (nothing recorded).
    pub fn end_combat(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> bool {
        if !self.turn_order.combat_started {
            return false;
        }
        self.record(
            EncounterEventKind::CombatEnded(CombatEnded { game_id: self.id }),
            correlation_id,
            clock,
        );
        true
    }

    /// Applies manual placements inside tie groups.
    ///
    /// # Errors
    ///
    /// Propagates the validation of [`roster::resolve_ties`]; also fails with
    /// `DomainError::Validation` if combat is not running.
    pub fn resolve_ties(
        &mut self,
        moves: &[TieMove],
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_started()?;
        let resolved = roster::resolve_ties(&self.turn_order, moves)?;
        self.record(
            EncounterEventKind::TurnOrderRearranged(TurnOrderRearranged {
                game_id: self.id,
                entries: resolved.entries,
                reason: RearrangeReason::TieResolved,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Replaces the arrangement with `character_ids`.
    ///
    /// # Errors
    ///
    /// Propagates the validation of [`roster::reorder`]; also fails with
    /// `DomainError::Validation` if combat is not running.
    pub fn update_order(
        &mut self,
        character_ids: &[Uuid],
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_started()?;
        let reordered = roster::reorder(&self.turn_order, character_ids)?;
        self.record(
            EncounterEventKind::TurnOrderRearranged(TurnOrderRearranged {
                game_id: self.id,
                entries: reordered.entries,
                reason: RearrangeReason::ManualUpdate,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Adds a participant, starting combat if idle.
    ///
    /// # Errors
    ///
    /// Propagates the validation of [`roster::add`].
    pub fn add_participant(
        &mut self,
        entry: TurnOrderEntry,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let character_id = entry.character_id;
        let added = roster::add(&self.turn_order, entry)?;
        self.record(
            EncounterEventKind::ParticipantAdded(ParticipantAdded {
                game_id: self.id,
                character_id,
                entries: added.entries,
                current_turn_index: added.current_turn_index,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Removes a participant at the controlling party's request.
    ///
    /// # Errors
    ///
    /// Propagates the validation of [`roster::remove`].
    pub fn remove_participant(
        &mut self,
        character_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let removed = roster::remove(&self.turn_order, character_id)?;
        self.record_removal(character_id, RemovalCause::Dismissed, removed, correlation_id, clock);
        Ok(())
    }

    /// Removes a non-player participant that died or was deleted.
    ///
    /// # Errors
    ///
    /// Propagates the validation of [`roster::remove_fallen`].
    pub fn remove_fallen(
        &mut self,
        character_id: Uuid,
        cause: RemovalCause,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let removed = roster::remove_fallen(&self.turn_order, character_id)?;
        self.record_removal(character_id, cause, removed, correlation_id, clock);
        Ok(())
    }

    fn record_removal(
        &mut self,
        character_id: Uuid,
        cause: RemovalCause,
        result: TurnOrder,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        self.record(
            EncounterEventKind::ParticipantRemoved(ParticipantRemoved {
                game_id: self.id,
                character_id,
                cause,
                entries: result.entries,
                current_turn_index: result.current_turn_index,
                combat_started: result.combat_started,
            }),
            correlation_id,
            clock,
        );
    }

    /// Mirrors a confirmed knockout onto the participant's entry. Does
    /// nothing if the participant has no entry or is already marked.
    pub fn mark_knocked_out(&mut self, character_id: Uuid, correlation_id: Uuid, clock: &dyn Clock) {
        if self.entry_ko(character_id) == Some(false) {
            self.record(
                EncounterEventKind::ParticipantKnockedOut(ParticipantKoChanged {
                    game_id: self.id,
                    character_id,
                }),
                correlation_id,
                clock,
            );
        }
    }

    /// Clears the knockout mark on the participant's entry. Does nothing if
    /// the participant has no entry or is not marked.
    pub fn mark_revived(&mut self, character_id: Uuid, correlation_id: Uuid, clock: &dyn Clock) {
        if self.entry_ko(character_id) == Some(true) {
            self.record(
                EncounterEventKind::ParticipantRevived(ParticipantKoChanged {
                    game_id: self.id,
                    character_id,
                }),
                correlation_id,
                clock,
            );
        }
    }

    fn entry_ko(&self, character_id: Uuid) -> Option<bool> {
        self.turn_order
            .index_of(character_id)
            .map(|index| self.turn_order.entries[index].is_ko)
    }
}

fn set_entry_ko(order: &mut TurnOrder, character_id: Uuid, is_ko: bool) {
    if let Some(entry) = order
        .entries
        .iter_mut()
        .find(|entry| entry.character_id == character_id)
    {
        entry.is_ko = is_ko;
    }
}

impl AggregateRoot for Encounter {
    type Event = EncounterEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        self.mutate(&event.kind);
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    #[allow(clippy::cast_possible_wrap)]
    fn clear_uncommitted_events(&mut self) {
        self.version += self.uncommitted_events.len() as i64;
        self.uncommitted_events.clear();
    }
}

// =============================================================================
// Combatant
// =============================================================================

/// Starting stats supplied when a character enters the combat system.
#[derive(Debug, Clone)]
pub struct Enrollment {
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

/// Result of a direct HP or mana change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolChange {
    /// The character identifier.
    pub character_id: Uuid,
    /// Requested change.
    pub amount: i32,
    /// Value before the change.
    pub previous: i32,
    /// Value after clamping.
    pub current: i32,
    /// Pool maximum.
    pub max: i32,
    /// Knockout lifecycle transition triggered by the change, if any.
    pub ko_transition: Option<KoTransition>,
}

/// What happened to a combatant at the start of its turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnStartReport {
    /// The character identifier.
    pub character_id: Uuid,
    /// Status effect tick, if the combatant had any effects.
    pub status: Option<StatusTick>,
    /// Knockout transitions in the order they happened.
    pub ko_transitions: Vec<KoTransition>,
    /// HP after processing.
    pub hp: i32,
    /// Mana after processing.
    pub mana: i32,
    /// Whether the combatant is knocked out.
    pub is_ko: bool,
    /// Whether a knockout is pending.
    pub ko_warning: bool,
}

impl TurnStartReport {
    /// Returns `true` if this turn start confirmed a knockout.
    #[must_use]
    pub fn knocked_out(&self) -> bool {
        self.ko_transitions.contains(&KoTransition::KnockedOut)
    }
}

/// The combat-relevant subset of a character.
#[derive(Debug)]
pub struct Combatant {
    /// Aggregate identifier (the character's id).
    pub id: Uuid,
    /// Current version (persisted event count).
    pub(crate) version: i64,
    pub(crate) enrolled: bool,
    pub(crate) game_id: Uuid,
    pub(crate) name: String,
    pub(crate) is_npc: bool,
    pub(crate) dexterity: i32,
    pub(crate) hp: i32,
    pub(crate) max_hp: i32,
    pub(crate) mana: i32,
    pub(crate) max_mana: i32,
    pub(crate) status_effects: Vec<StatusEffect>,
    pub(crate) is_ko: bool,
    pub(crate) ko_warning: bool,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<CombatantEvent>,
}

impl Combatant {
    /// Creates an unenrolled combatant.
    #[must_use]
    pub fn new(character_id: Uuid) -> Self {
        Self {
            id: character_id,
            version: 0,
            enrolled: false,
            game_id: Uuid::nil(),
            name: String::new(),
            is_npc: false,
            dexterity: 0,
            hp: 0,
            max_hp: 0,
            mana: 0,
            max_mana: 0,
            status_effects: Vec::new(),
            is_ko: false,
            ko_warning: false,
            uncommitted_events: Vec::new(),
        }
    }

    /// The game this combatant belongs to.
    #[must_use]
    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a non-player participant.
    #[must_use]
    pub fn is_npc(&self) -> bool {
        self.is_npc
    }

    /// Base dexterity.
    #[must_use]
    pub fn dexterity(&self) -> i32 {
        self.dexterity
    }

    /// Current HP.
    #[must_use]
    pub fn hp(&self) -> i32 {
        self.hp
    }

    /// Current mana.
    #[must_use]
    pub fn mana(&self) -> i32 {
        self.mana
    }

    /// Active status effects.
    #[must_use]
    pub fn status_effects(&self) -> &[StatusEffect] {
        &self.status_effects
    }

    /// Knockout lifecycle state.
    #[must_use]
    pub fn ko_state(&self) -> KoState {
        KoState::from_flags(self.is_ko, self.ko_warning)
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(&mut self, kind: CombatantEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let metadata = event_metadata(
            self.id,
            kind.event_type(),
            self.next_sequence_number(),
            correlation_id,
            clock,
        );
        self.mutate(&kind);
        self.uncommitted_events.push(CombatantEvent { metadata, kind });
    }

    fn mutate(&mut self, kind: &CombatantEventKind) {
        match kind {
            CombatantEventKind::CombatantEnrolled(payload) => {
                self.enrolled = true;
                self.game_id = payload.game_id;
                self.name.clone_from(&payload.name);
                self.is_npc = payload.is_npc;
                self.dexterity = payload.dexterity;
                self.hp = payload.hp;
                self.max_hp = payload.max_hp;
                self.mana = payload.mana;
                self.max_mana = payload.max_mana;
            }
            CombatantEventKind::HpModified(payload) => self.hp = payload.current,
            CombatantEventKind::ManaModified(payload) => self.mana = payload.current,
            CombatantEventKind::StatusEffectApplied(payload) => {
                self.status_effects.push(payload.effect.clone());
            }
            CombatantEventKind::StatusEffectRemoved(payload) => {
                self.status_effects
                    .retain(|effect| effect.id != payload.effect_id);
            }
            CombatantEventKind::StatusEffectsTicked(payload) => {
                self.hp = payload.tick.hp;
                self.mana = payload.tick.mana;
                self.status_effects.clone_from(&payload.tick.remaining);
            }
            CombatantEventKind::KoWarningRaised(_) => self.ko_warning = true,
            CombatantEventKind::KoWarningCleared(_) => self.ko_warning = false,
            CombatantEventKind::KnockedOut(_) => {
                self.is_ko = true;
                self.ko_warning = false;
            }
            CombatantEventKind::Revived(payload) => {
                self.hp = payload.hp;
                self.is_ko = false;
                self.ko_warning = false;
            }
        }
    }

    fn require_enrolled(&self) -> Result<(), DomainError> {
        if self.enrolled {
            Ok(())
        } else {
            Err(DomainError::AggregateNotFound(self.id))
        }
    }

    fn record_ko_transition(
        &mut self,
        transition: KoTransition,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let payload = KoStateChanged {
            character_id: self.id,
        };
        let kind = match transition {
            KoTransition::WarningRaised => CombatantEventKind::KoWarningRaised(payload),
            KoTransition::WarningCleared => CombatantEventKind::KoWarningCleared(payload),
            KoTransition::KnockedOut => CombatantEventKind::KnockedOut(payload),
        };
        self.record(kind, correlation_id, clock);
    }

    /// Enrolls the character with its starting stats.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if already enrolled, if the name is
    /// blank, or if a maximum is not positive.
    pub fn enroll(
        &mut self,
        enrollment: Enrollment,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.enrolled {
            return Err(DomainError::Validation(format!(
                "combatant {} is already enrolled",
                self.id
            )));
        }
        if enrollment.name.trim().is_empty() {
            return Err(DomainError::Validation(
                "combatant name must not be empty".to_owned(),
            ));
        }
        if enrollment.max_hp <= 0 || enrollment.max_mana < 0 {
            return Err(DomainError::Validation(
                "max_hp must be positive and max_mana non-negative".to_owned(),
            ));
        }

        self.record(
            CombatantEventKind::CombatantEnrolled(CombatantEnrolled {
                character_id: self.id,
                game_id: enrollment.game_id,
                name: enrollment.name,
                is_npc: enrollment.is_npc,
                dexterity: enrollment.dexterity,
                hp: clamp_pool(enrollment.hp, enrollment.max_hp),
                max_hp: enrollment.max_hp,
                mana: clamp_pool(enrollment.mana, enrollment.max_mana),
                max_mana: enrollment.max_mana,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Applies direct damage (negative) or healing (positive).
    ///
    /// Reaching zero HP raises a knockout warning; healing above zero during
    /// the grace window clears it. A knocked-out combatant stays knocked out
    /// until revived.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if not enrolled.
    pub fn modify_hp(
        &mut self,
        amount: i32,
        reason: Option<String>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<PoolChange, DomainError> {
        self.require_enrolled()?;
        let previous = self.hp;
        let current = clamp_pool(previous.saturating_add(amount), self.max_hp);
        self.record(
            CombatantEventKind::HpModified(PoolModified {
                character_id: self.id,
                amount,
                previous,
                current,
                reason,
            }),
            correlation_id,
            clock,
        );

        let ko_transition = knockout::after_hp_change(self.ko_state(), current);
        if let Some(transition) = ko_transition {
            self.record_ko_transition(transition, correlation_id, clock);
        }

        Ok(PoolChange {
            character_id: self.id,
            amount,
            previous,
            current,
            max: self.max_hp,
            ko_transition,
        })
    }

    /// Changes mana by `amount`, clamped to `[0, max_mana]`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if not enrolled.
    pub fn modify_mana(
        &mut self,
        amount: i32,
        reason: Option<String>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<PoolChange, DomainError> {
        self.require_enrolled()?;
        let previous = self.mana;
        let current = clamp_pool(previous.saturating_add(amount), self.max_mana);
        self.record(
            CombatantEventKind::ManaModified(PoolModified {
                character_id: self.id,
                amount,
                previous,
                current,
                reason,
            }),
            correlation_id,
            clock,
        );
        Ok(PoolChange {
            character_id: self.id,
            amount,
            previous,
            current,
            max: self.max_mana,
            ko_transition: None,
        })
    }

    /// Attaches a status effect.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if not enrolled and
    /// `DomainError::Validation` if an effect with the same id is active.
    pub fn apply_status_effect(
        &mut self,
        effect: StatusEffect,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_enrolled()?;
        if self.status_effects.iter().any(|e| e.id == effect.id) {
            return Err(DomainError::Validation(format!(
                "status effect {} is already active",
                effect.id
            )));
        }
        self.record(
            CombatantEventKind::StatusEffectApplied(StatusEffectApplied {
                character_id: self.id,
                effect,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Detaches a status effect.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if not enrolled and
    /// `DomainError::NotFound` if the effect is not active.
    pub fn remove_status_effect(
        &mut self,
        effect_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_enrolled()?;
        if !self.status_effects.iter().any(|e| e.id == effect_id) {
            return Err(DomainError::NotFound(format!(
                "status effect {effect_id} is not active on {}",
                self.id
            )));
        }
        self.record(
            CombatantEventKind::StatusEffectRemoved(StatusEffectRemoved {
                character_id: self.id,
                effect_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Start-of-turn processing: ticks status effects, then confirms a
    /// knockout warning carried over from a previous round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if not enrolled.
    pub fn begin_turn(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<TurnStartReport, DomainError> {
        self.require_enrolled()?;
        let warned_before_turn = self.ko_warning;
        let mut ko_transitions = Vec::new();

        let status = if self.status_effects.is_empty() {
            None
        } else {
            let tick = status_effects::tick(
                &self.status_effects,
                Pools {
                    hp: self.hp,
                    max_hp: self.max_hp,
                    mana: self.mana,
                    max_mana: self.max_mana,
                },
            );
            self.record(
                CombatantEventKind::StatusEffectsTicked(StatusEffectsTicked {
                    character_id: self.id,
                    tick: tick.clone(),
                }),
                correlation_id,
                clock,
            );
            if let Some(transition) = knockout::after_hp_change(self.ko_state(), self.hp) {
                self.record_ko_transition(transition, correlation_id, clock);
                ko_transitions.push(transition);
            }
            Some(tick)
        };

        if let Some(transition) =
            knockout::confirm_at_turn_start(warned_before_turn, self.ko_state(), self.hp)
        {
            self.record_ko_transition(transition, correlation_id, clock);
            ko_transitions.push(transition);
        }

        Ok(TurnStartReport {
            character_id: self.id,
            status,
            ko_transitions,
            hp: self.hp,
            mana: self.mana,
            is_ko: self.is_ko,
            ko_warning: self.ko_warning,
        })
    }

    /// Revives a knocked-out (or warned) combatant with `hp_amount` HP,
    /// clamped to `max_hp`. Returns the resulting HP.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if not enrolled and
    /// `DomainError::Validation` if the combatant is not down or
    /// `hp_amount` is not positive.
    pub fn revive(
        &mut self,
        hp_amount: i32,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<i32, DomainError> {
        self.require_enrolled()?;
        if !knockout::can_revive(self.ko_state()) {
            return Err(DomainError::Validation(format!(
                "combatant {} is not knocked out",
                self.id
            )));
        }
        if hp_amount <= 0 {
            return Err(DomainError::Validation(
                "revive hp amount must be positive".to_owned(),
            ));
        }
        let hp = hp_amount.min(self.max_hp);
        self.record(
            CombatantEventKind::Revived(Revived {
                character_id: self.id,
                hp,
            }),
            correlation_id,
            clock,
        );
        Ok(hp)
    }
}

impl AggregateRoot for Combatant {
    type Event = CombatantEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        self.mutate(&event.kind);
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    #[allow(clippy::cast_possible_wrap)]
    fn clear_uncommitted_events(&mut self) {
        self.version += self.uncommitted_events.len() as i64;
        self.uncommitted_events.clear();
    }
}
