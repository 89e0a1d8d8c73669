//! Command handlers for the Combat context.
//!
//! [`CombatOrchestrator`] is the single entry point for real-time combat
//! commands: it authorizes the caller, loads the encounter and combatant
//! aggregates, runs the domain logic and persists the resulting events with
//! optimistic concurrency. Commands that change both aggregates persist them
//! in one atomic multi-stream append.
//!
//! The free `handle_*` functions serve the HTTP plumbing for combatant
//! enrolment and status effects.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tavern_core::aggregate::AggregateRoot;
use tavern_core::clock::Clock;
use tavern_core::error::DomainError;
use tavern_core::event::{DomainEvent, EventMetadata};
use tavern_core::repository::{EventRepository, StoredEvent, StreamAppend};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::broadcasts::{Broadcast, ServerEvent, TurnOrderChange};
use crate::application::ports::{AuthorizationService, EquipmentBonusLookup, RosterProvider};
use crate::application::query_handlers::{self, TurnOrderView};
use crate::domain::aggregates::{Combatant, Encounter, Enrollment};
use crate::domain::commands::{
    ApplyStatusEffect, CombatCommand, CommandEnvelope, EnrollCombatant, RemoveStatusEffect,
};
use crate::domain::events::{
    CombatantEvent, CombatantEventKind, EncounterEvent, EncounterEventKind, RemovalCause,
};
use crate::domain::initiative::{self, InitiativeCandidate};
use crate::domain::roster::TieMove;
use crate::domain::ties::detect_ties;

/// Result of a successfully handled combatant command.
#[derive(Debug)]
pub struct CombatantCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

fn to_stored_event<E: DomainEvent>(event: &E) -> StoredEvent {
    let meta = event.metadata();
    StoredEvent {
        event_id: meta.event_id,
        aggregate_id: meta.aggregate_id,
        event_type: event.event_type().to_owned(),
        payload: event.to_payload(),
        sequence_number: meta.sequence_number,
        correlation_id: meta.correlation_id,
        causation_id: meta.causation_id,
        occurred_at: meta.occurred_at,
    }
}

fn decode<K: DeserializeOwned>(stored: &StoredEvent) -> Result<(EventMetadata, K), DomainError> {
    let kind: K = serde_json::from_value(stored.payload.clone())
        .map_err(|e| DomainError::Infrastructure(format!("event deserialization failed: {e}")))?;
    let metadata = EventMetadata {
        event_id: stored.event_id,
        event_type: stored.event_type.clone(),
        aggregate_id: stored.aggregate_id,
        sequence_number: stored.sequence_number,
        correlation_id: stored.correlation_id,
        causation_id: stored.causation_id,
        occurred_at: stored.occurred_at,
    };
    Ok((metadata, kind))
}

/// Reconstitutes an `Encounter` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute_encounter(
    game_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Encounter, DomainError> {
    let mut encounter = Encounter::new(game_id);
    for stored in existing_events {
        let (metadata, kind) = decode::<EncounterEventKind>(stored)?;
        encounter.apply(&EncounterEvent { metadata, kind });
    }
    Ok(encounter)
}

/// Reconstitutes a `Combatant` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute_combatant(
    character_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Combatant, DomainError> {
    let mut combatant = Combatant::new(character_id);
    for stored in existing_events {
        let (metadata, kind) = decode::<CombatantEventKind>(stored)?;
        combatant.apply(&CombatantEvent { metadata, kind });
    }
    Ok(combatant)
}

fn pending_append<A>(aggregate: &A) -> Option<StreamAppend>
where
    A: AggregateRoot,
    A::Event: DomainEvent,
{
    let events: Vec<StoredEvent> = aggregate
        .uncommitted_events()
        .iter()
        .map(to_stored_event)
        .collect();
    (!events.is_empty()).then(|| StreamAppend {
        aggregate_id: aggregate.aggregate_id(),
        expected_version: aggregate.version(),
        events,
    })
}

async fn persist<A>(aggregate: &mut A, repo: &dyn EventRepository) -> Result<Vec<StoredEvent>, DomainError>
where
    A: AggregateRoot,
    A::Event: DomainEvent,
{
    let Some(append) = pending_append(&*aggregate) else {
        return Ok(Vec::new());
    };
    repo.append_events(append.aggregate_id, append.expected_version, &append.events)
        .await?;
    aggregate.clear_uncommitted_events();
    Ok(append.events)
}

async fn load_combatant(
    character_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<Combatant, DomainError> {
    let existing_events = repo.load_events(character_id).await?;
    if existing_events.is_empty() {
        return Err(DomainError::AggregateNotFound(character_id));
    }
    reconstitute_combatant(character_id, &existing_events)
}

/// The façade the transport layer calls for every combat command.
#[derive(Clone)]
pub struct CombatOrchestrator {
    clock: Arc<dyn Clock>,
    repo: Arc<dyn EventRepository>,
    authorization: Arc<dyn AuthorizationService>,
    roster: Arc<dyn RosterProvider>,
    equipment: Arc<dyn EquipmentBonusLookup>,
}

impl std::fmt::Debug for CombatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatOrchestrator").finish_non_exhaustive()
    }
}

impl CombatOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        repo: Arc<dyn EventRepository>,
        authorization: Arc<dyn AuthorizationService>,
        roster: Arc<dyn RosterProvider>,
        equipment: Arc<dyn EquipmentBonusLookup>,
    ) -> Self {
        Self {
            clock,
            repo,
            authorization,
            roster,
            equipment,
        }
    }

    /// Returns the authorization collaborator, shared with the transport's
    /// session handling.
    #[must_use]
    pub fn authorization(&self) -> &Arc<dyn AuthorizationService> {
        &self.authorization
    }

    /// Returns the roster collaborator, shared with combatant enrolment.
    #[must_use]
    pub fn roster(&self) -> &Arc<dyn RosterProvider> {
        &self.roster
    }

    /// Authorizes and executes one command, returning the broadcasts it
    /// produced. On error nothing was persisted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Unauthorized` if the caller lacks the privilege
    /// for the command, and any error the command itself raises.
    #[instrument(
        skip(self, envelope),
        fields(
            command = envelope.command.name(),
            game_id = %envelope.game_id,
            issuer = %envelope.issuer,
            correlation_id = %envelope.correlation_id,
        )
    )]
    pub async fn dispatch(&self, envelope: &CommandEnvelope) -> Result<Vec<Broadcast>, DomainError> {
        if let Err(e) = self.authorize(envelope).await {
            warn!(error = %e, "command rejected");
            return Err(e);
        }

        let game_id = envelope.game_id;
        let correlation_id = envelope.correlation_id;
        let result = match &envelope.command {
            CombatCommand::CalculateTurnOrder => self.calculate(game_id, correlation_id).await,
            CombatCommand::ResolveTie { moves } => {
                self.resolve_tie(game_id, moves, correlation_id).await
            }
            CombatCommand::UpdateTurnOrder { order } => {
                self.update_order(game_id, order, correlation_id).await
            }
            CombatCommand::NextTurn => self.next_turn(game_id, correlation_id).await,
            CombatCommand::EndCombat => self.end_combat(game_id, correlation_id).await,
            CombatCommand::ForceTurn { character_id } => {
                self.force_turn(game_id, *character_id, correlation_id).await
            }
            CombatCommand::AddToTurnOrder { character_id } => {
                self.add(game_id, *character_id, correlation_id).await
            }
            CombatCommand::RemoveFromTurnOrder { character_id } => {
                self.remove(game_id, *character_id, correlation_id).await
            }
            CombatCommand::GetTurnOrder => self.get_turn_order(game_id).await,
            CombatCommand::ModifyHp {
                character_id,
                amount,
                reason,
            } => {
                self.modify_hp(game_id, *character_id, *amount, reason.clone(), correlation_id)
                    .await
            }
            CombatCommand::ModifyMana {
                character_id,
                amount,
                reason,
            } => {
                self.modify_mana(game_id, *character_id, *amount, reason.clone(), correlation_id)
                    .await
            }
            CombatCommand::ReviveCharacter {
                character_id,
                hp_amount,
            } => {
                self.revive(game_id, *character_id, *hp_amount, correlation_id)
                    .await
            }
            CombatCommand::NpcKilled { character_id } => {
                self.remove_fallen(game_id, *character_id, RemovalCause::NpcKilled, correlation_id)
                    .await
            }
            CombatCommand::NpcDeleted { character_id } => {
                self.remove_fallen(game_id, *character_id, RemovalCause::NpcDeleted, correlation_id)
                    .await
            }
        };

        match &result {
            Ok(broadcasts) => info!(broadcasts = broadcasts.len(), "command handled"),
            Err(e) => warn!(error = %e, "command failed"),
        }
        result
    }

    async fn authorize(&self, envelope: &CommandEnvelope) -> Result<(), DomainError> {
        let game_id = envelope.game_id;
        let issuer = envelope.issuer;
        let allowed = match &envelope.command {
            CombatCommand::GetTurnOrder => {
                self.authorization.is_participant(game_id, issuer).await?
            }
            CombatCommand::ModifyHp { character_id, .. }
            | CombatCommand::ModifyMana { character_id, .. } => {
                self.authorization
                    .controls_character(game_id, issuer, *character_id)
                    .await?
            }
            _ => {
                self.authorization
                    .is_controlling_party(game_id, issuer)
                    .await?
            }
        };
        if allowed {
            Ok(())
        } else {
            Err(DomainError::Unauthorized(format!(
                "user {issuer} may not {} in game {game_id}",
                envelope.command.name()
            )))
        }
    }

    async fn load_encounter(&self, game_id: Uuid) -> Result<Encounter, DomainError> {
        let existing_events = self.repo.load_events(game_id).await?;
        reconstitute_encounter(game_id, &existing_events)
    }

    async fn load_participant(
        &self,
        game_id: Uuid,
        character_id: Uuid,
    ) -> Result<Combatant, DomainError> {
        let combatant = load_combatant(character_id, self.repo.as_ref()).await?;
        if combatant.game_id() != game_id {
            return Err(DomainError::NotFound(format!(
                "character {character_id} does not belong to game {game_id}"
            )));
        }
        Ok(combatant)
    }

    async fn candidate(
        &self,
        game_id: Uuid,
        character_id: Uuid,
        equipped_item_ids: Vec<Uuid>,
    ) -> Result<InitiativeCandidate, DomainError> {
        let combatant = self.load_participant(game_id, character_id).await?;
        Ok(InitiativeCandidate {
            character_id,
            name: combatant.name().to_owned(),
            dexterity: combatant.dexterity(),
            is_npc: combatant.is_npc(),
            is_ko: combatant.is_ko,
            equipped_item_ids,
        })
    }

    async fn bonuses(
        &self,
        candidates: &[InitiativeCandidate],
    ) -> Result<HashMap<Uuid, i32>, DomainError> {
        let item_ids = initiative::bonus_item_ids(candidates);
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.equipment.dexterity_bonuses(&item_ids).await
    }

    async fn persist_encounter(&self, encounter: &mut Encounter) -> Result<(), DomainError> {
        persist(encounter, self.repo.as_ref()).await.map(|_| ())
    }

    async fn persist_combatant(&self, combatant: &mut Combatant) -> Result<(), DomainError> {
        persist(combatant, self.repo.as_ref()).await.map(|_| ())
    }

    /// Writes both aggregates in one atomic append.
    async fn persist_together(
        &self,
        encounter: &mut Encounter,
        combatant: &mut Combatant,
    ) -> Result<(), DomainError> {
        let appends: Vec<StreamAppend> = [pending_append(&*encounter), pending_append(&*combatant)]
            .into_iter()
            .flatten()
            .collect();
        if appends.is_empty() {
            return Ok(());
        }
        self.repo.append_streams(&appends).await?;
        encounter.clear_uncommitted_events();
        combatant.clear_uncommitted_events();
        Ok(())
    }

    fn order_updated(encounter: &Encounter, change: TurnOrderChange) -> Vec<Broadcast> {
        vec![Broadcast::to_game(
            encounter.id,
            ServerEvent::TurnOrderUpdated {
                turn_order: TurnOrderView::of(encounter),
                change,
            },
        )]
    }

    async fn calculate(
        &self,
        game_id: Uuid,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let members = self.roster.combat_roster(game_id).await?;
        let mut candidates = Vec::with_capacity(members.len());
        for member in members {
            candidates.push(
                self.candidate(game_id, member.character_id, member.equipped_item_ids)
                    .await?,
            );
        }
        let bonuses = self.bonuses(&candidates).await?;
        let entries = initiative::rank(&candidates, &bonuses);

        let mut encounter = self.load_encounter(game_id).await?;
        encounter.calculate(entries, correlation_id, self.clock.as_ref())?;
        self.persist_encounter(&mut encounter).await?;

        let tie_groups = detect_ties(&encounter.turn_order().entries);
        Ok(vec![Broadcast::to_game(
            game_id,
            ServerEvent::TurnOrderCalculated {
                turn_order: TurnOrderView::of(&encounter),
                tie_groups,
            },
        )])
    }

    async fn resolve_tie(
        &self,
        game_id: Uuid,
        moves: &[TieMove],
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let mut encounter = self.load_encounter(game_id).await?;
        encounter.resolve_ties(moves, correlation_id, self.clock.as_ref())?;
        self.persist_encounter(&mut encounter).await?;
        Ok(Self::order_updated(&encounter, TurnOrderChange::TieResolved))
    }

    async fn update_order(
        &self,
        game_id: Uuid,
        order: &[Uuid],
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let mut encounter = self.load_encounter(game_id).await?;
        encounter.update_order(order, correlation_id, self.clock.as_ref())?;
        self.persist_encounter(&mut encounter).await?;
        Ok(Self::order_updated(&encounter, TurnOrderChange::ManualUpdate))
    }

    async fn next_turn(
        &self,
        game_id: Uuid,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let clock = self.clock.as_ref();
        let mut encounter = self.load_encounter(game_id).await?;
        let next = encounter.advance(correlation_id, clock)?;

        let mut combatant = self.load_participant(game_id, next.character_id).await?;
        let turn_start = combatant.begin_turn(correlation_id, clock)?;
        if turn_start.knocked_out() {
            encounter.mark_knocked_out(next.character_id, correlation_id, clock);
        }
        self.persist_together(&mut encounter, &mut combatant).await?;

        let event = ServerEvent::TurnAdvanced {
            turn_order: TurnOrderView::of(&encounter),
            turn_start,
        };
        Ok(vec![
            Broadcast::to_game(game_id, event.clone()),
            Broadcast::to_character(next.character_id, event),
        ])
    }

    async fn end_combat(
        &self,
        game_id: Uuid,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let mut encounter = self.load_encounter(game_id).await?;
        if !encounter.end_combat(correlation_id, self.clock.as_ref()) {
            return Ok(vec![Broadcast::to_caller(ServerEvent::TurnOrderState {
                turn_order: TurnOrderView::of(&encounter),
            })]);
        }
        self.persist_encounter(&mut encounter).await?;
        Ok(Self::order_updated(&encounter, TurnOrderChange::CombatEnded))
    }

    async fn force_turn(
        &self,
        game_id: Uuid,
        character_id: Uuid,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let mut encounter = self.load_encounter(game_id).await?;
        encounter.force_turn(character_id, correlation_id, self.clock.as_ref())?;
        self.persist_encounter(&mut encounter).await?;
        Ok(vec![Broadcast::to_game(
            game_id,
            ServerEvent::TurnForced {
                turn_order: TurnOrderView::of(&encounter),
                character_id,
            },
        )])
    }

    async fn add(
        &self,
        game_id: Uuid,
        character_id: Uuid,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let member = self
            .roster
            .roster_member(game_id, character_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!(
                    "character {character_id} is not on the roster of game {game_id}"
                ))
            })?;
        let candidate = self
            .candidate(game_id, character_id, member.equipped_item_ids)
            .await?;
        let bonuses = self.bonuses(std::slice::from_ref(&candidate)).await?;
        let entry = initiative::entry_for(&candidate, &bonuses);

        let mut encounter = self.load_encounter(game_id).await?;
        encounter.add_participant(entry, correlation_id, self.clock.as_ref())?;
        self.persist_encounter(&mut encounter).await?;
        Ok(Self::order_updated(
            &encounter,
            TurnOrderChange::ParticipantAdded { character_id },
        ))
    }

    async fn remove(
        &self,
        game_id: Uuid,
        character_id: Uuid,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let mut encounter = self.load_encounter(game_id).await?;
        encounter.remove_participant(character_id, correlation_id, self.clock.as_ref())?;
        self.persist_encounter(&mut encounter).await?;
        Ok(Self::order_updated(
            &encounter,
            TurnOrderChange::ParticipantRemoved {
                character_id,
                cause: RemovalCause::Dismissed,
            },
        ))
    }

    async fn remove_fallen(
        &self,
        game_id: Uuid,
        character_id: Uuid,
        cause: RemovalCause,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let mut encounter = self.load_encounter(game_id).await?;
        let is_npc = encounter
            .turn_order()
            .index_of(character_id)
            .map(|index| encounter.turn_order().entries[index].is_npc);
        if is_npc == Some(false) {
            return Err(DomainError::Validation(format!(
                "character {character_id} is not a non-player participant"
            )));
        }
        encounter.remove_fallen(character_id, cause, correlation_id, self.clock.as_ref())?;
        self.persist_encounter(&mut encounter).await?;
        Ok(Self::order_updated(
            &encounter,
            TurnOrderChange::ParticipantRemoved {
                character_id,
                cause,
            },
        ))
    }

    async fn get_turn_order(&self, game_id: Uuid) -> Result<Vec<Broadcast>, DomainError> {
        let turn_order = query_handlers::get_turn_order(game_id, self.repo.as_ref()).await?;
        Ok(vec![Broadcast::to_caller(ServerEvent::TurnOrderState {
            turn_order,
        })])
    }

    async fn modify_hp(
        &self,
        game_id: Uuid,
        character_id: Uuid,
        amount: i32,
        reason: Option<String>,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let mut combatant = self.load_participant(game_id, character_id).await?;
        let change = combatant.modify_hp(amount, reason, correlation_id, self.clock.as_ref())?;
        self.persist_combatant(&mut combatant).await?;
        let event = ServerEvent::HpModified(change);
        Ok(vec![
            Broadcast::to_game(game_id, event.clone()),
            Broadcast::to_character(character_id, event),
        ])
    }

    async fn modify_mana(
        &self,
        game_id: Uuid,
        character_id: Uuid,
        amount: i32,
        reason: Option<String>,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let mut combatant = self.load_participant(game_id, character_id).await?;
        let change = combatant.modify_mana(amount, reason, correlation_id, self.clock.as_ref())?;
        self.persist_combatant(&mut combatant).await?;
        let event = ServerEvent::ManaModified(change);
        Ok(vec![
            Broadcast::to_game(game_id, event.clone()),
            Broadcast::to_character(character_id, event),
        ])
    }

    async fn revive(
        &self,
        game_id: Uuid,
        character_id: Uuid,
        hp_amount: i32,
        correlation_id: Uuid,
    ) -> Result<Vec<Broadcast>, DomainError> {
        let clock = self.clock.as_ref();
        let mut combatant = self.load_participant(game_id, character_id).await?;
        let mut encounter = self.load_encounter(game_id).await?;
        let hp = combatant.revive(hp_amount, correlation_id, clock)?;
        encounter.mark_revived(character_id, correlation_id, clock);
        self.persist_together(&mut encounter, &mut combatant).await?;

        let event = ServerEvent::CharacterRevived { character_id, hp };
        Ok(vec![
            Broadcast::to_game(game_id, event.clone()),
            Broadcast::to_character(character_id, event),
        ])
    }
}

/// Handles the `EnrollCombatant` command: creates the combatant aggregate
/// for a character on the game's roster and persists the resulting events.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the character is not an active roster
/// member of the game, `DomainError::Validation` if the character is already
/// enrolled or the stats are invalid, and `DomainError` if event loading or
/// appending fails.
pub async fn handle_enroll_combatant(
    command: &EnrollCombatant,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    roster: &dyn RosterProvider,
) -> Result<CombatantCommandResult, DomainError> {
    if roster
        .roster_member(command.game_id, command.character_id)
        .await?
        .is_none()
    {
        return Err(DomainError::NotFound(format!(
            "character {} is not on the roster of game {}",
            command.character_id, command.game_id
        )));
    }

    let existing_events = repo.load_events(command.character_id).await?;
    let mut combatant = reconstitute_combatant(command.character_id, &existing_events)?;

    combatant.enroll(
        Enrollment {
            game_id: command.game_id,
            name: command.name.clone(),
            is_npc: command.is_npc,
            dexterity: command.dexterity,
            hp: command.hp,
            max_hp: command.max_hp,
            mana: command.mana,
            max_mana: command.max_mana,
        },
        command.correlation_id,
        clock,
    )?;

    let stored_events = persist(&mut combatant, repo).await?;
    Ok(CombatantCommandResult {
        aggregate_id: command.character_id,
        stored_events,
    })
}

/// Handles the `ApplyStatusEffect` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the combatant does not exist,
/// `DomainError::Validation` if the effect is already active, and
/// `DomainError` if event loading or appending fails.
pub async fn handle_apply_status_effect(
    command: &ApplyStatusEffect,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<CombatantCommandResult, DomainError> {
    let mut combatant = load_combatant(command.character_id, repo).await?;

    combatant.apply_status_effect(command.effect.clone(), command.correlation_id, clock)?;

    let stored_events = persist(&mut combatant, repo).await?;
    Ok(CombatantCommandResult {
        aggregate_id: command.character_id,
        stored_events,
    })
}

/// Handles the `RemoveStatusEffect` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the combatant does not exist,
/// `DomainError::NotFound` if the effect is not active, and `DomainError`
/// if event loading or appending fails.
pub async fn handle_remove_status_effect(
    command: &RemoveStatusEffect,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<CombatantCommandResult, DomainError> {
    let mut combatant = load_combatant(command.character_id, repo).await?;

    combatant.remove_status_effect(command.effect_id, command.correlation_id, clock)?;

    let stored_events = persist(&mut combatant, repo).await?;
    Ok(CombatantCommandResult {
        aggregate_id: command.character_id,
        stored_events,
    })
}
