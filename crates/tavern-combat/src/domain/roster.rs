//! Roster mutation rules.
//!
//! Every mutation returns a new [`TurnOrder`]; callers record the result as
//! an event. While combat is running, the active participant keeps its
//! identity across mutations: the turn pointer is relocated by character id,
//! never carried over as a raw index.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tavern_core::error::DomainError;
use uuid::Uuid;

use super::initiative::sort_by_initiative;
use super::ties::detect_ties;
use super::turn_order::{TurnOrder, TurnOrderEntry, arrange, renumber};

/// A manual placement inside a tie group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieMove {
    /// The participant being placed.
    pub character_id: Uuid,
    /// The position it should occupy.
    pub new_position: usize,
}

fn active_guard(order: &TurnOrder, character_id: Uuid) -> Result<(), DomainError> {
    if order.current_character_id() == Some(character_id) {
        return Err(DomainError::InvariantViolation(format!(
            "character {character_id} is the active participant"
        )));
    }
    Ok(())
}

fn index_or_not_found(order: &TurnOrder, character_id: Uuid) -> Result<usize, DomainError> {
    order.index_of(character_id).ok_or_else(|| {
        DomainError::NotFound(format!("character {character_id} is not in the turn order"))
    })
}

/// Finds the new index of the previously active participant.
fn relocate(entries: &[TurnOrderEntry], previous: Option<Uuid>) -> usize {
    previous
        .and_then(|id| entries.iter().position(|e| e.character_id == id))
        .unwrap_or(0)
}

/// Adds `entry`, re-sorts by initiative, and starts combat if it was idle.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the participant is already present.
pub fn add(order: &TurnOrder, entry: TurnOrderEntry) -> Result<TurnOrder, DomainError> {
    if order.contains(entry.character_id) {
        return Err(DomainError::Validation(format!(
            "character {} is already in the turn order",
            entry.character_id
        )));
    }

    let previous = order.current_character_id();
    let mut entries = order.entries.clone();
    entries.push(entry);
    sort_by_initiative(&mut entries);

    Ok(TurnOrder {
        current_turn_index: relocate(&entries, previous),
        entries,
        combat_started: true,
    })
}

/// Removes a participant on request of the controlling party.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the participant is absent and
/// `DomainError::InvariantViolation` if it is the active participant.
pub fn remove(order: &TurnOrder, character_id: Uuid) -> Result<TurnOrder, DomainError> {
    let index = index_or_not_found(order, character_id)?;
    active_guard(order, character_id)?;

    let previous = order.current_character_id();
    let mut entries = order.entries.clone();
    entries.remove(index);
    renumber(&mut entries);

    Ok(TurnOrder {
        current_turn_index: relocate(&entries, previous),
        entries,
        combat_started: order.combat_started,
    })
}

/// Removes a participant that died or was deleted.
///
/// Unlike [`remove`], the active participant may be removed: the entry that
/// slides into its index becomes active (wrapping to the top). An order
/// emptied this way ends combat.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the participant is absent.
pub fn remove_fallen(order: &TurnOrder, character_id: Uuid) -> Result<TurnOrder, DomainError> {
    let index = index_or_not_found(order, character_id)?;

    let mut entries = order.entries.clone();
    entries.remove(index);
    renumber(&mut entries);

    let mut current = order.current_turn_index;
    if order.combat_started && index < current {
        current -= 1;
    }
    if current >= entries.len() {
        current = 0;
    }

    Ok(TurnOrder {
        combat_started: order.combat_started && !entries.is_empty(),
        current_turn_index: current,
        entries,
    })
}

/// Applies manual placements inside tie groups.
///
/// Moves must target participants of a contiguous equal-initiative run and
/// positions within that run. Unmoved members keep their relative order in
/// the remaining slots.
///
/// # Errors
///
/// Returns `DomainError::Validation` for malformed moves,
/// `DomainError::NotFound` for unknown participants, and
/// `DomainError::InvariantViolation` if the active participant would move.
pub fn resolve_ties(order: &TurnOrder, moves: &[TieMove]) -> Result<TurnOrder, DomainError> {
    if moves.is_empty() {
        return Err(DomainError::Validation("no tie moves supplied".to_owned()));
    }

    let groups = detect_ties(&order.entries);
    let mut seen_characters = HashSet::new();
    let mut seen_positions = HashSet::new();
    // group index -> (position -> character)
    let mut placements: BTreeMap<usize, BTreeMap<usize, Uuid>> = BTreeMap::new();

    for tie_move in moves {
        index_or_not_found(order, tie_move.character_id)?;
        if !seen_characters.insert(tie_move.character_id) {
            return Err(DomainError::Validation(format!(
                "character {} is moved more than once",
                tie_move.character_id
            )));
        }
        if !seen_positions.insert(tie_move.new_position) {
            return Err(DomainError::Validation(format!(
                "position {} is targeted more than once",
                tie_move.new_position
            )));
        }

        let (group_index, group) = groups
            .iter()
            .enumerate()
            .find(|(_, group)| group.contains(tie_move.character_id))
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "character {} is not part of a tie group",
                    tie_move.character_id
                ))
            })?;

        if !(group.first_position()..=group.last_position()).contains(&tie_move.new_position) {
            return Err(DomainError::Validation(format!(
                "position {} is outside the tie group at initiative {}",
                tie_move.new_position, group.initiative
            )));
        }

        if order.current_character_id() == Some(tie_move.character_id)
            && tie_move.new_position != order.current_turn_index
        {
            return Err(DomainError::InvariantViolation(
                "cannot move the active participant".to_owned(),
            ));
        }

        placements
            .entry(group_index)
            .or_default()
            .insert(tie_move.new_position, tie_move.character_id);
    }

    let mut ids = order.character_ids();
    for (group_index, placed) in &placements {
        let group = &groups[*group_index];
        let mut unplaced = group
            .characters
            .iter()
            .map(|c| c.character_id)
            .filter(|id| !placed.values().any(|p| p == id));
        for slot in group.first_position()..=group.last_position() {
            let id = match placed.get(&slot) {
                Some(id) => Some(*id),
                None => unplaced.next(),
            };
            if let Some(id) = id {
                ids[slot] = id;
            }
        }
    }

    let entries = arrange(&order.entries, &ids).ok_or_else(|| {
        DomainError::Validation("tie moves do not produce a valid order".to_owned())
    })?;
    ensure_active_unmoved(order, &entries)?;

    Ok(TurnOrder {
        entries,
        current_turn_index: order.current_turn_index,
        combat_started: order.combat_started,
    })
}

/// Replaces the order with an explicit arrangement of the same participants.
///
/// # Errors
///
/// Returns `DomainError::Validation` if `character_ids` is not a permutation
/// of the current participants and `DomainError::InvariantViolation` if the
/// active participant would change index.
pub fn reorder(order: &TurnOrder, character_ids: &[Uuid]) -> Result<TurnOrder, DomainError> {
    let entries = arrange(&order.entries, character_ids).ok_or_else(|| {
        DomainError::Validation(
            "new order must list every current participant exactly once".to_owned(),
        )
    })?;
    ensure_active_unmoved(order, &entries)?;

    Ok(TurnOrder {
        entries,
        current_turn_index: order.current_turn_index,
        combat_started: order.combat_started,
    })
}

fn ensure_active_unmoved(order: &TurnOrder, entries: &[TurnOrderEntry]) -> Result<(), DomainError> {
    if let Some(active) = order.current_character_id() {
        let moved = entries
            .get(order.current_turn_index)
            .is_none_or(|entry| entry.character_id != active);
        if moved {
            return Err(DomainError::InvariantViolation(
                "cannot relocate the active participant".to_owned(),
            ));
        }
    }
    Ok(())
}
