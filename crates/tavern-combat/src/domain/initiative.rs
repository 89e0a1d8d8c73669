//! Initiative calculation.
//!
//! Player characters roll base dexterity plus the dexterity modifiers of
//! every equipped item. Non-player participants use base dexterity only.

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use super::turn_order::{TurnOrderEntry, renumber};

/// A roster member ready to be ranked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiativeCandidate {
    /// The character identifier.
    pub character_id: Uuid,
    /// Display name snapshot.
    pub name: String,
    /// Base dexterity.
    pub dexterity: i32,
    /// Whether this is a non-player participant.
    pub is_npc: bool,
    /// Whether the participant is currently knocked out.
    pub is_ko: bool,
    /// Items currently equipped by the participant.
    pub equipped_item_ids: Vec<Uuid>,
}

/// Collects the distinct equipped item ids across all player characters, so
/// the equipment lookup can be done in one batch.
#[must_use]
pub fn bonus_item_ids(candidates: &[InitiativeCandidate]) -> Vec<Uuid> {
    candidates
        .iter()
        .filter(|candidate| !candidate.is_npc)
        .flat_map(|candidate| candidate.equipped_item_ids.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Computes a single candidate's initiative.
///
/// Items missing from `bonuses` contribute nothing. The sum saturates at the
/// `i32` bounds.
#[must_use]
pub fn initiative_for(candidate: &InitiativeCandidate, bonuses: &HashMap<Uuid, i32>) -> i32 {
    if candidate.is_npc {
        return candidate.dexterity;
    }
    candidate
        .equipped_item_ids
        .iter()
        .filter_map(|item_id| bonuses.get(item_id))
        .fold(candidate.dexterity, |total, bonus| total.saturating_add(*bonus))
}

/// Builds a turn order entry for `candidate`. Position is assigned when the
/// entry is placed into an order.
#[must_use]
pub fn entry_for(candidate: &InitiativeCandidate, bonuses: &HashMap<Uuid, i32>) -> TurnOrderEntry {
    TurnOrderEntry {
        character_id: candidate.character_id,
        name: candidate.name.clone(),
        initiative: initiative_for(candidate, bonuses),
        position: 0,
        is_ko: candidate.is_ko,
        is_npc: candidate.is_npc,
    }
}

/// Ranks the roster by initiative, highest first.
///
/// Equal initiatives keep their roster order, which keeps tie groups
/// contiguous.
#[must_use]
pub fn rank(candidates: &[InitiativeCandidate], bonuses: &HashMap<Uuid, i32>) -> Vec<TurnOrderEntry> {
    let mut entries: Vec<TurnOrderEntry> = candidates
        .iter()
        .map(|candidate| entry_for(candidate, bonuses))
        .collect();
    sort_by_initiative(&mut entries);
    entries
}

/// Stable sort by descending initiative, then renumber positions.
pub fn sort_by_initiative(entries: &mut [TurnOrderEntry]) {
    entries.sort_by(|a, b| b.initiative.cmp(&a.initiative));
    renumber(entries);
}
