//! Turn order value types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single participant slot in a turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrderEntry {
    /// The participating character.
    pub character_id: Uuid,
    /// Name snapshot taken when the entry was created.
    pub name: String,
    /// Initiative score used for ranking.
    pub initiative: i32,
    /// Dense index of the entry within the order.
    pub position: usize,
    /// Whether the participant is knocked out.
    pub is_ko: bool,
    /// Whether the participant is a non-player character.
    pub is_npc: bool,
}

/// The ordered combat roster plus the pointer to the active participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrder {
    /// Entries in turn order; `entries[i].position == i`.
    pub entries: Vec<TurnOrderEntry>,
    /// Index of the active entry. Meaningful only while `combat_started`.
    pub current_turn_index: usize,
    /// Whether combat is running.
    pub combat_started: bool,
}

impl TurnOrder {
    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the order has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the index of `character_id` in the order.
    #[must_use]
    pub fn index_of(&self, character_id: Uuid) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.character_id == character_id)
    }

    /// Returns `true` if `character_id` has an entry.
    #[must_use]
    pub fn contains(&self, character_id: Uuid) -> bool {
        self.index_of(character_id).is_some()
    }

    /// Returns the active entry, if combat is running.
    #[must_use]
    pub fn current(&self) -> Option<&TurnOrderEntry> {
        if self.combat_started {
            self.entries.get(self.current_turn_index)
        } else {
            None
        }
    }

    /// Returns the id of the active participant, if combat is running.
    #[must_use]
    pub fn current_character_id(&self) -> Option<Uuid> {
        self.current().map(|entry| entry.character_id)
    }

    /// Returns the character ids in order.
    #[must_use]
    pub fn character_ids(&self) -> Vec<Uuid> {
        self.entries.iter().map(|entry| entry.character_id).collect()
    }

    /// Returns `true` if every entry's position equals its index.
    #[must_use]
    pub fn positions_are_dense(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(index, entry)| entry.position == index)
    }
}

/// Rewrites `position` so that `entries[i].position == i`.
pub(crate) fn renumber(entries: &mut [TurnOrderEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.position = index;
    }
}

/// Rearranges `entries` to follow `ids`. Returns `None` if `ids` is not a
/// permutation of the entries' character ids.
pub(crate) fn arrange(entries: &[TurnOrderEntry], ids: &[Uuid]) -> Option<Vec<TurnOrderEntry>> {
    if ids.len() != entries.len() {
        return None;
    }
    let mut remaining: Vec<Option<TurnOrderEntry>> = entries.iter().cloned().map(Some).collect();
    let mut arranged = Vec::with_capacity(entries.len());
    for id in ids {
        let slot = remaining
            .iter_mut()
            .find(|slot| matches!(slot, Some(entry) if entry.character_id == *id))?;
        arranged.push(slot.take()?);
    }
    renumber(&mut arranged);
    Some(arranged)
}
