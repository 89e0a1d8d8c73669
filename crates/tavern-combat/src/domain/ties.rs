//! Tie detection over a ranked turn order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::turn_order::TurnOrderEntry;

/// A participant inside a tie group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiedCharacter {
    /// The character identifier.
    pub character_id: Uuid,
    /// Name snapshot.
    pub name: String,
    /// Current position in the order.
    pub position: usize,
}

/// A contiguous run of entries sharing one initiative value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieGroup {
    /// The shared initiative.
    pub initiative: i32,
    /// Members in their current order.
    pub characters: Vec<TiedCharacter>,
}

impl TieGroup {
    /// First position covered by the group.
    #[must_use]
    pub fn first_position(&self) -> usize {
        self.characters.first().map_or(0, |c| c.position)
    }

    /// Last position covered by the group.
    #[must_use]
    pub fn last_position(&self) -> usize {
        self.characters.last().map_or(0, |c| c.position)
    }

    /// Returns `true` if `character_id` belongs to the group.
    #[must_use]
    pub fn contains(&self, character_id: Uuid) -> bool {
        self.characters.iter().any(|c| c.character_id == character_id)
    }
}

/// Groups adjacent entries with identical initiative. Only runs of two or
/// more are reported; equal values that are not adjacent are never grouped.
#[must_use]
pub fn detect_ties(entries: &[TurnOrderEntry]) -> Vec<TieGroup> {
    entries
        .chunk_by(|a, b| a.initiative == b.initiative)
        .filter(|run| run.len() >= 2)
        .map(|run| TieGroup {
            initiative: run[0].initiative,
            characters: run
                .iter()
                .map(|entry| TiedCharacter {
                    character_id: entry.character_id,
                    name: entry.name.clone(),
                    position: entry.position,
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::turn_order::fixtures::entries;

    #[test]
    fn test_detect_ties_groups_contiguous_run() {
        // Arrange
        let order = entries(&[("A", 5), ("B", 5), ("C", 3)]);

        // Act
        let groups = detect_ties(&order);

        // Assert
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].initiative, 5);
        let names: Vec<&str> = groups[0].characters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(groups[0].first_position(), 0);
        assert_eq!(groups[0].last_position(), 1);
    }

    #[test]
    fn test_detect_ties_ignores_non_adjacent_equal_values() {
        let order = entries(&[("A", 5), ("B", 4), ("C", 5)]);

        assert!(detect_ties(&order).is_empty());
    }

    #[test]
    fn test_detect_ties_reports_multiple_groups() {
        let order = entries(&[("A", 7), ("B", 7), ("C", 7), ("D", 2), ("E", 2), ("F", 1)]);

        let groups = detect_ties(&order);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].characters.len(), 3);
        assert_eq!(groups[1].initiative, 2);
        assert_eq!(groups[1].first_position(), 3);
    }

    #[test]
    fn test_detect_ties_on_empty_and_single_entry() {
        assert!(detect_ties(&[]).is_empty());
        assert!(detect_ties(&entries(&[("Solo", 3)])).is_empty());
    }
}
