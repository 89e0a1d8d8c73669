//! Commands for the Combat context.

use serde::{Deserialize, Serialize};
use tavern_core::command::Command;
use uuid::Uuid;

use super::roster::TieMove;
use super::status_effects::StatusEffect;

/// Every real-time combat command, keyed on the wire by its event name.
///
/// ```json
/// {"event": "force-turn", "data": {"character_id": "..."}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum CombatCommand {
    /// Recompute the order from the live roster and start combat.
    CalculateTurnOrder,
    /// Manually place participants inside their tie groups.
    ResolveTie {
        /// Requested placements.
        moves: Vec<TieMove>,
    },
    /// Replace the arrangement of the order.
    UpdateTurnOrder {
        /// Every participant id, in the desired order.
        order: Vec<Uuid>,
    },
    /// Advance to the next participant.
    NextTurn,
    /// Stop combat, keeping the order.
    EndCombat,
    /// Jump directly to a participant's turn.
    ForceTurn {
        /// The participant to activate.
        character_id: Uuid,
    },
    /// Add a participant mid-combat.
    AddToTurnOrder {
        /// The participant to add.
        character_id: Uuid,
    },
    /// Remove a participant that is not currently acting.
    RemoveFromTurnOrder {
        /// The participant to remove.
        character_id: Uuid,
    },
    /// Read the current order.
    GetTurnOrder,
    /// Apply damage (negative) or healing (positive).
    ModifyHp {
        /// The affected character.
        character_id: Uuid,
        /// Signed change.
        amount: i32,
        /// Free-form reason shown to players.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Spend (negative) or restore (positive) mana.
    ModifyMana {
        /// The affected character.
        character_id: Uuid,
        /// Signed change.
        amount: i32,
        /// Free-form reason shown to players.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Bring a knocked-out character back.
    ReviveCharacter {
        /// The character to revive.
        character_id: Uuid,
        /// HP to restore, clamped to the maximum.
        hp_amount: i32,
    },
    /// A non-player participant died.
    NpcKilled {
        /// The non-player character.
        character_id: Uuid,
    },
    /// A non-player participant was deleted.
    NpcDeleted {
        /// The non-player character.
        character_id: Uuid,
    },
}

impl CombatCommand {
    /// Returns the wire event name, which is also the rate-limit key.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CalculateTurnOrder => "calculate-turn-order",
            Self::ResolveTie { .. } => "resolve-tie",
            Self::UpdateTurnOrder { .. } => "update-turn-order",
            Self::NextTurn => "next-turn",
            Self::EndCombat => "end-combat",
            Self::ForceTurn { .. } => "force-turn",
            Self::AddToTurnOrder { .. } => "add-to-turn-order",
            Self::RemoveFromTurnOrder { .. } => "remove-from-turn-order",
            Self::GetTurnOrder => "get-turn-order",
            Self::ModifyHp { .. } => "modify-hp",
            Self::ModifyMana { .. } => "modify-mana",
            Self::ReviveCharacter { .. } => "revive-character",
            Self::NpcKilled { .. } => "npc-killed",
            Self::NpcDeleted { .. } => "npc-deleted",
        }
    }
}

/// A combat command issued by a caller against one game.
#[derive(Debug, Clone)]
pub struct CommandEnvelope {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the command targets.
    pub game_id: Uuid,
    /// The authenticated caller.
    pub issuer: Uuid,
    /// The command itself.
    pub command: CombatCommand,
}

impl Command for CommandEnvelope {
    fn command_type(&self) -> &'static str {
        self.command.name()
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to enrol a character into the combat system.
#[derive(Debug, Clone)]
pub struct EnrollCombatant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character being enrolled.
    pub character_id: Uuid,
    /// The owning game.
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

impl Command for EnrollCombatant {
    fn command_type(&self) -> &'static str {
        "combatant.enroll"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to attach a status effect to a combatant.
#[derive(Debug, Clone)]
pub struct ApplyStatusEffect {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The affected character.
    pub character_id: Uuid,
    /// The effect to attach.
    pub effect: StatusEffect,
}

impl Command for ApplyStatusEffect {
    fn command_type(&self) -> &'static str {
        "combatant.apply_status_effect"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to detach a status effect from a combatant.
#[derive(Debug, Clone)]
pub struct RemoveStatusEffect {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The affected character.
    pub character_id: Uuid,
    /// The effect to detach.
    pub effect_id: Uuid,
}

impl Command for RemoveStatusEffect {
    fn command_type(&self) -> &'static str {
        "combatant.remove_status_effect"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_command_parses_without_data() {
        let command: CombatCommand = serde_json::from_str(r#"{"event":"next-turn"}"#).unwrap();

        assert_eq!(command, CombatCommand::NextTurn);
        assert_eq!(command.name(), "next-turn");
    }

    #[test]
    fn test_modify_hp_parses_optional_reason() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"event":"modify-hp","data":{{"character_id":"{id}","amount":-4}}}}"#);

        let command: CombatCommand = serde_json::from_str(&json).unwrap();

        assert_eq!(
            command,
            CombatCommand::ModifyHp {
                character_id: id,
                amount: -4,
                reason: None,
            }
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result = serde_json::from_str::<CombatCommand>(r#"{"event":"cast-fireball"}"#);

        assert!(result.is_err());
    }

    #[test]
    fn test_name_matches_wire_tag() {
        let command = CombatCommand::ResolveTie { moves: Vec::new() };

        let value = serde_json::to_value(&command).unwrap();

        assert_eq!(value["event"], command.name());
    }

    #[test]
    fn test_envelope_command_type_is_event_name() {
        let envelope = CommandEnvelope {
            correlation_id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            issuer: Uuid::new_v4(),
            command: CombatCommand::EndCombat,
        };

        assert_eq!(envelope.command_type(), "end-combat");
    }
}
