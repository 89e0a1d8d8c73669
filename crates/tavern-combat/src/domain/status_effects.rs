//! Per-turn status effect processing.
//!
//! Effects tick once, at the start of their bearer's turn. Each tick
//! consumes one turn of duration first; an effect whose duration runs out
//! on this tick expires without applying. Indefinite effects apply every
//! turn.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Beneficial effect.
    Buff,
    /// Harmful effect.
    Debuff,
    /// Neither.
    Neutral,
}

/// Per-turn resource changes and stat modifiers carried by an effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectModifiers {
    /// HP change applied each turn (negative for damage over time).
    #[serde(default)]
    pub hp_per_turn: i32,
    /// Mana change applied each turn.
    #[serde(default)]
    pub mana_per_turn: i32,
    /// Flat stat modifiers while the effect lasts.
    #[serde(default)]
    pub stat_modifiers: BTreeMap<String, i32>,
}

/// An effect attached to a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Effect identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Buff, debuff, or neutral.
    pub kind: EffectKind,
    /// Turns remaining; `None` means indefinite.
    pub duration: Option<u32>,
    /// What the effect does.
    #[serde(default)]
    pub effects: EffectModifiers,
}

/// One effect's contribution to a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEffect {
    /// Effect identifier.
    pub effect_id: Uuid,
    /// Display name.
    pub name: String,
    /// HP contributed this tick.
    pub hp_per_turn: i32,
    /// Mana contributed this tick.
    pub mana_per_turn: i32,
    /// Duration left after this tick.
    pub remaining_duration: Option<u32>,
}

/// Outcome of ticking a combatant's effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTick {
    /// Sum of HP contributions before clamping.
    pub hp_delta: i32,
    /// Sum of mana contributions before clamping.
    pub mana_delta: i32,
    /// HP after clamping to `[0, max_hp]`.
    pub hp: i32,
    /// Mana after clamping to `[0, max_mana]`.
    pub mana: i32,
    /// Effects that applied this tick.
    pub applied: Vec<AppliedEffect>,
    /// Effects that expired this tick.
    pub expired: Vec<Uuid>,
    /// Effects still active after the tick, with decremented durations.
    pub remaining: Vec<StatusEffect>,
}

/// Current resource pools of a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pools {
    /// Current HP.
    pub hp: i32,
    /// Maximum HP.
    pub max_hp: i32,
    /// Current mana.
    pub mana: i32,
    /// Maximum mana.
    pub max_mana: i32,
}

/// Clamps a pool value into `[0, max]`.
#[must_use]
pub fn clamp_pool(value: i32, max: i32) -> i32 {
    value.clamp(0, max.max(0))
}

/// Ticks `effects` once against `pools`.
#[must_use]
pub fn tick(effects: &[StatusEffect], pools: Pools) -> StatusTick {
    let mut hp_delta = 0i32;
    let mut mana_delta = 0i32;
    let mut applied = Vec::new();
    let mut expired = Vec::new();
    let mut remaining = Vec::new();

    for effect in effects {
        let remaining_duration = effect.duration.map(|turns| turns.saturating_sub(1));
        if remaining_duration == Some(0) {
            expired.push(effect.id);
            continue;
        }

        hp_delta = hp_delta.saturating_add(effect.effects.hp_per_turn);
        mana_delta = mana_delta.saturating_add(effect.effects.mana_per_turn);
        applied.push(AppliedEffect {
            effect_id: effect.id,
            name: effect.name.clone(),
            hp_per_turn: effect.effects.hp_per_turn,
            mana_per_turn: effect.effects.mana_per_turn,
            remaining_duration,
        });

        let mut kept = effect.clone();
        kept.duration = remaining_duration;
        remaining.push(kept);
    }

    StatusTick {
        hp_delta,
        mana_delta,
        hp: clamp_pool(pools.hp.saturating_add(hp_delta), pools.max_hp),
        mana: clamp_pool(pools.mana.saturating_add(mana_delta), pools.max_mana),
        applied,
        expired,
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(hp_per_turn: i32, mana_per_turn: i32, duration: Option<u32>) -> StatusEffect {
        StatusEffect {
            id: Uuid::new_v4(),
            name: "effect".to_owned(),
            kind: EffectKind::Neutral,
            duration,
            effects: EffectModifiers {
                hp_per_turn,
                mana_per_turn,
                stat_modifiers: BTreeMap::new(),
            },
        }
    }

    fn pools(hp: i32, max_hp: i32) -> Pools {
        Pools {
            hp,
            max_hp,
            mana: 5,
            max_mana: 10,
        }
    }

    #[test]
    fn test_poison_applies_then_expires_on_following_turn() {
        // Arrange: 12/20 HP, poison for 2 turns.
        let poison = effect(-5, 0, Some(2));

        // Act: first turn
        let first = tick(std::slice::from_ref(&poison), pools(12, 20));

        // Assert
        assert_eq!(first.hp, 7);
        assert_eq!(first.remaining.len(), 1);
        assert_eq!(first.remaining[0].duration, Some(1));
        assert!(first.expired.is_empty());

        // Act: following turn
        let second = tick(&first.remaining, pools(first.hp, 20));

        // Assert: expired, not applied
        assert_eq!(second.hp, 7);
        assert_eq!(second.hp_delta, 0);
        assert_eq!(second.expired, vec![poison.id]);
        assert!(second.remaining.is_empty());
        assert!(second.applied.is_empty());
    }

    #[test]
    fn test_indefinite_effect_never_expires() {
        let aura = effect(1, 1, None);

        let result = tick(std::slice::from_ref(&aura), pools(3, 20));

        assert_eq!(result.hp, 4);
        assert_eq!(result.mana, 6);
        assert_eq!(result.remaining[0].duration, None);
    }

    #[test]
    fn test_deltas_accumulate_and_clamp_to_bounds() {
        let effects = vec![effect(-8, -20, Some(3)), effect(-4, 0, Some(5))];

        let result = tick(&effects, pools(10, 20));

        assert_eq!(result.hp_delta, -12);
        assert_eq!(result.mana_delta, -20);
        assert_eq!(result.hp, 0);
        assert_eq!(result.mana, 0);
        assert_eq!(result.applied.len(), 2);
    }

    #[test]
    fn test_healing_clamps_to_max() {
        let regen = effect(15, 15, Some(4));

        let result = tick(&[regen], pools(18, 20));

        assert_eq!(result.hp, 20);
        assert_eq!(result.mana, 10);
    }

    #[test]
    fn test_zero_duration_effect_expires_immediately() {
        let stale = effect(-3, 0, Some(0));

        let result = tick(std::slice::from_ref(&stale), pools(10, 20));

        assert_eq!(result.hp, 10);
        assert_eq!(result.expired, vec![stale.id]);
    }

    #[test]
    fn test_clamp_pool_handles_negative_max() {
        assert_eq!(clamp_pool(5, -1), 0);
        assert_eq!(clamp_pool(-3, 10), 0);
        assert_eq!(clamp_pool(7, 10), 7);
    }
}
