//! Two-phase knockout lifecycle.
//!
//! `Alive -> Warned -> KnockedOut`, with `KnockedOut -> Alive` only via an
//! explicit revive. A warning raised during a round becomes a knockout only
//! at the start of the same participant's next turn, and only if HP is
//! still at zero by then.

use serde::{Deserialize, Serialize};

/// Knockout state of a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KoState {
    /// Up and fighting.
    Alive,
    /// HP reached zero; knockout pending confirmation.
    Warned,
    /// Knocked out until revived.
    KnockedOut,
}

impl KoState {
    /// Derives the state from the persisted flags.
    #[must_use]
    pub fn from_flags(is_ko: bool, ko_warning: bool) -> Self {
        match (is_ko, ko_warning) {
            (true, _) => Self::KnockedOut,
            (false, true) => Self::Warned,
            (false, false) => Self::Alive,
        }
    }
}

/// A change in knockout state produced by a lifecycle rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KoTransition {
    /// HP reached zero; a warning is raised.
    WarningRaised,
    /// HP rose above zero during the grace window.
    WarningCleared,
    /// The warning was confirmed at the start of the turn.
    KnockedOut,
}

/// Applies the lifecycle after any HP change (direct damage, healing, or a
/// status tick).
#[must_use]
pub fn after_hp_change(state: KoState, hp: i32) -> Option<KoTransition> {
    match state {
        KoState::Alive if hp <= 0 => Some(KoTransition::WarningRaised),
        KoState::Warned if hp > 0 => Some(KoTransition::WarningCleared),
        _ => None,
    }
}

/// Confirms a pending knockout at the start of the participant's turn.
///
/// `warned_before_turn` must be the state captured before this turn's
/// status tick: a warning raised by the tick itself waits a full round.
#[must_use]
pub fn confirm_at_turn_start(warned_before_turn: bool, state: KoState, hp: i32) -> Option<KoTransition> {
    (warned_before_turn && state == KoState::Warned && hp <= 0).then_some(KoTransition::KnockedOut)
}

/// Returns `true` if a revive is meaningful for `state`.
#[must_use]
pub fn can_revive(state: KoState) -> bool {
    state != KoState::Alive
}
