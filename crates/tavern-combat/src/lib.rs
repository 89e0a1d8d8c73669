//! Tavern: Combat bounded context.
//!
//! Responsible for initiative order, turn advancement, tie resolution,
//! per-turn status effects, and the two-phase knockout lifecycle of
//! combat participants.

pub mod application;
pub mod domain;
