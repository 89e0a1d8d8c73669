//! Domain layer for the Combat context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod initiative;
pub mod knockout;
pub mod roster;
pub mod status_effects;
pub mod ties;
pub mod turn_order;
