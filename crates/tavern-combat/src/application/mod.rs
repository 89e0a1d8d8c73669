//! Application layer: command and query handlers for the Combat context.

pub mod broadcasts;
pub mod command_handlers;
pub mod ports;
pub mod query_handlers;
