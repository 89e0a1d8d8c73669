//! Tavern: PostgreSQL infrastructure.
//!
//! The event store behind every aggregate, and the read-only game directory
//! that backs the combat collaborator ports.

pub mod pg_event_repository;
pub mod pg_game_directory;
