//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Every variant is terminal for the command that produced it: the command
/// is rejected and nothing is persisted.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// A referenced entity (e.g. a participant in a turn order) was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to issue the command.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The command would break a domain invariant (e.g. moving the active
    /// participant).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
