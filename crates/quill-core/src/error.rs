//! Domain-level error types.

use thiserror::Error;
use uuid::Uuid;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A unique field (username, email) is already held by another entity.
    #[error("Duplicate entity: {0}")]
    Duplicate(String),
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    /// The row does not exist, or a referenced row (foreign key) does not.
    #[error("Entity not found")]
    NotFound,

    /// A unique constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),
}
