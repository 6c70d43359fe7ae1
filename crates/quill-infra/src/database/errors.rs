//! Translation of SeaORM errors into repository errors.

use sea_orm::{DbErr, SqlErr};

use quill_core::error::RepoError;

/// Unique violations become `Constraint`, foreign-key violations become
/// `NotFound` (the referenced row is missing).
pub(crate) fn map_db_err(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => RepoError::Constraint(detail),
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
            tracing::debug!(detail = %detail, "Foreign key violation");
            RepoError::NotFound
        }
        _ => match err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => RepoError::Connection(err.to_string()),
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => RepoError::NotFound,
            other => RepoError::Query(other.to_string()),
        },
    }
}

/// Mask an email for logging: `alice@example.com` -> `a***@example.com`.
pub(crate) fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) if local.chars().count() > 1 => format!("{first}***@{domain}"),
            _ => format!("***@{domain}"),
        },
        None => "***".to_string(),
    }
}
