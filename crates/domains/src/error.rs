//! # DomainError
//!
//! Centralized error handling for the forum backend.
//! Adapters classify their native failures into these variants; the HTTP
//! layer decides how much of that classification reaches the client.

use thiserror::Error;

/// The primary error type for all port and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Exactly one row was expected and none matched (e.g. Post, User, Category)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// A mutating statement touched a row count other than exactly one
    #[error("wrong affected rows: expected 1, got {affected} for {entity} {id}")]
    WrongAffectedRows {
        entity: String,
        id: String,
        affected: u64,
    },

    /// Unique constraint hit (e.g. duplicate login)
    #[error("conflict: {0}")]
    Conflict(String),

    /// A row could not be mapped to a record
    #[error("decode error: {0}")]
    Decode(String),

    /// The store connection itself failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Missing, invalid or expired credentials, or an unknown session
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request content
    #[error("validation error: {0}")]
    Validation(String),

    /// Anything else (hashing, token signing)
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        DomainError::NotFound(entity.to_string(), id.to_string())
    }

    pub fn wrong_affected_rows(entity: &str, id: &str, affected: u64) -> Self {
        DomainError::WrongAffectedRows {
            entity: entity.to_string(),
            id: id.to_string(),
            affected,
        }
    }

    /// Checks the exact-one-row contract of every mutation.
    pub fn expect_one_row(entity: &str, id: &str, affected: u64) -> DomainResult<()> {
        if affected == 1 {
            Ok(())
        } else {
            Err(Self::wrong_affected_rows(entity, id, affected))
        }
    }
}

/// A specialized Result type for domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_one_row_rejects_zero_and_many() {
        assert!(DomainError::expect_one_row("post", "a", 1).is_ok());
        assert_eq!(
            DomainError::expect_one_row("post", "a", 0),
            Err(DomainError::wrong_affected_rows("post", "a", 0))
        );
        assert!(DomainError::expect_one_row("post", "a", 2).is_err());
    }
}
