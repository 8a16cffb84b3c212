//! # PostgreSQL adapter
//!
//! One repository struct per port, all sharing a `PgPool`. Rows are mapped
//! by hand with `try_get` so a bad column becomes `DomainError::Decode`
//! instead of a panic.

mod accounts;
mod posts;
mod relations;

use std::path::Path;

use domains::DomainError;
use sqlx::migrate::Migrator;
use sqlx::PgPool;

pub use accounts::{PgCategoryRepository, PgSessionStore, PgUserRepository};
pub use posts::PgPostRepository;
pub use relations::{PgCommentRepository, PgVoteRepository};

/// Applies the SQL files found in `dir` in version order.
pub async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<(), DomainError> {
    let migrator = Migrator::new(dir)
        .await
        .map_err(|e| DomainError::Transport(format!("loading migrations: {e}")))?;
    migrator
        .run(pool)
        .await
        .map_err(|e| DomainError::Transport(format!("running migrations: {e}")))
}

/// Sorts a driver error into the domain taxonomy.
pub(crate) fn classify(err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::RowNotFound => DomainError::NotFound("row".to_string(), String::new()),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => DomainError::Decode(err.to_string()),
        sqlx::Error::Database(ref db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            DomainError::Conflict(db.message().to_string())
        }
        other => DomainError::Transport(other.to_string()),
    }
}
