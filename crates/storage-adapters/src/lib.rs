//! # storage-adapters
//!
//! Implementations of the `domains` repository ports.
//!
//! - `memory`: process-local store on `dashmap`, used by tests and demos.
//! - `postgres`: `sqlx` adapter behind the `db-postgres` feature.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;

/// Category names created by the seed tool and `MemoryStore::with_default_categories`.
pub const DEFAULT_CATEGORIES: [&str; 6] = ["music", "funny", "videos", "programming", "news", "fashion"];
