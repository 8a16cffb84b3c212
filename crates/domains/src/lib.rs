//! # domains
//!
//! The central domain model and port definitions for the forum backend.
//! Nothing in this crate performs I/O; adapters implement the ports.

pub mod error;
pub mod models;
pub mod ports;
pub mod views;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;
pub use views::*;
