//! # services
//!
//! Application logic of the forum backend: batch loading of comments and
//! votes, post view assembly, and the post/account use cases the HTTP layer
//! calls. Everything here talks to storage through `domains` ports only.

pub mod accounts;
pub mod assembler;
pub mod loader;
pub mod posts;
pub mod support;

pub use accounts::AccountService;
pub use assembler::PostAssembler;
pub use loader::{BatchLoader, CommentsByPost, VotesByPost};
pub use posts::{NewPost, PostService};
pub use support::{RandomIdGenerator, SystemClock};
