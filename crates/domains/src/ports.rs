//! # Ports
//!
//! Any adapter must implement these traits to be wired into the server.
//! Every storage call returns flat records; grouping and view assembly
//! happen in `services`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainResult;
use crate::models::{
    Category, Comment, CommentRecord, Post, PostRecord, Session, TokenSubject, User, Vote,
};

/// Persistence contract for posts and their scores.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// All posts, newest first.
    async fn fetch_all(&self) -> DomainResult<Vec<PostRecord>>;
    /// `NotFound` when no post has this id.
    async fn fetch_by_id(&self, id: &str) -> DomainResult<PostRecord>;
    async fn fetch_by_category(&self, name: &str) -> DomainResult<Vec<PostRecord>>;
    async fn fetch_by_author_login(&self, login: &str) -> DomainResult<Vec<PostRecord>>;

    async fn insert(&self, post: &Post) -> DomainResult<()>;
    async fn delete(&self, id: &str) -> DomainResult<()>;
    /// `score = score + 1`, as one statement.
    async fn increment_score(&self, id: &str) -> DomainResult<()>;
    /// `score = max(0, score - 1)`, as one statement.
    async fn decrement_score_floored(&self, id: &str) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: &Comment) -> DomainResult<()>;
    async fn delete(&self, id: &str) -> DomainResult<()>;
    /// One query for the whole id set, oldest comment first.
    async fn find_by_post_ids(&self, post_ids: &[String]) -> DomainResult<Vec<CommentRecord>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// One query for the whole id set.
    async fn find_by_post_ids(&self, post_ids: &[String]) -> DomainResult<Vec<Vote>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> DomainResult<User>;
    async fn find_by_login(&self, login: &str) -> DomainResult<User>;
    async fn insert(&self, user: &User) -> DomainResult<()>;
}

/// Read-only category dictionary.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> DomainResult<Category>;
}

/// Server-side session records referenced from bearer tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &Session) -> DomainResult<()>;
    async fn find(&self, id: &str) -> DomainResult<Option<Session>>;
    async fn destroy(&self, id: &str) -> DomainResult<()>;
    /// Returns how many sessions were removed.
    async fn destroy_all(&self, user_id: &str) -> DomainResult<u64>;
}

/// Password hashing contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> DomainResult<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Signs and verifies session-bound bearer tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, user: &User, session_id: &str) -> DomainResult<String>;
    /// Checks signature and expiry; does not consult the session store.
    fn verify(&self, token: &str) -> DomainResult<TokenSubject>;
}

/// Source of "now", injected so tests can pin timestamps.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of fresh identifiers, injected so tests can pin them.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdGenerator: Send + Sync {
    /// Identifier for posts, comments and users.
    fn new_id(&self) -> String;
    /// Random token used as a session id.
    fn new_session_id(&self) -> String;
}
