//! # Domain Models
//!
//! These structs represent the stored entities of the forum.
//! Identifiers are opaque strings (UUIDv4 for posts, comments and users;
//! a random alphanumeric token for sessions). Creation timestamps are kept
//! as fixed-format RFC 3339 strings, exactly as they are stored and served.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Score every new post starts with.
pub const DEFAULT_SCORE: i32 = 1;

/// Formats a timestamp the way `created` columns are stored, e.g. `2022-11-09T19:51:42Z`.
pub fn format_created(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Text,
    Link,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Text => "text",
            PostType::Link => "link",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(PostType::Text),
            "link" => Ok(PostType::Link),
            other => Err(DomainError::Decode(format!("unknown post type {other:?}"))),
        }
    }
}

/// A post as stored in the `posts` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    /// Body text (a URL for link posts)
    pub text: String,
    /// Never below zero; see `PostRepository::decrement_score_floored`
    pub score: i32,
    pub user_id: String,
    pub category_id: i32,
    pub created: String,
}

impl Post {
    pub fn new(
        id: String,
        title: String,
        post_type: PostType,
        text: String,
        user_id: String,
        category_id: i32,
        created: String,
    ) -> Self {
        Self {
            id,
            title,
            post_type,
            text,
            score: DEFAULT_SCORE,
            user_id,
            category_id,
            created,
        }
    }
}

/// Denormalized author info carried by joined rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub login: String,
}

/// One flat row of the post/user/category join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub post: Post,
    pub author: Author,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub post_id: String,
    pub user_id: String,
    pub created: String,
}

/// A comment joined with its author's login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub comment: Comment,
    pub author: Author,
}

/// A vote row. There is no independent identifier; (post_id, user_id) is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub post_id: String,
    pub user_id: String,
    pub vote: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub login: String,
    /// Argon2 PHC string; never serialized outward
    pub password_hash: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

/// Server-side session bound to a user. Tokens reference it by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
}

/// Claims recovered from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub username: String,
    pub user_id: String,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_post_type_round_trips_through_str() {
        assert_eq!("link".parse::<PostType>().unwrap(), PostType::Link);
        assert_eq!(PostType::Text.to_string(), "text");
        assert!("video".parse::<PostType>().is_err());
    }

    #[test]
    fn test_created_format_has_second_precision() {
        let at = Utc.with_ymd_and_hms(2022, 11, 9, 19, 51, 42).unwrap();
        assert_eq!(format_created(at), "2022-11-09T19:51:42Z");
    }
}
