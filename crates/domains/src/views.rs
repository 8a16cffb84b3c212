//! Wire-level representations of post aggregates.
//!
//! Field names and order follow the JSON contract the web client expects.
//! `upvotepercentage` and `views` are always zero; they are part of the
//! contract but nothing computes them.

use serde::{Deserialize, Serialize};

use crate::models::{Author, CommentRecord, PostRecord, PostType, Vote};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub username: String,
    pub id: String,
}

impl From<&Author> for AuthorView {
    fn from(author: &Author) -> Self {
        Self {
            username: author.login.clone(),
            id: author.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub author: AuthorView,
    pub body: String,
    pub created: String,
    pub id: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(record: &CommentRecord) -> Self {
        Self {
            author: AuthorView::from(&record.author),
            body: record.comment.body.clone(),
            created: record.comment.created.clone(),
            id: record.comment.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteView {
    pub user: String,
    pub vote: i32,
}

impl From<&Vote> for VoteView {
    fn from(vote: &Vote) -> Self {
        Self {
            user: vote.user_id.clone(),
            vote: vote.vote,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub author: AuthorView,
    pub category: String,
    pub comments: Vec<CommentView>,
    pub created: String,
    pub score: i32,
    pub text: String,
    pub title: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    #[serde(rename = "upvotepercentage")]
    pub upvote_percentage: u32,
    pub votes: Vec<VoteView>,
    pub views: u32,
}

impl PostView {
    /// The view of a post before its comments and votes are attached.
    pub fn without_relations(record: &PostRecord) -> Self {
        Self {
            id: record.post.id.clone(),
            author: AuthorView::from(&record.author),
            category: record.category.clone(),
            comments: Vec::new(),
            created: record.post.created.clone(),
            score: record.post.score,
            text: record.post.text.clone(),
            title: record.post.title.clone(),
            post_type: record.post.post_type,
            upvote_percentage: 0,
            votes: Vec::new(),
            views: 0,
        }
    }
}
