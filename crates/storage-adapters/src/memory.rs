//! In-memory store.
//!
//! Mirrors the relational adapter's observable behavior: joined reads fail
//! with `Decode` when the author row is missing, deleting a post drops its
//! comments and votes, and score updates happen under the entry lock so
//! concurrent votes cannot lose updates.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{
    Author, Category, CategoryRepository, Comment, CommentRecord, CommentRepository, DomainError,
    DomainResult, Post, PostRecord, PostRepository, Session, SessionStore, User, UserRepository,
    Vote, VoteRepository,
};
use tracing::debug;

use crate::DEFAULT_CATEGORIES;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    posts: DashMap<String, Post>,
    comments: DashMap<String, Comment>,
    votes: DashMap<(String, String), Vote>,
    categories: DashMap<String, Category>,
    sessions: DashMap<String, Session>,
    next_category_id: AtomicI32,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A store holding the standard category dictionary.
    pub fn with_default_categories() -> Arc<Self> {
        let store = Self::default();
        for name in DEFAULT_CATEGORIES {
            store.add_category(name);
        }
        Arc::new(store)
    }

    /// Adds a category if the name is free and returns it either way.
    pub fn add_category(&self, name: &str) -> Category {
        self.categories
            .entry(name.to_string())
            .or_insert_with(|| Category {
                id: self.next_category_id.fetch_add(1, Ordering::SeqCst) + 1,
                name: name.to_string(),
            })
            .clone()
    }

    /// Records a vote. No HTTP route writes votes, so fixtures use this.
    pub fn add_vote(&self, vote: Vote) {
        self.votes
            .insert((vote.post_id.clone(), vote.user_id.clone()), vote);
    }

    fn author(&self, user_id: &str) -> DomainResult<Author> {
        self.users
            .get(user_id)
            .map(|user| Author {
                id: user.id.clone(),
                login: user.login.clone(),
            })
            .ok_or_else(|| DomainError::Decode(format!("no author row for user {user_id}")))
    }

    fn category_name(&self, id: i32) -> DomainResult<String> {
        self.categories
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.name.clone())
            .ok_or_else(|| DomainError::Decode(format!("no category row for id {id}")))
    }

    fn record(&self, post: Post) -> DomainResult<PostRecord> {
        let author = self.author(&post.user_id)?;
        let category = self.category_name(post.category_id)?;
        Ok(PostRecord {
            post,
            author,
            category,
        })
    }

    fn records_where<F>(&self, keep: F) -> DomainResult<Vec<PostRecord>>
    where
        F: Fn(&Post) -> bool,
    {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        posts.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.id.cmp(&b.id)));
        posts.into_iter().map(|post| self.record(post)).collect()
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn fetch_all(&self) -> DomainResult<Vec<PostRecord>> {
        self.records_where(|_| true)
    }

    async fn fetch_by_id(&self, id: &str) -> DomainResult<PostRecord> {
        let post = self
            .posts
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DomainError::not_found("post", id))?;
        self.record(post)
    }

    async fn fetch_by_category(&self, name: &str) -> DomainResult<Vec<PostRecord>> {
        let Some(category_id) = self.categories.get(name).map(|c| c.id) else {
            return Ok(Vec::new());
        };
        self.records_where(|post| post.category_id == category_id)
    }

    async fn fetch_by_author_login(&self, login: &str) -> DomainResult<Vec<PostRecord>> {
        let Some(user_id) = self
            .users
            .iter()
            .find(|entry| entry.login == login)
            .map(|entry| entry.id.clone())
        else {
            return Ok(Vec::new());
        };
        self.records_where(|post| post.user_id == user_id)
    }

    async fn insert(&self, post: &Post) -> DomainResult<()> {
        if self.posts.contains_key(&post.id) {
            return Err(DomainError::Conflict(format!("post {} exists", post.id)));
        }
        self.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let removed = self.posts.remove(id).map_or(0, |_| 1);
        DomainError::expect_one_row("post", id, removed)?;
        self.comments.retain(|_, comment| comment.post_id != id);
        self.votes.retain(|(post_id, _), _| post_id != id);
        Ok(())
    }

    async fn increment_score(&self, id: &str) -> DomainResult<()> {
        let Some(mut post) = self.posts.get_mut(id) else {
            return Err(DomainError::wrong_affected_rows("post", id, 0));
        };
        post.score += 1;
        debug!(post_id = %id, score = post.score, "score incremented");
        Ok(())
    }

    async fn decrement_score_floored(&self, id: &str) -> DomainResult<()> {
        let Some(mut post) = self.posts.get_mut(id) else {
            return Err(DomainError::wrong_affected_rows("post", id, 0));
        };
        post.score = (post.score - 1).max(0);
        debug!(post_id = %id, score = post.score, "score decremented");
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn insert(&self, comment: &Comment) -> DomainResult<()> {
        if self.comments.contains_key(&comment.id) {
            return Err(DomainError::Conflict(format!("comment {} exists", comment.id)));
        }
        if !self.posts.contains_key(&comment.post_id) {
            return Err(DomainError::Conflict(format!(
                "comment {} references missing post {}",
                comment.id, comment.post_id
            )));
        }
        self.comments.insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let removed = self.comments.remove(id).map_or(0, |_| 1);
        DomainError::expect_one_row("comment", id, removed)
    }

    async fn find_by_post_ids(&self, post_ids: &[String]) -> DomainResult<Vec<CommentRecord>> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|entry| post_ids.contains(&entry.post_id))
            .map(|entry| entry.value().clone())
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        comments
            .into_iter()
            .map(|comment| {
                let author = self.author(&comment.user_id)?;
                Ok(CommentRecord { comment, author })
            })
            .collect()
    }
}

#[async_trait]
impl VoteRepository for MemoryStore {
    async fn find_by_post_ids(&self, post_ids: &[String]) -> DomainResult<Vec<Vote>> {
        let mut votes: Vec<Vote> = self
            .votes
            .iter()
            .filter(|entry| post_ids.contains(&entry.post_id))
            .map(|entry| entry.value().clone())
            .collect();
        votes.sort_by(|a, b| (&a.post_id, &a.user_id).cmp(&(&b.post_id, &b.user_id)));
        Ok(votes)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: &str) -> DomainResult<User> {
        self.users
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DomainError::not_found("user", id))
    }

    async fn find_by_login(&self, login: &str) -> DomainResult<User> {
        self.users
            .iter()
            .find(|entry| entry.login == login)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DomainError::not_found("user", login))
    }

    async fn insert(&self, user: &User) -> DomainResult<()> {
        if self.users.iter().any(|entry| entry.login == user.login) {
            return Err(DomainError::Conflict(format!("login {} is taken", user.login)));
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn find_by_name(&self, name: &str) -> DomainResult<Category> {
        self.categories
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DomainError::not_found("category", name))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: &Session) -> DomainResult<()> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> DomainResult<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.value().clone()))
    }

    async fn destroy(&self, id: &str) -> DomainResult<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn destroy_all(&self, user_id: &str) -> DomainResult<u64> {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = session.user_id != user_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
