//! Post use cases: browsing, creating, deleting, voting and commenting.
//!
//! Every operation that changes a post answers with the refreshed view.
//! Ownership is not checked on delete; any authenticated session may remove
//! any post or comment.

use std::sync::Arc;

use domains::{
    format_created, Category, CategoryRepository, Clock, Comment, CommentRepository, DomainResult,
    IdGenerator, Post, PostRepository, PostType, PostView, Session, VoteRepository,
};
use serde::Deserialize;
use tracing::info;

use crate::assembler::PostAssembler;
use crate::loader::BatchLoader;

/// Body of a create-post request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPost {
    pub category: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub title: String,
    pub text: String,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    categories: Arc<dyn CategoryRepository>,
    assembler: PostAssembler,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        votes: Arc<dyn VoteRepository>,
        categories: Arc<dyn CategoryRepository>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let assembler = PostAssembler::new(BatchLoader::new(comments.clone(), votes));
        Self {
            posts,
            comments,
            categories,
            assembler,
            clock,
            ids,
        }
    }

    pub async fn list_all(&self) -> DomainResult<Vec<PostView>> {
        let records = self.posts.fetch_all().await?;
        self.assembler.assemble_many(&records).await
    }

    pub async fn list_by_category(&self, category: &str) -> DomainResult<Vec<PostView>> {
        let records = self.posts.fetch_by_category(category).await?;
        self.assembler.assemble_many(&records).await
    }

    pub async fn list_by_author(&self, login: &str) -> DomainResult<Vec<PostView>> {
        let records = self.posts.fetch_by_author_login(login).await?;
        self.assembler.assemble_many(&records).await
    }

    pub async fn get(&self, id: &str) -> DomainResult<PostView> {
        let record = self.posts.fetch_by_id(id).await?;
        self.assembler.assemble_one(&record).await
    }

    /// Creates a post owned by the session's user in the named category.
    pub async fn create(&self, session: &Session, draft: NewPost) -> DomainResult<PostView> {
        let category = self.category(&draft.category).await?;
        self.create_in(session, &category, draft).await
    }

    pub async fn category(&self, name: &str) -> DomainResult<Category> {
        self.categories.find_by_name(name).await
    }

    /// Like `create`, with the category already resolved. `draft.category` is ignored.
    pub async fn create_in(
        &self,
        session: &Session,
        category: &Category,
        draft: NewPost,
    ) -> DomainResult<PostView> {
        let post = Post::new(
            self.ids.new_id(),
            draft.title,
            draft.post_type,
            draft.text,
            session.user_id.clone(),
            category.id,
            format_created(self.clock.now()),
        );
        self.posts.insert(&post).await?;
        info!(post_id = %post.id, user_id = %post.user_id, category = %category.name, "post created");
        self.get(&post.id).await
    }

    pub async fn delete(&self, id: &str) -> DomainResult<()> {
        self.posts.delete(id).await?;
        info!(post_id = %id, "post deleted");
        Ok(())
    }

    pub async fn upvote(&self, id: &str) -> DomainResult<PostView> {
        self.posts.increment_score(id).await?;
        self.get(id).await
    }

    pub async fn downvote(&self, id: &str) -> DomainResult<PostView> {
        self.posts.decrement_score_floored(id).await?;
        self.get(id).await
    }

    /// Same effect as `downvote`: no vote row is removed.
    pub async fn unvote(&self, id: &str) -> DomainResult<PostView> {
        self.downvote(id).await
    }

    pub async fn add_comment(
        &self,
        session: &Session,
        post_id: &str,
        body: String,
    ) -> DomainResult<PostView> {
        let comment = Comment {
            id: self.ids.new_id(),
            body,
            post_id: post_id.to_string(),
            user_id: session.user_id.clone(),
            created: format_created(self.clock.now()),
        };
        self.comments.insert(&comment).await?;
        info!(comment_id = %comment.id, post_id = %post_id, "comment added");
        self.get(post_id).await
    }

    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> DomainResult<PostView> {
        self.comments.delete(comment_id).await?;
        info!(comment_id = %comment_id, post_id = %post_id, "comment deleted");
        self.get(post_id).await
    }
}
