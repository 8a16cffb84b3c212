//! Batch loading of post relations.
//!
//! Resolves "comments/votes for a set of posts" with one query per relation
//! instead of one per post.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domains::{CommentRecord, CommentRepository, DomainResult, Vote, VoteRepository};
use tracing::debug;

pub type CommentsByPost = HashMap<String, Vec<CommentRecord>>;
pub type VotesByPost = HashMap<String, Vec<Vote>>;

#[derive(Clone)]
pub struct BatchLoader {
    comments: Arc<dyn CommentRepository>,
    votes: Arc<dyn VoteRepository>,
}

impl BatchLoader {
    pub fn new(comments: Arc<dyn CommentRepository>, votes: Arc<dyn VoteRepository>) -> Self {
        Self { comments, votes }
    }

    /// Comments grouped by post id, each list oldest first.
    ///
    /// A post without comments has no entry in the map. An empty input
    /// returns an empty map without touching the repository.
    pub async fn load_comments_for(&self, post_ids: &[String]) -> DomainResult<CommentsByPost> {
        let ids = distinct(post_ids);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self.comments.find_by_post_ids(&ids).await?;
        debug!(posts = ids.len(), comments = rows.len(), "loaded comments batch");
        Ok(group_by_post(rows, &ids, |row| &row.comment.post_id))
    }

    /// Votes grouped by post id. Same empty-input and missing-key rules as comments.
    pub async fn load_votes_for(&self, post_ids: &[String]) -> DomainResult<VotesByPost> {
        let ids = distinct(post_ids);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self.votes.find_by_post_ids(&ids).await?;
        debug!(posts = ids.len(), votes = rows.len(), "loaded votes batch");
        Ok(group_by_post(rows, &ids, |vote| &vote.post_id))
    }

    /// Runs both batches concurrently. Either failure fails the whole load.
    pub async fn load_for(&self, post_ids: &[String]) -> DomainResult<(CommentsByPost, VotesByPost)> {
        tokio::try_join!(self.load_comments_for(post_ids), self.load_votes_for(post_ids))
    }
}

/// Deduplicates while keeping first-seen order.
fn distinct(post_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(post_ids.len());
    post_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Groups rows by their post id, keeping row order within each group.
/// Rows for ids outside the requested set are dropped.
fn group_by_post<T, F>(rows: Vec<T>, ids: &[String], post_id: F) -> HashMap<String, Vec<T>>
where
    F: Fn(&T) -> &String,
{
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for row in rows {
        let key = post_id(&row);
        if !wanted.contains(key.as_str()) {
            continue;
        }
        grouped.entry(key.clone()).or_default().push(row);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Author, Comment, DomainError, MockCommentRepository, MockVoteRepository};

    fn comment(id: &str, post_id: &str) -> CommentRecord {
        CommentRecord {
            comment: Comment {
                id: id.to_string(),
                body: format!("body of {id}"),
                post_id: post_id.to_string(),
                user_id: "u-1".to_string(),
                created: "2022-11-09T19:51:42Z".to_string(),
            },
            author: Author {
                id: "u-1".to_string(),
                login: "mer".to_string(),
            },
        }
    }

    fn vote(post_id: &str, user_id: &str) -> Vote {
        Vote {
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            vote: 1,
        }
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_input_issues_no_query() {
        let mut comments = MockCommentRepository::new();
        comments.expect_find_by_post_ids().times(0);
        let mut votes = MockVoteRepository::new();
        votes.expect_find_by_post_ids().times(0);
        let loader = BatchLoader::new(Arc::new(comments), Arc::new(votes));

        let (c, v) = loader.load_for(&[]).await.unwrap();
        assert!(c.is_empty());
        assert!(v.is_empty());
    }

    #[tokio::test]
    async fn test_comments_loaded_in_one_query_and_grouped() {
        let mut comments = MockCommentRepository::new();
        comments
            .expect_find_by_post_ids()
            .withf(|post_ids: &[String]| post_ids == ["p1", "p2", "p3"])
            .times(1)
            .returning(|_| Ok(vec![comment("c1", "p1"), comment("c2", "p2"), comment("c3", "p1")]));
        let loader = BatchLoader::new(Arc::new(comments), Arc::new(MockVoteRepository::new()));

        let grouped = loader
            .load_comments_for(&ids(&["p1", "p2", "p3", "p1"]))
            .await
            .unwrap();

        let p1: Vec<&str> = grouped["p1"].iter().map(|r| r.comment.id.as_str()).collect();
        assert_eq!(p1, vec!["c1", "c3"]);
        assert_eq!(grouped["p2"].len(), 1);
        assert!(!grouped.contains_key("p3"));
    }

    #[tokio::test]
    async fn test_result_keys_are_subset_of_input() {
        let mut votes = MockVoteRepository::new();
        votes
            .expect_find_by_post_ids()
            .times(1)
            .returning(|_| Ok(vec![vote("p1", "u1"), vote("stray", "u2")]));
        let loader = BatchLoader::new(Arc::new(MockCommentRepository::new()), Arc::new(votes));

        let grouped = loader.load_votes_for(&ids(&["p1"])).await.unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["p1"], vec![vote("p1", "u1")]);
    }

    #[tokio::test]
    async fn test_query_error_aborts_batch() {
        let mut comments = MockCommentRepository::new();
        comments
            .expect_find_by_post_ids()
            .returning(|_| Err(DomainError::Decode("bad row".to_string())));
        let mut votes = MockVoteRepository::new();
        votes.expect_find_by_post_ids().returning(|_| Ok(vec![]));
        let loader = BatchLoader::new(Arc::new(comments), Arc::new(votes));

        let err = loader.load_for(&ids(&["p1"])).await.unwrap_err();
        assert_eq!(err, DomainError::Decode("bad row".to_string()));
    }
}
