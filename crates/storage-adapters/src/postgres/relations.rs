//! Comments and votes: the two relations the batch loader pulls per post set.

use async_trait::async_trait;
use domains::{
    Author, Comment, CommentRecord, CommentRepository, DomainError, DomainResult, Vote,
    VoteRepository,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

use super::classify;

/// `<select> WHERE <column> IN ($1, $2, ...)<tail>`, one bind per id.
fn in_query<'a>(select: &str, column: &str, ids: &'a [String], tail: &str) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(select);
    qb.push(" WHERE ");
    qb.push(column);
    qb.push(" IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
    qb.push(tail);
    qb
}

pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn comment_record(row: &PgRow) -> DomainResult<CommentRecord> {
    let user_id: String = row.try_get("user_id").map_err(classify)?;
    let login: Option<String> = row.try_get("login").map_err(classify)?;
    let comment = Comment {
        id: row.try_get("id").map_err(classify)?,
        body: row.try_get("body").map_err(classify)?,
        post_id: row.try_get("post_id").map_err(classify)?,
        user_id: user_id.clone(),
        created: row.try_get("created").map_err(classify)?,
    };
    let login = login
        .ok_or_else(|| DomainError::Decode(format!("no author row for comment {}", comment.id)))?;
    Ok(CommentRecord {
        comment,
        author: Author { id: user_id, login },
    })
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn insert(&self, comment: &Comment) -> DomainResult<()> {
        let result = sqlx::query(
            "INSERT INTO comments (id, post_id, user_id, body, created) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.user_id)
        .bind(&comment.body)
        .bind(&comment.created)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        DomainError::expect_one_row("comment", &comment.id, result.rows_affected())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        DomainError::expect_one_row("comment", id, result.rows_affected())
    }

    async fn find_by_post_ids(&self, post_ids: &[String]) -> DomainResult<Vec<CommentRecord>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = comments_query(post_ids)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        debug!(posts = post_ids.len(), rows = rows.len(), "comments batch query");
        rows.iter().map(comment_record).collect()
    }
}

fn comments_query(post_ids: &[String]) -> QueryBuilder<'_, Postgres> {
    in_query(
        "SELECT cm.id, cm.post_id, cm.body, cm.created, cm.user_id, u.login \
         FROM comments cm LEFT JOIN users u ON u.id = cm.user_id",
        "cm.post_id",
        post_ids,
        " ORDER BY cm.created ASC, cm.id ASC",
    )
}

pub struct PgVoteRepository {
    pool: PgPool,
}

impl PgVoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteRepository for PgVoteRepository {
    async fn find_by_post_ids(&self, post_ids: &[String]) -> DomainResult<Vec<Vote>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = votes_query(post_ids)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        debug!(posts = post_ids.len(), rows = rows.len(), "votes batch query");
        rows.iter()
            .map(|row| {
                Ok(Vote {
                    post_id: row.try_get("post_id").map_err(classify)?,
                    user_id: row.try_get("user_id").map_err(classify)?,
                    vote: row.try_get("vote").map_err(classify)?,
                })
            })
            .collect()
    }
}

fn votes_query(post_ids: &[String]) -> QueryBuilder<'_, Postgres> {
    in_query(
        "SELECT post_id, user_id, vote FROM votes",
        "post_id",
        post_ids,
        " ORDER BY post_id, user_id",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_comments_query_binds_every_id_once() {
        let post_ids = ids(&["a", "b", "c"]);
        let qb = comments_query(&post_ids);
        assert_eq!(
            qb.sql(),
            "SELECT cm.id, cm.post_id, cm.body, cm.created, cm.user_id, u.login \
             FROM comments cm LEFT JOIN users u ON u.id = cm.user_id \
             WHERE cm.post_id IN ($1, $2, $3) ORDER BY cm.created ASC, cm.id ASC"
        );
    }

    #[test]
    fn test_votes_query_single_id() {
        let post_ids = ids(&["a"]);
        assert_eq!(
            votes_query(&post_ids).sql(),
            "SELECT post_id, user_id, vote FROM votes WHERE post_id IN ($1) ORDER BY post_id, user_id"
        );
    }
}
