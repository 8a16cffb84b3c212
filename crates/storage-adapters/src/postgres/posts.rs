use async_trait::async_trait;
use domains::{Author, DomainError, DomainResult, Post, PostRecord, PostRepository, PostType};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::classify;

const SELECT_POST: &str = "SELECT p.id, p.title, p.type, p.description, p.score, p.user_id, \
     p.category_id, p.created, u.login, c.name AS category_name \
     FROM posts p \
     LEFT JOIN users u ON u.id = p.user_id \
     LEFT JOIN categories c ON c.id = p.category_id";

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn execute_one(&self, sql: &str, id: &str) -> DomainResult<()> {
        let result = sqlx::query(sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        DomainError::expect_one_row("post", id, result.rows_affected())
    }
}

/// Maps one row of the post/user/category join.
fn post_record(row: &PgRow) -> DomainResult<PostRecord> {
    let user_id: String = row.try_get("user_id").map_err(classify)?;
    let login: Option<String> = row.try_get("login").map_err(classify)?;
    let category: Option<String> = row.try_get("category_name").map_err(classify)?;
    let post_type: PostType = row
        .try_get::<String, _>("type")
        .map_err(classify)?
        .parse()?;

    let post = Post {
        id: row.try_get("id").map_err(classify)?,
        title: row.try_get("title").map_err(classify)?,
        post_type,
        text: row.try_get("description").map_err(classify)?,
        score: row.try_get("score").map_err(classify)?,
        user_id: user_id.clone(),
        category_id: row.try_get("category_id").map_err(classify)?,
        created: row.try_get("created").map_err(classify)?,
    };
    let login = login
        .ok_or_else(|| DomainError::Decode(format!("no author row for post {}", post.id)))?;
    let category = category
        .ok_or_else(|| DomainError::Decode(format!("no category row for post {}", post.id)))?;

    Ok(PostRecord {
        post,
        author: Author { id: user_id, login },
        category,
    })
}

fn post_records(rows: &[PgRow]) -> DomainResult<Vec<PostRecord>> {
    rows.iter().map(post_record).collect()
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn fetch_all(&self) -> DomainResult<Vec<PostRecord>> {
        let rows = sqlx::query(&format!("{SELECT_POST} ORDER BY p.created DESC"))
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        debug!(rows = rows.len(), "fetched all posts");
        post_records(&rows)
    }

    async fn fetch_by_id(&self, id: &str) -> DomainResult<PostRecord> {
        let row = sqlx::query(&format!("{SELECT_POST} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?
            .ok_or_else(|| DomainError::not_found("post", id))?;
        post_record(&row)
    }

    async fn fetch_by_category(&self, name: &str) -> DomainResult<Vec<PostRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_POST} WHERE c.name = $1 ORDER BY p.created DESC"
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;
        debug!(category = %name, rows = rows.len(), "fetched posts by category");
        post_records(&rows)
    }

    async fn fetch_by_author_login(&self, login: &str) -> DomainResult<Vec<PostRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_POST} WHERE u.login = $1 ORDER BY p.created DESC"
        ))
        .bind(login)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;
        debug!(login = %login, rows = rows.len(), "fetched posts by author");
        post_records(&rows)
    }

    async fn insert(&self, post: &Post) -> DomainResult<()> {
        let result = sqlx::query(
            "INSERT INTO posts (id, title, type, description, score, user_id, category_id, created) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(post.post_type.as_str())
        .bind(&post.text)
        .bind(post.score)
        .bind(&post.user_id)
        .bind(post.category_id)
        .bind(&post.created)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        DomainError::expect_one_row("post", &post.id, result.rows_affected())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        self.execute_one("DELETE FROM posts WHERE id = $1", id).await
    }

    async fn increment_score(&self, id: &str) -> DomainResult<()> {
        self.execute_one("UPDATE posts SET score = score + 1 WHERE id = $1", id)
            .await
    }

    async fn decrement_score_floored(&self, id: &str) -> DomainResult<()> {
        self.execute_one(
            "UPDATE posts SET score = GREATEST(score - 1, 0) WHERE id = $1",
            id,
        )
        .await
    }
}
