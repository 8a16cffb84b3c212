//! Users, sessions and the category dictionary.

use async_trait::async_trait;
use domains::{
    Category, CategoryRepository, DomainError, DomainResult, Session, SessionStore, User,
    UserRepository,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::classify;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> DomainResult<User> {
        let row = sqlx::query(&format!(
            "SELECT id, login, password, created FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or_else(|| DomainError::not_found("user", value))?;
        user(&row)
    }
}

fn user(row: &PgRow) -> DomainResult<User> {
    Ok(User {
        id: row.try_get("id").map_err(classify)?,
        login: row.try_get("login").map_err(classify)?,
        password_hash: row.try_get("password").map_err(classify)?,
        created: row.try_get("created").map_err(classify)?,
    })
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<User> {
        self.find_one("id", id).await
    }

    async fn find_by_login(&self, login: &str) -> DomainResult<User> {
        self.find_one("login", login).await
    }

    async fn insert(&self, user: &User) -> DomainResult<()> {
        let result = sqlx::query(
            "INSERT INTO users (id, login, password, created) VALUES ($1, $2, $3, $4)",
        )
        .bind(&user.id)
        .bind(&user.login)
        .bind(&user.password_hash)
        .bind(&user.created)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        DomainError::expect_one_row("user", &user.id, result.rows_affected())
    }
}

pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn find_by_name(&self, name: &str) -> DomainResult<Category> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?
            .ok_or_else(|| DomainError::not_found("category", name))?;
        Ok(Category {
            id: row.try_get("id").map_err(classify)?,
            name: row.try_get("name").map_err(classify)?,
        })
    }
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: &Session) -> DomainResult<()> {
        let result = sqlx::query("INSERT INTO sessions (id, user_id) VALUES ($1, $2)")
            .bind(&session.id)
            .bind(&session.user_id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        DomainError::expect_one_row("session", &session.id, result.rows_affected())
    }

    async fn find(&self, id: &str) -> DomainResult<Option<Session>> {
        let row = sqlx::query("SELECT id, user_id FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        row.map(|row| {
            Ok(Session {
                id: row.try_get("id").map_err(classify)?,
                user_id: row.try_get("user_id").map_err(classify)?,
            })
        })
        .transpose()
    }

    async fn destroy(&self, id: &str) -> DomainResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn destroy_all(&self, user_id: &str) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        debug!(user_id = %user_id, destroyed = result.rows_affected(), "destroyed sessions");
        Ok(result.rows_affected())
    }
}
