//! Seeds the category dictionary and, when `SEED_USER` and `SEED_PASSWORD`
//! are set, a demo account. Safe to run repeatedly.

use anyhow::Context;
use auth_adapters::Argon2Hasher;
use configs::Settings;
use domains::{format_created, Clock, DomainError, IdGenerator, PasswordHasher, User, UserRepository};
use secrecy::ExposeSecret;
use services::{RandomIdGenerator, SystemClock};
use sqlx::postgres::PgPoolOptions;
use storage_adapters::postgres::{run_migrations, PgUserRepository};
use storage_adapters::DEFAULT_CATEGORIES;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log.filter))
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(settings.database.url.expose_secret())
        .await
        .context("can't connect to db")?;
    run_migrations(&pool, &settings.database.migrations).await?;

    for name in DEFAULT_CATEGORIES {
        let inserted = sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&pool)
            .await
            .with_context(|| format!("can't insert category {name}"))?
            .rows_affected();
        info!(category = name, inserted = inserted == 1, "category");
    }

    if let (Ok(login), Ok(password)) = (std::env::var("SEED_USER"), std::env::var("SEED_PASSWORD")) {
        let user = User {
            id: RandomIdGenerator.new_id(),
            login,
            password_hash: Argon2Hasher::new().hash(&password)?,
            created: format_created(SystemClock.now()),
        };
        match PgUserRepository::new(pool.clone()).insert(&user).await {
            Ok(()) => info!(login = %user.login, "demo user created"),
            Err(DomainError::Conflict(_)) => info!(login = %user.login, "demo user already exists"),
            Err(e) => return Err(e.into()),
        }
    }

    pool.close().await;
    Ok(())
}
