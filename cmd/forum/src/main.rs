//! # Forum server
//!
//! Wires settings, the Postgres pool, the JWT/Argon2 adapters and the axum
//! router together, then serves until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{build_router, metrics::Metrics, AppState, StaticAssets};
use auth_adapters::{Argon2Hasher, JwtTokenService};
use configs::{LogFormat, LogSettings, Settings};
use secrecy::ExposeSecret;
use services::{AccountService, PostService, RandomIdGenerator, SystemClock};
use sqlx::postgres::PgPoolOptions;
use storage_adapters::postgres::{
    run_migrations, PgCategoryRepository, PgCommentRepository, PgPostRepository, PgSessionStore,
    PgUserRepository, PgVoteRepository,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(settings.database.url.expose_secret())
        .await
        .context("can't connect to db")?;
    run_migrations(&pool, &settings.database.migrations).await?;
    info!(max_connections = settings.database.max_connections, "database ready");

    let clock = Arc::new(SystemClock);
    let ids = Arc::new(RandomIdGenerator);
    let comments = Arc::new(PgCommentRepository::new(pool.clone()));

    let posts = PostService::new(
        Arc::new(PgPostRepository::new(pool.clone())),
        comments,
        Arc::new(PgVoteRepository::new(pool.clone())),
        Arc::new(PgCategoryRepository::new(pool.clone())),
        clock.clone(),
        ids.clone(),
    );
    let accounts = AccountService::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgSessionStore::new(pool.clone())),
        Arc::new(Argon2Hasher::new()),
        Arc::new(JwtTokenService::new(
            settings.auth.secret_key.expose_secret().as_bytes(),
            chrono::Duration::days(settings.auth.token_ttl_days),
            clock.clone(),
        )),
        clock,
        ids,
    );

    let assets = StaticAssets {
        index: settings.web.index.clone(),
        dir: settings.web.static_dir.clone(),
    };
    let app = build_router(AppState::new(posts, accounts, Metrics::new()), assets);

    let address = settings.server.bind_addr();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("can't bind {address}"))?;
    info!(%address, "forum listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pool.close().await;
    info!("forum stopped");
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "can't listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "can't install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
