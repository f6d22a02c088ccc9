use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use moviedb_api::{
    api::{create_router, AppState},
    config::{Config, StoreBackend},
    db::{create_pool, create_redis_client, run_migrations, Cache, MemoryStore, PgStore, Store},
    services::{auth::TokenKeys, users},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("moviedb_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.store {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    if let Some(admin) = config.admin_bootstrap() {
        users::ensure_admin_account(&*store, &admin, config.bcrypt_cost)
            .await
            .context("Failed to bootstrap the admin account")?;
    }

    let mut state = AppState::new(
        store,
        TokenKeys::new(&config.jwt_secret, config.token_ttl_hours),
        config.bcrypt_cost,
    );
    let mut cache_writer = None;
    if let Some(redis_url) = &config.redis_url {
        let (cache, writer) = Cache::new(create_redis_client(redis_url)?, config.cache_ttl_secs);
        state = state.with_cache(cache);
        cache_writer = Some(writer);
    } else {
        tracing::info!("REDIS_URL not set, response cache disabled");
    }

    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, store = ?config.store, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
