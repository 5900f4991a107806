mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use pulse_core::Watchlist;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use crate::middleware::ApiRateLimit;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pulse_core::load_app_config_from_env()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pulse_db::PoolConfig {
        max_connections: config.db_max_connections,
        min_connections: config.db_min_connections,
        acquire_timeout_secs: config.db_acquire_timeout_secs,
    };
    let pool = pulse_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = pulse_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }

    let watchlist = Arc::new(load_watchlist_or_builtin(&config));

    let _scheduler =
        scheduler::build_scheduler(pool.clone(), Arc::clone(&config), Arc::clone(&watchlist))
            .await?;

    let app = build_app(
        AppState { pool },
        ApiRateLimit::per_minute(config.api_requests_per_minute),
    );

    tracing::info!(addr = %config.bind_addr, "serving read API");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Load the configured watchlist file, falling back to the built-in set when
/// the file is missing or unreadable. The fallback keeps collection alive;
/// the error log makes the broken file visible.
fn load_watchlist_or_builtin(config: &pulse_core::AppConfig) -> Watchlist {
    if config.watchlist_path.exists() {
        match pulse_core::load_watchlist(&config.watchlist_path) {
            Ok(watchlist) => {
                tracing::info!(
                    path = %config.watchlist_path.display(),
                    subreddits = watchlist.subreddits.len(),
                    topics = watchlist.news_topics.len(),
                    "watchlist loaded"
                );
                return watchlist;
            }
            Err(e) => {
                tracing::error!(error = %e, "watchlist file is unreadable, using built-in set");
            }
        }
    } else {
        tracing::info!(
            path = %config.watchlist_path.display(),
            "no watchlist file, using built-in set"
        );
    }
    Watchlist::builtin()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
