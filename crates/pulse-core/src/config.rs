use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;
    let reddit_client_id = require("REDDIT_CLIENT_ID")?;
    let reddit_client_secret = require("REDDIT_CLIENT_SECRET")?;
    let news_api_key = require("NEWS_API_KEY")?;

    let env = parse_environment(&or_default("PULSE_ENV", "development"));

    let bind_addr = parse_addr("PULSE_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("PULSE_LOG_LEVEL", "info");
    let watchlist_path = PathBuf::from(or_default("PULSE_WATCHLIST_PATH", "./config/watchlist.yaml"));
    let reddit_user_agent = or_default("REDDIT_USER_AGENT", "socialpulse/0.1 (trend-monitor)");

    let update_interval_minutes = parse_u64("PULSE_UPDATE_INTERVAL_MINUTES", "30")?;
    let retention_days = parse_u64("PULSE_RETENTION_DAYS", "7")?;
    let lookback_hours = parse_u64("PULSE_LOOKBACK_HOURS", "24")?;

    let reddit_requests_per_minute = parse_usize("PULSE_REDDIT_REQUESTS_PER_MINUTE", "60")?;
    let news_requests_per_day = parse_usize("PULSE_NEWS_REQUESTS_PER_DAY", "1000")?;
    let rate_limit_max_wait_secs = parse_u64("PULSE_RATE_LIMIT_MAX_WAIT_SECS", "30")?;
    let api_requests_per_minute = parse_usize("PULSE_API_REQUESTS_PER_MINUTE", "120")?;

    let fetch_timeout_secs = parse_u64("PULSE_FETCH_TIMEOUT_SECS", "30")?;
    let max_retries = parse_u32("PULSE_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("PULSE_RETRY_BACKOFF_BASE_MS", "500")?;

    let keywords_per_record = parse_usize("PULSE_KEYWORDS_PER_RECORD", "8")?;
    let reddit_post_limit = parse_usize("PULSE_REDDIT_POST_LIMIT", "25")?;
    let news_article_limit = parse_usize("PULSE_NEWS_ARTICLE_LIMIT", "50")?;

    let db_max_connections = parse_u32("PULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        watchlist_path,
        reddit_client_id,
        reddit_client_secret,
        reddit_user_agent,
        news_api_key,
        update_interval_minutes,
        retention_days,
        lookback_hours,
        reddit_requests_per_minute,
        news_requests_per_day,
        rate_limit_max_wait_secs,
        api_requests_per_minute,
        fetch_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        keywords_per_record,
        reddit_post_limit,
        news_article_limit,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
