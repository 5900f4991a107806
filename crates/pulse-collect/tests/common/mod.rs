//! Shared fixtures for pulse-collect integration tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pulse_collect::RateLimiter;
use pulse_core::{AppConfig, Environment};

#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        env: Environment::Test,
        bind_addr: "127.0.0.1:0".parse().expect("valid bind addr"),
        log_level: "debug".to_string(),
        watchlist_path: PathBuf::from("./config/watchlist.yaml"),
        reddit_client_id: "test-client".to_string(),
        reddit_client_secret: "test-secret".to_string(),
        reddit_user_agent: "socialpulse-test/0.1".to_string(),
        news_api_key: "test-news-key".to_string(),
        update_interval_minutes: 30,
        retention_days: 7,
        lookback_hours: 24,
        reddit_requests_per_minute: 60,
        news_requests_per_day: 1000,
        rate_limit_max_wait_secs: 1,
        api_requests_per_minute: 120,
        fetch_timeout_secs: 5,
        max_retries: 0,
        retry_backoff_base_ms: 1,
        keywords_per_record: 8,
        reddit_post_limit: 25,
        news_article_limit: 50,
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
    }
}

#[must_use]
pub fn test_limiter(source_name: &'static str) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(
        source_name,
        1000,
        Duration::from_secs(60),
        Duration::from_secs(1),
    ))
}
