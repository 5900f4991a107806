use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Immutable application configuration, injected at startup and never re-read
/// mid-run.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub watchlist_path: PathBuf,
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: String,
    pub news_api_key: String,
    pub update_interval_minutes: u64,
    pub retention_days: u64,
    pub lookback_hours: u64,
    pub reddit_requests_per_minute: usize,
    pub news_requests_per_day: usize,
    pub rate_limit_max_wait_secs: u64,
    pub api_requests_per_minute: usize,
    pub fetch_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub keywords_per_record: usize,
    pub reddit_post_limit: usize,
    pub news_article_limit: usize,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url)
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("watchlist_path", &self.watchlist_path)
            .field("reddit_client_id", &self.reddit_client_id)
            .field("reddit_client_secret", &"[redacted]")
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field("news_api_key", &"[redacted]")
            .field("update_interval_minutes", &self.update_interval_minutes)
            .field("retention_days", &self.retention_days)
            .field("lookback_hours", &self.lookback_hours)
            .field(
                "reddit_requests_per_minute",
                &self.reddit_requests_per_minute,
            )
            .field("news_requests_per_day", &self.news_requests_per_day)
            .field("rate_limit_max_wait_secs", &self.rate_limit_max_wait_secs)
            .field("api_requests_per_minute", &self.api_requests_per_minute)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("keywords_per_record", &self.keywords_per_record)
            .field("reddit_post_limit", &self.reddit_post_limit)
            .field("news_article_limit", &self.news_article_limit)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
