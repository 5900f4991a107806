//! One-shot collection cycle command.

use pulse_core::{AppConfig, Watchlist};
use sqlx::SqlitePool;

/// Run a single collection cycle and print the resulting report.
///
/// # Errors
///
/// Returns an error if the cycle cannot be recorded or persistence fails.
/// Source-level failures do not error; they show up in the report status.
pub(crate) async fn run_collect(pool: &SqlitePool, config: &AppConfig) -> anyhow::Result<()> {
    let watchlist = load_watchlist(config);
    println!(
        "collecting from {} subreddits and {} news topics...",
        watchlist.subreddits.len(),
        watchlist.news_topics.len()
    );

    let collector = pulse_collect::Collector::new(config)?;
    let report = collector.run_cycle(pool, config, &watchlist).await?;

    println!();
    println!("cycle {} finished: {}", report.public_id, report.status);
    println!("  reddit: {:<12} news: {}", report.reddit_outcome, report.news_outcome);
    println!(
        "  fetched {} / deduplicated {} / inserted {} / updated {}",
        report.fetched, report.deduplicated, report.inserted, report.updated
    );
    println!(
        "  trends cached {} / old records evicted {}",
        report.trends, report.evicted
    );

    Ok(())
}

/// Load the configured watchlist file, falling back to the built-in set.
fn load_watchlist(config: &AppConfig) -> Watchlist {
    if config.watchlist_path.exists() {
        match pulse_core::load_watchlist(&config.watchlist_path) {
            Ok(watchlist) => return watchlist,
            Err(e) => {
                eprintln!("watchlist file is unreadable ({e}), using built-in set");
            }
        }
    }
    Watchlist::builtin()
}
