mod collect;
mod query;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "Social pulse collection and query tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one collection cycle and print its report
    Collect,
    /// Show recently collected records
    Recent {
        /// Only records collected in the last N hours
        #[arg(long)]
        hours: Option<i64>,

        /// Filter by source (reddit or news)
        #[arg(long)]
        source: Option<String>,

        /// Filter by community (subreddit or outlet)
        #[arg(long)]
        community: Option<String>,

        /// Maximum number of records to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show the cached trend ranking
    Trends {
        /// Maximum number of trends to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show recent collection cycle history
    Cycles {
        /// Maximum number of cycles to show
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = pulse_core::load_app_config_from_env()?;
    let pool_config = pulse_db::PoolConfig {
        max_connections: config.db_max_connections,
        min_connections: config.db_min_connections,
        acquire_timeout_secs: config.db_acquire_timeout_secs,
    };
    let pool = pulse_db::connect_pool(&config.database_url, pool_config).await?;
    pulse_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Collect => collect::run_collect(&pool, &config).await?,
        Commands::Recent {
            hours,
            source,
            community,
            limit,
        } => query::run_recent(&pool, hours, source.as_deref(), community, limit).await?,
        Commands::Trends { limit } => query::run_trends(&pool, limit).await?,
        Commands::Cycles { limit } => query::run_cycles(&pool, limit).await?,
    }

    Ok(())
}
