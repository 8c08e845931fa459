mod stores;

use clap::{Parser, Subcommand};
use goodstore_core::CategoryFilter;
use goodstore_map::HttpStoreSource;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "goodstore")]
#[command(about = "Good store directory command line interface")]
struct Cli {
    /// Base URL of the store API; overrides `GOODSTORE_API_BASE`.
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Query the store API
    Stores {
        #[command(subcommand)]
        command: StoresCommands,
    },
}

#[derive(Debug, Subcommand)]
enum StoresCommands {
    /// List stores, optionally filtered by category
    List {
        /// Comma-separated tags, e.g. `good-price,welfare`
        #[arg(long)]
        category: Option<CategoryFilter>,
    },
    /// Show one store
    Get { id: i64 },
    /// Find stores whose name contains the query
    Search { query: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = goodstore_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("goodstore: try `goodstore stores list`");
        return Ok(());
    };

    let api_base = cli.api_base.unwrap_or_else(|| config.api_base.clone());
    let source = HttpStoreSource::new(
        &api_base,
        config.http_timeout_secs,
        config.http_max_retries,
    )?;

    match command {
        Commands::Stores { command } => {
            let output = stores::run(&source, command).await?;
            println!("{output}");
        }
    }

    Ok(())
}
