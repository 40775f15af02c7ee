use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};

use anyhow::{Context, Result};
use background_service::PollService;
use clap::Parser;
use database::Database;
use finder_core::{AppConfig, ErrorReporter};
use finder_engine::Dispatcher;
use reddit_client::RedditClient;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "gunnut-finder",
    about = "Reddit bot that summarizes a user's activity in tracked subreddits",
    version
)]
struct Cli {
    #[arg(
        long,
        env = "GUNNUT_FINDER_CONFIG",
        default_value = "gunnut-finder.toml",
        help = "Path to the TOML configuration file"
    )]
    config: PathBuf,

    #[arg(long, help = "Run a single inbox sweep and exit")]
    once: bool,
}

fn init_tracing(log_path: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    init_tracing(config.storage.log_path.as_ref())?;

    tracing::info!(
        "Loaded configuration from {} ({} forums tracked)",
        cli.config.display(),
        config.bot.forums.len()
    );
    tracing::info!("Starting gunnut-finder as /u/{}", config.reddit.username);

    let ledger = Database::connect(&config.storage.database_path).await?;
    ledger.run_migrations().await?;

    let client = RedditClient::new((&config.reddit).into())?;
    client
        .authenticate()
        .await
        .context("initial Reddit authentication failed")?;

    let dispatcher = Dispatcher::from_config(client, ledger, &config)?;
    let reporter =
        ErrorReporter::new().with_transient_reporting(config.bot.report_transient_errors);
    let service = PollService::new(dispatcher, config.poll_interval()).with_reporter(reporter);

    if cli.once {
        let report = service.run_once().await;
        tracing::info!(
            "Sweep finished: {} handled, {} skipped, {} failed",
            report.handled,
            report.skipped,
            report.failed
        );
    } else {
        service
            .run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await;
    }

    let (_, ledger) = service.into_dispatcher().into_parts();
    ledger.close().await;
    tracing::info!("gunnut-finder stopped");
    Ok(())
}
