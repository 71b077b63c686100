use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reaper::{Config, ConfigLayer, Reaper};

/// Delete container package versions built from commits that are no longer on any branch.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// GitHub API token
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub repository name, optionally prefixed with the owner
    #[arg(short, long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Package owner
    #[arg(short, long, env = "GITHUB_REPOSITORY_OWNER")]
    owner: Option<String>,

    /// GitHub API base URL [default: https://api.github.com]
    #[arg(short = 'u', long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Container registry URL [default: https://ghcr.io]
    #[arg(short = 'd', long, env = "REAPER_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Console log level [default: info]
    #[arg(
        short = 'v',
        long,
        env = "REAPER_LOG_LEVEL",
        value_parser = ["trace", "debug", "info", "warn", "error", "fatal"],
    )]
    log_level: Option<String>,

    /// Concurrency level [default: 1]
    #[arg(short, long, env = "REAPER_JOBS")]
    jobs: Option<usize>,

    /// Do not delete package versions, only print messages
    #[arg(short = 'n', long, env = "REAPER_DRY_RUN")]
    dry_run: bool,

    /// YAML file with defaults for any of the options above
    #[arg(short, long, env = "REAPER_CONFIG")]
    config_file: Option<PathBuf>,
}

impl Cli {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            token: self.token.clone(),
            repository: self.repository.clone(),
            owner: self.owner.clone(),
            api_url: self.api_url.clone(),
            registry_url: self.registry_url.clone(),
            log_level: self.log_level.clone(),
            jobs: self.jobs,
            dry_run: self.dry_run.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // load configuration
    let mut layer = cli.layer();
    if let Some(path) = &cli.config_file {
        layer = layer.or(ConfigLayer::from_file(path)?);
    }
    let config = Config::resolve(layer)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with_target(true)
        .compact()
        .init();

    tracing::debug!("{config:?}");

    Reaper::from_config(&config)?.run().await?;

    Ok(())
}
