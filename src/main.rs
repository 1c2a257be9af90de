mod app;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use poolrouter::application::Cli;

const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG > --log-level > info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(cli.global.log_level.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Priority: CLI args > Config file > Defaults
    let mut app_cfg = match &cli.global.config {
        Some(path) => app::AppCfg::from_config(config::Config::from_file(path)?)?,
        None => app::AppCfg::default(),
    };
    app_cfg.apply_overrides(&cli.global)?;

    app::run(app_cfg, cli.command).await
}
