use anyhow::Context;
use clap::Parser;

use stockwatch::{App, Cli};
use stockwatch_infra::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    stockwatch_observability::init(config.logging.format, config.logging.filter.as_deref());
    if !cli.config.exists() {
        tracing::warn!(path = %cli.config.display(), "config file not found; using defaults");
    }
    tracing::debug!(config = ?config, "configuration loaded");

    App::new(config)?.run(cli.command)
}
