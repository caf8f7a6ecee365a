//! Cache opening from CLI arguments and the environment.

use std::path::PathBuf;

use idcache::{Config, DomainConfig, SysDb};

use crate::cli::Cli;

/// Domain served when no configuration file is given.
const DEFAULT_DOMAIN: &str = "LOCAL";

/// Build the effective configuration.
///
/// `--config` is loaded when given; otherwise a single native domain is
/// served. `--data-dir` replaces the configured storage directory.
pub fn resolve_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            Config::load(path)?
        }
        None => Config::new(PathBuf::from(".")).with_domain(DomainConfig::new(DEFAULT_DOMAIN)),
    };
    if let Some(dir) = &cli.data_dir {
        config.db_path = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Open the cache described by the CLI arguments.
pub async fn open(cli: &Cli) -> Result<(SysDb, Config), Box<dyn std::error::Error>> {
    let config = resolve_config(cli)?;
    tracing::info!("Using cache file {}", config.db_file_path().display());
    let db = SysDb::open(&config).await?;
    Ok((db, config))
}
