//! Evicts the least recently used interactor tokens until the token folder
//! fits its budget. Meant for cron on hosts that do not run the server.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use content_service::config::Config;
use content_service::exporter::DiskCacheChecker;
use content_service::logging;

#[derive(Parser)]
#[command(name = "token-cleaner")]
#[command(about = "Bounds the size of the interactor token folder")]
struct Cli {
    /// Configuration file (defaults to config.toml or CONTENT_SERVICE_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides interactors.max_token_bytes
    #[arg(long)]
    max_bytes: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };
    let _guard = logging::init_logging(&config.logging);

    let budget = cli.max_bytes.unwrap_or(config.interactors.max_token_bytes);
    let report = DiskCacheChecker::new(&config.interactors.token_dir, budget).check()?;
    info!(
        "Token folder {}: {} -> {} bytes, {} tokens evicted",
        config.interactors.token_dir.display(),
        report.size_before,
        report.size_after,
        report.evicted
    );
    Ok(())
}
