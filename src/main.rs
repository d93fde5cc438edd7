use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use content_service::config::Config;
use content_service::exporter::DiskCacheChecker;
use content_service::graph::{GraphStore, InMemoryGraph, Neo4jGraph};
use content_service::interactors::PsicquicClient;
use content_service::search::{SearchBackend, SolrSearch};
use content_service::server::{self, AppState};
use content_service::template::PageFragments;
use content_service::{logging, metrics};

#[derive(Parser)]
#[command(name = "content_service")]
#[command(about = "REST content service for the pathway knowledgebase")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to config.toml or CONTENT_SERVICE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Overrides server.port
        #[arg(long)]
        port: Option<u16>,
        /// Serve a JSON graph fixture from memory instead of Neo4j
        #[arg(long)]
        demo: Option<PathBuf>,
    },
    /// Run one eviction pass over the export cache and token folders
    CleanCaches,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

async fn serve(mut config: Config, port: Option<u16>, demo: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let graph: Arc<dyn GraphStore> = match demo {
        Some(path) => {
            info!("Serving fixture graph {}", path.display());
            Arc::new(InMemoryGraph::from_file(&path)?)
        }
        None => Arc::new(Neo4jGraph::connect(&config.graph).await?),
    };
    let search: Arc<dyn SearchBackend> = Arc::new(SolrSearch::new(&config.search)?);

    let psicquic = Arc::new(PsicquicClient::new(&config.interactors)?);
    psicquic.clone().spawn_refresh(Duration::from_secs(
        config.interactors.psicquic_refresh_minutes * 60,
    ));

    let fragments = Arc::new(PageFragments::new(&config.template)?);
    fragments
        .clone()
        .spawn_refresh(Duration::from_secs(config.template.refresh_minutes * 60));

    let every = Duration::from_secs(config.exporter.check_interval_seconds);
    DiskCacheChecker::new(&config.exporter.cache_dir, config.exporter.max_cache_bytes).spawn(every);
    DiskCacheChecker::new(&config.interactors.token_dir, config.interactors.max_token_bytes).spawn(every);

    let state = Arc::new(AppState::new(&config, graph, search, psicquic, fragments));
    server::start_server(state, &config).await?;
    Ok(())
}

fn clean_caches(config: &Config) -> anyhow::Result<()> {
    let checkers = [
        DiskCacheChecker::new(&config.exporter.cache_dir, config.exporter.max_cache_bytes),
        DiskCacheChecker::new(&config.interactors.token_dir, config.interactors.max_token_bytes),
    ];
    for checker in checkers {
        let report = checker.check()?;
        info!(
            "{}: {} -> {} bytes, {} files evicted",
            checker.folder().display(),
            report.size_before,
            report.size_after,
            report.evicted
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let _guard = logging::init_logging(&config.logging);
    metrics::init_metrics();

    match cli.command {
        Commands::Serve { port, demo } => serve(config, port, demo).await?,
        Commands::CleanCaches => {
            if let Err(e) = clean_caches(&config) {
                warn!("Cache cleaning failed: {}", e);
                return Err(e);
            }
        }
    }
    Ok(())
}
