//! HTTP surface: one router per area, merged with the shared layers.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::citation::CitationService;
use crate::config::Config;
use crate::constants::SERVICE_NAME;
use crate::domain::Identifier;
use crate::error::{ContentServiceError, Result};
use crate::exporter::ExporterService;
use crate::graph::GraphStore;
use crate::interactors::{InteractorsService, PsicquicClient, StaticInteractions, TokenStore};
use crate::metrics;
use crate::search::{SearchBackend, SearchService};
use crate::services::Services;
use crate::template::PageFragments;

mod citation;
mod data;
mod exporter;
mod extract;
mod interactors;
mod search;

/// Everything handlers need, shared across requests.
pub struct AppState {
    pub services: Services,
    pub search: SearchService,
    pub interactors: InteractorsService,
    pub citation: CitationService,
    pub exporter: ExporterService,
    pub fragments: Arc<PageFragments>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: &Config,
        graph: Arc<dyn GraphStore>,
        search: Arc<dyn SearchBackend>,
        psicquic: Arc<PsicquicClient>,
        fragments: Arc<PageFragments>,
    ) -> Self {
        let base_url = config.server.base_url.as_str();
        Self {
            services: Services::new(graph.clone(), base_url),
            search: SearchService::new(search),
            interactors: InteractorsService::new(
                StaticInteractions::new(graph.clone()),
                psicquic,
                TokenStore::new(&config.interactors.token_dir),
                config.interactors.max_upload_bytes,
            ),
            citation: CitationService::new(graph.clone(), base_url),
            exporter: ExporterService::new(graph, &config.exporter.cache_dir),
            fragments,
        }
    }
}

/// Parses an identifier taken from the path.
pub(crate) fn id(raw: &str) -> Result<Identifier> {
    Identifier::parse(raw)
}

/// `Content-Disposition` value offering `filename` as a download.
pub(crate) fn attachment(filename: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)).map_err(|_| {
        ContentServiceError::bad_request(format!("'{}' is not a valid file name", filename))
    })
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    match state.services.query.db_info().await {
        Ok(info) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": SERVICE_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "database": info,
            })),
        ),
        Err(e) => {
            warn!("Health check could not reach the graph: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "service": SERVICE_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                })),
            )
        }
    }
}

async fn prometheus() -> Response {
    match metrics::render() {
        Some(text) => {
            let mut response = text.into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

async fn landing(State(state): State<SharedState>) -> Result<Html<String>> {
    let info = state.services.query.db_info().await?;
    Ok(Html(state.fragments.landing_page(&info)))
}

/// Builds the router with every endpoint.
pub fn create_router(state: SharedState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(landing))
        .route("/health", get(health))
        .route("/metrics", get(prometheus))
        .nest("/data", data::routes())
        .nest("/search", search::routes())
        .nest("/interactors", interactors::routes(max_upload_bytes))
        .nest("/citation", citation::routes())
        .nest("/exporter", exporter::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Binds `host:port` and serves until the process stops.
pub async fn start_server(state: SharedState, config: &Config) -> Result<()> {
    let app = create_router(state, config.interactors.max_upload_bytes);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            ContentServiceError::Config(format!(
                "Invalid listen address {}:{}: {}",
                config.server.host, config.server.port, e
            ))
        })?;
    let listener = TcpListener::bind(addr).await?;

    info!("HTTP server running on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Metrics:      http://{}/metrics", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
