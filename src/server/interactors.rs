//! `/interactors`: static, PSICQUIC and uploaded (token) interactors.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::limit::RequestBodyLimitLayer;

use super::{extract::{Path, Query}, SharedState};
use crate::constants::DEFAULT_INTERACTORS_PAGE_SIZE;
use crate::error::{ContentServiceError, Result};
use crate::interactors::{parse_accessions, InteractionsResult, InteractorResource, Paging, TupleResult};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 16 * 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PageParams {
    page: Option<usize>,
    page_size: Option<usize>,
}

impl From<PageParams> for Paging {
    fn from(params: PageParams) -> Self {
        Paging {
            page: params.page,
            page_size: params
                .page_size
                .or(params.page.map(|_| DEFAULT_INTERACTORS_PAGE_SIZE)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NameParam {
    name: Option<String>,
}

pub(super) fn routes(max_upload_bytes: usize) -> Router<SharedState> {
    let uploads = Router::new()
        .route("/tuple/form", post(upload_form))
        .route("/tuple/url", post(upload_url))
        .route("/tuple/content", post(upload_content))
        .route("/psicquic/url", post(register_psicquic))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ));

    Router::new()
        .route("/static/molecule/:acc/details", get(static_details))
        .route("/static/molecule/:acc/summary", get(static_summary))
        .route("/static/molecules/details", post(static_details_batch))
        .route("/static/molecules/summary", post(static_summary_batch))
        .route("/psicquic/resources", get(psicquic_resources))
        .route("/psicquic/molecule/:resource/:acc/details", get(psicquic_details))
        .route("/psicquic/molecule/:resource/:acc/summary", get(psicquic_summary))
        .route("/psicquic/molecules/:resource/details", post(psicquic_details_batch))
        .route("/psicquic/molecules/:resource/summary", post(psicquic_summary_batch))
        .route("/token/:token/molecule/:acc/details", get(token_details))
        .route("/token/:token/molecule/:acc/summary", get(token_summary))
        .route("/token/:token/molecules/details", post(token_details_batch))
        .route("/token/:token/molecules/summary", post(token_summary_batch))
        .nest("/upload", uploads)
}

async fn static_details(
    State(state): State<SharedState>,
    Path(acc): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<InteractionsResult>> {
    Ok(Json(state.interactors.static_details(&[acc], params.into()).await?))
}

async fn static_summary(State(state): State<SharedState>, Path(acc): Path<String>) -> Result<Json<InteractionsResult>> {
    Ok(Json(state.interactors.static_summary(&[acc]).await?))
}

async fn static_details_batch(
    State(state): State<SharedState>,
    Query(params): Query<PageParams>,
    body: String,
) -> Result<Json<InteractionsResult>> {
    let accs = parse_accessions(&body)?;
    Ok(Json(state.interactors.static_details(&accs, params.into()).await?))
}

async fn static_summary_batch(State(state): State<SharedState>, body: String) -> Result<Json<InteractionsResult>> {
    let accs = parse_accessions(&body)?;
    Ok(Json(state.interactors.static_summary(&accs).await?))
}

async fn psicquic_resources(State(state): State<SharedState>) -> Json<Vec<InteractorResource>> {
    Json(state.interactors.psicquic_resources())
}

async fn psicquic_details(
    State(state): State<SharedState>,
    Path((resource, acc)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> Result<Json<InteractionsResult>> {
    Ok(Json(
        state
            .interactors
            .psicquic_details(&resource, &[acc], params.into())
            .await?,
    ))
}

async fn psicquic_summary(
    State(state): State<SharedState>,
    Path((resource, acc)): Path<(String, String)>,
) -> Result<Json<InteractionsResult>> {
    Ok(Json(state.interactors.psicquic_summary(&resource, &[acc]).await?))
}

async fn psicquic_details_batch(
    State(state): State<SharedState>,
    Path(resource): Path<String>,
    Query(params): Query<PageParams>,
    body: String,
) -> Result<Json<InteractionsResult>> {
    let accs = parse_accessions(&body)?;
    Ok(Json(
        state
            .interactors
            .psicquic_details(&resource, &accs, params.into())
            .await?,
    ))
}

async fn psicquic_summary_batch(
    State(state): State<SharedState>,
    Path(resource): Path<String>,
    body: String,
) -> Result<Json<InteractionsResult>> {
    let accs = parse_accessions(&body)?;
    Ok(Json(state.interactors.psicquic_summary(&resource, &accs).await?))
}

async fn token_details(
    State(state): State<SharedState>,
    Path((token, acc)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> Result<Json<InteractionsResult>> {
    Ok(Json(
        state
            .interactors
            .token_details(&token, &[acc], params.into())
            .await?,
    ))
}

async fn token_summary(
    State(state): State<SharedState>,
    Path((token, acc)): Path<(String, String)>,
) -> Result<Json<InteractionsResult>> {
    Ok(Json(state.interactors.token_summary(&token, &[acc]).await?))
}

async fn token_details_batch(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    Query(params): Query<PageParams>,
    body: String,
) -> Result<Json<InteractionsResult>> {
    let accs = parse_accessions(&body)?;
    Ok(Json(
        state
            .interactors
            .token_details(&token, &accs, params.into())
            .await?,
    ))
}

async fn token_summary_batch(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    body: String,
) -> Result<Json<InteractionsResult>> {
    let accs = parse_accessions(&body)?;
    Ok(Json(state.interactors.token_summary(&token, &accs).await?))
}

/// Multipart upload; the file is read from the `file` field.
async fn upload_form(State(state): State<SharedState>, mut multipart: Multipart) -> Result<Json<TupleResult>> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        ContentServiceError::bad_request(format!("Malformed multipart body: {}", e))
    };
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(malformed)?;
        return Ok(Json(state.interactors.upload_file(&name, &bytes).await?));
    }
    Err(ContentServiceError::bad_request("Multipart field 'file' is missing"))
}

async fn upload_url(State(state): State<SharedState>, body: String) -> Result<Json<TupleResult>> {
    Ok(Json(state.interactors.upload_url(&body).await?))
}

async fn upload_content(State(state): State<SharedState>, body: String) -> Result<Json<TupleResult>> {
    Ok(Json(state.interactors.upload_content(&body).await?))
}

/// Registers a custom PSICQUIC service; the response body is the token.
async fn register_psicquic(
    State(state): State<SharedState>,
    Query(params): Query<NameParam>,
    body: String,
) -> Result<String> {
    state
        .interactors
        .register_psicquic(params.name.as_deref().unwrap_or_default(), &body)
        .await
}
