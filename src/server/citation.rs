//! `/citation`: pathway citations and their downloadable exports.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use super::{attachment, extract::{Path, Query}, id, SharedState};
use crate::citation::{Citation, CitationFormat};
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct ExportParams {
    ext: String,
}

pub(super) fn routes() -> Router<SharedState> {
    Router::new()
        .route("/pathway/:id", get(pathway_citation))
        .route("/export/:id", get(export))
}

async fn pathway_citation(State(state): State<SharedState>, Path(raw): Path<String>) -> Result<Json<Citation>> {
    Ok(Json(state.citation.citation(&id(&raw)?).await?))
}

async fn export(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response> {
    let format: CitationFormat = params.ext.parse()?;
    let export = state.citation.export(&id(&raw)?, format).await?;
    let mut response = export.body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(export.content_type));
    headers.insert(header::CONTENT_DISPOSITION, attachment(&export.filename)?);
    Ok(response)
}
