//! `/exporter`: downloadable event exports.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::{attachment, extract::Path, id, SharedState};
use crate::error::{ContentServiceError, Result};
use crate::exporter::ExportFormat;

pub(super) fn routes() -> Router<SharedState> {
    Router::new().route("/event/:file", get(event))
}

/// `GET /exporter/event/R-HSA-200.json`: the extension picks the format.
async fn event(State(state): State<SharedState>, Path(file): Path<String>) -> Result<Response> {
    let (raw, ext) = file.rsplit_once('.').ok_or_else(|| {
        ContentServiceError::bad_request(format!("'{}' has no file extension", file))
    })?;
    let format: ExportFormat = ext.parse()?;
    let export = state.exporter.export(&id(raw)?, format).await?;

    let mut response = export.body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(export.content_type));
    headers.insert(header::CONTENT_DISPOSITION, attachment(&export.filename)?);
    headers.insert(
        "x-cache",
        HeaderValue::from_static(if export.cached { "HIT" } else { "MISS" }),
    );
    Ok(response)
}
