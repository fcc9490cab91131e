//! Download handler.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub fid: Option<String>,
}

/// Stream a converted mp3 back to the caller.
///
/// GET /download?fid=<id>
pub async fn download(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let fid = query
        .fid
        .filter(|fid| !fid.is_empty())
        .ok_or_else(|| ApiError::bad_request("fid is required"))?;

    let stream = state.ingest().open_output(&fid).await?;
    metrics::record_download_served();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}.mp3\"", fid),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
