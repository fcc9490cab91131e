//! Upload handler.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use tracing::{debug, info};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::services::UploadedFile;
use crate::state::AppState;

/// Message for any request that does not carry exactly one file part.
pub const EXACTLY_ONE_FILE: &str = "exactly 1 file required";

/// Accept a single source video and queue it for conversion.
///
/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<&'static str> {
    // A body that is not multipart carries no file parts.
    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            debug!(error = %rejection, "Upload body is not multipart");
            return Err(ApiError::bad_request(EXACTLY_ONE_FILE));
        }
    };

    let file = single_file(multipart)
        .await?
        .ok_or_else(|| ApiError::bad_request(EXACTLY_ONE_FILE))?;

    let fid = state.ingest().submit(&claims, file).await?;
    info!(video_fid = %fid, username = %claims.username, "Upload accepted");

    Ok("success!")
}

/// Read the only file part of a form.
///
/// Returns `None` when the form has no file part or more than one. Reading
/// stops at the second file part, whose contents are never buffered. Parts
/// without a filename are plain form fields and are skipped.
async fn single_file(mut multipart: Multipart) -> ApiResult<Option<UploadedFile>> {
    let mut found: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(String::from) else {
            continue;
        };

        if found.is_some() {
            debug!("Upload carries more than one file part");
            return Ok(None);
        }

        let content_type = field.content_type().map(String::from);
        let data = field.bytes().await?;

        found = Some(UploadedFile {
            filename: Some(filename),
            content_type,
            data,
        });
    }

    Ok(found)
}
