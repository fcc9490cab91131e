//! Conversion job handed to the downstream pipeline.

use serde::{Deserialize, Serialize};

use crate::{AccessClaims, FileId};

/// Unit of work published for every accepted upload.
///
/// The wire names (`video_fid`, `mp3_fid`, `username`) are the contract with
/// the conversion consumers and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Source media in the videos namespace
    #[serde(rename = "video_fid")]
    pub source_fid: FileId,
    /// Converted output; always `None` when the gateway publishes
    #[serde(rename = "mp3_fid")]
    pub result_fid: Option<FileId>,
    /// User that requested the conversion
    pub username: String,
}

impl ConversionJob {
    /// Create a job for a freshly stored upload.
    pub fn new(source_fid: FileId, username: impl Into<String>) -> Self {
        Self {
            source_fid,
            result_fid: None,
            username: username.into(),
        }
    }

    /// Create a job requested by the holder of `claims`.
    pub fn for_claims(source_fid: FileId, claims: &AccessClaims) -> Self {
        Self::new(source_fid, claims.username.clone())
    }
}
