//! Access claims produced by token validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims asserted by a validated bearer credential.
///
/// Scoped to a single request. Fields other than `username` and `admin`
/// (`exp`, `iat`, ...) are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub username: String,
    #[serde(rename = "admin", default)]
    pub is_admin: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessClaims {
    pub fn new(username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            is_admin,
            extra: Map::new(),
        }
    }
}
