//! Stored object identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a string is not a valid [`FileId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid file id '{input}': {reason}")]
pub struct FileIdError {
    pub input: String,
    pub reason: String,
}

/// Opaque identifier of a blob in the object store.
///
/// Generated by the store on put; stable and globally unique. Serialized as
/// the canonical hyphenated UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Generate a new random file ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier received from a client.
    ///
    /// Only the canonical lowercase hyphenated form is accepted, so a parsed
    /// id always displays exactly as the input was written.
    pub fn parse(input: &str) -> Result<Self, FileIdError> {
        let invalid = |reason: String| FileIdError {
            input: input.to_string(),
            reason,
        };

        let uuid = Uuid::try_parse(input).map_err(|e| invalid(e.to_string()))?;
        let mut buf = Uuid::encode_buffer();
        if uuid.hyphenated().encode_lower(&mut buf) != input {
            return Err(invalid("not in canonical hyphenated form".to_string()));
        }
        Ok(Self(uuid))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = FileIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for FileId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_roundtrip() {
        let id = FileId::new();
        let parsed = FileId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(FileId::parse("").is_err());
        assert!(FileId::parse("not-an-id").is_err());
        assert!(FileId::parse("507f1f77bcf86cd799439011").is_err());

        let err = FileId::parse("../etc/passwd").unwrap_err();
        assert_eq!(err.input, "../etc/passwd");
    }

    #[test]
    fn test_parse_rejects_non_canonical_forms() {
        let canonical = "f944589c-f75f-4a1e-9d3b-2c6e8a0b7d15";
        assert!(FileId::parse(canonical).is_ok());

        for input in [
            "F944589C-F75F-4A1E-9D3B-2C6E8A0B7D15",
            "f944589cf75f4a1e9d3b2c6e8a0b7d15",
            "{f944589c-f75f-4a1e-9d3b-2c6e8a0b7d15}",
            "urn:uuid:f944589c-f75f-4a1e-9d3b-2c6e8a0b7d15",
            " f944589c-f75f-4a1e-9d3b-2c6e8a0b7d15",
        ] {
            assert!(FileId::parse(input).is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id: FileId = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"67e55044-10b1-426f-9247-bb680e5fe0c8\""
        );
    }
}
