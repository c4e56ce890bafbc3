//! TAXII 2.1 resource entities.
//!
//! Discovery, APIRoot, and Collection records are owned by the process-wide
//! configuration, built once at startup, and shared by reference into the
//! request handlers. Per-api-root permissions live in [`CollectionView`], a
//! read-only composition over the canonical [`Collection`] record; handlers
//! never mutate the canonical record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// TAXII 2.1 datetime format with 6-digit microsecond precision.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format a datetime for a TAXII 2.1 response or storage key.
pub fn taxii2_datetimeformat(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Parse a TAXII timestamp.
///
/// Accepts RFC 3339 (with `Z` or a numeric offset) and the 6-digit
/// microsecond form used in responses and in the store.
pub fn parse_taxii_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Discovery resource.
///
/// Describes the server as a whole: who runs it and which api-roots it
/// advertises. Immutable for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discovery {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    /// URL of the default api-root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// URLs of all advertised api-roots.
    #[serde(default)]
    pub api_roots: Vec<String>,
}

/// APIRoot resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRoot {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// TAXII versions served under this root.
    #[serde(default = "default_versions")]
    pub versions: Vec<String>,

    /// Per-root request body limit in bytes.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: u64,
}

fn default_versions() -> Vec<String> {
    vec!["application/taxii+json;version=2.1".to_string()]
}

fn default_max_content_length() -> u64 {
    10 * 1024 * 1024
}

/// Canonical Collection record.
///
/// Owned by the configuration; read/write permissions are not part of the
/// canonical record because the same collection may be exposed under
/// different api-roots with different access. See [`CollectionView`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Collection ID (UUID).
    pub id: Uuid,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Media types accepted by this collection.
    #[serde(default = "default_media_types")]
    pub media_types: Vec<String>,
}

fn default_media_types() -> Vec<String> {
    vec!["application/stix+json;version=2.1".to_string()]
}

/// A collection as seen from one api-root.
///
/// Composed at route-planning time from the api-root's `read_access` and
/// `write_access` lists. Invariant: a view is only built when at least one
/// of the two flags is true.
#[derive(Debug, Clone)]
pub struct CollectionView {
    pub collection: Arc<Collection>,
    pub can_read: bool,
    pub can_write: bool,
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests assert on known-good values")]
mod tests {
    use super::*;

    #[test]
    fn datetime_format_roundtrip() {
        let dt = DateTime::parse_from_rfc3339("2024-01-01T12:34:56.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let formatted = taxii2_datetimeformat(&dt);
        assert_eq!(formatted, "2024-01-01T12:34:56.123456Z");
        assert_eq!(parse_taxii_timestamp(&formatted), Some(dt));
    }

    #[test]
    fn parse_accepts_rfc3339_offsets() {
        let a = parse_taxii_timestamp("2024-01-01T00:00:00Z");
        let b = parse_taxii_timestamp("2024-01-01T01:00:00+01:00");
        assert_eq!(a, b);
        assert!(parse_taxii_timestamp("not a date").is_none());
    }
}
