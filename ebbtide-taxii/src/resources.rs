//! Wire resource types.
//!
//! Request-local containers serialized to and from the wire: the ingest
//! envelope, the content responses, and the ingest status record.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;
use uuid::Uuid;

use ebbtide_core::taxii2_datetimeformat;
use ebbtide_store::{ManifestPage, VersionPage};

/// The ingest envelope, outer shape only.
///
/// The object array stays raw; elements are decoded one at a time so a
/// malformed object fails alone instead of rejecting the batch.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(default)]
    pub objects: Vec<Box<RawValue>>,
}

/// Query parameters recognized by the content endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub added_after: Option<String>,
    pub added_before: Option<String>,
    #[serde(rename = "match[id]")]
    pub match_id: Option<String>,
    #[serde(rename = "match[type]")]
    pub match_type: Option<String>,
    #[serde(rename = "match[version]")]
    pub match_version: Option<String>,
}

/// Objects response (list and by-id endpoints).
#[derive(Debug, Serialize)]
pub struct ObjectsResponse {
    pub objects: Vec<Value>,
}

/// Manifest response.
#[derive(Debug, Serialize)]
pub struct ManifestResponse {
    pub objects: Vec<ManifestEntry>,
}

/// One manifest record on the wire.
#[derive(Debug, Serialize)]
pub struct ManifestEntry {
    pub id: String,
    pub date_added: String,
    pub version: String,
    pub media_type: String,
}

impl ManifestResponse {
    pub fn from_page(page: &ManifestPage) -> Self {
        Self {
            objects: page
                .entries
                .iter()
                .map(|entry| ManifestEntry {
                    id: entry.id.clone(),
                    date_added: taxii2_datetimeformat(&entry.date_added),
                    version: taxii2_datetimeformat(&entry.version),
                    media_type: entry.media_type.clone(),
                })
                .collect(),
        }
    }
}

/// Versions response.
#[derive(Debug, Serialize)]
pub struct VersionsResponse {
    pub versions: Vec<String>,
}

impl VersionsResponse {
    pub fn from_page(page: &VersionPage) -> Self {
        Self {
            versions: page.versions.iter().map(taxii2_datetimeformat).collect(),
        }
    }
}

/// Collections listing response.
#[derive(Debug, Serialize)]
pub struct CollectionsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<CollectionInfo>>,
}

/// A collection as presented under one api-root.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub can_read: bool,
    pub can_write: bool,
    pub media_types: Vec<String>,
}

impl CollectionInfo {
    pub fn from_view(view: &ebbtide_core::CollectionView) -> Self {
        Self {
            id: view.collection.id,
            title: view.collection.title.clone(),
            description: view.collection.description.clone(),
            can_read: view.can_read,
            can_write: view.can_write,
            media_types: view.collection.media_types.clone(),
        }
    }
}

/// Per-object detail inside a status record.
#[derive(Debug, Clone, Serialize)]
pub struct StatusDetail {
    pub id: String,
    pub version: String,
    pub message: String,
}

/// The ingest status record.
///
/// One per ingest request, opened before the envelope is walked and
/// returned with HTTP 202 whatever the per-object outcomes were. Detail
/// arrays preserve envelope order.
#[derive(Debug, Serialize)]
pub struct Status {
    pub id: Uuid,
    pub status: String,
    pub request_timestamp: String,
    pub total_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub pending_count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub successes: Vec<StatusDetail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StatusDetail>,
}

impl Status {
    /// Open a fresh status record.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: "completed".to_string(),
            request_timestamp: taxii2_datetimeformat(&Utc::now()),
            total_count: 0,
            success_count: 0,
            failure_count: 0,
            pending_count: 0,
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Record one successfully persisted object.
    pub fn record_success(&mut self, id: impl Into<String>, message: impl Into<String>) {
        self.success_count += 1;
        self.successes.push(StatusDetail {
            id: id.into(),
            version: String::new(),
            message: message.into(),
        });
    }

    /// Record one failed object.
    pub fn record_failure(&mut self, id: impl Into<String>, message: impl Into<String>) {
        self.failure_count += 1;
        self.failures.push(StatusDetail {
            id: id.into(),
            version: String::new(),
            message: message.into(),
        });
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
