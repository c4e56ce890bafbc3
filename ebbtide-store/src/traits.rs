//! The datastore contract.
//!
//! This trait is everything the request pipeline knows about persistence.
//! Implementations must be safe for concurrent invocation; the pipeline
//! treats the store as the serialization point for all mutations.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::Value;

use ebbtide_core::StixObject;

use crate::error::StoreResult;
use crate::query::CollectionQuery;

/// One page of objects, with the `date_added` window of the page.
#[derive(Debug, Clone)]
pub struct ObjectPage {
    /// Full object payloads, ordered `(date_added ASC, id ASC)`.
    pub objects: Vec<Value>,
    pub date_added_first: DateTime<Utc>,
    pub date_added_last: DateTime<Utc>,
}

/// The version history of one object in a collection.
#[derive(Debug, Clone)]
pub struct VersionPage {
    /// Distinct `modified` values, newest first.
    pub versions: Vec<DateTime<Utc>>,
    pub date_added_first: DateTime<Utc>,
    pub date_added_last: DateTime<Utc>,
}

/// One manifest record.
#[derive(Debug, Clone)]
pub struct ManifestRecord {
    pub id: String,
    pub date_added: DateTime<Utc>,
    pub version: DateTime<Utc>,
    pub media_type: String,
}

/// One page of manifest records.
#[derive(Debug, Clone)]
pub struct ManifestPage {
    pub entries: Vec<ManifestRecord>,
    pub date_added_first: DateTime<Utc>,
    pub date_added_last: DateTime<Utc>,
}

/// The operations the request pipeline needs from a content store.
///
/// Reads return `StoreError::NotFound` when nothing matches, so every
/// empty or absent resource surfaces uniformly. Writes are idempotent:
/// `add_object` on `(id, modified)`, `add_to_collection` on
/// `(collection_id, object_id, modified)` — a repeated insert is a no-op
/// that does not disturb `date_added`. Membership is per version: adding
/// one version of an object to a collection says nothing about its other
/// versions, which may live in different collections.
pub trait Datastore: Send + Sync {
    /// Fetch the page of objects matching `query`, ordered by
    /// `(date_added ASC, id ASC)`.
    fn get_objects(
        &self,
        query: &CollectionQuery,
    ) -> impl Future<Output = StoreResult<ObjectPage>> + Send;

    /// Fetch the version list for the identifier in `query.stix_id`,
    /// deduplicated and sorted descending.
    fn get_versions(
        &self,
        query: &CollectionQuery,
    ) -> impl Future<Output = StoreResult<VersionPage>> + Send;

    /// Fetch manifest records for the page matching `query`.
    fn get_manifest(
        &self,
        query: &CollectionQuery,
    ) -> impl Future<Output = StoreResult<ManifestPage>> + Send;

    /// Insert an object record.
    fn add_object(&self, object: &StixObject) -> impl Future<Output = StoreResult<()>> + Send;

    /// Insert collection membership for one stored version of
    /// `object_id`, stamping `date_added` with the server clock.
    fn add_to_collection(
        &self,
        collection_id: &str,
        object_id: &str,
        version: &DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}
