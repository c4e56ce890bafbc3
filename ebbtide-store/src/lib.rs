//! Datastore layer for the Ebbtide TAXII server.
//!
//! # Architecture
//!
//! - [`Datastore`]: the contract the request pipeline depends on
//! - [`CollectionQuery`]: the parsed, validated read request
//! - [`SqliteStore`]: SQLite implementation over an sqlx pool
//! - [`migrations`]: idempotent schema bootstrap

pub mod error;
pub mod migrations;
pub mod query;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use query::CollectionQuery;
pub use sqlite::SqliteStore;
pub use traits::{Datastore, ManifestRecord, ManifestPage, ObjectPage, VersionPage};
