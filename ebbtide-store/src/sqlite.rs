//! SQLite implementation of the datastore contract.
//!
//! Timestamps are stored in the canonical TAXII text format
//! (`%Y-%m-%dT%H:%M:%S%.6fZ`), which makes lexicographic comparison in SQL
//! chronological. All writes go through the same formatter.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use ebbtide_core::{StixObject, parse_taxii_timestamp, taxii2_datetimeformat};

use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::query::{CollectionQuery, VERSION_ALL, VERSION_FIRST, VERSION_LAST};
use crate::traits::{Datastore, ManifestPage, ManifestRecord, ObjectPage, VersionPage};

/// Default maximum number of connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default connection acquire timeout in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// SQLite-backed content store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) a database file.
    pub async fn connect(path: &Path) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .connect_with(options)
            .await?;

        debug!(path = %path.display(), "sqlite store connected");
        Ok(Self { pool })
    }

    /// Open a fresh in-memory database with the schema applied.
    ///
    /// A single-connection pool pinned open, since every SQLite connection
    /// gets its own private in-memory database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        migrations::run(&pool).await?;
        Ok(Self { pool })
    }

    /// Get reference to the inner pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Append the `o.id IN (...)` / `o.object_type IN (...)` disjunctions.
fn push_in_filter(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    qb.push(" AND ");
    qb.push(column);
    qb.push(" IN (");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value.clone());
    }
    qb.push(")");
}

/// Append the version predicate.
///
/// Tokens: a bare timestamp matches `modified` equality, `first` selects
/// the minimum `modified` per id, `last` the maximum, `all` disables the
/// predicate. An absent filter defaults to `last`.
fn push_version_filter(
    qb: &mut QueryBuilder<'_, Sqlite>,
    version_column: &str,
    tokens: &[String],
) -> StoreResult<()> {
    if tokens.iter().any(|t| t == VERSION_ALL) {
        return Ok(());
    }

    let default = [VERSION_LAST.to_string()];
    let tokens: &[String] = if tokens.is_empty() { &default } else { tokens };

    qb.push(" AND (");
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        match token.as_str() {
            VERSION_FIRST => {
                qb.push(version_column);
                qb.push(
                    " = (SELECT MIN(e2.version) FROM collection_entries e2 \
                     WHERE e2.collection_id = e.collection_id \
                     AND e2.object_id = e.object_id)",
                );
            }
            VERSION_LAST => {
                qb.push(version_column);
                qb.push(
                    " = (SELECT MAX(e2.version) FROM collection_entries e2 \
                     WHERE e2.collection_id = e.collection_id \
                     AND e2.object_id = e.object_id)",
                );
            }
            other => {
                let ts = parse_taxii_timestamp(other).ok_or_else(|| {
                    StoreError::invalid_input(format!("invalid match[version] value: {other}"))
                })?;
                qb.push(version_column);
                qb.push(" = ");
                qb.push_bind(taxii2_datetimeformat(&ts));
            }
        }
    }
    qb.push(")");
    Ok(())
}

/// Append the `date_added` window bounds.
fn push_added_bounds(
    qb: &mut QueryBuilder<'_, Sqlite>,
    added_after: &[String],
    added_before: &[String],
) -> StoreResult<()> {
    for (values, op, name) in [
        (added_after, ">", "added_after"),
        (added_before, "<", "added_before"),
    ] {
        if values.is_empty() {
            continue;
        }
        qb.push(" AND (");
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            let ts = parse_taxii_timestamp(value).ok_or_else(|| {
                StoreError::invalid_input(format!("invalid {name} value: {value}"))
            })?;
            qb.push("e.date_added ");
            qb.push(op);
            qb.push(" ");
            qb.push_bind(taxii2_datetimeformat(&ts));
        }
        qb.push(")");
    }
    Ok(())
}

fn push_limit(qb: &mut QueryBuilder<'_, Sqlite>, limit: Option<u64>) {
    if let Some(limit) = limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit as i64);
    }
}

fn parse_stored_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    parse_taxii_timestamp(value)
        .ok_or_else(|| StoreError::invalid_input(format!("corrupt stored timestamp: {value}")))
}

/// Track the `date_added` window of a page while scanning its rows.
#[derive(Debug, Default)]
struct AddedWindow {
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

impl AddedWindow {
    fn observe(&mut self, added: DateTime<Utc>) {
        if self.first.is_none_or(|f| added < f) {
            self.first = Some(added);
        }
        if self.last.is_none_or(|l| added > l) {
            self.last = Some(added);
        }
    }

    fn bounds(self) -> StoreResult<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.first, self.last) {
            (Some(first), Some(last)) => Ok((first, last)),
            _ => Err(StoreError::invalid_input("empty page has no window")),
        }
    }
}

impl Datastore for SqliteStore {
    async fn get_objects(&self, query: &CollectionQuery) -> StoreResult<ObjectPage> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT o.data AS data, e.date_added AS date_added \
             FROM collection_entries e \
             JOIN stix_objects o ON o.id = e.object_id AND o.version = e.version \
             WHERE e.collection_id = ",
        );
        qb.push_bind(query.collection_id.clone());
        push_in_filter(&mut qb, "o.id", &query.stix_id);
        push_in_filter(&mut qb, "o.object_type", &query.stix_type);
        push_version_filter(&mut qb, "o.version", &query.stix_version)?;
        push_added_bounds(&mut qb, &query.added_after, &query.added_before)?;
        qb.push(" ORDER BY e.date_added ASC, e.object_id ASC");
        push_limit(&mut qb, query.effective_limit());

        let rows = qb.build().fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found(format!(
                "no objects match the request in collection {}",
                query.collection_id
            )));
        }

        let mut objects = Vec::with_capacity(rows.len());
        let mut window = AddedWindow::default();
        for row in &rows {
            let data: String = row.try_get("data")?;
            let date_added: String = row.try_get("date_added")?;
            window.observe(parse_stored_timestamp(&date_added)?);
            objects.push(serde_json::from_str(&data)?);
        }
        let (date_added_first, date_added_last) = window.bounds()?;

        Ok(ObjectPage {
            objects,
            date_added_first,
            date_added_last,
        })
    }

    async fn get_versions(&self, query: &CollectionQuery) -> StoreResult<VersionPage> {
        let object_id = match query.stix_id.as_slice() {
            [single] => single,
            _ => {
                return Err(StoreError::invalid_input(
                    "a versions request requires exactly one object id",
                ));
            }
        };

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT e.version AS version, e.date_added AS date_added \
             FROM collection_entries e \
             WHERE e.collection_id = ",
        );
        qb.push_bind(query.collection_id.clone());
        qb.push(" AND e.object_id = ");
        qb.push_bind(object_id.clone());
        push_added_bounds(&mut qb, &query.added_after, &query.added_before)?;
        qb.push(" ORDER BY e.version DESC");
        push_limit(&mut qb, query.effective_limit());

        let rows = qb.build().fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found(format!(
                "object {object_id} not found in collection {}",
                query.collection_id
            )));
        }

        let mut versions = Vec::with_capacity(rows.len());
        let mut window = AddedWindow::default();
        for row in &rows {
            let version: String = row.try_get("version")?;
            let date_added: String = row.try_get("date_added")?;
            window.observe(parse_stored_timestamp(&date_added)?);
            let version = parse_stored_timestamp(&version)?;
            // Rows are unique on (collection, object, version); keep the
            // dedup anyway in case of hand-edited databases.
            if !versions.contains(&version) {
                versions.push(version);
            }
        }
        let (date_added_first, date_added_last) = window.bounds()?;

        Ok(VersionPage {
            versions,
            date_added_first,
            date_added_last,
        })
    }

    async fn get_manifest(&self, query: &CollectionQuery) -> StoreResult<ManifestPage> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT o.id AS id, o.version AS version, o.spec_version AS spec_version, \
             e.date_added AS date_added \
             FROM collection_entries e \
             JOIN stix_objects o ON o.id = e.object_id AND o.version = e.version \
             WHERE e.collection_id = ",
        );
        qb.push_bind(query.collection_id.clone());
        push_in_filter(&mut qb, "o.id", &query.stix_id);
        push_in_filter(&mut qb, "o.object_type", &query.stix_type);
        push_version_filter(&mut qb, "o.version", &query.stix_version)?;
        push_added_bounds(&mut qb, &query.added_after, &query.added_before)?;
        qb.push(" ORDER BY e.date_added ASC, e.object_id ASC");
        push_limit(&mut qb, query.effective_limit());

        let rows = qb.build().fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found(format!(
                "no manifest records match the request in collection {}",
                query.collection_id
            )));
        }

        let mut entries = Vec::with_capacity(rows.len());
        let mut window = AddedWindow::default();
        for row in &rows {
            let id: String = row.try_get("id")?;
            let version: String = row.try_get("version")?;
            let spec_version: String = row.try_get("spec_version")?;
            let date_added: String = row.try_get("date_added")?;

            let date_added = parse_stored_timestamp(&date_added)?;
            window.observe(date_added);
            entries.push(ManifestRecord {
                id,
                date_added,
                version: parse_stored_timestamp(&version)?,
                media_type: format!("application/stix+json;version={spec_version}"),
            });
        }
        let (date_added_first, date_added_last) = window.bounds()?;

        Ok(ManifestPage {
            entries,
            date_added_first,
            date_added_last,
        })
    }

    async fn add_object(&self, object: &StixObject) -> StoreResult<()> {
        debug!(id = %object.id, "adding object to the datastore");
        let data = serde_json::to_string(&object.data)?;
        sqlx::query(
            "INSERT OR IGNORE INTO stix_objects \
             (id, object_type, spec_version, version, data) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&object.id)
        .bind(&object.object_type)
        .bind(&object.spec_version)
        .bind(taxii2_datetimeformat(&object.version))
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_to_collection(
        &self,
        collection_id: &str,
        object_id: &str,
        version: &DateTime<Utc>,
    ) -> StoreResult<()> {
        let version_key = taxii2_datetimeformat(version);

        let known: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stix_objects WHERE id = ? AND version = ?")
                .bind(object_id)
                .bind(&version_key)
                .fetch_one(&self.pool)
                .await?;
        if known == 0 {
            return Err(StoreError::invalid_input(format!(
                "object {object_id} version {version_key} is not in the store"
            )));
        }

        // Membership covers exactly the version that was stored; IGNORE
        // keeps the original date_added for an entry that already exists.
        sqlx::query(
            "INSERT OR IGNORE INTO collection_entries \
             (collection_id, object_id, version, date_added) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(collection_id)
        .bind(object_id)
        .bind(&version_key)
        .bind(taxii2_datetimeformat(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
