//! The parsed collection read request.

/// Version filter tokens with fixed meaning.
pub const VERSION_FIRST: &str = "first";
pub const VERSION_LAST: &str = "last";
pub const VERSION_ALL: &str = "all";

/// A validated read request against one collection.
///
/// Each filter vector is a disjunction; filters of different kinds conjoin.
/// The query is request-local: built once by the query builder, consumed by
/// the datastore, dropped when the handler returns.
#[derive(Debug, Clone, Default)]
pub struct CollectionQuery {
    /// Target collection (UUID string).
    pub collection_id: String,

    /// Server-enforced page cap. Zero means the server imposes no cap.
    pub server_record_limit: u64,

    /// STIX identifiers to match.
    pub stix_id: Vec<String>,

    /// STIX type tokens to match.
    pub stix_type: Vec<String>,

    /// Version selectors: timestamps, "first", "last", or "all".
    /// Empty selects the latest version of each object.
    pub stix_version: Vec<String>,

    /// `date_added > value` bounds.
    pub added_after: Vec<String>,

    /// `date_added < value` bounds.
    pub added_before: Vec<String>,

    /// Client-requested page sizes, as sent.
    pub limit: Vec<String>,
}

impl CollectionQuery {
    /// Create a query for a collection with the server's record limit.
    pub fn new(collection_id: impl Into<String>, server_record_limit: u64) -> Self {
        Self {
            collection_id: collection_id.into(),
            server_record_limit,
            ..Self::default()
        }
    }

    /// The page size to enforce: the smaller of the server record limit and
    /// the first parseable client `limit` value. `None` means unbounded.
    ///
    /// Unparsable client values are ignored; the server cap still applies.
    pub fn effective_limit(&self) -> Option<u64> {
        let client = self
            .limit
            .iter()
            .find_map(|value| value.trim().parse::<u64>().ok());

        match (self.server_record_limit, client) {
            (0, client) => client,
            (server, None) => Some(server),
            (server, Some(client)) => Some(server.min(client)),
        }
    }
}
