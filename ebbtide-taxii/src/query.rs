//! URL parameter folding.
//!
//! Builds the [`CollectionQuery`] from the route context, the request's
//! query parameters, and the `{objectid}` path variable. Every recognized
//! parameter is repeatable through comma-separated values.

use tracing::{info, warn};

use ebbtide_core::is_valid_stix_id;
use ebbtide_store::CollectionQuery;

use crate::context::{ContentEndpoint, ContentState};
use crate::error::{TaxiiError, TaxiiResult};
use crate::resources::ListParams;

/// Split a repeatable parameter value.
fn split_values(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

/// Fold the request into a collection query.
///
/// The by-id endpoints do not allow `match[id]` or `match[type]`, and the
/// versions endpoint does not allow `match[version]`; offending filters
/// are cleared with an informational log before the path variable is
/// applied. A malformed `{objectid}` is an `invalid-filter` error.
pub fn build_query<S>(
    state: &ContentState<S>,
    params: &ListParams,
    object_id: Option<&str>,
) -> TaxiiResult<CollectionQuery> {
    let mut query = CollectionQuery::new(state.collection_id.as_str(), state.server_record_limit);

    if let Some(value) = params.match_id.as_deref() {
        query.stix_id = split_values(value);
    }
    if let Some(value) = params.match_type.as_deref() {
        query.stix_type = split_values(value);
    }
    if let Some(value) = params.match_version.as_deref() {
        query.stix_version = split_values(value);
    }
    if let Some(value) = params.added_after.as_deref() {
        query.added_after = split_values(value);
    }
    if let Some(value) = params.added_before.as_deref() {
        query.added_before = split_values(value);
    }
    if let Some(value) = params.limit.as_deref() {
        query.limit = split_values(value);
        if !query.limit.iter().any(|v| v.trim().parse::<u64>().is_ok()) {
            warn!(limit = value, "ignoring unparsable limit parameter");
        }
    }

    if matches!(
        state.endpoint,
        ContentEndpoint::ObjectById | ContentEndpoint::Versions
    ) {
        // These endpoints select by path; client-sent selectors are not
        // allowed and are dropped rather than rejected.
        if !query.stix_id.is_empty() {
            info!("client sent a STIX id as a filter parameter when not allowed");
            query.stix_id.clear();
        }
        if !query.stix_type.is_empty() {
            info!("client sent a STIX type as a filter parameter when not allowed");
            query.stix_type.clear();
        }
        if state.endpoint == ContentEndpoint::Versions && !query.stix_version.is_empty() {
            info!("client sent a STIX version as a filter parameter when not allowed");
            query.stix_version.clear();
        }

        let object_id = object_id.unwrap_or_default();
        if is_valid_stix_id(object_id) {
            query.stix_id.push(object_id.to_string());
        } else {
            return Err(TaxiiError::InvalidFilter(format!(
                "the object id in the request path is not a valid STIX id: {object_id}"
            )));
        }
    }

    Ok(query)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests assert on known-good values")]
mod tests {
    use super::*;
    use crate::auth::AuthSettings;
    use crate::context::HtmlRoute;
    use std::sync::Arc;

    const OBJECT_ID: &str = "indicator--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f";

    fn state(endpoint: ContentEndpoint) -> ContentState<()> {
        ContentState {
            store: Arc::new(()),
            auth: Arc::new(AuthSettings::default()),
            endpoint,
            collection_id: "9cfa669c-ee94-4ece-afd2-f8edac37d8fd".to_string(),
            can_read: true,
            can_write: true,
            server_record_limit: 100,
            html: HtmlRoute::default(),
        }
    }

    #[test]
    fn parameters_fold_into_filter_vectors() {
        let params = ListParams {
            limit: Some("5".to_string()),
            added_after: Some("2024-01-01T00:00:00Z".to_string()),
            added_before: None,
            match_id: Some(format!("{OBJECT_ID},malware--1")),
            match_type: Some("indicator,malware".to_string()),
            match_version: Some("last".to_string()),
        };
        let query = build_query(&state(ContentEndpoint::Objects), &params, None).unwrap();

        assert_eq!(query.stix_id.len(), 2);
        assert_eq!(
            query.stix_type,
            vec!["indicator".to_string(), "malware".to_string()]
        );
        assert_eq!(query.stix_version, vec!["last".to_string()]);
        assert_eq!(query.added_after, vec!["2024-01-01T00:00:00Z".to_string()]);
        assert_eq!(query.effective_limit(), Some(5));
        assert_eq!(query.server_record_limit, 100);
    }

    #[test]
    fn by_id_endpoint_clears_selectors_and_appends_path_id() {
        let params = ListParams {
            match_id: Some("indicator--not-me".to_string()),
            match_type: Some("malware".to_string()),
            match_version: Some("all".to_string()),
            ..ListParams::default()
        };
        let query =
            build_query(&state(ContentEndpoint::ObjectById), &params, Some(OBJECT_ID)).unwrap();

        assert_eq!(query.stix_id, vec![OBJECT_ID.to_string()]);
        assert!(query.stix_type.is_empty());
        // match[version] stays allowed on the by-id endpoint.
        assert_eq!(query.stix_version, vec!["all".to_string()]);
    }

    #[test]
    fn versions_endpoint_also_clears_version_filter() {
        let params = ListParams {
            match_version: Some("2024-01-01T00:00:00Z".to_string()),
            ..ListParams::default()
        };
        let query =
            build_query(&state(ContentEndpoint::Versions), &params, Some(OBJECT_ID)).unwrap();

        assert_eq!(query.stix_id, vec![OBJECT_ID.to_string()]);
        assert!(query.stix_version.is_empty());
    }

    #[test]
    fn malformed_path_id_is_an_invalid_filter() {
        let result = build_query(
            &state(ContentEndpoint::ObjectById),
            &ListParams::default(),
            Some("not-a-stix-id"),
        );
        assert!(matches!(result, Err(TaxiiError::InvalidFilter(_))));
    }

    #[test]
    fn list_endpoint_keeps_client_selectors() {
        let params = ListParams {
            match_id: Some(OBJECT_ID.to_string()),
            ..ListParams::default()
        };
        let query = build_query(&state(ContentEndpoint::Objects), &params, None).unwrap();
        assert_eq!(query.stix_id, vec![OBJECT_ID.to_string()]);
    }
}
