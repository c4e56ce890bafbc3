//! Content GET pipeline.
//!
//! AUTH → NEGOTIATE → BUILD_QUERY → FETCH → ENCODE, with the endpoint
//! already classified by the route planner. The paginated listings
//! (objects, manifest) answer 206 Partial Content; the by-id reads answer
//! 200. Store failures surface as 404 `taxii-error` records.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use tracing::info;

use ebbtide_store::Datastore;

use crate::auth::authorize;
use crate::context::{ContentEndpoint, ContentState};
use crate::error::{TaxiiError, TaxiiResult};
use crate::handlers::accept_header;
use crate::media::MediaType;
use crate::query::build_query;
use crate::resources::{ListParams, ManifestResponse, ObjectsResponse, VersionsResponse};
use crate::respond::{self, PageBounds};

/// GET `.../objects/`
pub async fn objects_get_handler<S: Datastore + 'static>(
    State(state): State<Arc<ContentState<S>>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> TaxiiResult<Response> {
    content_get(&state, &headers, &params, None).await
}

/// GET `.../objects/{objectid}/`
pub async fn object_by_id_handler<S: Datastore + 'static>(
    State(state): State<Arc<ContentState<S>>>,
    Path(object_id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> TaxiiResult<Response> {
    content_get(&state, &headers, &params, Some(&object_id)).await
}

/// GET `.../objects/{objectid}/versions/`
pub async fn versions_handler<S: Datastore + 'static>(
    State(state): State<Arc<ContentState<S>>>,
    Path(object_id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> TaxiiResult<Response> {
    content_get(&state, &headers, &params, Some(&object_id)).await
}

/// GET `.../manifest/`
pub async fn manifest_handler<S: Datastore + 'static>(
    State(state): State<Arc<ContentState<S>>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> TaxiiResult<Response> {
    content_get(&state, &headers, &params, None).await
}

async fn content_get<S: Datastore>(
    state: &ContentState<S>,
    headers: &HeaderMap,
    params: &ListParams,
    object_id: Option<&str>,
) -> TaxiiResult<Response> {
    authorize(&state.auth, headers)?;

    // Authorization failures hide the resource.
    if !state.can_read {
        return Err(TaxiiError::GetObjects(
            "the requested resources were not found".to_string(),
        ));
    }

    let accept = MediaType::from_accept(accept_header(headers));
    let query = build_query(state, params, object_id)?;
    info!(
        collection = %state.collection_id,
        endpoint = ?state.endpoint,
        "serving content request"
    );

    match state.endpoint {
        ContentEndpoint::Objects => {
            let page = state
                .store
                .get_objects(&query)
                .await
                .map_err(TaxiiError::from_store)?;
            let bounds = PageBounds::from_objects(&page);
            let resource = ObjectsResponse {
                objects: page.objects,
            };
            Ok(respond::encode(
                &accept,
                StatusCode::PARTIAL_CONTENT,
                &resource,
                &state.html,
                Some(&bounds),
            ))
        }
        ContentEndpoint::ObjectById => {
            let page = state
                .store
                .get_objects(&query)
                .await
                .map_err(TaxiiError::from_store)?;
            let bounds = PageBounds::from_objects(&page);
            let resource = ObjectsResponse {
                objects: page.objects,
            };
            Ok(respond::encode(
                &accept,
                StatusCode::OK,
                &resource,
                &state.html,
                Some(&bounds),
            ))
        }
        ContentEndpoint::Versions => {
            let page = state
                .store
                .get_versions(&query)
                .await
                .map_err(TaxiiError::from_store)?;
            let bounds = PageBounds::from_versions(&page);
            let resource = VersionsResponse::from_page(&page);
            Ok(respond::encode(
                &accept,
                StatusCode::OK,
                &resource,
                &state.html,
                Some(&bounds),
            ))
        }
        ContentEndpoint::Manifest => {
            let page = state
                .store
                .get_manifest(&query)
                .await
                .map_err(TaxiiError::from_store)?;
            let bounds = PageBounds::from_manifest(&page);
            let resource = ManifestResponse::from_page(&page);
            Ok(respond::encode(
                &accept,
                StatusCode::PARTIAL_CONTENT,
                &resource,
                &state.html,
                Some(&bounds),
            ))
        }
    }
}
