//! Resource-describing GET pipeline.
//!
//! Discovery, api-root, collections listing, and single collection all
//! follow the same path: authenticate, negotiate, encode the bound
//! resource. Dispatch is on the resource reference carried by the route.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use tracing::debug;

use crate::auth::authorize;
use crate::context::ResourceState;
use crate::error::TaxiiResult;
use crate::handlers::accept_header;
use crate::media::MediaType;
use crate::respond;

/// GET handler for discovery, api-root, collections, and collection.
pub async fn resource_handler(
    State(state): State<Arc<ResourceState>>,
    headers: HeaderMap,
) -> TaxiiResult<Response> {
    authorize(&state.auth, &headers)?;

    let accept = MediaType::from_accept(accept_header(&headers));
    debug!(?accept, "resource request negotiated");

    let resource = state.resource.to_json()?;
    Ok(respond::encode(
        &accept,
        StatusCode::OK,
        &resource,
        &state.html,
        None,
    ))
}
