//! Envelope ingest pipeline.
//!
//! AUTH → CHECK_CONTENT_TYPE → OPEN_STATUS → STREAM_DECODE → ENCODE.
//! The envelope shell is decoded eagerly, the objects lazily, and each
//! object succeeds or fails alone: the response is 202 Accepted with a
//! per-object status record whatever the individual outcomes were.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tracing::{debug, error, warn};

use ebbtide_store::Datastore;

use crate::auth::authorize;
use crate::context::ContentState;
use crate::error::{TaxiiError, TaxiiResult};
use crate::handlers::{accept_header, content_type_header};
use crate::media::MediaType;
use crate::resources::{RawEnvelope, Status};
use crate::respond;

use ebbtide_core::StixObject;

/// POST `.../objects/`
pub async fn objects_post_handler<S: Datastore + 'static>(
    State(state): State<Arc<ContentState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> TaxiiResult<Response> {
    ingest(&state, &headers, &body).await
}

async fn ingest<S: Datastore>(
    state: &ContentState<S>,
    headers: &HeaderMap,
    body: &[u8],
) -> TaxiiResult<Response> {
    authorize(&state.auth, headers)?;

    // Authorization failures hide the resource.
    if !state.can_write {
        return Err(TaxiiError::GetObjects(
            "the requested resources were not found".to_string(),
        ));
    }

    let mut content_type = MediaType::default();
    content_type.parse_taxii(content_type_header(headers));
    if !content_type.taxii21 {
        return Err(TaxiiError::UnsupportedMediaType);
    }

    let mut status = Status::new();

    let envelope: RawEnvelope = serde_json::from_slice(body).map_err(|err| {
        error!(error = %err, "could not decode the provided envelope");
        TaxiiError::ParseObjects
    })?;

    for raw in &envelope.objects {
        status.total_count += 1;

        let object = match StixObject::decode(raw.get()) {
            Ok(object) => object,
            Err(err) => {
                warn!(error = %err, "error decoding object in envelope");
                status.record_failure(probe_id(raw.get()), "Object failed");
                continue;
            }
        };

        if let Err(err) = state.store.add_object(&object).await {
            warn!(id = %object.id, error = %err, "error adding object to the datastore");
            status.record_failure(object.id, "Object failed");
            continue;
        }
        status.record_success(object.id.clone(), "Object added");

        // The object is stored either way; a membership failure is the
        // client's to retry and is not counted against the envelope.
        if let Err(err) = state
            .store
            .add_to_collection(&state.collection_id, &object.id, &object.version)
            .await
        {
            warn!(
                collection = %state.collection_id,
                id = %object.id,
                error = %err,
                "error adding collection entry"
            );
        }
    }

    debug!(
        total = status.total_count,
        success = status.success_count,
        failure = status.failure_count,
        "envelope processed"
    );

    let accept = MediaType::from_accept(accept_header(headers));
    Ok(respond::encode(
        &accept,
        StatusCode::ACCEPTED,
        &status,
        &state.html,
        None,
    ))
}

/// Best-effort id extraction for failure details.
fn probe_id(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|value| {
            value
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default()
}
