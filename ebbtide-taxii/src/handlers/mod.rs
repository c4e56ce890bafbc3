//! Route handlers.
//!
//! Three shared pipelines cover the whole URL surface: one for the four
//! resource-describing GETs, one for the four content GETs, and one for
//! the envelope POST. Route-specific policy arrives through the bound
//! state, not through per-route code.

mod content;
mod ingest;
mod resource;

pub use content::{
    manifest_handler, object_by_id_handler, objects_get_handler, versions_handler,
};
pub use ingest::objects_post_handler;
pub use resource::resource_handler;

use axum::http::{HeaderMap, header};

/// The Accept header, or empty when absent.
pub(crate) fn accept_header(headers: &HeaderMap) -> &str {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// The Content-Type header, or empty when absent.
pub(crate) fn content_type_header(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}
