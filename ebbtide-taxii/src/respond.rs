//! Response encoding.
//!
//! Selects the representation from the negotiated media flags in the fixed
//! priority `TAXII 2.1 > TAXII 2.0 > JSON > HTML`, stamps the transport
//! headers, and applies the status-code policy. HTML is presentation only:
//! it substitutes the JSON rendering of the resource into the route's
//! template and must not alter semantics.

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use ebbtide_core::taxii2_datetimeformat;
use ebbtide_store::{ManifestPage, ObjectPage, VersionPage};

use crate::context::HtmlRoute;
use crate::media::{
    MEDIA_TYPE_HTML, MEDIA_TYPE_JSON, MEDIA_TYPE_TAXII20, MEDIA_TYPE_TAXII21, MediaType,
};

/// Value of the Strict-Transport-Security header set on every response.
pub const STRICT_TRANSPORT_SECURITY: &str = "max-age=86400; includeSubDomains";

const HEADER_DATE_ADDED_FIRST: HeaderName = HeaderName::from_static("x-taxii-date-added-first");
const HEADER_DATE_ADDED_LAST: HeaderName = HeaderName::from_static("x-taxii-date-added-last");

/// The `date_added` window of a returned page, pre-formatted.
#[derive(Debug, Clone)]
pub struct PageBounds {
    pub first: String,
    pub last: String,
}

impl PageBounds {
    pub fn from_objects(page: &ObjectPage) -> Self {
        Self {
            first: taxii2_datetimeformat(&page.date_added_first),
            last: taxii2_datetimeformat(&page.date_added_last),
        }
    }

    pub fn from_versions(page: &VersionPage) -> Self {
        Self {
            first: taxii2_datetimeformat(&page.date_added_first),
            last: taxii2_datetimeformat(&page.date_added_last),
        }
    }

    pub fn from_manifest(page: &ManifestPage) -> Self {
        Self {
            first: taxii2_datetimeformat(&page.date_added_first),
            last: taxii2_datetimeformat(&page.date_added_last),
        }
    }
}

/// Encode a resource at the negotiated media type.
///
/// `success` is the status to use when a representation is selected; if no
/// requested media type is available the response is 406 with an empty
/// body.
pub fn encode<T: Serialize>(
    accept: &MediaType,
    success: StatusCode,
    resource: &T,
    html: &HtmlRoute,
    bounds: Option<&PageBounds>,
) -> Response {
    let mut response = if accept.taxii21 {
        match serde_json::to_string(resource) {
            Ok(body) => (
                success,
                [(header::CONTENT_TYPE, MEDIA_TYPE_TAXII21)],
                body,
            )
                .into_response(),
            Err(err) => serialization_failure(&err),
        }
    } else if accept.taxii20 {
        match serde_json::to_string(resource) {
            Ok(body) => (
                success,
                [(header::CONTENT_TYPE, MEDIA_TYPE_TAXII20)],
                body,
            )
                .into_response(),
            Err(err) => serialization_failure(&err),
        }
    } else if accept.json {
        match serde_json::to_string_pretty(resource) {
            Ok(body) => {
                (success, [(header::CONTENT_TYPE, MEDIA_TYPE_JSON)], body).into_response()
            }
            Err(err) => serialization_failure(&err),
        }
    } else if html.enabled && accept.html {
        match render_html(resource, html) {
            Ok(body) => {
                (success, [(header::CONTENT_TYPE, MEDIA_TYPE_HTML)], body).into_response()
            }
            // A template failure is fatal for the request; partial HTML
            // would be worse.
            Err(message) => {
                error!(%message, "HTML template rendering failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    } else {
        StatusCode::NOT_ACCEPTABLE.into_response()
    };

    let headers = response.headers_mut();
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
    );
    if let Some(bounds) = bounds {
        if let Ok(value) = HeaderValue::from_str(&bounds.first) {
            headers.insert(HEADER_DATE_ADDED_FIRST, value);
        }
        if let Ok(value) = HeaderValue::from_str(&bounds.last) {
            headers.insert(HEADER_DATE_ADDED_LAST, value);
        }
    }

    response
}

/// Substitute the resource into the route's template file.
///
/// The template marks the insertion point with `{{resource}}`.
fn render_html<T: Serialize>(resource: &T, html: &HtmlRoute) -> Result<String, String> {
    let template_path = html
        .template
        .as_ref()
        .ok_or_else(|| "no template configured for this route".to_string())?;

    let template = std::fs::read_to_string(template_path)
        .map_err(|err| format!("cannot read template {}: {err}", template_path.display()))?;

    let rendered = serde_json::to_string_pretty(resource)
        .map_err(|err| format!("cannot serialize resource: {err}"))?;

    Ok(template.replace("{{resource}}", &rendered))
}

fn serialization_failure(err: &serde_json::Error) -> Response {
    error!(error = %err, "failed to serialize response");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
