//! TAXII error taxonomy.
//!
//! The taxonomy is closed: every failure a request can surface maps onto
//! one of these kinds, and each kind carries a fixed title and HTTP
//! status. Datastore errors are converted at the pipeline boundary and
//! never leak their own types to the wire.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::media::MEDIA_TYPE_TAXII21;
use crate::respond::STRICT_TRANSPORT_SECURITY;

use ebbtide_store::StoreError;

/// TAXII result type.
pub type TaxiiResult<T> = Result<T, TaxiiError>;

/// The `taxii-error` record sent to clients.
#[derive(Debug, Serialize)]
pub struct TaxiiErrorBody {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub http_status: String,
}

/// TAXII request failure.
#[derive(Debug, Error)]
pub enum TaxiiError {
    /// Authentication required or failed.
    #[error("authentication required")]
    Unauthenticated,

    /// Request body media type is not acceptable for ingest.
    #[error("unsupported media type")]
    UnsupportedMediaType,

    /// No requested response media type is available.
    #[error("not acceptable")]
    NotAcceptable,

    /// The datastore could not satisfy a read.
    #[error("get objects error: {0}")]
    GetObjects(String),

    /// The ingest envelope could not be decoded.
    #[error("parse objects error")]
    ParseObjects,

    /// The requested status resource does not exist.
    #[error("status not found")]
    StatusNotFound,

    /// A malformed filter or path variable.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

impl TaxiiError {
    /// Get HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::UnsupportedMediaType | Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::GetObjects(_) | Self::StatusNotFound | Self::InvalidFilter(_) => {
                StatusCode::NOT_FOUND
            }
            Self::ParseObjects => StatusCode::BAD_REQUEST,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Authentication Required",
            Self::UnsupportedMediaType => "Wrong Media Type",
            Self::NotAcceptable => "Not Acceptable",
            Self::GetObjects(_) => "Get Objects Error",
            Self::ParseObjects => "Parse Objects Error",
            Self::StatusNotFound => "Status Not Found",
            Self::InvalidFilter(_) => "Invalid Filter",
        }
    }

    fn description(&self) -> Option<String> {
        match self {
            Self::Unauthenticated => {
                Some("The requested resource requires authentication.".to_string())
            }
            Self::UnsupportedMediaType => Some(
                "The POST body must be application/taxii+json;version=2.1.".to_string(),
            ),
            Self::NotAcceptable => None,
            Self::GetObjects(msg) => {
                Some(format!("The request had the following problem: {msg}"))
            }
            Self::ParseObjects => {
                Some("The provided envelope could not be decoded.".to_string())
            }
            Self::StatusNotFound => {
                Some("The requested status resource was not found.".to_string())
            }
            // Passthrough of the underlying message.
            Self::InvalidFilter(msg) => Some(msg.clone()),
        }
    }

    /// Convert to the wire error record.
    pub fn to_error_body(&self) -> TaxiiErrorBody {
        let status = self.status_code();
        TaxiiErrorBody {
            title: self.title().to_string(),
            description: self.description(),
            error_code: Some(status.as_u16().to_string()),
            http_status: format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            ),
        }
    }

    /// Map a datastore failure onto the taxonomy.
    pub fn from_store(err: StoreError) -> Self {
        Self::GetObjects(err.to_string())
    }
}

impl IntoResponse for TaxiiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Unauthenticated => debug!("rejecting unauthenticated request"),
            other => warn!(error = %other, "sending taxii-error response"),
        }

        let status = self.status_code();

        // 406 Not Acceptable carries no body at all.
        if matches!(self, Self::NotAcceptable) {
            let mut response = status.into_response();
            response.headers_mut().insert(
                header::STRICT_TRANSPORT_SECURITY,
                header::HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
            );
            return response;
        }

        let body = serde_json::to_string(&self.to_error_body()).unwrap_or_else(|_| {
            format!(r#"{{"title":"Internal Server Error","http_status":"{status}"}}"#)
        });

        let mut response = (
            status,
            [(header::CONTENT_TYPE, MEDIA_TYPE_TAXII21)],
            body,
        )
            .into_response();

        let headers = response.headers_mut();
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            header::HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
        );
        if matches!(self, Self::Unauthenticated) {
            headers.insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static(r#"Basic realm="Authentication Required""#),
            );
        }

        response
    }
}
