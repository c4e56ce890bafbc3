//! STIX identifier validation and the opaque object carrier.
//!
//! The server does not model STIX beyond what the exchange protocol needs:
//! a well-formed `<type>--<uuid>` identifier, a type token, and a version
//! timestamp. Everything else in an object passes through untouched.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::parse_taxii_timestamp;

/// STIX type tokens are lowercase alphanumeric with single hyphens.
///
/// # Safety
/// The pattern is a compile-time constant that is known to be valid.
#[allow(clippy::expect_used)]
static TYPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").expect("TYPE_REGEX pattern is valid")
});

/// Check whether a string is a valid STIX object type token.
pub fn is_valid_stix_type(value: &str) -> bool {
    TYPE_REGEX.is_match(value)
}

/// Check whether a string is a valid STIX identifier (`<type>--<uuid>`).
pub fn is_valid_stix_id(value: &str) -> bool {
    match value.split_once("--") {
        Some((object_type, uuid)) => {
            is_valid_stix_type(object_type) && Uuid::parse_str(uuid).is_ok()
        }
        None => false,
    }
}

/// Object decode failure.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not a JSON object.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing `id` property.
    #[error("object has no id")]
    MissingId,

    /// Malformed STIX identifier.
    #[error("invalid STIX id: {0}")]
    InvalidId(String),

    /// Missing `type` property.
    #[error("object has no type")]
    MissingType,

    /// Malformed STIX type token.
    #[error("invalid STIX type: {0}")]
    InvalidType(String),

    /// The `type` property disagrees with the identifier prefix.
    #[error("object type {object_type} does not match id {id}")]
    TypeMismatch { id: String, object_type: String },

    /// Neither `modified` nor `created` carries a usable timestamp.
    #[error("object has no modified or created timestamp")]
    MissingVersion,
}

/// The opaque object carrier.
///
/// `id`, `object_type`, and `version` are lifted out for filtering and
/// storage keys; `data` retains the complete original JSON so nothing the
/// client sent is lost or reordered on the way to the store.
#[derive(Debug, Clone)]
pub struct StixObject {
    /// STIX identifier, `<type>--<uuid>`.
    pub id: String,

    /// Type token. Must agree with the identifier prefix.
    pub object_type: String,

    /// STIX spec version, defaulting to "2.1".
    pub spec_version: String,

    /// Object version. `modified` when present, else `created`
    /// (TAXII 2.1 §3.4.1 fallback order). Required.
    pub version: DateTime<Utc>,

    /// The full original JSON payload.
    pub data: Value,
}

impl StixObject {
    /// Decode one raw envelope element into the carrier.
    ///
    /// `id`, `type`, and a version timestamp are mandatory; an object
    /// missing any of them fails alone inside its envelope.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let data: Value = serde_json::from_str(raw)?;

        let id = data
            .get("id")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingId)?
            .to_string();

        if !is_valid_stix_id(&id) {
            return Err(DecodeError::InvalidId(id));
        }

        let object_type = data
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingType)?
            .to_string();

        if !is_valid_stix_type(&object_type) {
            return Err(DecodeError::InvalidType(object_type));
        }

        // The identifier prefix carries the same token; a disagreement
        // means the object is lying about one of them.
        if id.split("--").next() != Some(object_type.as_str()) {
            return Err(DecodeError::TypeMismatch { id, object_type });
        }

        let spec_version = data
            .get("spec_version")
            .and_then(Value::as_str)
            .unwrap_or("2.1")
            .to_string();

        let version = object_version(&data).ok_or(DecodeError::MissingVersion)?;

        Ok(Self {
            id,
            object_type,
            spec_version,
            version,
            data,
        })
    }
}

/// Resolve the TAXII version of an object: `modified`, else `created`.
pub fn object_version(data: &Value) -> Option<DateTime<Utc>> {
    for field in ["modified", "created"] {
        if let Some(ts) = data
            .get(field)
            .and_then(Value::as_str)
            .and_then(parse_taxii_timestamp)
        {
            return Some(ts);
        }
    }
    None
}
