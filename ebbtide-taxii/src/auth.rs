//! Request authentication.
//!
//! HTTP Basic against a configured allow list. Authentication resolves the
//! principal; per-collection authorization stays with the handlers, which
//! hide denied resources behind 404.

use std::collections::HashMap;

use axum::http::{HeaderMap, header};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use tracing::debug;

use crate::error::{TaxiiError, TaxiiResult};

/// Authentication settings shared by every route.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    pub enabled: bool,
    /// Whether HTTP Basic is accepted. No other scheme is implemented.
    pub basic: bool,
    /// username -> password.
    pub accounts: HashMap<String, String>,
}

/// The authenticated requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Authentication disabled; everyone is anonymous.
    Anonymous,
    /// A credentialed account.
    Named(String),
}

/// Resolve the principal for a request.
///
/// With authentication disabled every request is anonymous. With it
/// enabled, a missing, malformed, or unknown Basic credential is an
/// authentication failure; so is any non-Basic scheme, since none other
/// is supported.
pub fn authorize(settings: &AuthSettings, headers: &HeaderMap) -> TaxiiResult<Principal> {
    if !settings.enabled {
        return Ok(Principal::Anonymous);
    }

    if !settings.basic {
        debug!("authentication enabled but basic auth is not; rejecting");
        return Err(TaxiiError::Unauthenticated);
    }

    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(TaxiiError::Unauthenticated)?;

    let (scheme, token) = header_value
        .split_once(' ')
        .ok_or(TaxiiError::Unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(TaxiiError::Unauthenticated);
    }

    let (username, password) =
        parse_basic_token(token).ok_or(TaxiiError::Unauthenticated)?;

    match settings.accounts.get(&username) {
        Some(expected) if *expected == password => Ok(Principal::Named(username)),
        _ => {
            debug!(%username, "authentication failed");
            Err(TaxiiError::Unauthenticated)
        }
    }
}

/// Parse a Basic token into username and password.
fn parse_basic_token(token: &str) -> Option<(String, String)> {
    let decoded = BASE64.decode(token.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
