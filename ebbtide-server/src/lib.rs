//! HTTP server for the Ebbtide TAXII service.

pub mod error;
pub mod router;

pub use error::{ServerError, ServerResult};
pub use router::build_router;
