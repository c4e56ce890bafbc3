//! TAXII 2.1 protocol implementation.
//!
//! The pipeline is config-driven: the route planner binds a
//! [`context::ResourceState`] or [`context::ContentState`] to every route
//! (carrying the bound [`context::ResourceRef`] or
//! [`context::ContentEndpoint`] tag plus the route's ACL flags), and a
//! small number of shared handlers dispatch on that state instead of
//! sniffing the request path.
//!
//! # Endpoints
//!
//! | Endpoint | Handler |
//! |----------|---------|
//! | `GET <discovery-path>` | resource |
//! | `GET <api-root-path>` | resource |
//! | `GET <api-root-path>collections/` | resource |
//! | `GET <api-root-path>collections/{cid}/` | resource |
//! | `GET <api-root-path>collections/{cid}/objects/` | content |
//! | `POST <api-root-path>collections/{cid}/objects/` | ingest |
//! | `GET <api-root-path>collections/{cid}/objects/{objectid}/` | content |
//! | `GET <api-root-path>collections/{cid}/objects/{objectid}/versions/` | content |
//! | `GET <api-root-path>collections/{cid}/manifest/` | content |

pub mod auth;
pub mod context;
pub mod error;
pub mod handlers;
pub mod media;
pub mod query;
pub mod resources;
pub mod respond;

pub use auth::{AuthSettings, Principal, authorize};
pub use context::{ContentEndpoint, ContentState, HtmlRoute, ResourceRef, ResourceState};
pub use error::{TaxiiError, TaxiiErrorBody, TaxiiResult};
pub use media::MediaType;
pub use resources::{
    CollectionInfo, CollectionsResponse, ListParams, ManifestEntry, ManifestResponse,
    ObjectsResponse, RawEnvelope, Status, StatusDetail, VersionsResponse,
};
