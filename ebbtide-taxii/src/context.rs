//! Per-route request context.
//!
//! The route planner builds one of these for every registered route. The
//! context carries the route's policy — endpoint tag, bound resource
//! reference, ACL flags, record limit, HTML rendering — into the shared
//! pipeline functions. Variants of "handler" are tagged cases, not types.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use ebbtide_core::{ApiRoot, CollectionView, Discovery};

use crate::auth::AuthSettings;
use crate::error::{TaxiiError, TaxiiResult};
use crate::resources::{CollectionInfo, CollectionsResponse};

/// Which content endpoint a route serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEndpoint {
    /// `GET|POST .../objects/`
    Objects,
    /// `GET .../objects/{objectid}/`
    ObjectById,
    /// `GET .../objects/{objectid}/versions/`
    Versions,
    /// `GET .../manifest/`
    Manifest,
}

/// HTML output policy of one route.
#[derive(Debug, Clone, Default)]
pub struct HtmlRoute {
    pub enabled: bool,
    /// Full template file path, set when enabled.
    pub template: Option<PathBuf>,
}

/// The resource a resource-describing route serves.
#[derive(Debug, Clone)]
pub enum ResourceRef {
    Discovery(Arc<Discovery>),
    ApiRoot(Arc<ApiRoot>),
    Collections(Arc<Vec<CollectionView>>),
    Collection(Arc<CollectionView>),
}

impl ResourceRef {
    /// Serialize the bound resource for encoding.
    pub fn to_json(&self) -> TaxiiResult<Value> {
        let value = match self {
            Self::Discovery(discovery) => serde_json::to_value(discovery.as_ref()),
            Self::ApiRoot(api_root) => serde_json::to_value(api_root.as_ref()),
            Self::Collections(views) => {
                let infos: Vec<CollectionInfo> =
                    views.iter().map(CollectionInfo::from_view).collect();
                let response = CollectionsResponse {
                    collections: if infos.is_empty() { None } else { Some(infos) },
                };
                serde_json::to_value(&response)
            }
            Self::Collection(view) => serde_json::to_value(CollectionInfo::from_view(view)),
        };
        value.map_err(|err| TaxiiError::GetObjects(err.to_string()))
    }
}

/// State bound to a resource-describing route.
#[derive(Debug, Clone)]
pub struct ResourceState {
    pub resource: ResourceRef,
    pub auth: Arc<AuthSettings>,
    pub html: HtmlRoute,
}

/// State bound to a content route.
#[derive(Debug)]
pub struct ContentState<S> {
    pub store: Arc<S>,
    pub auth: Arc<AuthSettings>,
    pub endpoint: ContentEndpoint,
    pub collection_id: String,
    pub can_read: bool,
    pub can_write: bool,
    pub server_record_limit: u64,
    pub html: HtmlRoute,
}
