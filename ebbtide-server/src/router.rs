//! Route planning.
//!
//! Walks the verified configuration and registers a handler for every
//! enabled service. Each api-root gets its own permission view of the
//! collections it exposes, built by unioning the root's `read_access` and
//! `write_access` lists; the canonical collection records are never
//! mutated. A service counter tallies what was mounted — a configuration
//! that registers nothing is a startup failure.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use ebbtide_core::{CollectionView, HtmlConfig, ServerConfig};
use ebbtide_store::Datastore;
use ebbtide_taxii::handlers::{
    manifest_handler, object_by_id_handler, objects_get_handler, objects_post_handler,
    resource_handler, versions_handler,
};
use ebbtide_taxii::{AuthSettings, ContentEndpoint, ContentState, HtmlRoute, ResourceRef,
    ResourceState};

use crate::error::ServerError;

/// Build the router from the parsed configuration.
///
/// Fails with [`ServerError::NoServices`] when nothing is enabled.
pub fn build_router<S: Datastore + 'static>(
    config: &ServerConfig,
    store: Arc<S>,
) -> Result<Router, ServerError> {
    let auth = Arc::new(AuthSettings {
        enabled: config.authentication.enabled,
        basic: config.authentication.basic,
        accounts: config.authentication.accounts.clone(),
    });

    let mut router = Router::new();
    let mut service_counter = 0usize;

    if config.discovery_server.enabled {
        for service in &config.discovery_server.services {
            if !service.enabled {
                continue;
            }
            let Some(resource) = config.discovery_resources.get(&service.resource_id) else {
                continue;
            };

            info!(path = %service.path, "starting TAXII GET discovery service");
            let state = Arc::new(ResourceState {
                resource: ResourceRef::Discovery(Arc::new(resource.clone())),
                auth: Arc::clone(&auth),
                html: html_route(config, service.html.as_ref(), "discovery.html"),
            });
            router = router.route(&service.path, get(resource_handler).with_state(state));
            service_counter += 1;
        }
    }

    if config.api_root_server.enabled {
        for api in &config.api_root_server.services {
            if !api.enabled {
                continue;
            }
            let Some(root_resource) = config.api_root_resources.get(&api.resource_id) else {
                continue;
            };

            info!(path = %api.path, "starting TAXII GET api-root service");
            let state = Arc::new(ResourceState {
                resource: ResourceRef::ApiRoot(Arc::new(root_resource.clone())),
                auth: Arc::clone(&auth),
                html: html_route(config, api.html.as_ref(), "apiroot.html"),
            });
            router = router.route(&api.path, get(resource_handler).with_state(state));
            service_counter += 1;

            if api.collections.enabled {
                router = mount_collections(router, config, api, &auth, &store);
            }
        }
    }

    if service_counter == 0 {
        return Err(ServerError::NoServices);
    }

    Ok(router
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(|panic_info| {
            error!("handler panicked: {:?}", panic_info);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        })))
}

/// Build the per-root permission views and mount the collection routes.
fn mount_collections<S: Datastore + 'static>(
    mut router: Router,
    config: &ServerConfig,
    api: &ebbtide_core::ApiRootService,
    auth: &Arc<AuthSettings>,
    store: &Arc<S>,
) -> Router {
    // Work on a per-root map keyed by resource id so permissions stay
    // unique to this api-root. Duplicate ids collapse into one view; an id
    // in both access lists yields one view with both flags.
    let mut views: BTreeMap<String, CollectionView> = BTreeMap::new();
    for resource_id in &api.collections.read_access {
        if let Some(collection) = config.collection_resources.get(resource_id) {
            views
                .entry(resource_id.clone())
                .or_insert_with(|| CollectionView {
                    collection: Arc::new(collection.clone()),
                    can_read: false,
                    can_write: false,
                })
                .can_read = true;
        }
    }
    for resource_id in &api.collections.write_access {
        if let Some(collection) = config.collection_resources.get(resource_id) {
            views
                .entry(resource_id.clone())
                .or_insert_with(|| CollectionView {
                    collection: Arc::new(collection.clone()),
                    can_read: false,
                    can_write: false,
                })
                .can_write = true;
        }
    }

    let views: Vec<CollectionView> = views.into_values().collect();

    let collections_path = format!("{}collections/", api.path);
    info!(path = %collections_path, "starting TAXII GET collections service");
    let state = Arc::new(ResourceState {
        resource: ResourceRef::Collections(Arc::new(views.clone())),
        auth: Arc::clone(auth),
        html: html_route(config, api.html.as_ref(), "collections.html"),
    });
    router = router.route(&collections_path, get(resource_handler).with_state(state));

    for view in views {
        let collection_path = format!("{}{}/", collections_path, view.collection.id);
        info!(path = %collection_path, "starting TAXII GET collection service");
        let state = Arc::new(ResourceState {
            resource: ResourceRef::Collection(Arc::new(view.clone())),
            auth: Arc::clone(auth),
            html: html_route(config, api.html.as_ref(), "collection.html"),
        });
        router = router.route(&collection_path, get(resource_handler).with_state(state));

        let content_state = |endpoint: ContentEndpoint, template: &str| {
            Arc::new(ContentState {
                store: Arc::clone(store),
                auth: Arc::clone(auth),
                endpoint,
                collection_id: view.collection.id.to_string(),
                can_read: view.can_read,
                can_write: view.can_write,
                server_record_limit: config.global.server_record_limit,
                html: html_route(config, api.html.as_ref(), template),
            })
        };

        // Both methods are mounted whenever either is permitted; the
        // handler answers 404 on the denied one so existence stays hidden.
        let objects_path = format!("{collection_path}objects/");
        if view.can_read {
            info!(path = %objects_path, "starting TAXII GET objects service");
        }
        if view.can_write {
            info!(path = %objects_path, "starting TAXII POST objects service");
        }
        router = router.route(
            &objects_path,
            get(objects_get_handler::<S>)
                .post(objects_post_handler::<S>)
                .with_state(content_state(ContentEndpoint::Objects, "objects.html")),
        );

        if view.can_read {
            let object_path = format!("{objects_path}{{objectid}}/");
            info!(path = %object_path, "starting TAXII GET object by id service");
            router = router.route(
                &object_path,
                get(object_by_id_handler::<S>)
                    .with_state(content_state(ContentEndpoint::ObjectById, "objects.html")),
            );

            let versions_path = format!("{objects_path}{{objectid}}/versions/");
            info!(path = %versions_path, "starting TAXII GET object versions service");
            router = router.route(
                &versions_path,
                get(versions_handler::<S>)
                    .with_state(content_state(ContentEndpoint::Versions, "objects.html")),
            );

            let manifest_path = format!("{collection_path}manifest/");
            info!(path = %manifest_path, "starting TAXII GET manifest service");
            router = router.route(
                &manifest_path,
                get(manifest_handler::<S>)
                    .with_state(content_state(ContentEndpoint::Manifest, "manifest.html")),
            );
        }
    }

    router
}

/// Resolve the HTML policy for one route.
fn html_route(
    config: &ServerConfig,
    service_html: Option<&HtmlConfig>,
    template_file: &str,
) -> HtmlRoute {
    let html = config.effective_html(service_html);
    if !html.enabled {
        return HtmlRoute::default();
    }
    HtmlRoute {
        enabled: true,
        template: Some(PathBuf::from(format!(
            "{}{}{}",
            config.global.prefix, html.template_dir, template_file
        ))),
    }
}
