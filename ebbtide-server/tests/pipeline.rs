//! Wire-level tests of the full request pipeline: real router, real
//! handlers, in-memory SQLite store.

#![expect(clippy::unwrap_used, reason = "tests assert on known-good values")]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use ebbtide_core::{
    ApiRoot, ApiRootService, Collection, CollectionsService, Discovery, DiscoveryService,
    ServerConfig,
};
use ebbtide_server::build_router;
use ebbtide_store::SqliteStore;

const COLLECTION_ID: &str = "9cfa669c-ee94-4ece-afd2-f8edac37d8fd";
const TAXII_MEDIA: &str = "application/taxii+json;version=2.1";

const OBJ_1: &str = "indicator--0a0a0a0a-0a0a-4a0a-8a0a-0a0a0a0a0a01";
const OBJ_2: &str = "indicator--0a0a0a0a-0a0a-4a0a-8a0a-0a0a0a0a0a02";
const OBJ_3: &str = "indicator--0a0a0a0a-0a0a-4a0a-8a0a-0a0a0a0a0a03";
const OBJ_4: &str = "indicator--0a0a0a0a-0a0a-4a0a-8a0a-0a0a0a0a0a04";
const OBJ_5: &str = "indicator--0a0a0a0a-0a0a-4a0a-8a0a-0a0a0a0a0a05";

fn test_config(auth_enabled: bool) -> ServerConfig {
    let mut config = ServerConfig::default();

    config.discovery_server.enabled = true;
    config.discovery_server.services.push(DiscoveryService {
        enabled: true,
        path: "/taxii2/".to_string(),
        resource_id: "discovery-1".to_string(),
        html: None,
    });
    config.discovery_resources.insert(
        "discovery-1".to_string(),
        Discovery {
            title: "Ebbtide TAXII Server".to_string(),
            description: Some("Threat intelligence exchange".to_string()),
            contact: None,
            default: Some("/api1/".to_string()),
            api_roots: vec!["/api1/".to_string()],
        },
    );

    config.api_root_server.enabled = true;
    for (path, read, write) in [
        ("/api1/", true, true),
        ("/readonly/", true, false),
        ("/writeonly/", false, true),
    ] {
        config.api_root_server.services.push(ApiRootService {
            enabled: true,
            path: path.to_string(),
            resource_id: "root-1".to_string(),
            html: None,
            collections: CollectionsService {
                enabled: true,
                read_access: if read {
                    vec!["col-1".to_string()]
                } else {
                    vec![]
                },
                write_access: if write {
                    vec!["col-1".to_string()]
                } else {
                    vec![]
                },
            },
        });
    }
    config.api_root_resources.insert(
        "root-1".to_string(),
        ApiRoot {
            title: "API Root One".to_string(),
            description: None,
            versions: vec![TAXII_MEDIA.to_string()],
            max_content_length: 10 * 1024 * 1024,
        },
    );
    config.collection_resources.insert(
        "col-1".to_string(),
        Collection {
            id: Uuid::parse_str(COLLECTION_ID).unwrap(),
            title: "High Value Indicators".to_string(),
            description: None,
            media_types: vec!["application/stix+json;version=2.1".to_string()],
        },
    );

    config.authentication.enabled = auth_enabled;
    config.verify().unwrap();
    config
}

async fn app(auth_enabled: bool) -> Router {
    let store = SqliteStore::in_memory().await.unwrap();
    build_router(&test_config(auth_enabled), Arc::new(store)).unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, TAXII_MEDIA)
        .body(Body::empty())
        .unwrap()
}

fn post_request(uri: &str, content_type: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::ACCEPT, TAXII_MEDIA)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn indicator(id: &str, modified: &str) -> Value {
    json!({
        "id": id,
        "type": "indicator",
        "spec_version": "2.1",
        "created": "2024-01-01T00:00:00.000Z",
        "modified": modified,
        "name": format!("indicator {id}"),
        "pattern": "[ipv4-addr:value = '10.0.0.1']",
        "pattern_type": "stix",
        "valid_from": "2024-01-01T00:00:00.000Z"
    })
}

fn envelope(objects: Vec<Value>) -> String {
    json!({ "objects": objects }).to_string()
}

fn objects_uri(root: &str) -> String {
    format!("{root}collections/{COLLECTION_ID}/objects/")
}

#[tokio::test]
async fn discovery_is_served() {
    let app = app(false).await;
    let (status, headers, body) = send(&app, get_request("/taxii2/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/taxii+json; charset=utf-8; version=2.1"
    );
    assert_eq!(
        headers[header::STRICT_TRANSPORT_SECURITY],
        "max-age=86400; includeSubDomains"
    );
    assert_eq!(body["title"], "Ebbtide TAXII Server");
    assert_eq!(body["api_roots"][0], "/api1/");
}

#[tokio::test]
async fn api_root_is_served() {
    let app = app(false).await;
    let (status, _, body) = send(&app, get_request("/api1/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "API Root One");
    assert_eq!(body["versions"][0], TAXII_MEDIA);
}

#[tokio::test]
async fn collections_listing_reflects_per_root_permissions() {
    let app = app(false).await;

    let (status, _, body) = send(&app, get_request("/api1/collections/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collections"][0]["id"], COLLECTION_ID);
    assert_eq!(body["collections"][0]["can_read"], true);
    assert_eq!(body["collections"][0]["can_write"], true);

    let (_, _, body) = send(&app, get_request("/readonly/collections/")).await;
    assert_eq!(body["collections"][0]["can_read"], true);
    assert_eq!(body["collections"][0]["can_write"], false);

    let (_, _, body) = send(&app, get_request("/writeonly/collections/")).await;
    assert_eq!(body["collections"][0]["can_read"], false);
    assert_eq!(body["collections"][0]["can_write"], true);
}

#[tokio::test]
async fn collection_resource_is_served() {
    let app = app(false).await;
    let uri = format!("/api1/collections/{COLLECTION_ID}/");
    let (status, _, body) = send(&app, get_request(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], COLLECTION_ID);
    assert_eq!(body["title"], "High Value Indicators");
    assert_eq!(body["media_types"][0], "application/stix+json;version=2.1");
}

#[tokio::test]
async fn objects_page_is_bounded_ordered_and_206() {
    let app = app(false).await;
    let objects: Vec<Value> = [OBJ_1, OBJ_2, OBJ_3, OBJ_4, OBJ_5]
        .iter()
        .map(|id| indicator(id, "2024-01-01T00:00:00.000Z"))
        .collect();
    let (status, _, _) = send(
        &app,
        post_request(&objects_uri("/api1/"), TAXII_MEDIA, envelope(objects)),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let uri = format!("{}?limit=2", objects_uri("/api1/"));
    let (status, headers, body) = send(&app, get_request(&uri)).await;

    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    let returned = body["objects"].as_array().unwrap();
    assert_eq!(returned.len(), 2);
    assert_eq!(returned[0]["id"], OBJ_1);
    assert_eq!(returned[1]["id"], OBJ_2);

    // Header window equals the date_added span of the returned page.
    let first = headers["x-taxii-date-added-first"].to_str().unwrap();
    let last = headers["x-taxii-date-added-last"].to_str().unwrap();
    assert!(first <= last);

    let manifest_uri = format!("/api1/collections/{COLLECTION_ID}/manifest/");
    let (status, _, manifest) = send(&app, get_request(&manifest_uri)).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(manifest["objects"][0]["date_added"], first);
    assert_eq!(manifest["objects"][1]["date_added"], last);
}

#[tokio::test]
async fn ingest_reports_partial_success() {
    let app = app(false).await;
    let body = envelope(vec![
        indicator(OBJ_1, "2024-01-01T00:00:00.000Z"),
        json!({"id": "bad"}),
    ]);
    let (status, _, status_body) = send(
        &app,
        post_request(&objects_uri("/api1/"), TAXII_MEDIA, body),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(status_body["status"], "completed");
    assert_eq!(status_body["total_count"], 2);
    assert_eq!(status_body["success_count"], 1);
    assert_eq!(status_body["failure_count"], 1);
    assert_eq!(status_body["successes"][0]["id"], OBJ_1);
    assert_eq!(status_body["successes"][0]["message"], "Object added");
    assert_eq!(status_body["failures"][0]["message"], "Object failed");
}

#[tokio::test]
async fn ingest_is_idempotent() {
    let app = app(false).await;
    let body = envelope(vec![indicator(OBJ_1, "2024-01-01T00:00:00.000Z")]);

    for _ in 0..2 {
        let (status, _, status_body) = send(
            &app,
            post_request(&objects_uri("/api1/"), TAXII_MEDIA, body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(status_body["success_count"], 1);
    }

    let (_, _, body) = send(&app, get_request(&objects_uri("/api1/"))).await;
    assert_eq!(body["objects"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn version_filter_defaults_to_last() {
    let app = app(false).await;
    let body = envelope(vec![
        indicator(OBJ_1, "2024-01-01T00:00:00.000Z"),
        indicator(OBJ_1, "2024-06-01T00:00:00.000Z"),
    ]);
    send(
        &app,
        post_request(&objects_uri("/api1/"), TAXII_MEDIA, body),
    )
    .await;

    let uri = format!("{}?match%5Bid%5D={OBJ_1}", objects_uri("/api1/"));
    let (status, _, body) = send(&app, get_request(&uri)).await;

    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    let objects = body["objects"].as_array().unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0]["modified"], "2024-06-01T00:00:00.000Z");

    let uri = format!(
        "{}?match%5Bid%5D={OBJ_1}&match%5Bversion%5D=all",
        objects_uri("/api1/")
    );
    let (_, _, body) = send(&app, get_request(&uri)).await;
    assert_eq!(body["objects"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn versions_endpoint_clears_version_filter_and_answers_200() {
    let app = app(false).await;
    let body = envelope(vec![
        indicator(OBJ_1, "2024-01-01T00:00:00.000Z"),
        indicator(OBJ_1, "2024-06-01T00:00:00.000Z"),
    ]);
    send(
        &app,
        post_request(&objects_uri("/api1/"), TAXII_MEDIA, body),
    )
    .await;

    let uri = format!(
        "{}{OBJ_1}/versions/?match%5Bversion%5D=2024-01-01T00%3A00%3A00Z",
        objects_uri("/api1/")
    );
    let (status, _, body) = send(&app, get_request(&uri)).await;

    // The filter is not allowed here: it is cleared and the full list
    // comes back, newest first.
    assert_eq!(status, StatusCode::OK);
    let versions = body["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0], "2024-06-01T00:00:00.000000Z");
    assert_eq!(versions[1], "2024-01-01T00:00:00.000000Z");
}

#[tokio::test]
async fn object_by_id_returns_200() {
    let app = app(false).await;
    send(
        &app,
        post_request(
            &objects_uri("/api1/"),
            TAXII_MEDIA,
            envelope(vec![indicator(OBJ_1, "2024-01-01T00:00:00.000Z")]),
        ),
    )
    .await;

    let uri = format!("{}{OBJ_1}/", objects_uri("/api1/"));
    let (status, headers, body) = send(&app, get_request(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("x-taxii-date-added-first"));
    assert_eq!(body["objects"][0]["id"], OBJ_1);
}

#[tokio::test]
async fn unacceptable_accept_is_406_with_empty_body() {
    let app = app(false).await;
    let uri = format!("/api1/collections/{COLLECTION_ID}/manifest/");
    let request = Request::builder()
        .uri(&uri)
        .header(header::ACCEPT, "text/plain")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn wrong_ingest_content_type_is_406_wrong_media_type() {
    let app = app(false).await;
    let (status, _, body) = send(
        &app,
        post_request(
            &objects_uri("/api1/"),
            "application/json",
            envelope(vec![indicator(OBJ_1, "2024-01-01T00:00:00.000Z")]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["title"], "Wrong Media Type");
}

#[tokio::test]
async fn broken_envelope_is_400() {
    let app = app(false).await;
    let (status, _, body) = send(
        &app,
        post_request(&objects_uri("/api1/"), TAXII_MEDIA, "no json".to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Parse Objects Error");
}

#[tokio::test]
async fn authentication_gates_every_content_endpoint() {
    let app = app(true).await;

    let (status, headers, body) = send(&app, get_request(&objects_uri("/api1/"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        headers[header::WWW_AUTHENTICATE],
        r#"Basic realm="Authentication Required""#
    );
    assert_eq!(body["title"], "Authentication Required");

    // Valid credentials pass.
    let token = BASE64.encode("taxii:password");
    let request = Request::builder()
        .method("POST")
        .uri(objects_uri("/api1/"))
        .header(header::ACCEPT, TAXII_MEDIA)
        .header(header::CONTENT_TYPE, TAXII_MEDIA)
        .header(header::AUTHORIZATION, format!("Basic {token}"))
        .body(Body::from(envelope(vec![indicator(
            OBJ_1,
            "2024-01-01T00:00:00.000Z",
        )])))
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // Wrong credentials fail.
    let token = BASE64.encode("taxii:wrong");
    let request = Request::builder()
        .uri(objects_uri("/api1/"))
        .header(header::ACCEPT, TAXII_MEDIA)
        .header(header::AUTHORIZATION, format!("Basic {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn permissions_are_isolated_per_api_root() {
    let app = app(false).await;
    let body = envelope(vec![indicator(OBJ_1, "2024-01-01T00:00:00.000Z")]);

    // POST under the read-only root: hidden.
    let (status, _, _) = send(
        &app,
        post_request(&objects_uri("/readonly/"), TAXII_MEDIA, body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // POST under the write-only root: accepted.
    let (status, _, _) = send(
        &app,
        post_request(&objects_uri("/writeonly/"), TAXII_MEDIA, body),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // GET under the write-only root: hidden.
    let (status, _, _) = send(&app, get_request(&objects_uri("/writeonly/"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The same collection reads fine under a readable root.
    let (status, _, body) = send(&app, get_request(&objects_uri("/readonly/"))).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body["objects"][0]["id"], OBJ_1);
}

#[tokio::test]
async fn unknown_collection_is_not_routed() {
    let app = app(false).await;
    let uri = "/api1/collections/00000000-0000-4000-8000-000000000000/objects/";
    let (status, _, _) = send(&app, get_request(uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_object_id_in_path_is_404() {
    let app = app(false).await;
    let uri = format!("{}not-a-stix-id/", objects_uri("/api1/"));
    let (status, _, body) = send(&app, get_request(&uri)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["title"], "Invalid Filter");
}

#[tokio::test]
async fn empty_collection_reads_as_404() {
    let app = app(false).await;
    let (status, _, body) = send(&app, get_request(&objects_uri("/api1/"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["title"], "Get Objects Error");
}

#[tokio::test]
async fn json_accept_falls_back_to_plain_json() {
    let app = app(false).await;
    send(
        &app,
        post_request(
            &objects_uri("/api1/"),
            TAXII_MEDIA,
            envelope(vec![indicator(OBJ_1, "2024-01-01T00:00:00.000Z")]),
        ),
    )
    .await;

    let request = Request::builder()
        .uri(objects_uri("/api1/"))
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/json; charset=utf-8"
    );
    assert_eq!(body["objects"][0]["id"], OBJ_1);
}

#[tokio::test]
async fn router_requires_at_least_one_service() {
    let mut config = test_config(false);
    config.discovery_server.enabled = false;
    config.api_root_server.enabled = false;

    let store = SqliteStore::in_memory().await.unwrap();
    assert!(build_router(&config, Arc::new(store)).is_err());
}
