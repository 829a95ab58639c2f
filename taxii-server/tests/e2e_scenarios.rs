//! End-to-end HTTP scenarios from the protocol's testable-properties section:
//! discovery, add-and-read-back, pagination stability, paging-session
//! invalidation, version semantics, and TLP marking matches.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use taxii_core::entities::{ApiRoot, ApiRootInfo, Collection, Discovery};
use taxii_core::ServerConfig;
use taxii_memory::MemoryBackend;
use taxii_server::state::AppState;

const TRUSTGROUP: &str = "trustgroup1";
const COLLECTION_ID: &str = "91a7b528-80eb-42ed-a74d-c6fbd5a26116";

fn test_config() -> ServerConfig {
    serde_json::from_value(json!({
        "title": "Test TAXII Server",
        "default_pagination_limit": 100,
        "max_pagination_limit": 1000,
        "run_cleanup_threads": false,
    }))
    .expect("well-formed test config")
}

fn fixture_app() -> Router {
    let mut collections = BTreeMap::new();
    collections.insert(
        COLLECTION_ID.to_string(),
        Collection {
            id: COLLECTION_ID.to_string(),
            title: "High Value Indicator Collection".to_string(),
            description: None,
            can_read: true,
            can_write: true,
            media_types: vec!["application/stix+json;version=2.1".to_string()],
            objects: Vec::new(),
        },
    );

    let mut api_roots = BTreeMap::new();
    api_roots.insert(
        TRUSTGROUP.to_string(),
        ApiRoot {
            name: TRUSTGROUP.to_string(),
            information: ApiRootInfo {
                title: "Trust Group 1".to_string(),
                description: None,
                versions: vec!["application/taxii+json;version=2.1".to_string()],
                max_content_length: 104_857_600,
            },
            collections,
            statuses: BTreeMap::new(),
        },
    );

    let discovery = Discovery {
        title: "Test Discovery".to_string(),
        description: None,
        contact: None,
        default: Some(TRUSTGROUP.to_string()),
        api_roots: vec![TRUSTGROUP.to_string()],
    };

    let backend = Arc::new(MemoryBackend::new(Some(discovery), api_roots));
    let config = Arc::new(test_config());
    taxii_server::build_router(AppState { backend, config })
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.expect("collect body").to_bytes();
    serde_json::from_slice(&bytes).expect("valid JSON body")
}

async fn get(app: &Router, uri: &str) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("valid request"))
        .await
        .expect("request dispatches")
}

async fn get_with_header(app: &Router, uri: &str, name: &str, value: &str) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(name, value)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("request dispatches")
}

async fn post_bundle(app: &Router, uri: &str, bundle: &Value) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/vnd.oasis.stix+json;version=2.1")
                .body(Body::from(bundle.to_string()))
                .expect("valid request"),
        )
        .await
        .expect("request dispatches")
}

fn indicator(id: &str, modified: &str) -> Value {
    json!({
        "id": id,
        "type": "indicator",
        "spec_version": "2.1",
        "created": modified,
        "modified": modified,
        "pattern": "[file:hashes.MD5 = 'abc']",
        "pattern_type": "stix",
        "valid_from": modified,
    })
}

/// Scenario 1: discovery lists the configured API root.
#[tokio::test]
async fn discovery_lists_api_root() {
    let app = fixture_app();
    let response = get(&app, "/taxii/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let api_roots = body["api_roots"].as_array().expect("api_roots array");
    assert!(api_roots.iter().any(|r| r.as_str() == Some(&format!("/{TRUSTGROUP}/"))));
}

/// Scenario 2: POSTing a bundle succeeds and the object is readable back by id.
#[tokio::test]
async fn add_and_read_back() {
    let app = fixture_app();
    let bundle = json!({
        "type": "bundle",
        "id": "bundle--11111111-1111-4111-8111-111111111111",
        "objects": [indicator("indicator--cd981c25-8042-4166-8945-51178443bdac", "2016-11-03T12:30:59.000Z")],
    });

    let uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/");
    let response = post_bundle(&app, &uri, &bundle).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let status = body_json(response).await;
    assert_eq!(status["success_count"], 1);

    let get_uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?match[id]=indicator--cd981c25-8042-4166-8945-51178443bdac");
    let response = get(&app, &get_uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    let objects = envelope["objects"].as_array().expect("objects array");
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0]["id"], "indicator--cd981c25-8042-4166-8945-51178443bdac");
}

async fn seed_five_objects(app: &Router) {
    let objects: Vec<Value> = (0..5)
        .map(|i| indicator(&format!("indicator--0000000{i}-0000-4000-8000-00000000000{i}"), "2020-01-01T00:00:00.000Z"))
        .collect();
    let bundle = json!({"type": "bundle", "id": "bundle--22222222-2222-4222-8222-222222222222", "objects": objects});
    let uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/");
    let response = post_bundle(app, &uri, &bundle).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["success_count"], 5);
}

/// Scenario 3: pagination stability across successive `next` calls.
#[tokio::test]
async fn pagination_stability() {
    let app = fixture_app();
    seed_five_objects(&app).await;

    let first_uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?match[version]=all&limit=2");
    let page1 = get(&app, &first_uri).await;
    assert_eq!(page1.status(), StatusCode::OK);
    let page1 = body_json(page1).await;
    assert_eq!(page1["objects"].as_array().expect("objects").len(), 2);
    assert_eq!(page1["more"], true);
    let next_key = page1["next"].as_str().expect("next key present").to_string();

    let second_uri =
        format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?match[version]=all&limit=2&next={next_key}");
    let page2 = get(&app, &second_uri).await;
    let page2 = body_json(page2).await;
    assert_eq!(page2["objects"].as_array().expect("objects").len(), 2);
    assert_eq!(page2["more"], true);
    let next_key2 = page2["next"].as_str().expect("next key present").to_string();

    let third_uri =
        format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?match[version]=all&limit=2&next={next_key2}");
    let page3 = get(&app, &third_uri).await;
    let page3 = body_json(page3).await;
    assert_eq!(page3["objects"].as_array().expect("objects").len(), 1);
    assert_eq!(page3["more"], false);
    assert!(page3["next"].is_null());
}

/// Scenario 4: reusing a paging key with different filter params is rejected.
#[tokio::test]
async fn session_invalidated_on_param_drift() {
    let app = fixture_app();
    seed_five_objects(&app).await;

    let first_uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?match[version]=all&limit=2");
    let page1 = get(&app, &first_uri).await;
    let page1 = body_json(page1).await;
    let next_key = page1["next"].as_str().expect("next key present").to_string();

    let drifted_uri =
        format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?match[version]=first&limit=2&next={next_key}");
    let response = get(&app, &drifted_uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["title"], "ProcessingError");
}

/// Scenario 5: `first`/`last`/`all`/exact-timestamp version semantics.
#[tokio::test]
async fn version_semantics() {
    let app = fixture_app();
    let id = "indicator--33333333-3333-4333-8333-333333333333";
    let bundle = json!({
        "type": "bundle",
        "id": "bundle--44444444-4444-4444-8444-444444444444",
        "objects": [
            indicator(id, "2016-11-03T00:00:00.000Z"),
            indicator(id, "2016-12-25T12:30:59.444Z"),
            indicator(id, "2017-01-27T00:00:00.000Z"),
        ],
    });
    let uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/");
    let response = post_bundle(&app, &uri, &bundle).await;
    assert_eq!(body_json(response).await["success_count"], 3);

    async fn versions_for(app: &Router, version_param: &str) -> Vec<String> {
        let uri = format!(
            "/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?match[id]=indicator--33333333-3333-4333-8333-333333333333&match[version]={version_param}"
        );
        let response = get(app, &uri).await;
        let body = body_json(response).await;
        body["objects"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .iter()
            .map(|o| o["modified"].as_str().expect("modified").to_string())
            .collect()
    }

    assert_eq!(versions_for(&app, "first").await, vec!["2016-11-03T00:00:00.000Z"]);
    assert_eq!(versions_for(&app, "last").await, vec!["2017-01-27T00:00:00.000Z"]);
    assert_eq!(versions_for(&app, "all").await.len(), 3);
    assert_eq!(
        versions_for(&app, "2016-12-25T12:30:59.444Z").await,
        vec!["2016-12-25T12:30:59.444Z"]
    );
}

/// Scenario 6: TLP marking matches only the matching short name.
#[tokio::test]
async fn tlp_marking_matches_only_its_short_name() {
    let app = fixture_app();
    let mut red_indicator = indicator("indicator--55555555-5555-4555-8555-555555555555", "2018-01-01T00:00:00.000Z");
    red_indicator["object_marking_refs"] = json!(["marking-definition--5e57c739-391a-4eb3-b6be-7d15ca92d5ed"]);

    let bundle = json!({"type": "bundle", "id": "bundle--66666666-6666-4666-8666-666666666666", "objects": [red_indicator]});
    let uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/");
    let response = post_bundle(&app, &uri, &bundle).await;
    assert_eq!(body_json(response).await["success_count"], 1);

    let red_uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?match[tlp]=red");
    let red_page = body_json(get(&app, &red_uri).await).await;
    assert_eq!(red_page["objects"].as_array().expect("objects").len(), 1);

    for short_name in ["white", "green", "amber"] {
        let other_uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?match[tlp]={short_name}");
        let other_page = body_json(get(&app, &other_uri).await).await;
        assert!(other_page["objects"].is_null());
    }
}

/// Boundary: `limit=0` yields an empty page with `more=false` and no
/// date-added headers.
#[tokio::test]
async fn limit_zero_yields_empty_page_with_no_headers() {
    let app = fixture_app();
    seed_five_objects(&app).await;

    let uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/?limit=0");
    let response = get(&app, &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-TAXII-Date-Added-First").is_none());
    assert!(response.headers().get("X-TAXII-Date-Added-Last").is_none());

    let body = body_json(response).await;
    assert!(body["objects"].is_null());
    assert_eq!(body["more"], false);
}

/// Boundary: deleting a non-existent object 404s, and deleting then
/// requesting versions 404s too.
#[tokio::test]
async fn delete_then_versions_404s() {
    let app = fixture_app();
    let id = "indicator--77777777-7777-4777-8777-777777777777";
    let bundle = json!({"type": "bundle", "id": "bundle--88888888-8888-4888-8888-888888888888", "objects": [indicator(id, "2019-01-01T00:00:00.000Z")]});
    let uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/");
    post_bundle(&app, &uri, &bundle).await;

    let delete_uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/{id}/");
    let response = app
        .clone()
        .oneshot(Request::builder().method("DELETE").uri(&delete_uri).body(Body::empty()).expect("valid request"))
        .await
        .expect("dispatches");
    assert_eq!(response.status(), StatusCode::OK);

    let missing_delete = app
        .clone()
        .oneshot(Request::builder().method("DELETE").uri(&delete_uri).body(Body::empty()).expect("valid request"))
        .await
        .expect("dispatches");
    assert_eq!(missing_delete.status(), StatusCode::NOT_FOUND);

    let versions_uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/{id}/versions/");
    let response = get(&app, &versions_uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// A `Range` header whose start equals `total_count` is unsatisfiable.
#[tokio::test]
async fn range_start_at_total_count_is_416() {
    let app = fixture_app();
    seed_five_objects(&app).await;

    let uri = format!("/{TRUSTGROUP}/collections/{COLLECTION_ID}/objects/");
    let response = get_with_header(&app, &uri, "range", "items 5-9").await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    let content_range = response.headers().get(header::CONTENT_RANGE).expect("content-range present");
    assert_eq!(content_range.to_str().expect("ascii"), "items */5");
}
