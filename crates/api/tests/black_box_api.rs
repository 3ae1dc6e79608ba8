use std::sync::Arc;

use pantry_api::app::{AppServices, build_app};
use pantry_infra::{StoreConfig, document_store::InMemoryDocumentStore};
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    store: Arc<InMemoryDocumentStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, over an in-memory store on an ephemeral port.
        let store = Arc::new(InMemoryDocumentStore::new());
        let services = AppServices::new(store.clone(), StoreConfig::default());
        let app = build_app(Arc::new(services));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn add(client: &reqwest::Client, srv: &TestServer, name: &str) -> reqwest::Response {
    client
        .post(srv.url("/inventory/items"))
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap()
}

async fn remove(client: &reqwest::Client, srv: &TestServer, name: &str) -> serde_json::Value {
    let res = client
        .post(srv.url("/inventory/items/remove"))
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

async fn list(client: &reqwest::Client, srv: &TestServer) -> serde_json::Value {
    let res = client.get(srv.url("/inventory/items")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn egg_lifecycle_over_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    assert_eq!(list(&client, &srv).await["items"], json!([]));

    assert_eq!(add(&client, &srv, "egg").await.status(), StatusCode::OK);
    let res = add(&client, &srv, "egg").await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "name": "Egg", "quantity": 2 }));

    let listing = list(&client, &srv).await;
    assert_eq!(listing, json!({ "items": [{ "name": "Egg", "quantity": 2 }], "stale": false }));

    let removed = remove(&client, &srv, "egg").await;
    assert_eq!(removed, json!({ "outcome": "decremented", "name": "Egg", "quantity": 1 }));
    assert_eq!(list(&client, &srv).await["items"], json!([{ "name": "Egg", "quantity": 1 }]));

    let removed = remove(&client, &srv, "egg").await;
    assert_eq!(removed, json!({ "outcome": "deleted", "name": "Egg" }));
    assert_eq!(list(&client, &srv).await["items"], json!([]));

    let removed = remove(&client, &srv, "egg").await;
    assert_eq!(removed, json!({ "outcome": "not_found", "name": "Egg" }));
    assert_eq!(list(&client, &srv).await["items"], json!([]));
}

#[tokio::test]
async fn search_is_exact_and_case_normalized() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    add(&client, &srv, "Banana").await;

    let res = client
        .get(srv.url("/inventory/search?name=banana"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "name": "Banana", "quantity": 1 }));

    let res = client
        .get(srv.url("/inventory/search?name=Bananas"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn validation_errors_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = add(&client, &srv, "   ").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_name");

    let res = client
        .post(srv.url("/inventory/items/remove"))
        .json(&json!({ "name": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    for path in ["/inventory/search?name=", "/inventory/search"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "empty_search_term");
    }

    assert_eq!(list(&client, &srv).await["items"], json!([]));
}

#[tokio::test]
async fn bad_request_bodies_get_json_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let no_body = client.post(srv.url("/inventory/items")).send().await.unwrap();
    let malformed = client
        .post(srv.url("/inventory/items/remove"))
        .header("content-type", "application/json")
        .body("{\"name\":")
        .send()
        .await
        .unwrap();
    let wrong_shape = client
        .post(srv.url("/inventory/items"))
        .json(&json!({ "title": "eggs" }))
        .send()
        .await
        .unwrap();

    for res in [no_body, malformed, wrong_shape] {
        assert!(res.status().is_client_error(), "{}", res.status());
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "invalid_body");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    assert_eq!(list(&client, &srv).await["items"], json!([]));
}

#[tokio::test]
async fn outage_degrades_to_last_known_listing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    add(&client, &srv, "rice").await;
    list(&client, &srv).await;

    srv.store.set_available(false);

    let listing = list(&client, &srv).await;
    assert_eq!(listing, json!({ "items": [{ "name": "Rice", "quantity": 1 }], "stale": true }));

    let res = add(&client, &srv, "rice").await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "store_unavailable");

    srv.store.set_available(true);
    let listing = list(&client, &srv).await;
    assert_eq!(listing["stale"], false);
    assert_eq!(listing["items"], json!([{ "name": "Rice", "quantity": 1 }]));
}

#[tokio::test]
async fn outage_before_any_listing_is_unavailable() {
    let srv = TestServer::spawn().await;
    srv.store.set_available(false);

    let res = reqwest::get(srv.url("/inventory/items")).await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}
