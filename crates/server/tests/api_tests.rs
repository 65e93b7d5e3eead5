use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use bytes::Bytes;
use chrono::DateTime;
use tower::ServiceExt;

use ospry_client::{Error, ImageFormat, Metadata, RenderOpts, UrlFormatter};
use ospry_demo::api::AppState;
use ospry_demo::host::ImageHost;
use ospry_demo::store::{MemoryMetadataStore, MetadataStore, StoreError};

// -- Mock host ------------------------------------------------------------

struct MockHost {
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    fail_filename: Option<String>,
    fail_visibility: bool,
    formatter: UrlFormatter,
}

impl MockHost {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            fail_filename: None,
            fail_visibility: false,
            formatter: UrlFormatter::new("sk-test"),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn server_error() -> Error {
    Error::Api {
        status: 500,
        cause: "internal".into(),
        message: "host unavailable".into(),
    }
}

#[async_trait]
impl ImageHost for MockHost {
    async fn upload_private(&self, filename: &str, data: Bytes) -> Result<Metadata, Error> {
        self.record(format!("upload {filename} {}", data.len()));
        if self.fail_filename.as_deref() == Some(filename) {
            return Err(server_error());
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(metadata(&format!("img-{n}")))
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        self.record(format!("delete {id}"));
        Ok(())
    }

    async fn set_private(&self, id: &str, is_private: bool) -> Result<Metadata, Error> {
        self.record(format!("set_private {id} {is_private}"));
        if self.fail_visibility {
            return Err(server_error());
        }
        let mut m = metadata(id);
        m.is_private = is_private;
        Ok(m)
    }

    async fn claim(&self, id: &str) -> Result<Metadata, Error> {
        self.record(format!("claim {id}"));
        let mut m = metadata(id);
        m.is_claimed = true;
        Ok(m)
    }

    fn format_url(&self, url: &str, opts: &RenderOpts) -> Result<String, Error> {
        Ok(self.formatter.format_url(url, opts)?)
    }
}

// -- Failing store --------------------------------------------------------

struct UnavailableStore;

#[async_trait]
impl MetadataStore for UnavailableStore {
    async fn insert(&self, _metadata: Metadata) -> Result<(), StoreError> {
        Err(StoreError::Backend("store offline".into()))
    }

    async fn delete(&self, _id: &str) -> Result<bool, StoreError> {
        Err(StoreError::Backend("store offline".into()))
    }

    async fn list(&self) -> Result<Vec<Metadata>, StoreError> {
        Err(StoreError::Backend("store offline".into()))
    }
}

// -- Helpers --------------------------------------------------------------

fn metadata(id: &str) -> Metadata {
    Metadata {
        id: id.to_owned(),
        url: format!("http://foo.ospry.io/{id}.png"),
        https_url: format!("https://foo.ospry.io/{id}.png"),
        time_created: DateTime::from_timestamp(1_433_154_030, 0).unwrap(),
        is_claimed: false,
        is_private: true,
        filename: format!("{id}.png"),
        format: ImageFormat::Png,
        size: 4,
        height: 1,
        width: 1,
    }
}

fn build_app(host: Arc<MockHost>, store: Arc<MemoryMetadataStore>) -> axum::Router {
    let state = AppState::new(host, store, "pk-test", chrono::Duration::minutes(1))
        .expect("templates should compile");
    ospry_demo::api::router(state)
}

async fn body_string(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn stored_ids(store: &MemoryMetadataStore) -> Vec<String> {
    store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect()
}

const BOUNDARY: &str = "XBOUNDARYX";

fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(f) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            )),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

fn multipart_request(body: String) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .uri("/images")
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(Body::from(body.to_owned()))
        .unwrap()
}

// -- Tests ----------------------------------------------------------------

#[tokio::test]
async fn health_returns_200() {
    let app = build_app(
        Arc::new(MockHost::new()),
        Arc::new(MemoryMetadataStore::new()),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn root_redirects_permanently() {
    let app = build_app(
        Arc::new(MockHost::new()),
        Arc::new(MemoryMetadataStore::new()),
    );

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[http::header::LOCATION], "/images");
}

#[tokio::test]
async fn index_renders_empty_lists() {
    let app = build_app(
        Arc::new(MockHost::new()),
        Arc::new(MemoryMetadataStore::new()),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/images")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("var publicUrls = [];"), "{html}");
    assert!(html.contains("var privateUrls = [];"));
    assert!(html.contains("pk-test"));
}

#[tokio::test]
async fn index_lists_public_and_signed_urls() {
    let store = Arc::new(MemoryMetadataStore::new());
    store.insert(metadata("abc")).await.unwrap();
    let app = build_app(Arc::new(MockHost::new()), Arc::clone(&store));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/images")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("foo.ospry.io/abc.png"));
    assert!(html.contains("api.ospry.io"));
    assert!(html.contains("signature="));
}

#[tokio::test]
async fn upload_stores_each_file_part() {
    let host = Arc::new(MockHost::new());
    let store = Arc::new(MemoryMetadataStore::new());
    let app = build_app(Arc::clone(&host), Arc::clone(&store));

    let body = multipart_body(&[
        ("file", Some("cat.png"), "meow"),
        ("note", None, "ignored"),
        ("file", Some("dog.gif"), "woof!"),
    ]);
    let response = app.oneshot(multipart_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[http::header::LOCATION], "/images");
    assert_eq!(host.calls(), ["upload cat.png 4", "upload dog.gif 5"]);
    assert_eq!(stored_ids(&store).await, ["img-1", "img-2"]);
}

#[tokio::test]
async fn failed_upload_is_skipped() {
    let host = Arc::new(MockHost {
        fail_filename: Some("bad.png".into()),
        ..MockHost::new()
    });
    let store = Arc::new(MemoryMetadataStore::new());
    let app = build_app(Arc::clone(&host), Arc::clone(&store));

    let body = multipart_body(&[
        ("file", Some("bad.png"), "xx"),
        ("file", Some("good.png"), "yy"),
    ]);
    let response = app.oneshot(multipart_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(host.calls().len(), 2);
    assert_eq!(stored_ids(&store).await, ["img-1"]);
}

#[tokio::test]
async fn post_without_multipart_is_bad_request() {
    let app = build_app(
        Arc::new(MockHost::new()),
        Arc::new(MemoryMetadataStore::new()),
    );

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/images")
                .header(http::header::CONTENT_TYPE, "text/plain")
                .body(Body::from("hello"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn form_delete_removes_everything() {
    let host = Arc::new(MockHost::new());
    let store = Arc::new(MemoryMetadataStore::new());
    store.insert(metadata("a")).await.unwrap();
    store.insert(metadata("b")).await.unwrap();
    let app = build_app(Arc::clone(&host), Arc::clone(&store));

    let response = app
        .oneshot(form_request("/images", "method=DELETE"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(host.calls(), ["delete a", "delete b"]);
    assert!(stored_ids(&store).await.is_empty());
}

#[tokio::test]
async fn form_without_delete_method_is_bad_request() {
    let host = Arc::new(MockHost::new());
    let store = Arc::new(MemoryMetadataStore::new());
    store.insert(metadata("a")).await.unwrap();
    let app = build_app(Arc::clone(&host), Arc::clone(&store));

    let response = app
        .oneshot(form_request("/images", "method=PUT"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(host.calls().is_empty());
    assert_eq!(stored_ids(&store).await, ["a"]);
}

#[tokio::test]
async fn make_private_applies_to_all() {
    let host = Arc::new(MockHost::new());
    let store = Arc::new(MemoryMetadataStore::new());
    store.insert(metadata("a")).await.unwrap();
    store.insert(metadata("b")).await.unwrap();
    let app = build_app(Arc::clone(&host), store);

    let response = app
        .oneshot(form_request("/make-private", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(host.calls(), ["set_private a true", "set_private b true"]);
}

#[tokio::test]
async fn make_public_stops_at_first_failure() {
    let host = Arc::new(MockHost {
        fail_visibility: true,
        ..MockHost::new()
    });
    let store = Arc::new(MemoryMetadataStore::new());
    store.insert(metadata("a")).await.unwrap();
    store.insert(metadata("b")).await.unwrap();
    let app = build_app(Arc::clone(&host), store);

    let response = app
        .oneshot(form_request("/make-public", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(host.calls(), ["set_private a false"]);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(json["error"].as_str().unwrap().contains("host unavailable"));
}

#[tokio::test]
async fn claim_returns_signed_url() {
    let host = Arc::new(MockHost::new());
    let store = Arc::new(MemoryMetadataStore::new());
    let app = build_app(Arc::clone(&host), Arc::clone(&store));

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/claim")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"id":"xyz"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    let url = json["privateUrl"].as_str().unwrap();
    assert!(url.starts_with("https://api.ospry.io/?signature="), "{url}");
    assert!(url.contains("xyz.png"));
    assert_eq!(host.calls(), ["claim xyz"]);
    assert_eq!(stored_ids(&store).await, ["xyz"]);
}

#[tokio::test]
async fn claim_rejects_invalid_json() {
    let host = Arc::new(MockHost::new());
    let app = build_app(Arc::clone(&host), Arc::new(MemoryMetadataStore::new()));

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/claim")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn store_failure_is_server_error() {
    let host = Arc::new(MockHost::new());
    let state = AppState::new(
        Arc::clone(&host) as Arc<dyn ImageHost>,
        Arc::new(UnavailableStore),
        "pk-test",
        chrono::Duration::minutes(1),
    )
    .expect("templates should compile");
    let app = ospry_demo::api::router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/images")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(json["error"].as_str().unwrap().contains("store offline"));
}
