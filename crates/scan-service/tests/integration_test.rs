//! Integration tests for the scan service router

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use ndarray::Array4;
use scan_common::Label;
use scan_inference::{InferenceError, ModelLoader, ScoreModel, SharedModel};
use scan_service::{create_router, AppState, MediaStore, MemoryStore, Store};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

const BOUNDARY: &str = "scan-test-boundary";
const PASSWORD: &str = "s3cure-password";

/// Model returning a fixed score and counting forward passes
struct FixedScore {
    score: f32,
    calls: Arc<AtomicUsize>,
}

impl ScoreModel for FixedScore {
    fn score(&self, _input: &Array4<f32>) -> Result<f32, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.score)
    }
}

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    media: MediaStore,
    inferences: Arc<AtomicUsize>,
    _dir: tempfile::TempDir,
}

/// App with in-memory storage. With `score = None` no model file exists.
fn create_test_app(score: Option<f32>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("models").join("brain_tumor_model.onnx");
    let media = MediaStore::new(dir.path().join("media"));
    let inferences = Arc::new(AtomicUsize::new(0));

    if score.is_some() {
        std::fs::create_dir_all(model_path.parent().unwrap()).unwrap();
        std::fs::write(&model_path, b"weights").unwrap();
    }

    let calls = inferences.clone();
    let loader = ModelLoader::with_loader(model_path, move |_| {
        Ok(Arc::new(FixedScore {
            score: score.unwrap_or(0.0),
            calls: calls.clone(),
        }) as SharedModel)
    });

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), loader, media.clone());

    TestApp {
        app: create_router(state),
        store,
        media,
        inferences,
        _dir: dir,
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
}

/// `name=value` part of the session `Set-Cookie` header
fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing Set-Cookie header")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn signup(app: &Router, username: &str) -> String {
    let body = format!(
        "username={}&password1={}&password2={}",
        username, PASSWORD, PASSWORD
    );
    let response = send(app, form_request("/signup", &body)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    session_cookie(&response)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 200])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn multipart_request(cookie: &str, field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let t = create_test_app(None);

    let response = send(&t.app, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "scan-service");
}

#[tokio::test]
async fn test_unauthenticated_requests_redirect_to_login() {
    let t = create_test_app(Some(0.8));

    let response = send(&t.app, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = send(
        &t.app,
        multipart_request("", "mri_image", "scan.png", &png_bytes(150, 150)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = send(&t.app, get("/records/1", Some("scan_session=00"))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    assert_eq!(t.store.record_count().await, 0);
    assert_eq!(t.inferences.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_tumor_detected() {
    let t = create_test_app(Some(0.8));
    let cookie = signup(&t.app, "alice").await;

    let response = send(
        &t.app,
        multipart_request(&cookie, "mri_image", "scan.png", &png_bytes(150, 150)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["prediction"], "Tumor Detected");
    assert_eq!(json["probability"], "80.00%");
    let image_url = json["image_url"].as_str().unwrap();
    assert!(image_url.starts_with("/media/mri_scans/"));
    assert!(image_url.ends_with(".png"));

    let id = json["record"]["id"].as_u64().unwrap();
    let record = t.store.get_record(id).await.unwrap().unwrap();
    assert_eq!(record.prediction, Some(Label::TumorDetected));
    assert!((record.probability.unwrap() - 0.8).abs() < 1e-6);
    assert!(t.media.path_of(&record.image).exists());
    assert_eq!(t.inferences.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_upload_no_tumor() {
    let t = create_test_app(Some(0.2));
    let cookie = signup(&t.app, "bob").await;

    let response = send(
        &t.app,
        multipart_request(&cookie, "mri_image", "scan.png", &png_bytes(150, 150)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["prediction"], "No Tumor");
    assert_eq!(json["probability"], "80.00%");

    let id = json["record"]["id"].as_u64().unwrap();
    let record = t.store.get_record(id).await.unwrap().unwrap();
    assert_eq!(record.prediction, Some(Label::NoTumor));
    assert!((record.probability.unwrap() - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn test_upload_without_model() {
    let t = create_test_app(None);
    let cookie = signup(&t.app, "carol").await;

    let response = send(
        &t.app,
        multipart_request(&cookie, "mri_image", "scan.png", &png_bytes(64, 64)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["prediction"], "Model Not Found");
    assert_eq!(json["probability"], "0.00%");
    assert_eq!(t.inferences.load(Ordering::SeqCst), 0);

    // The record still exists, carrying the sentinel label
    let id = json["record"]["id"].as_u64().unwrap();
    let record = t.store.get_record(id).await.unwrap().unwrap();
    assert_eq!(record.prediction, Some(Label::ModelNotFound));
    assert_eq!(record.probability, Some(0.0));
}

#[tokio::test]
async fn test_upload_non_image() {
    let t = create_test_app(Some(0.9));
    let cookie = signup(&t.app, "dave").await;

    let response = send(
        &t.app,
        multipart_request(&cookie, "mri_image", "scan.png", b"this is a text file"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["prediction"], "Prediction Error");
    assert_eq!(json["probability"], "0.00%");
    assert_eq!(t.inferences.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_without_file_redirects_to_index() {
    let t = create_test_app(Some(0.9));
    let cookie = signup(&t.app, "erin").await;

    // Wrong field name
    let response = send(
        &t.app,
        multipart_request(&cookie, "other", "scan.png", &png_bytes(10, 10)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // Browser submitted the form with no file selected
    let response = send(&t.app, multipart_request(&cookie, "mri_image", "", b"")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // Not a multipart request at all
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = send(&t.app, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    assert_eq!(t.store.record_count().await, 0);
}

#[tokio::test]
async fn test_index_lists_five_newest_first() {
    let t = create_test_app(Some(0.7));
    let cookie = signup(&t.app, "frank").await;

    for _ in 0..7 {
        let response = send(
            &t.app,
            multipart_request(&cookie, "mri_image", "scan.png", &png_bytes(32, 32)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = send(&t.app, get("/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let images = json["images"].as_array().unwrap();
    assert_eq!(images.len(), 5);

    let ids: Vec<u64> = images.iter().map(|i| i["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![7, 6, 5, 4, 3]);
    assert_eq!(images[0]["prediction"], "Tumor Detected");
    assert_eq!(images[0]["probability_display"], "70.00%");
}

#[tokio::test]
async fn test_uploaded_image_is_served() {
    let t = create_test_app(Some(0.3));
    let cookie = signup(&t.app, "grace").await;
    let png = png_bytes(20, 20);

    let response = send(&t.app, multipart_request(&cookie, "mri_image", "scan.png", &png)).await;
    let json = json_body(response).await;
    let image_url = json["image_url"].as_str().unwrap().to_string();

    let response = send(&t.app, get(&image_url, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body.as_ref(), png.as_slice());
}

#[tokio::test]
async fn test_record_lookup() {
    let t = create_test_app(Some(0.6));
    let cookie = signup(&t.app, "heidi").await;

    send(
        &t.app,
        multipart_request(&cookie, "mri_image", "scan.png", &png_bytes(40, 40)),
    )
    .await;

    let response = send(&t.app, get("/records/1", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["record"]["id"], 1);
    assert_eq!(json["record"]["prediction"], "Tumor Detected");

    let response = send(&t.app, get("/records/99", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signup_validation() {
    let t = create_test_app(None);

    let response = send(
        &t.app,
        form_request(
            "/signup",
            "username=ivan&password1=longpassword&password2=otherpassword",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("didn't match"));

    signup(&t.app, "ivan").await;

    let body = format!("username=ivan&password1={PASSWORD}&password2={PASSWORD}");
    let response = send(&t.app, form_request("/signup", &body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_login_and_logout() {
    let t = create_test_app(None);
    signup(&t.app, "judy").await;

    let response = send(
        &t.app,
        form_request("/login", "username=judy&password=wrong-password"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &t.app,
        form_request("/login", "username=nobody&password=whatever1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = format!("username=judy&password={PASSWORD}");
    let response = send(&t.app, form_request("/login", &body)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);

    let response = send(&t.app, get("/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let logout = Request::builder()
        .method("POST")
        .uri("/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = send(&t.app, logout).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(session_cookie(&response), "scan_session=");

    let response = send(&t.app, get("/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_login_page_is_served() {
    let t = create_test_app(None);

    let response = send(&t.app, get("/login", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&body).contains("action=\"/login\""));
}
