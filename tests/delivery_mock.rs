//! 图床上传与远程素材目录：用本地 axum 服务模拟外部接口

use axum::{
    Json, Router,
    body::{Body, Bytes, to_bytes},
    extract::Query,
    http::{Request, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as base64_engine};
use resvg::usvg::fontdb;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

use poster_backend::features::poster::PosterService;
use poster_backend::features::poster::fonts::FontLibrary;
use poster_backend::features::poster::palette::FixedRandom;
use poster_backend::{AppConfig, AppState, build_router};

const API_KEY: &str = "test-key";

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

async fn fake_upload(Query(q): Query<HashMap<String, String>>, body: Bytes) -> impl IntoResponse {
    if q.get("key").map(String::as_str) != Some(API_KEY) {
        return (StatusCode::FORBIDDEN, Json(json!({"success": false})));
    }
    let text = String::from_utf8_lossy(&body);
    if !text.contains("name=\"image\"") {
        return (StatusCode::BAD_REQUEST, Json(json!({"success": false})));
    }
    (
        StatusCode::OK,
        Json(json!({"success": true, "data": {"url": "https://img.example/abc.png"}})),
    )
}

async fn refusing_upload() -> Json<Value> {
    Json(json!({"success": false, "error": {"message": "quota"}}))
}

fn red_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([255, 0, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

fn app(config: AppConfig) -> Router {
    let service = PosterService::new(&config, FontLibrary::from_database(fontdb::Database::new()))
        .with_random(Arc::new(FixedRandom(0)));
    build_router(AppState::new(service), &config)
}

async fn generate(app: Router, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    let resp = app.oneshot(req).await.expect("call app");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

fn corner_pixel(v: &Value) -> [u8; 4] {
    let png = base64_engine
        .decode(v["image_base64"].as_str().expect("image_base64"))
        .expect("base64");
    let img = image::load_from_memory(&png).expect("png").to_rgba8();
    img.get_pixel(5, 5).0
}

#[tokio::test]
async fn url_delivery_returns_uploaded_link() {
    let addr = spawn(Router::new().route("/upload", post(fake_upload))).await;
    let mut config = AppConfig::default();
    config.upload.endpoint = format!("http://{addr}/upload");
    config.upload.api_key = Some(API_KEY.to_string());

    let (status, v) = generate(app(config), json!({"text": "A\nB", "delivery": "url"})).await;
    assert_eq!(status, StatusCode::OK, "body={v}");
    assert_eq!(v["success"], true);
    assert_eq!(v["image_url"], "https://img.example/abc.png");
    assert!(v.get("image_base64").is_none());
}

#[tokio::test]
async fn upload_rejection_is_500_envelope() {
    let addr = spawn(Router::new().route("/upload", post(refusing_upload))).await;
    let mut config = AppConfig::default();
    config.upload.endpoint = format!("http://{addr}/upload");
    config.upload.api_key = Some(API_KEY.to_string());

    let (status, v) = generate(app(config), json!({"text": "A\nB", "delivery": "url"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["success"], false);
    assert!(v["requestId"].is_string());
}

#[tokio::test]
async fn remote_template_listing_paints_background() {
    let png = red_png();
    let listing = json!([
        {"name": "README.md", "type": "file", "download_url": "/files/README.md"},
        {"name": "nested", "type": "dir", "download_url": null},
        {"name": "red.png", "type": "file", "download_url": "/files/red.png"},
    ]);
    let router = Router::new()
        .route("/listing", get(move || async move { Json(listing) }))
        .route(
            "/files/red.png",
            get(move || async move { ([(header::CONTENT_TYPE, "image/png")], png) }),
        );
    let addr = spawn(router).await;

    let mut config = AppConfig::default();
    config.assets.remote_templates_url = Some(format!("http://{addr}/listing"));

    let (status, v) = generate(
        app(config),
        json!({"text": "HELLO\nWORLD", "layout": "poster", "backend": "raster"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body={v}");
    assert_eq!(corner_pixel(&v), [255, 0, 0, 255]);
}

#[tokio::test]
async fn missing_remote_listing_falls_back_to_white() {
    let addr = spawn(Router::new()).await;
    let mut config = AppConfig::default();
    config.assets.remote_templates_url = Some(format!("http://{addr}/listing"));

    let (status, v) = generate(
        app(config),
        json!({"text": "HELLO\nWORLD", "layout": "poster", "backend": "raster"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body={v}");
    assert_eq!(corner_pixel(&v), [255, 255, 255, 255]);
}
