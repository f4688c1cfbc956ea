use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    routing::get,
};
use tower::ServiceExt;

use poster_backend::config::CorsConfig;
use poster_backend::cors::{build_allow_header_layers, build_cors_layer};

fn app_with(cors: &CorsConfig) -> Router {
    let mut app = Router::new().route("/", get(|| async { "ok" }).post(|| async { "posted" }));
    if let Some((methods, headers)) = build_allow_header_layers(cors) {
        app = app.layer(methods).layer(headers);
    }
    app.layer(build_cors_layer(cors).expect("cors layer"))
}

fn header_str<'a>(resp: &'a axum::response::Response, name: header::HeaderName) -> &'a str {
    resp.headers()
        .get(&name)
        .unwrap_or_else(|| panic!("missing {name}"))
        .to_str()
        .expect("invalid header value")
}

#[tokio::test]
async fn cors_layer_adds_allow_origin_header() {
    let cors = CorsConfig {
        enabled: true,
        allowed_origins: vec!["https://example.com".to_string()],
        allowed_methods: vec!["GET".to_string()],
        allowed_headers: vec!["Content-Type".to_string()],
        ..CorsConfig::default()
    };

    let req = Request::builder()
        .method("GET")
        .uri("/")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .expect("build request");
    let resp = app_with(&cors).oneshot(req).await.expect("call app");

    assert_eq!(
        header_str(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        "https://example.com"
    );
}

#[tokio::test]
async fn preflight_answers_200_with_empty_body() {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .header(header::ORIGIN, "https://somewhere.test")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::from(r#"{"text":"ignored"}"#))
        .expect("build request");
    let resp = app_with(&CorsConfig::default())
        .oneshot(req)
        .await
        .expect("call app");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    assert!(header_str(&resp, header::ACCESS_CONTROL_ALLOW_METHODS).contains("POST"));
    assert!(
        header_str(&resp, header::ACCESS_CONTROL_ALLOW_HEADERS)
            .to_ascii_lowercase()
            .contains("content-type")
    );
    let body = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    assert!(body.is_empty());
}

#[tokio::test]
async fn plain_responses_carry_all_three_headers() {
    let req = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::empty())
        .expect("build request");
    let resp = app_with(&CorsConfig::default())
        .oneshot(req)
        .await
        .expect("call app");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    assert_eq!(
        header_str(&resp, header::ACCESS_CONTROL_ALLOW_METHODS),
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        header_str(&resp, header::ACCESS_CONTROL_ALLOW_HEADERS),
        "X-Requested-With, Content-Type"
    );
}

#[tokio::test]
async fn allow_headers_can_be_limited_to_preflight() {
    let cors = CorsConfig {
        always_send_allow_headers: false,
        ..CorsConfig::default()
    };
    let req = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .expect("build request");
    let resp = app_with(&cors).oneshot(req).await.expect("call app");

    assert!(resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(!resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}
