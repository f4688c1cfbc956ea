/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// CORS 中间件构建
pub mod cors;

/// 功能聚合模块
pub mod features;

/// OpenAPI 文档
pub mod openapi;

/// request_id 中间件
pub mod request_id;

/// 应用状态聚合模块
pub mod state;

/// 优雅退出管理模块
pub mod shutdown;

/// HTTP Client 复用工具
pub mod http;

use axum::{Json, Router, routing::get};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

// 导出常用类型供外部使用
pub use config::AppConfig;
pub use error::AppError;
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::AppState;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

/// 组装完整路由与中间件。
///
/// 中间件由内到外：Trace → request_id → Allow-Methods/Allow-Headers 补齐 → CORS。
/// CORS 在最外层，OPTIONS 预检在这里直接返回 200。
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let mut app = Router::new()
        .merge(features::poster::create_poster_router())
        .route("/health", get(features::health::health_check))
        .route(openapi::OPENAPI_JSON_PATH, get(openapi_json))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware));

    if let Some((methods, headers)) = cors::build_allow_header_layers(&config.cors) {
        app = app.layer(methods).layer(headers);
    }
    if let Some(cors_layer) = cors::build_cors_layer(&config.cors) {
        app = app.layer(cors_layer);
    }
    app
}
