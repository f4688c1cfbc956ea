use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::state::AppState;

/// 探活响应
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "poster-backend")]
    pub service: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// 正在渲染的请求数
    #[schema(example = 0)]
    pub renders_in_flight: u32,
    /// 渲染并发上限
    #[schema(example = 4)]
    pub render_capacity: u32,
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "探活端点，附带当前渲染负载。",
    responses((status = 200, description = "服务健康", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (in_flight, capacity) = state.service.render_load();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        renders_in_flight: in_flight,
        render_capacity: capacity,
    })
}
