use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::features::health::handler::HealthResponse;
use crate::features::poster::{
    Backend, Delivery, GenerateRequest, GenerateResponse, Layout, StatusResponse,
};

/// 文档路径（不提供 Swagger UI，只输出 JSON）
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::poster::handler::status,
        crate::features::poster::handler::generate,
        crate::features::poster::handler::generate_alias,
    ),
    components(schemas(
        GenerateRequest,
        GenerateResponse,
        StatusResponse,
        Layout,
        Backend,
        Delivery,
        ErrorBody,
        HealthResponse,
    )),
    tags(
        (
            name = "Poster",
            description = "海报生成：把 1~3 行文字渲染为 1080x1080 的卡片或大字报（PNG/SVG），以 base64 或图床 URL 返回。"
        ),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Poster Backend API",
        version = env!("CARGO_PKG_VERSION"),
        description = "文字海报生成服务（Axum + utoipa）。所有响应都带 CORS 头，OPTIONS 预检直接返回 200。"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_generate_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/"));
        assert!(doc.paths.paths.contains_key("/api/generate"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
