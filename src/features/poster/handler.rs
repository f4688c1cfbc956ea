use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};

use crate::{error::AppError, state::AppState};

use super::types::{GenerateRequest, GenerateResponse, StatusResponse};

/// 请求体按原始字节解析，不要求 `Content-Type: application/json`。
///
/// 空请求体视为 `{}`，从而得到"缺少 text"而不是 JSON 语法错误。
fn parse_request(body: &[u8]) -> Result<GenerateRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GenerateRequest::default());
    }
    Ok(serde_json::from_slice(body)?)
}

#[utoipa::path(
    post,
    path = "/",
    summary = "生成海报图片",
    description = "把 1~3 行文本渲染到固定尺寸画布上。按 delivery 返回 base64 内容（image_base64 / data）或上传后的图片地址（image_url）。",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "生成成功", body = GenerateResponse),
        (status = 400, description = "缺少 text 或参数非法", body = crate::error::ErrorBody),
        (status = 500, description = "渲染/上传失败", body = crate::error::ErrorBody)
    ),
    tag = "Poster"
)]
pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, AppError> {
    let req = parse_request(&body)?;
    let resp = state.service.generate(req).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/generate",
    summary = "生成海报图片（别名）",
    description = "与 `POST /` 完全相同。",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "生成成功", body = GenerateResponse),
        (status = 400, description = "缺少 text 或参数非法", body = crate::error::ErrorBody),
        (status = 500, description = "渲染/上传失败", body = crate::error::ErrorBody)
    ),
    tag = "Poster"
)]
pub async fn generate_alias(
    state: State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, AppError> {
    generate(state, body).await
}

#[utoipa::path(
    get,
    path = "/",
    summary = "状态检查",
    responses((status = 200, description = "服务运行中", body = StatusResponse)),
    tag = "Poster"
)]
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "API is running".to_string(),
    })
}

pub fn create_poster_router() -> Router<AppState> {
    Router::new()
        .route("/", get(status).post(generate))
        .route("/api/generate", post(generate_alias))
}
