use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 缺少 `text` 字段时返回给调用方的固定文案（历史客户端按字面量匹配）
pub const MISSING_TEXT_MESSAGE: &str = "Missing required parameter: text";

/// 应用统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 请求体缺少 text
    #[error("Missing required parameter: text")]
    MissingText,

    /// 参数校验 / 请求体解析错误
    #[error("{0}")]
    Input(String),

    /// 所有素材来源均不可用且不存在兜底
    #[error("素材不可用: {0}")]
    AssetUnavailable(String),

    /// 图像渲染错误
    #[error("图像渲染错误: {0}")]
    Render(String),

    /// 图床上传错误
    #[error("上传失败: {0}")]
    Upload(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 失败响应体：与成功响应共用 `success` 字段，便于前端统一判断。
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// 恒为 false
    #[schema(example = false)]
    pub success: bool,
    /// 人类可读的错误信息
    #[schema(example = "Missing required parameter: text")]
    pub error: String,
    /// 稳定的错误码，用于程序化处理
    #[schema(example = "MISSING_TEXT")]
    pub code: String,
    /// 请求追踪 ID
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingText | AppError::Input(_) => StatusCode::BAD_REQUEST,
            AppError::AssetUnavailable(_)
            | AppError::Render(_)
            | AppError::Upload(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn stable_code(&self) -> &'static str {
        match self {
            AppError::MissingText => "MISSING_TEXT",
            AppError::Input(_) => "BAD_REQUEST",
            AppError::AssetUnavailable(_) => "ASSET_UNAVAILABLE",
            AppError::Render(_) => "RENDER_FAILED",
            AppError::Upload(_) => "UPLOAD_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.stable_code(), "请求处理失败: {}", self);
        } else {
            tracing::debug!(code = self.stable_code(), "请求被拒绝: {}", self);
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(body).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Input(format!("请求体不是合法的 JSON: {err}"))
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::Render(format!("SVG 模板渲染失败: {err}"))
    }
}

impl From<png::EncodingError> for AppError {
    fn from(err: png::EncodingError) -> Self {
        AppError::Render(format!("PNG 编码失败: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("阻塞渲染任务执行失败: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_text_keeps_literal_message() {
        assert_eq!(AppError::MissingText.to_string(), MISSING_TEXT_MESSAGE);
        assert_eq!(AppError::MissingText.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn runtime_failures_map_to_500() {
        for err in [
            AppError::AssetUnavailable("x".into()),
            AppError::Render("x".into()),
            AppError::Upload("x".into()),
            AppError::Internal("x".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn invalid_json_is_input_error() {
        let err: AppError = serde_json::from_slice::<serde_json::Value>(b"{nope")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Input(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
