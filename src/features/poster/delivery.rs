//! 渲染结果的交付：base64 内联或上传图床返回 URL。

use base64::{Engine as _, engine::general_purpose::STANDARD as base64_engine};
use reqwest::multipart::Form;
use serde::Deserialize;
use std::time::Duration;

use crate::config::UploadConfig;
use crate::error::AppError;
use crate::http::shared_client;

use super::types::{Delivery, GenerateResponse, RenderedImage};

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(default)]
    url: Option<String>,
}

/// 图床响应：`{"success": true, "data": {"url": "..."}}`
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<UploadData>,
}

/// 图床上传客户端（imgbb 兼容接口），失败不重试
#[derive(Debug, Clone)]
pub struct Uploader {
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl Uploader {
    pub fn new(cfg: &UploadConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn upload(&self, image: &RenderedImage) -> Result<String, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Upload("未配置图床 API Key（upload.api_key）".to_string()))?;
        let client = shared_client().map_err(|e| AppError::Upload(e.to_string()))?;

        let form = Form::new().text("image", base64_engine.encode(&image.bytes));
        let resp = client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("请求图床失败: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Upload(format!("图床返回状态码 {status}")));
        }
        let body: UploadResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("图床响应解析失败: {e}")))?;

        if !body.success {
            return Err(AppError::Upload("图床返回 success=false".to_string()));
        }
        body.data
            .and_then(|d| d.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::Upload("图床响应缺少 data.url".to_string()))
    }
}

/// 按交付方式组装成功响应
pub async fn deliver(
    image: RenderedImage,
    delivery: Delivery,
    uploader: &Uploader,
) -> Result<GenerateResponse, AppError> {
    match delivery {
        Delivery::Base64 => Ok(GenerateResponse {
            success: true,
            image_base64: Some(base64_engine.encode(&image.bytes)),
            content_type: Some(image.content_type.to_string()),
            ..Default::default()
        }),
        Delivery::Data => Ok(GenerateResponse {
            success: true,
            data: Some(base64_engine.encode(&image.bytes)),
            content_type: Some(image.content_type.to_string()),
            ..Default::default()
        }),
        Delivery::Url => {
            let url = uploader.upload(&image).await?;
            tracing::info!("图片已上传: {}", url);
            Ok(GenerateResponse {
                success: true,
                image_url: Some(url),
                ..Default::default()
            })
        }
    }
}
