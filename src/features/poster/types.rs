use serde::{Deserialize, Serialize};

/// 版式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// 社交卡片：三行固定坐标 + 装饰圆点 + 表情（缺行补空）
    #[default]
    Card,
    /// 大字报：2 行主副标题或 3 行等分，字号按宽度自适应
    Poster,
}

/// 渲染后端
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// 直接在位图上绘制图形与文字，输出 PNG
    #[default]
    Raster,
    /// 输出 SVG 文本
    Svg,
    /// 先生成 SVG 文档再整体栅格化为 PNG（等价于网页截图）
    Snapshot,
}

/// 结果交付方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// `image_base64` + `content_type`
    #[default]
    Base64,
    /// `data` 字段承载 base64（兼容旧前端）
    Data,
    /// 上传图床后返回 `image_url`
    Url,
}

/// 生成请求体
#[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GenerateRequest {
    /// 文本，按换行拆分为 2~3 行
    #[schema(example = "HELLO\nWORLD")]
    #[serde(default)]
    pub text: Option<String>,
    /// 版式（缺省取配置 render.default_layout）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    /// 渲染后端（缺省取配置 render.default_backend）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
    /// 交付方式（缺省 base64）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Delivery>,
    /// 指定配色名（pink/blue/green/purple/yellow），缺省随机
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// 随机种子：相同种子得到相同的配色/表情/素材选择
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// 生成成功的响应体
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GenerateResponse {
    #[schema(example = true)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[schema(example = "image/png")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// `GET /` 状态检查响应
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    #[schema(example = "API is running")]
    pub status: String,
}

/// 渲染产物
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

pub const CONTENT_TYPE_PNG: &str = "image/png";
pub const CONTENT_TYPE_SVG: &str = "image/svg+xml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_only_text() {
        let req: GenerateRequest = serde_json::from_str(r#"{"text":"A\nB"}"#).expect("parse");
        assert_eq!(req.text.as_deref(), Some("A\nB"));
        assert!(req.layout.is_none());
        assert!(req.backend.is_none());
    }

    #[test]
    fn request_parses_lowercase_variants() {
        let req: GenerateRequest = serde_json::from_str(
            r#"{"text":"A","layout":"poster","backend":"snapshot","delivery":"url","seed":7}"#,
        )
        .expect("parse");
        assert_eq!(req.layout, Some(Layout::Poster));
        assert_eq!(req.backend, Some(Backend::Snapshot));
        assert_eq!(req.delivery, Some(Delivery::Url));
        assert_eq!(req.seed, Some(7));
    }

    #[test]
    fn response_omits_unused_fields() {
        let resp = GenerateResponse {
            success: true,
            image_url: Some("https://i.example/x.png".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(resp).expect("serialize");
        assert_eq!(v["success"], true);
        assert!(v.get("image_base64").is_none());
        assert!(v.get("content_type").is_none());
    }
}
