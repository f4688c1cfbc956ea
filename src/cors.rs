//! 跨域头：所有响应都带 Allow-Origin，OPTIONS 在最外层直接应答。

use axum::http::{HeaderName, HeaderValue, Method, header};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CorsConfig;

/// 配置中的一组取值："*" 表示任意，否则是解析成功的条目（保留原始写法）
#[derive(Debug, PartialEq)]
enum Allowed<T> {
    Any,
    Only(Vec<(String, T)>),
}

impl<T: Clone> Allowed<T> {
    fn parse(field: &str, raw: &[String], parse: impl Fn(&str) -> Option<T>) -> Self {
        let mut items = Vec::new();
        for value in raw.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            if value == "*" {
                return Allowed::Any;
            }
            match parse(value) {
                Some(parsed) => items.push((value.to_string(), parsed)),
                None => tracing::warn!("CORS {} 忽略无效值: {}", field, value),
            }
        }
        Allowed::Only(items)
    }

    fn is_any(&self) -> bool {
        matches!(self, Allowed::Any)
    }

    fn values(&self) -> Vec<T> {
        match self {
            Allowed::Any => Vec::new(),
            Allowed::Only(items) => items.iter().map(|(_, v)| v.clone()).collect(),
        }
    }

    /// 响应头里的写法：`*` 或逗号分隔的原始值
    fn header_text(&self) -> String {
        match self {
            Allowed::Any => "*".to_string(),
            Allowed::Only(items) => items
                .iter()
                .map(|(raw, _)| raw.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

struct ParsedCors {
    origins: Allowed<HeaderValue>,
    methods: Allowed<Method>,
    headers: Allowed<HeaderName>,
    expose: Allowed<HeaderName>,
}

impl ParsedCors {
    fn from_config(cors: &CorsConfig) -> Self {
        let header_name = |v: &str| HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes()).ok();
        Self {
            origins: Allowed::parse("allowed_origins", &cors.allowed_origins, |v| {
                HeaderValue::from_str(v).ok()
            }),
            methods: Allowed::parse("allowed_methods", &cors.allowed_methods, |v| {
                Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
            }),
            headers: Allowed::parse("allowed_headers", &cors.allowed_headers, header_name),
            expose: Allowed::parse("expose_headers", &cors.expose_headers, header_name),
        }
    }

    fn has_wildcard(&self) -> bool {
        self.origins.is_any() || self.methods.is_any() || self.headers.is_any() || self.expose.is_any()
    }
}

/// 构建 CORS 中间件；禁用或配置无效时返回 None
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }
    let parsed = ParsedCors::from_config(cors);

    if parsed.origins == Allowed::Only(Vec::new()) {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，跳过");
        return None;
    }
    if cors.allow_credentials && parsed.has_wildcard() {
        tracing::error!("CORS 配置无效：allow_credentials=true 不能与 \"*\" 同时使用，跳过");
        return None;
    }

    let mut layer = match parsed.origins {
        Allowed::Any => CorsLayer::new().allow_origin(Any),
        ref only => CorsLayer::new().allow_origin(only.values()),
    };
    layer = match parsed.methods {
        Allowed::Any => layer.allow_methods(Any),
        ref only => layer.allow_methods(only.values()),
    };
    layer = match parsed.headers {
        Allowed::Any => layer.allow_headers(Any),
        ref only => layer.allow_headers(only.values()),
    };
    layer = match parsed.expose {
        Allowed::Any => layer.expose_headers(Any),
        ref only => layer.expose_headers(only.values()),
    };
    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }
    if let Some(secs) = cors.max_age_secs.filter(|s| *s > 0) {
        layer = layer.max_age(Duration::from_secs(secs));
    }
    Some(layer)
}

/// 非预检响应上补齐 Allow-Methods / Allow-Headers。
///
/// CorsLayer 只在预检时写这两个头；旧前端依赖每个响应都能看到它们。
pub fn build_allow_header_layers(
    cors: &CorsConfig,
) -> Option<(
    SetResponseHeaderLayer<HeaderValue>,
    SetResponseHeaderLayer<HeaderValue>,
)> {
    if !cors.enabled || !cors.always_send_allow_headers {
        return None;
    }
    let parsed = ParsedCors::from_config(cors);
    let methods = HeaderValue::from_str(&parsed.methods.header_text()).ok()?;
    let headers = HeaderValue::from_str(&parsed.headers.header_text()).ok()?;
    if methods.is_empty() && headers.is_empty() {
        return None;
    }
    Some((
        SetResponseHeaderLayer::if_not_present(header::ACCESS_CONTROL_ALLOW_METHODS, methods),
        SetResponseHeaderLayer::if_not_present(header::ACCESS_CONTROL_ALLOW_HEADERS, headers),
    ))
}
