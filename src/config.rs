use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::features::poster::{Backend, Layout};

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        3000
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 未设置时生效）
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// 日志格式：full / compact
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
    fn default_format() -> String {
        "full".to_string()
    }

    /// 组装 EnvFilter 的默认指令
    pub fn default_directive(&self) -> String {
        format!("poster_backend={},tower_http={}", self.level, self.level)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: Self::default_format(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_allowed_headers")]
    pub allowed_headers: Vec<String>,
    /// 暴露的响应头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
    /// 非预检响应也附带 Allow-Methods / Allow-Headers
    #[serde(default = "CorsConfig::default_always_send_allow_headers")]
    pub always_send_allow_headers: bool,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_allowed_origins() -> Vec<String> {
        vec!["*".to_string()]
    }
    fn default_allowed_methods() -> Vec<String> {
        ["GET", "POST", "OPTIONS"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
    fn default_allowed_headers() -> Vec<String> {
        ["X-Requested-With", "Content-Type"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
    fn default_always_send_allow_headers() -> bool {
        true
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Self::default_allowed_origins(),
            allowed_methods: Self::default_allowed_methods(),
            allowed_headers: Self::default_allowed_headers(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: None,
            always_send_allow_headers: Self::default_always_send_allow_headers(),
        }
    }
}

/// 画布尺寸
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// 图片渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// 请求未指定时使用的版式
    #[serde(default)]
    pub default_layout: Layout,
    /// 请求未指定时使用的渲染后端
    #[serde(default)]
    pub default_backend: Backend,
    /// 卡片版式画布（坐标按 1080x1080 设计）
    #[serde(default = "RenderConfig::default_card_size")]
    pub card_size: CanvasSize,
    /// 大字报版式画布（常用 1080x1080 或 800x600）
    #[serde(default = "RenderConfig::default_poster_size")]
    pub poster_size: CanvasSize,
    /// 内置字体目录（启动时加载进字体库）
    #[serde(default = "RenderConfig::default_fonts_dir")]
    pub fonts_dir: String,
    /// 优先字体族，按顺序尝试
    #[serde(default = "RenderConfig::default_preferred_families")]
    pub preferred_families: Vec<String>,
    /// 字号估算时的探测字号
    #[serde(default = "RenderConfig::default_probe_size")]
    pub probe_size: f32,
    /// 字号估算的收缩系数
    #[serde(default = "RenderConfig::default_fit_ratio")]
    pub fit_ratio: f32,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 自定义 SVG 模板目录（为空则使用内置模板）
    #[serde(default)]
    pub templates_dir: Option<String>,
    /// 是否优先速度渲染（OptimizeSpeed），可能略降画质
    #[serde(default)]
    pub optimize_speed: bool,
}

impl RenderConfig {
    fn default_card_size() -> CanvasSize {
        CanvasSize::new(1080, 1080)
    }
    fn default_poster_size() -> CanvasSize {
        CanvasSize::new(1080, 1080)
    }
    fn default_fonts_dir() -> String {
        "resources/fonts".to_string()
    }
    fn default_preferred_families() -> Vec<String> {
        vec![
            "Noto Sans SC".to_string(),
            "Source Han Sans SC".to_string(),
            "PingFang SC".to_string(),
        ]
    }
    fn default_probe_size() -> f32 {
        150.0
    }
    fn default_fit_ratio() -> f32 {
        0.95
    }

    /// 实际并发渲染许可数
    pub fn parallelism(&self) -> usize {
        if self.max_parallel == 0 {
            num_cpus::get()
        } else {
            self.max_parallel as usize
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_layout: Layout::default(),
            default_backend: Backend::default(),
            card_size: Self::default_card_size(),
            poster_size: Self::default_poster_size(),
            fonts_dir: Self::default_fonts_dir(),
            preferred_families: Self::default_preferred_families(),
            probe_size: Self::default_probe_size(),
            fit_ratio: Self::default_fit_ratio(),
            max_parallel: 0,
            templates_dir: None,
            optimize_speed: false,
        }
    }
}

/// 素材来源配置（背景模板 / 字体），按本地目录 → 远程目录的顺序尝试
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// 本地背景模板目录
    #[serde(default)]
    pub template_dir: Option<String>,
    /// 本地字体目录（每次请求随机挑选一个）
    #[serde(default)]
    pub font_dir: Option<String>,
    /// 远程背景模板目录列表接口（返回 `[{name,type,download_url}]`）
    #[serde(default)]
    pub remote_templates_url: Option<String>,
    /// 远程字体目录列表接口
    #[serde(default)]
    pub remote_fonts_url: Option<String>,
    /// 远程请求超时（秒）
    #[serde(default = "AssetsConfig::default_remote_timeout")]
    pub remote_timeout_secs: u64,
}

impl AssetsConfig {
    fn default_remote_timeout() -> u64 {
        30
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            template_dir: None,
            font_dir: None,
            remote_templates_url: None,
            remote_fonts_url: None,
            remote_timeout_secs: Self::default_remote_timeout(),
        }
    }
}

/// 图床上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 上传接口地址
    #[serde(default = "UploadConfig::default_endpoint")]
    pub endpoint: String,
    /// API Key（未配置时 `delivery=url` 直接失败）
    #[serde(default)]
    pub api_key: Option<String>,
    /// 上传超时（秒）
    #[serde(default = "UploadConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl UploadConfig {
    fn default_endpoint() -> String {
        "https://api.imgbb.com/1/upload".to_string()
    }
    fn default_timeout() -> u64 {
        30
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            api_key: None,
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 等待进行中的渲染结束的最长时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 超时后是否强制退出进程
    #[serde(default = "ShutdownConfig::default_force")]
    pub force_quit: bool,
    /// 强制退出前的等待时间（秒）
    #[serde(default = "ShutdownConfig::default_force_delay")]
    pub force_delay_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }
    fn default_force() -> bool {
        true
    }
    fn default_force_delay() -> u64 {
        10
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    /// 获取强制退出等待时间
    pub fn force_delay_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.force_delay_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
            force_quit: Self::default_force(),
            force_delay_secs: Self::default_force_delay(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 图片渲染配置
    #[serde(default)]
    pub render: RenderConfig,
    /// 素材来源配置
    #[serde(default)]
    pub assets: AssetsConfig,
    /// 图床上传配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖；配置文件缺失时全部使用默认值
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            // 支持环境变量覆盖，例如：APP_SERVER__PORT、APP_UPLOAD__API_KEY
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;

        tracing::debug!(
            "配置加载完成: upload.api_key = {}",
            if config.upload.api_key.is_some() {
                "已配置"
            } else {
                "未配置"
            }
        );

        Ok(config)
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global_with()")
    }

    /// 以已加载的配置初始化全局单例
    pub fn init_global_with(config: AppConfig) -> Result<(), ConfigError> {
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))
    }

    /// 获取配置文件路径（可用 APP_CONFIG 指定）
    fn get_config_path() -> PathBuf {
        std::env::var_os("APP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 获取内置字体目录
    pub fn fonts_path(&self) -> PathBuf {
        PathBuf::from(&self.render.fonts_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_canvas_and_cors() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.render.card_size, CanvasSize::new(1080, 1080));
        assert_eq!(cfg.cors.allowed_origins, vec!["*".to_string()]);
        assert_eq!(cfg.cors.allowed_methods, vec!["GET", "POST", "OPTIONS"]);
        assert_eq!(
            cfg.cors.allowed_headers,
            vec!["X-Requested-With", "Content-Type"]
        );
        assert!(cfg.upload.api_key.is_none());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let raw = r#"
            [server]
            port = 8080

            [render]
            default_layout = "poster"
            poster_size = { width = 800, height = 600 }
        "#;
        let cfg: AppConfig = ConfigBuilder::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("deserialize config");

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.render.default_layout, Layout::Poster);
        assert_eq!(cfg.render.poster_size, CanvasSize::new(800, 600));
        assert_eq!(cfg.render.card_size, CanvasSize::new(1080, 1080));
        assert!((cfg.render.fit_ratio - 0.95).abs() < f32::EPSILON);
    }
}
