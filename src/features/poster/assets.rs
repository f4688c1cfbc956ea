//! 素材（字体 / 背景模板）来源链：按顺序尝试，第一个成功的来源生效。

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::AssetsConfig;
use crate::error::AppError;
use crate::http::shared_client;

use super::palette::{RandomSource, choose};

/// 素材种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Font,
    Template,
}

impl AssetKind {
    /// 可接受的文件扩展名（小写）
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            AssetKind::Font => &["ttf", "otf", "ttc"],
            AssetKind::Template => &["png", "jpg", "jpeg"],
        }
    }

    pub fn accepts_name(self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            })
    }

    fn label(self) -> &'static str {
        match self {
            AssetKind::Font => "字体",
            AssetKind::Template => "背景模板",
        }
    }
}

/// 已取得的素材
#[derive(Debug, Clone)]
pub struct Asset {
    /// 文件名
    pub name: String,
    /// 来源描述（本地路径或 URL），仅用于日志
    pub origin: String,
    pub bytes: Vec<u8>,
}

/// 单个素材来源
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// 本地目录，均匀随机挑选
    LocalDir(PathBuf),
    /// 远程目录列表接口（`[{name, type, download_url}]`），均匀随机挑选后下载
    RemoteListing { url: String, timeout: Duration },
}

/// 远程目录列表条目
#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    #[serde(rename = "type", default)]
    entry_type: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

impl AssetSource {
    pub fn describe(&self) -> String {
        match self {
            AssetSource::LocalDir(dir) => format!("本地目录 {}", dir.display()),
            AssetSource::RemoteListing { url, .. } => format!("远程目录 {url}"),
        }
    }

    pub async fn fetch(&self, kind: AssetKind, rng: &dyn RandomSource) -> Result<Asset, AppError> {
        match self {
            AssetSource::LocalDir(dir) => fetch_local(dir, kind, rng).await,
            AssetSource::RemoteListing { url, timeout } => {
                fetch_remote(url, *timeout, kind, rng).await
            }
        }
    }
}

async fn fetch_local(dir: &Path, kind: AssetKind, rng: &dyn RandomSource) -> Result<Asset, AppError> {
    let unavailable =
        |e: std::io::Error| AppError::AssetUnavailable(format!("读取 {} 失败: {e}", dir.display()));

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unavailable)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| kind.accepts_name(n))
        {
            files.push(path);
        }
    }
    // 目录遍历顺序不稳定，排序后固定种子才能复现
    files.sort();

    let path = choose(rng, &files).ok_or_else(|| {
        AppError::AssetUnavailable(format!("{} 中没有可用的{}文件", dir.display(), kind.label()))
    })?;
    let bytes = tokio::fs::read(path).await.map_err(unavailable)?;
    Ok(Asset {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        origin: path.display().to_string(),
        bytes,
    })
}

async fn fetch_remote(
    url: &str,
    timeout: Duration,
    kind: AssetKind,
    rng: &dyn RandomSource,
) -> Result<Asset, AppError> {
    let unavailable = |e: reqwest::Error| AppError::AssetUnavailable(format!("{url}: {e}"));
    let client = shared_client().map_err(unavailable)?;

    let listing: Vec<ListingEntry> = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(unavailable)?
        .json()
        .await
        .map_err(unavailable)?;

    let candidates: Vec<ListingEntry> = listing
        .into_iter()
        .filter(|e| e.entry_type.as_deref().is_none_or(|t| t == "file"))
        .filter(|e| e.download_url.is_some() && kind.accepts_name(&e.name))
        .collect();
    let entry = choose(rng, &candidates).ok_or_else(|| {
        AppError::AssetUnavailable(format!("{url} 中没有可用的{}文件", kind.label()))
    })?;

    // download_url 允许是相对路径
    let download = entry.download_url.as_deref().unwrap_or_default();
    let download_url = reqwest::Url::parse(url)
        .and_then(|base| base.join(download))
        .map_err(|e| AppError::AssetUnavailable(format!("无效的下载地址 {download}: {e}")))?;

    let bytes = client
        .get(download_url.clone())
        .timeout(timeout)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(unavailable)?
        .bytes()
        .await
        .map_err(unavailable)?;

    Ok(Asset {
        name: entry.name.clone(),
        origin: download_url.to_string(),
        bytes: bytes.to_vec(),
    })
}

/// 有序的素材来源链
#[derive(Debug, Clone, Default)]
pub struct AssetChain {
    sources: Vec<AssetSource>,
}

impl AssetChain {
    pub fn new(sources: Vec<AssetSource>) -> Self {
        Self { sources }
    }

    /// 按配置组装：本地目录优先，其次远程目录
    pub fn from_config(cfg: &AssetsConfig, kind: AssetKind) -> Self {
        let timeout = Duration::from_secs(cfg.remote_timeout_secs.max(1));
        let (local, remote) = match kind {
            AssetKind::Font => (&cfg.font_dir, &cfg.remote_fonts_url),
            AssetKind::Template => (&cfg.template_dir, &cfg.remote_templates_url),
        };

        let mut sources = Vec::new();
        if let Some(dir) = local.as_deref().filter(|d| !d.trim().is_empty()) {
            sources.push(AssetSource::LocalDir(PathBuf::from(dir)));
        }
        if let Some(url) = remote.as_deref().filter(|u| !u.trim().is_empty()) {
            sources.push(AssetSource::RemoteListing {
                url: url.to_string(),
                timeout,
            });
        }
        Self { sources }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// 依次尝试每个来源；全部失败返回 None，由调用方决定兜底。
    pub async fn resolve(&self, kind: AssetKind, rng: &dyn RandomSource) -> Option<Asset> {
        for source in &self.sources {
            match source.fetch(kind, rng).await {
                Ok(asset) => {
                    tracing::debug!(
                        "{}来源 {} 命中: {} ({} bytes)",
                        kind.label(),
                        source.describe(),
                        asset.origin,
                        asset.bytes.len()
                    );
                    return Some(asset);
                }
                Err(e) => {
                    tracing::warn!("{}来源 {} 不可用: {}", kind.label(), source.describe(), e);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::poster::palette::FixedRandom;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "poster-assets-{tag}-{}",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn kind_accepts_expected_extensions() {
        assert!(AssetKind::Font.accepts_name("NotoSansSC-Bold.OTF"));
        assert!(AssetKind::Template.accepts_name("bg.jpeg"));
        assert!(!AssetKind::Template.accepts_name("bg.gif"));
        assert!(!AssetKind::Font.accepts_name("README"));
    }

    #[test]
    fn from_config_orders_local_before_remote() {
        let cfg = AssetsConfig {
            template_dir: Some("tpl".into()),
            remote_templates_url: Some("https://example.com/list".into()),
            ..AssetsConfig::default()
        };
        let chain = AssetChain::from_config(&cfg, AssetKind::Template);
        assert!(matches!(chain.sources[0], AssetSource::LocalDir(_)));
        assert!(matches!(chain.sources[1], AssetSource::RemoteListing { .. }));
        assert!(AssetChain::from_config(&cfg, AssetKind::Font).is_empty());
    }

    #[tokio::test]
    async fn local_dir_picks_matching_files_only() {
        let dir = temp_dir("local");
        std::fs::write(dir.join("a.png"), b"a").expect("write");
        std::fs::write(dir.join("b.jpg"), b"b").expect("write");
        std::fs::write(dir.join("notes.txt"), b"x").expect("write");

        let chain = AssetChain::new(vec![AssetSource::LocalDir(dir.clone())]);
        let asset = chain
            .resolve(AssetKind::Template, &FixedRandom(1))
            .await
            .expect("asset");
        assert_eq!(asset.name, "b.jpg");
        assert_eq!(asset.bytes, b"b");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn chain_falls_through_to_next_source() {
        let missing = std::env::temp_dir().join("poster-assets-definitely-missing");
        let dir = temp_dir("fallthrough");
        std::fs::write(dir.join("font.ttf"), b"font").expect("write");

        let chain = AssetChain::new(vec![
            AssetSource::LocalDir(missing),
            AssetSource::LocalDir(dir.clone()),
        ]);
        let asset = chain
            .resolve(AssetKind::Font, &FixedRandom(0))
            .await
            .expect("asset");
        assert_eq!(asset.name, "font.ttf");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn exhausted_chain_returns_none() {
        let dir = temp_dir("empty");
        let chain = AssetChain::new(vec![AssetSource::LocalDir(dir.clone())]);
        assert!(chain.resolve(AssetKind::Font, &FixedRandom(0)).await.is_none());
        assert!(
            AssetChain::default()
                .resolve(AssetKind::Font, &FixedRandom(0))
                .await
                .is_none()
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
