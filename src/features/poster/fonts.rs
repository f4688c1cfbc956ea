//! 字体库与按请求的字体解析。

use resvg::usvg::{self, fontdb};
use std::path::Path;
use std::sync::Arc;

use super::assets::{AssetChain, AssetKind};
use super::palette::RandomSource;

/// 找不到任何字体族时交给渲染库的通用族名
pub const GENERIC_FAMILY: &str = "sans-serif";

/// 进程级共享字体库：系统字体 + 内置字体目录
#[derive(Clone)]
pub struct FontLibrary {
    db: Arc<fontdb::Database>,
}

impl FontLibrary {
    /// 加载系统字体与 `fonts_dir` 下的 ttf/otf/ttc
    pub fn load(fonts_dir: &Path) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        if fonts_dir.is_dir() {
            match std::fs::read_dir(fonts_dir) {
                Ok(entries) => {
                    for path in entries.flatten().map(|e| e.path()) {
                        let is_font = path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| AssetKind::Font.accepts_name(n));
                        if path.is_file() && is_font {
                            if let Err(e) = db.load_font_file(&path) {
                                tracing::error!("加载字体文件失败 '{}': {}", path.display(), e);
                            }
                        }
                    }
                }
                Err(e) => tracing::warn!("读取字体目录 {} 失败: {}", fonts_dir.display(), e),
            }
        }

        tracing::info!("字体库加载完成，共 {} 个字形集", db.len());
        Self { db: Arc::new(db) }
    }

    pub fn from_database(db: fontdb::Database) -> Self {
        Self { db: Arc::new(db) }
    }

    pub fn database(&self) -> Arc<fontdb::Database> {
        self.db.clone()
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.db.faces().any(|face| {
            face.families
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(family))
        })
    }

    pub fn first_family(&self) -> Option<String> {
        self.db
            .faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
    }
}

/// 字体来源，便于日志与测试断言
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontOrigin {
    /// 配置中的优先字体族
    Preferred,
    /// 素材来源链下载/读取的字体文件
    Asset(String),
    /// 字体库中的第一个字体族
    FirstAvailable,
    /// 交给渲染库的通用族名
    Generic,
}

/// 一次请求最终使用的字体
#[derive(Clone)]
pub struct ResolvedFont {
    db: Arc<fontdb::Database>,
    family: String,
    origin: FontOrigin,
    optimize_speed: bool,
}

impl std::fmt::Debug for ResolvedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFont")
            .field("family", &self.family)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl ResolvedFont {
    pub fn new(
        db: Arc<fontdb::Database>,
        family: impl Into<String>,
        origin: FontOrigin,
        optimize_speed: bool,
    ) -> Self {
        Self {
            db,
            family: family.into(),
            origin,
            optimize_speed,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn origin(&self) -> &FontOrigin {
        &self.origin
    }

    /// CSS `font-family` 取值，总是以通用族名兜底
    pub fn css_family(&self) -> String {
        if self.family == GENERIC_FAMILY {
            GENERIC_FAMILY.to_string()
        } else {
            format!("'{}', {}", self.family, GENERIC_FAMILY)
        }
    }

    pub fn usvg_options(&self) -> usvg::Options<'static> {
        let speed = self.optimize_speed;
        usvg::Options {
            fontdb: self.db.clone(),
            font_family: self.family.clone(),
            languages: vec!["zh-CN".to_string(), "en".to_string()],
            shape_rendering: if speed {
                usvg::ShapeRendering::OptimizeSpeed
            } else {
                usvg::ShapeRendering::GeometricPrecision
            },
            text_rendering: if speed {
                usvg::TextRendering::OptimizeSpeed
            } else {
                usvg::TextRendering::OptimizeLegibility
            },
            image_rendering: if speed {
                usvg::ImageRendering::OptimizeSpeed
            } else {
                usvg::ImageRendering::OptimizeQuality
            },
            ..Default::default()
        }
    }
}

/// 字体解析顺序：优先字体族 → 字体素材来源链 → 字体库第一个族 → 通用族名。不会失败。
pub struct FontResolver {
    library: FontLibrary,
    preferred: Vec<String>,
    chain: AssetChain,
    optimize_speed: bool,
}

impl FontResolver {
    pub fn new(
        library: FontLibrary,
        preferred: Vec<String>,
        chain: AssetChain,
        optimize_speed: bool,
    ) -> Self {
        Self {
            library,
            preferred,
            chain,
            optimize_speed,
        }
    }

    pub async fn resolve(&self, rng: &dyn RandomSource) -> ResolvedFont {
        let db = self.library.database();

        if let Some(family) = self.preferred.iter().find(|f| self.library.has_family(f)) {
            return ResolvedFont::new(db, family.clone(), FontOrigin::Preferred, self.optimize_speed);
        }

        if let Some(asset) = self.chain.resolve(AssetKind::Font, rng).await {
            // 下载的字体只进入本次请求的字体库副本
            let mut local = (*db).clone();
            let ids = local.load_font_source(fontdb::Source::Binary(Arc::new(asset.bytes)));
            let family = ids
                .iter()
                .find_map(|id| local.face(*id))
                .and_then(|face| face.families.first().map(|(name, _)| name.clone()));
            match family {
                Some(family) => {
                    tracing::debug!("使用字体素材 {} ({})", asset.name, family);
                    return ResolvedFont::new(
                        Arc::new(local),
                        family,
                        FontOrigin::Asset(asset.name),
                        self.optimize_speed,
                    );
                }
                None => tracing::warn!("字体素材 {} 无法解析，忽略", asset.origin),
            }
        }

        if let Some(family) = self.library.first_family() {
            return ResolvedFont::new(db, family, FontOrigin::FirstAvailable, self.optimize_speed);
        }

        tracing::warn!("字体库为空，交由渲染库使用通用字体族");
        ResolvedFont::new(db, GENERIC_FAMILY, FontOrigin::Generic, self.optimize_speed)
    }
}

/// 系统字体中第一个能排出拉丁字母的字体族；宿主机没有字体时返回 None
#[cfg(test)]
pub(crate) fn system_latin_font() -> Option<ResolvedFont> {
    use super::fit::{TextMeasurer, UsvgMeasurer};
    use super::scene::FontWeight;

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let db = Arc::new(db);
    let mut families: Vec<String> = db
        .faces()
        .filter_map(|face| face.families.first().map(|(name, _)| name.clone()))
        .collect();
    families.sort();
    families.dedup();
    families.into_iter().find_map(|family| {
        let font = ResolvedFont::new(db.clone(), family, FontOrigin::FirstAvailable, true);
        UsvgMeasurer::new(&font, FontWeight::Bold)
            .measure_width("HELLO", 40.0)
            .map(|_| font)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::poster::assets::AssetSource;
    use crate::features::poster::palette::FixedRandom;

    fn empty_library() -> FontLibrary {
        FontLibrary::from_database(fontdb::Database::new())
    }

    #[test]
    fn css_family_always_has_generic_fallback() {
        let db = Arc::new(fontdb::Database::new());
        let named = ResolvedFont::new(db.clone(), "Noto Sans SC", FontOrigin::Preferred, false);
        assert_eq!(named.css_family(), "'Noto Sans SC', sans-serif");
        let generic = ResolvedFont::new(db, GENERIC_FAMILY, FontOrigin::Generic, false);
        assert_eq!(generic.css_family(), "sans-serif");
    }

    #[test]
    fn empty_library_has_no_families() {
        let lib = empty_library();
        assert!(!lib.has_family("Noto Sans SC"));
        assert!(lib.first_family().is_none());
    }

    #[tokio::test]
    async fn empty_everything_falls_back_to_generic() {
        let resolver = FontResolver::new(
            empty_library(),
            vec!["Noto Sans SC".into()],
            AssetChain::default(),
            false,
        );
        let font = resolver.resolve(&FixedRandom(0)).await;
        assert_eq!(font.family(), GENERIC_FAMILY);
        assert_eq!(font.origin(), &FontOrigin::Generic);
    }

    #[tokio::test]
    async fn unparseable_font_asset_is_skipped() {
        let dir = std::env::temp_dir().join(format!(
            "poster-fonts-{}",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&dir).expect("create dir");
        std::fs::write(dir.join("broken.ttf"), b"definitely not a font").expect("write");

        let resolver = FontResolver::new(
            empty_library(),
            Vec::new(),
            AssetChain::new(vec![AssetSource::LocalDir(dir.clone())]),
            true,
        );
        let font = resolver.resolve(&FixedRandom(0)).await;
        assert_eq!(font.origin(), &FontOrigin::Generic);

        std::fs::remove_dir_all(&dir).ok();
    }
}
