use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::{AppConfig, RenderConfig};
use crate::error::AppError;

use super::assets::{AssetChain, AssetKind};
use super::background::resolve_background;
use super::delivery::{Uploader, deliver};
use super::fit::{CellMeasurer, FallbackMeasurer, FitParams, UsvgMeasurer};
use super::fonts::{FontLibrary, FontResolver};
use super::layout::{PosterParams, card_scene, notice_element, poster_scene};
use super::lines::{CARD_LINES, PosterLines, card_lines, poster_lines};
use super::palette::{
    COLOR_SCHEMES, ColorScheme, EMOJI_SETS, RandomSource, SeededRandom, ThreadRandom, choose,
    scheme_by_name,
};
use super::renderer::{SvgTemplates, render_blocking};
use super::scene::{FontWeight, Scene};
use super::types::{GenerateRequest, GenerateResponse, Layout};

/// 背景模板来源全部失败时画在底部的提示
pub const BACKGROUND_NOTICE: &str = "背景模板加载失败";

enum NormalizedLines {
    Card([String; CARD_LINES]),
    Poster(PosterLines),
}

/// 海报生成服务：持有字体库、素材来源、模板与上传客户端，处理完整的生成流程。
pub struct PosterService {
    render: RenderConfig,
    fonts: FontResolver,
    templates: AssetChain,
    svg: Arc<SvgTemplates>,
    uploader: Uploader,
    random: Arc<dyn RandomSource>,
    permits: Arc<Semaphore>,
    total_permits: u32,
}

impl PosterService {
    pub fn new(config: &AppConfig, library: FontLibrary) -> Self {
        let render = config.render.clone();
        let fonts = FontResolver::new(
            library,
            render.preferred_families.clone(),
            AssetChain::from_config(&config.assets, AssetKind::Font),
            render.optimize_speed,
        );
        let total_permits = u32::try_from(render.parallelism().max(1)).unwrap_or(u32::MAX);
        let permits = Arc::new(Semaphore::new(total_permits as usize));
        tracing::info!("渲染并发许可: {}", total_permits);

        Self {
            svg: Arc::new(SvgTemplates::from_config(&render)),
            templates: AssetChain::from_config(&config.assets, AssetKind::Template),
            uploader: Uploader::new(&config.upload),
            random: Arc::new(ThreadRandom),
            fonts,
            render,
            permits,
            total_permits,
        }
    }

    /// 加载系统字体与 `render.fonts_dir` 后构建
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config, FontLibrary::load(&config.fonts_path()))
    }

    /// 替换默认随机源（请求带 seed 时仍以 seed 为准）
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// 等待所有进行中的渲染结束（退出时使用）
    pub async fn wait_idle(&self) {
        if let Ok(all) = self.permits.acquire_many(self.total_permits).await {
            drop(all);
        }
    }

    /// (进行中的渲染数, 并发上限)
    pub fn render_load(&self) -> (u32, u32) {
        let available = u32::try_from(self.permits.available_permits()).unwrap_or(u32::MAX);
        (self.total_permits.saturating_sub(available), self.total_permits)
    }

    fn pick_scheme(
        &self,
        requested: Option<&str>,
        rng: &dyn RandomSource,
    ) -> Result<&'static ColorScheme, AppError> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => scheme_by_name(name)
                .ok_or_else(|| AppError::Input(format!("未知的配色方案: {name}"))),
            None => choose(rng, &COLOR_SCHEMES)
                .ok_or_else(|| AppError::Internal("配色表为空".to_string())),
        }
    }

    /// 完整生成流程：拆行 → 选配色/字体/背景 → 构建场景 → 渲染 → 交付
    pub async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, AppError> {
        let text = req
            .text
            .filter(|t| !t.is_empty())
            .ok_or(AppError::MissingText)?;
        let layout = req.layout.unwrap_or(self.render.default_layout);
        let backend = req.backend.unwrap_or(self.render.default_backend);
        let delivery = req.delivery.unwrap_or_default();

        let seeded;
        let rng: &dyn RandomSource = match req.seed {
            Some(seed) => {
                seeded = SeededRandom::new(seed);
                &seeded
            }
            None => self.random.as_ref(),
        };

        let t0 = std::time::Instant::now();
        // 先校验文本，被拒绝的请求不读取素材也不消耗随机数
        let lines = match layout {
            Layout::Card => NormalizedLines::Card(card_lines(&text)?),
            Layout::Poster => NormalizedLines::Poster(poster_lines(&text)?),
        };
        let scheme = self.pick_scheme(req.scheme.as_deref(), rng)?;
        let font = self.fonts.resolve(rng).await;

        let scene: Scene = match lines {
            NormalizedLines::Card(lines) => {
                let emoji = choose(rng, &EMOJI_SETS).copied().unwrap_or_default();
                card_scene(&lines, scheme, emoji, self.render.card_size)
            }
            NormalizedLines::Poster(lines) => {
                let size = self.render.poster_size;
                let (background, notice) =
                    match resolve_background(&self.templates, rng, size, self.render.optimize_speed)
                        .await
                    {
                        Ok(bg) => (bg, None),
                        Err(e) => {
                            tracing::warn!("背景不可用，改用纯色画布: {}", e);
                            (None, Some(notice_element(size, BACKGROUND_NOTICE, scheme.primary)))
                        }
                    };
                let measurer = FallbackMeasurer {
                    primary: UsvgMeasurer::new(&font, FontWeight::Bold),
                    secondary: CellMeasurer::default(),
                };
                let params = PosterParams {
                    size,
                    fit: FitParams::new(self.render.probe_size, self.render.fit_ratio),
                };
                let mut scene = poster_scene(&lines, scheme, background, &measurer, params);
                scene.elements.extend(notice);
                scene
            }
        };
        let t_scene = t0.elapsed();

        let image = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| AppError::Internal(format!("渲染许可获取失败: {e}")))?;
            render_blocking(
                backend,
                scene,
                font.clone(),
                self.svg.clone(),
                self.render.optimize_speed,
            )
            .await?
        };
        let t_render = t0.elapsed();

        let resp = deliver(image, delivery, &self.uploader).await?;
        tracing::info!(
            "生成完成: layout={:?}, backend={:?}, delivery={:?}, scheme={}, font={}, 场景={:?}, 渲染={:?}, 交付={:?}",
            layout,
            backend,
            delivery,
            scheme.name,
            font.family(),
            t_scene,
            t_render - t_scene,
            t0.elapsed() - t_render
        );
        Ok(resp)
    }
}
