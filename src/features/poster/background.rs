//! 背景模板：解码、铺满画布（等比裁剪）、转为 Data URI 或位图。

use base64::{Engine as _, engine::general_purpose::STANDARD as base64_engine};
use image::imageops::FilterType;
use std::sync::Arc;
use tiny_skia::{ColorU8, IntSize, Pixmap};

use crate::config::CanvasSize;
use crate::error::AppError;

use super::assets::{AssetChain, AssetKind};
use super::palette::RandomSource;
use super::renderer::raster::encode_png;

/// 已铺满画布的背景图（非预乘 RGBA8）
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundImage {
    pub width: u32,
    pub height: u32,
    rgba: Arc<Vec<u8>>,
}

impl BackgroundImage {
    /// 解码任意 PNG/JPEG 并按 xMidYMid slice 语义缩放到目标尺寸
    pub fn decode(bytes: &[u8], size: CanvasSize, optimize_speed: bool) -> Result<Self, AppError> {
        if size.width == 0 || size.height == 0 {
            return Err(AppError::Input("画布尺寸不能为 0".to_string()));
        }
        let img = image::load_from_memory(bytes)
            .map_err(|e| AppError::Render(format!("背景图解码失败: {e}")))?;
        let filter = if optimize_speed {
            FilterType::Triangle
        } else {
            FilterType::Lanczos3
        };
        let rgba = img
            .resize_to_fill(size.width, size.height, filter)
            .to_rgba8()
            .into_raw();
        Ok(Self {
            width: size.width,
            height: size.height,
            rgba: Arc::new(rgba),
        })
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// 供 SVG `<image>` 引用
    pub fn to_data_uri(&self) -> Result<String, AppError> {
        let png = encode_png(self.width, self.height, &self.rgba, true)?;
        Ok(format!("data:image/png;base64,{}", base64_engine.encode(png)))
    }

    /// tiny-skia 需要预乘 alpha
    pub fn to_pixmap(&self) -> Result<Pixmap, AppError> {
        let size = IntSize::from_wh(self.width, self.height)
            .ok_or_else(|| AppError::Render("背景尺寸无效".to_string()))?;
        let mut pixmap = Pixmap::new(size.width(), size.height())
            .ok_or_else(|| AppError::Render("背景位图创建失败".to_string()))?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(self.rgba.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Ok(pixmap)
    }
}

/// 从模板来源链取一张背景。
///
/// 未配置任何来源时返回 `Ok(None)`（纯色画布）；配置了来源但全部不可用或解码失败时返回错误，
/// 由调用方降级为纯色画布并在画面上提示。
pub async fn resolve_background(
    chain: &AssetChain,
    rng: &dyn RandomSource,
    size: CanvasSize,
    optimize_speed: bool,
) -> Result<Option<BackgroundImage>, AppError> {
    if chain.is_empty() {
        return Ok(None);
    }
    let asset = chain
        .resolve(AssetKind::Template, rng)
        .await
        .ok_or_else(|| AppError::AssetUnavailable("所有背景模板来源均不可用".to_string()))?;
    let origin = asset.origin.clone();
    let decoded = tokio::task::spawn_blocking(move || {
        BackgroundImage::decode(&asset.bytes, size, optimize_speed)
    })
    .await?;

    decoded.map(Some).map_err(|e| {
        AppError::AssetUnavailable(format!("背景模板 {origin} 不可用: {e}"))
    })
}
