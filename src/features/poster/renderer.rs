pub(crate) mod raster;
mod svg_templates;

use std::sync::Arc;

use crate::error::AppError;

use super::fonts::ResolvedFont;
use super::scene::Scene;
use super::types::{Backend, CONTENT_TYPE_PNG, CONTENT_TYPE_SVG, RenderedImage};

pub use svg_templates::{SCENE_TEMPLATE, SvgTemplates};

/// XML 1.0 允许出现在文档中的字符（`Char` 产生式）
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// 转义 XML 文本与属性值中的特殊字符，并丢弃 XML 不允许的字符
pub(crate) fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if is_xml_char(c) => out.push(c),
            _ => {}
        }
    }
    out
}

/// 按后端把场景渲染为最终字节（同步，CPU 密集）
pub fn render(
    backend: Backend,
    scene: &Scene,
    font: &ResolvedFont,
    templates: &SvgTemplates,
    optimize_speed: bool,
) -> Result<RenderedImage, AppError> {
    let t0 = std::time::Instant::now();
    let image = match backend {
        Backend::Svg => RenderedImage {
            bytes: templates.render_scene(scene, font)?.into_bytes(),
            content_type: CONTENT_TYPE_SVG,
        },
        Backend::Raster => RenderedImage {
            bytes: raster::rasterize_scene(scene, font, optimize_speed)?,
            content_type: CONTENT_TYPE_PNG,
        },
        Backend::Snapshot => {
            let svg = templates.render_scene(scene, font)?;
            RenderedImage {
                bytes: raster::rasterize_svg(&svg, font, optimize_speed)?,
                content_type: CONTENT_TYPE_PNG,
            }
        }
    };
    tracing::info!(
        "渲染完成: backend={:?}, {}x{}, {} bytes, 耗时={:?}",
        backend,
        scene.width,
        scene.height,
        image.bytes.len(),
        t0.elapsed()
    );
    Ok(image)
}

/// 在阻塞线程池中执行 [`render`]
pub async fn render_blocking(
    backend: Backend,
    scene: Scene,
    font: ResolvedFont,
    templates: Arc<SvgTemplates>,
    optimize_speed: bool,
) -> Result<RenderedImage, AppError> {
    tokio::task::spawn_blocking(move || render(backend, &scene, &font, &templates, optimize_speed))
        .await?
}
