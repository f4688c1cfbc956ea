//! 位图后端：tiny-skia 绘制图形，文字逐个交给 resvg 栅格化到同一张位图上。

use resvg::usvg;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform};

use crate::error::AppError;
use crate::features::poster::fonts::ResolvedFont;
use crate::features::poster::palette::Rgb;
use crate::features::poster::scene::{Element, Scene, TextElement};

use super::escape_xml;

/// 圆角近似用的三次贝塞尔控制点系数
const KAPPA: f32 = 0.552_284_8;

/// 把 RGBA8 像素编码为 PNG。
///
/// 画布总是先铺满不透明底色，预乘与否不影响输出。
pub(crate) fn encode_png(
    width: u32,
    height: u32,
    rgba: &[u8],
    optimize_speed: bool,
) -> Result<Vec<u8>, AppError> {
    let mut out = Vec::with_capacity(rgba.len() / 4);
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if optimize_speed {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::FilterType::NoFilter);
        } else {
            encoder.set_compression(png::Compression::Default);
            encoder.set_filter(png::FilterType::Paeth);
        }
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba)?;
        writer.finish()?;
    }
    Ok(out)
}

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap, AppError> {
    Pixmap::new(width, height)
        .ok_or_else(|| AppError::Render(format!("无法创建 {width}x{height} 的位图")))
}

fn paint(color: Rgb, opacity: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    paint.set_color_rgba8(color.0, color.1, color.2, alpha);
    paint.anti_alias = true;
    paint
}

fn rect_path(x: f32, y: f32, w: f32, h: f32, rx: f32) -> Option<tiny_skia::Path> {
    let r = rx.min(w / 2.0).min(h / 2.0).max(0.0);
    if r <= f32::EPSILON {
        return Some(PathBuilder::from_rect(Rect::from_xywh(x, y, w, h)?));
    }
    let k = r * KAPPA;
    let (right, bottom) = (x + w, y + h);
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + k, y, right, y + r - k, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - k, bottom, x, bottom - r + k, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
    pb.close();
    pb.finish()
}

/// 仅包含一段文字、尺寸与画布相同的 SVG，栅格化后位置与画布坐标一致
fn text_document(text: &TextElement, font: &ResolvedFont, width: u32, height: u32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="{x}" y="{y}" text-anchor="middle" font-family="{family}" font-size="{size}" font-weight="{weight}" fill="{fill}">{content}</text></svg>"#,
        x = text.x,
        y = text.y,
        family = escape_xml(&font.css_family()),
        size = text.font_size,
        weight = text.weight.as_css(),
        fill = text.fill.to_hex(),
        content = escape_xml(&text.text),
    )
}

fn draw_text(
    pixmap: &mut Pixmap,
    text: &TextElement,
    font: &ResolvedFont,
    options: &usvg::Options<'_>,
) -> Result<(), AppError> {
    let doc = text_document(text, font, pixmap.width(), pixmap.height());
    let tree = usvg::Tree::from_str(&doc, options)
        .map_err(|e| AppError::Render(format!("文字排版失败: {e}")))?;
    if !tree.root().has_children() {
        // 字体缺字形时 usvg 会丢弃整段文字
        tracing::debug!("文字 {:?} 没有可绘制的字形", text.text);
        return Ok(());
    }
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Ok(())
}

/// 直接在位图上绘制整个场景并编码为 PNG
pub fn rasterize_scene(
    scene: &Scene,
    font: &ResolvedFont,
    optimize_speed: bool,
) -> Result<Vec<u8>, AppError> {
    let mut pixmap = new_pixmap(scene.width, scene.height)?;
    let bg = scene.background.fill;
    pixmap.fill(tiny_skia::Color::from_rgba8(bg.0, bg.1, bg.2, 255));

    if let Some(image) = &scene.background.image {
        let layer = image.to_pixmap()?;
        pixmap.draw_pixmap(
            0,
            0,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    let options = font.usvg_options();
    for element in &scene.elements {
        match element {
            Element::Rect {
                x,
                y,
                width,
                height,
                rx,
                fill,
                opacity,
            } => {
                if let Some(path) = rect_path(*x, *y, *width, *height, *rx) {
                    pixmap.fill_path(
                        &path,
                        &paint(*fill, *opacity),
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
            }
            Element::Circle {
                cx,
                cy,
                r,
                fill,
                opacity,
            } => {
                if let Some(path) = PathBuilder::from_circle(*cx, *cy, *r) {
                    pixmap.fill_path(
                        &path,
                        &paint(*fill, *opacity),
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
            }
            Element::Text(text) => draw_text(&mut pixmap, text, font, &options)?,
        }
    }

    encode_png(pixmap.width(), pixmap.height(), pixmap.data(), optimize_speed)
}

/// 把完整 SVG 文档栅格化为 PNG
pub fn rasterize_svg(
    svg: &str,
    font: &ResolvedFont,
    optimize_speed: bool,
) -> Result<Vec<u8>, AppError> {
    let t0 = std::time::Instant::now();
    let tree = usvg::Tree::from_data(svg.as_bytes(), &font.usvg_options())
        .map_err(|e| AppError::Render(format!("SVG 解析失败: {e}")))?;
    let t_parse = t0.elapsed();

    let size = tree.size().to_int_size();
    let mut pixmap = new_pixmap(size.width(), size.height())?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    let t_raster = t0.elapsed();

    let out = encode_png(size.width(), size.height(), pixmap.data(), optimize_speed)?;
    tracing::debug!(
        "SVG 栅格化分段: 解析={:?}, 栅格化={:?}, 编码={:?}",
        t_parse,
        t_raster - t_parse,
        t0.elapsed() - t_raster
    );
    Ok(out)
}
