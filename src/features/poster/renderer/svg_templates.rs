use std::path::PathBuf;

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::config::RenderConfig;
use crate::error::AppError;
use crate::features::poster::fonts::ResolvedFont;
use crate::features::poster::palette::Rgb;
use crate::features::poster::scene::{Element, Scene};

use super::escape_xml;

/// 场景模板名；自定义模板目录中的同名文件优先
pub const SCENE_TEMPLATE: &str = "scene.svg.jinja";

const BUILTIN_SCENE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/resources/templates/poster/scene.svg.jinja"
));

/// SVG 模板环境。
///
/// - Rust 负责坐标计算与转义，模板只负责排列图元；
/// - 所有文本字段以 `*_xml` 形式预先转义，模板中不再开启自动转义。
pub struct SvgTemplates {
    env: Environment<'static>,
}

impl SvgTemplates {
    pub fn builtin() -> Self {
        let mut env = Self::base_env();
        // 内置模板为编译期常量，语法错误会在测试中暴露
        if let Err(e) = env.add_template(SCENE_TEMPLATE, BUILTIN_SCENE) {
            tracing::error!("内置 SVG 模板无效: {}", e);
        }
        Self { env }
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        tracing::info!("使用自定义 SVG 模板目录: {}", dir.display());
        let mut env = Self::base_env();
        env.set_loader(minijinja::path_loader(dir));
        Self { env }
    }

    pub fn from_config(cfg: &RenderConfig) -> Self {
        match cfg.templates_dir.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(dir) => Self::from_dir(dir),
            None => Self::builtin(),
        }
    }

    fn base_env() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env
    }

    pub fn render_scene(&self, scene: &Scene, font: &ResolvedFont) -> Result<String, AppError> {
        let ctx = SceneCtx::build(scene, font)?;
        let tpl = self.env.get_template(SCENE_TEMPLATE).map_err(|e| {
            AppError::Render(format!("加载 SVG 模板失败（{SCENE_TEMPLATE}）: {e}"))
        })?;
        Ok(tpl.render(&ctx)?)
    }
}

/// 模板里的数字保留两位小数，避免 f32 展开成长尾
fn num(v: f32) -> f64 {
    (f64::from(v) * 100.0).round() / 100.0
}

#[derive(Debug, Serialize)]
struct BackgroundCtx {
    fill: String,
    href_xml: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ElementCtx {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rx: f64,
        fill: String,
        opacity: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: String,
        opacity: f64,
    },
    Text {
        x: f64,
        y: f64,
        font_size: f64,
        weight: &'static str,
        fill: String,
        text_xml: String,
    },
}

#[derive(Debug, Serialize)]
struct SceneCtx {
    width: u32,
    height: u32,
    background: BackgroundCtx,
    font_family_xml: String,
    elements: Vec<ElementCtx>,
}

impl SceneCtx {
    fn build(scene: &Scene, font: &ResolvedFont) -> Result<Self, AppError> {
        let href_xml = match &scene.background.image {
            Some(img) => Some(escape_xml(&img.to_data_uri()?)),
            None => None,
        };
        let fill = |c: Rgb| c.to_hex();

        let elements = scene
            .elements
            .iter()
            .map(|el| match el {
                Element::Rect {
                    x,
                    y,
                    width,
                    height,
                    rx,
                    fill: color,
                    opacity,
                } => ElementCtx::Rect {
                    x: num(*x),
                    y: num(*y),
                    width: num(*width),
                    height: num(*height),
                    rx: num(*rx),
                    fill: fill(*color),
                    opacity: num(*opacity),
                },
                Element::Circle {
                    cx,
                    cy,
                    r,
                    fill: color,
                    opacity,
                } => ElementCtx::Circle {
                    cx: num(*cx),
                    cy: num(*cy),
                    r: num(*r),
                    fill: fill(*color),
                    opacity: num(*opacity),
                },
                Element::Text(t) => ElementCtx::Text {
                    x: num(t.x),
                    y: num(t.y),
                    font_size: num(t.font_size),
                    weight: t.weight.as_css(),
                    fill: fill(t.fill),
                    text_xml: escape_xml(&t.text),
                },
            })
            .collect();

        Ok(Self {
            width: scene.width,
            height: scene.height,
            background: BackgroundCtx {
                fill: fill(scene.background.fill),
                href_xml,
            },
            font_family_xml: escape_xml(&font.css_family()),
            elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::poster::fonts::{FontOrigin, GENERIC_FAMILY};
    use crate::features::poster::scene::{Background, FontWeight, TextElement};
    use resvg::usvg::fontdb;
    use std::sync::Arc;

    fn font() -> ResolvedFont {
        ResolvedFont::new(
            Arc::new(fontdb::Database::new()),
            GENERIC_FAMILY,
            FontOrigin::Generic,
            true,
        )
    }

    fn scene_with_text(text: &str) -> Scene {
        Scene {
            width: 200,
            height: 100,
            background: Background::solid(Rgb::WHITE),
            elements: vec![
                Element::Circle {
                    cx: 10.0,
                    cy: 10.0,
                    r: 5.0,
                    fill: Rgb(0xFF, 0x9E, 0xB5),
                    opacity: 0.7,
                },
                Element::Text(TextElement {
                    text: text.to_string(),
                    x: 100.0,
                    y: 60.0,
                    font_size: 24.0,
                    weight: FontWeight::Bold,
                    fill: Rgb(0x33, 0x33, 0x33),
                }),
            ],
        }
    }

    #[test]
    fn builtin_template_renders_elements() {
        let svg = SvgTemplates::builtin()
            .render_scene(&scene_with_text("HELLO"), &font())
            .expect("render");
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="200""#));
        assert!(svg.contains(r##"fill="#FF9EB5" fill-opacity="0.7""##));
        assert!(svg.contains(">HELLO</text>"));
        assert!(svg.contains(r#"font-weight="bold""#));
        assert!(!svg.contains("<image"));
    }

    #[test]
    fn user_text_is_escaped() {
        let svg = SvgTemplates::builtin()
            .render_scene(&scene_with_text(r#"Tom & "Jerry" <3 'x'"#), &font())
            .expect("render");
        assert!(svg.contains("Tom &amp; &quot;Jerry&quot; &lt;3 &apos;x&apos;"));
    }

    #[test]
    fn missing_custom_template_is_render_error() {
        let dir = std::env::temp_dir().join("poster-templates-missing-dir");
        let err = SvgTemplates::from_dir(dir)
            .render_scene(&scene_with_text("x"), &font())
            .unwrap_err();
        assert!(matches!(err, AppError::Render(_)));
    }

    #[test]
    fn numbers_are_rounded() {
        assert_eq!(num(0.7), 0.7);
        assert_eq!(num(1.0 / 3.0), 0.33);
    }
}
