//! 字号估算：按探测字号测量文字宽度，再按目标宽度线性缩放。

use resvg::usvg;
use unicode_width::UnicodeWidthStr;

use super::fonts::ResolvedFont;
use super::renderer::escape_xml;
use super::scene::FontWeight;

/// 测量给定字号下文字的像素宽度
pub trait TextMeasurer {
    /// 无法测量（空文本、字体缺字形等）时返回 None
    fn measure_width(&self, text: &str, font_size: f32) -> Option<f32>;
}

/// 字号估算参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParams {
    /// 探测字号
    pub probe_size: f32,
    /// 收缩系数（留白）
    pub ratio: f32,
    /// 字号上限
    pub max_size: f32,
    /// 字号下限
    pub min_size: f32,
}

impl FitParams {
    pub fn new(probe_size: f32, ratio: f32) -> Self {
        Self {
            probe_size,
            ratio,
            max_size: f32::MAX,
            min_size: 1.0,
        }
    }

    pub fn with_max(mut self, max_size: f32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_min(mut self, min_size: f32) -> Self {
        self.min_size = min_size;
        self
    }
}

/// `probe * (target / measured) * ratio`，结果限制在 `[min_size, max_size]`。
///
/// 测量失败时退回 `min(probe, max_size)`。
pub fn estimate_font_size(
    measurer: &dyn TextMeasurer,
    text: &str,
    target_width: f32,
    params: FitParams,
) -> f32 {
    let fallback = params.probe_size.min(params.max_size);
    let Some(measured) = measurer
        .measure_width(text, params.probe_size)
        .filter(|w| w.is_finite() && *w > 0.0)
    else {
        return fallback.max(params.min_size);
    };

    let size = params.probe_size * (target_width / measured) * params.ratio;
    if !size.is_finite() {
        return fallback.max(params.min_size);
    }
    size.clamp(params.min_size, params.max_size.max(params.min_size))
}

/// 按终端显示宽度估算：CJK/全角字符计 2 格，每格约 0.55em
#[derive(Debug, Clone, Copy)]
pub struct CellMeasurer {
    pub em_per_cell: f32,
}

impl Default for CellMeasurer {
    fn default() -> Self {
        Self { em_per_cell: 0.55 }
    }
}

impl TextMeasurer for CellMeasurer {
    fn measure_width(&self, text: &str, font_size: f32) -> Option<f32> {
        let cells = text.trim().width();
        if cells == 0 {
            return None;
        }
        Some(cells as f32 * font_size * self.em_per_cell)
    }
}

/// 用 usvg 实际排版一次 `<text>`，取包围盒宽度。
pub struct UsvgMeasurer<'a> {
    font: &'a ResolvedFont,
    weight: FontWeight,
}

impl<'a> UsvgMeasurer<'a> {
    pub fn new(font: &'a ResolvedFont, weight: FontWeight) -> Self {
        Self { font, weight }
    }
}

impl TextMeasurer for UsvgMeasurer<'_> {
    fn measure_width(&self, text: &str, font_size: f32) -> Option<f32> {
        let text = text.trim();
        if text.is_empty() || font_size <= 0.0 {
            return None;
        }
        // 画布足够宽即可，包围盒不受裁剪影响
        let width = (font_size * (text.chars().count() as f32 + 2.0)).ceil();
        let height = (font_size * 2.0).ceil();
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="0" y="{y}" font-family="{family}" font-size="{font_size}" font-weight="{weight}">{text}</text></svg>"#,
            y = font_size * 1.2,
            family = escape_xml(&self.font.css_family()),
            weight = self.weight.as_css(),
            text = escape_xml(text),
        );

        let tree = usvg::Tree::from_str(&svg, &self.font.usvg_options()).ok()?;
        let root = tree.root();
        if !root.has_children() {
            return None;
        }
        let w = root.bounding_box().width();
        (w > 0.0).then_some(w)
    }
}

/// 先用 primary 测量，失败再用 secondary
pub struct FallbackMeasurer<P, S> {
    pub primary: P,
    pub secondary: S,
}

impl<P: TextMeasurer, S: TextMeasurer> TextMeasurer for FallbackMeasurer<P, S> {
    fn measure_width(&self, text: &str, font_size: f32) -> Option<f32> {
        self.primary
            .measure_width(text, font_size)
            .or_else(|| self.secondary.measure_width(text, font_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 每个字符固定 0.6em
    struct Monospace;

    impl TextMeasurer for Monospace {
        fn measure_width(&self, text: &str, font_size: f32) -> Option<f32> {
            let n = text.chars().count();
            (n > 0).then(|| n as f32 * font_size * 0.6)
        }
    }

    struct Broken;

    impl TextMeasurer for Broken {
        fn measure_width(&self, _text: &str, _font_size: f32) -> Option<f32> {
            None
        }
    }

    #[test]
    fn follows_proportional_formula() {
        // 10 字符 * 100px * 0.6 = 600px；目标 864px
        let size = estimate_font_size(&Monospace, "abcdefghij", 864.0, FitParams::new(100.0, 0.95));
        let expected = 100.0 * (864.0 / 600.0) * 0.95;
        assert!((size - expected).abs() < 1e-3, "size={size}");
    }

    #[test]
    fn doubling_target_doubles_result() {
        let params = FitParams::new(150.0, 0.95);
        let a = estimate_font_size(&Monospace, "HELLO", 400.0, params);
        let b = estimate_font_size(&Monospace, "HELLO", 800.0, params);
        assert!((b / a - 2.0).abs() < 1e-4);
    }

    #[test]
    fn wider_text_gets_smaller_size() {
        let params = FitParams::new(150.0, 0.95);
        let short = estimate_font_size(&Monospace, "AB", 800.0, params);
        let long = estimate_font_size(&Monospace, "ABCD", 800.0, params);
        assert!((short / long - 2.0).abs() < 1e-4);
    }

    #[test]
    fn result_is_clamped() {
        let params = FitParams::new(150.0, 0.95).with_max(200.0).with_min(20.0);
        assert_eq!(estimate_font_size(&Monospace, "A", 5000.0, params), 200.0);
        assert_eq!(
            estimate_font_size(&Monospace, &"W".repeat(500), 100.0, params),
            20.0
        );
    }

    #[test]
    fn unmeasurable_text_falls_back_to_probe() {
        let params = FitParams::new(150.0, 0.95).with_max(120.0);
        assert_eq!(estimate_font_size(&Broken, "x", 800.0, params), 120.0);
    }

    #[test]
    fn cell_measurer_counts_cjk_as_double() {
        let m = CellMeasurer::default();
        let latin = m.measure_width("ab", 100.0).expect("latin");
        let cjk = m.measure_width("大字", 100.0).expect("cjk");
        assert!((cjk / latin - 2.0).abs() < 1e-4);
        assert!(m.measure_width("   ", 100.0).is_none());
    }

    #[test]
    fn fallback_measurer_uses_secondary() {
        let m = FallbackMeasurer {
            primary: Broken,
            secondary: Monospace,
        };
        let w = m.measure_width("ab", 10.0).expect("width");
        assert!((w - 12.0).abs() < 1e-4);
    }

    #[test]
    fn usvg_width_scales_with_font_size() {
        let Some(font) = crate::features::poster::fonts::system_latin_font() else {
            eprintln!("宿主机没有可用字体，跳过");
            return;
        };
        let measurer = UsvgMeasurer::new(&font, FontWeight::Bold);
        let small = measurer.measure_width("HELLO WORLD", 50.0).expect("width at 50");
        let large = measurer.measure_width("HELLO WORLD", 100.0).expect("width at 100");
        assert!(small > 50.0, "small={small}");
        let ratio = large / small;
        assert!((1.9..=2.1).contains(&ratio), "ratio={ratio}");
    }
}
