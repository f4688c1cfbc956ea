//! 两种版式的场景构建。坐标均为像素，文字水平居中、`y` 为基线。

use crate::config::CanvasSize;

use super::background::BackgroundImage;
use super::fit::{FitParams, TextMeasurer, estimate_font_size};
use super::lines::{CARD_LINES, PosterLines};
use super::palette::{ColorScheme, Rgb};
use super::scene::{Background, Element, FontWeight, Scene, TextElement};

/// 卡片版式的设计尺寸，坐标按此换算到实际画布
pub const CARD_DESIGN_SIZE: f32 = 1080.0;

/// 大字报文字最大宽度占画布宽度的比例
pub const POSTER_TEXT_WIDTH_RATIO: f32 = 0.8;

/// 卡片：每行的 (x, y, 字号)
const CARD_TEXT_SLOTS: [(f32, f32, f32); CARD_LINES] =
    [(540.0, 350.0, 80.0), (540.0, 490.0, 70.0), (540.0, 620.0, 70.0)];

struct Scale {
    x: f32,
    y: f32,
}

impl Scale {
    fn of(size: CanvasSize) -> Self {
        Self {
            x: size.width as f32 / CARD_DESIGN_SIZE,
            y: size.height as f32 / CARD_DESIGN_SIZE,
        }
    }

    fn len(&self) -> f32 {
        self.x.min(self.y)
    }
}

/// 社交卡片：白底、右上角背景圆、三个装饰圆点、三行文字与两条强调色块、底部表情。
pub fn card_scene(
    lines: &[String; CARD_LINES],
    scheme: &ColorScheme,
    emoji: &str,
    size: CanvasSize,
) -> Scene {
    let s = Scale::of(size);
    let mut elements = Vec::with_capacity(12);

    elements.push(Element::Circle {
        cx: 900.0 * s.x,
        cy: 180.0 * s.y,
        r: 300.0 * s.len(),
        fill: scheme.bg_circle,
        opacity: 0.7,
    });
    for dx in [100.0, 130.0, 160.0] {
        elements.push(Element::Circle {
            cx: dx * s.x,
            cy: 100.0 * s.y,
            r: 8.0 * s.len(),
            fill: scheme.accent,
            opacity: 0.8,
        });
    }

    let text = |line: &str, (x, y, font_size): (f32, f32, f32)| {
        (!line.is_empty()).then(|| {
            Element::Text(TextElement {
                text: line.to_string(),
                x: x * s.x,
                y: y * s.y,
                font_size: font_size * s.len(),
                weight: FontWeight::Bold,
                fill: scheme.primary,
            })
        })
    };

    elements.extend(text(&lines[0], CARD_TEXT_SLOTS[0]));
    // 第二行背后的高亮块
    elements.push(Element::Rect {
        x: 270.0 * s.x,
        y: 420.0 * s.y,
        width: 540.0 * s.x,
        height: 100.0 * s.y,
        rx: 10.0 * s.len(),
        fill: scheme.accent,
        opacity: 0.2,
    });
    elements.extend(text(&lines[1], CARD_TEXT_SLOTS[1]));
    elements.push(Element::Rect {
        x: 320.0 * s.x,
        y: 530.0 * s.y,
        width: 440.0 * s.x,
        height: 8.0 * s.y,
        rx: 0.0,
        fill: scheme.accent,
        opacity: 0.7,
    });
    elements.extend(text(&lines[2], CARD_TEXT_SLOTS[2]));

    elements.push(Element::Text(TextElement {
        text: emoji.to_string(),
        x: 540.0 * s.x,
        y: 740.0 * s.y,
        font_size: 40.0 * s.len(),
        weight: FontWeight::Normal,
        fill: scheme.primary,
    }));

    Scene {
        width: size.width,
        height: size.height,
        background: Background::solid(Rgb::WHITE),
        elements,
    }
}

/// 大字报版式参数
#[derive(Debug, Clone, Copy)]
pub struct PosterParams {
    pub size: CanvasSize,
    /// 探测字号与收缩系数；上下限由版式按画布高度补齐
    pub fit: FitParams,
}

/// 单行文字区域：中心线位置（占画布高度比例）与字号上限（占画布高度比例）
struct Region {
    center: f32,
    max_size: f32,
}

const MAIN_SUB_REGIONS: [Region; 2] = [
    Region {
        center: 0.42,
        max_size: 0.30,
    },
    Region {
        center: 0.66,
        max_size: 0.16,
    },
];

const THREE_REGIONS: [Region; 3] = [
    Region {
        center: 0.30,
        max_size: 0.18,
    },
    Region {
        center: 0.52,
        max_size: 0.18,
    },
    Region {
        center: 0.74,
        max_size: 0.18,
    },
];

/// 大字报：每行一个文字区域，字号按画布宽度的 80% 自适应。
pub fn poster_scene(
    lines: &PosterLines,
    scheme: &ColorScheme,
    background: Option<BackgroundImage>,
    measurer: &dyn TextMeasurer,
    params: PosterParams,
) -> Scene {
    let width = params.size.width as f32;
    let height = params.size.height as f32;
    let target_width = width * POSTER_TEXT_WIDTH_RATIO;

    let place = |text: &str, region: &Region| {
        let fit = params
            .fit
            .with_max(height * region.max_size)
            .with_min((height * 0.02).max(8.0));
        let font_size = estimate_font_size(measurer, text, target_width, fit);
        // 让字形的视觉中心落在区域中心线上
        TextElement {
            text: text.to_string(),
            x: width / 2.0,
            y: height * region.center + font_size * 0.35,
            font_size,
            weight: FontWeight::Bold,
            fill: scheme.primary,
        }
    };

    let mut elements = Vec::with_capacity(4);
    match lines {
        PosterLines::MainSub { main, sub } => {
            elements.push(Element::Text(place(main, &MAIN_SUB_REGIONS[0])));
            let bar_w = width * 0.3;
            elements.push(Element::Rect {
                x: (width - bar_w) / 2.0,
                y: height * 0.54,
                width: bar_w,
                height: (height * 0.008).max(2.0),
                rx: 0.0,
                fill: scheme.accent,
                opacity: 0.8,
            });
            elements.push(Element::Text(place(sub, &MAIN_SUB_REGIONS[1])));
        }
        PosterLines::Three(three) => {
            for (line, region) in three.iter().zip(THREE_REGIONS.iter()) {
                elements.push(Element::Text(place(line, region)));
            }
        }
    }

    Scene {
        width: params.size.width,
        height: params.size.height,
        background: Background {
            fill: Rgb::WHITE,
            image: background,
        },
        elements,
    }
}

/// 画面底部的小字提示（背景模板全部不可用时使用）
pub fn notice_element(size: CanvasSize, text: &str, color: Rgb) -> Element {
    let height = size.height as f32;
    Element::Text(TextElement {
        text: text.to_string(),
        x: size.width as f32 / 2.0,
        y: height * 0.96,
        font_size: (height * 0.022).max(10.0),
        weight: FontWeight::Normal,
        fill: color,
    })
}
