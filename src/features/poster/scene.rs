//! 与版式/后端无关的场景描述：像素坐标下的一组图元。

use super::background::BackgroundImage;
use super::palette::Rgb;

/// 字重
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn as_css(self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }
}

/// 文字图元：水平居中于 `x`，`y` 为基线
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub weight: FontWeight,
    pub fill: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rx: f32,
        fill: Rgb,
        opacity: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        fill: Rgb,
        opacity: f32,
    },
    Text(TextElement),
}

/// 画布背景：纯色底，可叠加一张已铺满画布的图片
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub fill: Rgb,
    pub image: Option<BackgroundImage>,
}

impl Background {
    pub fn solid(fill: Rgb) -> Self {
        Self { fill, image: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub background: Background,
    pub elements: Vec<Element>,
}

impl Scene {
    pub fn texts(&self) -> impl Iterator<Item = &TextElement> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text(t) => Some(t),
            _ => None,
        })
    }
}
