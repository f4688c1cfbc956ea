//! 配色、表情组合与可替换的随机源。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);

    /// 解析 `#RRGGBB`（`#` 可省略）
    pub fn from_hex(hex: &str) -> Option<Rgb> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// 配色方案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub name: &'static str,
    /// 正文颜色
    pub primary: Rgb,
    /// 强调色（装饰点、高亮条）
    pub accent: Rgb,
    /// 右上角背景圆
    pub bg_circle: Rgb,
}

pub static COLOR_SCHEMES: [ColorScheme; 5] = [
    ColorScheme {
        name: "pink",
        primary: Rgb(0x33, 0x33, 0x33),
        accent: Rgb(0xFF, 0x9E, 0xB5),
        bg_circle: Rgb(0xFF, 0xE6, 0xE9),
    },
    ColorScheme {
        name: "blue",
        primary: Rgb(0x33, 0x33, 0x33),
        accent: Rgb(0x40, 0xA9, 0xFF),
        bg_circle: Rgb(0xE8, 0xF4, 0xFF),
    },
    ColorScheme {
        name: "green",
        primary: Rgb(0x33, 0x33, 0x33),
        accent: Rgb(0x52, 0xC4, 0x1A),
        bg_circle: Rgb(0xF0, 0xFF, 0xE6),
    },
    ColorScheme {
        name: "purple",
        primary: Rgb(0x33, 0x33, 0x33),
        accent: Rgb(0x92, 0x54, 0xDE),
        bg_circle: Rgb(0xF5, 0xED, 0xFF),
    },
    ColorScheme {
        name: "yellow",
        primary: Rgb(0x33, 0x33, 0x33),
        accent: Rgb(0xFA, 0xAD, 0x14),
        bg_circle: Rgb(0xFF, 0xFB, 0xE6),
    },
];

pub static EMOJI_SETS: [&str; 5] = [
    "🥺 💖 ✨",
    "😊 💓 ✨",
    "🤗 💕 ✨",
    "😍 💝 ✨",
    "🌈 💫 ✨",
];

/// 按名称查找配色（大小写不敏感）
pub fn scheme_by_name(name: &str) -> Option<&'static ColorScheme> {
    let name = name.trim();
    COLOR_SCHEMES
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
}

/// 随机源：所有"随机挑选"都经由它，测试可注入确定性实现。
pub trait RandomSource: Send + Sync {
    /// 返回 `[0, len)` 内的下标；`len` 为 0 时调用方不会调用。
    fn pick(&self, len: usize) -> usize;
}

/// 线程本地随机数
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// 固定种子的随机数，相同种子得到相同序列
#[derive(Debug)]
pub struct SeededRandom(Mutex<StdRng>);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl RandomSource for SeededRandom {
    fn pick(&self, len: usize) -> usize {
        match self.0.lock() {
            Ok(mut rng) => rng.gen_range(0..len),
            Err(poisoned) => poisoned.into_inner().gen_range(0..len),
        }
    }
}

/// 总是返回同一下标（越界时取模），用于测试
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub usize);

impl RandomSource for FixedRandom {
    fn pick(&self, len: usize) -> usize {
        self.0 % len
    }
}

/// 从切片中挑选一个元素；空切片返回 None
pub fn choose<'a, T>(rng: &dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.pick(items.len()))
}
