use crate::error::AppError;

use super::renderer::is_xml_char;

/// 卡片版式的行数（不足补空行）
pub const CARD_LINES: usize = 3;

/// 大字报版式拆分结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosterLines {
    /// 两行：主标题 + 副标题
    MainSub { main: String, sub: String },
    /// 三行：等分排布
    Three([String; 3]),
}

/// 按换行拆分并去掉每行首尾空白（兼容 `\r\n`）；XML 不允许的控制字符被丢弃
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|l| l.chars().filter(|c| is_xml_char(*c)).collect::<String>())
        .map(|l| l.trim().to_string())
        .collect()
}

/// 卡片版式：保持原顺序（空行占位），截断到 3 行，不足补空行。
pub fn card_lines(text: &str) -> Result<[String; CARD_LINES], AppError> {
    let mut lines = split_lines(text);
    if lines.iter().all(String::is_empty) {
        return Err(AppError::Input("text 不能为空".to_string()));
    }
    if lines.len() > CARD_LINES {
        tracing::debug!("文本共 {} 行，卡片版式仅保留前 {} 行", lines.len(), CARD_LINES);
    }
    lines.resize(CARD_LINES, String::new());
    let [a, b, c]: [String; CARD_LINES] = lines
        .try_into()
        .map_err(|_| AppError::Internal("行数归一化失败".to_string()))?;
    Ok([a, b, c])
}

/// 大字报版式：丢弃空行，按实际行数（2 或 3）选择排布；多于 3 行只保留前 3 行。
pub fn poster_lines(text: &str) -> Result<PosterLines, AppError> {
    let mut lines: Vec<String> = split_lines(text)
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() > 3 {
        tracing::warn!("文本共 {} 个非空行，大字报版式仅保留前 3 行", lines.len());
        lines.truncate(3);
    }

    let mut it = lines.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(main), Some(sub), None) => Ok(PosterLines::MainSub { main, sub }),
        (Some(a), Some(b), Some(c)) => Ok(PosterLines::Three([a, b, c])),
        _ => Err(AppError::Input(
            "poster layout requires 2 or 3 non-empty lines".to_string(),
        )),
    }
}
