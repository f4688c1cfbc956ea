/// 健康检查
pub mod health;

/// 文本海报 / 社交卡片生成
pub mod poster;
