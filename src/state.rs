use std::sync::Arc;

use crate::features::poster::PosterService;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 海报生成服务（字体库、素材来源、渲染并发许可都在其中）
    pub service: Arc<PosterService>,
}

impl AppState {
    pub fn new(service: PosterService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
