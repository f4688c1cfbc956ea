//! 优雅退出
//!
//! 监听 SIGINT / SIGTERM（Windows 下为 Ctrl+C）。信号到达时 [`shutdown_signal`] 立即返回，
//! 服务器停止接收新连接并等待进行中的请求；[`spawn_deadline_guard`] 同时开始计时，
//! 超过 `timeout_secs` 仍未排空且启用了 `force_quit` 时，延迟 `force_delay_secs` 后结束进程。

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::ShutdownConfig;

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C / SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// 程序内部主动触发
    Application,
}

#[derive(Debug)]
struct Inner {
    notify: Notify,
    triggered: AtomicBool,
    reason: std::sync::Mutex<Option<ShutdownReason>>,
}

/// 退出信号协调器，可被克隆到多个任务中等待
#[derive(Debug, Clone)]
pub struct ShutdownManager {
    inner: Arc<Inner>,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("信号设置失败: {0}")]
    SignalSetup(String),
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                notify: Notify::new(),
                triggered: AtomicBool::new(false),
                reason: std::sync::Mutex::new(None),
            }),
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    fn recorded_reason(&self) -> ShutdownReason {
        self.inner
            .reason
            .lock()
            .ok()
            .and_then(|r| *r)
            .unwrap_or(ShutdownReason::Application)
    }

    /// 只有第一次触发生效
    pub fn trigger(&self, reason: ShutdownReason) {
        if self
            .inner
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("重复的退出信号被忽略: {:?}", reason);
            return;
        }
        info!("触发优雅退出: {:?}", reason);
        if let Ok(mut guard) = self.inner.reason.lock() {
            *guard = Some(reason);
        }
        self.inner.notify.notify_waiters();
    }

    pub async fn wait(&self) -> ShutdownReason {
        let notified = self.inner.notify.notified();
        if self.is_shutting_down() {
            return self.recorded_reason();
        }
        notified.await;
        self.recorded_reason()
    }

    /// 在后台任务中监听系统信号
    pub fn start_signal_handler(&self) -> Result<(), ShutdownError> {
        let manager = self.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigint = signal(SignalKind::interrupt())
                .map_err(|e| ShutdownError::SignalSetup(e.to_string()))?;
            let mut sigterm = signal(SignalKind::terminate())
                .map_err(|e| ShutdownError::SignalSetup(e.to_string()))?;

            tokio::spawn(async move {
                tokio::select! {
                    _ = sigint.recv() => manager.trigger(ShutdownReason::Interrupt),
                    _ = sigterm.recv() => manager.trigger(ShutdownReason::Terminate),
                }
            });
        }

        #[cfg(not(unix))]
        {
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => manager.trigger(ShutdownReason::Interrupt),
                    Err(e) => tracing::error!("监听 Ctrl+C 失败: {}", e),
                }
            });
        }

        Ok(())
    }
}

/// 交给 `axum::serve(..).with_graceful_shutdown`：收到信号即返回
pub async fn shutdown_signal(manager: ShutdownManager) {
    let reason = manager.wait().await;
    info!("接收到退出信号 {:?}，停止接收新连接", reason);
}

/// 排空结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Drained,
    TimedOut,
}

/// 在 `timeout_secs` 内等待 `drain` 完成
pub async fn drain_with_deadline<F>(cfg: &ShutdownConfig, drain: F) -> DrainOutcome
where
    F: Future<Output = ()>,
{
    match tokio::time::timeout(cfg.timeout_duration(), drain).await {
        Ok(()) => {
            info!("进行中的任务已全部完成");
            DrainOutcome::Drained
        }
        Err(_) => {
            warn!("优雅退出超时（{} 秒）", cfg.timeout_secs);
            DrainOutcome::TimedOut
        }
    }
}

/// 后台看门狗：信号到达后开始排空计时，超时且 `force_quit` 时强制结束进程
pub fn spawn_deadline_guard<F>(manager: ShutdownManager, cfg: ShutdownConfig, drain: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        manager.wait().await;
        if drain_with_deadline(&cfg, drain).await == DrainOutcome::TimedOut && cfg.force_quit {
            warn!("{} 秒后强制退出", cfg.force_delay_secs);
            tokio::time::sleep(cfg.force_delay_duration()).await;
            std::process::exit(1);
        }
    });
}
