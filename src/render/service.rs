//! # 服务层（防抖调度）
//!
//! ## 设计思路
//!
//! 界面事件经 `on_settings_change` 归约成新的设置值，再交给一个防抖触发器：
//! - 静默窗口（默认 300ms）内的新请求取消尚未触发的旧请求（后写者胜）
//! - 每个请求携带递增的代号，完成时代号已过期的结果直接丢弃
//! - 渲染互斥执行，同一时刻只有一个渲染在进行
//!
//! 渲染状态通过 `tokio::sync::watch` 广播，前端只需订阅即可。
//!
//! ## 实现思路
//!
//! - `generation`：`AtomicU64`，每次请求自增
//! - `pending`：尚未完成的调度任务句柄，新请求到来时 `abort`
//! - `render_lock`：异步互斥锁，串行化渲染
//! - `status`：`Placeholder` / `Ready` / `Failed { previous }`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::export::{ExportArtifact, ExportFormat};
use super::settings::{RenderSettings, SettingsChange};
use super::source::RenderedCode;
use super::{RenderConfig, RenderError, RenderHandler};

/// 当前渲染状态。
#[derive(Debug, Clone)]
pub enum RenderStatus {
    /// 输入为空：显示占位，禁用导出。
    Placeholder,
    /// 最新一次渲染成功。
    Ready(Arc<RenderedCode>),
    /// 最新一次渲染失败：保留上一次成功结果用于展示，禁用导出。
    Failed {
        code: &'static str,
        notice: String,
        previous: Option<Arc<RenderedCode>>,
    },
}

impl RenderStatus {
    pub fn exports_enabled(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// 当前应展示的结果（失败时为上一次成功结果）。
    pub fn displayed(&self) -> Option<&Arc<RenderedCode>> {
        match self {
            Self::Placeholder => None,
            Self::Ready(code) => Some(code),
            Self::Failed { previous, .. } => previous.as_ref(),
        }
    }

    fn after_failure(&self, error: &RenderError) -> Self {
        if matches!(error, RenderError::EmptyInput) {
            return Self::Placeholder;
        }
        Self::Failed {
            code: error.code(),
            notice: error.to_string(),
            previous: self.displayed().cloned(),
        }
    }
}

/// 防抖渲染服务。
pub struct RenderService {
    handler: Arc<RenderHandler>,
    settings: Mutex<RenderSettings>,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
    render_lock: Arc<tokio::sync::Mutex<()>>,
    status: Arc<watch::Sender<RenderStatus>>,
}

impl RenderService {
    /// 使用默认配置与默认编码器创建服务。
    pub fn new(initial: RenderSettings) -> Result<Self, RenderError> {
        Ok(Self::with_handler(Arc::new(RenderHandler::new(RenderConfig::default())?), initial))
    }

    /// 使用已构建的处理器创建服务。
    pub fn with_handler(handler: Arc<RenderHandler>, initial: RenderSettings) -> Self {
        let (status, _) = watch::channel(RenderStatus::Placeholder);
        Self {
            handler,
            settings: Mutex::new(initial),
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
            render_lock: Arc::new(tokio::sync::Mutex::new(())),
            status: Arc::new(status),
        }
    }

    /// 订阅渲染状态变化。
    pub fn subscribe(&self) -> watch::Receiver<RenderStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> RenderStatus {
        self.status.borrow().clone()
    }

    /// 当前设置快照。
    pub fn settings(&self) -> Result<RenderSettings, RenderError> {
        self.settings
            .lock()
            .map(|settings| settings.clone())
            .map_err(|_| RenderError::Task("设置锁已中毒".to_string()))
    }

    /// 处理一次界面变更：归约后触发防抖渲染。
    ///
    /// 返回 `Ok(false)` 表示变更被拒绝或无变化，未触发渲染。
    pub fn on_settings_change(&self, change: SettingsChange) -> Result<bool, RenderError> {
        let next = {
            let mut current = self
                .settings
                .lock()
                .map_err(|_| RenderError::Task("设置锁已中毒".to_string()))?;
            let Some(next) = current.reduce(change) else {
                return Ok(false);
            };
            *current = next.clone();
            next
        };

        self.request_render(next)?;
        Ok(true)
    }

    /// 以当前设置重新请求一次渲染。
    pub fn refresh(&self) -> Result<u64, RenderError> {
        let settings = self.settings()?;
        self.request_render(settings)
    }

    /// 请求一次防抖渲染，返回本次请求的代号。
    pub fn request_render(&self, settings: RenderSettings) -> Result<u64, RenderError> {
        let debounce = Duration::from_millis(self.handler.config_snapshot()?.debounce_ms);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let handler = Arc::clone(&self.handler);
        let latest = Arc::clone(&self.generation);
        let render_lock = Arc::clone(&self.render_lock);
        let status = Arc::clone(&self.status);

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != generation {
                return;
            }

            let _guard = render_lock.lock().await;
            if latest.load(Ordering::SeqCst) != generation {
                return;
            }

            let result = handler.render(settings, generation).await;
            if latest.load(Ordering::SeqCst) != generation {
                log::debug!("🗑️ 丢弃过期渲染结果 - generation={}", generation);
                return;
            }

            status.send_modify(|current| {
                *current = match result {
                    Ok(code) => RenderStatus::Ready(Arc::new(code)),
                    Err(err) => {
                        if err.is_notice() {
                            log::info!("ℹ️ 渲染未完成：{}", err);
                        } else {
                            log::error!("❌ 渲染失败：{}", err);
                        }
                        current.after_failure(&err)
                    }
                };
            });
        });

        let mut pending = self
            .pending
            .lock()
            .map_err(|_| RenderError::Task("调度句柄锁已中毒".to_string()))?;
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }

        Ok(generation)
    }

    /// 等待当前挂起的渲染请求结束（触发或被取消）。
    pub async fn settle(&self) -> Result<(), RenderError> {
        let task = self
            .pending
            .lock()
            .map_err(|_| RenderError::Task("调度句柄锁已中毒".to_string()))?
            .take();

        if let Some(task) = task {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    return Err(RenderError::Task(format!("渲染任务异常退出：{}", err)));
                }
            }
        }
        Ok(())
    }

    /// 导出当前结果；仅 `Ready` 状态允许导出。
    pub fn export_current(&self, format: ExportFormat) -> Result<ExportArtifact, RenderError> {
        let status = self.status();
        match status {
            RenderStatus::Ready(code) => self.handler.export(&code, format),
            RenderStatus::Placeholder => Err(RenderError::Export("内容为空，导出不可用".to_string())),
            RenderStatus::Failed { notice, .. } => {
                Err(RenderError::Export(format!("当前渲染失败，导出不可用：{}", notice)))
            }
        }
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(task) = pending.take() {
                task.abort();
            }
        }
    }
}
