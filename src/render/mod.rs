//! # 渲染模块（render）
//!
//! ## 设计思路
//!
//! 该模块将“设置归约 → 编码 → 栅格化 → 边框合成 → Logo 叠加 → 导出”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `service`：防抖调度与渲染状态广播（`RenderService`）
//! - `handler`：编排单次渲染流水线
//! - `matrix`：矩阵与编码器边界
//! - `rasterizer` / `rounding`：网格绘制与像素域圆角兜底
//! - `frame`：边框与说明文字
//! - `loader` / `logo`：Logo 加载校验、解码缩放与叠加
//! - `export`：PNG / JPEG / SVG 编码
//! - `surface`：像素绘制原语
//! - `config/error/settings/source`：配置、错误、设置值与中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! 前端事件（CLI 参数 / 交互输入）
//!    ↓
//! settings.rs（SettingsChange → reduce → 新 RenderSettings）
//!    ↓
//! service.rs（防抖 300ms + 代号丢弃过期结果）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ matrix.rs / rasterizer.rs / rounding.rs（模块绘制）
//!    ├─ frame.rs（边框 + 说明文字）
//!    └─ loader.rs + logo.rs（Logo，失败则跳过）
//!    ↓
//! export.rs（PNG / JPEG / SVG）
//! ```
//!
//! ## 分层职责建议
//!
//! - 配置与策略变更优先改 `config.rs`
//! - 业务流程顺序变更优先改 `handler.rs`
//! - 单阶段行为优化分别改 `rasterizer/frame/logo/export`

mod config;
mod error;
mod export;
mod frame;
mod handler;
mod loader;
mod logo;
mod matrix;
mod rasterizer;
mod rounding;
mod service;
mod settings;
mod source;
mod surface;

pub use config::{RasterPath, RenderConfig, SvgMode};
pub use error::RenderError;
pub use export::{encode_jpeg, encode_png, escape_xml, export, svg_embedded, svg_vector, ExportArtifact, ExportFormat};
pub use frame::{draw_caption, draw_frame, frame_rect, FrameRect};
pub use handler::RenderHandler;
pub use logo::{logo_origin, logo_target_size, overlay_logo};
pub use matrix::{Matrix, MatrixEncoder, QrMatrixEncoder};
pub use rasterizer::{module_size_for, rasterize};
pub use rounding::{apply_rounded_corners, infer_module_pitch, PitchEstimate};
pub use service::{RenderService, RenderStatus};
pub use settings::{
    snap_pixel_size, CornerStyle, FrameKind, HexColor, LogoSettings, RedundancyLevel, RenderSettings,
    SettingsChange, DEFAULT_FRAME_TEXT, LOGO_OPACITY_MAX, LOGO_OPACITY_MIN, PIXEL_SIZE_MAX, PIXEL_SIZE_MIN,
    PIXEL_SIZE_STEP,
};
pub use source::{CodeLayout, LogoSource, RenderedCode};
