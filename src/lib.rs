//! # 二维码工作室：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            前端（CLI 单次模式 / 交互模式）                │
//! │                                                          │
//! │  clap 参数 ── key=value 输入 ── 设置文件 (JSON)          │
//! │       │  (统一产出 SettingsChange)                       │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ content ──── 内容类型 → 编码载荷                      │
//! │  │                                                       │
//! │  ├─ render ───── 设置归约 · 防抖调度 · 合成 · 导出        │
//! │  │   ├─ rasterizer / rounding  模块绘制                   │
//! │  │   ├─ frame / logo           边框与 Logo 合成           │
//! │  │   └─ export                 PNG / JPEG / SVG           │
//! │  │                                                       │
//! │  ├─ settings ─── 设置持久化 (serde_json)                  │
//! │  └─ storage ──── 导出目录与原子写入                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`content`] | 内容格式化：按内容类型生成编码载荷 |
//! | [`render`] | 渲染设置、防抖服务、合成流水线与导出编码 |
//! | [`settings`] | `RenderSettings` 的 JSON 持久化与回退 |
//! | [`storage`] | 导出目录、文件命名与原子写入 |

pub mod content;
pub mod error;
pub mod render;
pub mod settings;
pub mod storage;
