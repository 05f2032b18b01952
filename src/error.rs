//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级统一的 `AppError` 枚举，替代前端入口中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 命令行入口与交互模式统一返回 `Result<T, AppError>`，
//! 需要结构化输出时通过 `Serialize` 得到错误字符串。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `RenderError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串。

use serde::Serialize;

use crate::render::RenderError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 渲染流水线错误（编码 / 合成 / 导出）
    #[error("{0}")]
    Render(#[from] RenderError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 导出目录不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 设置文件读写失败
    #[error("设置错误: {0}")]
    Settings(String),
}

impl AppError {
    /// 稳定的错误码，渲染错误沿用 `RenderError::code`。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Render(err) => err.code(),
            Self::Io(_) => "io",
            Self::Storage(_) => "storage",
            Self::Settings(_) => "settings",
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
