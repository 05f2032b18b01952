//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载渲染链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 可选阶段（Logo、圆角后处理）的失败不会走到这里之外：
//! 它们在编排层被降级为“跳过该阶段”，只记录日志。

/// 渲染链路统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("内容为空，未生成二维码")]
    EmptyInput,

    #[error("编码失败：{0}")]
    Encoding(String),

    #[error("模块过密：{module_count} 个模块无法放入 {pixel_size}px")]
    ModuleTooSmall { module_count: usize, pixel_size: u32 },

    #[error("颜色无效：{0}（需要 #RRGGBB）")]
    InvalidColor(String),

    #[error("设置无效：{0}")]
    InvalidSetting(String),

    #[error("Logo 解码错误：{0}")]
    LogoDecode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("导出错误：{0}")]
    Export(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("任务错误：{0}")]
    Task(String),
}

impl RenderError {
    /// 稳定的错误码，供前端与 JSON 输出使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::Encoding(_) => "encoding_failure",
            Self::ModuleTooSmall { .. } => "module_too_small",
            Self::InvalidColor(_) => "invalid_color",
            Self::InvalidSetting(_) => "invalid_setting",
            Self::LogoDecode(_) => "logo_decode_failure",
            Self::InvalidFormat(_) => "invalid_format",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Export(_) => "export_failure",
            Self::FileSystem(_) => "file_system",
            Self::Task(_) => "task",
        }
    }

    /// 是否属于“非致命提示”：保留上一次成功渲染，仅提示用户修正输入。
    pub fn is_notice(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput | Self::Encoding(_) | Self::ModuleTooSmall { .. } | Self::InvalidColor(_)
        )
    }
}

impl From<RenderError> for String {
    fn from(error: RenderError) -> Self {
        error.to_string()
    }
}
