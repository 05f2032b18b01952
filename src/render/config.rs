//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `RenderConfig`，保证渲染行为可观测、可调整、可测试。
//! 与 `RenderSettings`（用户每次渲染的输入）不同，这里是进程级的管线参数。
//!
//! ## 实现思路
//!
//! - `Default` 提供与原版界面一致的几何常量（边框留白 40、说明条 30、内边距 8）。
//! - `RasterPath` / `SvgMode` 负责字符串解析与反向输出，便于 CLI 与配置文件使用。
//! - `validate` 在应用新配置前做范围校验，拒绝明显不合理的组合。

use image::imageops::FilterType;

use super::RenderError;

/// 渲染管线配置。
///
/// 字段覆盖了防抖、几何布局、Logo 加载与导出编码四个阶段。
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// 设置变更后的静默窗口（毫秒），窗口内的新请求会取消旧请求。
    pub debounce_ms: u64,
    /// 启用边框时，二维码区域四周的留白（像素）。
    pub frame_margin: u32,
    /// 启用边框时，底部说明文字条的高度（像素）。
    pub caption_height: u32,
    /// 边框描边距画布边缘的距离（像素）。
    pub frame_padding: u32,
    /// JPEG 导出质量（1~100）。
    pub jpeg_quality: u8,
    /// Logo 边长占二维码区域边长的比例。
    pub logo_scale: f32,
    /// Logo 背后清空区域比 Logo 多出的边长（像素）。
    pub logo_pad: u32,
    /// Logo 原始字节允许的最大体积（字节）。
    pub logo_max_file_size: u64,
    /// Logo 解码后的像素上限（`width * height`）。
    pub logo_max_decoded_pixels: u64,
    /// Logo 缩放滤镜。
    pub resize_filter: FilterType,
    /// 模块栅格化路径。
    pub raster_path: RasterPath,
    /// SVG 导出模式。
    pub svg_mode: SvgMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            frame_margin: 40,
            caption_height: 30,
            frame_padding: 8,
            jpeg_quality: 95,
            logo_scale: 0.2,
            logo_pad: 8,
            logo_max_file_size: 10 * 1024 * 1024,
            logo_max_decoded_pixels: 16_000_000,
            resize_filter: FilterType::Triangle,
            raster_path: RasterPath::Grid,
            svg_mode: SvgMode::Vector,
        }
    }
}

/// 模块栅格化路径。
///
/// - `Grid`：直接从布尔矩阵绘制（首选，圆角按网格坐标绘制）
/// - `EncoderBitmap`：由编码器直接输出像素，无网格可用，圆角走像素扫描兜底
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterPath {
    Grid,
    EncoderBitmap,
}

impl RasterPath {
    pub fn from_str(value: &str) -> Result<Self, RenderError> {
        match value.trim().to_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "bitmap" | "encoder-bitmap" => Ok(Self::EncoderBitmap),
            other => Err(RenderError::InvalidSetting(format!(
                "未知栅格化路径：{}（可选：grid / bitmap）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::EncoderBitmap => "bitmap",
        }
    }
}

/// SVG 导出模式。
///
/// `Vector` 在网格不可用时自动回退到 `Embedded`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvgMode {
    Vector,
    Embedded,
}

impl SvgMode {
    pub fn from_str(value: &str) -> Result<Self, RenderError> {
        match value.trim().to_lowercase().as_str() {
            "vector" => Ok(Self::Vector),
            "embedded" | "raster" => Ok(Self::Embedded),
            other => Err(RenderError::InvalidSetting(format!(
                "未知 SVG 模式：{}（可选：vector / embedded）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Embedded => "embedded",
        }
    }
}

impl RenderConfig {
    /// 校验配置取值范围。
    pub(crate) fn validate(&self) -> Result<(), RenderError> {
        if !(50..=5_000).contains(&self.debounce_ms) {
            return Err(RenderError::InvalidSetting("debounce_ms 必须在 50~5000 毫秒之间".to_string()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RenderError::InvalidSetting("jpeg_quality 必须在 1~100 之间".to_string()));
        }
        if !(self.logo_scale > 0.0 && self.logo_scale <= 0.3) {
            return Err(RenderError::InvalidSetting("logo_scale 必须在 (0, 0.3] 之间".to_string()));
        }
        if self.frame_margin > 256 || self.caption_height > 256 {
            return Err(RenderError::InvalidSetting("frame_margin 与 caption_height 不能超过 256 像素".to_string()));
        }
        if self.frame_padding >= self.frame_margin {
            return Err(RenderError::InvalidSetting("frame_padding 不能超过边框留白".to_string()));
        }
        if self.logo_max_file_size < 1024 {
            return Err(RenderError::InvalidSetting("logo_max_file_size 不能小于 1KB".to_string()));
        }
        Ok(())
    }
}
