//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `LogoSource` 表示 Logo 的外部来源语义
//! - `RawLogoData` 表示已加载但未解码的字节
//! - `CodeLayout` 描述合成画布上的几何布局
//! - `RenderedCode` 表示可直接导出的合成结果

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::matrix::Matrix;
use super::settings::RenderSettings;

/// Logo 输入来源。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum LogoSource {
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 本地文件路径来源。
    FilePath(String),
}

impl LogoSource {
    /// 由用户输入推断来源：`data:` 开头视为 Base64，其余视为文件路径。
    ///
    /// 空值或 `none` 表示移除 Logo。
    pub fn from_input(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("none") {
            return None;
        }
        if value.starts_with("data:") {
            Some(Self::Base64(value.to_string()))
        } else {
            Some(Self::FilePath(value.to_string()))
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawLogoData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 合成画布的几何布局。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLayout {
    /// 画布宽度。
    pub width: u32,
    /// 画布高度（含说明条）。
    pub height: u32,
    /// 二维码区域（名义尺寸）左上角，x 与 y 相同。
    pub code_origin: u32,
    /// 二维码区域名义边长，即设置中的 `pixel_size`。
    pub code_region: u32,
    /// 说明条高度，未启用边框时为 0。
    pub caption_height: u32,
    /// 单个模块边长；编码器直出位图时为推断值或 0。
    pub module_size: u32,
    /// 实际绘制的二维码边长（`module_size * module_count`）。
    pub drawn_size: u32,
}

impl CodeLayout {
    /// 实际绘制区域相对名义区域居中后的左上角。
    pub fn drawn_origin(&self) -> u32 {
        self.code_origin + (self.code_region - self.drawn_size.min(self.code_region)) / 2
    }

    /// 除去说明条后的方形区域高度。
    pub fn square_height(&self) -> u32 {
        self.height - self.caption_height
    }
}

/// 一次渲染的最终产物。
#[derive(Debug, Clone)]
pub struct RenderedCode {
    /// 渲染代号：越大越新，用于丢弃过期结果。
    pub generation: u64,
    pub settings: RenderSettings,
    pub layout: CodeLayout,
    /// 网格可用时保留矩阵，供矢量 SVG 导出。
    pub matrix: Option<Arc<Matrix>>,
    /// 已缩放到目标尺寸的 Logo（成功解码时）。
    pub logo: Option<RgbaImage>,
    pub surface: RgbaImage,
}
