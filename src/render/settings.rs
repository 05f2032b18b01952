//! # 渲染设置与状态归约模块
//!
//! ## 设计思路
//!
//! `RenderSettings` 是一次渲染的不可变输入值。界面事件不直接修改共享状态，
//! 而是产出一个 `SettingsChange`，经 `reduce` 得到新的设置值再交给渲染服务。
//! 状态转换与渲染触发因此完全解耦。
//!
//! ## 实现思路
//!
//! - 颜色使用 `HexColor` 新类型，构造即校验（`^#[0-9A-Fa-f]{6}$`），保留原始大小写。
//! - 像素尺寸吸附到 32 的倍数并限制在 [128, 512]。
//! - `reduce` 返回 `None` 表示“被拒绝或无变化”，调用方据此不触发渲染。

use std::fmt;

use image::Rgba;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::source::LogoSource;
use super::RenderError;
use crate::content::{self, ContentType};

pub const PIXEL_SIZE_MIN: u32 = 128;
pub const PIXEL_SIZE_MAX: u32 = 512;
pub const PIXEL_SIZE_STEP: u32 = 32;
pub const LOGO_OPACITY_MIN: u8 = 20;
pub const LOGO_OPACITY_MAX: u8 = 100;
pub const DEFAULT_FRAME_TEXT: &str = "Scan me";

/// 预编译的颜色校验正则。
static HEX_COLOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern is valid"));

/// 经过校验的 `#RRGGBB` 颜色。
///
/// 保留用户输入的原始文本，便于颜色选择器原样回显。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    text: String,
    rgb: [u8; 3],
}

impl HexColor {
    /// 解析并校验颜色文本。
    ///
    /// # 示例
    /// ```rust
    /// use qr_studio::render::HexColor;
    ///
    /// let color = HexColor::parse("#1a2b3c")?;
    /// assert_eq!(color.as_str(), "#1a2b3c");
    /// assert_eq!(color.rgb(), [0x1a, 0x2b, 0x3c]);
    /// assert!(HexColor::parse("#ZZZZZZ").is_err());
    /// # Ok::<(), qr_studio::render::RenderError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self, RenderError> {
        if !HEX_COLOR_PATTERN.is_match(text) {
            return Err(RenderError::InvalidColor(text.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&text[range], 16).map_err(|_| RenderError::InvalidColor(text.to_string()))
        };

        Ok(Self {
            rgb: [channel(1..3)?, channel(3..5)?, channel(5..7)?],
            text: text.to_string(),
        })
    }

    pub fn black() -> Self {
        Self { text: "#000000".to_string(), rgb: [0, 0, 0] }
    }

    pub fn white() -> Self {
        Self { text: "#ffffff".to_string(), rgb: [255, 255, 255] }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn rgb(&self) -> [u8; 3] {
        self.rgb
    }

    pub fn to_rgba(&self) -> Rgba<u8> {
        let [r, g, b] = self.rgb;
        Rgba([r, g, b, 255])
    }
}

impl TryFrom<String> for HexColor {
    type Error = RenderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.text
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// 纠错等级（恢复能力 7% / 15% / 25% / 30%）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RedundancyLevel {
    L,
    M,
    Q,
    H,
}

impl RedundancyLevel {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "L" => Some(Self::L),
            "M" => Some(Self::M),
            "Q" => Some(Self::Q),
            "H" => Some(Self::H),
            _ => None,
        }
    }

    pub fn recovery_percent(self) -> u8 {
        match self {
            Self::L => 7,
            Self::M => 15,
            Self::Q => 25,
            Self::H => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerStyle {
    Square,
    Rounded,
}

impl CornerStyle {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "square" => Some(Self::Square),
            "rounded" => Some(Self::Rounded),
            _ => None,
        }
    }
}

/// 边框样式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    None,
    Simple,
    #[serde(rename = "scanme")]
    ScanMe,
    Decorative,
    Modern,
    Minimal,
}

impl FrameKind {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "none" => Some(Self::None),
            "simple" => Some(Self::Simple),
            "scanme" | "scan-me" => Some(Self::ScanMe),
            "decorative" => Some(Self::Decorative),
            "modern" => Some(Self::Modern),
            "minimal" => Some(Self::Minimal),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        self != Self::None
    }
}

/// Logo 设置：来源 + 不透明度百分比（20~100）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoSettings {
    pub source: LogoSource,
    pub opacity_percent: u8,
}

/// 单次渲染的完整设置（不可变值）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderSettings {
    pub content_type: ContentType,
    pub raw_value: String,
    pub pixel_size: u32,
    pub redundancy_level: RedundancyLevel,
    pub foreground: HexColor,
    pub background: HexColor,
    pub corner_style: CornerStyle,
    pub logo: Option<LogoSettings>,
    pub frame: FrameKind,
    pub frame_text: String,
    /// 仅作展示标记，没有后端行为。
    pub scan_tracking_enabled: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            content_type: ContentType::Url,
            raw_value: String::new(),
            pixel_size: 256,
            redundancy_level: RedundancyLevel::M,
            foreground: HexColor::black(),
            background: HexColor::white(),
            corner_style: CornerStyle::Square,
            logo: None,
            frame: FrameKind::None,
            frame_text: DEFAULT_FRAME_TEXT.to_string(),
            scan_tracking_enabled: false,
        }
    }
}

/// 一次界面事件带来的局部变更。
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsChange {
    /// 切换内容类型，同时清空输入。
    ContentType(ContentType),
    RawValue(String),
    /// 文件上传：只记录文件名引用。
    FileUploaded(String),
    PixelSize(u32),
    RedundancyLevel(RedundancyLevel),
    /// 颜色选择器：值已合法。
    Foreground(HexColor),
    Background(HexColor),
    /// 自由文本颜色输入：需要校验。
    ForegroundText(String),
    BackgroundText(String),
    CornerStyle(CornerStyle),
    Logo(Option<LogoSource>),
    LogoOpacity(u8),
    Frame(FrameKind),
    FrameText(String),
    ScanTracking(bool),
    Reset,
}

impl SettingsChange {
    /// 由 `key=value` 文本解析一次变更，供命令行与交互输入共用。
    ///
    /// 只做语法解析；颜色等取值校验仍由 `reduce` 负责。
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, RenderError> {
        let invalid = |what: &str| RenderError::InvalidSetting(format!("{}：{}", what, value));

        let change = match key.trim().to_lowercase().as_str() {
            "type" | "content-type" => Self::ContentType(
                ContentType::from_str(value).ok_or_else(|| invalid("未知内容类型"))?,
            ),
            "value" | "text" => Self::RawValue(value.to_string()),
            "file" => Self::FileUploaded(value.trim().to_string()),
            "size" | "pixel-size" => Self::PixelSize(
                value.trim().parse().map_err(|_| invalid("像素尺寸必须是整数"))?,
            ),
            "level" | "redundancy" => Self::RedundancyLevel(
                RedundancyLevel::from_str(value).ok_or_else(|| invalid("未知纠错等级"))?,
            ),
            "fg" | "foreground" => Self::ForegroundText(value.trim().to_string()),
            "bg" | "background" => Self::BackgroundText(value.trim().to_string()),
            "corner" | "corner-style" => Self::CornerStyle(
                CornerStyle::from_str(value).ok_or_else(|| invalid("未知圆角样式"))?,
            ),
            "logo" => Self::Logo(LogoSource::from_input(value)),
            "logo-opacity" | "opacity" => {
                let percent: u32 = value.trim().parse().map_err(|_| invalid("不透明度必须是整数"))?;
                Self::LogoOpacity(percent.min(u8::MAX as u32) as u8)
            }
            "frame" => Self::Frame(FrameKind::from_str(value).ok_or_else(|| invalid("未知边框样式"))?),
            "frame-text" | "caption" => Self::FrameText(value.to_string()),
            "tracking" | "scan-tracking" => Self::ScanTracking(match value.trim().to_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => return Err(invalid("无法识别的开关值")),
            }),
            "reset" => Self::Reset,
            other => {
                return Err(RenderError::InvalidSetting(format!("未知设置项：{}", other)));
            }
        };

        Ok(change)
    }
}

/// 将像素尺寸吸附到最近的 32 的倍数，并限制在合法范围内。
pub fn snap_pixel_size(value: u32) -> u32 {
    let clamped = value.clamp(PIXEL_SIZE_MIN, PIXEL_SIZE_MAX);
    let snapped = (clamped + PIXEL_SIZE_STEP / 2) / PIXEL_SIZE_STEP * PIXEL_SIZE_STEP;
    snapped.clamp(PIXEL_SIZE_MIN, PIXEL_SIZE_MAX)
}

impl RenderSettings {
    /// 归约：由当前设置与一次变更得到下一份设置。
    ///
    /// 返回 `None` 表示变更被拒绝（如非法颜色文本）或无实际变化，
    /// 调用方不应触发渲染。
    pub fn reduce(&self, change: SettingsChange) -> Option<RenderSettings> {
        let mut next = self.clone();

        match change {
            SettingsChange::ContentType(kind) => {
                next.content_type = kind;
                next.raw_value.clear();
            }
            SettingsChange::RawValue(value) => next.raw_value = value,
            SettingsChange::FileUploaded(file_name) => {
                next.raw_value = content::file_reference(&file_name);
            }
            SettingsChange::PixelSize(size) => next.pixel_size = snap_pixel_size(size),
            SettingsChange::RedundancyLevel(level) => next.redundancy_level = level,
            SettingsChange::Foreground(color) => next.foreground = color,
            SettingsChange::Background(color) => next.background = color,
            SettingsChange::ForegroundText(text) => match HexColor::parse(&text) {
                Ok(color) => next.foreground = color,
                Err(err) => {
                    log::debug!("🎨 前景色输入被拒绝，保留原值：{}", err);
                    return None;
                }
            },
            SettingsChange::BackgroundText(text) => match HexColor::parse(&text) {
                Ok(color) => next.background = color,
                Err(err) => {
                    log::debug!("🎨 背景色输入被拒绝，保留原值：{}", err);
                    return None;
                }
            },
            SettingsChange::CornerStyle(style) => next.corner_style = style,
            SettingsChange::Logo(source) => {
                next.logo = source.map(|source| LogoSettings {
                    source,
                    opacity_percent: self
                        .logo
                        .as_ref()
                        .map(|logo| logo.opacity_percent)
                        .unwrap_or(LOGO_OPACITY_MAX),
                });
            }
            SettingsChange::LogoOpacity(percent) => {
                let logo = next.logo.as_mut()?;
                logo.opacity_percent = percent.clamp(LOGO_OPACITY_MIN, LOGO_OPACITY_MAX);
            }
            SettingsChange::Frame(kind) => next.frame = kind,
            SettingsChange::FrameText(text) => next.frame_text = text,
            SettingsChange::ScanTracking(enabled) => next.scan_tracking_enabled = enabled,
            SettingsChange::Reset => next = RenderSettings::default(),
        }

        (next != *self).then_some(next)
    }

    /// 修正反序列化等外部来源带入的越界值。
    pub fn normalized(mut self) -> Self {
        self.pixel_size = snap_pixel_size(self.pixel_size);
        if let Some(logo) = self.logo.as_mut() {
            logo.opacity_percent = logo.opacity_percent.clamp(LOGO_OPACITY_MIN, LOGO_OPACITY_MAX);
        }
        self
    }

    /// 校验像素尺寸：必须是 32 的倍数且位于 [128, 512]。
    ///
    /// `reduce` 与 `normalized` 产出的设置总是满足；直接构造的设置可能不满足。
    pub fn check_pixel_size(&self) -> Result<(), RenderError> {
        let size = self.pixel_size;
        if !(PIXEL_SIZE_MIN..=PIXEL_SIZE_MAX).contains(&size) || size % PIXEL_SIZE_STEP != 0 {
            return Err(RenderError::InvalidSetting(format!(
                "像素尺寸 {} 无效（须为 {}~{} 之间 {} 的倍数）",
                size, PIXEL_SIZE_MIN, PIXEL_SIZE_MAX, PIXEL_SIZE_STEP
            )));
        }
        Ok(())
    }

    /// 输入是否非空（仅空白视为空）。
    pub fn has_content(&self) -> bool {
        !self.raw_value.trim().is_empty()
    }

    /// 交给编码器的最终载荷。
    pub fn payload(&self) -> String {
        content::format_payload(self.content_type, &self.raw_value)
    }

    /// 启用边框时的说明文字，空文本回退为默认值。
    pub fn effective_frame_text(&self) -> Option<&str> {
        if !self.frame.is_active() {
            return None;
        }
        if self.frame_text.trim().is_empty() {
            Some(DEFAULT_FRAME_TEXT)
        } else {
            Some(&self.frame_text)
        }
    }
}
