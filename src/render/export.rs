//! # 导出编码模块
//!
//! ## 设计思路
//!
//! 导出只读取 `RenderedCode`，不修改合成结果，同一结果可以反复导出。
//!
//! ## 实现思路
//!
//! - PNG：画布原样无损编码，保留透明度。
//! - JPEG：先叠加到不透明白底，再按配置质量有损编码。
//! - SVG：网格可用时逐个深色模块输出 `<rect>`（矢量路径），
//!   否则把合成位图作为单个 `<image>` 内嵌（兜底路径）。
//!   说明文字统一经过 XML 转义。

use std::fmt::Write as _;
use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbaImage};
use serde::{Deserialize, Serialize};

use super::config::SvgMode;
use super::frame::{self, DASH_GAP, DASH_LENGTH, ROUNDED_FRAME_RADIUS};
use super::logo;
use super::rasterizer::CORNER_RADIUS_RATIO;
use super::settings::{CornerStyle, FrameKind};
use super::source::RenderedCode;
use super::{RenderConfig, RenderError};

const SVG_FONT_FAMILY: &str = "Inter, sans-serif";
const SVG_FONT_SIZE: u32 = 14;

/// 导出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpeg,
    Svg,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [Self::Png, Self::Jpeg, Self::Svg];

    pub fn from_str(value: &str) -> Result<Self, RenderError> {
        match value.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "svg" => Ok(Self::Svg),
            other => Err(RenderError::InvalidSetting(format!(
                "未知导出格式：{}（可选：png / jpeg / svg）",
                other
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }
}

/// 一次导出的产物。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// 按格式导出合成结果。
pub fn export(code: &RenderedCode, format: ExportFormat, config: &RenderConfig) -> Result<ExportArtifact, RenderError> {
    let bytes = match format {
        ExportFormat::Png => encode_png(&code.surface)?,
        ExportFormat::Jpeg => encode_jpeg(&code.surface, config.jpeg_quality)?,
        ExportFormat::Svg => match (config.svg_mode, code.matrix.is_some()) {
            (SvgMode::Vector, true) => svg_vector(code, config)?.into_bytes(),
            (SvgMode::Vector, false) => {
                log::debug!("🧾 网格不可用，SVG 回退为内嵌位图");
                svg_embedded(&code.surface)?.into_bytes()
            }
            (SvgMode::Embedded, _) => svg_embedded(&code.surface)?.into_bytes(),
        },
    };

    Ok(ExportArtifact { format, bytes })
}

/// 无损 PNG 编码。
pub fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    surface
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| RenderError::Export(format!("PNG 编码失败：{}", e)))?;
    Ok(bytes)
}

/// 叠加到白底后进行 JPEG 编码。
pub fn encode_jpeg(surface: &RgbaImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    let flattened = super::surface::flatten_onto(surface, Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&flattened)
        .map_err(|e| RenderError::Export(format!("JPEG 编码失败：{}", e)))?;
    Ok(bytes)
}

/// XML 转义（`< > & ' "`）。
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn svg_error(e: std::fmt::Error) -> RenderError {
    RenderError::Export(format!("SVG 拼接失败：{}", e))
}

/// 兜底路径：整张位图作为一个 `<image>` 内嵌。
pub fn svg_embedded(surface: &RgbaImage) -> Result<String, RenderError> {
    let png = encode_png(surface)?;
    let (width, height) = surface.dimensions();
    let mut svg = String::new();
    writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#).map_err(svg_error)?;
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    )
    .map_err(svg_error)?;
    writeln!(
        svg,
        r#"  <image width="{}" height="{}" xlink:href="data:{};base64,{}"/>"#,
        width,
        height,
        ExportFormat::Png.mime_type(),
        general_purpose::STANDARD.encode(png)
    )
    .map_err(svg_error)?;
    svg.push_str("</svg>\n");
    Ok(svg)
}

/// 矢量路径：背景、逐模块矩形、边框、Logo 与说明文字。
pub fn svg_vector(code: &RenderedCode, config: &RenderConfig) -> Result<String, RenderError> {
    let matrix = code
        .matrix
        .as_ref()
        .ok_or_else(|| RenderError::Export("矢量 SVG 需要模块网格".to_string()))?;
    let layout = &code.layout;
    let settings = &code.settings;
    let fg = settings.foreground.as_str();
    let bg = settings.background.as_str();

    let mut svg = String::new();
    writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#).map_err(svg_error)?;
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = layout.width,
        h = layout.height
    )
    .map_err(svg_error)?;
    writeln!(svg, r#"  <rect width="100%" height="100%" fill="{}"/>"#, bg).map_err(svg_error)?;

    let module_size = layout.module_size;
    let offset = layout.drawn_origin();
    let corner = match settings.corner_style {
        CornerStyle::Square => String::new(),
        CornerStyle::Rounded => {
            let radius = CORNER_RADIUS_RATIO * module_size as f32;
            format!(r#" rx="{r}" ry="{r}""#, r = radius)
        }
    };
    for (row, col) in matrix.dark_modules() {
        writeln!(
            svg,
            r#"  <rect x="{}" y="{}" width="{ms}" height="{ms}"{} fill="{}"/>"#,
            offset + col as u32 * module_size,
            offset + row as u32 * module_size,
            corner,
            fg,
            ms = module_size
        )
        .map_err(svg_error)?;
    }

    write_svg_frame(&mut svg, code, config)?;

    if let (Some(logo_image), Some(logo_settings)) = (&code.logo, &settings.logo) {
        let size = logo_image.width();
        let origin = logo::logo_origin(layout, size);
        let pad_origin = origin as i64 - (config.logo_pad / 2) as i64;
        writeln!(
            svg,
            r#"  <rect x="{p}" y="{p}" width="{s}" height="{s}" fill="{}"/>"#,
            bg,
            p = pad_origin,
            s = size + config.logo_pad
        )
        .map_err(svg_error)?;
        writeln!(
            svg,
            r#"  <image x="{o}" y="{o}" width="{s}" height="{s}" opacity="{}" xlink:href="data:{};base64,{}"/>"#,
            logo_settings.opacity_percent as f32 / 100.0,
            ExportFormat::Png.mime_type(),
            general_purpose::STANDARD.encode(encode_png(logo_image)?),
            o = origin,
            s = size
        )
        .map_err(svg_error)?;
    }

    if let Some(text) = settings.effective_frame_text() {
        writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="middle" dominant-baseline="central" font-family="{}" font-size="{}" font-weight="bold" fill="{}">{}</text>"#,
            layout.width as f32 / 2.0,
            layout.square_height() as f32 + layout.caption_height as f32 / 2.0,
            SVG_FONT_FAMILY,
            SVG_FONT_SIZE,
            fg,
            escape_xml(text)
        )
        .map_err(svg_error)?;
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

fn write_svg_frame(svg: &mut String, code: &RenderedCode, config: &RenderConfig) -> Result<(), RenderError> {
    let kind = code.settings.frame;
    let Some(rect) = frame::frame_rect(kind, &code.layout, config.frame_padding) else {
        return Ok(());
    };
    let fg = code.settings.foreground.as_str();
    let stroke_width = frame::stroke_width(kind);
    // 路径穿过首末像素中心
    let (x, y) = (rect.x as f32 + 0.5, rect.y as f32 + 0.5);
    let (w, h) = (rect.width.saturating_sub(1), rect.height.saturating_sub(1));

    match kind {
        FrameKind::None => {}
        FrameKind::Simple | FrameKind::ScanMe | FrameKind::Decorative | FrameKind::Minimal => {
            let radius = match kind {
                FrameKind::ScanMe | FrameKind::Decorative => {
                    format!(r#" rx="{r}" ry="{r}""#, r = ROUNDED_FRAME_RADIUS)
                }
                _ => String::new(),
            };
            let dash = match kind {
                FrameKind::Minimal => format!(r#" stroke-dasharray="{},{}""#, DASH_LENGTH, DASH_GAP),
                _ => String::new(),
            };
            writeln!(
                svg,
                r#"  <rect x="{}" y="{}" width="{}" height="{}"{} fill="none" stroke="{}" stroke-width="{}"{}/>"#,
                x, y, w, h, radius, fg, stroke_width, dash
            )
            .map_err(svg_error)?;
        }
        FrameKind::Modern => {
            let mut path = String::new();
            for (from, to) in frame::bracket_segments(&rect) {
                write!(
                    path,
                    "M{} {} L{} {} ",
                    from.0 as f32 + 0.5,
                    from.1 as f32 + 0.5,
                    to.0 as f32 + 0.5,
                    to.1 as f32 + 0.5
                )
                .map_err(svg_error)?;
            }
            writeln!(
                svg,
                r#"  <path d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="square"/>"#,
                path.trim_end(),
                fg,
                stroke_width
            )
            .map_err(svg_error)?;
        }
    }

    Ok(())
}
