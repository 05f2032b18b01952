//! # 边框合成
//!
//! ## 设计思路
//!
//! 边框与说明文字都画在合成画布上，二者只依赖 `CodeLayout` 给出的几何信息，
//! 与模块绘制路径（网格 / 编码器位图）无关。
//!
//! ## 实现思路
//!
//! - `simple` 只包住方形区域；其余样式向下延伸，覆盖说明条。
//! - 描边路径穿过像素中心，左右、上下对称。
//! - 说明文字使用 8×8 点阵字形放大两倍，右移 1px 重绘一次模拟粗体，水平居中，不换行。

use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};

use super::settings::FrameKind;
use super::source::CodeLayout;
use super::surface::{self, RectF};

pub(crate) const FRAME_STROKE_WIDTH: u32 = 3;
pub(crate) const MINIMAL_STROKE_WIDTH: u32 = 1;
pub(crate) const ROUNDED_FRAME_RADIUS: f32 = 12.0;
pub(crate) const BRACKET_ARM_LENGTH: u32 = 20;
pub(crate) const DASH_LENGTH: u32 = 5;
pub(crate) const DASH_GAP: u32 = 5;

const GLYPH_SIZE: u32 = 8;
const GLYPH_SCALE: u32 = 2;
const BOLD_OFFSET: u32 = 1;

/// 边框矩形（像素索引），供位图与矢量两条导出路径共用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameRect {
    pub fn right(&self) -> u32 {
        self.x + self.width.saturating_sub(1)
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height.saturating_sub(1)
    }
}

/// 计算边框矩形；`none` 或画布过小时返回 `None`。
pub fn frame_rect(kind: FrameKind, layout: &CodeLayout, padding: u32) -> Option<FrameRect> {
    if !kind.is_active() {
        return None;
    }

    let bottom_edge = match kind {
        FrameKind::Simple => layout.square_height(),
        _ => layout.height,
    };
    let width = layout.width.checked_sub(padding * 2)?;
    let height = bottom_edge.checked_sub(padding * 2)?;
    if width < 2 || height < 2 {
        return None;
    }

    Some(FrameRect { x: padding, y: padding, width, height })
}

/// 描边宽度：`minimal` 为 1px，其余 3px。
pub fn stroke_width(kind: FrameKind) -> u32 {
    match kind {
        FrameKind::Minimal => MINIMAL_STROKE_WIDTH,
        _ => FRAME_STROKE_WIDTH,
    }
}

/// 四个 L 形角标的线段，每个角两段，从角点出发。
pub fn bracket_segments(rect: &FrameRect) -> [((u32, u32), (u32, u32)); 8] {
    let arm = BRACKET_ARM_LENGTH.min(rect.width / 2).min(rect.height / 2);
    let (l, t, r, b) = (rect.x, rect.y, rect.right(), rect.bottom());
    [
        ((l, t), (l + arm, t)),
        ((l, t), (l, t + arm)),
        ((r, t), (r - arm, t)),
        ((r, t), (r, t + arm)),
        ((l, b), (l + arm, b)),
        ((l, b), (l, b - arm)),
        ((r, b), (r - arm, b)),
        ((r, b), (r, b - arm)),
    ]
}

/// 在画布上绘制边框。
pub fn draw_frame(surface: &mut RgbaImage, kind: FrameKind, color: Rgba<u8>, layout: &CodeLayout, padding: u32) {
    let Some(rect) = frame_rect(kind, layout, padding) else {
        return;
    };
    let line_width = stroke_width(kind);
    let path = RectF::through_pixel_centers(rect.x as i64, rect.y as i64, rect.width, rect.height);

    match kind {
        FrameKind::None => {}
        FrameKind::Simple => surface::stroke_rect(surface, path, 0.0, line_width, color),
        FrameKind::ScanMe | FrameKind::Decorative => {
            surface::stroke_rect(surface, path, ROUNDED_FRAME_RADIUS, line_width, color)
        }
        FrameKind::Modern => {
            for (from, to) in bracket_segments(&rect) {
                surface::stroke_segment(
                    surface,
                    (from.0 as i64, from.1 as i64),
                    (to.0 as i64, to.1 as i64),
                    line_width,
                    color,
                );
            }
        }
        FrameKind::Minimal => surface::stroke_dashed_rect(
            surface,
            rect.x as i64,
            rect.y as i64,
            rect.width,
            rect.height,
            line_width,
            DASH_LENGTH,
            DASH_GAP,
            color,
        ),
    }
}

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// 说明文字渲染后的像素宽度。
pub fn caption_width(text: &str) -> u32 {
    let count = text.chars().count() as u32;
    if count == 0 {
        0
    } else {
        count * GLYPH_SIZE * GLYPH_SCALE + BOLD_OFFSET
    }
}

/// 在说明条内居中绘制说明文字。
///
/// 文字超出画布宽度时两侧被裁剪，不做截断或换行。
pub fn draw_caption(surface: &mut RgbaImage, text: &str, color: Rgba<u8>, layout: &CodeLayout) {
    if text.is_empty() || layout.caption_height == 0 {
        return;
    }

    let glyph_height = GLYPH_SIZE * GLYPH_SCALE;
    let origin_x = (layout.width as i64 - caption_width(text) as i64) / 2;
    let origin_y = layout.square_height() as i64 + (layout.caption_height as i64 - glyph_height as i64) / 2;

    for (index, ch) in text.chars().enumerate() {
        let bitmap = glyph(ch);
        let glyph_x = origin_x + (index as u32 * GLYPH_SIZE * GLYPH_SCALE) as i64;
        for (row, bits) in bitmap.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let x = glyph_x + (col * GLYPH_SCALE) as i64;
                let y = origin_y + (row as u32 * GLYPH_SCALE) as i64;
                surface::fill_rect(surface, x, y, GLYPH_SCALE, GLYPH_SCALE, color);
                surface::fill_rect(surface, x + BOLD_OFFSET as i64, y, GLYPH_SCALE, GLYPH_SCALE, color);
            }
        }
    }
}
