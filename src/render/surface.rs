//! # 像素绘制原语
//!
//! ## 设计思路
//!
//! 所有绘制都落在 `RgbaImage` 上，按像素中心采样，不做抗锯齿，
//! 保证相同输入得到逐字节相同的输出。
//!
//! ## 实现思路
//!
//! - 填充类：矩形直接写像素；圆角矩形用有向距离场（SDF）判定像素中心是否在内。
//! - 描边类：路径穿过像素中心，`|d| <= 线宽 / 2` 的像素被覆盖。
//!   直角矩形使用切比雪夫距离，保证描边外角为直角。
//! - 越界坐标统一裁剪，调用方无需自行判断。

use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// 连续坐标下的矩形（像素中心位于 `i + 0.5`）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RectF {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF {
    pub(crate) fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// 描边路径：穿过首末像素中心的矩形。
    pub(crate) fn through_pixel_centers(x: i64, y: i64, w: u32, h: u32) -> Self {
        Self {
            x: x as f32 + 0.5,
            y: y as f32 + 0.5,
            w: w.saturating_sub(1) as f32,
            h: h.saturating_sub(1) as f32,
        }
    }

    /// 点到矩形边界的有向距离（内部为负）。
    ///
    /// `radius <= 0` 时使用切比雪夫距离，外角保持直角。
    pub(crate) fn signed_distance(&self, px: f32, py: f32, radius: f32) -> f32 {
        let hx = self.w / 2.0;
        let hy = self.h / 2.0;
        let r = radius.max(0.0).min(hx).min(hy);
        let qx = (px - (self.x + hx)).abs() - (hx - r);
        let qy = (py - (self.y + hy)).abs() - (hy - r);

        if r <= 0.0 {
            return qx.max(qy);
        }

        let outside = qx.max(0.0).hypot(qy.max(0.0));
        let inside = qx.max(qy).min(0.0);
        outside + inside - r
    }
}

/// 将 `[start, start + len)` 裁剪到 `[0, limit)`。
fn clip_span(start: i64, len: i64, limit: u32) -> Option<(u32, u32)> {
    let lo = start.max(0);
    let hi = (start + len).min(limit as i64);
    (lo < hi).then_some((lo as u32, hi as u32))
}

pub(crate) fn fill_rect(img: &mut RgbaImage, x: i64, y: i64, w: u32, h: u32, color: Rgba<u8>) {
    let (Some((x0, x1)), Some((y0, y1))) = (
        clip_span(x, w as i64, img.width()),
        clip_span(y, h as i64, img.height()),
    ) else {
        return;
    };

    for py in y0..y1 {
        for px in x0..x1 {
            img.put_pixel(px, py, color);
        }
    }
}

/// 以像素中心采样填充圆角矩形。
pub(crate) fn fill_rounded_rect(
    img: &mut RgbaImage,
    x: i64,
    y: i64,
    w: u32,
    h: u32,
    radius: f32,
    color: Rgba<u8>,
) {
    if radius <= 0.0 {
        fill_rect(img, x, y, w, h, color);
        return;
    }

    let (Some((x0, x1)), Some((y0, y1))) = (
        clip_span(x, w as i64, img.width()),
        clip_span(y, h as i64, img.height()),
    ) else {
        return;
    };

    let rect = RectF::new(x as f32, y as f32, w as f32, h as f32);
    for py in y0..y1 {
        for px in x0..x1 {
            if rect.signed_distance(px as f32 + 0.5, py as f32 + 0.5, radius) <= 0.0 {
                img.put_pixel(px, py, color);
            }
        }
    }
}

/// 描边矩形路径（可带圆角）。
pub(crate) fn stroke_rect(img: &mut RgbaImage, path: RectF, radius: f32, line_width: u32, color: Rgba<u8>) {
    let half = line_width as f32 / 2.0;
    let x0 = (path.x - half).floor().max(0.0) as u32;
    let y0 = (path.y - half).floor().max(0.0) as u32;
    let x1 = ((path.x + path.w + half).ceil().max(0.0) as u32).min(img.width());
    let y1 = ((path.y + path.h + half).ceil().max(0.0) as u32).min(img.height());

    for py in y0..y1 {
        for px in x0..x1 {
            let d = path.signed_distance(px as f32 + 0.5, py as f32 + 0.5, radius);
            if d.abs() <= half {
                img.put_pixel(px, py, color);
            }
        }
    }
}

/// 以像素 `(cx, cy)` 为中心绘制线宽大小的方形笔触。
fn stamp(img: &mut RgbaImage, cx: i64, cy: i64, line_width: u32, color: Rgba<u8>) {
    let offset = (line_width / 2) as i64;
    fill_rect(img, cx - offset, cy - offset, line_width, line_width, color);
}

/// 轴对齐线段（方形端帽，端点各外延半个线宽）。
pub(crate) fn stroke_segment(
    img: &mut RgbaImage,
    from: (i64, i64),
    to: (i64, i64),
    line_width: u32,
    color: Rgba<u8>,
) {
    let offset = (line_width / 2) as i64;
    let (left, right) = (from.0.min(to.0), from.0.max(to.0));
    let (top, bottom) = (from.1.min(to.1), from.1.max(to.1));
    fill_rect(
        img,
        left - offset,
        top - offset,
        (right - left) as u32 + line_width,
        (bottom - top) as u32 + line_width,
        color,
    );
}

/// 虚线矩形：沿路径累计弧长，`弧长 mod (dash + gap) < dash` 的位置落笔。
///
/// 矩形以像素索引给出，路径穿过四条边的像素中心。
pub(crate) fn stroke_dashed_rect(
    img: &mut RgbaImage,
    x: i64,
    y: i64,
    w: u32,
    h: u32,
    line_width: u32,
    dash: u32,
    gap: u32,
    color: Rgba<u8>,
) {
    if w < 2 || h < 2 {
        return;
    }

    let period = (dash + gap).max(1) as i64;
    let (left, top) = (x, y);
    let (right, bottom) = (x + w as i64 - 1, y + h as i64 - 1);
    let mut arc: i64 = 0;
    let mut visit = |img: &mut RgbaImage, px: i64, py: i64| {
        if arc % period < dash as i64 {
            stamp(img, px, py, line_width, color);
        }
        arc += 1;
    };

    for px in left..right {
        visit(img, px, top);
    }
    for py in top..bottom {
        visit(img, right, py);
    }
    for px in ((left + 1)..=right).rev() {
        visit(img, px, bottom);
    }
    for py in ((top + 1)..=bottom).rev() {
        visit(img, left, py);
    }
}

/// 源像素叠加到目标像素（source-over），`global_alpha` 为额外的整体不透明度。
pub(crate) fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>, global_alpha: f32) {
    let src_a = (src[3] as f32 / 255.0) * global_alpha.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }

    let mut out = [0u8; 4];
    for channel in 0..3 {
        let s = src[channel] as f32 / 255.0;
        let d = dst[channel] as f32 / 255.0;
        let value = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
        out[channel] = (value * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    *dst = Rgba(out);
}

/// 将整张图叠加到不透明底色上，输出不含 alpha 的 RGB 图。
pub(crate) fn flatten_onto(img: &RgbaImage, backdrop: Rgb<u8>) -> RgbImage {
    let [br, bg, bb] = backdrop.0;
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let mut pixel = Rgba([br, bg, bb, 255]);
        blend_pixel(&mut pixel, *img.get_pixel(x, y), 1.0);
        Rgb([pixel[0], pixel[1], pixel[2]])
    })
}

/// 像素分类：RGB 均值低于 128 视为深色。
pub(crate) fn is_dark(pixel: &Rgba<u8>) -> bool {
    let sum = pixel[0] as u32 + pixel[1] as u32 + pixel[2] as u32;
    sum < 128 * 3
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn count(img: &RgbaImage, color: Rgba<u8>) -> usize {
        img.pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut img = RgbaImage::from_pixel(10, 10, WHITE);
        fill_rect(&mut img, -5, 8, 8, 8, BLACK);
        assert_eq!(count(&img, BLACK), 3 * 2);
    }

    #[test]
    fn rounded_fill_trims_corners_only() {
        let mut img = RgbaImage::from_pixel(10, 10, WHITE);
        fill_rounded_rect(&mut img, 0, 0, 10, 10, 3.0, BLACK);
        assert_eq!(img.get_pixel(0, 0), &WHITE);
        assert_eq!(img.get_pixel(9, 9), &WHITE);
        assert_eq!(img.get_pixel(5, 0), &BLACK);
        assert_eq!(img.get_pixel(5, 5), &BLACK);
    }

    #[test]
    fn square_stroke_has_exact_width() {
        let mut img = RgbaImage::from_pixel(40, 40, WHITE);
        stroke_rect(&mut img, RectF::through_pixel_centers(8, 8, 24, 24), 0.0, 3, BLACK);
        // 左边：第 7~9 列
        for x in 7..=9 {
            assert_eq!(img.get_pixel(x, 20), &BLACK, "column {x}");
        }
        assert_eq!(img.get_pixel(6, 20), &WHITE);
        assert_eq!(img.get_pixel(10, 20), &WHITE);
        // 右边：第 30~32 列，与左边对称
        assert_eq!(img.get_pixel(32, 20), &BLACK);
        assert_eq!(img.get_pixel(33, 20), &WHITE);
        // 外角为直角
        assert_eq!(img.get_pixel(7, 7), &BLACK);
    }

    #[test]
    fn dashed_rect_alternates() {
        let mut img = RgbaImage::from_pixel(40, 40, WHITE);
        stroke_dashed_rect(&mut img, 0, 0, 40, 40, 1, 5, 5, BLACK);
        for x in 0..5 {
            assert_eq!(img.get_pixel(x, 0), &BLACK);
        }
        for x in 5..10 {
            assert_eq!(img.get_pixel(x, 0), &WHITE);
        }
        assert_eq!(img.get_pixel(20, 20), &WHITE);
    }

    #[test]
    fn blend_respects_global_alpha() {
        let mut dst = WHITE;
        blend_pixel(&mut dst, BLACK, 0.5);
        assert_eq!(dst, Rgba([128, 128, 128, 255]));

        let mut untouched = WHITE;
        blend_pixel(&mut untouched, BLACK, 0.0);
        assert_eq!(untouched, WHITE);
    }

    #[test]
    fn flatten_uses_backdrop_for_transparent_pixels() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let flat = flatten_onto(&img, Rgb([255, 255, 255]));
        assert!(flat.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn darkness_uses_channel_average() {
        assert!(is_dark(&Rgba([0, 0, 255, 255])));
        assert!(!is_dark(&Rgba([200, 200, 0, 255])));
    }
}
