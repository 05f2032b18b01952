//! # 圆角后处理（像素域兜底）
//!
//! ## 设计思路
//!
//! 只在拿不到网格时使用：编码器直接输出了方形模块位图，
//! 需要在像素域推断模块间距并重绘为圆角模块。
//!
//! 这是近似算法：采样行恰好落在静区中线，或边界被抗锯齿模糊时会误判。
//! 以中间行阈值采样作为可复现的标准行为保留。
//!
//! ## 实现思路
//!
//! 1. 取中间一行，按 RGB 均值 < 128 分类，只在明暗切换时记录游程，取最短游程。
//! 2. 游程钳制到 [3, 20] 作为间距；实测值小于 3 时放弃处理，原图不变。
//! 3. 清空为背景色，按间距走格子，取格子中心像素判定，深色则画圆角方块。

use image::RgbaImage;

use super::rasterizer::CORNER_RADIUS_RATIO;
use super::settings::HexColor;
use super::surface;

pub(crate) const PITCH_MIN: u32 = 3;
pub(crate) const PITCH_MAX: u32 = 20;

/// 间距推断结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchEstimate {
    /// 中间行实测的最短游程。
    pub measured: u32,
    /// 钳制到 [3, 20] 后的间距。
    pub pitch: u32,
}

impl PitchEstimate {
    /// 实测间距过小，无法可靠地圆角化。
    pub fn is_too_small(&self) -> bool {
        self.measured < PITCH_MIN
    }
}

/// 扫描中间行推断模块间距。
///
/// 整行没有明暗切换时以整行宽度作为实测值。
/// 右边缘的末段游程没有终止切换，不参与最短游程比较。
pub fn infer_module_pitch(image: &RgbaImage) -> PitchEstimate {
    let width = image.width();
    let row = image.height() / 2;

    let mut shortest: Option<u32> = None;
    let mut last_dark = false;
    let mut run = 0u32;

    for x in 0..width {
        let dark = surface::is_dark(image.get_pixel(x, row));
        if dark == last_dark {
            run += 1;
            continue;
        }
        if run > 0 {
            shortest = Some(shortest.map_or(run, |s| s.min(run)));
        }
        last_dark = dark;
        run = 1;
    }

    let measured = shortest.unwrap_or(width);
    PitchEstimate {
        measured,
        pitch: measured.clamp(PITCH_MIN, PITCH_MAX),
    }
}

/// 将方形模块位图重绘为圆角模块。
///
/// 返回 `false` 表示间距过小已放弃，图像保持原样。
pub fn apply_rounded_corners(image: &mut RgbaImage, foreground: &HexColor, background: &HexColor) -> bool {
    if image.width() == 0 || image.height() == 0 {
        return false;
    }

    let estimate = infer_module_pitch(image);
    if estimate.is_too_small() {
        log::warn!(
            "⚠️ 模块间距过小（实测 {}px），跳过圆角后处理",
            estimate.measured
        );
        return false;
    }

    let pitch = estimate.pitch;
    let source = image.clone();
    let (width, height) = source.dimensions();
    let fg = foreground.to_rgba();
    let radius = CORNER_RADIUS_RATIO * pitch as f32;

    for pixel in image.pixels_mut() {
        *pixel = background.to_rgba();
    }

    for y in (0..height).step_by(pitch as usize) {
        for x in (0..width).step_by(pitch as usize) {
            let cx = (x + pitch / 2).min(width - 1);
            let cy = (y + pitch / 2).min(height - 1);
            if surface::is_dark(source.get_pixel(cx, cy)) {
                surface::fill_rounded_rect(image, x as i64, y as i64, pitch, pitch, radius, fg);
            }
        }
    }

    log::debug!(
        "🔵 圆角后处理完成 - 实测间距: {}px 使用间距: {}px",
        estimate.measured,
        pitch
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    /// 竖条纹：每 `stripe` 像素交替一次明暗。
    fn stripes(size: u32, stripe: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, _| if (x / stripe) % 2 == 0 { BLACK } else { WHITE })
    }

    #[test]
    fn one_pixel_pitch_clamps_and_aborts() {
        let mut image = stripes(64, 1);
        let estimate = infer_module_pitch(&image);
        assert_eq!(estimate.measured, 1);
        assert_eq!(estimate.pitch, 3);

        let before = image.clone();
        let applied = apply_rounded_corners(&mut image, &HexColor::black(), &HexColor::white());
        assert!(!applied);
        assert_eq!(image.as_raw(), before.as_raw());
    }

    #[test]
    fn wide_pitch_clamps_to_twenty() {
        let image = stripes(200, 40);
        let estimate = infer_module_pitch(&image);
        assert_eq!(estimate.measured, 40);
        assert_eq!(estimate.pitch, 20);
    }

    #[test]
    fn trailing_edge_run_is_ignored() {
        let image = RgbaImage::from_fn(30, 30, |x, _| if (8..28).contains(&x) { BLACK } else { WHITE });
        let estimate = infer_module_pitch(&image);
        assert_eq!(estimate.measured, 8);
        assert_eq!(estimate.pitch, 8);
    }

    #[test]
    fn uniform_row_uses_full_width() {
        let image = RgbaImage::from_pixel(50, 50, WHITE);
        let estimate = infer_module_pitch(&image);
        assert_eq!(estimate.measured, 50);
        assert_eq!(estimate.pitch, 20);
    }

    #[test]
    fn rounding_redraws_modules_with_soft_corners() {
        let mut image = stripes(40, 10);
        let applied = apply_rounded_corners(&mut image, &HexColor::black(), &HexColor::white());
        assert!(applied);
        // 第一个深色格子：中心保留深色，角点被圆角清空
        assert_eq!(image.get_pixel(5, 5), &BLACK);
        assert_eq!(image.get_pixel(0, 0), &WHITE);
        assert_eq!(image.get_pixel(15, 5), &WHITE);
    }
}
