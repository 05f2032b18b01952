//! # 模块栅格化
//!
//! ## 设计思路
//!
//! 直接从布尔网格绘制模块，这是圆角模块的首选路径：
//! 网格坐标精确可知，不需要任何像素推断。
//!
//! ## 实现思路
//!
//! - `module_size = floor(pixel_size / n)`，绘制边长 `module_size * n`。
//! - 剩余像素不拉伸，二维码在名义区域内居中。
//! - 圆角半径 `0.3 * module_size`，按像素中心采样，输出完全确定。

use image::RgbaImage;

use super::matrix::Matrix;
use super::settings::{CornerStyle, HexColor};
use super::surface;
use super::RenderError;

/// 圆角半径与模块边长之比。
pub(crate) const CORNER_RADIUS_RATIO: f32 = 0.3;

/// 计算单个模块边长；放不下时返回 `ModuleTooSmall`。
pub fn module_size_for(module_count: usize, pixel_size: u32) -> Result<u32, RenderError> {
    let module_size = if module_count == 0 {
        0
    } else {
        pixel_size / module_count as u32
    };

    if module_size == 0 {
        return Err(RenderError::ModuleTooSmall { module_count, pixel_size });
    }
    Ok(module_size)
}

/// 将矩阵绘制到 `pixel_size × pixel_size` 的画布上。
///
/// # 示例
/// ```rust
/// use qr_studio::render::{rasterize, CornerStyle, HexColor, Matrix};
///
/// let matrix = Matrix::from_rows(&[vec![true, false], vec![false, true]])?;
/// let image = rasterize(&matrix, 128, &HexColor::black(), &HexColor::white(), CornerStyle::Square)?;
/// assert_eq!(image.dimensions(), (128, 128));
/// # Ok::<(), qr_studio::render::RenderError>(())
/// ```
pub fn rasterize(
    matrix: &Matrix,
    pixel_size: u32,
    foreground: &HexColor,
    background: &HexColor,
    corner_style: CornerStyle,
) -> Result<RgbaImage, RenderError> {
    let module_count = matrix.module_count();
    let module_size = module_size_for(module_count, pixel_size)?;
    let drawn_size = module_size * module_count as u32;
    let offset = ((pixel_size - drawn_size) / 2) as i64;

    let mut image = RgbaImage::from_pixel(pixel_size, pixel_size, background.to_rgba());
    let fg = foreground.to_rgba();
    let radius = match corner_style {
        CornerStyle::Square => 0.0,
        CornerStyle::Rounded => CORNER_RADIUS_RATIO * module_size as f32,
    };

    for (row, col) in matrix.dark_modules() {
        let x = offset + (col as u32 * module_size) as i64;
        let y = offset + (row as u32 * module_size) as i64;
        surface::fill_rounded_rect(&mut image, x, y, module_size, module_size, radius, fg);
    }

    log::debug!(
        "🧱 栅格化完成 - 模块数: {} 模块边长: {}px 绘制边长: {}px 圆角: {:?}",
        module_count,
        module_size,
        drawn_size,
        corner_style
    );

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(size: usize) -> Matrix {
        let rows: Vec<Vec<bool>> = (0..size)
            .map(|r| (0..size).map(|c| (r + c) % 2 == 0).collect())
            .collect();
        Matrix::from_rows(&rows).expect("square matrix")
    }

    #[test]
    fn rasterize_is_deterministic() {
        let matrix = checker(21);
        let fg = HexColor::parse("#123456").expect("color");
        let bg = HexColor::white();
        let first = rasterize(&matrix, 256, &fg, &bg, CornerStyle::Rounded).expect("raster");
        let second = rasterize(&matrix, 256, &fg, &bg, CornerStyle::Rounded).expect("raster");
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn residual_pixels_are_centered_not_stretched() {
        // 256 / 21 = 12，绘制 252，两侧各留 2px
        let matrix = checker(21);
        let image = rasterize(&matrix, 256, &HexColor::black(), &HexColor::white(), CornerStyle::Square)
            .expect("raster");
        assert_eq!(image.dimensions(), (256, 256));
        assert_eq!(image.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
        assert_eq!(image.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(13, 13), &Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(14, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn rounded_modules_clear_their_corners() {
        let matrix = Matrix::from_rows(&[vec![true]]).expect("matrix");
        let image = rasterize(&matrix, 128, &HexColor::black(), &HexColor::white(), CornerStyle::Rounded)
            .expect("raster");
        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(image.get_pixel(64, 64), &Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(64, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn too_many_modules_is_reported() {
        let matrix = checker(200);
        let result = rasterize(&matrix, 128, &HexColor::black(), &HexColor::white(), CornerStyle::Square);
        assert!(matches!(
            result,
            Err(RenderError::ModuleTooSmall { module_count: 200, pixel_size: 128 })
        ));
    }
}
