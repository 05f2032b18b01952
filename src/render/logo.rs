//! # Logo 解码与叠加模块
//!
//! ## 设计思路
//!
//! Logo 解码是整条管线唯一的异步挂起点：在阻塞线程池里完成加载、解码与缩放，
//! 渲染编排层等待其完成（或失败）后再合成。
//!
//! 失败从不向上传播：编排层记录警告并跳过叠加，输出与未设置 Logo 时逐字节相同。
//!
//! ## 实现思路
//!
//! 0. SVG 直接用 `resvg` 栅格化到目标尺寸，不经过位图解码
//! 1. 读取 header 尺寸，按像素上限快速拒绝
//! 2. 完整解码并再次校验
//! 3. 拉伸到正方形目标尺寸（不保持宽高比），优先 `fast_image_resize`
//! 4. 叠加：先把 `目标 + pad` 的方块清成背景色，再以 `opacity / 100` 的整体透明度混合

use std::io::Cursor;

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};

use super::loader::looks_like_svg;
use super::source::{CodeLayout, LogoSource, RawLogoData};
use super::surface;
use super::{RenderConfig, RenderError, RenderHandler};

/// Logo 目标边长：`logo_scale × 二维码区域边长`，至少 1px。
pub fn logo_target_size(layout: &CodeLayout, config: &RenderConfig) -> u32 {
    ((config.logo_scale * layout.code_region as f32).round() as u32).max(1)
}

/// Logo 在画布上的左上角（居中于二维码名义区域）。
pub fn logo_origin(layout: &CodeLayout, target_size: u32) -> u32 {
    layout.code_origin + layout.code_region.saturating_sub(target_size) / 2
}

impl RenderHandler {
    /// 在阻塞线程池中加载、解码并缩放 Logo。
    pub(super) async fn prepare_logo(
        source: LogoSource,
        target_size: u32,
        config: RenderConfig,
    ) -> Result<RgbaImage, RenderError> {
        tokio::task::spawn_blocking(move || {
            let raw = Self::load_logo(&source, &config)?;
            Self::decode_logo(raw, target_size, &config)
        })
        .await
        .map_err(|e| RenderError::Task(format!("Logo 解码任务失败：{}", e)))?
    }

    /// 将原始字节解码为目标尺寸的 RGBA Logo。
    pub(super) fn decode_logo(
        raw: RawLogoData,
        target_size: u32,
        config: &RenderConfig,
    ) -> Result<RgbaImage, RenderError> {
        if looks_like_svg(&raw.bytes) {
            let rasterized = Self::rasterize_svg(&raw.bytes, target_size)?;
            log::debug!(
                "✅ SVG Logo 栅格化成功 - 来源: {} 输出尺寸: {}x{}",
                raw.source_hint,
                target_size,
                target_size
            );
            return Ok(rasterized);
        }

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| RenderError::LogoDecode(format!("图片解码失败：{}", e)))?;

        let (raw_width, raw_height) = decoded.dimensions();
        Self::validate_pixel_limits(config, raw_width, raw_height)?;
        if raw_width == 0 || raw_height == 0 {
            return Err(RenderError::LogoDecode("图片尺寸为 0".to_string()));
        }

        let resized = match Self::resize_with_fast_image_resize(&decoded, target_size, config.resize_filter) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("⚠️ fast_image_resize 缩放失败，回退到 image::resize_exact：{}", e);
                decoded
                    .resize_exact(target_size, target_size, config.resize_filter)
                    .to_rgba8()
            }
        };

        log::debug!(
            "✅ Logo 解码成功 - 来源: {} 原始尺寸: {}x{} 输出尺寸: {}x{}",
            raw.source_hint,
            raw_width,
            raw_height,
            target_size,
            target_size
        );

        Ok(resized)
    }

    /// 把 SVG 拉伸绘制到 `target_size` 见方的画布上（与位图一致，不保持宽高比）。
    fn rasterize_svg(bytes: &[u8], target_size: u32) -> Result<RgbaImage, RenderError> {
        let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
            .map_err(|e| RenderError::LogoDecode(format!("SVG 解析失败：{}", e)))?;

        let size = tree.size();
        if size.width() <= 0.0 || size.height() <= 0.0 {
            return Err(RenderError::LogoDecode("SVG 尺寸为 0".to_string()));
        }

        let mut pixmap = tiny_skia::Pixmap::new(target_size, target_size)
            .ok_or_else(|| RenderError::LogoDecode(format!("无法创建 {0}x{0} 的 SVG 画布", target_size)))?;
        let transform = tiny_skia::Transform::from_scale(
            target_size as f32 / size.width(),
            target_size as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // tiny-skia 输出预乘 alpha，混合前还原为直通 alpha
        let mut image = RgbaImage::new(target_size, target_size);
        for (pixel, source) in image.pixels_mut().zip(pixmap.pixels()) {
            let color = source.demultiply();
            *pixel = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        }
        Ok(image)
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), RenderError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| RenderError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| RenderError::LogoDecode(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(config: &RenderConfig, width: u32, height: u32) -> Result<(), RenderError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| RenderError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.logo_max_decoded_pixels {
            return Err(RenderError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.logo_max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_size: u32,
        filter: image::imageops::FilterType,
    ) -> Result<RgbaImage, RenderError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| RenderError::LogoDecode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_size, target_size, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(Self::to_fast_filter(filter)));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| RenderError::LogoDecode(format!("fast_image_resize 执行失败：{}", e)))?;

        ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_size, target_size, dst_image.into_vec())
            .ok_or_else(|| RenderError::LogoDecode("fast_image_resize 输出缓冲长度异常".to_string()))
    }

    fn to_fast_filter(filter: image::imageops::FilterType) -> fr::FilterType {
        match filter {
            image::imageops::FilterType::Nearest => fr::FilterType::Box,
            image::imageops::FilterType::Triangle => fr::FilterType::Bilinear,
            image::imageops::FilterType::CatmullRom => fr::FilterType::CatmullRom,
            image::imageops::FilterType::Gaussian => fr::FilterType::Mitchell,
            image::imageops::FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

/// 将已缩放的 Logo 叠加到二维码区域中心。
///
/// 清空区域比 Logo 大 `pad` 像素，并与 Logo 同心。
pub fn overlay_logo(
    surface: &mut RgbaImage,
    logo: &RgbaImage,
    opacity_percent: u8,
    layout: &CodeLayout,
    pad: u32,
    background: Rgba<u8>,
) {
    let size = logo.width();
    let origin = logo_origin(layout, size) as i64;
    let pad_origin = origin - (pad / 2) as i64;
    surface::fill_rect(surface, pad_origin, pad_origin, size + pad, size + pad, background);

    let alpha = opacity_percent as f32 / 100.0;
    for (x, y, pixel) in logo.enumerate_pixels() {
        let (sx, sy) = (origin + x as i64, origin + y as i64);
        if sx < 0 || sy < 0 || sx >= surface.width() as i64 || sy >= surface.height() as i64 {
            continue;
        }
        surface::blend_pixel(surface.get_pixel_mut(sx as u32, sy as u32), *pixel, alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn layout() -> CodeLayout {
        CodeLayout {
            width: 256,
            height: 256,
            code_origin: 0,
            code_region: 256,
            caption_height: 0,
            module_size: 12,
            drawn_size: 252,
        }
    }

    fn png_bytes(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, color);
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn target_is_one_fifth_of_region_and_centered() {
        let config = RenderConfig::default();
        let layout = layout();
        let size = logo_target_size(&layout, &config);
        assert_eq!(size, 51);
        assert_eq!(logo_origin(&layout, size), 102);
    }

    #[test]
    fn decode_stretches_to_square() {
        let raw = RawLogoData {
            bytes: png_bytes(40, 10, RED),
            source_hint: "test",
        };
        let logo = RenderHandler::decode_logo(raw, 20, &RenderConfig::default()).expect("decode");
        assert_eq!(logo.dimensions(), (20, 20));
        assert_eq!(logo.get_pixel(10, 10), &RED);
    }

    #[test]
    fn svg_logo_is_rasterized_to_target() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="8"><rect width="16" height="8" fill="#ff0000"/></svg>"##;
        let raw = RawLogoData {
            bytes: svg.as_bytes().to_vec(),
            source_hint: "test",
        };
        let logo = RenderHandler::decode_logo(raw, 24, &RenderConfig::default()).expect("rasterize svg");
        assert_eq!(logo.dimensions(), (24, 24));
        assert_eq!(logo.get_pixel(12, 12), &RED);
        assert_eq!(logo.get_pixel(12, 22), &RED, "svg is stretched to a square");
    }

    #[test]
    fn broken_svg_is_decode_error() {
        let raw = RawLogoData {
            bytes: b"<svg xmlns=\"http://www.w3.org/2000/svg\"><rect".to_vec(),
            source_hint: "test",
        };
        let result = RenderHandler::decode_logo(raw, 24, &RenderConfig::default());
        assert!(matches!(result, Err(RenderError::LogoDecode(_))));
    }

    #[test]
    fn decode_rejects_oversized_pixels() {
        let config = RenderConfig {
            logo_max_decoded_pixels: 10,
            ..RenderConfig::default()
        };
        let raw = RawLogoData {
            bytes: png_bytes(8, 8, RED),
            source_hint: "test",
        };
        let result = RenderHandler::decode_logo(raw, 4, &config);
        assert!(matches!(result, Err(RenderError::ResourceLimit(_))));
    }

    #[test]
    fn overlay_clears_pad_and_applies_opacity() {
        let layout = layout();
        let mut surface = RgbaImage::from_pixel(256, 256, BLACK);
        let logo = RgbaImage::from_pixel(51, 51, RED);

        overlay_logo(&mut surface, &logo, 50, &layout, 8, WHITE);

        // pad 区域：102 - 4 = 98 起
        assert_eq!(surface.get_pixel(98, 98), &WHITE);
        assert_eq!(surface.get_pixel(97, 97), &BLACK);
        // Logo 以 50% 混合到白色底上
        assert_eq!(surface.get_pixel(120, 120), &Rgba([255, 128, 128, 255]));
    }

    #[tokio::test]
    async fn prepare_logo_reports_missing_file() {
        let result = RenderHandler::prepare_logo(
            LogoSource::FilePath("/no/such/logo.png".into()),
            32,
            RenderConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(RenderError::FileSystem(_))));
    }
}
