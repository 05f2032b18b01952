//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `RenderHandler` 只负责流程编排与配置管理，不关心调度与防抖。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 格式化内容并编码为矩阵（或由编码器直接输出位图）
//! 3. 栅格化 / 圆角后处理
//! 4. 合成画布、绘制边框与说明文字
//! 5. 叠加 Logo（唯一的异步等待点，失败则跳过）
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<RenderConfig>>` 支持运行时调整。
//! - 单次渲染内使用“同一配置快照”，避免处理中途配置漂移。
//! - 记录 `encode/raster/frame/logo/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use image::RgbaImage;

use super::config::RasterPath;
use super::export::{self, ExportArtifact, ExportFormat};
use super::frame;
use super::logo;
use super::matrix::{Matrix, MatrixEncoder, QrMatrixEncoder};
use super::rasterizer;
use super::rounding;
use super::settings::{CornerStyle, RenderSettings};
use super::source::{CodeLayout, RenderedCode};
use super::{RenderConfig, RenderError};

/// 渲染处理器。
///
/// 封装了配置状态与矩阵编码器，并编排各子模块完成一次完整渲染。
pub struct RenderHandler {
    pub(super) config: Arc<RwLock<RenderConfig>>,
    encoder: Arc<dyn MatrixEncoder>,
}

/// 模块绘制阶段的产物。
struct CodeImage {
    image: RgbaImage,
    matrix: Option<Arc<Matrix>>,
    module_size: u32,
    drawn_size: u32,
}

impl RenderHandler {
    /// 使用默认编码器创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use qr_studio::render::{RenderConfig, RenderHandler};
    ///
    /// let handler = RenderHandler::new(RenderConfig::default())?;
    /// # Ok::<(), qr_studio::render::RenderError>(())
    /// ```
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        Self::with_encoder(config, Arc::new(QrMatrixEncoder))
    }

    /// 注入自定义编码器，主要用于测试或替换编码实现。
    pub fn with_encoder(config: RenderConfig, encoder: Arc<dyn MatrixEncoder>) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            encoder,
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次渲染链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<RenderConfig, RenderError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| RenderError::Task("配置读取锁已中毒".to_string()))
    }

    /// 校验并整体替换管线配置。
    pub fn set_advanced_config(&self, next: RenderConfig) -> Result<(), RenderError> {
        next.validate()?;

        let mut config = self
            .config
            .write()
            .map_err(|_| RenderError::Task("配置写入锁已中毒".to_string()))?;

        log::info!(
            "⚙️ 渲染配置已更新 - debounce={}ms raster={} svg={} jpeg_quality={}",
            next.debounce_ms,
            next.raster_path.as_str(),
            next.svg_mode.as_str(),
            next.jpeg_quality
        );
        *config = next;
        Ok(())
    }

    /// 根据设置与实际绘制尺寸计算画布布局。
    pub fn compute_layout(
        settings: &RenderSettings,
        module_size: u32,
        drawn_size: u32,
        config: &RenderConfig,
    ) -> CodeLayout {
        let (margin, caption_height) = if settings.frame.is_active() {
            (config.frame_margin, config.caption_height)
        } else {
            (0, 0)
        };
        let width = settings.pixel_size + margin * 2;

        CodeLayout {
            width,
            height: width + caption_height,
            code_origin: margin,
            code_region: settings.pixel_size,
            caption_height,
            module_size,
            drawn_size,
        }
    }

    /// 渲染主入口：由设置生成完整合成结果。
    ///
    /// # 示例
    /// ```rust
    /// use qr_studio::render::{RenderConfig, RenderHandler, RenderSettings};
    ///
    /// # async fn demo() -> Result<(), qr_studio::render::RenderError> {
    /// let handler = RenderHandler::new(RenderConfig::default())?;
    /// let settings = RenderSettings { raw_value: "example.com".into(), ..RenderSettings::default() };
    /// let code = handler.render(settings, 1).await?;
    /// assert_eq!(code.surface.width(), 256);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn render(&self, settings: RenderSettings, generation: u64) -> Result<RenderedCode, RenderError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        if !settings.has_content() {
            return Err(RenderError::EmptyInput);
        }
        settings.check_pixel_size()?;

        let encode_start = Instant::now();
        let code_image = self.draw_modules(&settings, &config)?;
        let encode_elapsed = encode_start.elapsed();

        let frame_start = Instant::now();
        let layout = Self::compute_layout(&settings, code_image.module_size, code_image.drawn_size, &config);
        let background = settings.background.to_rgba();
        let foreground = settings.foreground.to_rgba();
        let mut surface = RgbaImage::from_pixel(layout.width, layout.height, background);
        image::imageops::replace(
            &mut surface,
            &code_image.image,
            layout.code_origin as i64,
            layout.code_origin as i64,
        );
        frame::draw_frame(&mut surface, settings.frame, foreground, &layout, config.frame_padding);
        if let Some(text) = settings.effective_frame_text() {
            frame::draw_caption(&mut surface, text, foreground, &layout);
        }
        let frame_elapsed = frame_start.elapsed();

        let logo_start = Instant::now();
        let mut logo_image = None;
        if let Some(logo_settings) = settings.logo.as_ref() {
            let target = logo::logo_target_size(&layout, &config);
            match Self::prepare_logo(logo_settings.source.clone(), target, config.clone()).await {
                Ok(prepared) => {
                    logo::overlay_logo(
                        &mut surface,
                        &prepared,
                        logo_settings.opacity_percent,
                        &layout,
                        config.logo_pad,
                        background,
                    );
                    logo_image = Some(prepared);
                }
                Err(err) => {
                    log::warn!("⚠️ Logo 处理失败，跳过叠加：{}", err);
                }
            }
        }
        let logo_elapsed = logo_start.elapsed();

        log::info!(
            "✅ 渲染完成 - generation={} size={}x{} encode={}ms frame={}ms logo={}ms total={}ms",
            generation,
            layout.width,
            layout.height,
            encode_elapsed.as_millis(),
            frame_elapsed.as_millis(),
            logo_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(RenderedCode {
            generation,
            settings,
            layout,
            matrix: code_image.matrix,
            logo: logo_image,
            surface,
        })
    }

    /// 绘制二维码区域（名义边长 `pixel_size`）。
    fn draw_modules(&self, settings: &RenderSettings, config: &RenderConfig) -> Result<CodeImage, RenderError> {
        let payload = settings.payload();
        let raster_start = Instant::now();

        let code_image = match config.raster_path {
            RasterPath::Grid => {
                let matrix = self.encoder.encode(&payload, settings.redundancy_level)?;
                let module_count = matrix.module_count();
                let module_size = rasterizer::module_size_for(module_count, settings.pixel_size)?;
                let image = rasterizer::rasterize(
                    &matrix,
                    settings.pixel_size,
                    &settings.foreground,
                    &settings.background,
                    settings.corner_style,
                )?;
                CodeImage {
                    image,
                    matrix: Some(Arc::new(matrix)),
                    module_size,
                    drawn_size: module_size * module_count as u32,
                }
            }
            RasterPath::EncoderBitmap => {
                let mut bitmap = self.encoder.render_bitmap(
                    &payload,
                    settings.redundancy_level,
                    settings.pixel_size,
                    &settings.foreground,
                    &settings.background,
                )?;
                let estimate = rounding::infer_module_pitch(&bitmap);
                if settings.corner_style == CornerStyle::Rounded {
                    rounding::apply_rounded_corners(&mut bitmap, &settings.foreground, &settings.background);
                }

                let drawn_size = bitmap.width().min(settings.pixel_size);
                let offset = ((settings.pixel_size - drawn_size) / 2) as i64;
                let mut image = RgbaImage::from_pixel(
                    settings.pixel_size,
                    settings.pixel_size,
                    settings.background.to_rgba(),
                );
                image::imageops::replace(&mut image, &bitmap, offset, offset);

                CodeImage {
                    image,
                    matrix: None,
                    module_size: estimate.pitch,
                    drawn_size,
                }
            }
        };

        log::debug!(
            "🧱 模块绘制完成 - 路径: {} 纠错等级: {:?} ({}%) 载荷长度: {} 耗时: {}ms",
            config.raster_path.as_str(),
            settings.redundancy_level,
            settings.redundancy_level.recovery_percent(),
            payload.len(),
            raster_start.elapsed().as_millis()
        );

        Ok(code_image)
    }

    /// 导出合成结果（使用当前配置快照）。
    pub fn export(&self, code: &RenderedCode, format: ExportFormat) -> Result<ExportArtifact, RenderError> {
        let config = self.config_snapshot()?;
        let export_start = Instant::now();
        let artifact = export::export(code, format, &config)?;

        log::info!(
            "📦 导出完成 - generation={} format={} bytes={} elapsed={}ms",
            code.generation,
            format.extension(),
            artifact.bytes.len(),
            export_start.elapsed().as_millis()
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::settings::{FrameKind, LogoSettings};
    use crate::render::source::LogoSource;
    use image::Rgba;

    fn settings(value: &str) -> RenderSettings {
        RenderSettings {
            raw_value: value.into(),
            ..RenderSettings::default()
        }
    }

    fn png_data_url(size: u32, color: Rgba<u8>) -> String {
        use base64::Engine as _;
        let bytes = export::encode_png(&RgbaImage::from_pixel(size, size, color)).expect("png");
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[tokio::test]
    async fn blank_input_is_empty_input() {
        let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
        let result = handler.render(settings("   "), 1).await;
        assert!(matches!(result, Err(RenderError::EmptyInput)));
    }

    #[tokio::test]
    async fn off_range_pixel_size_is_rejected_without_panic() {
        let handler = RenderHandler::new(RenderConfig::default()).expect("handler");

        let small = handler
            .render(RenderSettings { pixel_size: 100, ..settings("example.com") }, 1)
            .await;
        assert!(matches!(small, Err(RenderError::InvalidSetting(_))));

        let off_step = handler
            .render(RenderSettings { pixel_size: 300, ..settings("example.com") }, 2)
            .await;
        assert!(matches!(off_step, Err(RenderError::InvalidSetting(_))));

        let huge = handler
            .render(
                RenderSettings {
                    pixel_size: u32::MAX - 10,
                    frame: FrameKind::Simple,
                    ..settings("example.com")
                },
                3,
            )
            .await;
        assert!(matches!(huge, Err(RenderError::InvalidSetting(_))));
    }

    #[tokio::test]
    async fn svg_logo_is_rasterized_and_overlaid() {
        use base64::Engine as _;
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16"><rect width="16" height="16" fill="#ff0000"/></svg>"##;
        let data_url = format!(
            "data:image/svg+xml;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(svg)
        );

        let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
        let code = handler
            .render(
                RenderSettings {
                    redundancy_level: crate::render::settings::RedundancyLevel::H,
                    logo: Some(LogoSettings {
                        source: LogoSource::Base64(data_url),
                        opacity_percent: 100,
                    }),
                    ..settings("example.com")
                },
                1,
            )
            .await
            .expect("render");

        assert!(code.logo.is_some(), "svg logo should be applied");
        assert_eq!(code.surface.get_pixel(128, 128), &Rgba([255, 0, 0, 255]));
    }

    #[tokio::test]
    async fn frameless_surface_matches_pixel_size() {
        let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
        let code = handler.render(settings("example.com"), 7).await.expect("render");
        assert_eq!(code.generation, 7);
        assert_eq!(code.surface.dimensions(), (256, 256));
        assert!(code.matrix.is_some());
        assert_eq!(
            code.layout.drawn_size,
            code.layout.module_size * code.matrix.as_ref().map_or(0, |m| m.module_count()) as u32
        );
    }

    #[tokio::test]
    async fn framed_surface_adds_margin_and_caption() {
        let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
        let code = handler
            .render(
                RenderSettings {
                    frame: FrameKind::ScanMe,
                    ..settings("example.com")
                },
                1,
            )
            .await
            .expect("render");
        assert_eq!(code.surface.dimensions(), (336, 366));
        assert_eq!(code.layout.code_origin, 40);
        assert_eq!(code.layout.caption_height, 30);
    }

    #[tokio::test]
    async fn undecodable_logo_renders_like_no_logo() {
        let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
        let plain = handler.render(settings("example.com"), 1).await.expect("render");
        let broken = handler
            .render(
                RenderSettings {
                    logo: Some(LogoSettings {
                        source: LogoSource::Base64("definitely not an image".into()),
                        opacity_percent: 80,
                    }),
                    ..settings("example.com")
                },
                2,
            )
            .await
            .expect("render");

        assert!(broken.logo.is_none());
        assert_eq!(plain.surface.as_raw(), broken.surface.as_raw());
    }

    #[tokio::test]
    async fn decodable_logo_is_overlaid_at_center() {
        let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
        let red = Rgba([255, 0, 0, 255]);
        let code = handler
            .render(
                RenderSettings {
                    redundancy_level: crate::render::settings::RedundancyLevel::H,
                    logo: Some(LogoSettings {
                        source: LogoSource::Base64(png_data_url(16, red)),
                        opacity_percent: 100,
                    }),
                    ..settings("example.com")
                },
                1,
            )
            .await
            .expect("render");

        assert!(code.logo.is_some());
        assert_eq!(code.surface.get_pixel(128, 128), &red);
    }

    #[tokio::test]
    async fn encoder_bitmap_path_has_no_grid() {
        let config = RenderConfig {
            raster_path: RasterPath::EncoderBitmap,
            ..RenderConfig::default()
        };
        let handler = RenderHandler::new(config).expect("handler");
        let code = handler
            .render(
                RenderSettings {
                    corner_style: CornerStyle::Rounded,
                    ..settings("example.com")
                },
                1,
            )
            .await
            .expect("render");
        assert!(code.matrix.is_none());
        assert_eq!(code.surface.dimensions(), (256, 256));
    }

    #[test]
    fn advanced_config_rejects_invalid_values() {
        let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
        let bad = RenderConfig {
            jpeg_quality: 0,
            ..RenderConfig::default()
        };
        assert!(matches!(handler.set_advanced_config(bad), Err(RenderError::InvalidSetting(_))));

        let good = RenderConfig {
            debounce_ms: 100,
            ..RenderConfig::default()
        };
        handler.set_advanced_config(good).expect("valid config");
        assert_eq!(handler.config_snapshot().expect("snapshot").debounce_ms, 100);
    }
}
