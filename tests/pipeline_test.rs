//! 端到端测试：设置归约 → 渲染 → 导出 → 落盘。

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use image::{GenericImageView, Rgba};

use qr_studio::content::ContentType;
use qr_studio::error::AppError;
use qr_studio::render::{
    ExportFormat, FrameKind, RenderConfig, RenderError, RenderHandler, RenderService, RenderSettings,
    RenderStatus, SettingsChange, SvgMode,
};
use qr_studio::{settings, storage};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock error")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("qr-studio-{tag}-{nanos}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn reduce_all(changes: Vec<SettingsChange>) -> RenderSettings {
    changes
        .into_iter()
        .fold(RenderSettings::default(), |current, change| {
            current.reduce(change.clone()).unwrap_or_else(|| panic!("change rejected: {change:?}"))
        })
}

#[tokio::test]
async fn framed_render_has_caption_strip_and_exports_every_format() {
    let settings = reduce_all(vec![
        SettingsChange::ContentType(ContentType::Text),
        SettingsChange::RawValue("hello from the pipeline".into()),
        SettingsChange::PixelSize(320),
        SettingsChange::Frame(FrameKind::Decorative),
        SettingsChange::FrameText("Menu <today> & more".into()),
    ]);

    let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
    let code = handler.render(settings, 1).await.expect("render");
    assert_eq!(code.surface.dimensions(), (400, 430));

    // 说明条与二维码区域之间存在前景色像素（文字）
    let caption_has_ink = (code.layout.square_height()..code.layout.height)
        .flat_map(|y| (0..code.layout.width).map(move |x| (x, y)))
        .any(|(x, y)| code.surface.get_pixel(x, y) == &Rgba([0, 0, 0, 255]));
    assert!(caption_has_ink, "caption text should be drawn in the strip");

    let png = handler.export(&code, ExportFormat::Png).expect("png");
    let decoded = image::load_from_memory(&png.bytes).expect("decode png");
    assert_eq!(decoded.dimensions(), (400, 430));
    assert_eq!(decoded.to_rgba8().as_raw(), code.surface.as_raw());

    let jpeg = handler.export(&code, ExportFormat::Jpeg).expect("jpeg");
    let decoded = image::load_from_memory(&jpeg.bytes).expect("decode jpeg");
    assert!(!decoded.color().has_alpha());

    let svg = String::from_utf8(handler.export(&code, ExportFormat::Svg).expect("svg").bytes).expect("utf8");
    assert!(svg.contains(r#"width="400" height="430""#));
    assert!(svg.contains("Menu &lt;today&gt; &amp; more"));
    assert!(!svg.contains("<today>"));
}

#[tokio::test]
async fn png_export_is_deterministic() {
    let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
    let settings = reduce_all(vec![
        SettingsChange::RawValue("example.com".into()),
        SettingsChange::ForegroundText("#1a2b3c".into()),
    ]);

    let first = handler.render(settings.clone(), 1).await.expect("render");
    let second = handler.render(settings, 2).await.expect("render");
    assert_eq!(
        handler.export(&first, ExportFormat::Png).expect("png").bytes,
        handler.export(&second, ExportFormat::Png).expect("png").bytes
    );
}

#[tokio::test]
async fn embedded_svg_mode_wraps_bitmap() {
    let config = RenderConfig {
        svg_mode: SvgMode::Embedded,
        ..RenderConfig::default()
    };
    let handler = RenderHandler::new(config).expect("handler");
    let code = handler
        .render(reduce_all(vec![SettingsChange::RawValue("example.com".into())]), 1)
        .await
        .expect("render");

    let svg = String::from_utf8(handler.export(&code, ExportFormat::Svg).expect("svg").bytes).expect("utf8");
    assert!(svg.contains("data:image/png;base64,"));
    assert!(!svg.contains("<rect x="));
}

#[tokio::test]
async fn oversized_payload_reports_encoding_failure() {
    let handler = RenderHandler::new(RenderConfig::default()).expect("handler");
    let settings = reduce_all(vec![
        SettingsChange::ContentType(ContentType::Text),
        SettingsChange::RawValue("x".repeat(5_000)),
    ]);

    let result = handler.render(settings, 1).await;
    assert!(matches!(result, Err(RenderError::Encoding(_))));
}

#[tokio::test(start_paused = true)]
async fn service_debounces_and_exports_to_disk() {
    let service = RenderService::new(RenderSettings::default()).expect("service");
    assert!(matches!(service.status(), RenderStatus::Placeholder));
    assert!(service.export_current(ExportFormat::Png).is_err());

    for line in ["value=exa", "value=example.org", "frame=minimal", "fg=#123"] {
        let (key, value) = line.split_once('=').expect("key=value");
        let change = SettingsChange::from_key_value(key, value).expect("parse");
        let applied = service.on_settings_change(change).expect("change");
        assert_eq!(applied, key != "fg", "invalid colour text must not schedule a render");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    service.settle().await.expect("settle");

    let status = service.status();
    let code = status.displayed().expect("ready render");
    assert_eq!(code.settings.raw_value, "example.org");
    assert_eq!(code.settings.frame, FrameKind::Minimal);
    assert_eq!(code.settings.foreground.as_str(), "#000000");

    let dir = unique_temp_dir("pipeline-export");
    let artifact = service.export_current(ExportFormat::Svg).expect("export");
    let path = storage::write_export(&dir, &artifact, false).expect("write");
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("qrcode.svg"));
    assert_eq!(storage::get_output_dir_info(&dir).file_count, 1);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn settings_file_survives_reducer_changes() {
    let dir = unique_temp_dir("pipeline-settings");
    let path = settings::settings_file_path(&dir).expect("path");
    let saved = reduce_all(vec![
        SettingsChange::ContentType(ContentType::Wifi),
        SettingsChange::RawValue("HomeNet".into()),
        SettingsChange::RedundancyLevel(qr_studio::render::RedundancyLevel::H),
    ]);

    settings::save_settings_to_path(&path, &saved).expect("save");
    let loaded = settings::load_settings_from_path(&path);
    assert_eq!(loaded, saved);
    assert_eq!(loaded.payload(), "WIFI:S:HomeNet;;");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn storage_errors_surface_as_app_errors() {
    let missing = unique_temp_dir("pipeline-missing").join("nope");
    let artifact = qr_studio::render::ExportArtifact {
        format: ExportFormat::Png,
        bytes: vec![0],
    };
    let err = storage::write_export(&missing, &artifact, true).expect_err("missing dir");
    assert!(matches!(err, AppError::Storage(_)));
    assert_eq!(err.code(), "storage");
}

#[test]
fn handler_can_be_shared_between_threads() {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}
    let handler = Arc::new(RenderHandler::new(RenderConfig::default()).expect("handler"));
    assert_send_sync(&handler);
}
