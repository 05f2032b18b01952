//! 设置持久化模块
//!
//! # 设计思路
//!
//! 把 `RenderSettings` 保存为带缩进的 JSON，下次启动时恢复。
//! 设置文件只是便利功能：读取失败不应阻止渲染。
//!
//! # 实现思路
//!
//! - 文件不存在、无法读取或解析失败时回退到默认设置，并记录警告。
//! - 读取后统一 `normalized()`，修正手工编辑带入的越界值。
//! - 写入前自动创建父目录。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::render::RenderSettings;

pub const SETTINGS_FILE_NAME: &str = "qr-settings.json";

/// 目录下的设置文件路径，目录不存在时自动创建。
pub fn settings_file_path(dir: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
    Ok(dir.join(SETTINGS_FILE_NAME))
}

/// 读取设置，任何失败都回退为默认值。
pub fn load_settings_from_path(path: &Path) -> RenderSettings {
    if !path.exists() {
        return RenderSettings::default();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            log::warn!("⚠️ 读取设置文件失败，使用默认设置: {}", err);
            return RenderSettings::default();
        }
    };

    match serde_json::from_str::<RenderSettings>(&content) {
        Ok(settings) => settings.normalized(),
        Err(err) => {
            log::warn!("⚠️ 解析设置文件失败，使用默认设置: {}", err);
            RenderSettings::default()
        }
    }
}

/// 保存设置为带缩进的 JSON。
pub fn save_settings_to_path(path: &Path, settings: &RenderSettings) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    log::debug!("💾 设置已保存 - 路径: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::render::{FrameKind, HexColor};

    fn unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("qr-studio-settings-test-{nanos}"));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = unique_temp_dir();
        let path = settings_file_path(&dir).expect("settings path");
        let settings = RenderSettings {
            raw_value: "example.com".into(),
            foreground: HexColor::parse("#1a2b3c").expect("color"),
            frame: FrameKind::Decorative,
            ..RenderSettings::default()
        };

        save_settings_to_path(&path, &settings).expect("save settings");
        assert_eq!(load_settings_from_path(&path), settings);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn load_bad_settings_falls_back_to_default() {
        let dir = unique_temp_dir();
        let path = dir.join(SETTINGS_FILE_NAME);
        fs::write(&path, "not-json").expect("write invalid settings");

        assert_eq!(load_settings_from_path(&path), RenderSettings::default());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn load_normalizes_out_of_range_values() {
        let dir = unique_temp_dir();
        let path = dir.join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{"pixelSize": 1000, "rawValue": "hi"}"#).expect("write settings");

        let loaded = load_settings_from_path(&path);
        assert_eq!(loaded.pixel_size, 512);
        assert_eq!(loaded.raw_value, "hi");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_gives_default() {
        let dir = unique_temp_dir();
        assert_eq!(
            load_settings_from_path(&dir.join("absent.json")),
            RenderSettings::default()
        );
        let _ = fs::remove_dir_all(dir);
    }
}
