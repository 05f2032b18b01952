//! 导出目录与文件写入模块
//!
//! # 设计思路
//!
//! 统一管理导出文件的目录与命名，并保证导出失败时不留下半截文件。
//!
//! # 实现思路
//!
//! - 优先使用用户指定目录，未指定时回退到当前目录下的 `exports` 子目录。
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。
//! - 文件名为 `qrcode.<ext>`，或带时间戳的 `qrcode-<时间戳>.<ext>`。
//! - 先写入同目录临时文件，再 `rename` 覆盖目标；失败时清理临时文件。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::error::AppError;
use crate::render::{ExportArtifact, ExportFormat};

const EXPORT_FILE_STEM: &str = "qrcode";

/// 导出目录信息
#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    pub path: String,
    pub total_size: u64,
    pub file_count: u64,
}

/// 获取导出目录
///
/// # 参数
/// * `custom_dir` - 用户自定义目录（可选）
///
/// # 返回
/// - `Ok(PathBuf)`：可用的导出目录
/// - `Err(AppError::Storage)`：无法获取或创建目录
pub fn get_output_dir(custom_dir: Option<&str>) -> Result<PathBuf, AppError> {
    let dir = match custom_dir.filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()
            .map_err(|e| AppError::Storage(format!("获取当前目录失败: {}", e)))?
            .join("exports"),
    };

    if !dir.exists() {
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::Storage(format!("创建导出目录 '{}' 失败: {}", dir.display(), e)))?;
    }
    Ok(dir)
}

/// 导出文件名：`qrcode.png` 或 `qrcode-20240101120000123456.png`。
pub fn export_file_name(format: ExportFormat, timestamped: bool) -> String {
    if timestamped {
        let timestamp = Local::now().format("%Y%m%d%H%M%S%f");
        format!("{}-{}.{}", EXPORT_FILE_STEM, timestamp, format.extension())
    } else {
        format!("{}.{}", EXPORT_FILE_STEM, format.extension())
    }
}

/// 原子写入导出文件，返回最终路径。
pub fn write_export(dir: &Path, artifact: &ExportArtifact, timestamped: bool) -> Result<PathBuf, AppError> {
    let file_name = export_file_name(artifact.format, timestamped);
    let target = dir.join(&file_name);
    let temp = dir.join(format!(".{}.partial", file_name));

    if let Err(err) = fs::write(&temp, &artifact.bytes) {
        let _ = fs::remove_file(&temp);
        return Err(AppError::Storage(format!("写入导出文件失败: {}", err)));
    }
    if let Err(err) = fs::rename(&temp, &target) {
        let _ = fs::remove_file(&temp);
        return Err(AppError::Storage(format!("保存导出文件失败: {}", err)));
    }

    log::info!(
        "💾 导出文件已保存 - 路径: {} 大小: {} 字节",
        target.display(),
        artifact.bytes.len()
    );
    Ok(target)
}

/// 获取导出目录信息（路径 + 占用大小 + 文件数）
pub fn get_output_dir_info(dir: &Path) -> StorageInfo {
    let mut total_size: u64 = 0;
    let mut file_count: u64 = 0;

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_file() {
                    total_size += metadata.len();
                    file_count += 1;
                }
            }
        }
    }

    StorageInfo {
        path: dir.to_string_lossy().to_string(),
        total_size,
        file_count,
    }
}
