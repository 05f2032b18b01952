//! # Logo 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（Base64 / 本地文件）的 Logo 原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - Base64：支持 Data URL 与纯 Base64，解码前先估算体积上限。
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - 两条路径最后都做 magic bytes 签名校验，拒绝非图片内容。
//! - SVG 是文本格式没有 magic bytes，按 `<svg` / `<?xml` 文本特征识别后放行。

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};

use super::source::{LogoSource, RawLogoData};
use super::{RenderConfig, RenderError, RenderHandler};

/// SVG 文本特征只看开头这么多字节。
const SVG_SNIFF_LEN: usize = 1024;

impl RenderHandler {
    /// 按来源加载 Logo 原始字节。
    pub(super) fn load_logo(source: &LogoSource, config: &RenderConfig) -> Result<RawLogoData, RenderError> {
        match source {
            LogoSource::Base64(data) => Self::load_from_base64(data, config),
            LogoSource::FilePath(path) => Self::load_from_file(path, config),
        }
    }

    /// 从 Base64 字符串加载图片原始字节。
    fn load_from_base64(data: &str, config: &RenderConfig) -> Result<RawLogoData, RenderError> {
        log::debug!("📝 开始处理 base64 Logo");

        let bytes = parse_base64_with_limit(data, config.logo_max_file_size)?;

        if bytes.len() as u64 > config.logo_max_file_size {
            return Err(RenderError::ResourceLimit(format!(
                "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.logo_max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        validate_image_signature(&bytes)?;

        Ok(RawLogoData {
            bytes,
            source_hint: "base64",
        })
    }

    /// 从本地路径加载图片原始字节。
    fn load_from_file(path: &str, config: &RenderConfig) -> Result<RawLogoData, RenderError> {
        log::debug!("📁 开始读取本地 Logo - 路径: {}", path);

        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(RenderError::FileSystem(format!("文件不存在：{}", path)));
        }

        let metadata = std::fs::metadata(file_path)
            .map_err(|e| RenderError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > config.logo_max_file_size {
            return Err(RenderError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.logo_max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(file_path)
            .map_err(|e| RenderError::FileSystem(format!("无法读取图片文件：{}", e)))?;
        validate_image_signature(&bytes)?;

        Ok(RawLogoData {
            bytes,
            source_hint: "file",
        })
    }
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, RenderError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| RenderError::ResourceLimit("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| RenderError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
}

/// 解析 Base64 输入（支持 Data URL / 纯 Base64），解码前按估算体积拒绝超限输入。
pub(crate) fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, RenderError> {
    let normalized = data.trim();

    let base64_data = if normalized.starts_with("data:image/") {
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| RenderError::InvalidFormat("缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(base64_data)?;
    if estimated_len > max_file_size {
        return Err(RenderError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(base64_data)
        .map_err(|e| RenderError::LogoDecode(format!("Base64 解码失败：{}", e)))
}

/// 按文本特征判断是否为 SVG。
pub(crate) fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(SVG_SNIFF_LEN)]);
    let trimmed = head.trim_start_matches('\u{feff}').trim_start();
    (trimmed.starts_with("<svg") || trimmed.starts_with("<?xml") || trimmed.starts_with("<!DOCTYPE svg"))
        && trimmed.contains("<svg")
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), RenderError> {
    if bytes.is_empty() {
        return Err(RenderError::InvalidFormat("图片内容为空".to_string()));
    }
    if looks_like_svg(bytes) {
        return Ok(());
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| RenderError::InvalidFormat("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(RenderError::InvalidFormat(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}
