//! 内容格式化模块
//!
//! # 设计思路
//!
//! 将“用户原始输入 + 内容类型”映射为交给编码器的最终字符串。
//! 这是一个纯函数：不失败、无副作用，便于两个前端共用同一份规则。
//!
//! # 实现思路
//!
//! - URL 仅在缺少 `http://` / `https://` 时补 `https://`，不会重复加前缀。
//! - WiFi 只写入 SSID（不含密码与加密方式字段）。
//! - vCard 按 `;` 切成最多三段（姓名、电话、邮箱），空段不输出对应行。
//! - 文件类型只编码文件名引用，不嵌入文件内容。

use serde::{Deserialize, Serialize};

/// 内容类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Url,
    Text,
    Email,
    Phone,
    Bitcoin,
    Wifi,
    Sms,
    Vcard,
    File,
}

impl ContentType {
    pub const ALL: [ContentType; 9] = [
        Self::Url,
        Self::Text,
        Self::Email,
        Self::Phone,
        Self::Bitcoin,
        Self::Wifi,
        Self::Sms,
        Self::Vcard,
        Self::File,
    ];

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "url" => Some(Self::Url),
            "text" => Some(Self::Text),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "bitcoin" => Some(Self::Bitcoin),
            "wifi" => Some(Self::Wifi),
            "sms" => Some(Self::Sms),
            "vcard" => Some(Self::Vcard),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Text => "text",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Bitcoin => "bitcoin",
            Self::Wifi => "wifi",
            Self::Sms => "sms",
            Self::Vcard => "vcard",
            Self::File => "file",
        }
    }
}

/// 将原始输入格式化为编码载荷。
///
/// # 示例
/// ```rust
/// use qr_studio::content::{format_payload, ContentType};
///
/// assert_eq!(format_payload(ContentType::Url, "example.com"), "https://example.com");
/// assert_eq!(format_payload(ContentType::Email, "a@b.com"), "mailto:a@b.com");
/// ```
pub fn format_payload(content_type: ContentType, raw_value: &str) -> String {
    match content_type {
        ContentType::Url => {
            if raw_value.starts_with("http://") || raw_value.starts_with("https://") {
                raw_value.to_string()
            } else {
                format!("https://{}", raw_value)
            }
        }
        ContentType::Text => raw_value.to_string(),
        ContentType::Email => format!("mailto:{}", raw_value),
        ContentType::Phone => format!("tel:{}", raw_value),
        ContentType::Sms => format!("sms:{}", raw_value),
        ContentType::Bitcoin => format!("bitcoin:{}", raw_value),
        ContentType::Wifi => format!("WIFI:S:{};;", raw_value),
        ContentType::Vcard => format_vcard(raw_value),
        ContentType::File => file_reference(raw_value),
    }
}

fn format_vcard(raw_value: &str) -> String {
    // 第三段之后的内容被丢弃
    let mut parts = raw_value.split(';');
    let name = parts.next().unwrap_or_default();
    let phone = parts.next().unwrap_or_default();
    let email = parts.next().unwrap_or_default();

    let mut card = String::from("BEGIN:VCARD\nVERSION:3.0\n");
    for (key, value) in [("FN", name), ("TEL", phone), ("EMAIL", email)] {
        if !value.is_empty() {
            card.push_str(key);
            card.push(':');
            card.push_str(value);
            card.push('\n');
        }
    }
    card.push_str("END:VCARD");
    card
}

/// 文件内容类型只引用文件名。
///
/// 已经带 `File: ` 前缀的输入保持不变。
pub fn file_reference(file_name: &str) -> String {
    if file_name.starts_with("File: ") {
        file_name.to_string()
    } else {
        format!("File: {}", file_name)
    }
}
