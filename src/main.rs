//! # 二维码工作室：命令行入口
//!
//! 本文件只负责参数解析、日志初始化与两种运行模式的编排。
//! 渲染逻辑分布在库的各子模块中，详见 `lib.rs` 架构文档。
//!
//! - 单次模式：参数（或设置文件）→ 渲染一次 → 按格式写出文件
//! - 交互模式（`--interactive`）：逐行读取 `key=value`，经防抖服务渲染，
//!   输入 `export=png` 时导出当前结果

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use qr_studio::error::AppError;
use qr_studio::render::{
    ExportFormat, RasterPath, RenderConfig, RenderHandler, RenderService, RenderSettings, RenderStatus,
    SettingsChange, SvgMode,
};
use qr_studio::{settings, storage};

#[derive(Parser, Debug)]
#[command(name = "qr-studio", version, about = "生成带样式的二维码并导出为 PNG / JPEG / SVG")]
struct Cli {
    /// 要编码的内容（按 --type 格式化）
    value: Option<String>,

    /// 内容类型：url / text / email / phone / sms / bitcoin / wifi / vcard / file
    #[arg(long = "type")]
    content_type: Option<String>,

    /// 文件类型内容：只记录文件名引用
    #[arg(long)]
    file: Option<String>,

    /// 二维码区域边长（128~512，吸附到 32 的倍数）
    #[arg(long)]
    size: Option<u32>,

    /// 纠错等级：L / M / Q / H
    #[arg(long)]
    level: Option<String>,

    /// 前景色 `#RRGGBB`
    #[arg(long)]
    fg: Option<String>,

    /// 背景色 `#RRGGBB`
    #[arg(long)]
    bg: Option<String>,

    /// 模块样式：square / rounded
    #[arg(long)]
    corner: Option<String>,

    /// 边框样式：none / simple / scanme / decorative / modern / minimal
    #[arg(long)]
    frame: Option<String>,

    /// 边框说明文字
    #[arg(long)]
    frame_text: Option<String>,

    /// Logo：本地路径或 `data:` 开头的 Data URL
    #[arg(long)]
    logo: Option<String>,

    /// Logo 不透明度百分比（20~100）
    #[arg(long)]
    logo_opacity: Option<u8>,

    /// 导出格式，可重复或用逗号分隔
    #[arg(long = "format", value_delimiter = ',', default_value = "png")]
    formats: Vec<String>,

    /// 导出目录，默认当前目录下的 `exports`
    #[arg(long)]
    out_dir: Option<String>,

    /// 文件名追加时间戳，避免覆盖旧文件
    #[arg(long)]
    timestamp: bool,

    /// 从 JSON 设置文件读取初始设置
    #[arg(long)]
    settings: Option<PathBuf>,

    /// 渲染后把最终设置写回设置文件
    #[arg(long)]
    save_settings: bool,

    /// 模块绘制路径：grid / bitmap
    #[arg(long)]
    raster: Option<String>,

    /// SVG 导出模式：vector / embedded
    #[arg(long)]
    svg: Option<String>,

    /// 交互模式的防抖窗口（毫秒）
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// 交互模式：从标准输入逐行读取 `key=value`
    #[arg(long)]
    interactive: bool,
}

impl Cli {
    /// 按参数构建管线配置。
    fn render_config(&self) -> Result<RenderConfig, AppError> {
        let mut config = RenderConfig::default();
        if let Some(raster) = &self.raster {
            config.raster_path = RasterPath::from_str(raster)?;
        }
        if let Some(svg) = &self.svg {
            config.svg_mode = SvgMode::from_str(svg)?;
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config.debounce_ms = debounce_ms;
        }
        Ok(config)
    }

    /// 参数对应的变更序列。内容类型必须最先应用，因为它会清空输入。
    fn changes(&self) -> Result<Vec<SettingsChange>, AppError> {
        let logo_opacity = self.logo_opacity.map(|percent| percent.to_string());
        let pairs = [
            ("type", self.content_type.as_deref()),
            ("value", self.value.as_deref()),
            ("file", self.file.as_deref()),
            ("level", self.level.as_deref()),
            ("fg", self.fg.as_deref()),
            ("bg", self.bg.as_deref()),
            ("corner", self.corner.as_deref()),
            ("frame", self.frame.as_deref()),
            ("frame-text", self.frame_text.as_deref()),
            ("logo", self.logo.as_deref()),
            ("logo-opacity", logo_opacity.as_deref()),
        ];

        let mut changes = Vec::new();
        if let Some(size) = self.size {
            changes.push(SettingsChange::PixelSize(size));
        }
        for (key, value) in pairs {
            if let Some(value) = value {
                changes.push(SettingsChange::from_key_value(key, value)?);
            }
        }
        Ok(changes)
    }

    fn export_formats(&self) -> Result<Vec<ExportFormat>, AppError> {
        let mut formats = Vec::new();
        for name in self.formats.iter().filter(|name| !name.trim().is_empty()) {
            let format = ExportFormat::from_str(name)?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }

    fn settings_path(&self) -> Result<PathBuf, AppError> {
        match &self.settings {
            Some(path) => Ok(path.clone()),
            None => {
                let cwd = std::env::current_dir()?;
                settings::settings_file_path(&cwd)
            }
        }
    }
}

/// 依次应用变更；被拒绝的变更记录警告并保留原值。
fn apply_changes(mut current: RenderSettings, changes: Vec<SettingsChange>) -> RenderSettings {
    for change in changes {
        let description = format!("{:?}", change);
        match current.reduce(change) {
            Some(next) => current = next,
            None => log::warn!("⚠️ 设置未生效（被拒绝或无变化）：{}", description),
        }
    }
    current
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = if cli.interactive {
        run_interactive(&cli).await
    } else {
        run_once(&cli).await
    };

    if let Err(err) = result {
        log::error!("❌ 运行失败 [{}]: {}", err.code(), err);
        eprintln!("错误: {}", err);
        std::process::exit(1);
    }
}

fn initial_settings(cli: &Cli) -> RenderSettings {
    match &cli.settings {
        Some(path) => settings::load_settings_from_path(path),
        None => RenderSettings::default(),
    }
}

/// 单次模式：渲染一次并写出所有请求的格式。
async fn run_once(cli: &Cli) -> Result<(), AppError> {
    let handler = RenderHandler::new(cli.render_config()?)?;
    let formats = cli.export_formats()?;
    let settings = apply_changes(initial_settings(cli), cli.changes()?);

    let code = handler.render(settings.clone(), 1).await?;
    let dir = storage::get_output_dir(cli.out_dir.as_deref())?;
    for format in formats {
        let artifact = handler.export(&code, format)?;
        let path = storage::write_export(&dir, &artifact, cli.timestamp)?;
        println!("{}", path.display());
    }

    if cli.save_settings {
        settings::save_settings_to_path(&cli.settings_path()?, &settings)?;
    }
    Ok(())
}

/// 交互模式：逐行读取 `key=value`，交给防抖服务渲染。
///
/// 额外支持的命令：`export=<格式>`、`reset`、`status`、`quit`。
async fn run_interactive(cli: &Cli) -> Result<(), AppError> {
    let handler = Arc::new(RenderHandler::new(cli.render_config()?)?);
    let initial = apply_changes(initial_settings(cli), cli.changes()?);
    let service = RenderService::with_handler(handler, initial.clone());
    let dir = storage::get_output_dir(cli.out_dir.as_deref())?;

    let mut status_rx = service.subscribe();
    let reporter = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let line = describe_status(&status_rx.borrow_and_update());
            println!("{}", line);
        }
    });

    if initial.has_content() {
        service.refresh()?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').unwrap_or((line, ""));
        let outcome = match key.trim() {
            "quit" | "exit" => break,
            "status" => {
                service.settle().await?;
                println!("{}", describe_status(&service.status()));
                let info = storage::get_output_dir_info(&dir);
                println!("导出目录：{}（{} 个文件，{} 字节）", info.path, info.file_count, info.total_size);
                Ok(())
            }
            "export" => export_current(&service, &dir, value, cli.timestamp).await,
            _ => SettingsChange::from_key_value(key, value)
                .map_err(AppError::from)
                .and_then(|change| service.on_settings_change(change).map_err(AppError::from))
                .map(|applied| {
                    if !applied {
                        println!("未变化：{}", line);
                    }
                }),
        };

        if let Err(err) = outcome {
            log::warn!("⚠️ 输入处理失败 [{}]: {}", err.code(), err);
            eprintln!("错误: {}", err);
        }
    }

    service.settle().await?;
    println!("{}", describe_status(&service.status()));

    if cli.save_settings {
        settings::save_settings_to_path(&cli.settings_path()?, &service.settings()?)?;
    }

    drop(service);
    reporter.abort();
    Ok(())
}

async fn export_current(
    service: &RenderService,
    dir: &Path,
    format_name: &str,
    timestamped: bool,
) -> Result<(), AppError> {
    let format = ExportFormat::from_str(if format_name.trim().is_empty() { "png" } else { format_name })?;
    service.settle().await?;
    let artifact = service.export_current(format)?;
    let path = storage::write_export(dir, &artifact, timestamped)?;
    println!("已导出 {}", path.display());
    Ok(())
}

fn describe_status(status: &RenderStatus) -> String {
    match status {
        RenderStatus::Placeholder => "状态：等待输入".to_string(),
        RenderStatus::Ready(code) => format!(
            "状态：就绪 #{} {}x{}",
            code.generation, code.layout.width, code.layout.height
        ),
        RenderStatus::Failed { code, notice, previous } => format!(
            "状态：失败 [{}] {}{}",
            code,
            notice,
            if previous.is_some() { "（保留上一次结果）" } else { "" }
        ),
    }
}
