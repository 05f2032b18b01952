//! # 矩阵与编码器模块
//!
//! ## 设计思路
//!
//! 文本到布尔矩阵的编码属于外部协作方，这里只定义边界：
//! - `Matrix`：只读的 `n × n` 明暗网格
//! - `MatrixEncoder`：编码接口，渲染编排层只依赖该 trait
//! - `QrMatrixEncoder`：基于 `qrcode` crate 的默认实现
//!
//! ## 实现思路
//!
//! `render_bitmap` 模拟“编码器直接输出像素”的不透明路径：
//! 调用方拿不到网格，只能在像素域做后处理（见 `rounding`）。

use image::{Rgba, RgbaImage};
use qrcode::types::{Color, QrError};
use qrcode::{EcLevel, QrCode};

use super::settings::{HexColor, RedundancyLevel};
use super::RenderError;

/// 只读的方形明暗网格。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    size: usize,
    cells: Vec<bool>,
}

impl Matrix {
    /// 由按行展开的单元格构造矩阵。
    pub fn from_cells(size: usize, cells: Vec<bool>) -> Result<Self, RenderError> {
        if size == 0 || cells.len() != size * size {
            return Err(RenderError::Encoding(format!(
                "矩阵数据长度 {} 与边长 {} 不匹配",
                cells.len(),
                size
            )));
        }
        Ok(Self { size, cells })
    }

    /// 由二维布尔数组构造矩阵，要求为方阵。
    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self, RenderError> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return Err(RenderError::Encoding("矩阵不是方阵".to_string()));
        }
        Self::from_cells(size, rows.concat())
    }

    pub fn module_count(&self) -> usize {
        self.size
    }

    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size && self.cells[row * self.size + col]
    }

    /// 按行优先顺序遍历所有深色模块的 `(row, col)`。
    pub fn dark_modules(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, dark)| **dark)
            .map(move |(idx, _)| (idx / self.size, idx % self.size))
    }
}

/// 矩阵编码器。
pub trait MatrixEncoder: Send + Sync {
    /// 将载荷编码为矩阵；超出容量时返回 `RenderError::Encoding`。
    fn encode(&self, payload: &str, level: RedundancyLevel) -> Result<Matrix, RenderError>;

    /// 直接输出方形模块位图（不暴露网格）。
    ///
    /// 位图边长为 `floor(pixel_size / n) * n`，不含静区。
    fn render_bitmap(
        &self,
        payload: &str,
        level: RedundancyLevel,
        pixel_size: u32,
        foreground: &HexColor,
        background: &HexColor,
    ) -> Result<RgbaImage, RenderError>;
}

/// 基于 `qrcode` crate 的编码器。
#[derive(Debug, Default, Clone, Copy)]
pub struct QrMatrixEncoder;

impl QrMatrixEncoder {
    fn build_code(payload: &str, level: RedundancyLevel) -> Result<QrCode, RenderError> {
        QrCode::with_error_correction_level(payload.as_bytes(), Self::to_ec_level(level)).map_err(
            |err| match err {
                QrError::DataTooLong => RenderError::Encoding(format!(
                    "内容过长（{} 字节），超出纠错等级 {:?} 的容量",
                    payload.len(),
                    level
                )),
                other => RenderError::Encoding(other.to_string()),
            },
        )
    }

    fn to_ec_level(level: RedundancyLevel) -> EcLevel {
        match level {
            RedundancyLevel::L => EcLevel::L,
            RedundancyLevel::M => EcLevel::M,
            RedundancyLevel::Q => EcLevel::Q,
            RedundancyLevel::H => EcLevel::H,
        }
    }
}

impl MatrixEncoder for QrMatrixEncoder {
    fn encode(&self, payload: &str, level: RedundancyLevel) -> Result<Matrix, RenderError> {
        let code = Self::build_code(payload, level)?;
        let cells = code
            .to_colors()
            .into_iter()
            .map(|color| color == Color::Dark)
            .collect();
        Matrix::from_cells(code.width(), cells)
    }

    fn render_bitmap(
        &self,
        payload: &str,
        level: RedundancyLevel,
        pixel_size: u32,
        foreground: &HexColor,
        background: &HexColor,
    ) -> Result<RgbaImage, RenderError> {
        let code = Self::build_code(payload, level)?;
        let module_count = code.width();
        let module_size = pixel_size / module_count as u32;
        if module_size == 0 {
            return Err(RenderError::ModuleTooSmall { module_count, pixel_size });
        }

        let image = code
            .render::<Rgba<u8>>()
            .quiet_zone(false)
            .module_dimensions(module_size, module_size)
            .dark_color(foreground.to_rgba())
            .light_color(background.to_rgba())
            .build();

        Ok(image)
    }
}
