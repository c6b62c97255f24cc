//! Error types shared by the terrain engine.

use thiserror::Error;

/// Errors raised by field access, generation and simulation setup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerrainError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid field dimensions: {0}x{1} (both must be > 0)")]
    InvalidDimensions(usize, usize),
    #[error("Field of {width}x{height} exceeds the limit of {max_cells} cells")]
    TooLarge {
        width: usize,
        height: usize,
        max_cells: usize,
    },
    #[error("Data length {got} does not match {width}x{height} field")]
    LengthMismatch {
        got: usize,
        width: usize,
        height: usize,
    },
    #[error("Cell ({x}, {y}) is outside the {width}x{height} field")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
    #[error("Non-finite elevation {value} at index {index}")]
    NonFinite { index: usize, value: f32 },
}

impl TerrainError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TerrainError::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TerrainError>;

/// Fails with `InvalidConfig` unless `value` is finite and `>= 0`.
pub(crate) fn ensure_non_negative(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(TerrainError::invalid(format!("{name} must be a finite number (got {value})")));
    }
    if value < 0.0 {
        return Err(TerrainError::invalid(format!("{name} must be >= 0 (got {value})")));
    }
    Ok(())
}

/// Fails with `InvalidConfig` unless `value` is finite and `> 0`.
pub(crate) fn ensure_positive(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(TerrainError::invalid(format!("{name} must be a finite number (got {value})")));
    }
    if value <= 0.0 {
        return Err(TerrainError::invalid(format!("{name} must be > 0 (got {value})")));
    }
    Ok(())
}

/// Fails with `InvalidConfig` unless `value` lies in `[0, 1]`.
pub(crate) fn ensure_unit(name: &str, value: f32) -> Result<()> {
    ensure_non_negative(name, value)?;
    if value > 1.0 {
        return Err(TerrainError::invalid(format!("{name} must be within [0, 1] (got {value})")));
    }
    Ok(())
}
