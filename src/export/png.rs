//! PNG export functionality for heightfields.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Luma};
use thiserror::Error;

use crate::terrain::Field;

/// Errors that can occur during PNG export.
#[derive(Error, Debug)]
pub enum PngExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f32, f32),
    #[error("Field of {0}x{1} cells does not fit a PNG")]
    TooLarge(usize, usize),
}

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Height mapped to black.
    pub min_height: f32,
    /// Height mapped to white.
    pub max_height: f32,
    pub compression: CompressionType,
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            min_height: -1.0,
            max_height: 1.0,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Creates options spanning the field's own height range.
    ///
    /// A flat field gets a unit range above its height so it still encodes.
    pub fn auto_range(field: &Field) -> Self {
        let stats = field.min_max_mean();
        let max = if stats.max > stats.min { stats.max } else { stats.min + 1.0 };
        Self {
            min_height: stats.min,
            max_height: max,
            ..Default::default()
        }
    }
}

/// Exports a field as a 16-bit grayscale PNG heightmap.
///
/// Heights are normalized to `[min_height, max_height]`; values outside clamp.
pub fn export_field_png(
    field: &Field,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    let min = options.min_height;
    let max = options.max_height;

    if !(min < max) {
        return Err(PngExportError::InvalidHeightRange(min, max));
    }

    let (width, height) = match (u32::try_from(field.width()), u32::try_from(field.height())) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(PngExportError::TooLarge(field.width(), field.height())),
    };
    let range = max - min;

    let img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(width, height, |x, y| {
        let h = field.get(x as usize, y as usize);
        let normalized = ((h - min) / range).clamp(0.0, 1.0);
        Luma([(normalized * 65535.0) as u16])
    });

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);

    // The encoder takes the u16 samples as bytes
    let byte_slice: &[u8] = bytemuck::cast_slice(img.as_raw());

    encoder.write_image(byte_slice, width, height, image::ExtendedColorType::L16)?;

    Ok(())
}
