//! Export module for saving heightfields to disk.
//!
//! Supports 16-bit PNG for previews and RAW formats for game engine imports.

mod png;
mod raw;

use std::path::{Path, PathBuf};

pub use png::{export_field_png, PngExportError, PngExportOptions};
pub use raw::{expected_file_size, export_field_raw, RawExportError, RawFormat};

/// Path for one frame of an exported sequence: `{dir}/{base}_{frame:04}.{ext}`.
pub fn frame_path(dir: &Path, base: &str, frame: u32, ext: &str) -> PathBuf {
    dir.join(format!("{base}_{frame:04}.{ext}"))
}
