//! Terrain data structures.
//!
//! Provides the [`Field`] elevation grid and analytic generators for
//! initial terrain.

mod field;
pub mod generators;

pub use field::{EdgeMode, Field, FieldStats, DEFAULT_MAX_CELLS};
