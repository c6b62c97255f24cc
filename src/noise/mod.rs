//! Noise generation module for terrain synthesis.
//!
//! Perlin gradient noise layered into fBm, evaluated on a fresh permutation
//! table per call.

mod fractal;
mod perlin;

pub use fractal::{generate, generate_field, generate_perlin, sample_fbm, NoiseConfig, MAX_OCTAVES};
pub use perlin::{fade, lerp, PerlinNoise};
