//! Multi-octave fractal Brownian motion (fBm) heightfield generation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::perlin::PerlinNoise;
use crate::error::{ensure_positive, Result, TerrainError};
use crate::terrain::{Field, FieldStats};

/// Upper bound on octaves; beyond this the extra layers are sub-cell detail.
pub const MAX_OCTAVES: u32 = 16;

/// Configuration for noise-based terrain generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoiseConfig {
    /// Random seed for reproducible generation.
    pub seed: u32,
    /// Base frequency in cycles per cell (0.005-0.05 typical).
    pub frequency: f32,
    /// Output scale; heights stay within roughly `[-amplitude, amplitude]`.
    pub amplitude: f32,
    /// Number of noise octaves (4-8 typical).
    pub octaves: u32,
    /// Amplitude decay per octave (0.4-0.6 typical).
    pub persistence: f32,
    /// Frequency multiplier per octave (typically 2.0).
    pub lacunarity: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            frequency: 0.01,
            amplitude: 50.0,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl NoiseConfig {
    /// Default configuration with the given seed.
    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Low, smooth terrain.
    pub fn rolling_hills(seed: u32) -> Self {
        Self {
            seed,
            frequency: 0.006,
            amplitude: 20.0,
            octaves: 4,
            persistence: 0.4,
            lacunarity: 2.0,
        }
    }

    /// Rough, high-relief terrain.
    pub fn mountains(seed: u32) -> Self {
        Self {
            seed,
            frequency: 0.012,
            amplitude: 120.0,
            octaves: 8,
            persistence: 0.55,
            lacunarity: 2.1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.octaves < 1 {
            return Err(TerrainError::invalid("octaves must be at least 1"));
        }
        if self.octaves > MAX_OCTAVES {
            return Err(TerrainError::invalid(format!(
                "octaves must not exceed {MAX_OCTAVES} (got {})",
                self.octaves
            )));
        }
        ensure_positive("frequency", self.frequency)?;
        ensure_positive("amplitude", self.amplitude)?;
        ensure_positive("persistence", self.persistence)?;
        ensure_positive("lacunarity", self.lacunarity)?;
        Ok(())
    }
}

/// Generates an fBm field plus its summary statistics.
///
/// A fresh permutation table is built from `config.seed` on every call, so
/// identical arguments always give a bit-identical field.
pub fn generate(width: usize, height: usize, config: &NoiseConfig) -> Result<(Field, FieldStats)> {
    let field = generate_field(width, height, config)?;
    let stats = field.min_max_mean();
    tracing::debug!(
        width,
        height,
        seed = config.seed,
        octaves = config.octaves,
        min = stats.min,
        max = stats.max,
        "generated fbm field"
    );
    Ok((field, stats))
}

/// Generates an fBm field.
pub fn generate_field(width: usize, height: usize, config: &NoiseConfig) -> Result<Field> {
    config.validate()?;
    let perlin = PerlinNoise::new(config.seed);
    fill_parallel(width, height, |x, y| sample_fbm(&perlin, x as f32, y as f32, config))
}

/// Generates a single octave of noise scaled by `amplitude`.
pub fn generate_perlin(width: usize, height: usize, seed: u32, frequency: f32, amplitude: f32) -> Result<Field> {
    ensure_positive("frequency", frequency)?;
    if !amplitude.is_finite() {
        return Err(TerrainError::invalid(format!("amplitude must be a finite number (got {amplitude})")));
    }
    let perlin = PerlinNoise::new(seed);
    fill_parallel(width, height, |x, y| {
        perlin.noise(x as f32 * frequency, y as f32 * frequency) * amplitude
    })
}

/// Samples fBm at a grid position.
///
/// The octave sum is divided by the total octave amplitude and rescaled by
/// `config.amplitude`, keeping the output range independent of octave count.
pub fn sample_fbm(perlin: &PerlinNoise, x: f32, y: f32, config: &NoiseConfig) -> f32 {
    let mut total = 0.0f32;
    let mut amplitude = config.amplitude;
    let mut frequency = config.frequency;
    let mut max_amplitude = 0.0f32;

    for _ in 0..config.octaves {
        total += perlin.noise(x * frequency, y * frequency) * amplitude;
        max_amplitude += amplitude;
        amplitude *= config.persistence;
        frequency *= config.lacunarity;
    }

    total / max_amplitude * config.amplitude
}

fn fill_parallel<F>(width: usize, height: usize, sample: F) -> Result<Field>
where
    F: Fn(usize, usize) -> f32 + Sync,
{
    let mut field = Field::new(width, height)?;
    field
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, h) in row.iter_mut().enumerate() {
                *h = sample(x, y);
            }
        });

    // Extreme frequencies can overflow the lattice arithmetic; the field must stay finite.
    if let Some((index, &value)) = field.as_slice().iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(TerrainError::NonFinite { index, value });
    }
    Ok(field)
}
