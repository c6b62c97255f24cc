//! Analytic starting terrains (flat plains and radial landforms).

use rayon::prelude::*;

use super::field::Field;
use crate::error::{ensure_non_negative, ensure_positive, Result, TerrainError};

/// Creates a field with every cell at `elevation`.
pub fn flat(width: usize, height: usize, elevation: f32) -> Result<Field> {
    Field::filled(width, height, elevation)
}

/// Hemisphere of `radius` cells centred on `(cx, cy)`: `z = sqrt(r² - d²)` inside, 0 outside.
pub fn semi_sphere(width: usize, height: usize, cx: f32, cy: f32, radius: f32) -> Result<Field> {
    ensure_positive("radius", radius)?;
    let r2 = radius * radius;
    radial(width, height, cx, cy, |d| {
        let d2 = d * d;
        if d2 <= r2 {
            (r2 - d2).sqrt()
        } else {
            0.0
        }
    })
}

/// Cone with its apex at `(cx, cy)`, falling linearly from `peak` to 0 at `radius`.
pub fn cone(width: usize, height: usize, cx: f32, cy: f32, radius: f32, peak: f32) -> Result<Field> {
    ensure_positive("radius", radius)?;
    ensure_non_negative("peak height", peak)?;
    radial(width, height, cx, cy, |d| {
        if d <= radius {
            peak * (1.0 - d / radius)
        } else {
            0.0
        }
    })
}

/// Smooth plateau: `peak / (1 + exp((d - radius) * 8 / radius))`.
///
/// Reaches half of `peak` at `radius` and flattens out on both sides.
pub fn sigmoid(width: usize, height: usize, cx: f32, cy: f32, radius: f32, peak: f32) -> Result<Field> {
    ensure_positive("radius", radius)?;
    ensure_non_negative("peak height", peak)?;
    let steepness = 8.0 / radius;
    radial(width, height, cx, cy, |d| peak / (1.0 + ((d - radius) * steepness).exp()))
}

fn radial<F>(width: usize, height: usize, cx: f32, cy: f32, profile: F) -> Result<Field>
where
    F: Fn(f32) -> f32 + Sync,
{
    if !cx.is_finite() || !cy.is_finite() {
        return Err(TerrainError::invalid(format!("center ({cx}, {cy}) must be finite")));
    }
    let mut field = Field::new(width, height)?;
    field
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, h) in row.iter_mut().enumerate() {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                *h = profile((dx * dx + dy * dy).sqrt());
            }
        });
    Ok(field)
}
