//! The elevation grid every other component reads and mutates.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Default cap on `width * height` (a 4096x4096 grid, 64 MiB of heights).
pub const DEFAULT_MAX_CELLS: usize = 4096 * 4096;

/// How out-of-range coordinates are treated by [`Field::at`] and [`Field::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    /// Snap to the nearest valid cell.
    Clamp,
    /// Fail with [`TerrainError::OutOfBounds`].
    Strict,
}

/// Summary statistics of a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

/// A fixed-size 2D grid of finite elevations stored in row-major order
/// (`index = y * width + x`, origin at the top-left corner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldRepr")]
pub struct Field {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

/// Unchecked wire form; every deserialized field goes through [`Field::from_vec`].
#[derive(Deserialize)]
struct FieldRepr {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl TryFrom<FieldRepr> for Field {
    type Error = TerrainError;

    fn try_from(repr: FieldRepr) -> Result<Self> {
        Field::from_vec(repr.width, repr.height, repr.data)
    }
}

impl Field {
    /// Creates a field of zeros, capped at [`DEFAULT_MAX_CELLS`].
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Self::filled(width, height, 0.0)
    }

    /// Creates a field where every cell holds `elevation`.
    pub fn filled(width: usize, height: usize, elevation: f32) -> Result<Self> {
        Self::filled_with_limit(width, height, elevation, DEFAULT_MAX_CELLS)
    }

    /// Creates a constant field with an explicit cell-count limit.
    pub fn filled_with_limit(width: usize, height: usize, elevation: f32, max_cells: usize) -> Result<Self> {
        check_dimensions(width, height, max_cells)?;
        if !elevation.is_finite() {
            return Err(TerrainError::NonFinite { index: 0, value: elevation });
        }
        Ok(Self {
            width,
            height,
            data: vec![elevation; width * height],
        })
    }

    /// Imports a flat row-major elevation buffer.
    ///
    /// The buffer must hold exactly `width * height` finite values.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        Self::from_vec_with_limit(width, height, data, DEFAULT_MAX_CELLS)
    }

    /// Like [`Field::from_vec`] with an explicit cell-count limit.
    pub fn from_vec_with_limit(width: usize, height: usize, data: Vec<f32>, max_cells: usize) -> Result<Self> {
        check_dimensions(width, height, max_cells)?;
        if data.len() != width * height {
            return Err(TerrainError::LengthMismatch { got: data.len(), width, height });
        }
        if let Some((index, &value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(TerrainError::NonFinite { index, value });
        }
        Ok(Self { width, height, data })
    }

    /// Builds a field by evaluating `f(x, y)` for every cell.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> f32,
    {
        check_dimensions(width, height, DEFAULT_MAX_CELLS)?;
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::from_vec(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a constructed field; present for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the field, returning the row-major buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Reads a cell using the requested edge behaviour.
    pub fn at(&self, x: i64, y: i64, mode: EdgeMode) -> Result<f32> {
        let (cx, cy) = self.resolve(x, y, mode)?;
        Ok(self.data[self.index(cx, cy)])
    }

    /// Writes a cell using the requested edge behaviour. Non-finite values are rejected.
    pub fn set(&mut self, x: i64, y: i64, value: f32, mode: EdgeMode) -> Result<()> {
        let (cx, cy) = self.resolve(x, y, mode)?;
        let index = self.index(cx, cy);
        if !value.is_finite() {
            return Err(TerrainError::NonFinite { index, value });
        }
        self.data[index] = value;
        Ok(())
    }

    /// Reads an in-bounds cell.
    ///
    /// # Panics
    /// Panics if `x` or `y` is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    /// Adds `delta` to an in-bounds cell.
    ///
    /// Callers are responsible for only passing finite deltas.
    #[inline]
    pub(crate) fn add(&mut self, x: usize, y: usize, delta: f32) {
        debug_assert!(x < self.width && y < self.height);
        debug_assert!(delta.is_finite());
        let index = y * self.width + x;
        self.data[index] += delta;
    }

    /// Mutable access to the raw buffer for crate-internal bulk updates that
    /// preserve finiteness.
    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn fill(&mut self, elevation: f32) -> Result<()> {
        if !elevation.is_finite() {
            return Err(TerrainError::NonFinite { index: 0, value: elevation });
        }
        self.data.fill(elevation);
        Ok(())
    }

    /// Samples the field at fractional coordinates with bilinear interpolation.
    ///
    /// Coordinates outside the grid are clamped to the border first.
    pub fn sample_bilinear(&self, fx: f32, fy: f32) -> f32 {
        let (x0, x1, tx) = self.lerp_axis(fx, self.width);
        let (y0, y1, ty) = self.lerp_axis(fy, self.height);

        let h00 = self.get(x0, y0);
        let h10 = self.get(x1, y0);
        let h01 = self.get(x0, y1);
        let h11 = self.get(x1, y1);

        let top = h00 + (h10 - h00) * tx;
        let bottom = h01 + (h11 - h01) * tx;
        top + (bottom - top) * ty
    }

    /// Slope at a cell: central differences in the interior, one-sided at the borders.
    pub fn gradient(&self, x: usize, y: usize) -> (f32, f32) {
        debug_assert!(x < self.width && y < self.height);
        let gx = axis_difference(x, self.width, |i| self.get(i, y));
        let gy = axis_difference(y, self.height, |j| self.get(x, j));
        (gx, gy)
    }

    /// Cell gradients bilinearly interpolated to a fractional position.
    pub fn gradient_at(&self, fx: f32, fy: f32) -> (f32, f32) {
        let (x0, x1, tx) = self.lerp_axis(fx, self.width);
        let (y0, y1, ty) = self.lerp_axis(fy, self.height);

        let g00 = self.gradient(x0, y0);
        let g10 = self.gradient(x1, y0);
        let g01 = self.gradient(x0, y1);
        let g11 = self.gradient(x1, y1);

        let blend = |a: f32, b: f32, c: f32, d: f32| {
            let top = a + (b - a) * tx;
            let bottom = c + (d - c) * tx;
            top + (bottom - top) * ty
        };

        (
            blend(g00.0, g10.0, g01.0, g11.0),
            blend(g00.1, g10.1, g01.1, g11.1),
        )
    }

    /// Unit surface normal at a cell (z up). Out-of-range cells yield `None`.
    pub fn normal(&self, x: usize, y: usize) -> Option<Vec3> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let (gx, gy) = self.gradient(x, y);
        Some(Vec3::new(-gx, -gy, 1.0).normalize())
    }

    /// Minimum, maximum and mean in one pass.
    pub fn min_max_mean(&self) -> FieldStats {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut sum = 0.0f64;
        for &h in &self.data {
            min = min.min(h);
            max = max.max(h);
            sum += h as f64;
        }
        FieldStats {
            min,
            max,
            mean: (sum / self.data.len() as f64) as f32,
        }
    }

    pub fn max_height(&self) -> f32 {
        self.data.iter().copied().fold(f32::MIN, f32::max)
    }

    /// Total elevation, accumulated in f64.
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&h| h as f64).sum()
    }

    fn resolve(&self, x: i64, y: i64, mode: EdgeMode) -> Result<(usize, usize)> {
        match mode {
            EdgeMode::Clamp => Ok((
                x.clamp(0, self.width as i64 - 1) as usize,
                y.clamp(0, self.height as i64 - 1) as usize,
            )),
            EdgeMode::Strict => {
                if self.contains(x, y) {
                    Ok((x as usize, y as usize))
                } else {
                    Err(TerrainError::OutOfBounds {
                        x,
                        y,
                        width: self.width,
                        height: self.height,
                    })
                }
            }
        }
    }

    /// Clamped lower/upper lattice indices and the fractional weight along one axis.
    #[inline]
    fn lerp_axis(&self, f: f32, extent: usize) -> (usize, usize, f32) {
        let last = (extent - 1) as f32;
        let f = if f.is_nan() { 0.0 } else { f.clamp(0.0, last) };
        let i0 = f.floor() as usize;
        let i1 = (i0 + 1).min(extent - 1);
        (i0, i1, f - i0 as f32)
    }
}

fn check_dimensions(width: usize, height: usize, max_cells: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(TerrainError::InvalidDimensions(width, height));
    }
    match width.checked_mul(height) {
        Some(cells) if cells <= max_cells => Ok(()),
        _ => Err(TerrainError::TooLarge { width, height, max_cells }),
    }
}

#[inline]
fn axis_difference(i: usize, extent: usize, h: impl Fn(usize) -> f32) -> f32 {
    if extent < 2 {
        0.0
    } else if i == 0 {
        h(1) - h(0)
    } else if i == extent - 1 {
        h(i) - h(i - 1)
    } else {
        (h(i + 1) - h(i - 1)) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_validates_shape() {
        let short = serde_json::from_str::<Field>(r#"{"width":4,"height":4,"data":[]}"#);
        assert!(short.is_err());
        let empty = serde_json::from_str::<Field>(r#"{"width":0,"height":3,"data":[]}"#);
        assert!(empty.is_err());

        let field = Field::from_fn(3, 2, |x, y| (x + y) as f32).unwrap();
        let json = serde_json::to_string(&field).unwrap();
        assert_eq!(serde_json::from_str::<Field>(&json).unwrap(), field);
    }

    fn ramp_x(width: usize, height: usize, slope: f32) -> Field {
        Field::from_fn(width, height, |x, _| x as f32 * slope).unwrap()
    }

    #[test]
    fn test_field_creation() {
        let field = Field::new(16, 8).unwrap();
        assert_eq!(field.width(), 16);
        assert_eq!(field.height(), 8);
        assert_eq!(field.len(), 128);
        assert!(field.as_slice().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert_eq!(Field::new(0, 4), Err(TerrainError::InvalidDimensions(0, 4)));
        assert!(matches!(
            Field::filled_with_limit(100, 100, 0.0, 1000),
            Err(TerrainError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_from_vec_validation() {
        assert!(matches!(
            Field::from_vec(2, 2, vec![0.0; 3]),
            Err(TerrainError::LengthMismatch { got: 3, .. })
        ));
        assert!(matches!(
            Field::from_vec(2, 2, vec![0.0, f32::NAN, 0.0, 0.0]),
            Err(TerrainError::NonFinite { index: 1, .. })
        ));
        let field = Field::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(field.get(1, 1), 4.0);
        assert_eq!(field.into_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_edge_modes() {
        let mut field = Field::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        assert_eq!(field.at(-5, 0, EdgeMode::Clamp).unwrap(), 1.0);
        assert_eq!(field.at(9, 9, EdgeMode::Clamp).unwrap(), 4.0);
        assert!(matches!(
            field.at(2, 0, EdgeMode::Strict),
            Err(TerrainError::OutOfBounds { x: 2, y: 0, .. })
        ));

        assert!(field.set(-1, 0, 7.0, EdgeMode::Strict).is_err());
        assert_eq!(field.as_slice(), &[1.0, 2.0, 3.0, 4.0]);

        field.set(1, 0, 7.0, EdgeMode::Strict).unwrap();
        assert_eq!(field.get(1, 0), 7.0);
        assert!(field.set(0, 0, f32::INFINITY, EdgeMode::Strict).is_err());
    }

    #[test]
    fn test_bilinear_exact_and_midpoint() {
        let mut field = Field::new(4, 4).unwrap();
        field.set(1, 1, 0.0, EdgeMode::Strict).unwrap();
        field.set(2, 1, 10.0, EdgeMode::Strict).unwrap();
        field.set(1, 2, 0.0, EdgeMode::Strict).unwrap();
        field.set(2, 2, 10.0, EdgeMode::Strict).unwrap();

        assert_eq!(field.sample_bilinear(2.0, 1.0), 10.0);
        assert!((field.sample_bilinear(1.5, 1.5) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_bilinear_clamps_outside() {
        let field = Field::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(field.sample_bilinear(-3.0, -3.0), 1.0);
        assert_eq!(field.sample_bilinear(10.0, 10.0), 4.0);
        assert_eq!(field.sample_bilinear(10.0, 0.0), 2.0);
    }

    #[test]
    fn test_gradient_flat_and_slopes() {
        let flat = Field::filled(10, 10, 5.0).unwrap();
        assert_eq!(flat.gradient(5, 5), (0.0, 0.0));

        let ramp = ramp_x(10, 10, 2.0);
        let (gx, gy) = ramp.gradient(5, 5);
        assert!((gx - 2.0).abs() < 1e-6);
        assert_eq!(gy, 0.0);

        // One-sided differences at both borders.
        assert!((ramp.gradient(0, 3).0 - 2.0).abs() < 1e-6);
        assert!((ramp.gradient(9, 3).0 - 2.0).abs() < 1e-6);

        let ramp_y = Field::from_fn(10, 10, |_, y| y as f32 * 3.0).unwrap();
        let (gx, gy) = ramp_y.gradient(5, 5);
        assert_eq!(gx, 0.0);
        assert!((gy - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_single_column() {
        let field = Field::from_vec(1, 3, vec![0.0, 1.0, 2.0]).unwrap();
        let (gx, gy) = field.gradient(0, 1);
        assert_eq!(gx, 0.0);
        assert!((gy - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_at_interpolates() {
        let ramp = ramp_x(8, 8, 1.5);
        let (gx, gy) = ramp.gradient_at(3.25, 4.75);
        assert!((gx - 1.5).abs() < 1e-6);
        assert!(gy.abs() < 1e-6);
    }

    #[test]
    fn test_normals() {
        let flat = Field::filled(10, 10, 5.0).unwrap();
        let n = flat.normal(5, 5).unwrap();
        assert!((n - Vec3::Z).length() < 1e-6);

        let tilted = Field::from_fn(10, 10, |x, y| (x + y) as f32).unwrap();
        let n = tilted.normal(5, 5).unwrap();
        assert!((n.length() - 1.0).abs() < 1e-5);
        assert!(n.x < 0.0 && n.y < 0.0);

        assert!(flat.normal(15, 5).is_none());
    }

    #[test]
    fn test_min_max_mean() {
        let field = Field::from_vec(2, 2, vec![-1.0, 2.0, 3.0, 4.0]).unwrap();
        let stats = field.min_max_mean();
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.mean - 2.0).abs() < 1e-6);
        assert_eq!(field.max_height(), 4.0);
        assert!((field.sum() - 8.0).abs() < 1e-9);
    }
}
