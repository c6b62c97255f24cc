//! Erosion brush: how a particle's erosion is spread over nearby cells.

/// Precomputed cell offsets and weights within a radius.
///
/// Covers every cell within `radius` of the centre. Weights fall off linearly
/// (`radius + 1 - d`) and sum to 1.
#[derive(Debug, Clone)]
pub struct ErosionBrush {
    radius: u32,
    taps: Vec<(i32, i32, f32)>,
}

impl ErosionBrush {
    pub fn new(radius: u32) -> Self {
        if radius == 0 {
            return Self {
                radius,
                taps: vec![(0, 0, 1.0)],
            };
        }

        let r = radius as i32;
        let rf = radius as f32;
        let mut taps = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                if d <= rf {
                    taps.push((dx, dy, rf + 1.0 - d));
                }
            }
        }

        let total: f32 = taps.iter().map(|&(_, _, w)| w).sum();
        for tap in &mut taps {
            tap.2 /= total;
        }
        Self { radius, taps }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Number of cells the unclipped brush covers.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Calls `apply(x, y, weight)` for every brush cell inside a `width`x`height`
    /// grid around `(cx, cy)`. Taps falling outside are dropped and the remaining
    /// weights renormalized, so they still sum to 1.
    pub fn for_each<F>(&self, cx: usize, cy: usize, width: usize, height: usize, mut apply: F)
    where
        F: FnMut(usize, usize, f32),
    {
        let in_bounds = |dx: i32, dy: i32| {
            let x = cx as i64 + dx as i64;
            let y = cy as i64 + dy as i64;
            if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                Some((x as usize, y as usize))
            } else {
                None
            }
        };

        let total: f32 = self
            .taps
            .iter()
            .filter(|&&(dx, dy, _)| in_bounds(dx, dy).is_some())
            .map(|&(_, _, w)| w)
            .sum();
        if total <= 0.0 {
            return;
        }

        for &(dx, dy, w) in &self.taps {
            if let Some((x, y)) = in_bounds(dx, dy) {
                apply(x, y, w / total);
            }
        }
    }
}
