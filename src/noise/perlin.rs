//! Classic 2D gradient (Perlin) noise over a seeded permutation table.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A Perlin noise source.
///
/// The permutation table is owned by the value, so independent generators
/// never share state. Output is approximately in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct PerlinNoise {
    perm: [u8; 512],
}

impl PerlinNoise {
    /// Builds the permutation table by shuffling `0..=255` with a ChaCha8 stream
    /// seeded from `seed`, then duplicating it to avoid wrapping lookups.
    pub fn new(seed: u32) -> Self {
        let mut base: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
        base.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&base);
        perm[256..].copy_from_slice(&base);
        Self { perm }
    }

    /// Evaluates noise at `(x, y)`.
    pub fn noise(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let ix = x0 as i32;
        let iy = y0 as i32;

        let fx = x - x0;
        let fy = y - y0;
        let u = fade(fx);
        let v = fade(fy);

        let g00 = self.grad(ix, iy, fx, fy);
        let g10 = self.grad(ix.wrapping_add(1), iy, fx - 1.0, fy);
        let g01 = self.grad(ix, iy.wrapping_add(1), fx, fy - 1.0);
        let g11 = self.grad(ix.wrapping_add(1), iy.wrapping_add(1), fx - 1.0, fy - 1.0);

        let top = lerp(u, g00, g10);
        let bottom = lerp(u, g01, g11);
        lerp(v, top, bottom)
    }

    #[inline]
    fn hash(&self, ix: i32, iy: i32) -> u8 {
        let a = self.perm[(ix & 255) as usize] as usize;
        self.perm[a + (iy & 255) as usize]
    }

    /// Dot product of the lattice gradient at `(ix, iy)` with the offset `(dx, dy)`.
    ///
    /// Eight gradients: the four diagonals and the four axes.
    #[inline]
    fn grad(&self, ix: i32, iy: i32, dx: f32, dy: f32) -> f32 {
        match self.hash(ix, iy) & 7 {
            0 => dx + dy,
            1 => dx - dy,
            2 => -dx + dy,
            3 => -dx - dy,
            4 => dx,
            5 => -dx,
            6 => dy,
            _ => -dy,
        }
    }
}

/// Quintic fade `6t^5 - 15t^4 + 10t^3` (zero first and second derivatives at 0 and 1).
#[inline]
pub fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
pub fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + t * (b - a)
}
