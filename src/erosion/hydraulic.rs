//! Particle-based hydraulic erosion.
//!
//! Each particle is a water droplet that rolls downhill over the field, picking
//! up sediment where it speeds up and dropping it where it slows down or climbs.
//! Deposition is capped against the field maximum taken at the start of the pass,
//! so no sequence of particles can grow a cell above the original terrain.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::batched;
use super::brush::ErosionBrush;
use super::config::{ErosionConfig, ExecutionMode};
use super::particle::Particle;
use crate::error::Result;
use crate::terrain::{Field, FieldStats};

/// Below this the blended direction is treated as undefined (flat ground).
const MIN_DIRECTION_LENGTH: f32 = 1e-4;

/// Outcome of one erosion pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ErosionStats {
    /// Field summary after the pass.
    pub field: FieldStats,
    /// Deposition ceiling for the pass.
    pub initial_max_height: f32,
    pub particles_simulated: u32,
    /// Particles dropped because their state became non-finite.
    pub particles_discarded: u32,
    pub out_of_bounds_exits: u32,
    pub eroded: f64,
    pub deposited: f64,
    /// Per-cell deposits refused because the cell already sat at the ceiling.
    pub deposits_rejected: u64,
    /// Total sediment that never made it back onto the field; the sum of the
    /// four `lost_*` entries below.
    pub sediment_lost: f64,
    /// Carried off the grid by particles leaving it.
    pub lost_at_exit: f64,
    /// Left over when a particle ended inside the grid and its final drop hit
    /// the ceiling.
    pub lost_on_expiry: f64,
    /// Carried by particles dropped for going non-finite.
    pub lost_on_discard: f64,
    /// Clipped while merging batched deposits against the ceiling.
    pub lost_at_ceiling: f64,
}

/// Running totals for a pass, shared by the sequential and batched paths.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tally {
    pub simulated: u32,
    pub discarded: u32,
    pub out_of_bounds: u32,
    pub eroded: f64,
    pub deposited: f64,
    pub rejected: u64,
    pub lost_at_exit: f64,
    pub lost_on_expiry: f64,
    pub lost_on_discard: f64,
    pub lost_at_ceiling: f64,
}

impl Tally {
    pub(crate) fn merge(&mut self, other: &Tally) {
        self.simulated += other.simulated;
        self.discarded += other.discarded;
        self.out_of_bounds += other.out_of_bounds;
        self.eroded += other.eroded;
        self.deposited += other.deposited;
        self.rejected += other.rejected;
        self.lost_at_exit += other.lost_at_exit;
        self.lost_on_expiry += other.lost_on_expiry;
        self.lost_on_discard += other.lost_on_discard;
        self.lost_at_ceiling += other.lost_at_ceiling;
    }

    fn lost(&self) -> f64 {
        self.lost_at_exit + self.lost_on_expiry + self.lost_on_discard + self.lost_at_ceiling
    }

    fn into_stats(self, field: &Field, initial_max_height: f32) -> ErosionStats {
        ErosionStats {
            field: field.min_max_mean(),
            initial_max_height,
            particles_simulated: self.simulated,
            particles_discarded: self.discarded,
            out_of_bounds_exits: self.out_of_bounds,
            eroded: self.eroded,
            deposited: self.deposited,
            deposits_rejected: self.rejected,
            sediment_lost: self.lost(),
            lost_at_exit: self.lost_at_exit,
            lost_on_expiry: self.lost_on_expiry,
            lost_on_discard: self.lost_on_discard,
            lost_at_ceiling: self.lost_at_ceiling,
        }
    }
}

/// What a particle reads from and writes to while tracing.
///
/// Sequential runs write straight into the [`Field`]; batched runs read a shared
/// snapshot and collect their writes privately.
pub(crate) trait Surface {
    /// Field used for sampling heights and gradients.
    fn terrain(&self) -> &Field;
    /// Current height of a cell including this surface's own writes.
    fn height(&self, x: usize, y: usize) -> f32;
    fn add(&mut self, x: usize, y: usize, delta: f32);
}

impl Surface for Field {
    fn terrain(&self) -> &Field {
        self
    }

    fn height(&self, x: usize, y: usize) -> f32 {
        self.get(x, y)
    }

    fn add(&mut self, x: usize, y: usize, delta: f32) {
        Field::add(self, x, y, delta);
    }
}

/// Read-only snapshot plus a sparse set of pending height changes.
pub(crate) struct DeltaSurface<'a> {
    base: &'a Field,
    deltas: BTreeMap<usize, f32>,
}

impl<'a> DeltaSurface<'a> {
    pub(crate) fn new(base: &'a Field) -> Self {
        Self {
            base,
            deltas: BTreeMap::new(),
        }
    }

    /// Pending changes keyed by cell index, in ascending index order.
    pub(crate) fn into_deltas(self) -> BTreeMap<usize, f32> {
        self.deltas
    }
}

impl Surface for DeltaSurface<'_> {
    fn terrain(&self) -> &Field {
        self.base
    }

    fn height(&self, x: usize, y: usize) -> f32 {
        let index = self.base.index(x, y);
        self.base.get(x, y) + self.deltas.get(&index).copied().unwrap_or(0.0)
    }

    fn add(&mut self, x: usize, y: usize, delta: f32) {
        let index = self.base.index(x, y);
        *self.deltas.entry(index).or_insert(0.0) += delta;
    }
}

/// Per-pass constants handed to every particle.
pub(crate) struct PassContext<'a> {
    pub config: &'a ErosionConfig,
    pub brush: &'a ErosionBrush,
    /// Highest height deposition may reach (`initial_max_height - deposit_margin`).
    pub deposit_limit: f32,
}

/// Runs hydraulic erosion passes over a [`Field`].
#[derive(Debug, Clone)]
pub struct ErosionSimulator {
    config: ErosionConfig,
    brush: ErosionBrush,
}

impl ErosionSimulator {
    pub fn new(config: ErosionConfig) -> Result<Self> {
        config.validate()?;
        let brush = ErosionBrush::new(config.radius);
        Ok(Self { config, brush })
    }

    pub fn config(&self) -> &ErosionConfig {
        &self.config
    }

    /// Consumes the field, erodes it and hands it back with the pass statistics.
    pub fn run(&self, mut field: Field) -> (Field, ErosionStats) {
        let stats = self.run_in_place(&mut field);
        (field, stats)
    }

    pub fn run_in_place(&self, field: &mut Field) -> ErosionStats {
        self.run_seeded(field, self.config.seed)
    }

    /// Runs one pass with an explicit seed in place of `config.seed`.
    pub fn run_seeded(&self, field: &mut Field, seed: u64) -> ErosionStats {
        let initial_max_height = field.max_height();
        let ctx = self.context(initial_max_height);
        let mut tally = Tally::default();

        match self.config.mode {
            ExecutionMode::Sequential => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                for _ in 0..self.config.particle_count {
                    let start = random_spawn(field, &mut rng);
                    trace(field, start, &ctx, &mut rng, &mut tally);
                }
            }
            ExecutionMode::Batched { batch_size } => {
                batched::run(field, &ctx, seed, batch_size, &mut tally);
            }
        }

        self.finish(field, initial_max_height, tally)
    }

    /// Traces one particle from each supplied position, in order, on the live field.
    ///
    /// The configured particle count and execution mode are ignored; `config.seed`
    /// only drives direction picks on flat ground.
    pub fn run_with_spawns(&self, field: &mut Field, spawns: &[Vec2]) -> ErosionStats {
        let initial_max_height = field.max_height();
        let ctx = self.context(initial_max_height);
        let mut tally = Tally::default();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        for &start in spawns {
            trace(field, start, &ctx, &mut rng, &mut tally);
        }

        self.finish(field, initial_max_height, tally)
    }

    fn context(&self, initial_max_height: f32) -> PassContext<'_> {
        PassContext {
            config: &self.config,
            brush: &self.brush,
            deposit_limit: initial_max_height - self.config.deposit_margin,
        }
    }

    fn finish(&self, field: &Field, initial_max_height: f32, tally: Tally) -> ErosionStats {
        let stats = tally.into_stats(field, initial_max_height);
        tracing::debug!(
            particles = stats.particles_simulated,
            discarded = stats.particles_discarded,
            out_of_bounds = stats.out_of_bounds_exits,
            eroded = stats.eroded,
            deposited = stats.deposited,
            rejected = stats.deposits_rejected,
            lost = stats.sediment_lost,
            ceiling = initial_max_height,
            max = stats.field.max,
            "hydraulic erosion pass complete"
        );
        stats
    }
}

/// Uniform spawn position in `[0, w-1) x [0, h-1)`.
pub(crate) fn random_spawn<R: Rng>(field: &Field, rng: &mut R) -> Vec2 {
    Vec2::new(
        spawn_coord(field.width(), rng),
        spawn_coord(field.height(), rng),
    )
}

fn spawn_coord<R: Rng>(extent: usize, rng: &mut R) -> f32 {
    if extent < 2 {
        0.0
    } else {
        rng.random_range(0.0..(extent - 1) as f32)
    }
}

/// Follows one particle until it leaves the grid, dies, or goes non-finite.
///
/// A particle that dies inside the grid drops whatever it still carries at its
/// final position, subject to the deposit limit.
pub(crate) fn trace<S: Surface, R: Rng>(
    surface: &mut S,
    start: Vec2,
    ctx: &PassContext<'_>,
    rng: &mut R,
    tally: &mut Tally,
) {
    let config = ctx.config;
    let (width, height) = (surface.terrain().width(), surface.terrain().height());
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let outside = |p: Vec2| p.x < 0.0 || p.y < 0.0 || p.x > max_x || p.y > max_y;

    tally.simulated += 1;
    let mut particle = Particle::spawn(start, config);
    if !particle.is_finite() {
        tally.discarded += 1;
        return;
    }
    if outside(particle.position) {
        tally.out_of_bounds += 1;
        return;
    }

    while particle.is_alive(config) {
        let terrain = surface.terrain();
        let old_pos = particle.position;
        let (gx, gy) = terrain.gradient_at(old_pos.x, old_pos.y);

        let blended = particle.direction * config.inertia - Vec2::new(gx, gy) * (1.0 - config.inertia);
        let direction = if blended.length() <= MIN_DIRECTION_LENGTH {
            Vec2::from_angle(rng.random_range(0.0..std::f32::consts::TAU))
        } else {
            blended.normalize()
        };
        let new_pos = old_pos + direction;
        if !direction.is_finite() || !new_pos.is_finite() {
            discard(&particle, tally);
            return;
        }
        if outside(new_pos) {
            tally.out_of_bounds += 1;
            tally.lost_at_exit += particle.sediment as f64;
            return;
        }

        let height_drop = terrain.sample_bilinear(old_pos.x, old_pos.y) - terrain.sample_bilinear(new_pos.x, new_pos.y);
        let speed = (particle.speed * particle.speed + height_drop * config.gravity)
            .max(0.0)
            .sqrt()
            .min(config.max_speed);
        let capacity = height_drop.max(config.min_slope) * speed * particle.water * config.capacity_factor;
        if !height_drop.is_finite() || !speed.is_finite() || !capacity.is_finite() {
            discard(&particle, tally);
            return;
        }

        if particle.sediment > capacity || height_drop <= 0.0 {
            let surplus = (particle.sediment - capacity).min(particle.sediment) * config.deposition_speed;
            let amount = if height_drop <= 0.0 {
                particle.sediment.min(-height_drop).max(surplus)
            } else {
                surplus
            }
            .clamp(0.0, particle.sediment);
            if !amount.is_finite() {
                discard(&particle, tally);
                return;
            }
            if amount > 0.0 {
                let placed = deposit(surface, old_pos, amount, ctx.deposit_limit, tally);
                particle.sediment = (particle.sediment - placed).max(0.0);
                tally.deposited += placed as f64;
            }
        } else {
            let amount = ((capacity - particle.sediment) * config.erosion_speed).min(height_drop);
            if !amount.is_finite() {
                discard(&particle, tally);
                return;
            }
            if amount > 0.0 {
                erode(surface, old_pos, amount, ctx.brush);
                particle.sediment += amount;
                tally.eroded += amount as f64;
            }
        }

        particle.position = new_pos;
        particle.direction = direction;
        particle.speed = speed;
        particle.water *= 1.0 - config.evaporation_rate;
        particle.steps += 1;
    }

    if particle.sediment > 0.0 {
        let placed = deposit(surface, particle.position, particle.sediment, ctx.deposit_limit, tally);
        tally.deposited += placed as f64;
        tally.lost_on_expiry += (particle.sediment - placed).max(0.0) as f64;
    }
}

fn discard(particle: &Particle, tally: &mut Tally) {
    tally.discarded += 1;
    if particle.sediment.is_finite() {
        tally.lost_on_discard += particle.sediment as f64;
    }
}

/// Splits `amount` bilinearly over the four cells around `pos`, never raising a
/// cell above `limit`. Returns what was actually placed.
fn deposit<S: Surface>(surface: &mut S, pos: Vec2, amount: f32, limit: f32, tally: &mut Tally) -> f32 {
    let (width, height) = (surface.terrain().width(), surface.terrain().height());
    let x0 = (pos.x.floor() as usize).min(width - 1);
    let y0 = (pos.y.floor() as usize).min(height - 1);
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let tx = pos.x - x0 as f32;
    let ty = pos.y - y0 as f32;

    let corners = [
        (x0, y0, (1.0 - tx) * (1.0 - ty)),
        (x1, y0, tx * (1.0 - ty)),
        (x0, y1, (1.0 - tx) * ty),
        (x1, y1, tx * ty),
    ];

    let mut placed = 0.0;
    for (x, y, weight) in corners {
        let share = amount * weight;
        if share <= 0.0 {
            continue;
        }
        let current = surface.height(x, y);
        if current >= limit {
            tally.rejected += 1;
            continue;
        }
        let share = share.min(limit - current);
        surface.add(x, y, share);
        placed += share;
    }
    placed
}

/// Removes `amount` around the cell nearest `pos`, weighted by the brush.
fn erode<S: Surface>(surface: &mut S, pos: Vec2, amount: f32, brush: &ErosionBrush) {
    let (width, height) = (surface.terrain().width(), surface.terrain().height());
    let cx = (pos.x.round() as usize).min(width - 1);
    let cy = (pos.y.round() as usize).min(height - 1);
    brush.for_each(cx, cy, width, height, |x, y, weight| {
        surface.add(x, y, -amount * weight);
    });
}
