//! Water particle state.

use glam::Vec2;

use super::config::ErosionConfig;

/// A single water droplet. Lives only for the duration of one trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub water: f32,
    pub sediment: f32,
    pub steps: u32,
}

impl Particle {
    /// Spawns a particle at rest with a full load of water and no sediment.
    pub fn spawn(position: Vec2, config: &ErosionConfig) -> Self {
        Self {
            position,
            direction: Vec2::ZERO,
            speed: config.initial_speed,
            water: config.initial_water,
            sediment: 0.0,
            steps: 0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.direction.is_finite()
            && self.speed.is_finite()
            && self.water.is_finite()
            && self.sediment.is_finite()
    }

    /// False once the particle has used up its lifetime or evaporated.
    pub fn is_alive(&self, config: &ErosionConfig) -> bool {
        self.steps < config.max_lifetime && self.water >= config.water_threshold
    }
}
