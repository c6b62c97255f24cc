//! Erosion configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, ensure_unit, Result, TerrainError};

/// How the particles of one pass are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExecutionMode {
    /// One particle after another on the live field. Later particles see
    /// every change made by earlier ones.
    #[default]
    Sequential,
    /// Particles of a batch trace in parallel against the batch-start
    /// snapshot; their changes are merged in particle order afterwards.
    Batched {
        #[serde(rename = "batchSize")]
        batch_size: usize,
    },
}

/// Parameters for particle-based hydraulic erosion.
///
/// JSON keys are camelCase; the older `numParticles`/`erosionRate`/... names
/// are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ErosionConfig {
    /// Number of particles per pass.
    #[serde(alias = "numParticles")]
    pub particle_count: u32,
    /// Maximum number of steps a particle may take.
    pub max_lifetime: u32,
    /// How much of its previous direction a particle keeps (0-1).
    pub inertia: f32,
    /// Multiplier for sediment capacity (Kc).
    #[serde(alias = "sedimentCapacity")]
    pub capacity_factor: f32,
    /// Floor for the slope term of the capacity, so flat runs still carry some sediment.
    pub min_slope: f32,
    /// Fraction of free capacity picked up per step (Ks).
    #[serde(alias = "erosionRate")]
    pub erosion_speed: f32,
    /// Fraction of surplus sediment dropped per step (Kd).
    #[serde(alias = "depositionRate")]
    pub deposition_speed: f32,
    /// Fraction of water lost per step (0-1).
    pub evaporation_rate: f32,
    pub gravity: f32,
    /// Erosion brush radius in cells; 0 erodes a single cell.
    #[serde(alias = "erosionRadius")]
    pub radius: u32,
    pub initial_water: f32,
    pub initial_speed: f32,
    /// Speed cap per particle.
    pub max_speed: f32,
    /// Particles with less water than this evaporate.
    pub water_threshold: f32,
    /// Deposition keeps every cell at least this far below the pass-start maximum.
    pub deposit_margin: f32,
    /// Seed for spawn positions and flat-ground direction picks.
    pub seed: u64,
    pub mode: ExecutionMode,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            particle_count: 50_000,
            max_lifetime: 30,
            inertia: 0.05,
            capacity_factor: 4.0,
            min_slope: 0.01,
            erosion_speed: 0.3,
            deposition_speed: 0.3,
            evaporation_rate: 0.01,
            gravity: 4.0,
            radius: 1,
            initial_water: 1.0,
            initial_speed: 0.0,
            max_speed: 10.0,
            water_threshold: 0.01,
            deposit_margin: 1.0,
            seed: 0,
            mode: ExecutionMode::Sequential,
        }
    }
}

impl ErosionConfig {
    /// Gentle erosion that mostly smooths ridges.
    pub fn light(seed: u64) -> Self {
        Self {
            particle_count: 10_000,
            erosion_speed: 0.1,
            deposition_speed: 0.1,
            radius: 2,
            seed,
            ..Default::default()
        }
    }

    /// Aggressive erosion that carves channels.
    pub fn heavy(seed: u64) -> Self {
        Self {
            particle_count: 200_000,
            max_lifetime: 64,
            inertia: 0.1,
            capacity_factor: 8.0,
            erosion_speed: 0.5,
            seed,
            ..Default::default()
        }
    }

    /// Rejects out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        ensure_unit("inertia", self.inertia)?;
        ensure_unit("evaporation rate", self.evaporation_rate)?;
        ensure_non_negative("capacity factor", self.capacity_factor)?;
        ensure_non_negative("min slope", self.min_slope)?;
        ensure_non_negative("erosion speed", self.erosion_speed)?;
        ensure_non_negative("deposition speed", self.deposition_speed)?;
        ensure_non_negative("gravity", self.gravity)?;
        ensure_non_negative("initial speed", self.initial_speed)?;
        ensure_non_negative("water threshold", self.water_threshold)?;
        ensure_non_negative("deposit margin", self.deposit_margin)?;
        ensure_positive("initial water", self.initial_water)?;
        ensure_positive("max speed", self.max_speed)?;
        if let ExecutionMode::Batched { batch_size: 0 } = self.mode {
            return Err(TerrainError::invalid("batch size must be at least 1"));
        }
        Ok(())
    }
}

/// Parameters for slope-driven thermal relaxation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThermalConfig {
    /// Angle of repose in radians. Typical: 0.5-0.8.
    pub talus_angle: f32,
    /// Fraction of the excess slope moved per iteration (0-1).
    pub transfer_rate: f32,
    pub iterations: u32,
    /// Horizontal distance between neighbouring cells.
    pub cell_size: f32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            talus_angle: 0.7,
            transfer_rate: 0.5,
            iterations: 100,
            cell_size: 1.0,
        }
    }
}

impl ThermalConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("talus angle", self.talus_angle)?;
        if self.talus_angle >= std::f32::consts::FRAC_PI_2 {
            return Err(TerrainError::invalid(format!(
                "talus angle must be below pi/2 (got {})",
                self.talus_angle
            )));
        }
        ensure_unit("transfer rate", self.transfer_rate)?;
        ensure_positive("cell size", self.cell_size)?;
        Ok(())
    }

    /// Height difference between neighbours above which material slides.
    pub fn talus_threshold(&self) -> f32 {
        self.talus_angle.tan() * self.cell_size
    }
}
