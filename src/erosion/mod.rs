//! Hydraulic and thermal erosion.
//!
//! [`ErosionSimulator`] traces water particles across a [`Field`](crate::terrain::Field),
//! eroding and depositing sediment without ever lifting a cell above the height
//! the field had at the start of the pass. [`ThermalRelaxer`] slumps slopes
//! steeper than the angle of repose.

mod batched;
mod brush;
mod config;
mod hydraulic;
mod particle;
mod passes;
mod thermal;

pub use brush::ErosionBrush;
pub use config::{ErosionConfig, ExecutionMode, ThermalConfig};
pub use hydraulic::{ErosionSimulator, ErosionStats};
pub use particle::Particle;
pub use passes::{pass_seed, run_passes, PassReport};
pub use thermal::{ThermalRelaxer, ThermalStats};
