//! Heightfield terrain synthesis and erosion.
//!
//! This crate provides fractal noise terrain generation, particle-based
//! hydraulic erosion that never grows terrain above its pre-pass maximum,
//! thermal relaxation, and a frame-based job pipeline driven by JSON.

pub mod error;
pub mod terrain;
pub mod noise;
pub mod erosion;
pub mod pipeline;
pub mod export;

pub use error::{Result, TerrainError};
pub use terrain::{EdgeMode, Field, FieldStats};
pub use noise::NoiseConfig;
pub use erosion::{
    run_passes, ErosionConfig, ErosionSimulator, ErosionStats, ExecutionMode, PassReport,
    ThermalConfig, ThermalRelaxer, ThermalStats,
};
pub use pipeline::{validate, JobExecutor, PipelineConfig, PipelineError, Stage, ValidationReport};
