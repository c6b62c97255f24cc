//! Simulation stage trait and the erosion stages built on it.

use thiserror::Error;

use super::config::{JobKind, SimulationJob};
use crate::erosion::{pass_seed, ErosionConfig, ErosionSimulator, ErosionStats, ThermalConfig, ThermalRelaxer, ThermalStats};
use crate::error::TerrainError;
use crate::terrain::Field;

/// Errors that can occur while loading or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid pipeline configuration: {0}")]
    Schema(String),
    #[error(transparent)]
    Terrain(#[from] TerrainError),
    #[error("Stage '{0}' failed: {1}")]
    StageFailed(String, String),
    #[error("Pipeline failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a stage did to the field in one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StageReport {
    Hydraulic(ErosionStats),
    Thermal(ThermalStats),
}

/// A simulation step applied to the field once per frame it is active.
pub trait Stage: Send + Sync {
    /// Human-readable name for logs and callbacks.
    fn name(&self) -> &str;

    /// Applies the stage for `frame`, modifying the field in place.
    fn apply(&self, field: &mut Field, frame: u32) -> Result<StageReport, PipelineError>;
}

/// Builds the stage for a job, validating its configuration.
pub fn stage_for_job(job: &SimulationJob) -> Result<Box<dyn Stage>, PipelineError> {
    let stage: Box<dyn Stage> = match &job.kind {
        JobKind::Hydraulic(config) => Box::new(HydraulicStage::new(&job.name, config.clone())?),
        JobKind::Thermal(config) => Box::new(ThermalStage::new(&job.name, config.clone())?),
    };
    Ok(stage)
}

/// Particle erosion with a fresh spawn sequence every frame.
pub struct HydraulicStage {
    name: String,
    simulator: ErosionSimulator,
}

impl HydraulicStage {
    pub fn new(name: &str, config: ErosionConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            name: name.to_string(),
            simulator: ErosionSimulator::new(config)?,
        })
    }
}

impl Stage for HydraulicStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, field: &mut Field, frame: u32) -> Result<StageReport, PipelineError> {
        let seed = pass_seed(self.simulator.config().seed, frame);
        let stats = self.simulator.run_seeded(field, seed);
        if !stats.field.mean.is_finite() {
            return Err(PipelineError::StageFailed(
                self.name.clone(),
                format!("field statistics became non-finite at frame {frame}"),
            ));
        }
        Ok(StageReport::Hydraulic(stats))
    }
}

/// Thermal relaxation capped at the field maximum at the start of the frame.
pub struct ThermalStage {
    name: String,
    relaxer: ThermalRelaxer,
}

impl ThermalStage {
    pub fn new(name: &str, config: ThermalConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            name: name.to_string(),
            relaxer: ThermalRelaxer::new(config)?,
        })
    }
}

impl Stage for ThermalStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, field: &mut Field, _frame: u32) -> Result<StageReport, PipelineError> {
        Ok(StageReport::Thermal(self.relaxer.relax(field)))
    }
}
