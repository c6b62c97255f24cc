//! Pipeline module for running simulation jobs over a sequence of frames.
//!
//! A [`PipelineConfig`] describes the initial terrain (frame 0) and a list of
//! jobs, each active over a frame range. [`validate`] checks coverage and
//! [`JobExecutor`] applies the jobs frame by frame.

mod config;
mod executor;
mod stage;
mod validator;

pub use config::{
    JobKind, ModelingConfig, ModelingMethod, PipelineConfig, SimulationJob, DEFAULT_GRID_SIZE,
};
pub use executor::{FrameReport, JobExecutor, JobRun};
pub use stage::{stage_for_job, HydraulicStage, PipelineError, Stage, StageReport, ThermalStage};
pub use validator::{validate, ValidationReport};
