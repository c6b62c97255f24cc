//! Pipeline configuration documents.
//!
//! A pipeline is an initial modeling step (frame 0) followed by simulation jobs,
//! each active over an inclusive range of frames:
//!
//! ```json
//! {
//!   "totalFrames": 10,
//!   "step0": { "method": "fbm", "seed": 42 },
//!   "jobs": [
//!     { "id": "rain", "name": "Rain", "startFrame": 1, "endFrame": 10,
//!       "type": "hydraulic", "config": { "numParticles": 5000 } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::stage::PipelineError;
use crate::erosion::{ErosionConfig, ThermalConfig};
use crate::noise::{self, NoiseConfig};
use crate::terrain::{generators, Field};

pub const DEFAULT_GRID_SIZE: usize = 256;

/// Terrain generator used for frame 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelingMethod {
    Perlin,
    #[default]
    Fbm,
    SemiSphere,
    Cone,
    Sigmoid,
}

/// Parameters for the initial terrain.
///
/// Noise methods use `seed` through `lacunarity`; the radial shapes use `radius`
/// and `height` and are centred on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelingConfig {
    pub method: ModelingMethod,
    pub seed: u32,
    pub frequency: f32,
    pub amplitude: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub radius: f32,
    pub height: f32,
}

impl Default for ModelingConfig {
    fn default() -> Self {
        let noise = NoiseConfig::default();
        Self {
            method: ModelingMethod::Fbm,
            seed: noise.seed,
            frequency: noise.frequency,
            amplitude: noise.amplitude,
            octaves: noise.octaves,
            persistence: noise.persistence,
            lacunarity: noise.lacunarity,
            radius: 128.0,
            height: 100.0,
        }
    }
}

impl ModelingConfig {
    pub fn noise(&self) -> NoiseConfig {
        NoiseConfig {
            seed: self.seed,
            frequency: self.frequency,
            amplitude: self.amplitude,
            octaves: self.octaves,
            persistence: self.persistence,
            lacunarity: self.lacunarity,
        }
    }

    /// Builds the frame-0 field.
    pub fn build(&self, width: usize, height: usize) -> crate::error::Result<Field> {
        let (cx, cy) = (width as f32 * 0.5, height as f32 * 0.5);
        match self.method {
            ModelingMethod::Perlin => {
                noise::generate_perlin(width, height, self.seed, self.frequency, self.amplitude)
            }
            ModelingMethod::Fbm => noise::generate_field(width, height, &self.noise()),
            ModelingMethod::SemiSphere => generators::semi_sphere(width, height, cx, cy, self.radius),
            ModelingMethod::Cone => generators::cone(width, height, cx, cy, self.radius, self.height),
            ModelingMethod::Sigmoid => generators::sigmoid(width, height, cx, cy, self.radius, self.height),
        }
    }
}

/// Simulation applied by a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    Hydraulic(ErosionConfig),
    Thermal(ThermalConfig),
}

impl JobKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            JobKind::Hydraulic(_) => "hydraulic",
            JobKind::Thermal(_) => "thermal",
        }
    }
}

/// A simulation active over frames `start_frame..=end_frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationJob {
    pub id: String,
    pub name: String,
    pub start_frame: i64,
    pub end_frame: i64,
    pub kind: JobKind,
    pub enabled: bool,
}

impl SimulationJob {
    pub fn covers(&self, frame: u32) -> bool {
        self.enabled && (self.start_frame..=self.end_frame).contains(&(frame as i64))
    }
}

/// A complete pipeline description.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub total_frames: u32,
    pub width: usize,
    pub height: usize,
    pub step0: ModelingConfig,
    pub jobs: Vec<SimulationJob>,
}

/// Wire shape of a job before its `config` is interpreted by `type`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJob {
    id: String,
    name: String,
    start_frame: i64,
    end_frame: i64,
    #[serde(rename = "type")]
    kind: String,
    config: Value,
    #[serde(default = "enabled_default")]
    enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl PipelineConfig {
    /// Parses and schema-checks a JSON pipeline document.
    ///
    /// Frame coverage is not checked here; see [`validate`](super::validate).
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        let root: Value = serde_json::from_str(text)?;
        Self::from_value(&root)
    }

    pub fn from_value(root: &Value) -> Result<Self, PipelineError> {
        let object = root
            .as_object()
            .ok_or_else(|| schema("configuration must be a JSON object"))?;

        let total_frames = match object.get("totalFrames") {
            None => return Err(schema("configuration missing required field: totalFrames")),
            Some(value) => value.as_i64().ok_or_else(|| schema("totalFrames must be an integer"))?,
        };
        if total_frames < 1 {
            return Err(schema("totalFrames must be >= 1"));
        }
        let total_frames =
            u32::try_from(total_frames).map_err(|_| schema(format!("totalFrames {total_frames} is too large")))?;

        let step0 = match object.get("step0") {
            None => return Err(schema("configuration missing required field: step0")),
            Some(value) if !value.is_object() => return Err(schema("step0 must be an object")),
            Some(value) => ModelingConfig::deserialize(value).map_err(|e| schema(format!("step0: {e}")))?,
        };

        let width = grid_extent(object.get("width"), "width")?;
        let height = grid_extent(object.get("height"), "height")?;

        let jobs = match object.get("jobs") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_job(item).map_err(|e| schema(format!("jobs[{i}]: {e}"))))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(schema("jobs must be an array")),
        };

        Ok(Self {
            total_frames,
            width,
            height,
            step0,
            jobs,
        })
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Builds the frame-0 field from `step0`.
    pub fn initial_field(&self) -> Result<Field, PipelineError> {
        Ok(self.step0.build(self.width, self.height)?)
    }
}

fn schema(message: impl Into<String>) -> PipelineError {
    PipelineError::Schema(message.into())
}

fn grid_extent(value: Option<&Value>, name: &str) -> Result<usize, PipelineError> {
    match value {
        None => Ok(DEFAULT_GRID_SIZE),
        Some(v) => v
            .as_u64()
            .filter(|&n| n >= 1)
            .map(|n| n as usize)
            .ok_or_else(|| schema(format!("{name} must be a positive integer"))),
    }
}

fn parse_job(value: &Value) -> Result<SimulationJob, String> {
    let raw = RawJob::deserialize(value).map_err(|e| e.to_string())?;
    let kind = match raw.kind.as_str() {
        "hydraulic" => JobKind::Hydraulic(ErosionConfig::deserialize(&raw.config).map_err(|e| e.to_string())?),
        "thermal" => JobKind::Thermal(ThermalConfig::deserialize(&raw.config).map_err(|e| e.to_string())?),
        other => return Err(format!("unknown job type: {other}")),
    };
    Ok(SimulationJob {
        id: raw.id,
        name: raw.name,
        start_frame: raw.start_frame,
        end_frame: raw.end_frame,
        kind,
        enabled: raw.enabled,
    })
}
