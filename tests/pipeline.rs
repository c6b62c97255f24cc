//! Loading, validating and running JSON pipelines.

use terrain_sim::export::{export_field_raw, RawFormat};
use terrain_sim::pipeline::{validate, JobExecutor, PipelineConfig, PipelineError, StageReport};

const PIPELINE: &str = r#"{
    "totalFrames": 4,
    "width": 48,
    "height": 40,
    "step0": { "method": "fbm", "seed": 3, "frequency": 0.03, "amplitude": 20.0, "octaves": 4 },
    "jobs": [
        { "id": "rain", "name": "Rain", "startFrame": 1, "endFrame": 3, "type": "hydraulic",
          "config": { "numParticles": 300, "maxLifetime": 20, "seed": 5 } },
        { "id": "slump", "name": "Slump", "startFrame": 3, "endFrame": 4, "type": "thermal",
          "config": { "talusAngle": 0.6, "iterations": 10 } }
    ]
}"#;

#[test]
fn pipeline_runs_end_to_end() {
    let config = PipelineConfig::from_json(PIPELINE).unwrap();
    let report = validate(&config);
    assert!(report.is_valid, "{:?}", report.errors);
    assert_eq!(report.warnings.len(), 1, "frame 3 is shared");

    let executor = JobExecutor::new(&config).unwrap();
    let mut field = config.initial_field().unwrap();
    let initial_max = field.max_height();

    let frames = executor.run(&mut field).unwrap();

    assert_eq!(frames.len(), 4);
    let job_counts: Vec<usize> = frames.iter().map(|f| f.jobs.len()).collect();
    assert_eq!(job_counts, vec![1, 1, 2, 1]);
    assert!(matches!(frames[2].jobs[0].report, StageReport::Hydraulic(_)));
    assert!(matches!(frames[2].jobs[1].report, StageReport::Thermal(_)));
    assert!(field.max_height() <= initial_max);
}

#[test]
fn pipeline_is_deterministic() {
    let config = PipelineConfig::from_json(PIPELINE).unwrap();
    let executor = JobExecutor::new(&config).unwrap();

    let mut a = config.initial_field().unwrap();
    let mut b = config.initial_field().unwrap();
    executor.run(&mut a).unwrap();
    executor.run(&mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn uncovered_frames_fail_validation() {
    let text = PIPELINE.replace(r#""totalFrames": 4"#, r#""totalFrames": 6"#);
    let config = PipelineConfig::from_json(&text).unwrap();
    let report = validate(&config);
    assert!(!report.is_valid);
    assert_eq!(report.uncovered_frames, vec![5, 6]);
}

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    std::fs::write(&path, PIPELINE).unwrap();

    let config = PipelineConfig::from_file(&path).unwrap();
    assert_eq!((config.width, config.height), (48, 40));

    let missing = PipelineConfig::from_file(dir.path().join("missing.json"));
    assert!(matches!(missing, Err(PipelineError::Io(_))));
}

#[test]
fn final_frame_exports() {
    let config = PipelineConfig::from_json(PIPELINE).unwrap();
    let executor = JobExecutor::new(&config).unwrap();
    let mut field = config.initial_field().unwrap();
    executor.run(&mut field).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("final.r32");
    export_field_raw(&field, &path, RawFormat::R32Float, 0.0, 0.0).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 48 * 40 * 4);
}
