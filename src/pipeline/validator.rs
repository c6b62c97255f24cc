//! Frame-coverage checks for pipeline jobs.

use super::config::{PipelineConfig, SimulationJob};

/// Result of [`validate`]. Errors make the pipeline unrunnable; warnings do not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Frames no enabled job covers, in ascending order.
    pub uncovered_frames: Vec<u32>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Checks job ranges, frame coverage and overlaps.
///
/// Coverage is only computed when every range is well formed. Overlapping
/// enabled jobs are allowed and reported as warnings.
pub fn validate(config: &PipelineConfig) -> ValidationReport {
    let mut report = ValidationReport {
        errors: range_errors(config.total_frames, &config.jobs),
        ..Default::default()
    };

    if report.errors.is_empty() {
        report.uncovered_frames = uncovered_frames(config.total_frames, &config.jobs);
        if !report.uncovered_frames.is_empty() {
            let frames: Vec<String> = report.uncovered_frames.iter().map(u32::to_string).collect();
            report.errors.push(format!("Uncovered frames: {}", frames.join(", ")));
        }
    }

    report.warnings = overlaps(&config.jobs);
    report.is_valid = report.errors.is_empty();
    report
}

fn range_errors(total_frames: u32, jobs: &[SimulationJob]) -> Vec<String> {
    let total = total_frames as i64;
    let mut errors = Vec::new();
    for job in jobs {
        if job.start_frame < 1 {
            errors.push(format!(
                "Job '{}' has invalid startFrame {} (must be >= 1)",
                job.name, job.start_frame
            ));
        }
        if job.end_frame > total {
            errors.push(format!(
                "Job '{}' has endFrame {} exceeding totalFrames {}",
                job.name, job.end_frame, total
            ));
        }
        if job.start_frame > job.end_frame {
            errors.push(format!(
                "Job '{}' has startFrame {} > endFrame {}",
                job.name, job.start_frame, job.end_frame
            ));
        }
    }
    errors
}

fn uncovered_frames(total_frames: u32, jobs: &[SimulationJob]) -> Vec<u32> {
    (1..=total_frames)
        .filter(|&frame| !jobs.iter().any(|job| job.covers(frame)))
        .collect()
}

fn overlaps(jobs: &[SimulationJob]) -> Vec<String> {
    let enabled: Vec<&SimulationJob> = jobs.iter().filter(|job| job.enabled).collect();
    let mut warnings = Vec::new();
    for (i, a) in enabled.iter().enumerate() {
        for b in &enabled[i + 1..] {
            let start = a.start_frame.max(b.start_frame);
            let end = a.end_frame.min(b.end_frame);
            if start <= end {
                warnings.push(format!(
                    "Jobs '{}' and '{}' overlap on frames {}-{}",
                    a.name, b.name, start, end
                ));
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erosion::ThermalConfig;
    use crate::pipeline::config::{JobKind, ModelingConfig};

    fn job(name: &str, start: i64, end: i64) -> SimulationJob {
        SimulationJob {
            id: name.to_lowercase(),
            name: name.to_string(),
            start_frame: start,
            end_frame: end,
            kind: JobKind::Thermal(ThermalConfig::default()),
            enabled: true,
        }
    }

    fn pipeline(total_frames: u32, jobs: Vec<SimulationJob>) -> PipelineConfig {
        PipelineConfig {
            total_frames,
            width: 8,
            height: 8,
            step0: ModelingConfig::default(),
            jobs,
        }
    }

    #[test]
    fn test_full_coverage_is_valid() {
        let report = validate(&pipeline(10, vec![job("A", 1, 5), job("B", 6, 10)]));
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert!(report.uncovered_frames.is_empty());
    }

    #[test]
    fn test_gaps_are_errors() {
        let report = validate(&pipeline(10, vec![job("A", 1, 3), job("B", 7, 10)]));
        assert!(!report.is_valid);
        assert_eq!(report.uncovered_frames, vec![4, 5, 6]);
        assert_eq!(report.errors, vec!["Uncovered frames: 4, 5, 6".to_string()]);
    }

    #[test]
    fn test_no_jobs_leaves_every_frame_uncovered() {
        let report = validate(&pipeline(3, Vec::new()));
        assert!(!report.is_valid);
        assert_eq!(report.uncovered_frames, vec![1, 2, 3]);
    }

    #[test]
    fn test_disabled_jobs_do_not_cover() {
        let mut disabled = job("B", 4, 6);
        disabled.enabled = false;
        let report = validate(&pipeline(6, vec![job("A", 1, 3), disabled]));
        assert_eq!(report.uncovered_frames, vec![4, 5, 6]);
    }

    #[test]
    fn test_overlaps_are_warnings() {
        let report = validate(&pipeline(10, vec![job("A", 1, 6), job("B", 5, 10)]));
        assert!(report.is_valid);
        assert_eq!(report.warnings, vec!["Jobs 'A' and 'B' overlap on frames 5-6".to_string()]);
    }

    #[test]
    fn test_range_errors_skip_coverage() {
        let report = validate(&pipeline(5, vec![job("A", 0, 3), job("B", 4, 8), job("C", 5, 4)]));
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[0].contains("invalid startFrame 0"));
        assert!(report.errors[1].contains("exceeding totalFrames 5"));
        assert!(report.errors[2].contains("startFrame 5 > endFrame 4"));
        assert!(report.uncovered_frames.is_empty());
    }
}
