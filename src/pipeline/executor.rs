//! Frame-by-frame execution of pipeline jobs.

use super::config::PipelineConfig;
use super::stage::{stage_for_job, PipelineError, Stage, StageReport};
use crate::terrain::{Field, FieldStats};

/// One job's contribution to a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRun {
    pub id: String,
    pub name: String,
    pub report: StageReport,
}

/// Everything that happened in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u32,
    pub jobs: Vec<JobRun>,
    /// Field summary once all of the frame's jobs have run.
    pub field: FieldStats,
}

struct ScheduledJob {
    id: String,
    name: String,
    start_frame: i64,
    end_frame: i64,
    stage: Box<dyn Stage>,
}

/// Applies a pipeline's enabled jobs over frames `1..=total_frames`.
///
/// Frame 0 is the initial field and is not produced here. Jobs sharing a frame
/// run in declaration order.
pub struct JobExecutor {
    total_frames: u32,
    jobs: Vec<ScheduledJob>,
}

impl JobExecutor {
    /// Builds a stage for every enabled job. Disabled jobs are skipped entirely.
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let jobs = config
            .jobs
            .iter()
            .filter(|job| job.enabled)
            .map(|job| {
                Ok(ScheduledJob {
                    id: job.id.clone(),
                    name: job.name.clone(),
                    start_frame: job.start_frame,
                    end_frame: job.end_frame,
                    stage: stage_for_job(job)?,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        Ok(Self {
            total_frames: config.total_frames,
            jobs,
        })
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Number of enabled jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn run(&self, field: &mut Field) -> Result<Vec<FrameReport>, PipelineError> {
        self.run_with_callbacks(field, |_, _, _| {}, |_, _, _| {}, |_, _| {})
    }

    /// Runs every frame, reporting progress through the callbacks.
    ///
    /// # Arguments
    /// * `on_job_start` / `on_job_end` - Called with `(id, name, frame)` around each job
    /// * `on_frame_complete` - Called with the frame number and the field after its jobs
    pub fn run_with_callbacks<F1, F2, F3>(
        &self,
        field: &mut Field,
        mut on_job_start: F1,
        mut on_job_end: F2,
        mut on_frame_complete: F3,
    ) -> Result<Vec<FrameReport>, PipelineError>
    where
        F1: FnMut(&str, &str, u32),
        F2: FnMut(&str, &str, u32),
        F3: FnMut(u32, &Field),
    {
        let mut frames = Vec::with_capacity(self.total_frames as usize);

        for frame in 1..=self.total_frames {
            let mut runs = Vec::new();
            for job in self.jobs_for_frame(frame) {
                on_job_start(&job.id, &job.name, frame);
                let report = job.stage.apply(field, frame)?;
                on_job_end(&job.id, &job.name, frame);
                runs.push(JobRun {
                    id: job.id.clone(),
                    name: job.name.clone(),
                    report,
                });
            }

            let stats = field.min_max_mean();
            tracing::info!(frame, jobs = runs.len(), min = stats.min, max = stats.max, "frame complete");
            on_frame_complete(frame, field);
            frames.push(FrameReport {
                frame,
                jobs: runs,
                field: stats,
            });
        }

        Ok(frames)
    }

    fn jobs_for_frame(&self, frame: u32) -> impl Iterator<Item = &ScheduledJob> {
        let frame = frame as i64;
        self.jobs
            .iter()
            .filter(move |job| job.start_frame <= frame && frame <= job.end_frame)
    }
}
