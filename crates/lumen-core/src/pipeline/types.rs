use crate::frame::ImageBuffer;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    /// Radius 0: spatial filtering only.
    SpatialFiltering,
    /// Full temporal window fusion.
    Denoising,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SpatialFiltering => write!(f, "Spatial filtering"),
            Self::Denoising => write!(f, "Denoising"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` work items of the current stage have completed so far.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// One finished output frame.
#[derive(Clone, Debug)]
pub struct FrameOutput {
    pub frame: i64,
    /// Color planes, followed by the normalized integration amount when the
    /// temporal stage ran.
    pub buffer: ImageBuffer,
    /// Names of the planes in `buffer`.
    pub channels: Vec<String>,
    /// Neighbor offsets that took part, in ascending order.
    pub offsets: Vec<i64>,
    /// Accepted (pixel, channel) samples summed over all offsets.
    pub accepted_samples: usize,
}

/// Outcome of a whole run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub frames_written: usize,
    /// Frames that failed and were skipped under `keep_going`.
    pub failed_frames: Vec<i64>,
    pub accepted_samples: usize,
    /// Source frames decoded (each at most once while inside the window).
    pub source_fetches: usize,
}
