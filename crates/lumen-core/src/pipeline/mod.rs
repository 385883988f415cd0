pub mod config;
mod orchestrator;
mod types;
pub mod weights;
pub mod window;

pub use config::{DenoiseConfig, WindowSpec};
pub use orchestrator::{run_denoise, ChannelLayout, Denoiser, RunOptions};
pub use types::{FrameOutput, NoOpReporter, PipelineStage, ProgressReporter, RunSummary};
pub use weights::Weighting;
