use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use lumen_core::consts::{
    DEFAULT_FLOW_ALPHA, DEFAULT_ITERATIONS, DEFAULT_MATCH_RADIUS, DEFAULT_PATCH_RADIUS,
    DEFAULT_PYRAMID_LEVELS, DEFAULT_WINDOW_RADIUS,
};
use lumen_core::io::{open_track, ImageSequenceSink};
use lumen_core::pipeline::config::{
    ConditioningConfig, DenoiseConfig, IntegrationConfig, OutputConfig, SpatialConfig,
    TemporalConfig, WindowConfig,
};
use lumen_core::pipeline::{run_denoise, PipelineStage, ProgressReporter, WindowSpec};
use lumen_core::track::Track;
use tracing::debug;

use crate::summary::{print_denoise_summary, print_run_summary};

#[derive(Args)]
pub struct DenoiseArgs {
    /// Input SER file or directory of numbered images
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Denoise config file (TOML); replaces all other tuning flags
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Neighbor frames on each side of the center (0 = spatial only)
    #[arg(short, long, default_value_t = DEFAULT_WINDOW_RADIUS)]
    pub radius: usize,

    /// First frame to process
    #[arg(long)]
    pub first: Option<i64>,

    /// Last frame to process
    #[arg(long)]
    pub last: Option<i64>,

    /// Spatial filter: none, guided, guided-color, bilateral, wavelet,
    /// despeckle, savitzky-golay
    #[arg(long, default_value = "guided")]
    pub spatial: String,

    /// Spatial filter radius
    #[arg(long, default_value_t = 2)]
    pub spatial_radius: usize,

    /// Guided filter epsilon
    #[arg(long, default_value_t = 1e-3)]
    pub epsilon: f32,

    /// Bilateral spatial sigma in pixels
    #[arg(long, default_value_t = 2.0)]
    pub sigma_spatial: f32,

    /// Bilateral range sigma
    #[arg(long, default_value_t = 0.05)]
    pub sigma_range: f32,

    /// Despeckle outlier threshold
    #[arg(long, default_value_t = 0.05)]
    pub despeckle_threshold: f32,

    /// Savitzky-Golay polynomial order
    #[arg(long, default_value_t = 2)]
    pub sg_order: usize,

    /// Comma-separated wavelet thresholds, finest layer first
    #[arg(long)]
    pub thresholds: Option<String>,

    /// Spatial weighting: none, luma, variance
    #[arg(long, default_value = "none")]
    pub weighting: String,

    /// Variance track for --weighting variance
    #[arg(long)]
    pub variance_source: Option<PathBuf>,

    /// Alignment: patch-match, hierarchical-patch-match, horn-schunck, robust-flow
    #[arg(long, default_value = "patch-match")]
    pub temporal: String,

    /// Alignment search radius in pixels
    #[arg(long, default_value_t = DEFAULT_MATCH_RADIUS)]
    pub match_radius: usize,

    /// Patch half-size for patch-match
    #[arg(long, default_value_t = DEFAULT_PATCH_RADIUS)]
    pub patch_radius: usize,

    /// Alignment iterations
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: usize,

    /// Pyramid levels for hierarchical and variational alignment
    #[arg(long, default_value_t = DEFAULT_PYRAMID_LEVELS)]
    pub levels: usize,

    /// Smoothness weight for the variational solvers
    #[arg(long, default_value_t = DEFAULT_FLOW_ALPHA)]
    pub alpha: f32,

    /// Skip the FFT global-translation prior
    #[arg(long)]
    pub no_global_prior: bool,

    /// Integration method: mse, robust-average
    #[arg(long, default_value = "mse")]
    pub integration: String,

    /// Windowed MSE radius
    #[arg(long)]
    pub mse_radius: Option<usize>,

    /// Windowed MSE acceptance threshold
    #[arg(long)]
    pub mse_threshold: Option<f32>,

    /// Forward/backward consistency threshold in [0, 1] (0 = off)
    #[arg(long, default_value_t = 0.0)]
    pub confidence: f32,

    /// Consistency sharpness; higher rejects more motion
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub conservativeness: i32,

    /// Vector field smoothing strength (0 = off)
    #[arg(long, default_value_t = 0.0)]
    pub vector_filter: f32,

    /// Align and compare in the log domain
    #[arg(long)]
    pub log_domain: bool,

    /// Keep processing after a frame fails
    #[arg(long)]
    pub keep_going: bool,

    /// Write colorized vector fields into this directory
    #[arg(long)]
    pub debug_vectors: Option<PathBuf>,

    /// Also write per-channel error maps (needs --debug-vectors)
    #[arg(long)]
    pub debug_error_maps: bool,

    /// Output file name prefix
    #[arg(long, default_value = "denoised")]
    pub prefix: String,

    /// Output format: tiff, png
    #[arg(long, default_value = "tiff")]
    pub format: String,

    /// Output sample depth: u8, u16
    #[arg(long, default_value = "u16")]
    pub depth: String,
}

/// Drives an indicatif bar from pipeline progress.
struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:20} [{bar:40}] {pos}/{len} ({eta})")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.bar.set_message(stage.to_string());
        self.bar.set_length(total_items.unwrap_or(0) as u64);
        self.bar.set_position(0);
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        self.bar.finish_with_message("Done");
    }
}

pub fn run(args: &DenoiseArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        DenoiseConfig::from_toml(&contents).context("Invalid denoise config")?
    } else {
        build_config_from_args(args)?
    };
    let spec = WindowSpec::from_config(&config).context("Invalid denoise configuration")?;
    debug!(?spec, "Resolved window spec");

    let track = open_track(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let sink = ImageSequenceSink::new(
        &args.output,
        config.output.prefix.clone(),
        config.output.format,
        config.output.sample_format,
    )
    .with_context(|| format!("Failed to create {}", args.output.display()))?;

    print_denoise_summary(track.as_ref(), &args.output, &spec);

    let reporter = Arc::new(BarReporter::new()?);
    let summary = run_denoise(track.as_ref(), &sink, &config, reporter)
        .with_context(|| format!("Denoising {} failed", track.name()))?;

    println!();
    print_run_summary(&summary);
    println!("\nOutput saved to {}", args.output.display());
    Ok(())
}

fn parse_list(list: &str) -> Result<Vec<f32>> {
    list.split(',')
        .map(|s| {
            s.trim()
                .parse::<f32>()
                .with_context(|| format!("Invalid number '{}'", s.trim()))
        })
        .collect()
}

fn build_config_from_args(args: &DenoiseArgs) -> Result<DenoiseConfig> {
    let mut spatial = SpatialConfig {
        kind: args.spatial.parse()?,
        radius: args.spatial_radius,
        epsilon: args.epsilon,
        sigma_spatial: args.sigma_spatial,
        sigma_range: args.sigma_range,
        threshold: args.despeckle_threshold,
        order: args.sg_order,
        weighting: args.weighting.parse()?,
        variance_source: args.variance_source.clone(),
        ..Default::default()
    };
    if let Some(ref thresholds) = args.thresholds {
        spatial.thresholds = parse_list(thresholds)?;
    }

    Ok(DenoiseConfig {
        log_domain: args.log_domain,
        keep_going: args.keep_going,
        debug_vectors: args.debug_vectors.clone(),
        debug_error_maps: args.debug_error_maps,
        window: WindowConfig {
            radius: args.radius,
            first_frame: args.first,
            last_frame: args.last,
        },
        spatial,
        temporal: TemporalConfig {
            kind: args.temporal.parse()?,
            match_radius: args.match_radius,
            patch_radius: args.patch_radius,
            iterations: args.iterations,
            levels: args.levels,
            global_prior: !args.no_global_prior,
            alpha: args.alpha,
        },
        conditioning: ConditioningConfig {
            confidence_threshold: args.confidence,
            conservativeness: args.conservativeness,
            vector_filter_strength: args.vector_filter,
        },
        integration: IntegrationConfig {
            kind: args.integration.parse()?,
            mse_radius: args.mse_radius,
            mse_threshold: args.mse_threshold,
        },
        output: OutputConfig {
            prefix: args.prefix.clone(),
            format: args.format.parse()?,
            sample_format: args.depth.parse()?,
        },
    })
}
