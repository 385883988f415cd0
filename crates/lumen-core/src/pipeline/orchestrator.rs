use std::fs;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::consts::{ALPHA_CHANNEL, FRAME_BATCH_SIZE};
use crate::error::{LumenError, Result};
use crate::filters::SpatialRegularizer;
use crate::frame::{from_log_domain, luminance, to_log_domain, ImageBuffer, Plane};
use crate::integrate::{
    decide, CenterView, DecisionObserver, NeighborView, NoOpObserver, TemporalAccumulator,
    TrustParams, VectorDumpObserver,
};
use crate::io::FrameSink;
use crate::motion::{condition_field, TemporalAligner};
use crate::track::{FrameCache, Track};

use super::config::{DenoiseConfig, WindowSpec};
use super::types::{FrameOutput, PipelineStage, ProgressReporter, RunSummary};
use super::weights::Weighting;
use super::window::{resolve_range, window_offsets};

static NO_OBSERVER: NoOpObserver = NoOpObserver;
static NO_WEIGHTING: Weighting = Weighting::None;

/// Track channels split into color channels and the optional mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelLayout {
    pub color: Vec<String>,
    pub mask: Option<String>,
}

impl ChannelLayout {
    pub fn from_channels(channels: &[String]) -> Result<Self> {
        let color: Vec<String> = channels
            .iter()
            .filter(|c| c.as_str() != ALPHA_CHANNEL)
            .cloned()
            .collect();
        if color.is_empty() {
            return Err(LumenError::Config("track has no color channels".into()));
        }
        let mask = channels
            .iter()
            .find(|c| c.as_str() == ALPHA_CHANNEL)
            .cloned();
        Ok(Self { color, mask })
    }

    /// Channels to fetch: color first, then the mask.
    pub fn fetch_list(&self) -> Vec<String> {
        self.color.iter().chain(self.mask.iter()).cloned().collect()
    }

    fn output_names(&self, with_integration: bool) -> Vec<String> {
        let mut names = self.color.clone();
        if with_integration {
            names.push(ALPHA_CHANNEL.to_string());
        }
        names
    }
}

/// Options that do not change the numerical result of a frame.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// `[first, last]`; open ends default to the track bounds.
    pub frame_range: Option<(Option<i64>, Option<i64>)>,
    pub keep_going: bool,
}

/// Drives the spatial and temporal stages for each output frame.
///
/// The strategies default to the ones named by the [`WindowSpec`]; each can
/// be replaced by any implementation of its trait.
pub struct Denoiser<'a> {
    spec: &'a WindowSpec,
    regularizer: &'a dyn SpatialRegularizer,
    aligner: &'a dyn TemporalAligner,
    observer: &'a dyn DecisionObserver,
    weighting: &'a Weighting,
}

impl<'a> Denoiser<'a> {
    pub fn new(spec: &'a WindowSpec) -> Self {
        Self {
            spec,
            regularizer: &spec.spatial,
            aligner: &spec.temporal,
            observer: &NO_OBSERVER,
            weighting: &NO_WEIGHTING,
        }
    }

    pub fn with_regularizer(mut self, regularizer: &'a dyn SpatialRegularizer) -> Self {
        self.regularizer = regularizer;
        self
    }

    pub fn with_aligner(mut self, aligner: &'a dyn TemporalAligner) -> Self {
        self.aligner = aligner;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn DecisionObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_weighting(mut self, weighting: &'a Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn spec(&self) -> &WindowSpec {
        self.spec
    }

    /// Produce the output for center frame `frame`.
    pub fn denoise_frame(
        &self,
        cache: &FrameCache<'_>,
        layout: &ChannelLayout,
        frame: i64,
    ) -> Result<FrameOutput> {
        let center = cache.get(frame)?;
        let (color, mask) = center.split_mask(layout.color.len());
        let mask = layout.mask.as_ref().and(mask);

        let weights = self.weighting.planes(color, frame)?;
        let linear = ImageBuffer::new(color.to_vec())?;
        let log_center = self
            .spec
            .log_domain
            .then(|| linear.map_planes(to_log_domain));
        let basis = log_center.as_ref().unwrap_or(&linear);

        let filtered_basis = self.regularizer.filter(basis, weights.as_deref())?;
        let guide = luminance(filtered_basis.planes());
        let filtered = if self.spec.log_domain {
            filtered_basis.map_planes(from_log_domain)
        } else {
            filtered_basis
        };

        let track = cache.track();
        let offsets = window_offsets(frame, self.spec.radius, track.begin(), track.end());
        if offsets.is_empty() {
            debug!(frame, "No temporal neighbors, emitting the filtered center");
            return Ok(FrameOutput {
                frame,
                buffer: filtered,
                channels: layout.output_names(false),
                offsets,
                accepted_samples: 0,
            });
        }

        let reference = luminance(basis.planes());
        let trust = self.spec.trust_params();
        let center_view = CenterView {
            color,
            filtered: filtered.planes(),
            error_basis: basis.planes(),
            mask,
            frame,
        };

        let partials: Vec<(TemporalAccumulator, usize)> = offsets
            .par_iter()
            .map(|&offset| {
                self.integrate_offset(
                    cache,
                    layout,
                    &center_view,
                    &reference,
                    &guide,
                    &trust,
                    offset,
                )
            })
            .collect::<Result<_>>()?;

        // Center first, then offsets in ascending order, so the float sums
        // are identical from run to run.
        let mut accumulator = TemporalAccumulator::new();
        accumulator.accumulate(&linear, 1.0)?;
        let mut accepted_samples = 0;
        for (partial, accepted) in partials {
            accumulator = accumulator.merge(partial)?;
            accepted_samples += accepted;
        }
        debug!(
            frame,
            offsets = ?offsets,
            count = accumulator.count(),
            accepted_samples,
            "Window integrated"
        );

        Ok(FrameOutput {
            frame,
            buffer: accumulator.finalize()?,
            channels: layout.output_names(true),
            offsets,
            accepted_samples,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn integrate_offset(
        &self,
        cache: &FrameCache<'_>,
        layout: &ChannelLayout,
        center: &CenterView<'_>,
        reference: &Plane,
        guide: &Plane,
        trust: &TrustParams,
        offset: i64,
    ) -> Result<(TemporalAccumulator, usize)> {
        let neighbor = cache.get(center.frame + offset)?;
        let (color, mask) = neighbor.split_mask(layout.color.len());
        let mask = layout.mask.as_ref().and(mask);

        let candidate = if self.spec.log_domain {
            let log_color: Vec<Plane> = color.iter().map(to_log_domain).collect();
            luminance(&log_color)
        } else {
            luminance(color)
        };

        let alignment = self
            .aligner
            .align(reference, &candidate, self.spec.needs_backward())?;
        let conditioned = condition_field(alignment, guide, &self.spec.conditioning)?;
        let decision = decide(
            center,
            &NeighborView {
                color,
                mask,
                offset,
            },
            &conditioned,
            trust,
            self.spec.log_domain,
            self.observer,
        )?;

        let mut partial = TemporalAccumulator::new();
        partial.accumulate(&decision.selected, 1.0)?;
        partial.add_integration(&decision.accepted)?;
        Ok((partial, decision.accepted_samples()))
    }

    /// Denoise every frame of the requested range and hand it to `sink`.
    ///
    /// Frames run in batches of `FRAME_BATCH_SIZE`; the source cache keeps
    /// only the frames the current batch's windows can reach. Results are
    /// stored in frame order.
    pub fn run(
        &self,
        track: &dyn Track,
        sink: &dyn FrameSink,
        options: &RunOptions,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<RunSummary> {
        let layout = ChannelLayout::from_channels(track.channels())?;
        let (first, last) = resolve_range(track, options.frame_range)?;
        let radius = self.spec.radius as i64;
        info!(
            source = track.name(),
            first,
            last,
            radius,
            channels = ?layout.fetch_list(),
            spatial = %self.spec.spatial,
            temporal = %self.spec.temporal,
            integration = %self.spec.integration,
            log_domain = self.spec.log_domain,
            "Starting denoise"
        );

        let cache = FrameCache::new(track, layout.fetch_list());
        let frames: Vec<i64> = (first..=last).collect();
        let stage = if radius == 0 {
            PipelineStage::SpatialFiltering
        } else {
            PipelineStage::Denoising
        };
        reporter.begin_stage(stage, Some(frames.len()));

        let mut summary = RunSummary::default();
        let mut first_error: Option<LumenError> = None;
        let mut done = 0;

        for batch in frames.chunks(FRAME_BATCH_SIZE) {
            let (lo, hi) = (batch[0], batch[batch.len() - 1]);
            cache.retain_range(lo - radius, hi + radius);
            cache.prefetch(lo - radius, hi + radius);

            let results: Vec<Result<FrameOutput>> = batch
                .par_iter()
                .map(|&frame| self.denoise_frame(&cache, &layout, frame))
                .collect();

            for (&frame, result) in batch.iter().zip(results) {
                let stored = result.and_then(|output| {
                    sink.store(frame, &output.buffer, &output.channels)?;
                    Ok(output)
                });
                match stored {
                    Ok(output) => {
                        summary.frames_written += 1;
                        summary.accepted_samples += output.accepted_samples;
                    }
                    Err(e) => {
                        error!(frame, source = track.name(), error = %e, "Frame failed");
                        if !options.keep_going {
                            reporter.finish_stage();
                            return Err(e);
                        }
                        summary.failed_frames.push(frame);
                        first_error.get_or_insert(e);
                    }
                }
                done += 1;
                reporter.advance(done);
            }
        }
        reporter.finish_stage();
        summary.source_fetches = cache.fetch_count();

        info!(
            written = summary.frames_written,
            failed = summary.failed_frames.len(),
            accepted_samples = summary.accepted_samples,
            source_fetches = summary.source_fetches,
            "Denoise complete"
        );

        match first_error {
            Some(first) => Err(LumenError::FramesFailed {
                frames: summary.failed_frames,
                first: Box::new(first),
            }),
            None => Ok(summary),
        }
    }
}

/// Validate `config` and run it over `track` with the built-in strategies.
pub fn run_denoise(
    track: &dyn Track,
    sink: &dyn FrameSink,
    config: &DenoiseConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<RunSummary> {
    let spec = WindowSpec::from_config(config)?;
    let weighting = Weighting::from_config(&config.spatial)?;
    let options = RunOptions {
        frame_range: config.frame_range(),
        keep_going: config.keep_going,
    };

    let dump = match &config.debug_vectors {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            Some(VectorDumpObserver::new(dir, config.debug_error_maps))
        }
        None => None,
    };

    let mut denoiser = Denoiser::new(&spec).with_weighting(&weighting);
    if let Some(dump) = &dump {
        denoiser = denoiser.with_observer(dump);
    }
    denoiser.run(track, sink, &options, reporter)
}
