use tracing::debug;

use crate::consts::{EPSILON, MIN_LUMA_WEIGHT};
use crate::error::{LumenError, Result};
use crate::frame::{luminance, Plane};
use crate::io::open_track;
use crate::track::Track;

use super::config::{SpatialConfig, WeightingKind};

/// Per-pixel confidence fed to the spatial regularizer. Never used by the
/// temporal stage.
pub enum Weighting {
    None,
    /// Brighter pixels are trusted more: `clamp(luma, MIN_LUMA_WEIGHT, 1)`.
    Luma,
    /// Per-pixel variance from a companion track:
    /// `1 / (1 + variance / mean variance)`.
    Variance(Box<dyn Track>),
}

impl std::fmt::Debug for Weighting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Luma => write!(f, "Luma"),
            Self::Variance(track) => write!(f, "Variance({})", track.name()),
        }
    }
}

impl Weighting {
    /// Open the variance source when the configuration asks for one.
    pub fn from_config(cfg: &SpatialConfig) -> Result<Self> {
        match cfg.weighting {
            WeightingKind::None => Ok(Self::None),
            WeightingKind::Luma => Ok(Self::Luma),
            WeightingKind::Variance => {
                let path = cfg.variance_source.as_ref().ok_or_else(|| {
                    LumenError::Config("variance weighting requires a variance source".into())
                })?;
                let track = open_track(path)?;
                debug!(source = track.name(), "Opened variance source");
                Ok(Self::Variance(track))
            }
        }
    }

    /// One weight plane per color plane, or `None` when unweighted.
    pub fn planes(&self, color: &[Plane], frame: i64) -> Result<Option<Vec<Plane>>> {
        let Some(first) = color.first() else {
            return Ok(None);
        };
        match self {
            Self::None => Ok(None),
            Self::Luma => {
                let weight = luminance(color).mapv(|l| l.clamp(MIN_LUMA_WEIGHT, 1.0));
                Ok(Some(vec![weight; color.len()]))
            }
            Self::Variance(track) => {
                if !track.contains(frame) {
                    return Err(LumenError::FrameOutOfRange {
                        frame,
                        begin: track.begin(),
                        end: track.end(),
                    });
                }
                let variance = track
                    .fetch(track.sample(frame), track.channels())
                    .map_err(|cause| LumenError::FrameFetch {
                        frame,
                        source_name: track.name().to_string(),
                        cause: Box::new(cause),
                    })?;
                if variance.is_empty() {
                    return Err(LumenError::EmptySequence);
                }
                if variance.dim() != first.dim() {
                    return Err(LumenError::ShapeMismatch {
                        expected_w: first.ncols(),
                        expected_h: first.nrows(),
                        got_w: variance.width(),
                        got_h: variance.height(),
                    });
                }
                let weights = if variance.plane_count() == color.len() {
                    variance.planes().iter().map(variance_weight).collect()
                } else {
                    vec![variance_weight(variance.plane(0)); color.len()]
                };
                Ok(Some(weights))
            }
        }
    }
}

fn variance_weight(variance: &Plane) -> Plane {
    let clamped = variance.mapv(|v| v.max(0.0));
    let mean = clamped.mean().unwrap_or(0.0).max(EPSILON);
    clamped.mapv(|v| 1.0 / (1.0 + v / mean))
}
