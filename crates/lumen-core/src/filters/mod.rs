pub mod bilateral;
pub mod box_filter;
pub mod despeckle;
pub mod gaussian_blur;
pub mod guided;
pub mod morphology;
pub mod savitzky_golay;
pub mod wavelet;

use ndarray::parallel::prelude::*;
use ndarray::{ArrayViewMut1, Axis};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{LumenError, Result};
use crate::frame::{luminance, ImageBuffer, Plane};

use bilateral::bilateral_filter;
use despeckle::despeckle;
use guided::guided_filter;
use savitzky_golay::savitzky_golay;
use wavelet::wavelet_denoise;

/// Spatial noise-reduction strategy, resolved from configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum SpatialStrategy {
    /// Pass-through.
    None,
    /// Per-channel self-guided filter.
    Guided { radius: usize, epsilon: f32 },
    /// Every channel guided by the frame's luminance.
    GuidedColor { radius: usize, epsilon: f32 },
    Bilateral {
        radius: usize,
        sigma_spatial: f32,
        sigma_range: f32,
    },
    Wavelet { layers: usize, thresholds: Vec<f32> },
    Despeckle { threshold: f32 },
    SavitzkyGolay { radius: usize, order: usize },
}

impl std::fmt::Display for SpatialStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Guided { radius, epsilon } => write!(f, "Guided (r={radius}, eps={epsilon})"),
            Self::GuidedColor { radius, epsilon } => {
                write!(f, "Guided Color (r={radius}, eps={epsilon})")
            }
            Self::Bilateral {
                radius,
                sigma_spatial,
                sigma_range,
            } => write!(
                f,
                "Bilateral (r={radius}, sigma_s={sigma_spatial}, sigma_r={sigma_range})"
            ),
            Self::Wavelet { layers, .. } => write!(f, "Wavelet ({layers} layers)"),
            Self::Despeckle { threshold } => write!(f, "Despeckle (t={threshold})"),
            Self::SavitzkyGolay { radius, order } => {
                write!(f, "Savitzky-Golay (r={radius}, order={order})")
            }
        }
    }
}

/// Produces a filtered version of one frame's color planes.
///
/// `weights`, when given, holds one reliability plane per color plane.
pub trait SpatialRegularizer: Send + Sync {
    fn filter(&self, color: &ImageBuffer, weights: Option<&[Plane]>) -> Result<ImageBuffer>;
}

impl SpatialRegularizer for SpatialStrategy {
    fn filter(&self, color: &ImageBuffer, weights: Option<&[Plane]>) -> Result<ImageBuffer> {
        if let Some(w) = weights {
            if w.len() != color.plane_count() {
                return Err(LumenError::Config(format!(
                    "{} weight planes supplied for {} color planes",
                    w.len(),
                    color.plane_count()
                )));
            }
            if let Some(bad) = w.iter().find(|p| p.dim() != color.dim()) {
                return Err(LumenError::ShapeMismatch {
                    expected_w: color.width(),
                    expected_h: color.height(),
                    got_w: bad.ncols(),
                    got_h: bad.nrows(),
                });
            }
        }
        let weight = |i: usize| weights.map(|w| &w[i]);

        let planes: Vec<Plane> = match self {
            Self::None => color.planes().to_vec(),
            Self::Guided { radius, epsilon } => color
                .planes()
                .par_iter()
                .enumerate()
                .map(|(i, p)| guided_filter(p, p, *radius, *epsilon, weight(i)))
                .collect(),
            Self::GuidedColor { radius, epsilon } => {
                let guide = luminance(color.planes());
                color
                    .planes()
                    .par_iter()
                    .enumerate()
                    .map(|(i, p)| guided_filter(&guide, p, *radius, *epsilon, weight(i)))
                    .collect()
            }
            Self::Bilateral {
                radius,
                sigma_spatial,
                sigma_range,
            } => color
                .planes()
                .par_iter()
                .enumerate()
                .map(|(i, p)| bilateral_filter(p, *radius, *sigma_spatial, *sigma_range, weight(i)))
                .collect(),
            Self::Wavelet { layers, thresholds } => color
                .planes()
                .par_iter()
                .enumerate()
                .map(|(i, p)| wavelet_denoise(p, *layers, thresholds, weight(i)))
                .collect(),
            Self::Despeckle { threshold } => color
                .planes()
                .par_iter()
                .enumerate()
                .map(|(i, p)| despeckle(p, *threshold, weight(i)))
                .collect(),
            Self::SavitzkyGolay { radius, order } => color
                .planes()
                .par_iter()
                .enumerate()
                .map(|(i, p)| savitzky_golay(p, *radius, *order, weight(i)))
                .collect(),
        };

        ImageBuffer::new(planes)
    }
}

/// Fill `result` row by row, in parallel for large planes.
pub(crate) fn fill_rows<F>(result: &mut Plane, f: F)
where
    F: Fn(usize, ArrayViewMut1<f32>) + Send + Sync,
{
    let (h, w) = result.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        result
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, out)| f(row, out));
    } else {
        for (row, out) in result.axis_iter_mut(Axis(0)).enumerate() {
            f(row, out);
        }
    }
}
