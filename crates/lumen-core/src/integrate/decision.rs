//! Warp & trust decision for one neighbor offset.

use rayon::prelude::*;

use crate::consts::OCCLUSION_PENALTY;
use crate::error::{LumenError, Result};
use crate::filters::box_filter::windowed_mse;
use crate::filters::gaussian_blur::b3_smooth;
use crate::filters::morphology::erode;
use crate::frame::{to_log_domain, ImageBuffer, Plane};
use crate::motion::warp::warp_plane;
use crate::motion::ConditionedField;

use super::observer::DecisionObserver;
use super::TrustParams;

/// Center-frame data shared read-only by every neighbor offset.
pub struct CenterView<'a> {
    /// Raw color planes, linear.
    pub color: &'a [Plane],
    /// Spatially filtered color planes, linear. Fallback for rejected samples.
    pub filtered: &'a [Plane],
    /// Planes the reconstruction error is measured against (the color planes,
    /// log-mapped when processing in the log domain).
    pub error_basis: &'a [Plane],
    pub mask: Option<&'a Plane>,
    pub frame: i64,
}

/// One neighbor frame in linear space.
pub struct NeighborView<'a> {
    pub color: &'a [Plane],
    pub mask: Option<&'a Plane>,
    pub offset: i64,
}

/// Per-offset result: the selected samples plus the number of channels that
/// accepted the warped neighbor at each pixel.
#[derive(Clone, Debug)]
pub struct Decision {
    pub selected: ImageBuffer,
    pub accepted: Plane,
}

impl Decision {
    /// Total accepted (pixel, channel) pairs.
    pub fn accepted_samples(&self) -> usize {
        self.accepted.iter().map(|&a| a as usize).sum()
    }
}

/// Warp the neighbor into center coordinates and choose, per pixel and
/// channel, between the warped sample and the filtered center.
pub fn decide(
    center: &CenterView<'_>,
    neighbor: &NeighborView<'_>,
    conditioned: &ConditionedField,
    params: &TrustParams,
    log_domain: bool,
    observer: &dyn DecisionObserver,
) -> Result<Decision> {
    let channels = center.color.len();
    if channels == 0 {
        return Err(LumenError::EmptySequence);
    }
    if neighbor.color.len() != channels
        || center.filtered.len() != channels
        || center.error_basis.len() != channels
    {
        return Err(LumenError::Config(format!(
            "channel count mismatch: center {channels}, neighbor {}, filtered {}",
            neighbor.color.len(),
            center.filtered.len()
        )));
    }
    let field = &conditioned.field;
    observer.on_vector_field(center.frame, neighbor.offset, field);

    let warped: Vec<Plane> = neighbor
        .color
        .iter()
        .map(|p| warp_plane(p, field))
        .collect::<Result<_>>()?;

    let occlusion = match (center.mask, neighbor.mask) {
        (Some(center_mask), Some(neighbor_mask)) => {
            let warped_mask = warp_plane(neighbor_mask, field)?;
            let visible = erode(&(&warped_mask * center_mask));
            Some(visible.mapv(|v| (1.0 - v) * OCCLUSION_PENALTY))
        }
        _ => None,
    };

    let per_channel: Vec<(Plane, Plane)> = (0..channels)
        .into_par_iter()
        .map(|c| {
            let basis = if log_domain {
                to_log_domain(&warped[c])
            } else {
                warped[c].clone()
            };
            let mut error = windowed_mse(&basis, &center.error_basis[c], params.mse_radius);
            if let Some(rejection) = &conditioned.rejection {
                error += rejection;
            }
            if let Some(occlusion) = &occlusion {
                error += occlusion;
            }
            let error = b3_smooth(&error);
            observer.on_error_map(center.frame, neighbor.offset, c, &error);

            let accept = error.mapv(|e| if e < params.mse_threshold { 1.0 } else { 0.0 });
            let selected = ndarray::Zip::from(&accept)
                .and(&warped[c])
                .and(&center.filtered[c])
                .map_collect(|&a, &n, &f| if a > 0.0 { n } else { f });
            (selected, accept)
        })
        .collect();

    let (h, w) = center.color[0].dim();
    let mut accepted = Plane::zeros((h, w));
    let mut selected = Vec::with_capacity(channels);
    for (plane, accept) in per_channel {
        accepted += &accept;
        selected.push(plane);
    }

    Ok(Decision {
        selected: ImageBuffer::new(selected)?,
        accepted,
    })
}
