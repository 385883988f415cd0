//! Guided image filter (He, Sun & Tang).
//!
//! The output is locally a linear transform of the guide, `q = a * I + b`,
//! fitted per window in the least-squares sense. Edges of the guide survive
//! while flat regions of the source are averaged.

use crate::frame::Plane;

use super::box_filter::{box_mean, weighted_box_mean};

/// Filter `src` guided by `guide`.
///
/// `epsilon` regularizes the per-window slope: larger values smooth more.
/// An optional `weight` plane turns the per-window fit into a weighted fit,
/// so low-weight samples contribute less to the local statistics.
pub fn guided_filter(
    guide: &Plane,
    src: &Plane,
    radius: usize,
    epsilon: f32,
    weight: Option<&Plane>,
) -> Plane {
    let mean = |data: &Plane| match weight {
        Some(w) => weighted_box_mean(data, w, radius),
        None => box_mean(data, radius),
    };

    let mean_i = mean(guide);
    let mean_p = mean(src);
    let corr_ip = mean(&(guide * src));
    let corr_ii = mean(&(guide * guide));

    let a = ndarray::Zip::from(&corr_ip)
        .and(&mean_i)
        .and(&mean_p)
        .and(&corr_ii)
        .map_collect(|&cip, &mi, &mp, &cii| {
            let cov_ip = cip - mi * mp;
            let var_i = (cii - mi * mi).max(0.0);
            cov_ip / (var_i + epsilon)
        });
    let b = &mean_p - &(&a * &mean_i);

    let mean_a = box_mean(&a, radius);
    let mean_b = box_mean(&b, radius);
    &(&mean_a * guide) + &mean_b
}
