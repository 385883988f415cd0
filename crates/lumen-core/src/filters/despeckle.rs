use crate::frame::Plane;

/// Replace impulse noise: a sample is swapped for its 3x3 median when it
/// differs from the median by more than `threshold`.
///
/// With a `weight` plane the threshold is scaled per pixel, so low-weight
/// samples are replaced more readily.
pub fn despeckle(data: &Plane, threshold: f32, weight: Option<&Plane>) -> Plane {
    let (h, w) = data.dim();
    let mut result = data.clone();
    let mut window = Vec::with_capacity(9);

    for row in 0..h {
        for col in 0..w {
            window.clear();
            for dr in -1..=1_i64 {
                for dc in -1..=1_i64 {
                    let nr = (row as i64 + dr).clamp(0, h as i64 - 1) as usize;
                    let nc = (col as i64 + dc).clamp(0, w as i64 - 1) as usize;
                    window.push(data[[nr, nc]]);
                }
            }
            window.sort_by(f32::total_cmp);
            let median = window[window.len() / 2];

            let limit = match weight {
                Some(wp) => threshold * wp[[row, col]].clamp(0.0, 1.0),
                None => threshold,
            };
            if (data[[row, col]] - median).abs() > limit {
                result[[row, col]] = median;
            }
        }
    }

    result
}
