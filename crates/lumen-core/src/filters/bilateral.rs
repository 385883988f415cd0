use crate::consts::EPSILON;
use crate::frame::Plane;

use super::fill_rows;

/// Brute-force bilateral filter.
///
/// Each output sample is the average of its `(2r+1)^2` neighborhood weighted
/// by spatial distance (`sigma_spatial`, pixels) and intensity difference
/// (`sigma_range`). An optional `weight` plane scales each neighbor's
/// contribution.
pub fn bilateral_filter(
    data: &Plane,
    radius: usize,
    sigma_spatial: f32,
    sigma_range: f32,
    weight: Option<&Plane>,
) -> Plane {
    let (h, w) = data.dim();
    let mut result = Plane::zeros((h, w));
    if radius == 0 || h == 0 || w == 0 {
        return data.clone();
    }

    let r = radius as i64;
    let spatial_denom = 2.0 * sigma_spatial.max(EPSILON) * sigma_spatial.max(EPSILON);
    let range_denom = 2.0 * sigma_range.max(EPSILON) * sigma_range.max(EPSILON);
    let spatial: Vec<f32> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dy, dx)))
        .map(|(dy, dx)| (-((dy * dy + dx * dx) as f32) / spatial_denom).exp())
        .collect();
    let side = (2 * r + 1) as usize;

    fill_rows(&mut result, |row, mut out| {
        for col in 0..w {
            let center = data[[row, col]];
            let mut sum = 0.0f32;
            let mut norm = 0.0f32;
            for dy in -r..=r {
                let nr = row as i64 + dy;
                if nr < 0 || nr >= h as i64 {
                    continue;
                }
                for dx in -r..=r {
                    let nc = col as i64 + dx;
                    if nc < 0 || nc >= w as i64 {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    let value = data[[nr, nc]];
                    let diff = value - center;
                    let mut k = spatial[(dy + r) as usize * side + (dx + r) as usize]
                        * (-(diff * diff) / range_denom).exp();
                    if let Some(wp) = weight {
                        k *= wp[[nr, nc]];
                    }
                    sum += k * value;
                    norm += k;
                }
            }
            out[col] = if norm > EPSILON { sum / norm } else { center };
        }
    });

    result
}
