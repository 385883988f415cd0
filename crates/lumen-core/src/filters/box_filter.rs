use ndarray::Array2;

use crate::consts::EPSILON;
use crate::frame::Plane;

use super::fill_rows;

/// Mean over a `(2r+1) x (2r+1)` window. Windows are truncated at the image
/// border and normalized by the number of samples they actually cover.
pub fn box_mean(data: &Plane, radius: usize) -> Plane {
    let (h, w) = data.dim();
    if radius == 0 || h == 0 || w == 0 {
        return data.clone();
    }

    let integral = integral_image(data);
    let mut result = Plane::zeros((h, w));
    fill_rows(&mut result, |row, mut out| {
        let r0 = row.saturating_sub(radius);
        let r1 = (row + radius + 1).min(h);
        for col in 0..w {
            let c0 = col.saturating_sub(radius);
            let c1 = (col + radius + 1).min(w);
            let sum = integral[[r1, c1]] - integral[[r0, c1]] - integral[[r1, c0]]
                + integral[[r0, c0]];
            let count = ((r1 - r0) * (c1 - c0)) as f64;
            out[col] = (sum / count) as f32;
        }
    });
    result
}

/// Weighted window mean: `box(w * x) / box(w)`. Where the window carries no
/// weight the unweighted mean is used.
pub fn weighted_box_mean(data: &Plane, weight: &Plane, radius: usize) -> Plane {
    let weighted = data * weight;
    let num = box_mean(&weighted, radius);
    let den = box_mean(weight, radius);
    let plain = box_mean(data, radius);
    ndarray::Zip::from(&num)
        .and(&den)
        .and(&plain)
        .map_collect(|&n, &d, &p| if d > EPSILON { n / d } else { p })
}

/// Windowed mean squared error between two planes.
pub fn windowed_mse(a: &Plane, b: &Plane, radius: usize) -> Plane {
    let sq = ndarray::Zip::from(a).and(b).map_collect(|&x, &y| {
        let d = x - y;
        d * d
    });
    box_mean(&sq, radius)
}

/// Summed-area table with a leading zero row and column, accumulated in f64.
fn integral_image(data: &Plane) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut integral = Array2::<f64>::zeros((h + 1, w + 1));
    for row in 0..h {
        let mut row_sum = 0.0f64;
        for col in 0..w {
            row_sum += data[[row, col]] as f64;
            integral[[row + 1, col + 1]] = integral[[row, col + 1]] + row_sum;
        }
    }
    integral
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_image_sums_all_samples() {
        let data = Plane::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32);
        let integral = integral_image(&data);
        assert_eq!(integral[[3, 4]], (0..12).sum::<usize>() as f64);
        assert_eq!(integral[[0, 4]], 0.0);
    }

    #[test]
    fn test_corner_window_is_truncated() {
        let mut data = Plane::zeros((5, 5));
        data[[0, 0]] = 4.0;
        let mean = box_mean(&data, 1);
        // Corner window covers a 2x2 block.
        assert!((mean[[0, 0]] - 1.0).abs() < 1e-6);
        // Interior window covers 3x3.
        assert!((mean[[1, 1]] - 4.0 / 9.0).abs() < 1e-6);
    }
}
