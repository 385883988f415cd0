//! FFT phase correlation, used to seed hierarchical matching with the
//! dominant global translation between two frames.

use ndarray::Array2;
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{LumenError, Result};
use crate::frame::Plane;

/// Dominant translation `(dx, dy)` such that
/// `reference(x, y) ≈ candidate(x + dx, y + dy)`.
pub fn global_translation(reference: &Plane, candidate: &Plane) -> Result<(f32, f32)> {
    let (h, w) = reference.dim();
    if candidate.dim() != (h, w) {
        return Err(LumenError::ShapeMismatch {
            expected_w: w,
            expected_h: h,
            got_w: candidate.ncols(),
            got_h: candidate.nrows(),
        });
    }
    if h < 2 || w < 2 {
        return Ok((0.0, 0.0));
    }

    let ref_fft = fft2d(&apply_hann(reference));
    let cand_fft = fft2d(&apply_hann(candidate));

    // Normalized cross-power spectrum
    let cross_power = ndarray::Zip::from(&ref_fft)
        .and(&cand_fft)
        .map_collect(|&r, &c| {
            let cross = r * c.conj();
            let mag = cross.norm();
            if mag > 1e-12 {
                cross / mag
            } else {
                Complex::new(0.0, 0.0)
            }
        });
    let correlation = ifft2d(&cross_power);

    let (peak_row, peak_col) = find_peak(&correlation);
    let (sub_row, sub_col) = refine_peak(&correlation, peak_row, peak_col);

    // Peak sits at minus the candidate's displacement (with wrap-around).
    let wrap = |peak: usize, size: usize| {
        if peak > size / 2 {
            peak as f64 - size as f64
        } else {
            peak as f64
        }
    };
    let shift_y = wrap(peak_row, h) + sub_row;
    let shift_x = wrap(peak_col, w) + sub_col;

    Ok((-shift_x as f32, -shift_y as f32))
}

/// Remove the mean, then taper with a Hann window so the static window
/// itself does not correlate.
fn apply_hann(data: &Plane) -> Array2<f64> {
    let (h, w) = data.dim();
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / (h * w) as f64;
    Array2::from_shape_fn((h, w), |(row, col)| {
        let wy = 0.5 * (1.0 - (std::f64::consts::TAU * row as f64 / h as f64).cos());
        let wx = 0.5 * (1.0 - (std::f64::consts::TAU * col as f64 / w as f64).cos());
        (data[[row, col]] as f64 - mean) * wy * wx
    })
}

/// 2D FFT: row-wise, then column-wise.
fn fft2d(data: &Array2<f64>) -> Array2<Complex<f64>> {
    let mut result = data.mapv(|v| Complex::new(v, 0.0));
    transform(&mut result, false);
    result
}

fn ifft2d(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut work = data.clone();
    transform(&mut work, true);
    let scale = 1.0 / (h * w) as f64;
    work.mapv(|c| c.re * scale)
}

fn transform(data: &mut Array2<Complex<f64>>, inverse: bool) {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let (row_fft, col_fft) = if inverse {
        (planner.plan_fft_inverse(w), planner.plan_fft_inverse(h))
    } else {
        (planner.plan_fft_forward(w), planner.plan_fft_forward(h))
    };

    let mut buf = Vec::with_capacity(h.max(w));
    for mut row in data.rows_mut() {
        buf.clear();
        buf.extend(row.iter().copied());
        row_fft.process(&mut buf);
        row.iter_mut().zip(buf.iter()).for_each(|(d, s)| *d = *s);
    }
    for mut col in data.columns_mut() {
        buf.clear();
        buf.extend(col.iter().copied());
        col_fft.process(&mut buf);
        col.iter_mut().zip(buf.iter()).for_each(|(d, s)| *d = *s);
    }
}

fn find_peak(data: &Array2<f64>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((row, col), &v) in data.indexed_iter() {
        if v > best_val {
            best_val = v;
            best = (row, col);
        }
    }
    best
}

/// Parabola fit through the peak's 3-neighborhood along each axis.
fn refine_peak(correlation: &Array2<f64>, peak_row: usize, peak_col: usize) -> (f64, f64) {
    let (h, w) = correlation.dim();
    if peak_row == 0 || peak_row >= h - 1 || peak_col == 0 || peak_col >= w - 1 {
        return (0.0, 0.0);
    }
    let fit = |prev: f64, curr: f64, next: f64| {
        let denom = prev - 2.0 * curr + next;
        if denom.abs() > 1e-12 {
            ((prev - next) / (2.0 * denom)).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    };
    (
        fit(
            correlation[[peak_row - 1, peak_col]],
            correlation[[peak_row, peak_col]],
            correlation[[peak_row + 1, peak_col]],
        ),
        fit(
            correlation[[peak_row, peak_col - 1]],
            correlation[[peak_row, peak_col]],
            correlation[[peak_row, peak_col + 1]],
        ),
    )
}
