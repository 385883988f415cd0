use crate::consts::B3_KERNEL;
use crate::frame::Plane;

use super::fill_rows;

/// Gaussian blur; `sigma <= 0` returns the input unchanged.
pub fn gaussian_blur(data: &Plane, sigma: f32) -> Plane {
    if sigma <= 0.0 {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    convolve_separable(data, &kernel)
}

/// Smooth with the 5-tap B3 spline kernel in both directions.
pub fn b3_smooth(data: &Plane) -> Plane {
    convolve_separable(data, &B3_KERNEL)
}

/// Separable convolution with an odd-length kernel, clamp-to-edge borders.
pub fn convolve_separable(data: &Plane, kernel: &[f32]) -> Plane {
    let across = convolve_1d(data, kernel, Direction::Horizontal);
    convolve_1d(&across, kernel, Direction::Vertical)
}

/// Normalized Gaussian taps covering three sigma on each side.
fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as isize;
    let s2 = 2.0 * sigma * sigma;
    let taps: Vec<f32> = (-radius..=radius)
        .map(|x| (-(x * x) as f32 / s2).exp())
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.into_iter().map(|k| k / sum).collect()
}

#[derive(Clone, Copy)]
enum Direction {
    Horizontal,
    Vertical,
}

fn convolve_1d(data: &Plane, kernel: &[f32], direction: Direction) -> Plane {
    let (h, w) = data.dim();
    let mut result = Plane::zeros((h, w));
    if h == 0 || w == 0 {
        return result;
    }
    let radius = (kernel.len() / 2) as isize;
    let last = match direction {
        Direction::Horizontal => w as isize - 1,
        Direction::Vertical => h as isize - 1,
    };
    fill_rows(&mut result, |row, mut out| {
        for (col, slot) in out.iter_mut().enumerate() {
            let at = match direction {
                Direction::Horizontal => col,
                Direction::Vertical => row,
            } as isize;
            *slot = kernel
                .iter()
                .enumerate()
                .map(|(ki, &kv)| {
                    let src = (at + ki as isize - radius).clamp(0, last) as usize;
                    let sample = match direction {
                        Direction::Horizontal => data[[row, src]],
                        Direction::Vertical => data[[src, col]],
                    };
                    sample * kv
                })
                .sum();
        }
    });
    result
}
