use crate::frame::Plane;

use super::gaussian_blur::convolve_separable;

/// Below this normalizer the weighted result falls back to the plain one.
const MIN_NORMALIZER: f32 = 1e-3;

/// Separable Savitzky–Golay smoothing: a least-squares polynomial of degree
/// `order` is fitted over `2 * radius + 1` samples along rows, then columns.
///
/// With a `weight` plane the result is a normalized convolution,
/// `sg(w * x) / sg(w)`.
pub fn savitzky_golay(
    data: &Plane,
    radius: usize,
    order: usize,
    weight: Option<&Plane>,
) -> Plane {
    if radius == 0 {
        return data.clone();
    }
    let kernel = savgol_coefficients(radius, order);
    let plain = convolve_separable(data, &kernel);

    match weight {
        None => plain,
        Some(w) => {
            let num = convolve_separable(&(data * w), &kernel);
            let den = convolve_separable(w, &kernel);
            ndarray::Zip::from(&num)
                .and(&den)
                .and(&plain)
                .map_collect(|&n, &d, &p| if d.abs() > MIN_NORMALIZER { n / d } else { p })
        }
    }
}

/// Smoothing coefficients (zeroth derivative at the window center).
///
/// With `A[i][j] = i^j` for `i` in `-r..=r`, the coefficients are row 0 of
/// `(AᵀA)⁻¹Aᵀ`. The order is capped at `2r` so the system stays solvable.
pub fn savgol_coefficients(radius: usize, order: usize) -> Vec<f32> {
    let order = order.min(2 * radius);
    let n = order + 1;
    let r = radius as i64;

    // Normal matrix M[j][k] = sum_i i^(j+k)
    let mut m = vec![vec![0.0f64; n]; n];
    for (j, m_row) in m.iter_mut().enumerate() {
        for (k, m_jk) in m_row.iter_mut().enumerate() {
            *m_jk = (-r..=r).map(|i| (i as f64).powi((j + k) as i32)).sum();
        }
    }
    let mut rhs = vec![0.0f64; n];
    rhs[0] = 1.0;
    let x = solve_linear(m, rhs);

    (-r..=r)
        .map(|i| {
            x.iter()
                .enumerate()
                .map(|(j, &xj)| xj * (i as f64).powi(j as i32))
                .sum::<f64>() as f32
        })
        .collect()
}

/// Gaussian elimination with partial pivoting.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&p, &q| a[p][col].abs().total_cmp(&a[q][col].abs()))
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);

        let diag = a[col][col];
        if diag.abs() < 1e-12 {
            continue;
        }
        for row in col + 1..n {
            let factor = a[row][col] / diag;
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = if a[row][row].abs() < 1e-12 {
            0.0
        } else {
            (b[row] - tail) / a[row][row]
        };
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_window_five_matches_reference_table() {
        // Classic 5-point quadratic smoothing: [-3, 12, 17, 12, -3] / 35
        let c = savgol_coefficients(2, 2);
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0].map(|v: f32| v / 35.0);
        for (got, want) in c.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-5, "{got} vs {want}");
        }
    }

    #[test]
    fn order_zero_is_moving_average() {
        let c = savgol_coefficients(1, 0);
        for v in c {
            assert!((v - 1.0 / 3.0).abs() < 1e-6);
        }
    }
}
