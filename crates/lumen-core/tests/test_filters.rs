mod common;

use lumen_core::error::LumenError;
use lumen_core::filters::box_filter::{box_mean, windowed_mse};
use lumen_core::filters::despeckle::despeckle;
use lumen_core::filters::gaussian_blur::{b3_smooth, gaussian_blur};
use lumen_core::filters::morphology::{binarize, erode};
use lumen_core::filters::wavelet::decompose;
use lumen_core::filters::{SpatialRegularizer, SpatialStrategy};
use lumen_core::frame::{ImageBuffer, Plane};

use common::{max_abs_diff, noise_plane, textured_plane};

fn all_strategies() -> Vec<SpatialStrategy> {
    vec![
        SpatialStrategy::None,
        SpatialStrategy::Guided {
            radius: 2,
            epsilon: 1e-3,
        },
        SpatialStrategy::GuidedColor {
            radius: 2,
            epsilon: 1e-3,
        },
        SpatialStrategy::Bilateral {
            radius: 2,
            sigma_spatial: 2.0,
            sigma_range: 0.05,
        },
        SpatialStrategy::Wavelet {
            layers: 3,
            thresholds: vec![0.02, 0.01, 0.005],
        },
        SpatialStrategy::Despeckle { threshold: 0.05 },
        SpatialStrategy::SavitzkyGolay {
            radius: 2,
            order: 2,
        },
    ]
}

// ---------------------------------------------------------------------------
// SpatialStrategy
// ---------------------------------------------------------------------------

#[test]
fn test_every_strategy_preserves_constant_planes() {
    let color = ImageBuffer::new(vec![
        Plane::from_elem((12, 14), 0.25),
        Plane::from_elem((12, 14), 0.5),
        Plane::from_elem((12, 14), 0.75),
    ])
    .unwrap();

    for strategy in all_strategies() {
        let out = strategy.filter(&color, None).unwrap();
        assert_eq!(out.plane_count(), 3, "{strategy}");
        assert_eq!(out.dim(), (12, 14), "{strategy}");
        for (got, want) in out.planes().iter().zip([0.25f32, 0.5, 0.75]) {
            for &v in got.iter() {
                assert!((v - want).abs() < 1e-4, "{strategy}: {v} vs {want}");
            }
        }
    }
}

#[test]
fn test_none_is_identity() {
    let color = ImageBuffer::new(vec![textured_plane(10, 10, 0.0)]).unwrap();
    let out = SpatialStrategy::None.filter(&color, None).unwrap();
    assert_eq!(out, color);
}

#[test]
fn test_guided_reduces_noise() {
    let clean = Plane::from_elem((32, 32), 0.5);
    let noisy = &clean + &noise_plane(32, 32, 7, 0.05);
    let color = ImageBuffer::new(vec![noisy.clone()]).unwrap();

    let out = SpatialStrategy::Guided {
        radius: 2,
        epsilon: 0.01,
    }
    .filter(&color, None)
    .unwrap();

    let err_before: f32 = (&noisy - &clean).mapv(|v| v * v).sum();
    let err_after: f32 = (out.plane(0) - &clean).mapv(|v| v * v).sum();
    assert!(
        err_after < err_before * 0.5,
        "guided filter should reduce noise: {err_after} vs {err_before}"
    );
}

#[test]
fn test_weights_accepted_when_shapes_match() {
    let color = ImageBuffer::new(vec![textured_plane(8, 8, 0.0)]).unwrap();
    let weights = vec![Plane::from_elem((8, 8), 1.0)];
    for strategy in all_strategies() {
        let out = strategy.filter(&color, Some(&weights)).unwrap();
        assert_eq!(out.dim(), (8, 8), "{strategy}");
    }
}

#[test]
fn test_weight_count_mismatch_rejected() {
    let color = ImageBuffer::new(vec![
        Plane::from_elem((8, 8), 0.5),
        Plane::from_elem((8, 8), 0.5),
    ])
    .unwrap();
    let weights = vec![Plane::from_elem((8, 8), 1.0)];
    let result = SpatialStrategy::None.filter(&color, Some(&weights));
    assert!(matches!(result, Err(LumenError::Config(_))));
}

#[test]
fn test_weight_shape_mismatch_rejected() {
    let color = ImageBuffer::new(vec![Plane::from_elem((8, 8), 0.5)]).unwrap();
    let weights = vec![Plane::from_elem((4, 8), 1.0)];
    let result = SpatialStrategy::Guided {
        radius: 1,
        epsilon: 1e-3,
    }
    .filter(&color, Some(&weights));
    assert!(matches!(result, Err(LumenError::ShapeMismatch { .. })));
}

#[test]
fn test_strategy_display() {
    let s = SpatialStrategy::Wavelet {
        layers: 3,
        thresholds: vec![0.1, 0.2, 0.3],
    };
    assert_eq!(s.to_string(), "Wavelet (3 layers)");
    assert_eq!(SpatialStrategy::None.to_string(), "None");
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

#[test]
fn test_windowed_mse_of_identical_planes_is_zero() {
    let a = textured_plane(16, 16, 0.0);
    let mse = windowed_mse(&a, &a, 2);
    assert!(mse.iter().all(|&v| v == 0.0));
}

#[test]
fn test_windowed_mse_constant_offset() {
    let a = Plane::from_elem((9, 9), 0.2);
    let b = Plane::from_elem((9, 9), 0.5);
    let mse = windowed_mse(&a, &b, 1);
    for &v in mse.iter() {
        assert!((v - 0.09).abs() < 1e-5, "expected 0.09, got {v}");
    }
}

#[test]
fn test_box_mean_radius_zero_is_identity() {
    let a = textured_plane(7, 5, 0.0);
    assert_eq!(box_mean(&a, 0), a);
}

#[test]
fn test_b3_smooth_preserves_constant() {
    let a = Plane::from_elem((6, 6), 0.3);
    let smoothed = b3_smooth(&a);
    assert!(max_abs_diff(&smoothed, &a) < 1e-6);
}

#[test]
fn test_gaussian_blur_zero_sigma_is_identity() {
    let a = textured_plane(6, 6, 0.0);
    assert_eq!(gaussian_blur(&a, 0.0), a);
}

#[test]
fn test_binarize_inclusive_threshold() {
    let a = Plane::from_shape_vec((1, 3), vec![0.1, 0.5, 0.9]).unwrap();
    let b = binarize(&a, 0.5);
    assert_eq!(b.as_slice().unwrap(), &[0.0, 1.0, 1.0]);
}

#[test]
fn test_erode_grows_hole() {
    let mut mask = Plane::from_elem((5, 5), 1.0);
    mask[[2, 2]] = 0.0;
    let eroded = erode(&mask);
    let zeros = eroded.iter().filter(|&&v| v == 0.0).count();
    assert_eq!(zeros, 9);
    // Full masks stay full at the border.
    assert_eq!(erode(&Plane::from_elem((3, 3), 1.0)).sum(), 9.0);
}

#[test]
fn test_despeckle_removes_spike() {
    let mut data = Plane::from_elem((7, 7), 0.4);
    data[[3, 3]] = 1.0;
    let cleaned = despeckle(&data, 0.1, None);
    assert!((cleaned[[3, 3]] - 0.4).abs() < 1e-6);
}

#[test]
fn test_despeckle_keeps_small_variations() {
    let data = textured_plane(8, 8, 0.0);
    let cleaned = despeckle(&data, 10.0, None);
    assert_eq!(cleaned, data);
}

#[test]
fn test_wavelet_decompose_reconstructs() {
    let data = textured_plane(16, 16, 0.0);
    let (layers, residual) = decompose(&data, 3);
    assert_eq!(layers.len(), 3);
    let mut rebuilt = residual;
    for layer in &layers {
        rebuilt += layer;
    }
    assert!(max_abs_diff(&rebuilt, &data) < 1e-5);
}
