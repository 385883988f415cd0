use approx::assert_abs_diff_eq;

use lumen_core::error::LumenError;
use lumen_core::frame::{ImageBuffer, Plane};
use lumen_core::integrate::TemporalAccumulator;

fn filled(value: f32, channels: usize) -> ImageBuffer {
    ImageBuffer::new((0..channels).map(|_| Plane::from_elem((4, 4), value)).collect()).unwrap()
}

#[test]
fn test_mean_of_samples() {
    let mut acc = TemporalAccumulator::new();
    acc.accumulate(&filled(0.2, 2), 1.0).unwrap();
    acc.accumulate(&filled(0.4, 2), 1.0).unwrap();
    acc.accumulate(&filled(0.6, 2), 1.0).unwrap();
    assert_eq!(acc.count(), 3.0);

    let out = acc.finalize().unwrap();
    assert_eq!(out.plane_count(), 2);
    for &v in out.plane(1).iter() {
        assert_abs_diff_eq!(v, 0.4, epsilon = 1e-6);
    }
}

#[test]
fn test_single_sample_passes_through() {
    let mut acc = TemporalAccumulator::new();
    acc.accumulate(&filled(0.3, 1), 1.0).unwrap();
    let out = acc.finalize().unwrap();
    assert_eq!(out, filled(0.3, 1));
}

#[test]
fn test_weighted_accumulation() {
    let mut acc = TemporalAccumulator::new();
    acc.accumulate(&filled(1.0, 1), 3.0).unwrap();
    acc.accumulate(&filled(0.0, 1), 1.0).unwrap();
    let out = acc.finalize().unwrap();
    assert_abs_diff_eq!(out.plane(0)[[0, 0]], 0.75, epsilon = 1e-6);
}

#[test]
fn test_empty_accumulator_cannot_finalize() {
    let acc = TemporalAccumulator::new();
    assert!(acc.is_empty());
    assert!(matches!(acc.finalize(), Err(LumenError::EmptySequence)));
}

#[test]
fn test_shape_mismatch_rejected() {
    let mut acc = TemporalAccumulator::new();
    acc.accumulate(&filled(0.1, 1), 1.0).unwrap();
    let other = ImageBuffer::new(vec![Plane::zeros((3, 4))]).unwrap();
    assert!(matches!(
        acc.accumulate(&other, 1.0),
        Err(LumenError::ShapeMismatch { .. })
    ));
    assert!(matches!(
        acc.accumulate(&filled(0.1, 2), 1.0),
        Err(LumenError::Config(_))
    ));
}

#[test]
fn test_integration_amount_is_normalized() {
    // Center plus two neighbors, three channels: a fully accepting neighbor
    // contributes 3 per pixel.
    let mut acc = TemporalAccumulator::new();
    acc.accumulate(&filled(0.5, 3), 1.0).unwrap();
    for accepted in [3.0, 1.5] {
        let mut partial = TemporalAccumulator::new();
        partial.accumulate(&filled(0.5, 3), 1.0).unwrap();
        partial
            .add_integration(&Plane::from_elem((4, 4), accepted))
            .unwrap();
        acc = acc.merge(partial).unwrap();
    }

    let out = acc.finalize().unwrap();
    assert_eq!(out.plane_count(), 4);
    // (3 + 1.5) / ((3 - 1) * 3)
    for &v in out.plane(3).iter() {
        assert_abs_diff_eq!(v, 0.75, epsilon = 1e-6);
    }
    for &v in out.plane(0).iter() {
        assert_abs_diff_eq!(v, 0.5, epsilon = 1e-6);
    }
}

#[test]
fn test_merge_order_does_not_change_result() {
    let parts: Vec<TemporalAccumulator> = [0.1f32, 0.35, 0.8]
        .iter()
        .map(|&v| {
            let mut p = TemporalAccumulator::new();
            p.accumulate(&filled(v, 1), 1.0).unwrap();
            p.add_integration(&Plane::from_elem((4, 4), 1.0)).unwrap();
            p
        })
        .collect();

    let forward = parts
        .iter()
        .cloned()
        .try_fold(TemporalAccumulator::new(), |acc, p| acc.merge(p))
        .unwrap()
        .finalize()
        .unwrap();
    let backward = parts
        .iter()
        .rev()
        .cloned()
        .try_fold(TemporalAccumulator::new(), |acc, p| acc.merge(p))
        .unwrap()
        .finalize()
        .unwrap();

    for (a, b) in forward.planes().iter().zip(backward.planes()) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_integration_shape_mismatch() {
    let mut acc = TemporalAccumulator::new();
    acc.add_integration(&Plane::zeros((4, 4))).unwrap();
    assert!(matches!(
        acc.add_integration(&Plane::zeros((2, 2))),
        Err(LumenError::ShapeMismatch { .. })
    ));
}
