mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use lumen_core::error::LumenError;
use lumen_core::frame::{Plane, VectorField};
use lumen_core::integrate::{
    decide, CenterView, DecisionObserver, NeighborView, NoOpObserver, TrustParams,
};
use lumen_core::motion::ConditionedField;

use common::textured_plane;

const H: usize = 12;
const W: usize = 12;

fn trust(threshold: f32) -> TrustParams {
    TrustParams {
        mse_radius: 2,
        mse_threshold: threshold,
    }
}

fn identity_field() -> ConditionedField {
    ConditionedField {
        field: VectorField::zeros(H, W),
        rejection: None,
    }
}

fn rgb(offset: f32) -> Vec<Plane> {
    (0..3)
        .map(|i| textured_plane(H, W, i as f32) + offset)
        .collect()
}

fn filtered_marker() -> Vec<Plane> {
    (0..3).map(|_| Plane::from_elem((H, W), -1.0)).collect()
}

#[derive(Default)]
struct CountingObserver {
    fields: AtomicUsize,
    errors: AtomicUsize,
}

impl DecisionObserver for CountingObserver {
    fn on_vector_field(&self, _frame: i64, _offset: i64, _field: &VectorField) {
        self.fields.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error_map(&self, _frame: i64, _offset: i64, _channel: usize, _error: &Plane) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Acceptance
// ---------------------------------------------------------------------------

#[test]
fn test_identical_neighbor_is_accepted_everywhere() {
    let color = rgb(0.0);
    let filtered = filtered_marker();
    let center = CenterView {
        color: &color,
        filtered: &filtered,
        error_basis: &color,
        mask: None,
        frame: 5,
    };
    let neighbor_color = rgb(0.0);
    let neighbor = NeighborView {
        color: &neighbor_color,
        mask: None,
        offset: 1,
    };

    let decision = decide(
        &center,
        &neighbor,
        &identity_field(),
        &trust(0.002),
        false,
        &NoOpObserver,
    )
    .unwrap();

    assert_eq!(decision.selected.plane_count(), 3);
    for (selected, original) in decision.selected.planes().iter().zip(&neighbor_color) {
        assert_eq!(selected, original);
    }
    assert!(decision.accepted.iter().all(|&a| a == 3.0));
    assert_eq!(decision.accepted_samples(), H * W * 3);
}

#[test]
fn test_zero_threshold_falls_back_to_filtered_center() {
    let color = rgb(0.0);
    let filtered = filtered_marker();
    let center = CenterView {
        color: &color,
        filtered: &filtered,
        error_basis: &color,
        mask: None,
        frame: 0,
    };
    let neighbor = NeighborView {
        color: &color,
        mask: None,
        offset: -1,
    };

    // Acceptance is strict: an error of exactly zero does not pass a zero threshold.
    let decision = decide(
        &center,
        &neighbor,
        &identity_field(),
        &trust(0.0),
        false,
        &NoOpObserver,
    )
    .unwrap();

    assert!(decision.selected.planes().iter().all(|p| p.iter().all(|&v| v == -1.0)));
    assert_eq!(decision.accepted_samples(), 0);
}

#[test]
fn test_acceptance_grows_with_threshold() {
    let color = rgb(0.0);
    let filtered = filtered_marker();
    let center = CenterView {
        color: &color,
        filtered: &filtered,
        error_basis: &color,
        mask: None,
        frame: 0,
    };
    // Constant offset of 0.1 gives a windowed MSE of 0.01.
    let neighbor_color = rgb(0.1);
    let neighbor = NeighborView {
        color: &neighbor_color,
        mask: None,
        offset: 2,
    };

    let mut previous = 0;
    for threshold in [0.001, 0.005, 0.0101, 0.02, 1.0] {
        let decision = decide(
            &center,
            &neighbor,
            &identity_field(),
            &trust(threshold),
            false,
            &NoOpObserver,
        )
        .unwrap();
        let accepted = decision.accepted_samples();
        assert!(accepted >= previous, "threshold {threshold}: {accepted} < {previous}");
        previous = accepted;
    }
    assert_eq!(previous, H * W * 3);

    let strict = decide(
        &center,
        &neighbor,
        &identity_field(),
        &trust(0.005),
        false,
        &NoOpObserver,
    )
    .unwrap();
    assert_eq!(strict.accepted_samples(), 0);
}

#[test]
fn test_rejection_penalty_forces_fallback() {
    let color = rgb(0.0);
    let filtered = filtered_marker();
    let center = CenterView {
        color: &color,
        filtered: &filtered,
        error_basis: &color,
        mask: None,
        frame: 0,
    };
    let neighbor = NeighborView {
        color: &color,
        mask: None,
        offset: 1,
    };
    let conditioned = ConditionedField {
        field: VectorField::zeros(H, W),
        rejection: Some(Plane::from_elem((H, W), 1.0)),
    };

    let decision = decide(&center, &neighbor, &conditioned, &trust(0.5), false, &NoOpObserver)
        .unwrap();
    assert_eq!(decision.accepted_samples(), 0);
}

#[test]
fn test_occluded_neighbor_is_rejected() {
    let color = rgb(0.0);
    let filtered = filtered_marker();
    let visible = Plane::from_elem((H, W), 1.0);
    let hidden = Plane::zeros((H, W));
    let center = CenterView {
        color: &color,
        filtered: &filtered,
        error_basis: &color,
        mask: Some(&visible),
        frame: 0,
    };

    let occluded = NeighborView {
        color: &color,
        mask: Some(&hidden),
        offset: 1,
    };
    let decision =
        decide(&center, &occluded, &identity_field(), &trust(0.5), false, &NoOpObserver)
            .unwrap();
    assert_eq!(decision.accepted_samples(), 0);

    let clear = NeighborView {
        color: &color,
        mask: Some(&visible),
        offset: 1,
    };
    let decision =
        decide(&center, &clear, &identity_field(), &trust(0.5), false, &NoOpObserver).unwrap();
    assert_eq!(decision.accepted_samples(), H * W * 3);
}

#[test]
fn test_log_domain_identical_neighbor_is_accepted() {
    let color = rgb(0.0);
    let log_basis: Vec<Plane> = color.iter().map(lumen_core::frame::to_log_domain).collect();
    let filtered = filtered_marker();
    let center = CenterView {
        color: &color,
        filtered: &filtered,
        error_basis: &log_basis,
        mask: None,
        frame: 0,
    };
    let neighbor = NeighborView {
        color: &color,
        mask: None,
        offset: 1,
    };
    let decision =
        decide(&center, &neighbor, &identity_field(), &trust(1e-6), true, &NoOpObserver).unwrap();
    assert_eq!(decision.accepted_samples(), H * W * 3);
    // Selected samples stay linear.
    assert_eq!(decision.selected.plane(0), &color[0]);
}

// ---------------------------------------------------------------------------
// Observer and validation
// ---------------------------------------------------------------------------

#[test]
fn test_observer_sees_field_and_every_channel() {
    let color = rgb(0.0);
    let filtered = filtered_marker();
    let center = CenterView {
        color: &color,
        filtered: &filtered,
        error_basis: &color,
        mask: None,
        frame: 3,
    };
    let neighbor = NeighborView {
        color: &color,
        mask: None,
        offset: -2,
    };
    let observer = CountingObserver::default();
    decide(&center, &neighbor, &identity_field(), &trust(0.002), false, &observer).unwrap();
    assert_eq!(observer.fields.load(Ordering::SeqCst), 1);
    assert_eq!(observer.errors.load(Ordering::SeqCst), 3);
}

#[test]
fn test_channel_count_mismatch() {
    let color = rgb(0.0);
    let filtered = filtered_marker();
    let center = CenterView {
        color: &color,
        filtered: &filtered,
        error_basis: &color,
        mask: None,
        frame: 0,
    };
    let neighbor = NeighborView {
        color: &color[..1],
        mask: None,
        offset: 1,
    };
    let result = decide(
        &center,
        &neighbor,
        &identity_field(),
        &trust(0.002),
        false,
        &NoOpObserver,
    );
    assert!(matches!(result, Err(LumenError::Config(_))));
}

#[test]
fn test_invalid_field_is_an_error() {
    let color = rgb(0.0);
    let filtered = filtered_marker();
    let center = CenterView {
        color: &color,
        filtered: &filtered,
        error_basis: &color,
        mask: None,
        frame: 0,
    };
    let neighbor = NeighborView {
        color: &color,
        mask: None,
        offset: 1,
    };
    let conditioned = ConditionedField {
        field: VectorField::invalid(),
        rejection: None,
    };
    let result = decide(&center, &neighbor, &conditioned, &trust(0.002), false, &NoOpObserver);
    assert!(matches!(result, Err(LumenError::InvalidVectorField)));
}
