mod common;

use lumen_core::error::LumenError;
use lumen_core::frame::{from_log_domain, luminance, to_log_domain, ImageBuffer, Plane, VectorField};
use lumen_core::track::{FrameCache, MemoryTrack, Track};

use common::{max_abs_diff, mono_track, names, textured_plane, FailingTrack};

// ---------------------------------------------------------------------------
// ImageBuffer
// ---------------------------------------------------------------------------

#[test]
fn test_buffer_rejects_mixed_shapes() {
    let result = ImageBuffer::new(vec![Plane::zeros((4, 4)), Plane::zeros((4, 5))]);
    assert!(matches!(result, Err(LumenError::ShapeMismatch { .. })));
}

#[test]
fn test_empty_buffer() {
    let buffer = ImageBuffer::empty();
    assert!(buffer.is_empty());
    assert_eq!(buffer.dim(), (0, 0));
    assert_eq!(buffer.plane_count(), 0);
}

#[test]
fn test_split_mask() {
    let buffer = ImageBuffer::zeros(3, 3, 4);
    let (color, mask) = buffer.split_mask(3);
    assert_eq!(color.len(), 3);
    assert!(mask.is_some());

    let buffer = ImageBuffer::zeros(3, 3, 3);
    let (color, mask) = buffer.split_mask(3);
    assert_eq!(color.len(), 3);
    assert!(mask.is_none());
}

// ---------------------------------------------------------------------------
// VectorField
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_field_not_usable() {
    let field = VectorField::invalid();
    assert!(!field.is_valid());
    assert!(matches!(
        field.ensure_usable((0, 0)),
        Err(LumenError::InvalidVectorField)
    ));
}

#[test]
fn test_field_shape_checked() {
    let field = VectorField::zeros(4, 4);
    assert!(field.ensure_usable((4, 4)).is_ok());
    assert!(matches!(
        field.ensure_usable((4, 5)),
        Err(LumenError::ShapeMismatch { .. })
    ));
    assert!(VectorField::new(Plane::zeros((2, 2)), Plane::zeros((2, 3))).is_err());
}

#[test]
fn test_field_magnitude() {
    let field = VectorField::constant(2, 2, 3.0, 4.0);
    assert!(field.magnitude().iter().all(|&m| (m - 5.0).abs() < 1e-6));
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[test]
fn test_luminance_weights() {
    let r = Plane::from_elem((2, 2), 1.0);
    let g = Plane::zeros((2, 2));
    let b = Plane::zeros((2, 2));
    let lum = luminance(&[r.clone(), g, b]);
    assert!((lum[[0, 0]] - 0.299).abs() < 1e-3);
    assert_eq!(luminance(&[r.clone()]), r);
}

#[test]
fn test_log_domain_round_trip() {
    let plane = textured_plane(8, 8, 0.0);
    let back = from_log_domain(&to_log_domain(&plane));
    assert!(max_abs_diff(&back, &plane) < 1e-5);
    // Negative samples are clamped before the mapping.
    let neg = Plane::from_elem((1, 1), -0.5);
    assert_eq!(to_log_domain(&neg)[[0, 0]], 0.0);
}

// ---------------------------------------------------------------------------
// MemoryTrack
// ---------------------------------------------------------------------------

#[test]
fn test_memory_track_bounds() {
    let frames = (0..5)
        .map(|_| ImageBuffer::new(vec![Plane::zeros((2, 2))]).unwrap())
        .collect();
    let track = MemoryTrack::new("t", 10, 30.0, names(&["Y"]), frames).unwrap();
    assert_eq!(track.begin(), 10);
    assert_eq!(track.end(), 14);
    assert_eq!(track.frame_count(), 5);
    assert!(track.contains(12));
    assert!(!track.contains(15));
    assert!(matches!(
        track.fetch(track.sample(9), &names(&["Y"])),
        Err(LumenError::FrameOutOfRange { frame: 9, .. })
    ));
}

#[test]
fn test_memory_track_rejects_empty() {
    let result = MemoryTrack::new("t", 0, 30.0, names(&["Y"]), Vec::new());
    assert!(matches!(result, Err(LumenError::EmptySequence)));
}

#[test]
fn test_memory_track_missing_channel() {
    let track = mono_track(vec![Plane::zeros((2, 2))]);
    let result = track.fetch(track.sample(0), &names(&["R"]));
    assert!(matches!(result, Err(LumenError::MissingChannel { .. })));
}

#[test]
fn test_memory_track_channel_order_follows_request() {
    let frames = vec![ImageBuffer::new(vec![
        Plane::from_elem((2, 2), 0.1),
        Plane::from_elem((2, 2), 0.2),
        Plane::from_elem((2, 2), 0.3),
    ])
    .unwrap()];
    let track = MemoryTrack::new("rgb", 0, 30.0, names(&["R", "G", "B"]), frames).unwrap();
    let buffer = track.fetch(track.sample(0), &names(&["B", "R"])).unwrap();
    assert_eq!(buffer.plane(0)[[0, 0]], 0.3);
    assert_eq!(buffer.plane(1)[[0, 0]], 0.1);
}

// ---------------------------------------------------------------------------
// FrameCache
// ---------------------------------------------------------------------------

#[test]
fn test_cache_decodes_each_frame_once() {
    let track = mono_track((0..4).map(|_| Plane::zeros((2, 2))).collect());
    let cache = FrameCache::new(&track, names(&["Y"]));
    cache.prefetch(-3, 10);
    assert_eq!(cache.fetch_count(), 4);
    for f in 0..4 {
        cache.get(f).unwrap();
    }
    assert_eq!(cache.fetch_count(), 4);

    cache.retain_range(2, 3);
    assert_eq!(cache.len(), 2);
    cache.get(0).unwrap();
    assert_eq!(cache.fetch_count(), 5);
}

#[test]
fn test_cache_never_fetches_out_of_range() {
    let track = mono_track(vec![Plane::zeros((2, 2))]);
    let cache = FrameCache::new(&track, names(&["Y"]));
    assert!(matches!(
        cache.get(1),
        Err(LumenError::FrameOutOfRange { frame: 1, .. })
    ));
    assert_eq!(cache.fetch_count(), 0);
}

#[test]
fn test_cache_wraps_fetch_errors() {
    let track = FailingTrack {
        inner: mono_track((0..3).map(|_| Plane::zeros((2, 2))).collect()),
        failing: [1].into_iter().collect(),
    };
    let cache = FrameCache::new(&track, names(&["Y"]));
    cache.prefetch(0, 2);
    assert_eq!(cache.len(), 2);
    match cache.get(1) {
        Err(LumenError::FrameFetch {
            frame, source_name, ..
        }) => {
            assert_eq!(frame, 1);
            assert_eq!(source_name, "failing");
        }
        other => panic!("expected FrameFetch, got {other:?}"),
    }
}
