use crate::error::{LumenError, Result};
use crate::track::Track;

/// Neighbor offsets `d` in `[-radius, radius]`, `d != 0`, with `frame + d`
/// inside `[begin, end]`, in ascending order.
pub fn window_offsets(frame: i64, radius: usize, begin: i64, end: i64) -> Vec<i64> {
    let r = radius as i64;
    (-r..=r)
        .filter(|&d| d != 0 && frame + d >= begin && frame + d <= end)
        .collect()
}

/// Resolve the processed `[first, last]` range: the whole track unless
/// narrowed, and never outside the track.
pub fn resolve_range(
    track: &dyn Track,
    requested: Option<(Option<i64>, Option<i64>)>,
) -> Result<(i64, i64)> {
    let (begin, end) = (track.begin(), track.end());
    if end < begin {
        return Err(LumenError::EmptySequence);
    }
    let (first, last) = match requested {
        Some((first, last)) => (first.unwrap_or(begin), last.unwrap_or(end)),
        None => (begin, end),
    };
    for frame in [first, last] {
        if frame < begin || frame > end {
            return Err(LumenError::Config(format!(
                "requested frame {frame} lies outside the track range [{begin}, {end}]"
            )));
        }
    }
    if first > last {
        return Err(LumenError::Config(format!(
            "first frame {first} is after last frame {last}"
        )));
    }
    Ok((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_offsets_clipped_at_start() {
        assert_eq!(window_offsets(0, 2, 0, 4), vec![1, 2]);
        assert_eq!(window_offsets(2, 2, 0, 4), vec![-2, -1, 1, 2]);
        assert_eq!(window_offsets(4, 2, 0, 4), vec![-2, -1]);
    }

    #[test]
    fn test_window_offsets_radius_zero() {
        assert!(window_offsets(3, 0, 0, 10).is_empty());
    }

    #[test]
    fn test_window_offsets_single_frame_track() {
        assert!(window_offsets(7, 3, 7, 7).is_empty());
    }
}
