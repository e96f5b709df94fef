//! Non-maximum suppression for detected keypoints.

use crate::features::Keypoint;
use std::cmp::Ordering;

fn keypoint_cmp_desc(a: &Keypoint, b: &Keypoint) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.x.total_cmp(&b.x))
}

/// Sorts keypoints by descending score with deterministic tie-breaking.
pub(crate) fn sort_keypoints_desc(points: &mut [Keypoint]) {
    points.sort_by(keypoint_cmp_desc);
}

/// Applies 2D non-maximum suppression using Chebyshev distance.
///
/// Keypoints are sorted by descending score and kept if they are farther than
/// `radius` from all previously kept keypoints. At most `limit` survive.
pub(crate) fn nms_keypoints(points: &mut [Keypoint], radius: f32, limit: usize) -> Vec<Keypoint> {
    sort_keypoints_desc(points);
    let mut kept: Vec<Keypoint> = Vec::new();

    'outer: for point in points.iter().copied() {
        if kept.len() >= limit {
            break;
        }
        for kept_point in kept.iter() {
            let dist = (point.x - kept_point.x)
                .abs()
                .max((point.y - kept_point.y).abs());
            if dist <= radius {
                continue 'outer;
            }
        }
        kept.push(point);
    }

    kept
}
