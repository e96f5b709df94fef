//! Brute-force Hamming matching with a ratio test.

use crate::features::{Correspondence, Descriptor, FeatureSet, OrbConfig};

/// Number of differing bits between two descriptors.
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Finds the best frame feature for one reference descriptor.
///
/// A match is kept when its distance is within `max_distance` and clearly
/// better than the runner-up (`best < ratio * second`). A lone candidate only
/// has to pass the distance limit.
fn best_match(
    ref_idx: usize,
    descriptor: &Descriptor,
    frame: &FeatureSet,
    cfg: &OrbConfig,
) -> Option<Correspondence> {
    let mut best: Option<(usize, u32)> = None;
    let mut second = u32::MAX;
    for (frame_idx, candidate) in frame.descriptors().enumerate() {
        let dist = hamming_distance(descriptor, candidate);
        match best {
            Some((_, best_dist)) if dist >= best_dist => second = second.min(dist),
            Some((_, best_dist)) => {
                second = best_dist;
                best = Some((frame_idx, dist));
            }
            None => best = Some((frame_idx, dist)),
        }
    }

    let (frame_idx, dist) = best?;
    if dist > cfg.max_distance {
        return None;
    }
    if second != u32::MAX && dist as f32 >= cfg.ratio * second as f32 {
        return None;
    }
    Some(Correspondence {
        reference: ref_idx,
        frame: frame_idx,
        distance: dist,
    })
}

/// Matches every reference feature against the frame, sequentially.
pub(crate) fn match_brute_force(
    reference: &FeatureSet,
    frame: &FeatureSet,
    cfg: &OrbConfig,
) -> Vec<Correspondence> {
    reference
        .descriptors()
        .enumerate()
        .filter_map(|(idx, desc)| best_match(idx, desc, frame, cfg))
        .collect()
}

/// Matches every reference feature against the frame in parallel.
///
/// Output order equals [`match_brute_force`].
#[cfg(feature = "rayon")]
pub(crate) fn match_brute_force_par(
    reference: &FeatureSet,
    frame: &FeatureSet,
    cfg: &OrbConfig,
) -> Vec<Correspondence> {
    use rayon::prelude::*;
    reference
        .features()
        .par_iter()
        .enumerate()
        .filter_map(|(idx, feature)| best_match(idx, &feature.descriptor, frame, cfg))
        .collect()
}
