//! RANSAC consensus search over homographies.

use crate::geometry::{estimate_homography_dlt, Homography};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

/// Why a robust fit produced no model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FitError {
    /// Fewer point pairs than the minimal sample.
    #[error("too few points: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    /// No sample produced a finite, invertible model.
    #[error("degenerate point configuration")]
    Degenerate,
}

/// RANSAC parameters.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct RansacConfig {
    /// Maximum number of minimal samples to try.
    pub max_iters: usize,
    /// Reprojection distance (pixels) below which a pair is an inlier.
    pub inlier_threshold: f64,
    /// Seed for sample selection; each call restarts from it.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 500,
            inlier_threshold: 2.0,
            seed: 0,
        }
    }
}

/// Best model found by [`fit_homography_ransac`].
#[derive(Clone, Debug, PartialEq)]
pub struct RansacFit {
    /// Model refitted on all consensus inliers.
    pub homography: Homography,
    /// `true` for pairs within the inlier threshold of the final model.
    pub inlier_mask: Vec<bool>,
    /// Number of `true` entries in `inlier_mask`.
    pub n_inliers: usize,
}

/// Returns true if any three of the points are (nearly) collinear.
fn has_collinear_triple(pts: &[[f64; 2]; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[a, b, c]| {
        let (pa, pb, pc) = (pts[a], pts[b], pts[c]);
        let cross = (pb[0] - pa[0]) * (pc[1] - pa[1]) - (pb[1] - pa[1]) * (pc[0] - pa[0]);
        cross.abs() < 1e-6
    })
}

fn consensus(h: &Homography, src: &[[f64; 2]], dst: &[[f64; 2]], threshold: f64) -> Vec<bool> {
    src.iter()
        .zip(dst)
        .map(|(s, d)| h.reprojection_error(*s, *d) < threshold)
        .collect()
}

/// Fits a homography mapping `src` onto `dst` with RANSAC.
///
/// Sampling is deterministic for a given seed. The search stops early once
/// more than 90% of the pairs agree. The winning consensus set is refitted
/// with DLT and the inlier mask recomputed against the refitted model.
pub fn fit_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    cfg: &RansacConfig,
) -> Result<RansacFit, FitError> {
    let n = src.len().min(dst.len());
    if n < 4 {
        return Err(FitError::TooFewPoints { needed: 4, got: n });
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut best: Option<(Homography, Vec<bool>, usize)> = None;

    for _ in 0..cfg.max_iters.max(1) {
        let picks = rand::seq::index::sample(&mut rng, n, 4);
        let mut s4 = [[0.0; 2]; 4];
        let mut d4 = [[0.0; 2]; 4];
        for (slot, idx) in picks.iter().enumerate() {
            s4[slot] = src[idx];
            d4[slot] = dst[idx];
        }
        if has_collinear_triple(&s4) || has_collinear_triple(&d4) {
            continue;
        }
        let Ok(h) = estimate_homography_dlt(&s4, &d4) else {
            continue;
        };

        let mask = consensus(&h, &src[..n], &dst[..n], cfg.inlier_threshold);
        let count = mask.iter().filter(|&&m| m).count();
        if best.as_ref().map_or(true, |(_, _, c)| count > *c) {
            best = Some((h, mask, count));
            if count * 10 > n * 9 {
                break;
            }
        }
    }

    let (best_h, best_mask, _) = best.ok_or(FitError::Degenerate)?;

    let (inlier_src, inlier_dst): (Vec<_>, Vec<_>) = (0..n)
        .filter(|&i| best_mask[i])
        .map(|i| (src[i], dst[i]))
        .unzip();
    let refit = estimate_homography_dlt(&inlier_src, &inlier_dst).unwrap_or(best_h);

    let refit_mask = consensus(&refit, &src[..n], &dst[..n], cfg.inlier_threshold);
    let refit_count = refit_mask.iter().filter(|&&m| m).count();
    let best_count = best_mask.iter().filter(|&&m| m).count();

    // Keep the sampled model if the refit lost support.
    let (homography, inlier_mask, n_inliers) = if refit_count >= best_count {
        (refit, refit_mask, refit_count)
    } else {
        (best_h, best_mask, best_count)
    };

    Ok(RansacFit {
        homography,
        inlier_mask,
        n_inliers,
    })
}
