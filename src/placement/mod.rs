//! Placement estimation: from correspondences to a validated homography.
//!
//! Individual descriptor matches can be confident and still wrong. A
//! placement is only accepted when enough of them agree on one projective
//! mapping from reference space into the frame: the consensus set must reach
//! both an absolute minimum and a fraction of all correspondences. Rejections
//! are ordinary values, not errors; the scheduler treats them as "mark not
//! reconfirmed this frame".

use crate::features::{Correspondence, FeatureSet};
use crate::geometry::{fit_homography_ransac, FitError, Homography, RansacConfig};
use crate::trace::{trace_debug, trace_span};
use crate::util::math::min_count_for_fraction;
use thiserror::Error;

/// Acceptance thresholds for a placement.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementConfig {
    /// Consensus search parameters, including the inlier distance.
    pub ransac: RansacConfig,
    /// Absolute minimum number of inliers.
    pub min_inliers: usize,
    /// Minimum inlier share of all correspondences, in `[0, 1]`.
    pub match_pct_threshold: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            ransac: RansacConfig::default(),
            min_inliers: 8,
            match_pct_threshold: 0.1,
        }
    }
}

/// Accepted placement of a mark in the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    /// Reference-space to frame-space mapping.
    pub homography: Homography,
    /// Correspondences consistent with `homography`.
    pub inliers: usize,
    /// All correspondences that were considered.
    pub correspondences: usize,
}

/// Why a placement was not accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Not enough correspondences to fit any model.
    #[error("too few correspondences: need {needed}, got {got}")]
    TooFewCorrespondences { needed: usize, got: usize },
    /// The best model did not gather enough support.
    #[error("insufficient inliers: need {needed}, found {found}")]
    InsufficientInliers { needed: usize, found: usize },
    /// Correspondences do not determine a usable mapping.
    #[error("degenerate correspondences")]
    Degenerate,
}

/// Converts correspondences into a validated placement.
#[derive(Clone, Debug, Default)]
pub struct PlacementEstimator {
    cfg: PlacementConfig,
}

impl PlacementEstimator {
    /// Creates an estimator with the given thresholds.
    pub fn new(cfg: PlacementConfig) -> Self {
        Self { cfg }
    }

    /// Returns the acceptance thresholds.
    pub fn config(&self) -> &PlacementConfig {
        &self.cfg
    }

    /// Inliers required to accept a fit over `total` correspondences.
    pub fn required_inliers(&self, total: usize) -> usize {
        self.cfg
            .min_inliers
            .max(min_count_for_fraction(total, self.cfg.match_pct_threshold))
    }

    /// Fits and validates a placement.
    ///
    /// Correspondence indices that do not resolve to a keypoint in `reference`
    /// or `frame` are ignored.
    pub fn estimate(
        &self,
        correspondences: &[Correspondence],
        reference: &FeatureSet,
        frame: &FeatureSet,
    ) -> Result<Placement, Rejection> {
        let _span = trace_span!("fit_placement", correspondences = correspondences.len()).entered();

        let (src, dst): (Vec<[f64; 2]>, Vec<[f64; 2]>) = correspondences
            .iter()
            .filter_map(|c| {
                let r = reference.keypoint(c.reference)?;
                let f = frame.keypoint(c.frame)?;
                Some((
                    [f64::from(r.x), f64::from(r.y)],
                    [f64::from(f.x), f64::from(f.y)],
                ))
            })
            .unzip();

        let total = src.len();
        let needed = self.required_inliers(total).max(4);
        if total < needed {
            return Err(Rejection::TooFewCorrespondences { needed, got: total });
        }

        let fit = fit_homography_ransac(&src, &dst, &self.cfg.ransac).map_err(|err| match err {
            FitError::TooFewPoints { needed, got } => {
                Rejection::TooFewCorrespondences { needed, got }
            }
            FitError::Degenerate => Rejection::Degenerate,
        })?;

        trace_debug!("ransac_fit", inliers = fit.n_inliers, total = total);
        if fit.n_inliers < needed {
            return Err(Rejection::InsufficientInliers {
                needed,
                found: fit.n_inliers,
            });
        }
        Ok(Placement {
            homography: fit.homography,
            inliers: fit.n_inliers,
            correspondences: total,
        })
    }
}
