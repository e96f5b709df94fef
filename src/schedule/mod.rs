//! Detection scheduling and ghost-frame decay.
//!
//! Full detection is expensive, so it only runs on frame 0, on every
//! `matching_interval`-th frame, and on any frame that follows a frame with
//! nothing on screen. In between, marks coast on their last placement and
//! their ghost counters grow until they fall out of the active set.

use crate::features::FeatureEngine;
use crate::geometry::Homography;
use crate::image::{to_luma, ImageView, PixelFormat};
use crate::placement::PlacementEstimator;
use crate::registry::{MarkId, MarkRegistry};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{UnlogoError, UnlogoResult};

/// Detection policy for one frame.
///
/// `interval` must be non-zero; the scheduler rejects zero at construction.
#[inline]
pub fn should_detect(frame_index: u64, interval: u64, previous_active: usize) -> bool {
    frame_index == 0 || frame_index % interval == 0 || previous_active == 0
}

/// A mark reconfirmed in the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedInstance {
    /// Registry entry the detection belongs to.
    pub mark: MarkId,
    /// Accepted reference-to-frame mapping.
    pub transform: Homography,
    /// Correspondences supporting `transform`.
    pub inliers: usize,
    /// Correspondences considered for this mark.
    pub correspondences: usize,
}

/// What one scheduling step did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepOutcome {
    /// Whether full detection ran on this frame.
    pub detection_ran: bool,
    /// Marks reconfirmed on this frame, in registry order.
    pub detected: Vec<DetectedInstance>,
    /// Marks to draw on this frame, in registry order.
    pub active: Vec<MarkId>,
}

/// Decides per frame whether to detect, and updates every mark's track.
#[derive(Clone, Debug)]
pub struct DetectionScheduler {
    matching_interval: u64,
    ghost_frames_allowed: u32,
    estimator: PlacementEstimator,
}

impl DetectionScheduler {
    /// Creates a scheduler. A zero interval is a configuration error.
    pub fn new(
        matching_interval: u64,
        ghost_frames_allowed: u32,
        estimator: PlacementEstimator,
    ) -> UnlogoResult<Self> {
        if matching_interval == 0 {
            return Err(UnlogoError::InvalidConfig("matching_interval must be non-zero"));
        }
        Ok(Self {
            matching_interval,
            ghost_frames_allowed,
            estimator,
        })
    }

    /// Frames between scheduled detections.
    pub fn matching_interval(&self) -> u64 {
        self.matching_interval
    }

    /// Frames a mark may go unconfirmed and still be drawn.
    pub fn ghost_frames_allowed(&self) -> u32 {
        self.ghost_frames_allowed
    }

    /// Placement estimator used on detection frames.
    pub fn estimator(&self) -> &PlacementEstimator {
        &self.estimator
    }

    /// Runs the policy for one frame.
    ///
    /// `frame` is the host input plane in `format`; it is reduced to luma only
    /// when detection runs. Errors are returned before any track is touched.
    pub fn step<E: FeatureEngine + ?Sized>(
        &self,
        frame_index: u64,
        previous_active: usize,
        frame: &ImageView<'_>,
        format: PixelFormat,
        registry: &mut MarkRegistry,
        engine: &E,
    ) -> UnlogoResult<StepOutcome> {
        let detection_ran = should_detect(frame_index, self.matching_interval, previous_active);
        let detected = if detection_ran {
            self.detect(frame, format, registry, engine)?
        } else {
            trace_debug!("detection_skipped", frame = frame_index);
            coast(registry);
            Vec::new()
        };
        Ok(StepOutcome {
            detection_ran,
            detected,
            active: registry.active(self.ghost_frames_allowed),
        })
    }

    fn detect<E: FeatureEngine + ?Sized>(
        &self,
        frame: &ImageView<'_>,
        format: PixelFormat,
        registry: &mut MarkRegistry,
        engine: &E,
    ) -> UnlogoResult<Vec<DetectedInstance>> {
        let _span = trace_span!("detect", marks = registry.len()).entered();

        let luma = to_luma(*frame, format)?;
        let features = engine.extract(luma.view())?;
        trace_debug!("frame_features", keypoints = features.len());

        let mut detected = Vec::new();
        for (id, mark) in registry.iter_mut() {
            let correspondences = engine.correspond(mark.features(), &features);
            match self
                .estimator
                .estimate(&correspondences, mark.features(), &features)
            {
                Ok(placement) => {
                    let [cx, cy] = mark.reference_center();
                    let position = placement.homography.project(cx, cy);
                    trace_event!(
                        "mark_confirmed",
                        mark = mark.name(),
                        inliers = placement.inliers,
                        correspondences = placement.correspondences
                    );
                    mark.track_mut().confirm(placement.homography, position);
                    detected.push(DetectedInstance {
                        mark: id,
                        transform: placement.homography,
                        inliers: placement.inliers,
                        correspondences: placement.correspondences,
                    });
                }
                Err(rejection) => {
                    trace_debug!(
                        "mark_rejected",
                        mark = mark.name(),
                        reason = rejection.to_string().as_str()
                    );
                    mark.track_mut().decay();
                }
            }
        }

        if detected.is_empty() {
            trace_event!("no_marks_detected", marks = registry.len());
        }
        Ok(detected)
    }
}

fn coast(registry: &mut MarkRegistry) {
    for (_, mark) in registry.iter_mut() {
        mark.track_mut().decay();
    }
}

#[cfg(test)]
mod tests {
    use super::{should_detect, DetectionScheduler};
    use crate::placement::PlacementEstimator;
    use crate::util::UnlogoError;

    #[test]
    fn zero_interval_is_rejected() {
        let err = DetectionScheduler::new(0, 50, PlacementEstimator::default()).unwrap_err();
        assert!(matches!(err, UnlogoError::InvalidConfig(_)));
        let ok = DetectionScheduler::new(10, 50, PlacementEstimator::default()).unwrap();
        assert_eq!(ok.matching_interval(), 10);
        assert_eq!(ok.ghost_frames_allowed(), 50);
    }

    #[test]
    fn policy_truth_table() {
        assert!(should_detect(0, 10, 3));
        assert!(should_detect(10, 10, 3));
        assert!(should_detect(40, 10, 1));
        assert!(!should_detect(7, 10, 1));
        assert!(should_detect(7, 10, 0));
        assert!(should_detect(5, 1, 2));
    }

    #[test]
    fn detection_frames_match_the_formula() {
        for interval in 1..=12u64 {
            for idx in 0..100u64 {
                for prev in 0..3usize {
                    let expected = idx == 0 || idx % interval == 0 || prev == 0;
                    assert_eq!(should_detect(idx, interval, prev), expected);
                }
            }
        }
    }
}
