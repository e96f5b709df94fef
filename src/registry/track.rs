//! Per-mark tracking state carried across frames.

use crate::geometry::Homography;

/// Where a mark was last confirmed and how long ago.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackState {
    position: Option<[f64; 2]>,
    transform: Option<Homography>,
    ghost_frames: u32,
}

impl TrackState {
    /// Last confirmed centre of the mark in frame coordinates.
    pub fn position(&self) -> Option<[f64; 2]> {
        self.position
    }

    /// Last confirmed reference-to-frame mapping.
    pub fn transform(&self) -> Option<&Homography> {
        self.transform.as_ref()
    }

    /// Frames since the last confirmation.
    pub fn ghost_frames(&self) -> u32 {
        self.ghost_frames
    }

    /// A mark is drawn while it has a placement and has not outlived the
    /// allowance.
    pub fn is_active(&self, ghost_frames_allowed: u32) -> bool {
        self.transform.is_some() && self.ghost_frames <= ghost_frames_allowed
    }

    /// Records a confirmation in the current frame.
    pub(crate) fn confirm(&mut self, transform: Homography, position: Option<[f64; 2]>) {
        self.transform = Some(transform);
        self.position = position;
        self.ghost_frames = 0;
    }

    /// Carries the previous placement one more frame.
    pub(crate) fn decay(&mut self) {
        self.ghost_frames = self.ghost_frames.saturating_add(1);
    }
}
