//! Candidate pruning utilities.
//!
//! Spatial non-maximum suppression for corner detections.

pub(crate) mod nms;
