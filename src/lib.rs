//! unlogo replaces known logos in live video frames.
//!
//! Each configured mark pairs a reference image with a replacement image.
//! Frames arrive one at a time through [`FrameFilter::process`]; on scheduled
//! frames the filter matches local features of every reference against the
//! frame, fits a homography per mark with RANSAC, and paints the replacement
//! over every placement that is still fresh enough. Between detections marks
//! coast on their last placement for a bounded number of ghost frames.
//!
//! Feature extraction sits behind [`FeatureEngine`]; the bundled
//! [`OrbEngine`] uses FAST corners and BRIEF descriptors, with optional
//! parallelism via the `rayon` feature. File loading needs `image-io`,
//! structured logging needs `tracing`.

mod candidate;
pub mod compositor;
pub mod config;
pub mod features;
pub mod filter;
pub mod geometry;
pub mod image;
pub mod placement;
pub mod registry;
pub mod schedule;
mod trace;
pub mod util;

pub use compositor::{Compositor, CompositorConfig, Overlay};
pub use config::{parse_mark_args, FilterConfig, MarkSpec};
pub use features::{Correspondence, Feature, FeatureEngine, FeatureSet, Keypoint, OrbConfig, OrbEngine};
pub use filter::{FrameFilter, FrameReport, Unlogo};
pub use geometry::{Homography, RansacConfig};
pub use image::{ImageView, ImageViewMut, OwnedImage, PixelFormat};
pub use placement::{Placement, PlacementConfig, PlacementEstimator, Rejection};
pub use registry::{MarkId, MarkRegistry, MarkSource, ReferenceMark, TrackState};
pub use schedule::{should_detect, DetectedInstance, DetectionScheduler};
pub use util::{UnlogoError, UnlogoResult};
