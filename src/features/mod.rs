//! Feature extraction and matching capability.
//!
//! The detection scheduler only needs two things from a vision backend: a
//! set of keypoints with comparable descriptors for an image, and a list of
//! index pairs between two such sets. [`FeatureEngine`] captures exactly that
//! contract. [`OrbEngine`] is the bundled implementation (FAST corners with
//! oriented, smoothed BRIEF descriptors and brute-force Hamming matching).

use crate::image::{ImageView, OwnedImage};
use crate::trace::{trace_event, trace_span};
use crate::util::{UnlogoError, UnlogoResult};

pub mod brief;
pub mod fast;
pub mod matcher;

pub use brief::BriefPattern;
pub use matcher::hamming_distance;

/// 256-bit binary descriptor.
pub type Descriptor = [u8; 32];

/// Corner location in image coordinates with its detector response.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    /// X coordinate (column) in pixels.
    pub x: f32,
    /// Y coordinate (row) in pixels.
    pub y: f32,
    /// Detector response; larger is stronger.
    pub score: f32,
    /// Patch orientation in radians; 0 until a descriptor is computed.
    pub angle: f32,
}

/// Keypoint paired with its descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Feature {
    pub keypoint: Keypoint,
    pub descriptor: Descriptor,
}

/// Features of one image, in a stable order so indices can be shared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    /// Wraps already computed features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if no features were found.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Returns all features.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Returns the keypoint at `index`.
    pub fn keypoint(&self, index: usize) -> Option<&Keypoint> {
        self.features.get(index).map(|f| &f.keypoint)
    }

    /// Iterates over the descriptors in index order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> + '_ {
        self.features.iter().map(|f| &f.descriptor)
    }
}

/// Pairing of a reference feature with a frame feature believed to be the
/// same physical point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Correspondence {
    /// Index into the reference [`FeatureSet`].
    pub reference: usize,
    /// Index into the frame [`FeatureSet`].
    pub frame: usize,
    /// Descriptor distance; smaller is more confident.
    pub distance: u32,
}

/// Feature extraction and matching backend used by the detection scheduler.
pub trait FeatureEngine {
    /// Extracts features from a single-channel image.
    fn extract(&self, image: ImageView<'_>) -> UnlogoResult<FeatureSet>;

    /// Pairs reference features with frame features.
    fn correspond(&self, reference: &FeatureSet, frame: &FeatureSet) -> Vec<Correspondence>;
}

/// Configuration for the bundled FAST + BRIEF engine.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct OrbConfig {
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    /// Maximum keypoints kept per image after suppression.
    pub max_keypoints: usize,
    /// Chebyshev radius for non-maximum suppression.
    pub nms_radius: f32,
    /// Half-size of the BRIEF sampling patch.
    pub patch_radius: usize,
    /// Box-blur radius applied before sampling descriptors.
    pub blur_radius: usize,
    /// Largest Hamming distance accepted as a match.
    pub max_distance: u32,
    /// Best-to-second-best distance ratio for the ratio test.
    pub ratio: f32,
    /// Seed for the BRIEF sampling pattern.
    pub pattern_seed: u64,
    /// Use rayon for descriptors and matching (requires `rayon` feature).
    pub parallel: bool,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_keypoints: 500,
            nms_radius: 3.0,
            patch_radius: 15,
            blur_radius: 2,
            max_distance: 64,
            ratio: 0.8,
            pattern_seed: 0x5eed,
            parallel: false,
        }
    }
}

/// FAST corners, steered BRIEF descriptors, brute-force Hamming matching.
#[derive(Clone, Debug)]
pub struct OrbEngine {
    cfg: OrbConfig,
    pattern: BriefPattern,
}

impl Default for OrbEngine {
    fn default() -> Self {
        Self::new(OrbConfig::default())
    }
}

impl OrbEngine {
    /// Creates an engine; the sampling pattern is drawn once here.
    pub fn new(cfg: OrbConfig) -> Self {
        let pattern = BriefPattern::generate(cfg.patch_radius, cfg.pattern_seed);
        Self { cfg, pattern }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &OrbConfig {
        &self.cfg
    }

    /// Pixels at the border where no descriptor can be sampled.
    pub fn margin(&self) -> usize {
        (self.cfg.patch_radius + self.cfg.blur_radius).max(fast::CIRCLE_RADIUS)
    }
}

impl FeatureEngine for OrbEngine {
    fn extract(&self, image: ImageView<'_>) -> UnlogoResult<FeatureSet> {
        if image.channels() != 1 {
            return Err(UnlogoError::ChannelMismatch {
                expected: 1,
                got: image.channels(),
            });
        }
        let _span = trace_span!(
            "extract_features",
            width = image.width(),
            height = image.height()
        )
        .entered();

        let mut corners = fast::detect(image, self.cfg.fast_threshold, self.margin());
        let keypoints = crate::candidate::nms::nms_keypoints(
            &mut corners,
            self.cfg.nms_radius,
            self.cfg.max_keypoints,
        );
        let smoothed = brief::box_blur(image, self.cfg.blur_radius)?;
        let features = self.describe(&smoothed, keypoints);

        trace_event!("features_extracted", count = features.len());
        Ok(FeatureSet::new(features))
    }

    fn correspond(&self, reference: &FeatureSet, frame: &FeatureSet) -> Vec<Correspondence> {
        #[cfg(feature = "rayon")]
        if self.cfg.parallel {
            return matcher::match_brute_force_par(reference, frame, &self.cfg);
        }
        matcher::match_brute_force(reference, frame, &self.cfg)
    }
}

impl OrbEngine {
    fn describe(&self, smoothed: &OwnedImage, keypoints: Vec<Keypoint>) -> Vec<Feature> {
        let view = smoothed.view();
        let describe = |mut keypoint: Keypoint| {
            keypoint.angle = self.pattern.orientation(view, keypoint)?;
            self.pattern
                .describe(view, keypoint)
                .map(|descriptor| Feature {
                    keypoint,
                    descriptor,
                })
        };
        #[cfg(feature = "rayon")]
        if self.cfg.parallel {
            use rayon::prelude::*;
            return keypoints.into_par_iter().filter_map(describe).collect();
        }
        keypoints.into_iter().filter_map(describe).collect()
    }
}
