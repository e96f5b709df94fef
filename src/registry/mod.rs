//! Reference mark registry.
//!
//! One [`ReferenceMark`] per configured logo, created at startup and kept in
//! registration order for the lifetime of the filter. The order decides both
//! the order of diagnostics and the overlay layering when placements overlap.
//! Descriptors and overlay pixels are immutable after loading; only the
//! [`TrackState`] changes, and only through the detection scheduler.

use crate::compositor::Overlay;
use crate::features::{FeatureEngine, FeatureSet};
use crate::geometry::Homography;
use crate::image::OwnedImage;
use crate::trace::trace_debug;
use crate::util::{UnlogoError, UnlogoResult};

mod track;

pub use track::TrackState;

/// Index of a mark in its registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(pub usize);

/// In-memory inputs for one mark.
#[derive(Clone, Debug)]
pub struct MarkSource {
    /// Name used in diagnostics and for lookup.
    pub name: String,
    /// Grayscale reference image to search for.
    pub reference: OwnedImage,
    /// Replacement pixels, already in the output layout.
    pub overlay: Overlay,
}

/// A known logo: what it looks like, what replaces it, and where it was seen.
#[derive(Clone, Debug)]
pub struct ReferenceMark {
    name: String,
    features: FeatureSet,
    reference_size: (usize, usize),
    overlay: Overlay,
    track: TrackState,
}

impl ReferenceMark {
    /// Stable name of the mark.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor set of the reference image.
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Width and height of the reference image.
    pub fn reference_size(&self) -> (usize, usize) {
        self.reference_size
    }

    /// Replacement image.
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Current tracking state.
    pub fn track(&self) -> &TrackState {
        &self.track
    }

    pub(crate) fn track_mut(&mut self) -> &mut TrackState {
        &mut self.track
    }

    /// Centre of the reference image in reference coordinates.
    pub fn reference_center(&self) -> [f64; 2] {
        [
            self.reference_size.0 as f64 / 2.0,
            self.reference_size.1 as f64 / 2.0,
        ]
    }

    /// Mapping from overlay pixel coordinates into the frame, if placed.
    ///
    /// The overlay is stretched over the reference image before the tracked
    /// homography is applied.
    pub fn overlay_to_frame(&self) -> Option<Homography> {
        let transform = self.track.transform()?;
        let sx = self.reference_size.0 as f64 / self.overlay.width() as f64;
        let sy = self.reference_size.1 as f64 / self.overlay.height() as f64;
        Some(transform.after(&Homography::scaling(sx, sy)))
    }
}

/// Ordered collection of all configured marks.
#[derive(Clone, Debug)]
pub struct MarkRegistry {
    marks: Vec<ReferenceMark>,
}

impl MarkRegistry {
    /// Describes every reference image and builds the registry.
    ///
    /// Fails without returning a partial registry if the list is empty, a
    /// reference is not grayscale, or a reference has no usable features.
    pub fn build<E: FeatureEngine + ?Sized>(sources: Vec<MarkSource>, engine: &E) -> UnlogoResult<Self> {
        if sources.is_empty() {
            return Err(UnlogoError::NoMarks);
        }
        let mut marks = Vec::with_capacity(sources.len());
        for source in sources {
            if source.reference.channels() != 1 {
                return Err(UnlogoError::ChannelMismatch {
                    expected: 1,
                    got: source.reference.channels(),
                });
            }
            let features = engine.extract(source.reference.view())?;
            if features.is_empty() {
                return Err(UnlogoError::NoFeatures { name: source.name });
            }
            trace_debug!(
                "mark_loaded",
                mark = source.name.as_str(),
                features = features.len()
            );
            marks.push(ReferenceMark {
                reference_size: (source.reference.width(), source.reference.height()),
                name: source.name,
                features,
                overlay: source.overlay,
                track: TrackState::default(),
            });
        }
        Ok(Self { marks })
    }

    /// Loads every (reference, replacement) pair from disk.
    ///
    /// The reference path doubles as the mark name.
    #[cfg(feature = "image-io")]
    pub fn load<E: FeatureEngine + ?Sized>(
        specs: &[crate::config::MarkSpec],
        format: crate::image::PixelFormat,
        engine: &E,
    ) -> UnlogoResult<Self> {
        use crate::image::io::{load_gray_image, load_overlay};

        let mut sources = Vec::with_capacity(specs.len());
        for spec in specs {
            sources.push(MarkSource {
                name: spec.reference.display().to_string(),
                reference: load_gray_image(&spec.reference)?,
                overlay: load_overlay(&spec.replacement, format)?,
            });
        }
        Self::build(sources, engine)
    }

    /// Number of marks.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// False for a built registry; true once the owning filter is closed.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Returns the mark with the given id.
    pub fn get(&self, id: MarkId) -> Option<&ReferenceMark> {
        self.marks.get(id.0)
    }

    /// Looks a mark up by name.
    pub fn find(&self, name: &str) -> Option<(MarkId, &ReferenceMark)> {
        self.iter().find(|(_, mark)| mark.name() == name)
    }

    /// Iterates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (MarkId, &ReferenceMark)> + '_ {
        self.marks
            .iter()
            .enumerate()
            .map(|(idx, mark)| (MarkId(idx), mark))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (MarkId, &mut ReferenceMark)> + '_ {
        self.marks
            .iter_mut()
            .enumerate()
            .map(|(idx, mark)| (MarkId(idx), mark))
    }

    /// Drops every mark along with its descriptors and overlay pixels.
    pub(crate) fn clear(&mut self) {
        self.marks = Vec::new();
    }

    /// Ids of marks that are placed and within the ghost-frame allowance.
    pub fn active(&self, ghost_frames_allowed: u32) -> Vec<MarkId> {
        self.iter()
            .filter(|(_, mark)| mark.track().is_active(ghost_frames_allowed))
            .map(|(id, _)| id)
            .collect()
    }
}
