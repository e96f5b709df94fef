//! Host-facing filter lifecycle.
//!
//! A host opens one [`Unlogo`] per stream, feeds it every frame through
//! [`FrameFilter::process`] and closes it when the stream ends. All state
//! that survives between frames (the frame counter, the previous active
//! count and every mark's track) lives in the context object, so independent
//! streams never share anything.

use crate::compositor::{Compositor, CompositorConfig};
use crate::config::FilterConfig;
use crate::features::{FeatureEngine, OrbEngine};
use crate::image::{ImageView, ImageViewMut};
use crate::placement::PlacementEstimator;
use crate::registry::{MarkId, MarkRegistry, MarkSource};
use crate::schedule::{DetectedInstance, DetectionScheduler};
use crate::trace::{trace_event, trace_span};
use crate::util::{UnlogoError, UnlogoResult};

/// Number of planes in the host calling convention.
pub const MAX_PLANES: usize = 4;

/// What happened on one processed frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Zero-based index of the frame just processed.
    pub frame_index: u64,
    /// Whether full detection ran.
    pub detection_ran: bool,
    /// Marks reconfirmed on this frame.
    pub detected: Vec<DetectedInstance>,
    /// Marks drawn on this frame, in layering order.
    pub active: Vec<MarkId>,
}

/// Per-frame entry points a host pipeline drives.
pub trait FrameFilter {
    /// Processes one frame from `src` into `dst`.
    ///
    /// Only plane 0 carries pixels; the other planes are accepted for
    /// calling-convention compatibility and ignored. Strides are in bytes.
    /// On error the output bytes and all tracking state are left untouched.
    fn process(
        &mut self,
        dst: [Option<&mut [u8]>; MAX_PLANES],
        dst_stride: [usize; MAX_PLANES],
        src: [Option<&[u8]>; MAX_PLANES],
        src_stride: [usize; MAX_PLANES],
        width: usize,
        height: usize,
    ) -> UnlogoResult<FrameReport>;

    /// Releases per-stream state. Calling it again is a no-op.
    fn close(&mut self);
}

/// Logo replacement filter for one video stream.
#[derive(Debug)]
pub struct Unlogo<E: FeatureEngine = OrbEngine> {
    config: FilterConfig,
    engine: E,
    registry: MarkRegistry,
    scheduler: DetectionScheduler,
    compositor: Compositor,
    frame_index: u64,
    previous_active: usize,
    closed: bool,
}

impl Unlogo<OrbEngine> {
    /// Parses `logo:replacement[:logo:replacement...]`, loads every image and
    /// describes every reference with the bundled engine.
    ///
    /// Any malformed argument or unreadable file fails the whole call.
    #[cfg(feature = "image-io")]
    pub fn open(config: FilterConfig, argstr: &str) -> UnlogoResult<Self> {
        config.validate()?;
        let specs = crate::config::parse_mark_args(argstr)?;
        let engine = OrbEngine::new(config.orb.clone());
        let registry = MarkRegistry::load(&specs, config.format, &engine)?;
        Self::from_parts(config, engine, registry)
    }
}

impl<E: FeatureEngine> Unlogo<E> {
    /// Builds a filter from in-memory marks and a custom feature engine.
    ///
    /// Every overlay must already be in `config.format`.
    pub fn with_sources(config: FilterConfig, engine: E, sources: Vec<MarkSource>) -> UnlogoResult<Self> {
        config.validate()?;
        let channels = config.format.channels();
        if let Some(bad) = sources.iter().find(|s| s.overlay.channels() != channels) {
            return Err(UnlogoError::ChannelMismatch {
                expected: channels,
                got: bad.overlay.channels(),
            });
        }
        let registry = MarkRegistry::build(sources, &engine)?;
        Self::from_parts(config, engine, registry)
    }

    fn from_parts(config: FilterConfig, engine: E, registry: MarkRegistry) -> UnlogoResult<Self> {
        let scheduler = DetectionScheduler::new(
            config.matching_interval,
            config.ghost_frames_allowed,
            PlacementEstimator::new(config.placement.clone()),
        )?;
        let compositor = Compositor::new(CompositorConfig {
            draw_outline: config.draw_outline,
            ..CompositorConfig::default()
        });
        trace_event!("filter_opened", marks = registry.len());
        Ok(Self {
            config,
            engine,
            registry,
            scheduler,
            compositor,
            frame_index: 0,
            previous_active: 0,
            closed: false,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Feature engine used for detection.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Configured marks and their tracking state; empty after close.
    pub fn registry(&self) -> &MarkRegistry {
        &self.registry
    }

    /// Index the next processed frame will get.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Whether [`FrameFilter::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<E: FeatureEngine> FrameFilter for Unlogo<E> {
    fn process(
        &mut self,
        dst: [Option<&mut [u8]>; MAX_PLANES],
        dst_stride: [usize; MAX_PLANES],
        src: [Option<&[u8]>; MAX_PLANES],
        src_stride: [usize; MAX_PLANES],
        width: usize,
        height: usize,
    ) -> UnlogoResult<FrameReport> {
        if self.closed {
            return Err(UnlogoError::Closed);
        }
        let _span = trace_span!("process_frame", frame = self.frame_index).entered();

        let [Some(src), ..] = src else {
            return Err(UnlogoError::EmptyFrame);
        };
        let [Some(dst), ..] = dst else {
            return Err(UnlogoError::EmptyFrame);
        };
        if src.is_empty() || dst.is_empty() {
            return Err(UnlogoError::EmptyFrame);
        }

        let channels = self.config.format.channels();
        let input = ImageView::with_channels(src, width, height, src_stride[0], channels)?;
        let host_ptr = dst.as_ptr();
        let mut output = ImageViewMut::with_channels(dst, width, height, dst_stride[0], channels)?;

        // Everything that can fail is checked before any track moves.
        self.compositor.check(&input, &output, &self.registry)?;
        let outcome = self.scheduler.step(
            self.frame_index,
            self.previous_active,
            &input,
            self.config.format,
            &mut self.registry,
            &self.engine,
        )?;
        self.compositor
            .composite(&input, &mut output, &self.registry, &outcome.active)?;
        debug_assert_eq!(output.as_ptr(), host_ptr, "output plane was reallocated");

        let report = FrameReport {
            frame_index: self.frame_index,
            detection_ran: outcome.detection_ran,
            detected: outcome.detected,
            active: outcome.active,
        };
        self.previous_active = report.active.len();
        self.frame_index += 1;
        Ok(report)
    }

    fn close(&mut self) {
        if !self.closed {
            trace_event!("filter_closed", frames = self.frame_index);
            self.registry.clear();
            self.previous_active = 0;
            self.closed = true;
        }
    }
}
