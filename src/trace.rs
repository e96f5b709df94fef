//! Logging hooks for the frame loop.
//!
//! Call sites name their stage or event and attach structured fields, e.g.
//! `trace_event!("mark_confirmed", mark = name, inliers = n)`. With the
//! `tracing` feature the hooks forward to `tracing`; without it they only
//! evaluate the field expressions. Levels are fixed per hook:
//!
//! - `trace_span!` (info): `process_frame`, `detect`, `extract_features`,
//!   `fit_placement`, `composite`.
//! - `trace_event!` (info): once-per-frame or lifecycle facts such as
//!   `filter_opened`, `mark_confirmed`, `no_marks_detected`, `filter_closed`.
//! - `trace_debug!` (debug): per-mark and per-stage detail such as
//!   `mark_rejected`, `detection_skipped`, `overlay_painted`.

#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
}

#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::debug!(name: $name, $($key = $value),+)
    };
}

// Fields are still evaluated so disabled builds see the same uses.
#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
}

pub(crate) use trace_debug;
pub(crate) use trace_event;
pub(crate) use trace_span;

/// Guard returned by `trace_span!` when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
