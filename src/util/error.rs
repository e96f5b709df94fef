//! Error types for unlogo.

use thiserror::Error;

/// Result alias for unlogo operations.
pub type UnlogoResult<T> = std::result::Result<T, UnlogoError>;

/// Errors that can occur while loading marks or processing frames.
///
/// Per-mark detection misses are not errors; they are reported through
/// [`crate::placement::Rejection`] and the ghost-frame policy instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnlogoError {
    /// Width or height is zero or overflows the address space.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is shorter than one row of pixels.
    #[error("invalid stride {stride} for row length {row_len}")]
    InvalidStride { row_len: usize, stride: usize },
    /// Backing buffer is shorter than the described image.
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Channel count does not match what the operation expects.
    #[error("channel mismatch: expected {expected}, got {got}")]
    ChannelMismatch { expected: usize, got: usize },
    /// The host supplied no usable pixel data for this frame.
    #[error("empty input frame")]
    EmptyFrame,
    /// The mark argument string is not a non-empty list of path pairs.
    #[error("malformed mark arguments: expected an even, non-zero number of paths, got {count}")]
    MalformedArguments { count: usize },
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// No reference marks were configured.
    #[error("no reference marks configured")]
    NoMarks,
    /// Feature extraction on a reference image found nothing to match.
    #[error("reference mark `{name}` has no usable features")]
    NoFeatures { name: String },
    /// Reading or decoding an image file failed.
    #[error("failed to load image `{path}`: {reason}")]
    ImageIo { path: String, reason: String },
    /// The filter was closed and can no longer process frames.
    #[error("filter is closed")]
    Closed,
}
