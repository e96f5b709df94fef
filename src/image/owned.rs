//! Owned contiguous images and luma reduction.

use crate::image::format::luma;
use crate::image::{ImageView, ImageViewMut, PixelFormat};
use crate::util::{UnlogoError, UnlogoResult};

/// Owned contiguous image buffer (`stride == width * channels`).
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl OwnedImage {
    /// Wraps a contiguous buffer whose length is exactly `width * height * channels`.
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: usize) -> UnlogoResult<Self> {
        if width == 0 || height == 0 {
            return Err(UnlogoError::InvalidDimensions { width, height });
        }
        if channels == 0 {
            return Err(UnlogoError::ChannelMismatch {
                expected: 1,
                got: 0,
            });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(UnlogoError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(UnlogoError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(UnlogoError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Creates a single-channel image from a contiguous buffer.
    pub fn gray(data: Vec<u8>, width: usize, height: usize) -> UnlogoResult<Self> {
        Self::new(data, width, height, 1)
    }

    /// Creates an image filled with one pixel value.
    pub fn filled(width: usize, height: usize, pixel: &[u8]) -> UnlogoResult<Self> {
        let count = width
            .checked_mul(height)
            .ok_or(UnlogoError::InvalidDimensions { width, height })?;
        let data = pixel.repeat(count);
        Self::new(data, width, height, pixel.len())
    }

    /// Copies a (possibly strided) view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_>) -> UnlogoResult<Self> {
        let row_len = view.width() * view.channels();
        let mut data = Vec::with_capacity(row_len * view.height());
        for y in 0..view.height() {
            let row = view.row(y).ok_or(UnlogoError::BufferTooSmall {
                needed: y * view.stride() + row_len,
                got: view.as_slice().len(),
            })?;
            data.extend_from_slice(row);
        }
        Self::new(data, view.width(), view.height(), view.channels())
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the contiguous pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_> {
        ImageView::with_channels(
            &self.data,
            self.width,
            self.height,
            self.width * self.channels,
            self.channels,
        )
        .expect("owned image dimensions are validated on construction")
    }

    /// Returns a writable view of the image.
    pub fn view_mut(&mut self) -> ImageViewMut<'_> {
        let stride = self.width * self.channels;
        ImageViewMut::with_channels(&mut self.data, self.width, self.height, stride, self.channels)
            .expect("owned image dimensions are validated on construction")
    }
}

/// Reduces an interleaved view to a single 8-bit luma channel.
///
/// Four-channel layouts ignore alpha. A single-channel view is copied as is.
pub fn to_luma(view: ImageView<'_>, format: PixelFormat) -> UnlogoResult<OwnedImage> {
    if view.channels() != format.channels() {
        return Err(UnlogoError::ChannelMismatch {
            expected: format.channels(),
            got: view.channels(),
        });
    }
    let Some([r, g, b]) = format.rgb_offsets() else {
        return OwnedImage::from_view(view);
    };

    let channels = view.channels();
    let mut data = Vec::with_capacity(view.width() * view.height());
    for y in 0..view.height() {
        let row = view.row(y).ok_or(UnlogoError::BufferTooSmall {
            needed: y * view.stride() + view.width() * channels,
            got: view.as_slice().len(),
        })?;
        data.extend(row.chunks_exact(channels).map(|px| luma(px[r], px[g], px[b])));
    }
    OwnedImage::gray(data, view.width(), view.height())
}
