//! Image views over host-owned and crate-owned pixel buffers.
//!
//! `ImageView` and `ImageViewMut` are borrowed 2D views into a 1D byte buffer
//! with an explicit stride and interleaved channels. The stride counts bytes
//! between the starts of consecutive rows, so a stride larger than
//! `width * channels` represents padded rows. Views never copy or reallocate
//! the backing memory, which is what lets the filter write straight into the
//! buffer handed over by the host.

use crate::util::{UnlogoError, UnlogoResult};

mod format;
#[cfg(feature = "image-io")]
pub mod io;
mod owned;

pub use format::PixelFormat;
pub use owned::{to_luma, OwnedImage};

/// Borrowed, read-only 2D image view with explicit stride and channel count.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
}

impl<'a> ImageView<'a> {
    /// Creates a contiguous single-channel view.
    pub fn from_slice(data: &'a [u8], width: usize, height: usize) -> UnlogoResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a single-channel view with an explicit stride.
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> UnlogoResult<Self> {
        Self::with_channels(data, width, height, stride, 1)
    }

    /// Creates an interleaved multi-channel view with an explicit stride.
    pub fn with_channels(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
        channels: usize,
    ) -> UnlogoResult<Self> {
        let needed = required_len(width, height, stride, channels)?;
        if data.len() < needed {
            return Err(UnlogoError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            channels,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in bytes between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the number of interleaved channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the first channel of the pixel at `(x, y)` if it is in bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.pixel(x, y).map(|px| px[0])
    }

    /// Returns all channels of the pixel at `(x, y)` if it is in bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&'a [u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y
            .checked_mul(self.stride)?
            .checked_add(x.checked_mul(self.channels)?)?;
        self.data.get(start..start + self.channels)
    }

    /// Returns row `y` without padding (`width * channels` bytes).
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * self.channels)?;
        self.data.get(start..end)
    }

    /// Samples one channel at a fractional position with bilinear weights.
    ///
    /// Returns `None` when the 2x2 neighbourhood leaves the image.
    pub fn sample_bilinear(&self, x: f32, y: f32, channel: usize) -> Option<f32> {
        if channel >= self.channels || !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return None;
        }
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        if x0 >= self.width || y0 >= self.height {
            return None;
        }
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let p00 = f32::from(self.pixel(x0, y0)?[channel]);
        let p10 = f32::from(self.pixel(x1, y0)?[channel]);
        let p01 = f32::from(self.pixel(x0, y1)?[channel]);
        let p11 = f32::from(self.pixel(x1, y1)?[channel]);
        let top = crate::util::math::lerp(p00, p10, fx);
        let bottom = crate::util::math::lerp(p01, p11, fx);
        Some(crate::util::math::lerp(top, bottom, fy))
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, x: usize, y: usize, width: usize, height: usize) -> UnlogoResult<ImageView<'a>> {
        if width == 0 || height == 0 {
            return Err(UnlogoError::InvalidDimensions { width, height });
        }
        let fits = x
            .checked_add(width)
            .zip(y.checked_add(height))
            .map(|(end_x, end_y)| end_x <= self.width && end_y <= self.height)
            .unwrap_or(false);
        if !fits {
            return Err(UnlogoError::InvalidDimensions { width, height });
        }

        let start = y * self.stride + x * self.channels;
        let data = self.data.get(start..).ok_or(UnlogoError::BufferTooSmall {
            needed: start.saturating_add(1),
            got: self.data.len(),
        })?;
        ImageView::with_channels(data, width, height, self.stride, self.channels)
    }
}

/// Borrowed, writable 2D image view over caller-owned memory.
#[derive(Debug)]
pub struct ImageViewMut<'a> {
    data: &'a mut [u8],
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
}

impl<'a> ImageViewMut<'a> {
    /// Wraps a caller-owned buffer; the buffer is written in place.
    pub fn with_channels(
        data: &'a mut [u8],
        width: usize,
        height: usize,
        stride: usize,
        channels: usize,
    ) -> UnlogoResult<Self> {
        let needed = required_len(width, height, stride, channels)?;
        if data.len() < needed {
            return Err(UnlogoError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            channels,
        })
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

    /// Start of the backing memory, used to check buffer identity.
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Reborrows as a read-only view.
    pub fn as_view(&self) -> ImageView<'_> {
        ImageView {
            data: &*self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
            channels: self.channels,
        }
    }

    /// Returns row `y` without padding, mutably.
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * self.channels)?;
        self.data.get_mut(start..end)
    }

    /// Returns all channels of the pixel at `(x, y)` mutably.
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> Option<&mut [u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y * self.stride + x * self.channels;
        self.data.get_mut(start..start + self.channels)
    }

    /// Copies every row of `src` into this view; sizes and channels must agree.
    pub fn copy_from(&mut self, src: &ImageView<'_>) -> UnlogoResult<()> {
        if src.width() != self.width || src.height() != self.height {
            return Err(UnlogoError::InvalidDimensions {
                width: src.width(),
                height: src.height(),
            });
        }
        if src.channels() != self.channels {
            return Err(UnlogoError::ChannelMismatch {
                expected: self.channels,
                got: src.channels(),
            });
        }
        let got = self.data.len();
        let stride = self.stride;
        for y in 0..self.height {
            let (Some(from), Some(to)) = (src.row(y), self.row_mut(y)) else {
                return Err(UnlogoError::BufferTooSmall {
                    needed: (y + 1) * stride,
                    got,
                });
            };
            to.copy_from_slice(from);
        }
        Ok(())
    }
}

fn required_len(width: usize, height: usize, stride: usize, channels: usize) -> UnlogoResult<usize> {
    if width == 0 || height == 0 {
        return Err(UnlogoError::InvalidDimensions { width, height });
    }
    if channels == 0 {
        return Err(UnlogoError::ChannelMismatch {
            expected: 1,
            got: 0,
        });
    }
    let row_len = width
        .checked_mul(channels)
        .ok_or(UnlogoError::InvalidDimensions { width, height })?;
    if stride < row_len {
        return Err(UnlogoError::InvalidStride { row_len, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_len))
        .ok_or(UnlogoError::InvalidDimensions { width, height })
}
