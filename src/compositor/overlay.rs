//! Replacement images in the output pixel layout.

use crate::image::{ImageView, OwnedImage, PixelFormat};
use crate::util::{UnlogoError, UnlogoResult};

/// Replacement pixels plus an optional per-pixel alpha plane.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pixels: OwnedImage,
    alpha: Option<OwnedImage>,
}

impl Overlay {
    /// Fully opaque overlay.
    pub fn opaque(pixels: OwnedImage) -> Self {
        Self {
            pixels,
            alpha: None,
        }
    }

    /// Overlay with a single-channel alpha plane of the same size.
    pub fn with_alpha(pixels: OwnedImage, alpha: OwnedImage) -> UnlogoResult<Self> {
        if alpha.channels() != 1 {
            return Err(UnlogoError::ChannelMismatch {
                expected: 1,
                got: alpha.channels(),
            });
        }
        if alpha.width() != pixels.width() || alpha.height() != pixels.height() {
            return Err(UnlogoError::InvalidDimensions {
                width: alpha.width(),
                height: alpha.height(),
            });
        }
        Ok(Self {
            pixels,
            alpha: Some(alpha),
        })
    }

    /// Converts tightly packed RGBA into `format`, keeping alpha separately.
    ///
    /// A fully opaque source yields an overlay without an alpha plane.
    pub fn from_rgba(rgba: &[u8], width: usize, height: usize, format: PixelFormat) -> UnlogoResult<Self> {
        let source = ImageView::with_channels(rgba, width, height, width * 4, 4)?;
        let channels = format.channels();
        let mut pixels = vec![0u8; width * height * channels];
        let mut alpha = Vec::with_capacity(width * height);
        for y in 0..height {
            let Some(row) = source.row(y) else {
                continue;
            };
            for (x, px) in row.chunks_exact(4).enumerate() {
                let start = (y * width + x) * channels;
                format.encode_rgba([px[0], px[1], px[2], px[3]], &mut pixels[start..start + channels]);
                alpha.push(px[3]);
            }
        }

        let pixels = OwnedImage::new(pixels, width, height, channels)?;
        if alpha.iter().all(|&a| a == u8::MAX) {
            return Ok(Self::opaque(pixels));
        }
        Self::with_alpha(pixels, OwnedImage::gray(alpha, width, height)?)
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// Channels per pixel (matches the output layout).
    pub fn channels(&self) -> usize {
        self.pixels.channels()
    }

    /// Colour pixels.
    pub fn pixels(&self) -> ImageView<'_> {
        self.pixels.view()
    }

    /// Alpha plane, if the overlay is not fully opaque.
    pub fn alpha(&self) -> Option<ImageView<'_>> {
        self.alpha.as_ref().map(OwnedImage::view)
    }
}
