//! Loading reference and replacement images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::compositor::Overlay;
use crate::image::{OwnedImage, PixelFormat};
use crate::util::{UnlogoError, UnlogoResult};
use std::path::Path;

fn open<P: AsRef<Path>>(path: P) -> UnlogoResult<image::DynamicImage> {
    let path = path.as_ref();
    image::open(path).map_err(|err| UnlogoError::ImageIo {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Creates an owned grayscale image from a decoded image.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> UnlogoResult<OwnedImage> {
    let gray = img.to_luma8();
    OwnedImage::gray(gray.as_raw().clone(), gray.width() as usize, gray.height() as usize)
}

/// Loads an image from disk and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> UnlogoResult<OwnedImage> {
    owned_from_dynamic_image(&open(path)?)
}

/// Loads a replacement image and converts it to the output pixel layout.
///
/// The file's alpha channel is kept as a separate blend plane.
pub fn load_overlay<P: AsRef<Path>>(path: P, format: PixelFormat) -> UnlogoResult<Overlay> {
    let rgba = open(path)?.to_rgba8();
    Overlay::from_rgba(
        rgba.as_raw(),
        rgba.width() as usize,
        rgba.height() as usize,
        format,
    )
}
