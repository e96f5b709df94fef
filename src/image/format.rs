//! Interleaved pixel layouts the filter accepts from the host.

/// Interleaved 8-bit pixel layout of a frame or overlay.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelFormat {
    /// Single luma channel.
    Gray8,
    /// Red, green, blue.
    Rgb24,
    /// Blue, green, red (the usual layout of decoded video frames).
    #[default]
    Bgr24,
    /// Red, green, blue, alpha.
    Rgba32,
    /// Blue, green, red, alpha.
    Bgra32,
}

impl PixelFormat {
    /// Number of interleaved bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
            PixelFormat::Rgba32 | PixelFormat::Bgra32 => 4,
        }
    }

    /// Channel offsets of red, green and blue, or `None` for gray.
    pub fn rgb_offsets(self) -> Option<[usize; 3]> {
        match self {
            PixelFormat::Gray8 => None,
            PixelFormat::Rgb24 | PixelFormat::Rgba32 => Some([0, 1, 2]),
            PixelFormat::Bgr24 | PixelFormat::Bgra32 => Some([2, 1, 0]),
        }
    }

    /// Channel offset of the alpha byte, if the layout carries one.
    pub fn alpha_offset(self) -> Option<usize> {
        match self {
            PixelFormat::Rgba32 | PixelFormat::Bgra32 => Some(3),
            _ => None,
        }
    }

    /// Returns the colour channels for an `[r, g, b, a]` source pixel.
    ///
    /// Gray layouts reduce to luma; the alpha byte is written for layouts that
    /// carry one.
    pub fn encode_rgba(self, rgba: [u8; 4], out: &mut [u8]) {
        match self.rgb_offsets() {
            None => out[0] = luma(rgba[0], rgba[1], rgba[2]),
            Some([r, g, b]) => {
                out[r] = rgba[0];
                out[g] = rgba[1];
                out[b] = rgba[2];
            }
        }
        if let Some(a) = self.alpha_offset() {
            out[a] = rgba[3];
        }
    }
}

/// Integer BT.601 luma.
#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = 77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b) + 128;
    (sum >> 8) as u8
}
