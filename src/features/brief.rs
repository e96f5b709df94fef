//! Steered BRIEF binary descriptors.
//!
//! A descriptor is 256 pairwise intensity comparisons inside a disc around
//! the keypoint, taken on a box-blurred copy of the image. The pair layout is
//! drawn once from a seeded generator so the reference marks and every frame
//! are described with the same pattern. Before sampling, the pairs are
//! rotated by the keypoint's intensity-centroid angle, which makes the
//! descriptor follow an in-plane rotation of the patch.

use crate::features::{Descriptor, Keypoint};
use crate::image::{ImageView, OwnedImage};
use crate::util::UnlogoResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DESCRIPTOR_BITS: usize = 256;

/// Fixed set of 256 point pairs within the disc of radius `radius`.
#[derive(Clone, Debug, PartialEq)]
pub struct BriefPattern {
    radius: usize,
    pairs: Vec<[(i32, i32); 2]>,
}

impl BriefPattern {
    /// Draws a deterministic pattern for the given patch radius and seed.
    pub fn generate(radius: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let r = radius as i32;
        // Points stay inside the disc so any rotation keeps them in the patch.
        let mut point = || loop {
            let p = (rng.random_range(-r..=r), rng.random_range(-r..=r));
            if p.0 * p.0 + p.1 * p.1 <= r * r {
                return p;
            }
        };
        let mut pairs = Vec::with_capacity(DESCRIPTOR_BITS);
        while pairs.len() < DESCRIPTOR_BITS {
            let (a, b) = (point(), point());
            if a != b || radius == 0 {
                pairs.push([a, b]);
            }
        }
        Self { radius, pairs }
    }

    /// Patch half-size.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Intensity-centroid angle of the disc around `keypoint`, in radians.
    ///
    /// The angle points from the keypoint towards the patch's centre of mass,
    /// measured from +x towards +y (image rows grow downwards). A flat patch
    /// gives 0. Returns `None` if the disc does not fit inside the image.
    pub fn orientation(&self, image: ImageView<'_>, keypoint: Keypoint) -> Option<f32> {
        let (x, y) = self.anchor(image, keypoint)?;
        let r = self.radius as isize;
        let (mut m10, mut m01) = (0i64, 0i64);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let v = i64::from(image.get(x.wrapping_add_signed(dx), y.wrapping_add_signed(dy))?);
                m10 += v * dx as i64;
                m01 += v * dy as i64;
            }
        }
        Some((m01 as f32).atan2(m10 as f32))
    }

    /// Describes the patch around `keypoint` in a smoothed grayscale image,
    /// with the sampling pairs rotated by `keypoint.angle`.
    ///
    /// Returns `None` if the patch does not fit inside the image.
    pub fn describe(&self, smoothed: ImageView<'_>, keypoint: Keypoint) -> Option<Descriptor> {
        let (x, y) = self.anchor(smoothed, keypoint)?;
        let (sin, cos) = keypoint.angle.sin_cos();
        let steer = |(dx, dy): (i32, i32)| {
            let (dx, dy) = (dx as f32, dy as f32);
            let rx = (dx * cos - dy * sin).round() as isize;
            let ry = (dx * sin + dy * cos).round() as isize;
            (x.wrapping_add_signed(rx), y.wrapping_add_signed(ry))
        };

        let mut descriptor = [0u8; 32];
        for (bit, &[a, b]) in self.pairs.iter().enumerate() {
            let (ax, ay) = steer(a);
            let (bx, by) = steer(b);
            if smoothed.get(ax, ay)? < smoothed.get(bx, by)? {
                descriptor[bit / 8] |= 1 << (bit % 8);
            }
        }
        Some(descriptor)
    }

    /// Integer keypoint position whose full disc lies inside the image.
    fn anchor(&self, image: ImageView<'_>, keypoint: Keypoint) -> Option<(usize, usize)> {
        let x = keypoint.x.round();
        let y = keypoint.y.round();
        if x < self.radius as f32 || y < self.radius as f32 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x + self.radius >= image.width() || y + self.radius >= image.height() {
            return None;
        }
        Some((x, y))
    }
}

/// Separable box blur with edge clamping on a single-channel image.
pub fn box_blur(image: ImageView<'_>, radius: usize) -> UnlogoResult<OwnedImage> {
    let (w, h) = (image.width(), image.height());
    if radius == 0 {
        return OwnedImage::from_view(image);
    }
    let taps = (2 * radius + 1) as u32;

    let mut horizontal = vec![0u32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            for k in 0..2 * radius + 1 {
                let sx = (x + k).saturating_sub(radius).min(w - 1);
                sum += u32::from(image.get(sx, y).unwrap_or(0));
            }
            horizontal[y * w + x] = sum;
        }
    }

    let mut out = vec![0u8; w * h];
    let denom = taps * taps;
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            for k in 0..2 * radius + 1 {
                let sy = (y + k).saturating_sub(radius).min(h - 1);
                sum += horizontal[sy * w + x];
            }
            out[y * w + x] = ((sum + denom / 2) / denom) as u8;
        }
    }
    OwnedImage::gray(out, w, h)
}
