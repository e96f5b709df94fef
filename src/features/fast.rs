//! FAST-9 corner detection.
//!
//! Each candidate pixel is compared against 16 pixels on a Bresenham circle of
//! radius 3. A corner needs at least 9 contiguous circle pixels that are all
//! brighter than `center + threshold` or all darker than `center - threshold`.
//! The run may wrap around the circle.

use crate::features::Keypoint;
use crate::image::ImageView;

/// Radius of the sampling circle.
pub const CIRCLE_RADIUS: usize = 3;

/// Contiguous arc length required for a corner.
const ARC_LENGTH: usize = 9;

/// Circle offsets, clockwise from 12 o'clock.
const CIRCLE: [(isize, isize); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Detects FAST-9 corners at least `margin` pixels away from every border.
///
/// The returned keypoints are unsorted and unsuppressed.
pub fn detect(image: ImageView<'_>, threshold: u8, margin: usize) -> Vec<Keypoint> {
    let margin = margin.max(CIRCLE_RADIUS);
    let (w, h) = (image.width(), image.height());
    let mut corners = Vec::new();
    if w <= 2 * margin || h <= 2 * margin {
        return corners;
    }

    let t = i16::from(threshold);
    let mut ring = [0i16; 16];
    for y in margin..h - margin {
        for x in margin..w - margin {
            let Some(center) = image.get(x, y).map(i16::from) else {
                continue;
            };

            // Two of the four compass points must agree for any 9-arc to exist.
            let compass = [0usize, 4, 8, 12].map(|i| sample(image, x, y, i));
            let bright = compass.iter().filter(|&&p| p > center + t).count();
            let dark = compass.iter().filter(|&&p| p < center - t).count();
            if bright < 2 && dark < 2 {
                continue;
            }

            for (i, value) in ring.iter_mut().enumerate() {
                *value = sample(image, x, y, i);
            }
            if let Some(score) = corner_score(&ring, center, t) {
                corners.push(Keypoint {
                    x: x as f32,
                    y: y as f32,
                    score,
                    angle: 0.0,
                });
            }
        }
    }
    corners
}

fn sample(image: ImageView<'_>, x: usize, y: usize, idx: usize) -> i16 {
    let (dx, dy) = CIRCLE[idx];
    let px = x.wrapping_add_signed(dx);
    let py = y.wrapping_add_signed(dy);
    image.get(px, py).map(i16::from).unwrap_or(0)
}

/// Returns the corner response if the ring contains a qualifying arc.
///
/// The response is the summed contrast beyond the threshold over the side
/// (brighter or darker) that forms the arc.
fn corner_score(ring: &[i16; 16], center: i16, t: i16) -> Option<f32> {
    let bright = has_arc(ring, |p| p > center + t);
    let dark = has_arc(ring, |p| p < center - t);
    if !bright && !dark {
        return None;
    }

    let bright_score: i32 = ring
        .iter()
        .filter(|&&p| p > center + t)
        .map(|&p| i32::from(p - center - t))
        .sum();
    let dark_score: i32 = ring
        .iter()
        .filter(|&&p| p < center - t)
        .map(|&p| i32::from(center - t - p))
        .sum();
    let score = match (bright, dark) {
        (true, false) => bright_score,
        (false, true) => dark_score,
        _ => bright_score.max(dark_score),
    };
    Some(score as f32)
}

fn has_arc(ring: &[i16; 16], pred: impl Fn(i16) -> bool) -> bool {
    let mut run = 0usize;
    for i in 0..ring.len() + ARC_LENGTH - 1 {
        if pred(ring[i % ring.len()]) {
            run += 1;
            if run >= ARC_LENGTH {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}
