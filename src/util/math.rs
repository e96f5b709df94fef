//! Small numeric helpers shared by placement and compositing.

/// Blends `src` over `dst` with an 8-bit alpha, rounding to nearest.
pub(crate) fn blend_u8(src: u8, dst: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    let mixed = a * u32::from(src) + (255 - a) * u32::from(dst) + 127;
    (mixed / 255) as u8
}

/// Smallest count that is at least `fraction * total`.
///
/// `fraction` is clamped to `[0, 1]` and rounded to six decimals so that
/// `0.1_f32` behaves like the decimal it was written as.
pub(crate) fn min_count_for_fraction(total: usize, fraction: f32) -> usize {
    let fraction = (f64::from(fraction.clamp(0.0, 1.0)) * 1e6).round() / 1e6;
    let needed = (fraction * total as f64 - 1e-9).ceil().max(0.0) as usize;
    needed.min(total)
}

/// Linear interpolation between two samples.
#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
