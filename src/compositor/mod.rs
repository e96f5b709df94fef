//! Output frame composition.
//!
//! The output plane always starts as a copy of the input plane. Active marks
//! are then painted over it in registry order, each overlay warped through
//! its mark's current placement. All writes go into the buffer the caller
//! handed over; nothing is reallocated.

use crate::geometry::Homography;
use crate::image::{ImageView, ImageViewMut};
use crate::registry::{MarkId, MarkRegistry};
use crate::trace::{trace_debug, trace_span};
use crate::util::math::blend_u8;
use crate::util::{UnlogoError, UnlogoResult};

mod overlay;

pub use overlay::Overlay;

/// Drawing options.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct CompositorConfig {
    /// Stroke the placement quadrilateral of every drawn mark.
    pub draw_outline: bool,
    /// Raw channel bytes used for the outline (extra bytes are ignored).
    pub outline_color: [u8; 4],
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            draw_outline: false,
            outline_color: [0, 0, 255, 255],
        }
    }
}

/// Writes output frames.
#[derive(Clone, Debug, Default)]
pub struct Compositor {
    cfg: CompositorConfig,
}

impl Compositor {
    /// Creates a compositor with the given drawing options.
    pub fn new(cfg: CompositorConfig) -> Self {
        Self { cfg }
    }

    /// Checks that [`Compositor::composite`] will accept these buffers and
    /// every overlay in `registry`, without writing anything.
    pub fn check(
        &self,
        input: &ImageView<'_>,
        output: &ImageViewMut<'_>,
        registry: &MarkRegistry,
    ) -> UnlogoResult<()> {
        if (input.width(), input.height()) != (output.width(), output.height()) {
            return Err(UnlogoError::InvalidDimensions {
                width: input.width(),
                height: input.height(),
            });
        }
        let channels = output.channels();
        if input.channels() != channels {
            return Err(UnlogoError::ChannelMismatch {
                expected: channels,
                got: input.channels(),
            });
        }
        if let Some((_, mark)) = registry
            .iter()
            .find(|(_, mark)| mark.overlay().channels() != channels)
        {
            return Err(UnlogoError::ChannelMismatch {
                expected: channels,
                got: mark.overlay().channels(),
            });
        }
        Ok(())
    }

    /// Copies `input` into `output` and paints the overlays of `active`.
    ///
    /// Marks with a missing or non-invertible placement are skipped. Nothing
    /// is written unless [`Compositor::check`] passes.
    pub fn composite(
        &self,
        input: &ImageView<'_>,
        output: &mut ImageViewMut<'_>,
        registry: &MarkRegistry,
        active: &[MarkId],
    ) -> UnlogoResult<()> {
        let _span = trace_span!("composite", marks = active.len()).entered();

        self.check(input, output, registry)?;
        output.copy_from(input)?;
        for &id in active {
            let Some(mark) = registry.get(id) else {
                continue;
            };
            let Some(to_frame) = mark.overlay_to_frame() else {
                continue;
            };
            let painted = warp_overlay(output, mark.overlay(), &to_frame)?;
            trace_debug!("overlay_painted", mark = mark.name(), pixels = painted);
            if self.cfg.draw_outline {
                let (w, h) = (mark.overlay().width() as f64, mark.overlay().height() as f64);
                draw_quad(output, &to_frame, [w, h], &self.cfg.outline_color);
            }
        }
        Ok(())
    }
}

/// Warps `overlay` into `output` through `to_frame` (overlay to frame pixels).
///
/// Each destination pixel inside the projected quad is inverse-mapped and
/// sampled bilinearly; alpha, if present, blends with what is already there.
/// Returns the number of pixels written.
pub fn warp_overlay(
    output: &mut ImageViewMut<'_>,
    overlay: &Overlay,
    to_frame: &Homography,
) -> UnlogoResult<usize> {
    if overlay.channels() != output.channels() {
        return Err(UnlogoError::ChannelMismatch {
            expected: output.channels(),
            got: overlay.channels(),
        });
    }
    let Some(to_overlay) = to_frame.inverse() else {
        return Ok(0);
    };
    let (ow, oh) = (overlay.width() as f64, overlay.height() as f64);
    let Some((x0, y0, x1, y1)) = projected_bounds(to_frame, ow, oh, output.width(), output.height())
    else {
        return Ok(0);
    };

    let pixels = overlay.pixels();
    let alpha = overlay.alpha();
    let channels = output.channels();
    let mut painted = 0usize;
    for y in y0..y1 {
        for x in x0..x1 {
            let Some([u, v]) = to_overlay.project(x as f64 + 0.5, y as f64 + 0.5) else {
                continue;
            };
            if !(0.0..ow).contains(&u) || !(0.0..oh).contains(&v) {
                continue;
            }
            let su = ((u - 0.5).max(0.0) as f32).min(overlay.width() as f32 - 1.0);
            let sv = ((v - 0.5).max(0.0) as f32).min(overlay.height() as f32 - 1.0);
            let a = match alpha {
                Some(plane) => plane
                    .sample_bilinear(su, sv, 0)
                    .map(|a| a.round() as u8)
                    .unwrap_or(0),
                None => u8::MAX,
            };
            if a == 0 {
                continue;
            }
            let Some(dst) = output.pixel_mut(x, y) else {
                continue;
            };
            for c in 0..channels {
                let Some(src) = pixels.sample_bilinear(su, sv, c) else {
                    continue;
                };
                let src = src.round().clamp(0.0, 255.0) as u8;
                dst[c] = blend_u8(src, dst[c], a);
            }
            painted += 1;
        }
    }
    Ok(painted)
}

/// Integer bounding box of the projected overlay rectangle, clipped to the
/// frame. `None` if it misses the frame or a corner goes to infinity.
fn projected_bounds(
    to_frame: &Homography,
    ow: f64,
    oh: f64,
    width: usize,
    height: usize,
) -> Option<(usize, usize, usize, usize)> {
    let corners = [[0.0, 0.0], [ow, 0.0], [ow, oh], [0.0, oh]];
    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];
    for [x, y] in corners {
        let p = to_frame.project(x, y)?;
        if !p[0].is_finite() || !p[1].is_finite() {
            return None;
        }
        for k in 0..2 {
            min[k] = min[k].min(p[k]);
            max[k] = max[k].max(p[k]);
        }
    }
    let x0 = min[0].floor().max(0.0) as usize;
    let y0 = min[1].floor().max(0.0) as usize;
    let x1 = (max[0].ceil().max(0.0) as usize).min(width);
    let y1 = (max[1].ceil().max(0.0) as usize).min(height);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

/// Strokes the projected outline of a `size[0] x size[1]` rectangle.
fn draw_quad(output: &mut ImageViewMut<'_>, to_frame: &Homography, size: [f64; 2], color: &[u8; 4]) {
    let corners = [[0.0, 0.0], [size[0], 0.0], [size[0], size[1]], [0.0, size[1]]];
    let projected: Vec<[f64; 2]> = corners
        .iter()
        .filter_map(|c| to_frame.project(c[0], c[1]))
        .collect();
    if projected.len() != corners.len() {
        return;
    }
    for i in 0..projected.len() {
        let a = projected[i];
        let b = projected[(i + 1) % projected.len()];
        let steps = (b[0] - a[0]).abs().max((b[1] - a[1]).abs()).ceil().min(1e5) as usize;
        for s in 0..=steps {
            let t = if steps == 0 { 0.0 } else { s as f64 / steps as f64 };
            let x = a[0] + (b[0] - a[0]) * t;
            let y = a[1] + (b[1] - a[1]) * t;
            if x < 0.0 || y < 0.0 {
                continue;
            }
            if let Some(px) = output.pixel_mut(x as usize, y as usize) {
                for (dst, &c) in px.iter_mut().zip(color.iter()) {
                    *dst = c;
                }
            }
        }
    }
}
