//! Filter configuration and the mark argument string.

use crate::features::OrbConfig;
use crate::image::PixelFormat;
use crate::placement::PlacementConfig;
use crate::util::{UnlogoError, UnlogoResult};
use std::path::PathBuf;

/// Separator between paths in the mark argument string.
pub const ARG_SEPARATOR: char = ':';

/// One configured mark: the logo to look for and the image drawn over it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkSpec {
    /// Reference image searched for in each frame.
    pub reference: PathBuf,
    /// Replacement image drawn over the detected reference.
    pub replacement: PathBuf,
}

/// Splits `logo1:replacement1:logo2:replacement2:...` into mark pairs.
///
/// The path count must be even and non-zero and no path may be empty;
/// anything else is `MalformedArguments` and no pair is returned.
pub fn parse_mark_args(argstr: &str) -> UnlogoResult<Vec<MarkSpec>> {
    let parts: Vec<&str> = argstr.split(ARG_SEPARATOR).map(str::trim).collect();
    let count = if argstr.trim().is_empty() { 0 } else { parts.len() };
    if count == 0 || count % 2 != 0 || parts.iter().any(|p| p.is_empty()) {
        return Err(UnlogoError::MalformedArguments { count });
    }
    Ok(parts
        .chunks_exact(2)
        .map(|pair| MarkSpec {
            reference: PathBuf::from(pair[0]),
            replacement: PathBuf::from(pair[1]),
        })
        .collect())
}

/// Everything that tunes a filter instance.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct FilterConfig {
    /// Run scheduled detection every this many frames.
    pub matching_interval: u64,
    /// Frames a mark may go unconfirmed and still be drawn.
    pub ghost_frames_allowed: u32,
    /// Layout of the host's frame buffers.
    pub format: PixelFormat,
    /// Placement acceptance thresholds.
    pub placement: PlacementConfig,
    /// Settings for the bundled feature engine.
    pub orb: OrbConfig,
    /// Stroke the placement outline of every drawn mark.
    pub draw_outline: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            matching_interval: 10,
            ghost_frames_allowed: 50,
            format: PixelFormat::Bgr24,
            placement: PlacementConfig::default(),
            orb: OrbConfig::default(),
            draw_outline: false,
        }
    }
}

impl FilterConfig {
    /// Checks value ranges that would otherwise fail per frame.
    pub fn validate(&self) -> UnlogoResult<()> {
        if self.matching_interval == 0 {
            return Err(UnlogoError::InvalidConfig("matching_interval must be non-zero"));
        }
        let pct = self.placement.match_pct_threshold;
        if !(0.0..=1.0).contains(&pct) {
            return Err(UnlogoError::InvalidConfig(
                "match_pct_threshold must be within [0, 1]",
            ));
        }
        let threshold = self.placement.ransac.inlier_threshold;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(UnlogoError::InvalidConfig("inlier_threshold must be positive"));
        }
        if !(self.orb.ratio.is_finite() && self.orb.ratio > 0.0) {
            return Err(UnlogoError::InvalidConfig("ratio must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_mark_args, FilterConfig, MarkSpec};
    use crate::util::UnlogoError;
    use std::path::PathBuf;

    #[test]
    fn parses_pairs_in_order() {
        let specs = parse_mark_args("nike.png:blank.png:adidas.png:cat.png").unwrap();
        assert_eq!(
            specs,
            vec![
                MarkSpec {
                    reference: PathBuf::from("nike.png"),
                    replacement: PathBuf::from("blank.png"),
                },
                MarkSpec {
                    reference: PathBuf::from("adidas.png"),
                    replacement: PathBuf::from("cat.png"),
                },
            ]
        );
    }

    #[test]
    fn odd_count_is_malformed() {
        assert_eq!(
            parse_mark_args("a.png:b.png:c.png").unwrap_err(),
            UnlogoError::MalformedArguments { count: 3 }
        );
    }

    #[test]
    fn empty_string_and_empty_entries_are_malformed() {
        assert_eq!(
            parse_mark_args("").unwrap_err(),
            UnlogoError::MalformedArguments { count: 0 }
        );
        assert_eq!(
            parse_mark_args("a.png::b.png:c.png").unwrap_err(),
            UnlogoError::MalformedArguments { count: 4 }
        );
        assert_eq!(
            parse_mark_args("a.png:").unwrap_err(),
            UnlogoError::MalformedArguments { count: 2 }
        );
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = FilterConfig::default();
        assert_eq!(cfg.matching_interval, 10);
        assert_eq!(cfg.ghost_frames_allowed, 50);
        assert!(!cfg.draw_outline);
        cfg.validate().unwrap();
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut cfg = FilterConfig {
            matching_interval: 0,
            ..FilterConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(UnlogoError::InvalidConfig(_))));

        cfg.matching_interval = 10;
        cfg.placement.match_pct_threshold = 1.5;
        assert!(matches!(cfg.validate(), Err(UnlogoError::InvalidConfig(_))));

        cfg.placement.match_pct_threshold = 0.1;
        cfg.placement.ransac.inlier_threshold = 0.0;
        assert!(matches!(cfg.validate(), Err(UnlogoError::InvalidConfig(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_fills_defaults() {
        let cfg: FilterConfig = serde_json::from_str(
            r#"{"matching_interval": 5, "format": "rgba32", "placement": {"min_inliers": 12}}"#,
        )
        .unwrap();
        assert_eq!(cfg.matching_interval, 5);
        assert_eq!(cfg.format, crate::image::PixelFormat::Rgba32);
        assert_eq!(cfg.placement.min_inliers, 12);
        assert_eq!(cfg.placement.match_pct_threshold, 0.1);
        assert_eq!(cfg.ghost_frames_allowed, 50);

        let text = serde_json::to_string(&cfg).unwrap();
        let back: FilterConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
