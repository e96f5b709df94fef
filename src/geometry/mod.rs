//! Projective geometry: homographies and their robust estimation.

mod homography;
pub mod ransac;

pub use homography::{estimate_homography_dlt, Homography};
pub use ransac::{fit_homography_ransac, FitError, RansacConfig, RansacFit};
