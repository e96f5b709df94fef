//! 3x3 planar homography and DLT estimation with Hartley normalisation.

use crate::geometry::FitError;
use nalgebra::{DMatrix, Matrix3, Vector3};

/// Projective mapping of 2D points, `dst ~ H * [x, y, 1]^T`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    /// Identity mapping.
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    /// Wraps a raw matrix.
    pub fn from_matrix(m: Matrix3<f64>) -> Self {
        Self { m }
    }

    /// Pure translation.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::from_matrix(Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0))
    }

    /// Axis-aligned scaling about the origin.
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::from_matrix(Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0))
    }

    /// Returns the underlying matrix.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    /// Row-major copy of the matrix.
    pub fn to_array(&self) -> [[f64; 3]; 3] {
        let m = &self.m;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    /// Maps a point; `None` if it lands on the line at infinity.
    pub fn project(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        let p = self.m * Vector3::new(x, y, 1.0);
        if p[2].abs() < 1e-12 {
            return None;
        }
        Some([p[0] / p[2], p[1] / p[2]])
    }

    /// Distance between the projection of `src` and `dst`.
    pub fn reprojection_error(&self, src: [f64; 2], dst: [f64; 2]) -> f64 {
        match self.project(src[0], src[1]) {
            Some(p) => ((p[0] - dst[0]).powi(2) + (p[1] - dst[1]).powi(2)).sqrt(),
            None => f64::INFINITY,
        }
    }

    /// Inverse mapping, if the matrix is invertible.
    pub fn inverse(&self) -> Option<Self> {
        if self.m.determinant().abs() < 1e-12 {
            return None;
        }
        self.m.try_inverse().map(Self::from_matrix)
    }

    /// Applies `first`, then `self`.
    pub fn after(&self, first: &Homography) -> Self {
        Self::from_matrix(self.m * first.m)
    }

    /// Returns true when every entry is finite and the matrix is invertible.
    pub fn is_usable(&self) -> bool {
        self.m.iter().all(|v| v.is_finite()) && self.m.determinant().abs() > 1e-12
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

/// Translates the centroid to the origin and scales the mean distance to sqrt(2).
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();
    (t, normalized)
}

/// Estimates the homography mapping `src` onto `dst` from at least 4 pairs.
///
/// The solution is the eigenvector of `A^T A` with the smallest eigenvalue,
/// computed on normalised coordinates and then denormalised.
pub fn estimate_homography_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Homography, FitError> {
    let n = src.len().min(dst.len());
    if n < 4 {
        return Err(FitError::TooFewPoints { needed: 4, got: n });
    }
    if src.len() != dst.len() {
        return Err(FitError::Degenerate);
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let [sx, sy] = src_n[i];
        let [dx, dy] = dst_n[i];

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);
    let (min_idx, _) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|(_, x), (_, y)| x.abs().total_cmp(&y.abs()))
        .ok_or(FitError::Degenerate)?;
    let h = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst.try_inverse().ok_or(FitError::Degenerate)?;
    let m = t_dst_inv * h_norm * t_src;
    let scale = m[(2, 2)];
    let m = if scale.abs() > 1e-12 { m / scale } else { m };

    let out = Homography::from_matrix(m);
    if !out.is_usable() {
        return Err(FitError::Degenerate);
    }
    Ok(out)
}
