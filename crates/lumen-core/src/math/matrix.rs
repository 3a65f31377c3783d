// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Provides the column-major 4x4 matrix used for camera transforms.

use super::vector::{Vec3, Vec4};
use super::EPSILON;
use std::ops::Mul;

/// A 4x4 column-major matrix.
///
/// Used for camera view and projection matrices. The memory layout is
/// column-major (`cols[0]` is the first column), matching WGSL's `mat4x4<f32>`,
/// so the matrix can be uploaded to a uniform buffer as-is.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Returns a row of the matrix as a `Vec4`.
    #[inline]
    pub fn get_row(&self, index: usize) -> Vec4 {
        Vec4::new(
            self.cols[0].get(index),
            self.cols[1].get(index),
            self.cols[2].get(index),
            self.cols[3].get(index),
        )
    }

    /// Creates a left-handed perspective projection matrix with a [0, 1] depth range.
    ///
    /// # Arguments
    ///
    /// * `fov_y_radians`: Vertical field of view in radians.
    /// * `aspect_ratio`: Width divided by height of the viewport.
    /// * `z_near`: Distance to the near clipping plane (must be positive).
    /// * `z_far`: Distance to the far clipping plane (must be greater than `z_near`).
    #[inline]
    pub fn perspective_lh_zo(fov_y_radians: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        debug_assert!(z_near > 0.0 && z_far > z_near);
        let h = 1.0 / (fov_y_radians * 0.5).tan();
        let w = h / aspect_ratio;
        let range = z_far / (z_far - z_near);

        Self::from_cols(
            Vec4::new(w, 0.0, 0.0, 0.0),
            Vec4::new(0.0, h, 0.0, 0.0),
            Vec4::new(0.0, 0.0, range, 1.0),
            Vec4::new(0.0, 0.0, -range * z_near, 0.0),
        )
    }

    /// Creates a left-handed view matrix for a camera at `eye` looking along `direction`.
    ///
    /// View space has `+X` to the right, `+Y` up and `+Z` forward.
    ///
    /// # Returns
    ///
    /// `None` if `direction` is degenerate or parallel to `up`.
    #[inline]
    pub fn look_to_lh(eye: Vec3, direction: Vec3, up: Vec3) -> Option<Self> {
        if direction.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let f = direction.normalize();
        let s = up.cross(f);
        if s.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let s = s.normalize();
        let u = f.cross(s);

        Some(Self::from_cols(
            Vec4::new(s.x, u.x, f.x, 0.0),
            Vec4::new(s.y, u.y, f.y, 0.0),
            Vec4::new(s.z, u.z, f.z, 0.0),
            Vec4::new(-eye.dot(s), -eye.dot(u), -eye.dot(f), 1.0),
        ))
    }

    /// Returns the transpose of the matrix, where rows and columns are swapped.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.get_row(0), self.get_row(1), self.get_row(2), self.get_row(3))
    }

    /// Computes the inverse of the matrix by Gauss-Jordan elimination with
    /// partial pivoting.
    ///
    /// Returns `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        // Row-major working copies: `a[r][c]`.
        let mut a = [[0.0f32; 4]; 4];
        let mut inv = [[0.0f32; 4]; 4];
        for r in 0..4 {
            for c in 0..4 {
                a[r][c] = self.cols[c].get(r);
            }
            inv[r][r] = 1.0;
        }

        for col in 0..4 {
            let pivot = (col..4)
                .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
                .unwrap_or(col);
            if a[pivot][col].abs() < f32::EPSILON {
                return None;
            }
            a.swap(col, pivot);
            inv.swap(col, pivot);

            let scale = 1.0 / a[col][col];
            for c in 0..4 {
                a[col][c] *= scale;
                inv[col][c] *= scale;
            }

            for r in 0..4 {
                if r == col {
                    continue;
                }
                let factor = a[r][col];
                if factor != 0.0 {
                    for c in 0..4 {
                        a[r][c] -= factor * a[col][c];
                        inv[r][c] -= factor * inv[col][c];
                    }
                }
            }
        }

        let col = |c: usize| Vec4::new(inv[0][c], inv[1][c], inv[2][c], inv[3][c]);
        Some(Self::from_cols(col(0), col(1), col(2), col(3)))
    }

    /// Transforms a point, performing the perspective divide.
    #[inline]
    pub fn project_point3(&self, point: Vec3) -> Vec3 {
        let clip = *self * Vec4::from_vec3(point, 1.0);
        if clip.w.abs() > EPSILON {
            clip.truncate() / clip.w
        } else {
            clip.truncate()
        }
    }

    /// Returns the matrix as a column-major 2D array, the layout expected by uniform buffers.
    #[inline]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.cols.map(|c| [c.x, c.y, c.z, c.w])
    }
}

impl Default for Mat4 {
    /// Returns the 4x4 identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    /// Multiplies this matrix by another `Mat4`. Note that matrix multiplication is not commutative.
    #[inline]
    fn mul(self, rhs: Mat4) -> Self::Output {
        Mat4 {
            cols: rhs.cols.map(|col| self * col),
        }
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    /// Transforms a `Vec4` by this matrix.
    #[inline]
    fn mul(self, rhs: Vec4) -> Self::Output {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq, FRAC_PI_2};

    fn vec3_approx_eq(a: Vec3, b: Vec3) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4 && (a.z - b.z).abs() < 1e-4
    }

    fn mat4_approx_eq(a: Mat4, b: Mat4) -> bool {
        (0..4).all(|c| (0..4).all(|r| (a.cols[c].get(r) - b.cols[c].get(r)).abs() < 1e-4))
    }

    #[test]
    fn test_identity_multiplication() {
        let m = Mat4::perspective_lh_zo(FRAC_PI_2, 1.5, 0.1, 100.0);
        assert_eq!(m * Mat4::IDENTITY, m);
        assert_eq!(Mat4::IDENTITY * m, m);
    }

    #[test]
    fn test_look_to_lh_maps_forward_to_positive_z() {
        let view = Mat4::look_to_lh(Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
        let p = view.project_point3(Vec3::new(5.0, 0.0, 0.0));
        assert!(vec3_approx_eq(p, Vec3::new(0.0, 0.0, 5.0)));
        // Right of a camera looking down +X with +Y up is -Z.
        let r = view.project_point3(Vec3::new(0.0, 0.0, -1.0));
        assert!(vec3_approx_eq(r, Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_look_to_lh_rejects_degenerate_input() {
        assert!(Mat4::look_to_lh(Vec3::ZERO, Vec3::ZERO, Vec3::Y).is_none());
        assert!(Mat4::look_to_lh(Vec3::ZERO, Vec3::Y, Vec3::Y).is_none());
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Mat4::perspective_lh_zo(FRAC_PI_2, 1.0, 0.1, 100.0);
        let near = proj.project_point3(Vec3::new(0.0, 0.0, 0.1));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, 100.0));
        assert!(approx_eq(near.z, 0.0));
        assert!((far.z - 1.0).abs() < 1e-4);
        // A 90 degree frustum maps the 45 degree edge onto the NDC border.
        let edge = proj.project_point3(Vec3::new(1.0, 1.0, 1.0));
        assert!(approx_eq(edge.x, 1.0) && approx_eq(edge.y, 1.0));
    }

    #[test]
    fn test_inverse_of_view_projection() {
        let view = Mat4::look_to_lh(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.3, -0.2, 1.0), Vec3::Y)
            .unwrap();
        let proj = Mat4::perspective_lh_zo(FRAC_PI_2, 16.0 / 9.0, 0.01, 10_000.0);
        let view_proj = proj * view;
        let inverse = view_proj.inverse().unwrap();
        assert!(mat4_approx_eq(view_proj * inverse, Mat4::IDENTITY));
    }

    #[test]
    fn test_inverse_of_singular_matrix() {
        let singular = Mat4::from_cols(Vec4::X, Vec4::X, Vec4::Z, Vec4::W);
        assert!(singular.inverse().is_none());
    }

    #[test]
    fn test_transpose_and_cols_array() {
        let m = Mat4::from_cols(
            Vec4::new(1.0, 2.0, 3.0, 4.0),
            Vec4::new(5.0, 6.0, 7.0, 8.0),
            Vec4::new(9.0, 10.0, 11.0, 12.0),
            Vec4::new(13.0, 14.0, 15.0, 16.0),
        );
        assert_eq!(m.transpose().cols[0], Vec4::new(1.0, 5.0, 9.0, 13.0));
        assert_eq!(m.to_cols_array_2d()[1], [5.0, 6.0, 7.0, 8.0]);
    }
}
