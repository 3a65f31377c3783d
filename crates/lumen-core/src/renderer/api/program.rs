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

//! Named shader programs, their uniform layouts and the formulas they share.
//!
//! Each program exists twice: as WGSL source compiled by GPU backends, and as a
//! CPU kernel in the reference backend. The functions in this module are the
//! single definition both sides follow, so that numeric tests on the reference
//! backend describe what the GPU computes.

use crate::math::{LinearRgba, Mat4, Vec3, Vec4, PI, TAU};

/// Identifies the program a shader module implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    /// Writes `ln(luminance + 1)` of an HDR color texture into a single channel.
    LogLuminance,
    /// Area-weighted average of the previous pyramid level. No logarithm.
    LuminanceReduce,
    /// Scales an HDR texture by the exposure and applies the filmic curve.
    ToneMap,
    /// Like `ToneMap`, but only keeps pixels brighter than a threshold.
    BrightPass,
    /// Samples an equirectangular panorama by per-pixel view direction.
    EquirectProjection,
    /// Samples a cube texture by per-pixel view direction.
    Skybox,
    /// Fills covered pixels with a uniform color.
    SolidColor,
    /// An application program. Only GPU backends can run these.
    Custom(&'static str),
}

impl ShaderProgram {
    /// A human-readable program name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogLuminance => "log_luminance",
            Self::LuminanceReduce => "luminance_reduce",
            Self::ToneMap => "tone_map",
            Self::BrightPass => "bright_pass",
            Self::EquirectProjection => "equirect_projection",
            Self::Skybox => "skybox",
            Self::SolidColor => "solid_color",
            Self::Custom(name) => name,
        }
    }
}

/// Per-level parameters of the luminance reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ReduceUniforms {
    /// Size of the level being read.
    pub src_size: [u32; 2],
    /// Size of the level being written.
    pub dst_size: [u32; 2],
}

/// Parameters of the tone-map and bright-pass programs.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ToneMapUniforms {
    /// Linear scale applied to the HDR color before the curve.
    pub exposure: f32,
    /// Exposed luminance below which the bright pass outputs black.
    pub bright_threshold: f32,
    /// Padding to 16 bytes.
    pub _pad: [f32; 2],
}

impl ToneMapUniforms {
    /// Creates the uniforms for an exposure and threshold.
    pub fn new(exposure: f32, bright_threshold: f32) -> Self {
        Self {
            exposure,
            bright_threshold,
            _pad: [0.0; 2],
        }
    }
}

/// The inverse view-projection used to reconstruct per-pixel view rays.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ViewRayUniforms {
    /// Column-major inverse of `projection * view`.
    pub inv_view_proj: [[f32; 4]; 4],
}

impl ViewRayUniforms {
    /// Builds the uniforms from a view-projection matrix.
    ///
    /// Returns `None` if the matrix is singular.
    pub fn from_view_proj(view_proj: Mat4) -> Option<Self> {
        view_proj.inverse().map(|inv| Self {
            inv_view_proj: inv.to_cols_array_2d(),
        })
    }

    /// The inverse view-projection as a matrix.
    pub fn inverse(&self) -> Mat4 {
        let [c0, c1, c2, c3] = self.inv_view_proj.map(|c| Vec4::new(c[0], c[1], c[2], c[3]));
        Mat4::from_cols(c0, c1, c2, c3)
    }
}

/// The color written by the solid-color program.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ColorUniforms {
    /// Linear RGBA color.
    pub color: [f32; 4],
}

impl From<LinearRgba> for ColorUniforms {
    fn from(c: LinearRgba) -> Self {
        Self {
            color: [c.r, c.g, c.b, c.a],
        }
    }
}

/// Encodes a luminance into the value stored by the log pass: `ln(l + 1)`.
///
/// The `+ 1` bias keeps black pixels finite.
#[inline]
pub fn encode_log_luminance(luminance: f32) -> f32 {
    (luminance.max(0.0) + 1.0).ln()
}

/// Inverse of [`encode_log_luminance`]: `exp(v) - 1`.
#[inline]
pub fn decode_log_luminance(value: f32) -> f32 {
    value.exp() - 1.0
}

/// The linear exposure scale mapping an adapted luminance to the key value.
#[inline]
pub fn exposure_for_luminance(adapted_luminance: f32, key_value: f32, min_luminance: f32) -> f32 {
    key_value / adapted_luminance.max(min_luminance)
}

const HABLE_A: f32 = 0.15;
const HABLE_B: f32 = 0.50;
const HABLE_C: f32 = 0.10;
const HABLE_D: f32 = 0.20;
const HABLE_E: f32 = 0.02;
const HABLE_F: f32 = 0.30;

/// Linear white point of the filmic curve.
pub const FILMIC_WHITE_POINT: f32 = 11.2;

#[inline]
fn hable(x: f32) -> f32 {
    ((x * (HABLE_A * x + HABLE_C * HABLE_B) + HABLE_D * HABLE_E)
        / (x * (HABLE_A * x + HABLE_B) + HABLE_D * HABLE_F))
        - HABLE_E / HABLE_F
}

/// The filmic tone curve applied to one exposed channel, normalized so that
/// [`FILMIC_WHITE_POINT`] maps to 1. Output is clamped to `[0, 1]`.
#[inline]
pub fn filmic_tone_curve(x: f32) -> f32 {
    (hable(x.max(0.0)) / hable(FILMIC_WHITE_POINT)).clamp(0.0, 1.0)
}

/// The complete tone-map program for one pixel.
pub fn tone_map(color: LinearRgba, exposure: f32) -> LinearRgba {
    let exposed = color * exposure;
    LinearRgba::rgb(
        filmic_tone_curve(exposed.r),
        filmic_tone_curve(exposed.g),
        filmic_tone_curve(exposed.b),
    )
}

/// The complete bright-pass program for one pixel.
pub fn bright_pass(color: LinearRgba, exposure: f32, threshold: f32) -> LinearRgba {
    if (color * exposure).luminance() > threshold {
        tone_map(color, exposure)
    } else {
        LinearRgba::BLACK
    }
}

/// The equirectangular texture coordinates of a direction.
///
/// `u = atan2(d.z, d.x) / 2π + ½`, `v = acos(d.y) / π`. `v = 0` is straight up.
pub fn equirect_uv(direction: Vec3) -> (f32, f32) {
    let d = direction.normalize();
    let u = d.z.atan2(d.x) / TAU + 0.5;
    let v = d.y.clamp(-1.0, 1.0).acos() / PI;
    (u, v)
}

/// Inverse of [`equirect_uv`].
pub fn equirect_direction(u: f32, v: f32) -> Vec3 {
    let phi = (u - 0.5) * TAU;
    let theta = v * PI;
    Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
}

/// Reconstructs the world-space view ray through a point in normalized device coordinates.
pub fn view_ray(inv_view_proj: &Mat4, ndc_x: f32, ndc_y: f32) -> Vec3 {
    let near = inv_view_proj.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
    let far = inv_view_proj.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
    (far - near).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::FRAC_PI_2;
    use approx::assert_relative_eq;

    #[test]
    fn test_log_luminance_pair_is_symmetric() {
        for l in [0.0, 1e-4, 0.18, 1.0, 42.0, 10_000.0] {
            assert_relative_eq!(
                decode_log_luminance(encode_log_luminance(l)),
                l,
                epsilon = 1e-3,
                max_relative = 1e-5
            );
        }
        assert_eq!(encode_log_luminance(0.0), 0.0);
    }

    #[test]
    fn test_filmic_curve_range() {
        assert!(filmic_tone_curve(0.0) < 1e-6);
        assert_relative_eq!(filmic_tone_curve(FILMIC_WHITE_POINT), 1.0, epsilon = 1e-6);
        assert_eq!(filmic_tone_curve(1000.0), 1.0);
        let mut previous = 0.0;
        for i in 1..100 {
            let y = filmic_tone_curve(i as f32 * 0.1);
            assert!(y > previous);
            previous = y;
        }
    }

    #[test]
    fn test_exposure_uses_floor() {
        assert_relative_eq!(exposure_for_luminance(0.36, 0.18, 1e-4), 0.5);
        assert_relative_eq!(exposure_for_luminance(0.0, 0.18, 1e-4), 1800.0, epsilon = 1e-2);
    }

    #[test]
    fn test_bright_pass_threshold() {
        let dim = LinearRgba::splat(0.5);
        let bright = LinearRgba::splat(4.0);
        assert_eq!(bright_pass(dim, 1.0, 1.0), LinearRgba::BLACK);
        assert_eq!(bright_pass(bright, 1.0, 1.0), tone_map(bright, 1.0));
    }

    #[test]
    fn test_equirect_poles_and_seam() {
        let (_, v) = equirect_uv(Vec3::Y);
        assert_relative_eq!(v, 0.0);
        let (_, v) = equirect_uv(-Vec3::Y);
        assert_relative_eq!(v, 1.0);
        let (u, v) = equirect_uv(Vec3::X);
        assert_relative_eq!(u, 0.5);
        assert_relative_eq!(v, 0.5);
        let (u, _) = equirect_uv(Vec3::Z);
        assert_relative_eq!(u, 0.75);
    }

    #[test]
    fn test_equirect_direction_inverts_uv() {
        for (u, v) in [(0.1, 0.3), (0.5, 0.5), (0.8, 0.9)] {
            let (u2, v2) = equirect_uv(equirect_direction(u, v));
            assert_relative_eq!(u2, u, epsilon = 1e-5);
            assert_relative_eq!(v2, v, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_view_ray_through_centre_is_forward() {
        let view = Mat4::look_to_lh(Vec3::ZERO, -Vec3::Z, Vec3::Y).unwrap();
        let proj = Mat4::perspective_lh_zo(FRAC_PI_2, 1.0, 0.1, 10.0);
        let uniforms = ViewRayUniforms::from_view_proj(proj * view).unwrap();
        let ray = view_ray(&uniforms.inverse(), 0.0, 0.0);
        assert_relative_eq!(ray.z, -1.0, epsilon = 1e-5);
        let corner = view_ray(&uniforms.inverse(), 1.0, 1.0);
        assert_relative_eq!(corner.y, corner.x.abs(), epsilon = 1e-5);
    }

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<ReduceUniforms>(), 16);
        assert_eq!(std::mem::size_of::<ToneMapUniforms>(), 16);
        assert_eq!(std::mem::size_of::<ViewRayUniforms>(), 64);
        assert_eq!(ShaderProgram::Skybox.name(), "skybox");
        assert_eq!(ShaderProgram::Custom("lit").name(), "lit");
    }
}
