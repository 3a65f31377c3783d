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

//! Defines the `LinearRgba` color type and associated operations.

use crate::math::vector::Vec3;
use std::ops::{Add, Mul};

/// Rec. 709 luminance weights for linear RGB.
pub const LUMINANCE_WEIGHTS: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// Represents a color in a **linear RGBA** color space using `f32` components.
///
/// This is the texel type of every HDR surface the renderer works with. Component
/// values may exceed `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct LinearRgba {
    /// The red component in linear space.
    pub r: f32,
    /// The green component in linear space.
    pub g: f32,
    /// The blue component in linear space.
    pub b: f32,
    /// The alpha (opacity) component.
    pub a: f32,
}

impl LinearRgba {
    /// Opaque white (`[1.0, 1.0, 1.0, 1.0]`).
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black (`[0.0, 0.0, 0.0, 1.0]`).
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Fully transparent black (`[0.0, 0.0, 0.0, 0.0]`).
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a new `LinearRgba` with explicit RGBA values.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a new opaque `LinearRgba` (alpha = 1.0).
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Creates an opaque grey with all three channels set to `value`.
    #[inline]
    pub const fn splat(value: f32) -> Self {
        Self::rgb(value, value, value)
    }

    /// Returns the Rec. 709 luminance of the RGB channels.
    #[inline]
    pub fn luminance(&self) -> f32 {
        Vec3::new(self.r, self.g, self.b).dot(LUMINANCE_WEIGHTS)
    }

    /// Creates a `LinearRgba` from sRGB-encoded components. Alpha stays 1.0.
    #[inline]
    pub fn from_srgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgb(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b))
    }

    /// Converts this linear color to sRGB-encoded components. Alpha is not touched.
    #[inline]
    pub fn to_srgb(&self) -> Self {
        Self::new(
            linear_to_srgb(self.r),
            linear_to_srgb(self.g),
            linear_to_srgb(self.b),
            self.a,
        )
    }
}

/// Converts an sRGB component to linear space.
#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Converts a linear component to sRGB space.
#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

impl Default for LinearRgba {
    /// Returns opaque black.
    fn default() -> Self {
        Self::BLACK
    }
}

impl Add for LinearRgba {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl Mul<f32> for LinearRgba {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32) -> Self::Output {
        Self::new(self.r * scalar, self.g * scalar, self.b * scalar, self.a * scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    #[test]
    fn test_luminance_weights_sum_to_one() {
        assert!(approx_eq(LinearRgba::WHITE.luminance(), 1.0));
        assert!(approx_eq(LinearRgba::splat(4.0).luminance(), 4.0));
        assert!(approx_eq(LinearRgba::rgb(0.0, 1.0, 0.0).luminance(), 0.7152));
    }

    #[test]
    fn test_from_srgb_and_to_srgb() {
        let c = LinearRgba::from_srgb(0.5, 0.2, 0.8);
        let back = c.to_srgb();
        assert!((back.r - 0.5).abs() < 1e-4);
        assert!((back.g - 0.2).abs() < 1e-4);
        assert!((back.b - 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_weighted_sum() {
        let c = LinearRgba::rgb(1.0, 0.0, 0.0) * 0.5 + LinearRgba::rgb(0.0, 0.0, 1.0) * 0.5;
        assert_eq!(c, LinearRgba::new(0.5, 0.0, 0.5, 1.0));
    }
}
