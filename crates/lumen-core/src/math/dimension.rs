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

//! Provides structs for representing extents (sizes) and origins (offsets) in 2D and 3D.
//!
//! These types use integer (`u32`) components, making them suitable for
//! pixel-based texture sizes and copy offsets.

use serde::{Deserialize, Serialize};

/// A two-dimensional extent, typically representing width and height.
///
/// This is commonly used for render target and viewport sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the larger of the two dimensions.
    #[inline]
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Returns the number of texels covered by this extent.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, or `1.0` for an empty extent.
    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// A three-dimensional extent, representing width, height, and depth.
///
/// This is used for texture arrays and cubemaps, where the third component
/// counts array layers (6 for a cube).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
    /// The depth or number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// Creates a new extent.
    #[inline]
    pub const fn new(width: u32, height: u32, depth_or_array_layers: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers,
        }
    }

    /// Drops the third component.
    #[inline]
    pub fn to_2d(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}

/// A three-dimensional origin, representing an (x, y, z) offset.
///
/// The `z` component selects the array layer for 2D array and cube textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// The x-coordinate of the origin.
    pub x: u32,
    /// The y-coordinate of the origin.
    pub y: u32,
    /// The z-coordinate or array layer of the origin.
    pub z: u32,
}

impl Origin3D {
    /// The origin at `(0, 0, 0)`.
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent2d_helpers() {
        let extent = Extent2D::new(300, 200);
        assert_eq!(extent.max_dimension(), 300);
        assert_eq!(extent.area(), 60_000);
        assert!(!extent.is_empty());
        assert!((extent.aspect_ratio() - 1.5).abs() < 1e-6);
        assert!(Extent2D::new(0, 4).is_empty());
        assert_eq!(Extent2D::default().aspect_ratio(), 1.0);
    }

    #[test]
    fn test_extent3d_to_2d() {
        assert_eq!(Extent3D::new(64, 64, 6).to_2d(), Extent2D::new(64, 64));
    }
}
