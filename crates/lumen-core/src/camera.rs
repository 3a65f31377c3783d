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

//! A perspective camera with yaw/pitch controls.

use crate::math::{clamp, degrees_to_radians, Mat4, Vec3, FRAC_PI_2};

/// The largest pitch, in degrees, the fly controls will reach.
pub const MAX_PITCH_DEGREES: f32 = 89.0;

/// A left-handed perspective camera.
///
/// The camera is normally driven by yaw and pitch angles (in degrees), with `+Y`
/// as world up. Cameras built with [`Camera::from_basis`] instead keep the exact
/// orientation they were given until the first call to [`Camera::rotate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-space position of the eye.
    pub position: Vec3,
    /// The vertical field of view in radians.
    pub fov_y_radians: f32,
    /// The aspect ratio of the viewport (width / height).
    pub aspect_ratio: f32,
    /// The distance to the near clipping plane.
    pub z_near: f32,
    /// The distance to the far clipping plane.
    pub z_far: f32,
    yaw: f32,
    pitch: f32,
    forward: Vec3,
    up: Vec3,
}

impl Camera {
    /// Creates a camera at `position` with the default orientation (looking down `+Z`).
    pub fn new(position: Vec3, aspect_ratio: f32) -> Self {
        let mut camera = Self {
            position,
            fov_y_radians: FRAC_PI_2,
            aspect_ratio,
            z_near: 0.01,
            z_far: 10_000.0,
            yaw: 90.0,
            pitch: 0.0,
            forward: Vec3::Z,
            up: Vec3::Y,
        };
        camera.update_orientation();
        camera
    }

    /// Creates a camera from an explicit viewing direction and right vector.
    ///
    /// The up vector is `direction × right`. This is how the six cube face
    /// cameras are built.
    pub fn from_basis(
        position: Vec3,
        direction: Vec3,
        right: Vec3,
        fov_y_radians: f32,
        aspect_ratio: f32,
    ) -> Self {
        let forward = direction.normalize();
        Self {
            position,
            fov_y_radians,
            aspect_ratio,
            z_near: 0.1,
            z_far: 10.0,
            yaw: 90.0,
            pitch: 0.0,
            forward,
            up: forward.cross(right.normalize()),
        }
    }

    /// The normalized viewing direction.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// The camera's up vector.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// The normalized right vector, `up × forward`.
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.up.cross(self.forward).normalize()
    }

    /// Yaw and pitch in degrees.
    pub fn angles(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    /// Calculates the view matrix.
    ///
    /// Falls back to identity if the basis has collapsed, which the pitch clamp
    /// prevents for yaw/pitch-driven cameras.
    pub fn view(&self) -> Mat4 {
        Mat4::look_to_lh(self.position, self.forward, self.up).unwrap_or_else(|| {
            log::warn!("Camera basis is degenerate, using identity view");
            Mat4::IDENTITY
        })
    }

    /// Calculates the projection matrix (left-handed, `[0, 1]` depth).
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_lh_zo(self.fov_y_radians, self.aspect_ratio, self.z_near, self.z_far)
    }

    /// Returns `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Updates the aspect ratio. A zero height leaves the camera untouched.
    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }

    /// Moves the eye by `delta` in world space.
    pub fn move_by(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Adds `dx` to the yaw and `dy` to the pitch, both in degrees.
    ///
    /// Pitch is clamped to `±MAX_PITCH_DEGREES`.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx;
        self.pitch = clamp(self.pitch + dy, -MAX_PITCH_DEGREES, MAX_PITCH_DEGREES);
        self.update_orientation();
    }

    fn update_orientation(&mut self) {
        let yaw = degrees_to_radians(self.yaw);
        let pitch = degrees_to_radians(self.pitch);
        self.forward = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.up = Vec3::Y;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 16.0 / 9.0)
    }
}
