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

//! Cube face addressing in the layer order `+X, -X, +Y, -Y, +Z, -Z`.
//!
//! Face texel coordinates follow the WebGPU/D3D convention: `u` grows to the
//! right and `v` grows downwards when looking at the face from the cube centre.

use crate::math::Vec3;

/// Selects the face a direction hits and the `[0, 1]` coordinates on that face.
///
/// Returns `None` for the zero vector.
pub fn cube_face_uv(direction: Vec3) -> Option<(u32, f32, f32)> {
    let (ax, ay, az) = (direction.x.abs(), direction.y.abs(), direction.z.abs());
    let major = ax.max(ay).max(az);
    if major <= 0.0 {
        return None;
    }
    let Vec3 { x, y, z } = direction;
    let (face, sc, tc) = if ax >= ay && ax >= az {
        if x > 0.0 {
            (0, -z, -y)
        } else {
            (1, z, -y)
        }
    } else if ay >= az {
        if y > 0.0 {
            (2, x, z)
        } else {
            (3, x, -z)
        }
    } else if z > 0.0 {
        (4, x, -y)
    } else {
        (5, -x, -y)
    };
    Some((face, 0.5 * (sc / major + 1.0), 0.5 * (tc / major + 1.0)))
}
