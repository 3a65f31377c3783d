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

use approx::assert_relative_eq;
use lumen_core::math::{Extent2D, LinearRgba, Vec3};
use lumen_core::renderer::resource::{GpuTexture, ResourcePool, TextureSpec};
use lumen_core::renderer::{equirect_direction, GraphicsDevice, TextureFormat};
use lumen_infra::SoftwareDevice;
use lumen_lanes::{CubemapPolicy, CubemapProjectionLane, LaneError, CUBE_FACE_BASES};
use std::sync::Arc;

const FACE_SIZE: u32 = 9;

fn setup(policy: CubemapPolicy) -> (SoftwareDevice, ResourcePool, CubemapProjectionLane) {
    let software = SoftwareDevice::new();
    let device: Arc<dyn GraphicsDevice> = Arc::new(software.clone());
    let lane = CubemapProjectionLane::new(device.clone(), policy).unwrap();
    (software, ResourcePool::new(device), lane)
}

/// Color encodes direction: `(d + 1) / 2`.
fn direction_color(d: Vec3) -> LinearRgba {
    LinearRgba::rgb((d.x + 1.0) * 0.5, (d.y + 1.0) * 0.5, (d.z + 1.0) * 0.5)
}

fn direction_panorama(pool: &ResourcePool) -> GpuTexture {
    let (width, height) = (128u32, 64u32);
    let texels: Vec<LinearRgba> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| {
            let u = (x as f32 + 0.5) / width as f32;
            let v = (y as f32 + 0.5) / height as f32;
            direction_color(equirect_direction(u, v))
        })
        .collect();
    pool.upload_texture(
        &TextureSpec::sampled("sky", Extent2D::new(width, height), TextureFormat::Rgba16Float),
        &texels,
    )
    .unwrap()
}

fn texel(face: &[LinearRgba], x: u32, y: u32) -> LinearRgba {
    face[(y * FACE_SIZE + x) as usize]
}

#[test]
fn test_face_centres_look_along_face_axes() {
    let (software, pool, mut lane) = setup(CubemapPolicy::RebuildEveryFrame);
    let panorama = direction_panorama(&pool);
    let cube = lane.project(&panorama, FACE_SIZE).unwrap();
    assert_eq!(cube.extent(), Extent2D::new(FACE_SIZE, FACE_SIZE));
    assert_eq!(cube.render_target_count(), 6);

    for (face, (direction, _)) in CUBE_FACE_BASES.iter().enumerate() {
        let texels = software.read_texture_layer(cube.id(), face as u32).unwrap();
        let centre = texel(&texels, FACE_SIZE / 2, FACE_SIZE / 2);
        let expected = direction_color(*direction);
        assert_relative_eq!(centre.r, expected.r, epsilon = 0.05);
        assert_relative_eq!(centre.g, expected.g, epsilon = 0.05);
        assert_relative_eq!(centre.b, expected.b, epsilon = 0.05);
    }
}

#[test]
fn test_face_edges_follow_right_and_up_vectors() {
    let (software, pool, mut lane) = setup(CubemapPolicy::RebuildEveryFrame);
    let panorama = direction_panorama(&pool);
    let cube_id = lane.project(&panorama, FACE_SIZE).unwrap().id();

    // +X face: right is -Z, up is +Y.
    let pos_x = software.read_texture_layer(cube_id, 0).unwrap();
    assert!(texel(&pos_x, FACE_SIZE - 1, FACE_SIZE / 2).b < 0.3);
    assert!(texel(&pos_x, 0, FACE_SIZE / 2).b > 0.7);
    assert!(texel(&pos_x, FACE_SIZE / 2, 0).g > 0.7);

    // +Y face: right is +X, up is -Z.
    let pos_y = software.read_texture_layer(cube_id, 2).unwrap();
    assert!(texel(&pos_y, FACE_SIZE - 1, FACE_SIZE / 2).r > 0.7);
    assert!(texel(&pos_y, FACE_SIZE / 2, 0).b < 0.3);
    assert!(texel(&pos_y, FACE_SIZE / 2, FACE_SIZE - 1).b > 0.7);
}

#[test]
fn test_build_once_reuses_cube_for_same_panorama_and_size() {
    let (_software, pool, mut lane) = setup(CubemapPolicy::BuildOnce);
    let panorama = direction_panorama(&pool);
    let first = lane.project(&panorama, FACE_SIZE).unwrap().id();
    let second = lane.project(&panorama, FACE_SIZE).unwrap().id();
    assert_eq!(first, second);
    assert_eq!(lane.build_count(), 1);

    let resized = lane.project(&panorama, 5).unwrap().id();
    assert_ne!(resized, first);
    assert_eq!(lane.build_count(), 2);

    let other = direction_panorama(&pool);
    lane.project(&other, 5).unwrap();
    assert_eq!(lane.build_count(), 3);
}

#[test]
fn test_rebuild_every_frame_replaces_cube_without_growth() {
    let (software, pool, mut lane) = setup(CubemapPolicy::RebuildEveryFrame);
    let panorama = direction_panorama(&pool);
    lane.project(&panorama, FACE_SIZE).unwrap();
    let live = software.stats().live_textures;
    for _ in 0..3 {
        lane.project(&panorama, FACE_SIZE).unwrap();
        assert_eq!(software.stats().live_textures, live);
    }
    assert_eq!(lane.build_count(), 4);
}

#[test]
fn test_failed_build_keeps_previous_cube() {
    let (software, pool, mut lane) = setup(CubemapPolicy::RebuildEveryFrame);
    let panorama = direction_panorama(&pool);
    let previous = lane.project(&panorama, FACE_SIZE).unwrap().id();

    software.fail_texture_creation_after(0);
    assert!(matches!(
        lane.project(&panorama, FACE_SIZE),
        Err(LaneError::Resource(_))
    ));
    assert_eq!(lane.cubemap().map(|c| c.id()), Some(previous));
    assert_eq!(lane.build_count(), 1);
}

#[test]
fn test_zero_face_size_is_rejected() {
    let (_software, pool, mut lane) = setup(CubemapPolicy::BuildOnce);
    let panorama = direction_panorama(&pool);
    assert!(matches!(
        lane.project(&panorama, 0),
        Err(LaneError::EmptySource { .. })
    ));
    assert!(lane.cubemap().is_none());
}
