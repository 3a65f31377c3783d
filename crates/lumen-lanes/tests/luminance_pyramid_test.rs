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
use lumen_core::math::{Extent2D, LinearRgba};
use lumen_core::renderer::resource::{GpuTexture, ResourcePool, TextureAccess, TextureFaces, TextureSpec};
use lumen_core::renderer::{GraphicsDevice, ResourceError, TextureFormat};
use lumen_infra::{SoftwareDevice, WgpuDevice};
use lumen_lanes::{LaneError, LuminancePyramidLane};
use std::sync::Arc;

struct Fixture {
    software: SoftwareDevice,
    pool: ResourcePool,
    lane: LuminancePyramidLane,
}

fn fixture() -> Fixture {
    let software = SoftwareDevice::new();
    let device: Arc<dyn GraphicsDevice> = Arc::new(software.clone());
    let lane = LuminancePyramidLane::new(device.clone()).unwrap();
    Fixture {
        software,
        pool: ResourcePool::new(device),
        lane,
    }
}

fn hdr_frame(pool: &ResourcePool, width: u32, height: u32, texel: impl Fn(u32, u32) -> LinearRgba) -> GpuTexture {
    let texels: Vec<LinearRgba> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| texel(x, y))
        .collect();
    pool.upload_texture(
        &TextureSpec::sampled("hdr frame", Extent2D::new(width, height), TextureFormat::Rgba32Float),
        &texels,
    )
    .unwrap()
}

#[test]
fn test_uniform_frames_measure_their_luminance() {
    let f = fixture();
    for (width, height) in [(16, 16), (37, 23), (64, 8), (5, 40), (1, 1)] {
        let frame = hdr_frame(&f.pool, width, height, |_, _| LinearRgba::splat(0.5));
        let measurement = f.lane.measure(&frame).unwrap();
        assert_relative_eq!(measurement.luminance, 0.5, max_relative = 1e-4);
    }
}

#[test]
fn test_measurement_is_geometric_mean_of_biased_luminance() {
    let f = fixture();
    let frame = hdr_frame(&f.pool, 16, 16, |x, _| {
        if x < 8 {
            LinearRgba::BLACK
        } else {
            LinearRgba::splat(3.0)
        }
    });
    // exp((ln 1 + ln 4) / 2) - 1
    let measurement = f.lane.measure(&frame).unwrap();
    assert_relative_eq!(measurement.luminance, 1.0, max_relative = 1e-4);
}

#[test]
fn test_non_power_of_two_frames_give_exact_geometric_mean() {
    let f = fixture();
    // One column with log luminance 2, everything else black: mean log is 2 / W.
    let bright = 2.0f32.exp() - 1.0;
    for (width, height) in [(3, 1), (5, 3), (37, 23), (300, 200)] {
        let frame = hdr_frame(&f.pool, width, height, |x, _| {
            if x == width - 1 {
                LinearRgba::splat(bright)
            } else {
                LinearRgba::BLACK
            }
        });
        let expected = (2.0 / width as f32).exp() - 1.0;
        let measurement = f.lane.measure(&frame).unwrap();
        assert_relative_eq!(measurement.luminance, expected, max_relative = 1e-3);
    }
}

#[test]
fn test_wgpu_backend_matches_geometric_mean() {
    let wgpu = match WgpuDevice::headless() {
        Ok(device) => device,
        Err(e) => {
            eprintln!("skipping, no adapter: {e}");
            return;
        }
    };
    let device: Arc<dyn GraphicsDevice> = Arc::new(wgpu);
    let lane = LuminancePyramidLane::new(device.clone()).unwrap();
    let pool = ResourcePool::new(device);

    let bright = 2.0f32.exp() - 1.0;
    let texels: Vec<LinearRgba> = (0..3)
        .flat_map(|_| (0..5u32).map(|x| if x == 4 { LinearRgba::splat(bright) } else { LinearRgba::BLACK }))
        .collect();
    let frame = pool
        .upload_texture(
            &TextureSpec::sampled("hdr frame", Extent2D::new(5, 3), TextureFormat::Rgba16Float),
            &texels,
        )
        .unwrap();

    let measurement = lane.measure(&frame).unwrap();
    assert_relative_eq!(measurement.luminance, 0.4f32.exp() - 1.0, max_relative = 1e-2);
}

#[test]
fn test_luminance_uses_rec709_weights() {
    let f = fixture();
    let frame = hdr_frame(&f.pool, 4, 4, |_, _| LinearRgba::rgb(0.0, 1.0, 0.0));
    let measurement = f.lane.measure(&frame).unwrap();
    assert_relative_eq!(measurement.luminance, 0.7152, max_relative = 1e-4);
}

#[test]
fn test_pass_counts_follow_larger_side() {
    let f = fixture();
    let frame = hdr_frame(&f.pool, 300, 200, |_, _| LinearRgba::splat(1.0));
    let before = f.software.stats().render_passes;
    let measurement = f.lane.measure(&frame).unwrap();
    assert_eq!(measurement.reduction_passes, 10);
    // One log pass plus the reductions.
    assert_eq!(f.software.stats().render_passes - before, 11);

    let single = hdr_frame(&f.pool, 1, 1, |_, _| LinearRgba::splat(1.0));
    assert_eq!(f.lane.measure(&single).unwrap().reduction_passes, 1);
}

#[test]
fn test_pyramid_keeps_at_most_two_levels_alive_and_leaks_nothing() {
    let f = fixture();
    let frame = hdr_frame(&f.pool, 48, 48, |x, y| LinearRgba::splat((x + y) as f32 * 0.01));
    let baseline = f.software.stats();
    for _ in 0..3 {
        f.software.reset_peak();
        f.lane.measure(&frame).unwrap();
        let stats = f.software.stats();
        assert_eq!(stats.peak_textures, baseline.live_textures + 2);
        assert_eq!(stats.live_textures, baseline.live_textures);
        assert_eq!(stats.live_texture_views, baseline.live_texture_views);
        assert_eq!(stats.live_buffers, baseline.live_buffers);
        assert_eq!(stats.live_bind_groups, baseline.live_bind_groups);
    }
}

#[test]
fn test_failed_level_aborts_without_leaking() {
    let f = fixture();
    let frame = hdr_frame(&f.pool, 16, 16, |_, _| LinearRgba::splat(0.25));
    let baseline = f.software.stats();

    // Log image and level 4 succeed; level 3 fails.
    f.software.fail_texture_creation_after(2);
    let result = f.lane.measure(&frame);
    assert!(matches!(
        result,
        Err(LaneError::Resource(ResourceError::BackendError(_)))
    ));

    let stats = f.software.stats();
    assert_eq!(stats.live_textures, baseline.live_textures);
    assert_eq!(stats.live_texture_views, baseline.live_texture_views);
    assert_eq!(stats.live_buffers, baseline.live_buffers);
    assert_eq!(stats.live_bind_groups, baseline.live_bind_groups);

    let recovered = f.lane.measure(&frame).unwrap();
    assert_relative_eq!(recovered.luminance, 0.25, max_relative = 1e-4);
}

#[test]
fn test_unsampled_source_is_rejected() {
    let f = fixture();
    let spec = TextureSpec {
        label: "write only".to_string(),
        width: 4,
        height: 4,
        format: TextureFormat::Rgba16Float,
        faces: TextureFaces::Single,
        access: TextureAccess::RENDER_TARGET,
    };
    let texture = f.pool.create_texture(&spec).unwrap();
    assert!(matches!(
        f.lane.measure(&texture),
        Err(LaneError::NotSampled { .. })
    ));
}
