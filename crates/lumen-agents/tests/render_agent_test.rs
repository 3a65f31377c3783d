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
use lumen_agents::{
    CameraInput, CubemapSettings, ExposureSettings, RenderAgent, RenderSettings, SkyboxUnit,
    SolidColorUnit,
};
use lumen_core::math::{Extent2D, LinearRgba, Vec3};
use lumen_core::renderer::api::util::texel;
use lumen_core::renderer::resource::{GpuTexture, ResourcePool, TextureSpec};
use lumen_core::renderer::{tone_map, GraphicsDevice, RenderError, TextureFormat};
use lumen_infra::{NullPresenter, ReadbackPresenter, SoftwareDevice};
use lumen_lanes::CubemapPolicy;
use std::io::Write;
use std::sync::Arc;

fn small_settings(width: u32, height: u32) -> RenderSettings {
    RenderSettings {
        width,
        height,
        ..RenderSettings::default()
    }
}

fn agent(settings: RenderSettings) -> (SoftwareDevice, RenderAgent<NullPresenter>) {
    let software = SoftwareDevice::new();
    let device: Arc<dyn GraphicsDevice> = Arc::new(software.clone());
    let agent = RenderAgent::new(device, NullPresenter::new(), settings).unwrap();
    (software, agent)
}

fn grey_panorama(device: &Arc<dyn GraphicsDevice>, value: f32) -> GpuTexture {
    let pool = ResourcePool::new(device.clone());
    let extent = Extent2D::new(64, 32);
    let texels = vec![LinearRgba::splat(value); extent.area() as usize];
    pool.upload_texture(
        &TextureSpec::sampled("grey sky", extent, TextureFormat::Rgba16Float),
        &texels,
    )
    .unwrap()
}

#[test]
fn test_first_frame_measures_scene_and_initializes_filter() {
    let (_, mut agent) = agent(small_settings(16, 16));
    agent
        .add_unit(Box::new(SolidColorUnit::full_screen(LinearRgba::splat(0.5))))
        .unwrap();

    let report = agent.render_frame_with_delta(0.0).unwrap();
    assert_eq!(report.frame_index, 0);
    let measured = report.measured_luminance.unwrap();
    assert_relative_eq!(measured, 0.5, max_relative = 1e-3);
    assert_eq!(report.adapted_luminance, Some(measured));
    assert_relative_eq!(report.exposure, 0.18 / measured, max_relative = 1e-5);
    assert_eq!(agent.frame_count(), 1);
}

#[test]
fn test_exposure_is_one_before_any_measurement() {
    let (_, agent) = agent(small_settings(8, 8));
    assert_eq!(agent.exposure_filter().current(), None);
    assert_eq!(agent.exposure_filter().exposure(0.18, 1e-4), 1.0);
}

#[test]
fn test_adapted_luminance_moves_monotonically_toward_new_scene() {
    let (_, mut agent) = agent(small_settings(8, 8));
    agent.set_clear_color(LinearRgba::splat(0.5));
    agent.render_frame_with_delta(0.0).unwrap();

    agent.set_clear_color(LinearRgba::splat(2.0));
    let mut previous = agent.exposure_filter().current().unwrap();
    let mut previous_exposure = agent.exposure_filter().exposure(0.18, 1e-4);
    for _ in 0..20 {
        let report = agent.render_frame_with_delta(0.1).unwrap();
        let adapted = report.adapted_luminance.unwrap();
        assert!(adapted > previous, "{adapted} <= {previous}");
        assert!(adapted < 2.0);
        assert!(report.exposure < previous_exposure);
        previous = adapted;
        previous_exposure = report.exposure;
    }
}

#[test]
fn test_instant_adaptation_follows_the_scene() {
    let settings = RenderSettings {
        exposure: ExposureSettings {
            adaptation_time_secs: 0.0,
            ..ExposureSettings::default()
        },
        ..small_settings(8, 8)
    };
    let (_, mut agent) = agent(settings);
    agent.set_clear_color(LinearRgba::splat(0.5));
    agent.render_frame_with_delta(0.016).unwrap();
    agent.set_clear_color(LinearRgba::splat(2.0));
    let report = agent.render_frame_with_delta(0.016).unwrap();
    assert_eq!(report.adapted_luminance, report.measured_luminance);
}

#[test]
fn test_failed_measurement_keeps_previous_exposure() {
    let (software, mut agent) = agent(small_settings(16, 16));
    agent.set_clear_color(LinearRgba::splat(0.5));
    let first = agent.render_frame_with_delta(0.0).unwrap();
    let live = software.stats().live_textures;

    // The third texture of the next measurement is a mid-pyramid level.
    agent.set_clear_color(LinearRgba::splat(4.0));
    software.fail_texture_creation_after(2);
    let degraded = agent.render_frame_with_delta(0.1).unwrap();
    assert_eq!(degraded.frame_index, 1);
    assert_eq!(degraded.measured_luminance, None);
    assert_eq!(degraded.adapted_luminance, first.adapted_luminance);
    assert_eq!(degraded.exposure, first.exposure);
    assert_eq!(software.stats().live_textures, live);

    let recovered = agent.render_frame_with_delta(0.1).unwrap();
    assert!(recovered.measured_luminance.unwrap() > 3.9);
    assert!(recovered.exposure < first.exposure);
}

fn grey_frame(device: &Arc<dyn GraphicsDevice>, value: f32) -> GpuTexture {
    let pool = ResourcePool::new(device.clone());
    let extent = Extent2D::new(8, 8);
    let texels = vec![LinearRgba::splat(value); extent.area() as usize];
    pool.upload_texture(
        &TextureSpec::sampled("grey frame", extent, TextureFormat::Rgba32Float),
        &texels,
    )
    .unwrap()
}

#[test]
fn test_compute_exposure_measures_given_target() {
    let (software, mut agent) = agent(small_settings(4, 4));
    let frame = grey_frame(agent.device(), 0.5);

    let adapted = agent.compute_exposure(&frame, 0.0);
    assert_relative_eq!(adapted, 0.5, max_relative = 1e-3);
    assert_eq!(agent.frame_count(), 0);

    software.fail_texture_creation_after(0);
    assert_eq!(agent.compute_exposure(&frame, 1.0), adapted);
}

#[test]
fn test_compute_exposure_before_any_measurement_returns_key_value() {
    let (software, mut agent) = agent(small_settings(4, 4));
    let frame = grey_frame(agent.device(), 0.5);

    software.fail_texture_creation_after(0);
    let adapted = agent.compute_exposure(&frame, 0.016);
    assert_eq!(adapted, agent.settings().exposure.key_value);
    assert!(agent.exposure_filter().current().is_none());
}

#[test]
fn test_frames_do_not_leak_textures() {
    let (software, mut agent) = agent(small_settings(12, 20));
    agent
        .add_unit(Box::new(SolidColorUnit::rect(
            LinearRgba::rgb(3.0, 2.0, 1.0),
            -0.5,
            0.5,
            -0.5,
            0.5,
        )))
        .unwrap();
    agent.render_frame_with_delta(0.0).unwrap();
    let live = software.stats().live_textures;
    for _ in 0..3 {
        agent.render_frame_with_delta(0.016).unwrap();
        assert_eq!(software.stats().live_textures, live);
    }
}

#[test]
fn test_environment_cube_is_built_once_and_drawn_by_skybox() {
    let settings = RenderSettings {
        cubemap: CubemapSettings {
            face_size: 8,
            policy: CubemapPolicy::BuildOnce,
        },
        ..small_settings(16, 16)
    };
    let (_, mut agent) = agent(settings);
    agent.add_unit(Box::new(SkyboxUnit::new())).unwrap();
    assert!(agent.environment_cubemap().is_none());

    let panorama = grey_panorama(agent.device(), 0.25);
    agent.set_environment(panorama);
    let cube = agent.build_environment_cubemap().unwrap();
    assert_eq!(cube.extent(), Extent2D::new(8, 8));
    assert_eq!(agent.cubemap_build_count(), 1);

    for _ in 0..3 {
        let report = agent.render_frame_with_delta(0.016).unwrap();
        assert_relative_eq!(report.measured_luminance.unwrap(), 0.25, max_relative = 1e-2);
    }
    assert_eq!(agent.cubemap_build_count(), 1);

    agent.build_environment_cubemap().unwrap();
    assert_eq!(agent.cubemap_build_count(), 1);
}

#[test]
fn test_environment_rebuilds_every_frame_by_default() {
    let (_, mut agent) = agent(small_settings(8, 8));
    let panorama = grey_panorama(agent.device(), 1.0);
    agent.set_environment(panorama);
    for _ in 0..3 {
        agent.render_frame_with_delta(0.016).unwrap();
    }
    assert_eq!(agent.cubemap_build_count(), 3);

    agent.clear_environment();
    agent.render_frame_with_delta(0.016).unwrap();
    assert!(agent.environment_cubemap().is_none());
}

#[test]
fn test_build_without_panorama_fails() {
    let (_, mut agent) = agent(small_settings(8, 8));
    assert!(matches!(
        agent.build_environment_cubemap(),
        Err(RenderError::RenderingFailed(_))
    ));
}

#[test]
fn test_resize_recreates_targets_and_camera_aspect() {
    let (_, mut agent) = agent(small_settings(16, 16));
    agent.set_clear_color(LinearRgba::splat(1.0));

    agent.resize(32, 8).unwrap();
    assert_eq!(agent.output().extent(), Extent2D::new(32, 8));
    assert_eq!(agent.hdr_target().extent(), Extent2D::new(32, 8));
    assert_eq!(agent.settings().extent(), Extent2D::new(32, 8));
    assert_relative_eq!(agent.camera().aspect_ratio, 4.0);

    agent.resize(0, 10).unwrap();
    assert_eq!(agent.output().extent(), Extent2D::new(32, 8));

    let report = agent.render_frame_with_delta(0.0).unwrap();
    assert_relative_eq!(report.measured_luminance.unwrap(), 1.0, max_relative = 1e-3);
}

#[test]
fn test_camera_input_applies_at_next_frame() {
    let (_, mut agent) = agent(small_settings(8, 8));
    let (yaw, pitch) = agent.camera().angles();

    agent.queue_camera_input(CameraInput::Move(Vec3::new(1.0, 0.0, -2.0)));
    agent.queue_camera_input(CameraInput::Rotate {
        yaw_degrees: 10.0,
        pitch_degrees: -5.0,
    });
    assert_eq!(agent.camera().position, Vec3::ZERO);

    agent.render_frame_with_delta(0.0).unwrap();
    assert_eq!(agent.camera().position, Vec3::new(1.0, 0.0, -2.0));
    let (new_yaw, new_pitch) = agent.camera().angles();
    assert_relative_eq!(new_yaw, yaw + 10.0, epsilon = 1e-4);
    assert_relative_eq!(new_pitch, pitch - 5.0, epsilon = 1e-4);
}

#[test]
fn test_invalid_settings_are_rejected() {
    let software = SoftwareDevice::new();
    let device: Arc<dyn GraphicsDevice> = Arc::new(software);
    let result = RenderAgent::new(device, NullPresenter::new(), small_settings(0, 8));
    assert!(matches!(result, Err(RenderError::InitializationFailed(_))));
}

#[test]
fn test_presenter_receives_tone_mapped_frame() {
    let software = SoftwareDevice::new();
    let device: Arc<dyn GraphicsDevice> = Arc::new(software);
    let presenter = ReadbackPresenter::new(device.clone());
    let mut agent = RenderAgent::new(device, presenter, small_settings(4, 4)).unwrap();
    let color = LinearRgba::splat(0.5);
    agent
        .add_unit(Box::new(SolidColorUnit::full_screen(color)))
        .unwrap();

    agent.render_frame_with_delta(0.0).unwrap();
    assert!(agent.presenter_mut().take_capture().is_none());

    agent.presenter_mut().capture_next();
    let report = agent.render_frame_with_delta(0.0).unwrap();
    assert_eq!(agent.presenter().frames_presented(), 2);
    let image = agent.presenter_mut().take_capture().unwrap();
    assert_eq!((image.width(), image.height()), (4, 4));

    let stored = texel::quantize(TextureFormat::Rgba16Float, color);
    let expected = tone_map(stored, report.exposure);
    let pixel = image.get_pixel(2, 1).0;
    for (channel, value) in [expected.r, expected.g, expected.b].into_iter().enumerate() {
        let want = i32::from(texel::linear_to_srgb8(value));
        assert!((i32::from(pixel[channel]) - want).abs() <= 1, "{pixel:?} vs {want}");
    }
}

#[test]
fn test_agent_runs_from_settings_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "(width: 16, height: 8, exposure: (key_value: 0.36), cubemap: (face_size: 4))"
    )
    .unwrap();
    let settings = RenderSettings::load(file.path()).unwrap();
    assert_eq!(settings.extent(), Extent2D::new(16, 8));
    assert_eq!(settings.cubemap.policy, CubemapPolicy::RebuildEveryFrame);

    let (_, mut agent) = agent(settings);
    agent.set_clear_color(LinearRgba::splat(0.5));
    let report = agent.render_frame().unwrap();
    assert_relative_eq!(
        report.exposure,
        0.36 / report.measured_luminance.unwrap(),
        max_relative = 1e-5
    );
    assert_eq!(agent.output().extent(), Extent2D::new(16, 8));
}
