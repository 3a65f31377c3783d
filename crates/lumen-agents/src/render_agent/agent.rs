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

//! Defines the RenderAgent, the frame orchestrator of the exposure pipeline.

use super::scene::{FrameContext, SceneUnit};
use super::settings::RenderSettings;
use lumen_core::math::{Extent2D, LinearRgba, Vec3};
use lumen_core::renderer::resource::{GpuTexture, RenderTarget, ResourcePool, TextureSpec};
use lumen_core::renderer::{
    GraphicsDevice, LoadOp, Operations, Presenter, RenderError, RenderPassColorAttachment,
    RenderPassDescriptor, ResourceError, StoreOp, TextureFormat,
};
use lumen_core::Camera;
use lumen_lanes::{CubemapProjectionLane, ExposureFilter, LuminancePyramidLane, ToneMapLane};
use std::sync::Arc;
use std::time::Instant;

/// A camera change applied at the start of the next frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraInput {
    /// Moves the eye by a world-space offset.
    Move(Vec3),
    /// Turns the camera, in degrees.
    Rotate {
        /// Added to the yaw.
        yaw_degrees: f32,
        /// Added to the pitch, which is clamped.
        pitch_degrees: f32,
    },
}

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Index of the frame, starting at 0.
    pub frame_index: u64,
    /// Geometric-mean luminance of the HDR target, `None` if the measurement failed.
    pub measured_luminance: Option<f32>,
    /// Filtered luminance after this frame, `None` until a measurement succeeds.
    pub adapted_luminance: Option<f32>,
    /// Exposure scale the frame was tone-mapped with.
    pub exposure: f32,
}

/// The viewport-sized textures written every frame.
#[derive(Debug)]
struct FrameTargets {
    hdr: GpuTexture,
    hdr_target: RenderTarget,
    output: GpuTexture,
    output_target: RenderTarget,
}

impl FrameTargets {
    fn new(
        pool: &ResourcePool,
        extent: Extent2D,
        hdr_format: TextureFormat,
        output_format: TextureFormat,
    ) -> Result<Self, ResourceError> {
        let mut hdr =
            pool.create_texture(&TextureSpec::render_target("hdr scene", extent, hdr_format))?;
        let hdr_target = pool.create_render_target(&mut hdr, 0)?;
        let mut output =
            pool.create_texture(&TextureSpec::render_target("tone mapped", extent, output_format))?;
        let output_target = pool.create_render_target(&mut output, 0)?;
        Ok(Self {
            hdr,
            hdr_target,
            output,
            output_target,
        })
    }
}

/// The agent that turns the scene into an exposed, tone-mapped frame.
///
/// Each frame runs, in order: queued camera input, the environment cube,
/// the scene units into the HDR target, the luminance measurement and its
/// temporal filter, the tone-map composite and finally the presenter.
pub struct RenderAgent<P: Presenter> {
    // Device every lane and target is created on.
    device: Arc<dyn GraphicsDevice>,
    // Allocator for the long-lived targets.
    pool: ResourcePool,
    // Current configuration. The viewport size follows `resize`.
    settings: RenderSettings,
    // Scene camera.
    camera: Camera,
    // Input queued since the last frame.
    pending_input: Vec<CameraInput>,
    // Scene units, drawn in insertion order.
    units: Vec<Box<dyn SceneUnit>>,
    // --- Lanes ---
    pyramid: LuminancePyramidLane,
    exposure_filter: ExposureFilter,
    tone_map: ToneMapLane,
    projector: CubemapProjectionLane,
    // Equirectangular source of the environment cube.
    panorama: Option<GpuTexture>,
    targets: FrameTargets,
    presenter: P,
    // Index of the next frame.
    frame_index: u64,
    // Start of the previous `render_frame` call, for wall-clock deltas.
    last_frame: Option<Instant>,
}

impl<P: Presenter> RenderAgent<P> {
    /// Creates the lanes and frame targets described by `settings`.
    ///
    /// ## Errors
    /// * `RenderError::InitializationFailed` - If the settings are invalid.
    /// * `RenderError::ResourceError` - If a lane or target cannot be created.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        presenter: P,
        settings: RenderSettings,
    ) -> Result<Self, RenderError> {
        settings
            .validate()
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;

        let pool = ResourcePool::new(device.clone());
        let extent = settings.extent();
        let targets =
            FrameTargets::new(&pool, extent, settings.hdr_format, settings.output_format)?;

        let pyramid = LuminancePyramidLane::new(device.clone())?;
        let exposure_filter = ExposureFilter::new(settings.exposure.adaptation_time_secs);
        let tone_map = ToneMapLane::new(device.clone(), settings.output_format)?;
        let projector = CubemapProjectionLane::new(device.clone(), settings.cubemap.policy)?;

        let mut camera = Camera::new(Vec3::ZERO, 1.0);
        camera.set_aspect_ratio(extent.width, extent.height);

        log::info!(
            "RenderAgent created: {}x{} {:?} -> {:?}, cube faces {} ({:?}).",
            extent.width,
            extent.height,
            settings.hdr_format,
            settings.output_format,
            settings.cubemap.face_size,
            settings.cubemap.policy,
        );

        Ok(Self {
            device,
            pool,
            settings,
            camera,
            pending_input: Vec::new(),
            units: Vec::new(),
            pyramid,
            exposure_filter,
            tone_map,
            projector,
            panorama: None,
            targets,
            presenter,
            frame_index: 0,
            last_frame: None,
        })
    }

    /// The device the agent renders with.
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    /// The pool the agent allocates its targets from.
    pub fn resource_pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// The presenter frames are handed to.
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Mutable access to the presenter, e.g. to request a capture.
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// The current settings.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Changes the color the scene target is cleared to from the next frame on.
    pub fn set_clear_color(&mut self, color: LinearRgba) {
        self.settings.clear_color = [color.r, color.g, color.b, color.a];
    }

    /// The scene camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Queues a camera change for the next frame.
    pub fn queue_camera_input(&mut self, input: CameraInput) {
        self.pending_input.push(input);
    }

    /// The temporal filter state.
    pub fn exposure_filter(&self) -> &ExposureFilter {
        &self.exposure_filter
    }

    /// The HDR scene target.
    pub fn hdr_target(&self) -> &GpuTexture {
        &self.targets.hdr
    }

    /// The tone-mapped output of the last frame.
    pub fn output(&self) -> &GpuTexture {
        &self.targets.output
    }

    /// Number of frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_index
    }

    /// Initializes `unit` and appends it to the scene.
    pub fn add_unit(&mut self, mut unit: Box<dyn SceneUnit>) -> Result<(), RenderError> {
        unit.init(&self.device, self.settings.hdr_format)?;
        log::info!("Scene unit '{}' added.", unit.name());
        self.units.push(unit);
        Ok(())
    }

    /// Number of scene units.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Sets the equirectangular panorama the environment cube is projected from.
    ///
    /// The panorama must be sampled. The next frame projects it.
    pub fn set_environment(&mut self, panorama: GpuTexture) {
        log::info!(
            "Environment panorama '{}' ({}x{}).",
            panorama.label(),
            panorama.extent().width,
            panorama.extent().height
        );
        self.panorama = Some(panorama);
        self.projector.invalidate();
    }

    /// Drops the panorama and the cube.
    pub fn clear_environment(&mut self) {
        self.panorama = None;
        self.projector.invalidate();
    }

    /// Projects the panorama into the environment cube now.
    ///
    /// Under [`CubemapPolicy::BuildOnce`](lumen_lanes::CubemapPolicy::BuildOnce)
    /// an up-to-date cube is returned without rendering.
    pub fn build_environment_cubemap(&mut self) -> Result<&GpuTexture, RenderError> {
        let Some(panorama) = self.panorama.as_ref() else {
            return Err(RenderError::RenderingFailed(
                "no environment panorama set".to_string(),
            ));
        };
        let cube = self
            .projector
            .project(panorama, self.settings.cubemap.face_size)?;
        Ok(cube)
    }

    /// The last projected cube, if any.
    pub fn environment_cubemap(&self) -> Option<&GpuTexture> {
        self.projector.cubemap()
    }

    /// Number of times the cube has been rendered.
    pub fn cubemap_build_count(&self) -> usize {
        self.projector.build_count()
    }

    /// Measures `hdr`, feeds the temporal filter and returns the adapted luminance.
    ///
    /// A failed measurement is logged and leaves the filter untouched, so the
    /// previous value is returned. Before any measurement has succeeded that is
    /// the configured key value, which tone-maps with an exposure of 1.
    pub fn compute_exposure(&mut self, hdr: &GpuTexture, dt: f32) -> f32 {
        measure_into(&self.pyramid, &mut self.exposure_filter, hdr, dt);
        self.exposure_filter
            .current()
            .unwrap_or(self.settings.exposure.key_value)
    }

    fn current_exposure(&self) -> f32 {
        let exposure = &self.settings.exposure;
        self.exposure_filter
            .exposure(exposure.key_value, exposure.min_luminance)
    }

    /// Recreates the frame targets for a new viewport size.
    ///
    /// A zero dimension is ignored. On failure the previous targets are kept.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let extent = Extent2D::new(width, height);
        if extent.is_empty() {
            log::warn!("Ignoring resize to {width}x{height}.");
            return Ok(());
        }
        if extent == self.settings.extent() {
            return Ok(());
        }
        self.targets = FrameTargets::new(
            &self.pool,
            extent,
            self.settings.hdr_format,
            self.settings.output_format,
        )?;
        self.settings.width = width;
        self.settings.height = height;
        self.camera.set_aspect_ratio(width, height);
        log::info!("RenderAgent resized to {width}x{height}.");
        Ok(())
    }

    /// Renders one frame, using the wall-clock time since the previous call as
    /// the filter step. The first frame uses a zero step.
    pub fn render_frame(&mut self) -> Result<FrameReport, RenderError> {
        let now = Instant::now();
        let dt = self
            .last_frame
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last_frame = Some(now);
        self.render_frame_with_delta(dt)
    }

    /// Renders one frame with an explicit filter step in seconds.
    pub fn render_frame_with_delta(&mut self, dt: f32) -> Result<FrameReport, RenderError> {
        for input in self.pending_input.drain(..) {
            match input {
                CameraInput::Move(delta) => self.camera.move_by(delta),
                CameraInput::Rotate {
                    yaw_degrees,
                    pitch_degrees,
                } => self.camera.rotate(yaw_degrees, pitch_degrees),
            }
        }

        if let Some(panorama) = self.panorama.as_ref() {
            if let Err(e) = self
                .projector
                .project(panorama, self.settings.cubemap.face_size)
            {
                log::warn!("Environment cube not updated: {e}");
            }
        }

        let frame = FrameContext {
            frame_index: self.frame_index,
            camera: &self.camera,
            extent: self.targets.hdr.extent(),
            environment: self.projector.cubemap(),
        };
        for unit in &mut self.units {
            unit.prepare(&frame)?;
        }
        self.draw_scene()?;

        let measured_luminance =
            measure_into(&self.pyramid, &mut self.exposure_filter, &self.targets.hdr, dt);
        let exposure = self.current_exposure();

        self.tone_map.composite(
            &self.targets.hdr,
            &self.targets.output_target,
            exposure,
            self.settings.tone_map.preview(),
        )?;

        if let Err(e) = self.presenter.present(&self.targets.output) {
            log::error!("Failed to present frame {}: {e}", self.frame_index);
        }

        let report = FrameReport {
            frame_index: self.frame_index,
            measured_luminance,
            adapted_luminance: self.exposure_filter.current(),
            exposure,
        };
        self.frame_index += 1;
        Ok(report)
    }

    fn draw_scene(&self) -> Result<(), RenderError> {
        let mut encoder = self.device.create_command_encoder(Some("scene pass"));
        {
            let attachments = [RenderPassColorAttachment {
                view: self.targets.hdr_target.view(),
                ops: Operations {
                    load: LoadOp::Clear(self.settings.clear_color()),
                    store: StoreOp::Store,
                },
            }];
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &attachments,
            });
            for unit in &self.units {
                unit.render(&mut *pass);
            }
        }
        self.device.submit_command_buffer(encoder.finish())?;
        Ok(())
    }
}

/// Measures `hdr` and feeds the result to `filter`.
///
/// Returns the measured luminance, or `None` if the measurement failed.
fn measure_into(
    pyramid: &LuminancePyramidLane,
    filter: &mut ExposureFilter,
    hdr: &GpuTexture,
    dt: f32,
) -> Option<f32> {
    match pyramid.measure(hdr) {
        Ok(measurement) => {
            let adapted = filter.update(measurement.luminance, dt);
            log::debug!(
                "Measured luminance {:.5} in {} passes, adapted {:.5}.",
                measurement.luminance,
                measurement.reduction_passes,
                adapted
            );
            Some(measurement.luminance)
        }
        Err(e) => {
            log::warn!("Luminance measurement failed, keeping previous exposure: {e}");
            None
        }
    }
}

impl<P: Presenter> Drop for RenderAgent<P> {
    fn drop(&mut self) {
        for unit in &mut self.units {
            unit.cleanup();
        }
    }
}
