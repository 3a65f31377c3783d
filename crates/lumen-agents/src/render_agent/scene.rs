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

//! Scene units: the pieces of the scene drawn into the HDR target each frame.

use lumen_core::math::{Extent2D, LinearRgba};
use lumen_core::renderer::resource::{
    BindGroup, BindGroupLayout, GpuTexture, PipelineSpec, Primitive, ProgramPipeline, QuadVertex,
    UniformBuffer,
};
use lumen_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayoutEntry, ColorUniforms, GraphicsDevice,
    PrimitiveTopology, RenderError, RenderPass, ShaderProgram, ShaderStageFlags, TextureFormat,
};
use lumen_core::Camera;
use lumen_lanes::shaders::program_source;
use lumen_lanes::SkyboxLane;
use std::sync::Arc;

/// What a unit can look at while preparing a frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    /// Index of the frame being prepared.
    pub frame_index: u64,
    /// The scene camera, with this frame's input applied.
    pub camera: &'a Camera,
    /// Size of the HDR target.
    pub extent: Extent2D,
    /// The environment cube, if one has been projected.
    pub environment: Option<&'a GpuTexture>,
}

/// A piece of the scene with its own GPU resources.
///
/// The agent calls `init` once when the unit is added, `prepare` every frame
/// before the scene pass, `render` inside the scene pass and `cleanup` when the
/// agent is dropped. Units are drawn in the order they were added.
pub trait SceneUnit: Send {
    /// A name for logs.
    fn name(&self) -> &str;

    /// Creates the unit's pipelines for a target of `hdr_format`.
    fn init(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        hdr_format: TextureFormat,
    ) -> Result<(), RenderError>;

    /// Updates per-frame state such as uniforms and bindings.
    fn prepare(&mut self, frame: &FrameContext<'_>) -> Result<(), RenderError>;

    /// Records the unit's draws into the scene pass.
    fn render<'pass>(&'pass self, pass: &mut dyn RenderPass<'pass>);

    /// Releases the unit's GPU resources.
    fn cleanup(&mut self) {}
}

/// Draws the environment cube around the camera.
#[derive(Debug, Default)]
pub struct SkyboxUnit {
    lane: Option<SkyboxLane>,
}

impl SkyboxUnit {
    /// Creates an uninitialized skybox.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneUnit for SkyboxUnit {
    fn name(&self) -> &str {
        "skybox"
    }

    fn init(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        hdr_format: TextureFormat,
    ) -> Result<(), RenderError> {
        self.lane = Some(SkyboxLane::new(device.clone(), hdr_format)?);
        Ok(())
    }

    fn prepare(&mut self, frame: &FrameContext<'_>) -> Result<(), RenderError> {
        let Some(lane) = self.lane.as_mut() else {
            return Err(RenderError::NotInitialized);
        };
        match frame.environment {
            Some(cube) => lane.prepare(frame.camera, cube)?,
            None => lane.unbind(),
        }
        Ok(())
    }

    fn render<'pass>(&'pass self, pass: &mut dyn RenderPass<'pass>) {
        if let Some(lane) = &self.lane {
            lane.draw(pass);
        }
    }

    fn cleanup(&mut self) {
        self.lane = None;
    }
}

struct SolidColorResources {
    _layout: BindGroupLayout,
    pipeline: ProgramPipeline,
    uniforms: UniformBuffer<ColorUniforms>,
    group: BindGroup,
    rect: Primitive,
}

/// Fills a clip-space rectangle with one HDR color.
///
/// Handy as a light source or a calibration patch.
pub struct SolidColorUnit {
    color: LinearRgba,
    bounds: [f32; 4],
    resources: Option<SolidColorResources>,
}

impl std::fmt::Debug for SolidColorUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolidColorUnit")
            .field("color", &self.color)
            .field("bounds", &self.bounds)
            .field("initialized", &self.resources.is_some())
            .finish()
    }
}

impl SolidColorUnit {
    /// A unit covering the whole viewport.
    pub fn full_screen(color: LinearRgba) -> Self {
        Self::rect(color, -1.0, 1.0, -1.0, 1.0)
    }

    /// A unit covering `x ∈ [left, right]`, `y ∈ [bottom, top]` in clip space.
    pub fn rect(color: LinearRgba, left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            color,
            bounds: [left, right, bottom, top],
            resources: None,
        }
    }

    /// The current color.
    pub fn color(&self) -> LinearRgba {
        self.color
    }

    /// Changes the color from the next frame on.
    pub fn set_color(&mut self, color: LinearRgba) {
        self.color = color;
    }
}

impl SceneUnit for SolidColorUnit {
    fn name(&self) -> &str {
        "solid color"
    }

    fn init(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        hdr_format: TextureFormat,
    ) -> Result<(), RenderError> {
        let program = ShaderProgram::SolidColor;
        let source = program_source(program).ok_or_else(|| {
            RenderError::InitializationFailed(format!("no source for {}", program.name()))
        })?;
        let layout = BindGroupLayout::new(
            device.clone(),
            "solid color layout",
            &[BindGroupLayoutEntry::uniform(0, ShaderStageFlags::FRAGMENT)],
        )?;
        let pipeline = ProgramPipeline::new(
            device.clone(),
            &PipelineSpec {
                label: program.name(),
                program,
                source,
                bind_group_layouts: &[layout.id()],
                target_format: hdr_format,
                topology: PrimitiveTopology::TriangleStrip,
            },
        )?;
        let uniforms = UniformBuffer::new(
            device.clone(),
            "solid color",
            &ColorUniforms::from(self.color),
        )?;
        let group = BindGroup::new(
            device.clone(),
            &BindGroupDescriptor {
                label: Some("solid color group"),
                layout: layout.id(),
                entries: &[BindGroupEntry::buffer(0, uniforms.id())],
            },
        )?;

        let [left, right, bottom, top] = self.bounds;
        let corner = |x: f32, y: f32, u: f32, v: f32| QuadVertex {
            position: [x, y],
            uv: [u, v],
        };
        let rect = Primitive::new(
            device.clone(),
            "solid color rect",
            &[
                corner(left, top, 0.0, 0.0),
                corner(left, bottom, 0.0, 1.0),
                corner(right, top, 1.0, 0.0),
                corner(right, bottom, 1.0, 1.0),
            ],
            &[0, 1, 2, 3],
            PrimitiveTopology::TriangleStrip,
        )?;

        self.resources = Some(SolidColorResources {
            _layout: layout,
            pipeline,
            uniforms,
            group,
            rect,
        });
        Ok(())
    }

    fn prepare(&mut self, _frame: &FrameContext<'_>) -> Result<(), RenderError> {
        let resources = self.resources.as_ref().ok_or(RenderError::NotInitialized)?;
        resources.uniforms.update(&ColorUniforms::from(self.color))?;
        Ok(())
    }

    fn render<'pass>(&'pass self, pass: &mut dyn RenderPass<'pass>) {
        if let Some(resources) = &self.resources {
            pass.set_pipeline(resources.pipeline.id());
            pass.set_bind_group(0, resources.group.id());
            resources.rect.draw(pass);
        }
    }

    fn cleanup(&mut self) {
        self.resources = None;
    }
}
