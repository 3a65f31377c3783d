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

//! Draws the environment cube behind the scene.

use super::program_pipeline;
use crate::LaneError;
use lumen_core::renderer::resource::{
    BindGroup, BindGroupLayout, GpuTexture, Primitive, ProgramPipeline, Sampler, UniformBuffer,
};
use lumen_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayoutEntry, GraphicsDevice, RenderPass,
    SamplerBindingType, SamplerDescriptor, ShaderProgram, ShaderStageFlags, TextureFormat,
    TextureSampleType, TextureViewDimension, TextureViewId, ViewRayUniforms,
};
use lumen_core::Camera;
use std::sync::Arc;

/// A lane that fills the scene pass with the environment seen through the camera.
#[derive(Debug)]
pub struct SkyboxLane {
    device: Arc<dyn GraphicsDevice>,
    layout: BindGroupLayout,
    pipeline: ProgramPipeline,
    sampler: Sampler,
    uniforms: UniformBuffer<ViewRayUniforms>,
    quad: Primitive,
    bound: Option<(TextureViewId, BindGroup)>,
}

impl SkyboxLane {
    /// Creates the skybox pipeline drawing into `target_format`.
    pub fn new(device: Arc<dyn GraphicsDevice>, target_format: TextureFormat) -> Result<Self, LaneError> {
        let layout = BindGroupLayout::new(
            device.clone(),
            "skybox layout",
            &[
                BindGroupLayoutEntry::uniform(0, ShaderStageFlags::FRAGMENT),
                BindGroupLayoutEntry::texture(
                    1,
                    ShaderStageFlags::FRAGMENT,
                    TextureSampleType::Float { filterable: true },
                    TextureViewDimension::Cube,
                ),
                BindGroupLayoutEntry::sampler(
                    2,
                    ShaderStageFlags::FRAGMENT,
                    SamplerBindingType::Filtering,
                ),
            ],
        )?;
        let pipeline = program_pipeline(&device, ShaderProgram::Skybox, &layout, target_format)?;
        let sampler = Sampler::new(device.clone(), &SamplerDescriptor::default())?;
        let uniforms = UniformBuffer::new(
            device.clone(),
            "skybox view",
            &ViewRayUniforms {
                inv_view_proj: [[0.0; 4]; 4],
            },
        )?;
        let quad = Primitive::screen_quad(device.clone())?;
        Ok(Self {
            device,
            layout,
            pipeline,
            sampler,
            uniforms,
            quad,
            bound: None,
        })
    }

    /// Points the skybox at `cube` as seen by `camera`.
    ///
    /// The bind group is rebuilt only when the cube's view changes.
    pub fn prepare(&mut self, camera: &Camera, cube: &GpuTexture) -> Result<(), LaneError> {
        let view = cube.sampled_view().ok_or_else(|| LaneError::NotSampled {
            label: cube.label().to_string(),
        })?;
        let uniforms = ViewRayUniforms::from_view_proj(camera.view_projection())
            .ok_or_else(|| LaneError::SingularView("scene camera".to_string()))?;
        self.uniforms.update(&uniforms)?;

        if self.bound.as_ref().is_none_or(|(bound, _)| *bound != view) {
            let group = BindGroup::new(
                self.device.clone(),
                &BindGroupDescriptor {
                    label: Some("skybox group"),
                    layout: self.layout.id(),
                    entries: &[
                        BindGroupEntry::buffer(0, self.uniforms.id()),
                        BindGroupEntry::texture_view(1, view),
                        BindGroupEntry::sampler(2, self.sampler.id()),
                    ],
                },
            )?;
            self.bound = Some((view, group));
        }
        Ok(())
    }

    /// Forgets the bound cube. Nothing is drawn until the next [`prepare`](Self::prepare).
    pub fn unbind(&mut self) {
        self.bound = None;
    }

    /// Whether a cube is bound.
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Records the skybox draw into the current pass.
    pub fn draw<'a>(&'a self, pass: &mut dyn RenderPass<'a>) {
        if let Some((_, group)) = &self.bound {
            pass.set_pipeline(self.pipeline.id());
            pass.set_bind_group(0, group.id());
            self.quad.draw(pass);
        }
    }
}
