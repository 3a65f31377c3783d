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

//! Composites the HDR frame into the output target.
//!
//! A full-screen tone-map quad is always drawn. When enabled, a bright-pass quad is
//! drawn on top into the top-left window of the output, showing which pixels exceed
//! the threshold.

use super::{encode_quad_pass, program_pipeline};
use crate::LaneError;
use lumen_core::math::LinearRgba;
use lumen_core::renderer::resource::{
    BindGroup, BindGroupLayout, GpuTexture, Primitive, ProgramPipeline, RenderTarget, Sampler,
    UniformBuffer,
};
use lumen_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayoutEntry, GraphicsDevice, LoadOp,
    SamplerBindingType, SamplerDescriptor, ShaderProgram, ShaderStageFlags, TextureFormat,
    TextureSampleType, TextureViewDimension, ToneMapUniforms,
};
use std::sync::Arc;

/// Settings of the bright-pass preview window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightPassPreview {
    /// Exposed luminance above which pixels are kept.
    pub threshold: f32,
    /// The window covers `x ∈ [-1, -inset]`, `y ∈ [inset, 1]` in clip space.
    pub inset: f32,
}

/// A lane that tone maps an HDR texture with a given exposure.
#[derive(Debug)]
pub struct ToneMapLane {
    device: Arc<dyn GraphicsDevice>,
    layout: BindGroupLayout,
    tone_pipeline: ProgramPipeline,
    bright_pipeline: ProgramPipeline,
    sampler: Sampler,
    uniforms: UniformBuffer<ToneMapUniforms>,
    quad: Primitive,
    inset_quad: Option<(f32, Primitive)>,
    output_format: TextureFormat,
}

impl ToneMapLane {
    /// Creates the tone-map and bright-pass pipelines writing `output_format`.
    pub fn new(device: Arc<dyn GraphicsDevice>, output_format: TextureFormat) -> Result<Self, LaneError> {
        let layout = BindGroupLayout::new(
            device.clone(),
            "tone map layout",
            &[
                BindGroupLayoutEntry::uniform(0, ShaderStageFlags::FRAGMENT),
                BindGroupLayoutEntry::texture(
                    1,
                    ShaderStageFlags::FRAGMENT,
                    TextureSampleType::Float { filterable: true },
                    TextureViewDimension::D2,
                ),
                BindGroupLayoutEntry::sampler(
                    2,
                    ShaderStageFlags::FRAGMENT,
                    SamplerBindingType::Filtering,
                ),
            ],
        )?;
        let tone_pipeline = program_pipeline(&device, ShaderProgram::ToneMap, &layout, output_format)?;
        let bright_pipeline =
            program_pipeline(&device, ShaderProgram::BrightPass, &layout, output_format)?;
        let sampler = Sampler::new(device.clone(), &SamplerDescriptor::default())?;
        let uniforms = UniformBuffer::new(
            device.clone(),
            "tone map uniforms",
            &ToneMapUniforms::new(1.0, 1.0),
        )?;
        let quad = Primitive::screen_quad(device.clone())?;

        log::info!("Tone map lane ready ({output_format:?})");
        Ok(Self {
            device,
            layout,
            tone_pipeline,
            bright_pipeline,
            sampler,
            uniforms,
            quad,
            inset_quad: None,
            output_format,
        })
    }

    /// The format of the targets this lane writes.
    pub fn output_format(&self) -> TextureFormat {
        self.output_format
    }

    /// Tone maps `source` into `target` with `exposure`, then draws the bright-pass
    /// window if `preview` is set. Both passes are submitted together.
    ///
    /// ## Errors
    /// * `LaneError::NotSampled` - If `source` has no shader view.
    /// * `LaneError::Resource` - If a resource could not be created or the submission failed.
    pub fn composite(
        &mut self,
        source: &GpuTexture,
        target: &RenderTarget,
        exposure: f32,
        preview: Option<BrightPassPreview>,
    ) -> Result<(), LaneError> {
        let source_view = source.sampled_view().ok_or_else(|| LaneError::NotSampled {
            label: source.label().to_string(),
        })?;
        let threshold = preview.map_or(f32::INFINITY, |p| p.threshold);
        self.uniforms
            .update(&ToneMapUniforms::new(exposure, threshold))?;

        if let Some(preview) = preview {
            let stale = self
                .inset_quad
                .as_ref()
                .is_none_or(|(inset, _)| *inset != preview.inset);
            if stale {
                let quad = Primitive::screen_inset_quad(self.device.clone(), preview.inset)?;
                self.inset_quad = Some((preview.inset, quad));
            }
        }

        let group = BindGroup::new(
            self.device.clone(),
            &BindGroupDescriptor {
                label: Some("tone map group"),
                layout: self.layout.id(),
                entries: &[
                    BindGroupEntry::buffer(0, self.uniforms.id()),
                    BindGroupEntry::texture_view(1, source_view),
                    BindGroupEntry::sampler(2, self.sampler.id()),
                ],
            },
        )?;

        let mut encoder = self.device.create_command_encoder(Some("tone map"));
        encode_quad_pass(
            encoder.as_mut(),
            "tone map",
            target,
            LoadOp::Clear(LinearRgba::BLACK),
            &self.tone_pipeline,
            &group,
            &self.quad,
        );
        if let (Some(_), Some((_, inset_quad))) = (preview, &self.inset_quad) {
            encode_quad_pass(
                encoder.as_mut(),
                "bright pass",
                target,
                LoadOp::Load,
                &self.bright_pipeline,
                &group,
                inset_quad,
            );
        }
        self.device.submit_command_buffer(encoder.finish())?;
        Ok(())
    }
}
