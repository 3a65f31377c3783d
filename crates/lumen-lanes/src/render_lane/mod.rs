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

//! Rendering lanes: the full-screen passes of the exposure and environment pipelines.

use crate::LaneError;
use lumen_core::math::LinearRgba;
use lumen_core::renderer::resource::{
    BindGroup, BindGroupLayout, PipelineSpec, Primitive, ProgramPipeline, RenderTarget,
};
use lumen_core::renderer::{
    CommandEncoder, GraphicsDevice, LoadOp, Operations, PrimitiveTopology,
    RenderPassColorAttachment, RenderPassDescriptor, ResourceError, ShaderProgram, StoreOp,
    TextureFormat,
};
use std::sync::Arc;

mod cubemap_projection;
mod exposure;
mod luminance_pyramid;
pub mod shaders;
mod skybox;
mod tone_map;

pub use cubemap_projection::*;
pub use exposure::*;
pub use luminance_pyramid::*;
pub use skybox::*;
pub use tone_map::*;

/// Builds the pipeline of a built-in program over a single bind group.
fn program_pipeline(
    device: &Arc<dyn GraphicsDevice>,
    program: ShaderProgram,
    layout: &BindGroupLayout,
    target_format: TextureFormat,
) -> Result<ProgramPipeline, LaneError> {
    let source =
        shaders::program_source(program).ok_or(LaneError::MissingProgram(program.name()))?;
    let pipeline = ProgramPipeline::new(
        device.clone(),
        &PipelineSpec {
            label: program.name(),
            program,
            source,
            bind_group_layouts: &[layout.id()],
            target_format,
            topology: PrimitiveTopology::TriangleList,
        },
    )?;
    Ok(pipeline)
}

/// Records one pass that draws `primitive` into `target` with a single bind group.
///
/// The pass ends before this returns, so every view bound by `group` is free
/// to be written by the next pass.
fn encode_quad_pass(
    encoder: &mut dyn CommandEncoder,
    label: &str,
    target: &RenderTarget,
    load: LoadOp<LinearRgba>,
    pipeline: &ProgramPipeline,
    group: &BindGroup,
    primitive: &Primitive,
) {
    let attachments = [RenderPassColorAttachment {
        view: target.view(),
        ops: Operations {
            load,
            store: StoreOp::Store,
        },
    }];
    let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
        label: Some(label),
        color_attachments: &attachments,
    });
    pass.set_pipeline(pipeline.id());
    pass.set_bind_group(0, group.id());
    primitive.draw(&mut *pass);
}

/// Records one quad pass on a fresh encoder and submits it.
fn submit_quad_pass(
    device: &Arc<dyn GraphicsDevice>,
    label: &str,
    target: &RenderTarget,
    pipeline: &ProgramPipeline,
    group: &BindGroup,
    primitive: &Primitive,
) -> Result<(), ResourceError> {
    let mut encoder = device.create_command_encoder(Some(label));
    encode_quad_pass(
        encoder.as_mut(),
        label,
        target,
        LoadOp::Clear(LinearRgba::BLACK),
        pipeline,
        group,
        primitive,
    );
    device.submit_command_buffer(encoder.finish())
}
