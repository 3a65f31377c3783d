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

use super::primitive::QuadVertex;
use crate::renderer::{
    BindGroupLayoutId, ColorTargetStateDescriptor, GraphicsDevice, IndexFormat,
    PrimitiveStateDescriptor, PrimitiveTopology, RenderPipelineDescriptor, RenderPipelineId,
    ResourceError, ShaderModuleDescriptor, ShaderModuleId, ShaderProgram, ShaderSourceData,
    TextureFormat,
};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Name of the vertex entry point every program exports.
pub const VERTEX_ENTRY_POINT: &str = "vs_main";
/// Name of the fragment entry point every program exports.
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// Inputs for [`ProgramPipeline::new`].
#[derive(Debug, Clone)]
pub struct PipelineSpec<'a> {
    /// Debug label for the module and the pipeline.
    pub label: &'a str,
    /// The program the WGSL source implements.
    pub program: ShaderProgram,
    /// WGSL source exporting `vs_main` and `fs_main`.
    pub source: &'a str,
    /// Bind group layouts in group order.
    pub bind_group_layouts: &'a [BindGroupLayoutId],
    /// The single color target format.
    pub target_format: TextureFormat,
    /// Topology of the primitives drawn with this pipeline.
    pub topology: PrimitiveTopology,
}

/// A shader module and the render pipeline built from it, drawing [`QuadVertex`] geometry.
pub struct ProgramPipeline {
    device: Arc<dyn GraphicsDevice>,
    module: ShaderModuleId,
    pipeline: RenderPipelineId,
    program: ShaderProgram,
}

impl ProgramPipeline {
    /// Compiles the module and builds the pipeline.
    pub fn new(device: Arc<dyn GraphicsDevice>, spec: &PipelineSpec) -> Result<Self, ResourceError> {
        let module = device.create_shader_module(&ShaderModuleDescriptor {
            label: Some(spec.label),
            program: spec.program,
            source: ShaderSourceData::Wgsl(Cow::Borrowed(spec.source)),
        })?;

        let strip_index_format = match spec.topology {
            PrimitiveTopology::TriangleStrip => Some(IndexFormat::Uint32),
            PrimitiveTopology::TriangleList => None,
        };
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(Cow::Borrowed(spec.label)),
            vertex_shader_module: module,
            vertex_entry_point: Cow::Borrowed(VERTEX_ENTRY_POINT),
            fragment_shader_module: module,
            fragment_entry_point: Cow::Borrowed(FRAGMENT_ENTRY_POINT),
            vertex_buffers_layout: Cow::Owned(vec![QuadVertex::layout()]),
            primitive_state: PrimitiveStateDescriptor {
                topology: spec.topology,
                strip_index_format,
            },
            color_target_states: Cow::Owned(vec![ColorTargetStateDescriptor {
                format: spec.target_format,
            }]),
            bind_group_layouts: Cow::Borrowed(spec.bind_group_layouts),
        });

        match pipeline {
            Ok(pipeline) => {
                log::debug!("Created pipeline '{}' ({})", spec.label, spec.program.name());
                Ok(Self {
                    device,
                    module,
                    pipeline,
                    program: spec.program,
                })
            }
            Err(e) => {
                if let Err(destroy_err) = device.destroy_shader_module(module) {
                    log::warn!("Failed to destroy shader module of '{}': {destroy_err}", spec.label);
                }
                Err(e)
            }
        }
    }

    /// The pipeline handle. Borrowed by render passes for the pass lifetime.
    pub fn id(&self) -> &RenderPipelineId {
        &self.pipeline
    }

    /// The program this pipeline runs.
    pub fn program(&self) -> ShaderProgram {
        self.program
    }
}

impl fmt::Debug for ProgramPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramPipeline")
            .field("program", &self.program)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Drop for ProgramPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_render_pipeline(self.pipeline) {
            log::warn!("Failed to destroy pipeline {:?}: {e}", self.pipeline);
        }
        if let Err(e) = self.device.destroy_shader_module(self.module) {
            log::warn!("Failed to destroy shader module {:?}: {e}", self.module);
        }
    }
}
