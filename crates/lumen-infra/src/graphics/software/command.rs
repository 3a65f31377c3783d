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

use lumen_core::math::LinearRgba;
use lumen_core::renderer::api::command::{
    CommandBufferId, LoadOp, RenderPassDescriptor, TextureToBufferCopy,
};
use lumen_core::renderer::traits::{CommandEncoder, RenderPass};
use lumen_core::renderer::{
    BindGroupId, BufferId, IndexFormat, RenderPipelineId, TextureViewId,
};
use std::ops::Range;

use super::device::SoftwareDevice;

/// A state change or draw recorded inside a render pass.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PassCommand {
    SetPipeline(RenderPipelineId),
    SetBindGroup(u32, BindGroupId),
    SetVertexBuffer {
        slot: u32,
        buffer: BufferId,
        offset: u64,
    },
    SetIndexBuffer {
        buffer: BufferId,
        offset: u64,
        format: IndexFormat,
    },
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordedPass {
    pub label: Option<String>,
    pub attachments: Vec<(TextureViewId, LoadOp<LinearRgba>)>,
    pub commands: Vec<PassCommand>,
}

#[derive(Debug, Clone)]
pub(crate) enum RecordedCommand {
    RenderPass(RecordedPass),
    CopyTextureToBuffer(TextureToBufferCopy),
}

/// Records pass commands; the pass is appended to its encoder when dropped.
pub struct SoftwareRenderPass<'a> {
    sink: &'a mut Vec<RecordedCommand>,
    pass: RecordedPass,
}

impl<'pass> RenderPass<'pass> for SoftwareRenderPass<'pass> {
    fn set_pipeline(&mut self, pipeline: &'pass RenderPipelineId) {
        self.pass.commands.push(PassCommand::SetPipeline(*pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &'pass BindGroupId) {
        self.pass
            .commands
            .push(PassCommand::SetBindGroup(index, *bind_group));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &'pass BufferId, offset: u64) {
        self.pass.commands.push(PassCommand::SetVertexBuffer {
            slot,
            buffer: *buffer,
            offset,
        });
    }

    fn set_index_buffer(&mut self, buffer: &'pass BufferId, offset: u64, index_format: IndexFormat) {
        self.pass.commands.push(PassCommand::SetIndexBuffer {
            buffer: *buffer,
            offset,
            format: index_format,
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass
            .commands
            .push(PassCommand::Draw { vertices, instances });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.commands.push(PassCommand::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }
}

impl Drop for SoftwareRenderPass<'_> {
    fn drop(&mut self) {
        let pass = std::mem::take(&mut self.pass);
        self.sink.push(RecordedCommand::RenderPass(pass));
    }
}

/// Records commands for later execution by [`SoftwareDevice::submit_command_buffer`].
///
/// [`SoftwareDevice::submit_command_buffer`]: lumen_core::renderer::GraphicsDevice::submit_command_buffer
pub struct SoftwareCommandEncoder {
    pub(crate) label: Option<String>,
    pub(crate) commands: Vec<RecordedCommand>,
    pub(crate) device: SoftwareDevice,
}

impl CommandEncoder for SoftwareCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'encoder>,
    ) -> Box<dyn RenderPass<'encoder> + 'encoder> {
        let pass = RecordedPass {
            label: descriptor.label.map(String::from),
            attachments: descriptor
                .color_attachments
                .iter()
                .map(|att| (*att.view, att.ops.load.clone()))
                .collect(),
            commands: Vec::new(),
        };
        Box::new(SoftwareRenderPass {
            sink: &mut self.commands,
            pass,
        })
    }

    fn copy_texture_to_buffer(&mut self, copy: &TextureToBufferCopy) {
        self.commands.push(RecordedCommand::CopyTextureToBuffer(*copy));
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let SoftwareCommandEncoder {
            label,
            commands,
            device,
        } = *self;
        device.register_command_buffer(label, commands)
    }
}
