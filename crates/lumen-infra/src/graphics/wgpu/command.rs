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

use lumen_core::renderer::api::command::{
    CommandBufferId, RenderPassDescriptor, TextureToBufferCopy,
};
use lumen_core::renderer::traits::{CommandEncoder, RenderPass};
use lumen_core::renderer::{api::buffer as api_buf, BindGroupId, IndexFormat, RenderPipelineId};
use std::ops::Range;

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;

pub struct WgpuRenderPass<'a> {
    pub(crate) pass: wgpu::RenderPass<'a>,
    pub(crate) device: &'a WgpuDevice,
}

impl<'pass> RenderPass<'pass> for WgpuRenderPass<'pass> {
    fn set_pipeline(&mut self, pipeline_id: &'pass RenderPipelineId) {
        if let Some(pipeline) = self.device.get_wgpu_render_pipeline(*pipeline_id) {
            self.pass.set_pipeline(&pipeline);
        } else {
            log::warn!(
                "WgpuRenderPass: RenderPipelineId {:?} not found.",
                pipeline_id
            );
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group_id: &'pass BindGroupId) {
        if let Some(bind_group) = self.device.get_wgpu_bind_group(*bind_group_id) {
            self.pass.set_bind_group(index, bind_group.as_ref(), &[]);
        } else {
            log::warn!("WgpuRenderPass: BindGroupId {:?} not found.", bind_group_id);
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer_id: &'pass api_buf::BufferId, offset: u64) {
        if let Some(buffer) = self.device.get_wgpu_buffer(*buffer_id) {
            self.pass.set_vertex_buffer(slot, buffer.slice(offset..));
        } else {
            log::warn!("WgpuRenderPass: Vertex BufferId {:?} not found.", buffer_id);
        }
    }

    fn set_index_buffer(
        &mut self,
        buffer_id: &'pass api_buf::BufferId,
        offset: u64,
        index_format: IndexFormat,
    ) {
        if let Some(buffer) = self.device.get_wgpu_buffer(*buffer_id) {
            self.pass
                .set_index_buffer(buffer.slice(offset..), index_format.into_wgpu());
        } else {
            log::warn!("WgpuRenderPass: Index BufferId {:?} not found.", buffer_id);
        }
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.draw_indexed(indices, base_vertex, instances);
    }
}

pub struct WgpuCommandEncoder {
    pub(crate) encoder: wgpu::CommandEncoder,
    pub(crate) device: WgpuDevice,
}

impl CommandEncoder for WgpuCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'encoder>,
    ) -> Box<dyn RenderPass<'encoder> + 'encoder> {
        // Resolve the views first so the attachments can borrow them.
        let resolved: Vec<(wgpu::TextureView, _)> = descriptor
            .color_attachments
            .iter()
            .filter_map(|att| match self.device.get_wgpu_texture_view(att.view) {
                Some(view) => Some(((*view).clone(), &att.ops)),
                None => {
                    log::warn!(
                        "WgpuCommandEncoder: color attachment view {:?} not found, skipping.",
                        att.view
                    );
                    None
                }
            })
            .collect();

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = resolved
            .iter()
            .map(|(view, ops)| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: ops.load.clone().into_wgpu(),
                        store: ops.store.clone().into_wgpu(),
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let pass = self
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: descriptor.label,
                color_attachments: &color_attachments,
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

        Box::new(WgpuRenderPass {
            pass,
            device: &self.device,
        })
    }

    fn copy_texture_to_buffer(&mut self, copy: &TextureToBufferCopy) {
        let (Some(texture), Some(buffer)) = (
            self.device.get_wgpu_texture(copy.texture),
            self.device.get_wgpu_buffer(copy.buffer),
        ) else {
            log::warn!(
                "WgpuCommandEncoder: copy source {:?} or destination {:?} not found.",
                copy.texture,
                copy.buffer
            );
            return;
        };

        self.encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: copy.layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(copy.bytes_per_row),
                    rows_per_image: Some(copy.size.height),
                },
            },
            wgpu::Extent3d {
                width: copy.size.width,
                height: copy.size.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let WgpuCommandEncoder { encoder, device } = *self;
        device.register_command_buffer(encoder.finish())
    }
}
