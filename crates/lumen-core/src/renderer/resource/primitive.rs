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

use crate::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, IndexFormat, PrimitiveTopology,
    RenderPass, ResourceError, VertexAttributeDescriptor, VertexBufferLayoutDescriptor,
    VertexFormat, VertexStepMode,
};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// The vertex layout shared by every program: a clip-space position and a texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct QuadVertex {
    /// Position in normalized device coordinates.
    pub position: [f32; 2],
    /// Texture coordinate, `(0, 0)` at the top-left.
    pub uv: [f32; 2],
}

impl QuadVertex {
    /// The vertex buffer layout matching `@location(0)` position and `@location(1)` uv.
    pub fn layout() -> VertexBufferLayoutDescriptor<'static> {
        VertexBufferLayoutDescriptor {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: Cow::Owned(vec![
                VertexAttributeDescriptor {
                    shader_location: 0,
                    format: VertexFormat::Float32x2,
                    offset: 0,
                },
                VertexAttributeDescriptor {
                    shader_location: 1,
                    format: VertexFormat::Float32x2,
                    offset: 8,
                },
            ]),
        }
    }
}

/// Immutable geometry: vertex buffer, 32-bit index buffer and topology.
pub struct Primitive {
    device: Arc<dyn GraphicsDevice>,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    index_count: u32,
    topology: PrimitiveTopology,
}

impl Primitive {
    /// Uploads `vertices` and `indices`. Strips restart at `u32::MAX`.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        label: &str,
        vertices: &[QuadVertex],
        indices: &[u32],
        topology: PrimitiveTopology,
    ) -> Result<Self, ResourceError> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let vertex_buffer = device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Owned(format!("{label} vertices"))),
                size: vertex_bytes.len() as u64,
                usage: BufferUsage::VERTEX,
                mapped_at_creation: false,
            },
            vertex_bytes,
        )?;

        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let index_buffer = match device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Owned(format!("{label} indices"))),
                size: index_bytes.len() as u64,
                usage: BufferUsage::INDEX,
                mapped_at_creation: false,
            },
            index_bytes,
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                if let Err(destroy_err) = device.destroy_buffer(vertex_buffer) {
                    log::warn!("Failed to destroy vertex buffer of '{label}': {destroy_err}");
                }
                return Err(e);
            }
        };

        Ok(Self {
            device,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            topology,
        })
    }

    /// A quad covering the whole viewport.
    pub fn screen_quad(device: Arc<dyn GraphicsDevice>) -> Result<Self, ResourceError> {
        Self::new(
            device,
            "screen quad",
            &Self::quad_vertices(-1.0, 1.0, -1.0, 1.0),
            &Self::QUAD_INDICES,
            PrimitiveTopology::TriangleList,
        )
    }

    /// A quad covering the top-left window `x ∈ [-1, -inset]`, `y ∈ [inset, 1]`.
    ///
    /// The full texture is mapped onto the window.
    pub fn screen_inset_quad(device: Arc<dyn GraphicsDevice>, inset: f32) -> Result<Self, ResourceError> {
        let inset = inset.clamp(-1.0, 1.0);
        Self::new(
            device,
            "screen inset quad",
            &Self::quad_vertices(-1.0, -inset, inset, 1.0),
            &Self::QUAD_INDICES,
            PrimitiveTopology::TriangleList,
        )
    }

    const QUAD_INDICES: [u32; 6] = [0, 2, 1, 2, 0, 3];

    fn quad_vertices(left: f32, right: f32, bottom: f32, top: f32) -> [QuadVertex; 4] {
        [
            QuadVertex {
                position: [left, bottom],
                uv: [0.0, 1.0],
            },
            QuadVertex {
                position: [right, bottom],
                uv: [1.0, 1.0],
            },
            QuadVertex {
                position: [right, top],
                uv: [1.0, 0.0],
            },
            QuadVertex {
                position: [left, top],
                uv: [0.0, 0.0],
            },
        ]
    }

    /// Number of indices drawn.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// The topology pipelines drawing this primitive must use.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Binds the buffers and issues one indexed draw.
    ///
    /// The pipeline and bind groups must already be set on `pass`.
    pub fn draw<'a>(&'a self, pass: &mut dyn RenderPass<'a>) {
        pass.set_vertex_buffer(0, &self.vertex_buffer, 0);
        pass.set_index_buffer(&self.index_buffer, 0, IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("index_count", &self.index_count)
            .field("topology", &self.topology)
            .finish()
    }
}

impl Drop for Primitive {
    fn drop(&mut self) {
        for buffer in [self.vertex_buffer, self.index_buffer] {
            if let Err(e) = self.device.destroy_buffer(buffer) {
                log::warn!("Failed to destroy primitive buffer {buffer:?}: {e}");
            }
        }
    }
}
