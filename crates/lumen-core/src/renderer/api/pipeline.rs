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

//! Defines the data structures used to configure a graphics render pipeline.

use crate::renderer::{BindGroupLayoutId, IndexFormat, ShaderModuleId, TextureFormat};
use std::borrow::Cow;

/// The format of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats.
    Float32x2,
}

impl VertexFormat {
    /// Size of the attribute in bytes.
    pub fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32x2 => 8,
        }
    }
}

/// Whether a vertex buffer is indexed by vertex or by instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStepMode {
    /// Advance once per vertex.
    Vertex,
    /// Advance once per instance.
    Instance,
}

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Every three vertices form a triangle.
    TriangleList,
    /// Each vertex after the first two forms a triangle with the previous two.
    /// A strip restart index (`u32::MAX` / `u16::MAX`) starts a new strip.
    TriangleStrip,
}

/// Describes one attribute inside a vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttributeDescriptor {
    /// The `@location` this attribute is bound to in the shader.
    pub shader_location: u32,
    /// The format of the attribute.
    pub format: VertexFormat,
    /// The byte offset of the attribute from the start of the vertex.
    pub offset: u64,
}

/// Describes how a vertex buffer is laid out in memory.
#[derive(Debug, Clone)]
pub struct VertexBufferLayoutDescriptor<'a> {
    /// The stride in bytes between two consecutive elements.
    pub array_stride: u64,
    /// Whether this buffer is stepped per vertex or per instance.
    pub step_mode: VertexStepMode,
    /// The attributes contained in each element.
    pub attributes: Cow<'a, [VertexAttributeDescriptor]>,
}

/// Describes primitive assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveStateDescriptor {
    /// The primitive topology.
    pub topology: PrimitiveTopology,
    /// The index format used for strip restart. Required for indexed strips.
    pub strip_index_format: Option<IndexFormat>,
}

impl Default for PrimitiveStateDescriptor {
    fn default() -> Self {
        PrimitiveStateDescriptor {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
        }
    }
}

/// Describes one color target of a pipeline. Blending is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorTargetStateDescriptor {
    /// The format of the render target.
    pub format: TextureFormat,
}

/// Describes a complete render pipeline.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The shader module containing the vertex stage.
    pub vertex_shader_module: ShaderModuleId,
    /// The vertex entry point name.
    pub vertex_entry_point: Cow<'a, str>,
    /// The shader module containing the fragment stage.
    pub fragment_shader_module: ShaderModuleId,
    /// The fragment entry point name.
    pub fragment_entry_point: Cow<'a, str>,
    /// The layouts of the vertex buffers.
    pub vertex_buffers_layout: Cow<'a, [VertexBufferLayoutDescriptor<'a>]>,
    /// Primitive assembly state.
    pub primitive_state: PrimitiveStateDescriptor,
    /// The color targets written by the fragment stage.
    pub color_target_states: Cow<'a, [ColorTargetStateDescriptor]>,
    /// The bind group layouts, in group index order.
    pub bind_group_layouts: Cow<'a, [BindGroupLayoutId]>,
}

/// An opaque handle to a compiled render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPipelineId(pub usize);
