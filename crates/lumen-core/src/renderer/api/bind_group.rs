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

//! Defines data structures for bind groups and bind group layouts.
//!
//! Bind groups are the mechanism for binding resources (buffers, textures, samplers)
//! to shaders in a graphics pipeline.

use crate::renderer::api::{
    buffer::BufferId,
    common::ShaderStageFlags,
    texture::{SamplerId, TextureViewDimension, TextureViewId},
};

/// An opaque handle to a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutId(pub usize);

/// An opaque handle to a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupId(pub usize);

/// Describes a single binding slot of a bind group layout.
#[derive(Debug, Clone)]
pub struct BindGroupLayoutEntry {
    /// The binding index in the shader.
    pub binding: u32,
    /// The shader stages that can see this binding.
    pub visibility: ShaderStageFlags,
    /// The kind of resource bound at this slot.
    pub ty: BindingType,
}

impl BindGroupLayoutEntry {
    /// A uniform buffer binding.
    pub fn uniform(binding: u32, visibility: ShaderStageFlags) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::UniformBuffer,
        }
    }

    /// A sampled texture binding.
    pub fn texture(
        binding: u32,
        visibility: ShaderStageFlags,
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
    ) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Texture {
                sample_type,
                view_dimension,
            },
        }
    }

    /// A sampler binding.
    pub fn sampler(binding: u32, visibility: ShaderStageFlags, ty: SamplerBindingType) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Sampler(ty),
        }
    }
}

/// The sample type of a texture binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSampleType {
    /// Floating-point texels.
    Float {
        /// Whether the texture can be used with a filtering sampler.
        filterable: bool,
    },
}

/// The kind of sampler binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerBindingType {
    /// A sampler that may filter.
    Filtering,
    /// A sampler that must not filter.
    NonFiltering,
}

/// The type of resource bound at a layout slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// A uniform buffer.
    UniformBuffer,
    /// A sampled texture.
    Texture {
        /// The texel sample type.
        sample_type: TextureSampleType,
        /// The view dimension expected by the shader.
        view_dimension: TextureViewDimension,
    },
    /// A sampler.
    Sampler(SamplerBindingType),
}

/// Describes a bind group layout.
#[derive(Debug, Clone)]
pub struct BindGroupLayoutDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The binding slots.
    pub entries: &'a [BindGroupLayoutEntry],
}

/// A region of a buffer bound to a slot.
#[derive(Debug, Clone, Copy)]
pub struct BufferBinding {
    /// The buffer.
    pub buffer: BufferId,
    /// The byte offset of the bound region.
    pub offset: u64,
    /// The size of the bound region, or the rest of the buffer if `None`.
    pub size: Option<std::num::NonZeroU64>,
}

/// A resource bound in a bind group.
#[derive(Debug, Clone, Copy)]
pub enum BindingResource {
    /// A buffer region.
    Buffer(BufferBinding),
    /// A texture view.
    TextureView(TextureViewId),
    /// A sampler.
    Sampler(SamplerId),
}

/// One entry of a bind group.
#[derive(Debug, Clone, Copy)]
pub struct BindGroupEntry {
    /// The binding index in the shader.
    pub binding: u32,
    /// The bound resource.
    pub resource: BindingResource,
}

impl BindGroupEntry {
    /// Binds a whole buffer.
    pub fn buffer(binding: u32, buffer: BufferId) -> Self {
        Self {
            binding,
            resource: BindingResource::Buffer(BufferBinding {
                buffer,
                offset: 0,
                size: None,
            }),
        }
    }

    /// Binds a texture view.
    pub fn texture_view(binding: u32, view: TextureViewId) -> Self {
        Self {
            binding,
            resource: BindingResource::TextureView(view),
        }
    }

    /// Binds a sampler.
    pub fn sampler(binding: u32, sampler: SamplerId) -> Self {
        Self {
            binding,
            resource: BindingResource::Sampler(sampler),
        }
    }
}

/// Describes a bind group.
#[derive(Debug, Clone)]
pub struct BindGroupDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The layout the group conforms to.
    pub layout: BindGroupLayoutId,
    /// The bound resources.
    pub entries: &'a [BindGroupEntry],
}
