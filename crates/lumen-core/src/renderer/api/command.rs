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

//! Defines data structures used for recording and describing GPU commands.

use crate::math::{Extent2D, LinearRgba};
use crate::renderer::{BufferId, TextureId, TextureViewId};

/// An opaque handle to a recorded command buffer that is ready for submission.
///
/// This ID is returned by [`CommandEncoder::finish`](crate::renderer::CommandEncoder::finish)
/// and consumed by [`GraphicsDevice::submit_command_buffer`](crate::renderer::GraphicsDevice::submit_command_buffer).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub u64);

/// Describes the operation to perform on an attachment at the start of a render pass.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadOp<V> {
    /// The existing contents of the attachment will be loaded into the pass.
    Load,
    /// The attachment will be cleared to the specified value before the pass begins.
    Clear(V),
}

/// Describes the operation to perform on an attachment at the end of a render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreOp {
    /// The results of the render pass will be stored to the attachment's memory.
    Store,
    /// The results of the render pass will be discarded.
    Discard,
}

/// Defines the load and store operations for a single render pass attachment.
#[derive(Debug, Clone)]
pub struct Operations<V> {
    /// The operation to perform at the beginning of the pass.
    pub load: LoadOp<V>,
    /// The operation to perform at the end of the pass.
    pub store: StoreOp,
}

impl<V> Operations<V> {
    /// Clear to `value`, then store.
    pub fn clear(value: V) -> Self {
        Self {
            load: LoadOp::Clear(value),
            store: StoreOp::Store,
        }
    }

    /// Keep the existing contents, then store.
    pub fn load() -> Self {
        Self {
            load: LoadOp::Load,
            store: StoreOp::Store,
        }
    }
}

/// A description of a single color attachment for a render pass.
#[derive(Debug)]
pub struct RenderPassColorAttachment<'a> {
    /// The [`TextureViewId`] that will be rendered to.
    pub view: &'a TextureViewId,
    /// The load and store operations for this color attachment.
    pub ops: Operations<LinearRgba>,
}

/// A descriptor for a render pass.
#[derive(Debug, Default)]
pub struct RenderPassDescriptor<'a> {
    /// An optional debug label for the render pass.
    pub label: Option<&'a str>,
    /// A slice of color attachments to be used in the pass.
    pub color_attachments: &'a [RenderPassColorAttachment<'a>],
}

/// Describes a texture-to-buffer copy of one array layer.
///
/// Rows in the destination buffer are `bytes_per_row` apart, which must be a
/// multiple of [`COPY_BYTES_PER_ROW_ALIGNMENT`](crate::renderer::api::util::texel::COPY_BYTES_PER_ROW_ALIGNMENT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureToBufferCopy {
    /// The source texture.
    pub texture: TextureId,
    /// The array layer (cube face) to copy.
    pub layer: u32,
    /// The destination buffer.
    pub buffer: BufferId,
    /// The padded row pitch of the destination.
    pub bytes_per_row: u32,
    /// The size of the copied region, starting at the texture origin.
    pub size: Extent2D,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_op_variants() {
        let clear_color: LoadOp<LinearRgba> = LoadOp::Clear(LinearRgba::new(1.0, 0.5, 0.0, 1.0));
        assert!(matches!(clear_color, LoadOp::Clear(_)));

        let load: LoadOp<LinearRgba> = LoadOp::Load;
        assert!(matches!(load, LoadOp::Load));
    }

    #[test]
    fn test_operations_helpers() {
        let ops = Operations::clear(LinearRgba::BLACK);
        assert_eq!(ops.load, LoadOp::Clear(LinearRgba::BLACK));
        assert_eq!(ops.store, StoreOp::Store);
        assert_eq!(Operations::<LinearRgba>::load().load, LoadOp::Load);
    }

    #[test]
    fn test_render_pass_descriptor() {
        let view_id = TextureViewId(1);
        let color_attachment = RenderPassColorAttachment {
            view: &view_id,
            ops: Operations::clear(LinearRgba::BLACK),
        };
        let descriptor = RenderPassDescriptor {
            label: Some("Test Pass"),
            color_attachments: std::slice::from_ref(&color_attachment),
        };
        assert_eq!(descriptor.label, Some("Test Pass"));
        assert_eq!(descriptor.color_attachments.len(), 1);
        assert!(RenderPassDescriptor::default().color_attachments.is_empty());
    }
}
