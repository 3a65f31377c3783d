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

use super::pool::{TextureAccess, TextureFaces};
use crate::math::Extent2D;
use crate::renderer::{GraphicsDevice, TextureFormat, TextureId, TextureViewId};
use std::fmt;
use std::sync::Arc;

/// A GPU texture together with its shader view and render-target views.
///
/// Created by [`ResourcePool::create_texture`](super::ResourcePool::create_texture).
/// Textures are never resized; a new size means a new `GpuTexture`.
pub struct GpuTexture {
    pub(super) device: Arc<dyn GraphicsDevice>,
    pub(super) id: TextureId,
    pub(super) label: String,
    pub(super) extent: Extent2D,
    pub(super) format: TextureFormat,
    pub(super) faces: TextureFaces,
    pub(super) access: TextureAccess,
    pub(super) sampled_view: Option<TextureViewId>,
    pub(super) render_targets: Vec<RenderTarget>,
}

impl GpuTexture {
    /// The backend texture handle.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Width and height of one face.
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// The texel format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Single 2D texture or six-face cube.
    pub fn faces(&self) -> TextureFaces {
        self.faces
    }

    /// How the texture may be used.
    pub fn access(&self) -> TextureAccess {
        self.access
    }

    /// The view shaders sample through (`D2` or `Cube`), if the texture is sampled.
    pub fn sampled_view(&self) -> Option<TextureViewId> {
        self.sampled_view
    }

    /// The render target previously created for `face`, if any.
    pub fn render_target(&self, face: u32) -> Option<RenderTarget> {
        self.render_targets.iter().copied().find(|t| t.face == face)
    }

    /// Number of render-target views created over this texture.
    pub fn render_target_count(&self) -> usize {
        self.render_targets.len()
    }
}

impl fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuTexture")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("extent", &self.extent)
            .field("format", &self.format)
            .field("faces", &self.faces)
            .field("render_targets", &self.render_targets.len())
            .finish()
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        for target in self.render_targets.drain(..) {
            if let Err(e) = self.device.destroy_texture_view(target.view) {
                log::warn!("Failed to destroy render target view of '{}': {e}", self.label);
            }
        }
        if let Some(view) = self.sampled_view.take() {
            if let Err(e) = self.device.destroy_texture_view(view) {
                log::warn!("Failed to destroy sampled view of '{}': {e}", self.label);
            }
        }
        match self.device.destroy_texture(self.id) {
            Ok(()) => log::debug!("Destroyed texture '{}' ({:?})", self.label, self.id),
            Err(e) => log::warn!("Failed to destroy texture '{}': {e}", self.label),
        }
    }
}

/// A view over one face of a [`GpuTexture`] that a render pass can write to.
///
/// This is a plain handle; the view itself is owned and destroyed by the texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub(super) view: TextureViewId,
    pub(super) face: u32,
    pub(super) extent: Extent2D,
}

impl RenderTarget {
    /// The attachment view.
    pub fn view(&self) -> &TextureViewId {
        &self.view
    }

    /// The face (array layer) this target writes.
    pub fn face(&self) -> u32 {
        self.face
    }

    /// The size of the target.
    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}
