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

use super::staging::StagingTexture;
use super::texture::{GpuTexture, RenderTarget};
use crate::lumen_bitflags;
use crate::math::{Extent2D, Extent3D, LinearRgba, Origin3D};
use crate::renderer::api::util::texel;
use crate::renderer::{
    BufferDescriptor, BufferUsage, CommandEncoder, GraphicsDevice, ResourceError, TextureDescriptor,
    TextureFormat, TextureToBufferCopy, TextureUsage, TextureViewDescriptor, CUBE_FACE_COUNT,
};
use std::borrow::Cow;
use std::sync::Arc;

lumen_bitflags! {
    /// How a texture created through the pool may be used.
    pub struct TextureAccess: u32 {
        /// Shaders may sample it; the pool creates its shader view.
        const SAMPLED = 1 << 0;
        /// Render passes may write it through a [`RenderTarget`].
        const RENDER_TARGET = 1 << 1;
        /// It may be copied out (staging copies).
        const COPY_SRC = 1 << 2;
        /// It may be written from the CPU.
        const COPY_DST = 1 << 3;
    }
}

impl TextureAccess {
    fn to_usage(self) -> TextureUsage {
        let mut usage = TextureUsage::EMPTY;
        if self.contains(Self::SAMPLED) {
            usage.insert(TextureUsage::TEXTURE_BINDING);
        }
        if self.contains(Self::RENDER_TARGET) {
            usage.insert(TextureUsage::RENDER_ATTACHMENT);
        }
        if self.contains(Self::COPY_SRC) {
            usage.insert(TextureUsage::COPY_SRC);
        }
        if self.contains(Self::COPY_DST) {
            usage.insert(TextureUsage::COPY_DST);
        }
        usage
    }
}

/// Whether a texture is a single 2D image or a six-face cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFaces {
    /// One 2D face.
    Single,
    /// Six faces in the order `+X, -X, +Y, -Y, +Z, -Z`.
    Cube,
}

impl TextureFaces {
    /// The number of array layers.
    pub fn count(&self) -> u32 {
        match self {
            TextureFaces::Single => 1,
            TextureFaces::Cube => CUBE_FACE_COUNT,
        }
    }
}

/// Everything needed to create a [`GpuTexture`].
#[derive(Debug, Clone)]
pub struct TextureSpec {
    /// Debug label.
    pub label: String,
    /// Width of one face in texels.
    pub width: u32,
    /// Height of one face in texels.
    pub height: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// Single or cube.
    pub faces: TextureFaces,
    /// Allowed uses.
    pub access: TextureAccess,
}

impl TextureSpec {
    /// A single-face texture that can be rendered to and then sampled.
    pub fn render_target(label: impl Into<String>, extent: Extent2D, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width: extent.width,
            height: extent.height,
            format,
            faces: TextureFaces::Single,
            access: TextureAccess::SAMPLED | TextureAccess::RENDER_TARGET | TextureAccess::COPY_SRC,
        }
    }

    /// A cube texture whose faces can be rendered to and which is sampled as a cube.
    pub fn cube_render_target(label: impl Into<String>, face_size: u32, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width: face_size,
            height: face_size,
            format,
            faces: TextureFaces::Cube,
            access: TextureAccess::SAMPLED | TextureAccess::RENDER_TARGET | TextureAccess::COPY_SRC,
        }
    }

    /// A sampled texture filled from the CPU.
    pub fn sampled(label: impl Into<String>, extent: Extent2D, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width: extent.width,
            height: extent.height,
            format,
            faces: TextureFaces::Single,
            access: TextureAccess::SAMPLED | TextureAccess::COPY_DST,
        }
    }

    /// The size of one face.
    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}

/// Creates textures, render targets and staging copies on one device.
///
/// The pool itself holds no resources; every object it returns owns its GPU
/// memory and releases it on drop.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    device: Arc<dyn GraphicsDevice>,
}

impl ResourcePool {
    /// Creates a pool that allocates on `device`.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self { device }
    }

    /// The device this pool allocates on.
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    /// Creates a texture. Sampled textures get their shader view immediately.
    ///
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the spec has a zero dimension.
    /// * `ResourceError` - If the backend fails to create the texture or its view.
    pub fn create_texture(&self, spec: &TextureSpec) -> Result<GpuTexture, ResourceError> {
        if spec.width == 0 || spec.height == 0 {
            return Err(ResourceError::OutOfBounds);
        }

        let id = self.device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed(spec.label.as_str())),
            size: Extent3D::new(spec.width, spec.height, spec.faces.count()),
            format: spec.format,
            usage: spec.access.to_usage(),
        })?;

        // From here on the texture is released by `GpuTexture::drop` if anything fails.
        let mut texture = GpuTexture {
            device: self.device.clone(),
            id,
            label: spec.label.clone(),
            extent: spec.extent(),
            format: spec.format,
            faces: spec.faces,
            access: spec.access,
            sampled_view: None,
            render_targets: Vec::new(),
        };

        if spec.access.contains(TextureAccess::SAMPLED) {
            let label = Cow::Owned(format!("{} view", spec.label));
            let descriptor = match spec.faces {
                TextureFaces::Single => TextureViewDescriptor::layer(Some(label), 0),
                TextureFaces::Cube => TextureViewDescriptor::cube(Some(label)),
            };
            texture.sampled_view = Some(self.device.create_texture_view(id, &descriptor)?);
        }

        log::trace!(
            "Created texture '{}' {}x{} {:?} {:?}",
            spec.label,
            spec.width,
            spec.height,
            spec.format,
            spec.faces
        );
        Ok(texture)
    }

    /// Creates (or returns the existing) render target over one face of `texture`.
    ///
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `face` is not a face of the texture.
    /// * `ResourceError::InvalidHandle` - If the texture was not created as a render target.
    pub fn create_render_target(
        &self,
        texture: &mut GpuTexture,
        face: u32,
    ) -> Result<RenderTarget, ResourceError> {
        if face >= texture.faces.count() {
            return Err(ResourceError::OutOfBounds);
        }
        if !texture.access.contains(TextureAccess::RENDER_TARGET) {
            return Err(ResourceError::InvalidHandle);
        }
        if let Some(existing) = texture.render_target(face) {
            return Ok(existing);
        }

        let label = Cow::Owned(format!("{} face {face}", texture.label));
        let view = self
            .device
            .create_texture_view(texture.id, &TextureViewDescriptor::layer(Some(label), face))?;
        let target = RenderTarget {
            view,
            face,
            extent: texture.extent,
        };
        texture.render_targets.push(target);
        Ok(target)
    }

    /// Allocates a CPU-readable copy of face 0 of `texture` and records the copy on `encoder`.
    ///
    /// The copy happens when the encoder's command buffer executes;
    /// [`StagingTexture::map`] waits for it.
    pub fn create_staging_copy(
        &self,
        encoder: &mut dyn CommandEncoder,
        texture: &GpuTexture,
    ) -> Result<StagingTexture, ResourceError> {
        if !texture.access.contains(TextureAccess::COPY_SRC) {
            return Err(ResourceError::InvalidHandle);
        }
        let extent = texture.extent;
        let bytes_per_row = texel::padded_bytes_per_row(extent.width, texture.format);
        let buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!("{} staging", texture.label))),
            size: u64::from(bytes_per_row) * u64::from(extent.height),
            usage: BufferUsage::MAP_READ | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        })?;
        let staging = StagingTexture {
            device: self.device.clone(),
            buffer,
            extent,
            format: texture.format,
            bytes_per_row,
        };

        encoder.copy_texture_to_buffer(&TextureToBufferCopy {
            texture: texture.id,
            layer: 0,
            buffer,
            bytes_per_row,
            size: extent,
        });
        Ok(staging)
    }

    /// Creates a texture and fills every face from `texels` (face-major, rows top to bottom).
    ///
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `texels` does not cover the texture exactly.
    pub fn upload_texture(
        &self,
        spec: &TextureSpec,
        texels: &[LinearRgba],
    ) -> Result<GpuTexture, ResourceError> {
        let faces = spec.faces.count();
        let expected = spec.width as usize * spec.height as usize * faces as usize;
        if texels.len() != expected {
            return Err(ResourceError::OutOfBounds);
        }

        let mut spec = spec.clone();
        spec.access.insert(TextureAccess::COPY_DST);
        let texture = self.create_texture(&spec)?;

        let bytes = texel::encode_texels(spec.format, texels);
        self.device.write_texture(
            texture.id,
            &bytes,
            Some(spec.width * spec.format.bytes_per_pixel()),
            Origin3D::ZERO,
            Extent3D::new(spec.width, spec.height, faces),
        )?;
        Ok(texture)
    }
}
