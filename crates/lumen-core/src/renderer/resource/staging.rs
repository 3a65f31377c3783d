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

use crate::math::{Extent2D, LinearRgba};
use crate::renderer::api::util::texel;
use crate::renderer::{BufferId, GraphicsDevice, ResourceError, TextureFormat};
use std::fmt;
use std::sync::Arc;

/// A CPU-readable copy of a texture face.
///
/// Backed by a `MAP_READ` buffer whose rows are padded to the copy alignment.
/// Keeping it a distinct type from [`GpuTexture`](super::GpuTexture) means a
/// texture is never both a render target and CPU-mapped.
pub struct StagingTexture {
    pub(super) device: Arc<dyn GraphicsDevice>,
    pub(super) buffer: BufferId,
    pub(super) extent: Extent2D,
    pub(super) format: TextureFormat,
    pub(super) bytes_per_row: u32,
}

impl StagingTexture {
    /// Size of the copied face.
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Texel format of the copy.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Blocks until the copy has completed and returns the tightly packed texel bytes.
    pub fn map_bytes(&self) -> Result<Vec<u8>, ResourceError> {
        let padded = self.device.read_buffer(self.buffer)?;
        let unpadded = (self.extent.width * self.format.bytes_per_pixel()) as usize;
        let rows = self.extent.height as usize;
        if padded.len() < self.bytes_per_row as usize * rows {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(texel::strip_row_padding(
            &padded,
            unpadded,
            self.bytes_per_row as usize,
            rows,
        ))
    }

    /// Blocks until the copy has completed and returns the decoded texels, row by row.
    pub fn map(&self) -> Result<Vec<LinearRgba>, ResourceError> {
        Ok(texel::decode_texels(self.format, &self.map_bytes()?))
    }
}

impl fmt::Debug for StagingTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingTexture")
            .field("buffer", &self.buffer)
            .field("extent", &self.extent)
            .field("format", &self.format)
            .finish()
    }
}

impl Drop for StagingTexture {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_buffer(self.buffer) {
            log::warn!("Failed to destroy staging buffer {:?}: {e}", self.buffer);
        }
    }
}
