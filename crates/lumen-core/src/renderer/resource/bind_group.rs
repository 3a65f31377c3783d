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
    BindGroupDescriptor, BindGroupId, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindGroupLayoutId, GraphicsDevice, ResourceError, SamplerDescriptor, SamplerId,
};
use std::fmt;
use std::sync::Arc;

/// An owned bind group layout.
pub struct BindGroupLayout {
    device: Arc<dyn GraphicsDevice>,
    id: BindGroupLayoutId,
}

impl BindGroupLayout {
    /// Creates a layout from its entries.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        label: &str,
        entries: &[BindGroupLayoutEntry],
    ) -> Result<Self, ResourceError> {
        let id = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some(label),
            entries,
        })?;
        Ok(Self { device, id })
    }

    /// The backend handle.
    pub fn id(&self) -> BindGroupLayoutId {
        self.id
    }
}

impl fmt::Debug for BindGroupLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BindGroupLayout").field(&self.id).finish()
    }
}

impl Drop for BindGroupLayout {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_bind_group_layout(self.id) {
            log::warn!("Failed to destroy bind group layout {:?}: {e}", self.id);
        }
    }
}

/// An owned bind group.
pub struct BindGroup {
    device: Arc<dyn GraphicsDevice>,
    id: BindGroupId,
}

impl BindGroup {
    /// Creates a bind group.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        descriptor: &BindGroupDescriptor,
    ) -> Result<Self, ResourceError> {
        let id = device.create_bind_group(descriptor)?;
        Ok(Self { device, id })
    }

    /// The backend handle. Borrowed by render passes for the pass lifetime.
    pub fn id(&self) -> &BindGroupId {
        &self.id
    }
}

impl fmt::Debug for BindGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BindGroup").field(&self.id).finish()
    }
}

impl Drop for BindGroup {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_bind_group(self.id) {
            log::warn!("Failed to destroy bind group {:?}: {e}", self.id);
        }
    }
}

/// An owned sampler.
pub struct Sampler {
    device: Arc<dyn GraphicsDevice>,
    id: SamplerId,
}

impl Sampler {
    /// Creates a sampler.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        descriptor: &SamplerDescriptor,
    ) -> Result<Self, ResourceError> {
        let id = device.create_sampler(descriptor)?;
        Ok(Self { device, id })
    }

    /// The backend handle.
    pub fn id(&self) -> SamplerId {
        self.id
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sampler").field(&self.id).finish()
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_sampler(self.id) {
            log::warn!("Failed to destroy sampler {:?}: {e}", self.id);
        }
    }
}
