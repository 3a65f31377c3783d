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

use crate::renderer::{BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, ResourceError};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A GPU uniform buffer holding exactly one `T`.
///
/// `update` overwrites the whole value; the last write before a submission is
/// what every draw in that submission sees, so callers that need different values
/// per draw use one buffer per draw.
pub struct UniformBuffer<T: bytemuck::Pod> {
    device: Arc<dyn GraphicsDevice>,
    buffer: BufferId,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> UniformBuffer<T> {
    /// Creates the buffer initialized with `value`.
    ///
    /// # Arguments
    ///
    /// * `device` - The graphics device to allocate on.
    /// * `label` - The label for the buffer.
    /// * `value` - The initial contents.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        label: &str,
        value: &T,
    ) -> Result<Self, ResourceError> {
        let buffer = device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Borrowed(label)),
                size: std::mem::size_of::<T>() as u64,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                mapped_at_creation: false,
            },
            bytemuck::bytes_of(value),
        )?;
        Ok(Self {
            device,
            buffer,
            _marker: PhantomData,
        })
    }

    /// Overwrites the buffer contents.
    pub fn update(&self, value: &T) -> Result<(), ResourceError> {
        self.device
            .write_buffer(self.buffer, 0, bytemuck::bytes_of(value))
    }

    /// The backend buffer handle.
    pub fn id(&self) -> BufferId {
        self.buffer
    }
}

impl<T: bytemuck::Pod> fmt::Debug for UniformBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformBuffer")
            .field("buffer", &self.buffer)
            .field("size", &std::mem::size_of::<T>())
            .finish()
    }
}

impl<T: bytemuck::Pod> Drop for UniformBuffer<T> {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_buffer(self.buffer) {
            log::warn!("Failed to destroy uniform buffer {:?}: {e}", self.buffer);
        }
    }
}
