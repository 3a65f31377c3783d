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

//! RAII owners of GPU objects.
//!
//! Every type in this module holds an `Arc<dyn GraphicsDevice>` and destroys the
//! objects it owns when dropped. Failures during destruction are logged, never
//! propagated.

mod bind_group;
mod pipeline;
mod pool;
mod primitive;
mod staging;
mod texture;
mod uniform_buffer;

pub use self::bind_group::{BindGroup, BindGroupLayout, Sampler};
pub use self::pipeline::{PipelineSpec, ProgramPipeline, FRAGMENT_ENTRY_POINT, VERTEX_ENTRY_POINT};
pub use self::pool::{ResourcePool, TextureAccess, TextureFaces, TextureSpec};
pub use self::primitive::{Primitive, QuadVertex};
pub use self::staging::StagingTexture;
pub use self::texture::{GpuTexture, RenderTarget};
pub use self::uniform_buffer::UniformBuffer;
