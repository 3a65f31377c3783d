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

use crate::renderer::error::RenderError;
use crate::renderer::resource::GpuTexture;

/// Receives the finished, tone-mapped frame at the end of every frame.
///
/// Window swapchains, image writers and test readbacks all sit behind this trait.
pub trait Presenter: Send {
    /// Presents `frame`.
    ///
    /// ## Errors
    /// * `RenderError` - If the frame could not be handed over. The renderer logs the
    ///   error and carries on with the next frame.
    fn present(&mut self, frame: &GpuTexture) -> Result<(), RenderError>;
}
