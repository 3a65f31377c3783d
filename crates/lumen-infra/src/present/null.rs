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

use lumen_core::renderer::resource::GpuTexture;
use lumen_core::renderer::{Presenter, RenderError};

/// A presenter that discards frames and counts them.
#[derive(Debug, Default)]
pub struct NullPresenter {
    frames_presented: u64,
}

impl NullPresenter {
    /// Creates a presenter that has seen no frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames received so far.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl Presenter for NullPresenter {
    fn present(&mut self, _frame: &GpuTexture) -> Result<(), RenderError> {
        self.frames_presented += 1;
        Ok(())
    }
}
