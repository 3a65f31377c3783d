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

//! The render agent runs the frame: scene units, luminance measurement,
//! exposure adaptation, tone mapping and presentation.
//!
//! Lanes do the GPU work. The agent owns the long-lived targets, the exposure
//! state and the environment cube, and decides what runs each frame from its
//! [`RenderSettings`].

mod agent;
mod scene;
mod settings;

pub use agent::*;
pub use scene::*;
pub use settings::*;
