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

//! GPU passes that run every frame on the hot path.
//!
//! Each lane owns its pipelines and layouts and allocates the rest of its
//! resources per call through a [`ResourcePool`](lumen_core::renderer::resource::ResourcePool).
//! Lanes never decide *when* they run; the render agent sequences them.

#![warn(missing_docs)]

pub mod error;
pub mod render_lane;

pub use error::LaneError;
pub use render_lane::*;
