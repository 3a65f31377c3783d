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

//! Concrete implementations of the `lumen-core` rendering contracts.
//!
//! * [`graphics::wgpu`] drives a real GPU through `wgpu`.
//! * [`graphics::software`] is a CPU reference device that runs the built-in
//!   shader programs exactly, used for numeric tests and headless runs
//!   without an adapter.
//! * [`present`] holds the frame presenters.

#![warn(missing_docs)]

pub mod graphics;
pub mod present;

pub use graphics::software::{SoftwareDevice, SoftwareDeviceStats};
pub use graphics::wgpu::{WgpuDevice, WgpuGraphicsContext};
pub use present::{NullPresenter, ReadbackPresenter};
