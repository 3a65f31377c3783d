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

//! A CPU reference implementation of the graphics device.
//!
//! [`SoftwareDevice`] records commands like a GPU backend and executes them on
//! submission with a small triangle rasterizer, evaluating each program in Rust.
//! It backs the numeric tests of the lanes and agents and can drive the sandbox
//! on machines without an adapter.

mod command;
mod device;
mod kernels;
mod raster;

pub use self::device::{SoftwareDevice, SoftwareDeviceStats};
