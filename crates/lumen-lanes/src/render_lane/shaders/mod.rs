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

//! WGSL sources of the built-in programs.
//!
//! Every program exports `vs_main` and `fs_main`, consumes the quad vertex layout
//! (`@location(0)` position, `@location(1)` uv) and reads its resources from bind
//! group 0.

use lumen_core::renderer::ShaderProgram;

/// Writes `ln(luminance + 1)` of the HDR frame. Binding 0: the HDR texture.
pub const LOG_LUMINANCE_WGSL: &str = include_str!("log_luminance.wgsl");

/// Area-weighted average of the previous pyramid level.
///
/// Binding 0: `ReduceUniforms`, binding 1: the previous level (`R32Float`, loaded, not sampled).
pub const LUMINANCE_REDUCE_WGSL: &str = include_str!("luminance_reduce.wgsl");

/// Exposure plus filmic curve.
///
/// Binding 0: `ToneMapUniforms`, binding 1: the HDR texture, binding 2: its sampler.
pub const TONE_MAP_WGSL: &str = include_str!("tone_map.wgsl");

/// Tone map thresholded on exposed luminance. Same bindings as [`TONE_MAP_WGSL`].
pub const BRIGHT_PASS_WGSL: &str = include_str!("bright_pass.wgsl");

/// Equirectangular panorama lookup along per-pixel view rays.
///
/// Binding 0: `ViewRayUniforms`, binding 1: the panorama, binding 2: its sampler.
pub const EQUIRECT_PROJECTION_WGSL: &str = include_str!("equirect_projection.wgsl");

/// Cube lookup along per-pixel view rays.
///
/// Binding 0: `ViewRayUniforms`, binding 1: the cube view, binding 2: its sampler.
pub const SKYBOX_WGSL: &str = include_str!("skybox.wgsl");

/// Uniform fill. Binding 0: `ColorUniforms`.
pub const SOLID_COLOR_WGSL: &str = include_str!("solid_color.wgsl");

/// The built-in WGSL source of `program`, or `None` for application programs.
pub fn program_source(program: ShaderProgram) -> Option<&'static str> {
    match program {
        ShaderProgram::LogLuminance => Some(LOG_LUMINANCE_WGSL),
        ShaderProgram::LuminanceReduce => Some(LUMINANCE_REDUCE_WGSL),
        ShaderProgram::ToneMap => Some(TONE_MAP_WGSL),
        ShaderProgram::BrightPass => Some(BRIGHT_PASS_WGSL),
        ShaderProgram::EquirectProjection => Some(EQUIRECT_PROJECTION_WGSL),
        ShaderProgram::Skybox => Some(SKYBOX_WGSL),
        ShaderProgram::SolidColor => Some(SOLID_COLOR_WGSL),
        ShaderProgram::Custom(_) => None,
    }
}
