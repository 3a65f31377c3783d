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

//! Measures the log-average luminance of an HDR frame with a reduction pyramid.
//!
//! The frame is first converted to `ln(L + 1)` at full resolution, then reduced
//! through square power-of-two levels `2^n, 2^(n-1), …, 1` where
//! `n = ceil(log2(max(width, height)))`. The first reduction resamples the exact
//! source size into `2^n × 2^n`, so non-power-of-two and non-square frames need no
//! special casing. The 1×1 result is copied back and decoded with `exp(v) - 1`.
//!
//! Levels are allocated per call and released one level behind the pass that
//! reads them, so at most two pyramid textures are alive at any time.

use super::{program_pipeline, submit_quad_pass};
use crate::LaneError;
use lumen_core::math::Extent2D;
use lumen_core::renderer::resource::{
    BindGroup, BindGroupLayout, GpuTexture, Primitive, ProgramPipeline, ResourcePool, TextureSpec,
    UniformBuffer,
};
use lumen_core::renderer::{
    decode_log_luminance, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutEntry,
    GraphicsDevice, ReduceUniforms, ShaderProgram, ShaderStageFlags, TextureFormat,
    TextureSampleType, TextureViewDimension,
};
use std::sync::Arc;

/// Format of the log-luminance image and every pyramid level.
pub const LUMINANCE_FORMAT: TextureFormat = TextureFormat::R32Float;

/// The sequence of reduction levels for one source size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidPlan {
    source: Extent2D,
    top_level: u32,
}

impl PyramidPlan {
    /// Plans the pyramid for a `source`-sized frame. Returns `None` for an empty frame.
    pub fn new(source: Extent2D) -> Option<Self> {
        if source.is_empty() {
            return None;
        }
        let top_level = source.max_dimension().next_power_of_two().trailing_zeros();
        Some(Self { source, top_level })
    }

    /// The size of the frame being measured.
    pub fn source(&self) -> Extent2D {
        self.source
    }

    /// `n = ceil(log2(max(width, height)))`.
    pub fn top_level(&self) -> u32 {
        self.top_level
    }

    /// Number of reduce passes, `n + 1`. The log pass is not counted.
    pub fn reduction_passes(&self) -> usize {
        self.top_level as usize + 1
    }

    /// Level index `k` and side length `2^k` of every reduce target, largest first.
    pub fn levels(&self) -> impl Iterator<Item = (u32, u32)> {
        (0..=self.top_level).rev().map(|k| (k, 1u32 << k))
    }
}

/// The result of one luminance measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceMeasurement {
    /// Geometric-mean luminance of the frame (with the `+1` bias removed).
    pub luminance: f32,
    /// Number of reduce passes run.
    pub reduction_passes: usize,
}

/// A lane that turns an HDR frame into its mean luminance.
#[derive(Debug)]
pub struct LuminancePyramidLane {
    device: Arc<dyn GraphicsDevice>,
    pool: ResourcePool,
    quad: Primitive,
    log_layout: BindGroupLayout,
    log_pipeline: ProgramPipeline,
    reduce_layout: BindGroupLayout,
    reduce_pipeline: ProgramPipeline,
}

impl LuminancePyramidLane {
    /// Creates the two pipelines and the quad the lane draws with.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Result<Self, LaneError> {
        let level_entry = |binding| {
            BindGroupLayoutEntry::texture(
                binding,
                ShaderStageFlags::FRAGMENT,
                TextureSampleType::Float { filterable: false },
                TextureViewDimension::D2,
            )
        };
        let log_layout =
            BindGroupLayout::new(device.clone(), "log luminance layout", &[level_entry(0)])?;
        let reduce_layout = BindGroupLayout::new(
            device.clone(),
            "luminance reduce layout",
            &[
                BindGroupLayoutEntry::uniform(0, ShaderStageFlags::FRAGMENT),
                level_entry(1),
            ],
        )?;
        let log_pipeline = program_pipeline(
            &device,
            ShaderProgram::LogLuminance,
            &log_layout,
            LUMINANCE_FORMAT,
        )?;
        let reduce_pipeline = program_pipeline(
            &device,
            ShaderProgram::LuminanceReduce,
            &reduce_layout,
            LUMINANCE_FORMAT,
        )?;
        let quad = Primitive::screen_quad(device.clone())?;

        log::info!("Luminance pyramid lane ready");
        Ok(Self {
            pool: ResourcePool::new(device.clone()),
            device,
            quad,
            log_layout,
            log_pipeline,
            reduce_layout,
            reduce_pipeline,
        })
    }

    /// Measures the mean luminance of `source`.
    ///
    /// Blocks until the GPU has finished the whole pyramid.
    ///
    /// ## Errors
    /// * `LaneError::EmptySource` - If `source` has a zero dimension.
    /// * `LaneError::NotSampled` - If `source` has no shader view.
    /// * `LaneError::Resource` - If a level cannot be created or a pass fails. Every
    ///   level allocated so far has been released when this is returned.
    pub fn measure(&self, source: &GpuTexture) -> Result<LuminanceMeasurement, LaneError> {
        let plan = PyramidPlan::new(source.extent()).ok_or_else(|| LaneError::EmptySource {
            label: source.label().to_string(),
        })?;
        let source_view = source.sampled_view().ok_or_else(|| LaneError::NotSampled {
            label: source.label().to_string(),
        })?;

        let mut level = self
            .pool
            .create_texture(&TextureSpec::render_target("log luminance", plan.source(), LUMINANCE_FORMAT))?;
        {
            let target = self.pool.create_render_target(&mut level, 0)?;
            let group = BindGroup::new(
                self.device.clone(),
                &BindGroupDescriptor {
                    label: Some("log luminance group"),
                    layout: self.log_layout.id(),
                    entries: &[BindGroupEntry::texture_view(0, source_view)],
                },
            )?;
            submit_quad_pass(
                &self.device,
                "log luminance",
                &target,
                &self.log_pipeline,
                &group,
                &self.quad,
            )?;
        }

        for (k, size) in plan.levels() {
            level = self.reduce(&level, k, size)?;
        }

        let mut encoder = self.device.create_command_encoder(Some("luminance readback"));
        let staging = self.pool.create_staging_copy(encoder.as_mut(), &level)?;
        self.device.submit_command_buffer(encoder.finish())?;
        drop(level);

        // The only point where the CPU waits for the GPU during a frame.
        let texels = staging.map()?;
        debug_assert!(
            staging.extent() == Extent2D::new(1, 1) && texels.len() == 1,
            "pyramid did not end at 1x1"
        );
        let encoded = texels.first().ok_or(LaneError::EmptyReadback)?.r;
        let luminance = decode_log_luminance(encoded);

        log::trace!(
            "Measured luminance {luminance} over {}x{} in {} passes",
            plan.source().width,
            plan.source().height,
            plan.reduction_passes()
        );
        Ok(LuminanceMeasurement {
            luminance,
            reduction_passes: plan.reduction_passes(),
        })
    }

    /// Runs one reduce pass from `source` into a new `size × size` level.
    ///
    /// The uniforms and bind group of the pass are released once it is submitted;
    /// the caller releases `source` by replacing it with the returned level.
    fn reduce(&self, source: &GpuTexture, k: u32, size: u32) -> Result<GpuTexture, LaneError> {
        let source_view = source.sampled_view().ok_or_else(|| LaneError::NotSampled {
            label: source.label().to_string(),
        })?;
        let extent = Extent2D::new(size, size);
        let mut level = self.pool.create_texture(&TextureSpec::render_target(
            format!("luminance level {k}"),
            extent,
            LUMINANCE_FORMAT,
        ))?;
        let target = self.pool.create_render_target(&mut level, 0)?;
        let src = source.extent();
        let uniforms = UniformBuffer::new(
            self.device.clone(),
            "luminance reduce uniforms",
            &ReduceUniforms {
                src_size: [src.width, src.height],
                dst_size: [size, size],
            },
        )?;
        let group = BindGroup::new(
            self.device.clone(),
            &BindGroupDescriptor {
                label: Some("luminance reduce group"),
                layout: self.reduce_layout.id(),
                entries: &[
                    BindGroupEntry::buffer(0, uniforms.id()),
                    BindGroupEntry::texture_view(1, source_view),
                ],
            },
        )?;
        submit_quad_pass(
            &self.device,
            "luminance reduce",
            &target,
            &self.reduce_pipeline,
            &group,
            &self.quad,
        )?;
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_for_power_of_two_square() {
        let plan = PyramidPlan::new(Extent2D::new(1024, 1024)).unwrap();
        assert_eq!(plan.top_level(), 10);
        assert_eq!(plan.reduction_passes(), 11);
        let sizes: Vec<u32> = plan.levels().map(|(_, size)| size).collect();
        assert_eq!(sizes.first(), Some(&1024));
        assert_eq!(sizes.last(), Some(&1));
    }

    #[test]
    fn test_plan_uses_larger_side_of_non_power_of_two_frame() {
        let plan = PyramidPlan::new(Extent2D::new(300, 200)).unwrap();
        assert_eq!(plan.top_level(), 9);
        assert_eq!(plan.levels().next(), Some((9, 512)));
        assert_eq!(PyramidPlan::new(Extent2D::new(3, 17)).unwrap().top_level(), 5);
    }

    #[test]
    fn test_single_pixel_plan_has_one_pass() {
        let plan = PyramidPlan::new(Extent2D::new(1, 1)).unwrap();
        assert_eq!(plan.top_level(), 0);
        assert_eq!(plan.levels().collect::<Vec<_>>(), vec![(0, 1)]);
    }

    #[test]
    fn test_empty_frame_has_no_plan() {
        assert!(PyramidPlan::new(Extent2D::new(0, 16)).is_none());
        assert!(PyramidPlan::new(Extent2D::new(16, 0)).is_none());
    }
}
