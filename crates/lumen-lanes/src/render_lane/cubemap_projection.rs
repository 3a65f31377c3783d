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

//! Projects an equirectangular panorama onto the six faces of a cube texture.

use super::{encode_quad_pass, program_pipeline};
use crate::LaneError;
use lumen_core::math::{LinearRgba, Vec3, FRAC_PI_2};
use lumen_core::renderer::resource::{
    BindGroup, BindGroupLayout, GpuTexture, Primitive, ProgramPipeline, ResourcePool, Sampler,
    TextureSpec, UniformBuffer,
};
use lumen_core::renderer::{
    AddressMode, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutEntry, FilterMode,
    GraphicsDevice, LoadOp, SamplerBindingType, SamplerDescriptor, ShaderProgram,
    ShaderStageFlags, TextureFormat, TextureId, TextureSampleType, TextureViewDimension,
    ViewRayUniforms, CUBE_FACE_COUNT,
};
use lumen_core::Camera;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// Format of the projected cube.
pub const CUBEMAP_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Viewing direction and right vector of each face, in `+X, -X, +Y, -Y, +Z, -Z` order.
///
/// Each face camera sits at the origin with `up = direction × right`.
pub const CUBE_FACE_BASES: [(Vec3, Vec3); CUBE_FACE_COUNT as usize] = [
    (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0)),
    (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
    (Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
    (Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)),
    (Vec3::new(0.0, 0.0, -1.0), Vec3::new(-1.0, 0.0, 0.0)),
];

/// The 90°, square camera that renders cube face `face`.
pub fn face_camera(face: usize) -> Option<Camera> {
    CUBE_FACE_BASES
        .get(face)
        .map(|&(direction, right)| Camera::from_basis(Vec3::ZERO, direction, right, FRAC_PI_2, 1.0))
}

/// When the projected cube is rendered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CubemapPolicy {
    /// Project on every request.
    #[default]
    RebuildEveryFrame,
    /// Project once per panorama and face size, then reuse the cube.
    BuildOnce,
}

#[derive(Debug)]
struct ProjectedCube {
    panorama: TextureId,
    face_size: u32,
    cube: GpuTexture,
}

/// A lane that renders a cube texture from an equirectangular panorama.
#[derive(Debug)]
pub struct CubemapProjectionLane {
    device: Arc<dyn GraphicsDevice>,
    pool: ResourcePool,
    quad: Primitive,
    layout: BindGroupLayout,
    pipeline: ProgramPipeline,
    sampler: Sampler,
    face_uniforms: Vec<UniformBuffer<ViewRayUniforms>>,
    policy: CubemapPolicy,
    projected: Option<ProjectedCube>,
    builds: usize,
}

impl CubemapProjectionLane {
    /// Creates the projection pipeline and one view uniform buffer per face.
    pub fn new(device: Arc<dyn GraphicsDevice>, policy: CubemapPolicy) -> Result<Self, LaneError> {
        let layout = BindGroupLayout::new(
            device.clone(),
            "equirect projection layout",
            &[
                BindGroupLayoutEntry::uniform(0, ShaderStageFlags::FRAGMENT),
                BindGroupLayoutEntry::texture(
                    1,
                    ShaderStageFlags::FRAGMENT,
                    TextureSampleType::Float { filterable: true },
                    TextureViewDimension::D2,
                ),
                BindGroupLayoutEntry::sampler(
                    2,
                    ShaderStageFlags::FRAGMENT,
                    SamplerBindingType::Filtering,
                ),
            ],
        )?;
        let pipeline = program_pipeline(
            &device,
            ShaderProgram::EquirectProjection,
            &layout,
            CUBEMAP_FORMAT,
        )?;
        let sampler = Sampler::new(
            device.clone(),
            &SamplerDescriptor {
                label: Some(Cow::Borrowed("panorama sampler")),
                address_mode_u: AddressMode::Repeat,
                address_mode_v: AddressMode::ClampToEdge,
                address_mode_w: AddressMode::ClampToEdge,
                mag_filter: FilterMode::Linear,
                min_filter: FilterMode::Linear,
            },
        )?;

        let mut face_uniforms = Vec::with_capacity(CUBE_FACE_COUNT as usize);
        for face in 0..CUBE_FACE_COUNT as usize {
            let camera = face_camera(face).ok_or(LaneError::SingularView(format!("face {face}")))?;
            let uniforms = ViewRayUniforms::from_view_proj(camera.view_projection())
                .ok_or_else(|| LaneError::SingularView(format!("face {face}")))?;
            face_uniforms.push(UniformBuffer::new(
                device.clone(),
                &format!("cube face {face} view"),
                &uniforms,
            )?);
        }
        let quad = Primitive::screen_quad(device.clone())?;

        log::info!("Cubemap projection lane ready ({policy:?})");
        Ok(Self {
            pool: ResourcePool::new(device.clone()),
            device,
            quad,
            layout,
            pipeline,
            sampler,
            face_uniforms,
            policy,
            projected: None,
            builds: 0,
        })
    }

    /// The cache policy.
    pub fn policy(&self) -> CubemapPolicy {
        self.policy
    }

    /// Changes the cache policy. Switching to `BuildOnce` keeps the current cube.
    pub fn set_policy(&mut self, policy: CubemapPolicy) {
        self.policy = policy;
    }

    /// How many times the panorama has actually been projected.
    pub fn build_count(&self) -> usize {
        self.builds
    }

    /// The most recently projected cube, if any.
    pub fn cubemap(&self) -> Option<&GpuTexture> {
        self.projected.as_ref().map(|p| &p.cube)
    }

    /// Drops the cached cube.
    pub fn invalidate(&mut self) {
        self.projected = None;
    }

    /// Returns a cube with `face_size`-texel faces showing `panorama`.
    ///
    /// Under [`CubemapPolicy::BuildOnce`] a cube already projected from the same
    /// panorama at the same size is returned without any GPU work.
    ///
    /// ## Errors
    /// * `LaneError::EmptySource` - If `face_size` is zero.
    /// * `LaneError::NotSampled` - If `panorama` has no shader view.
    /// * `LaneError::Resource` - If the cube or a pass could not be created. The
    ///   previous cube, if any, is kept.
    pub fn project(
        &mut self,
        panorama: &GpuTexture,
        face_size: u32,
    ) -> Result<&GpuTexture, LaneError> {
        let reuse = self.policy == CubemapPolicy::BuildOnce;
        let projected = match self.projected.take() {
            Some(p) if reuse && p.panorama == panorama.id() && p.face_size == face_size => p,
            previous => match self.render_faces(panorama, face_size) {
                Ok(cube) => {
                    self.builds += 1;
                    ProjectedCube {
                        panorama: panorama.id(),
                        face_size,
                        cube,
                    }
                }
                Err(e) => {
                    log::error!("Projecting panorama '{}' failed: {e}", panorama.label());
                    self.projected = previous;
                    return Err(e);
                }
            },
        };
        Ok(&self.projected.insert(projected).cube)
    }

    fn render_faces(&self, panorama: &GpuTexture, face_size: u32) -> Result<GpuTexture, LaneError> {
        if face_size == 0 {
            return Err(LaneError::EmptySource {
                label: "environment cube".to_string(),
            });
        }
        let panorama_view = panorama.sampled_view().ok_or_else(|| LaneError::NotSampled {
            label: panorama.label().to_string(),
        })?;

        let mut cube = self.pool.create_texture(&TextureSpec::cube_render_target(
            format!("{} cube", panorama.label()),
            face_size,
            CUBEMAP_FORMAT,
        ))?;

        let mut targets = Vec::with_capacity(self.face_uniforms.len());
        let mut groups = Vec::with_capacity(self.face_uniforms.len());
        for (face, uniforms) in self.face_uniforms.iter().enumerate() {
            targets.push(self.pool.create_render_target(&mut cube, face as u32)?);
            groups.push(BindGroup::new(
                self.device.clone(),
                &BindGroupDescriptor {
                    label: Some("equirect projection group"),
                    layout: self.layout.id(),
                    entries: &[
                        BindGroupEntry::buffer(0, uniforms.id()),
                        BindGroupEntry::texture_view(1, panorama_view),
                        BindGroupEntry::sampler(2, self.sampler.id()),
                    ],
                },
            )?);
        }

        let mut encoder = self.device.create_command_encoder(Some("cubemap projection"));
        for (target, group) in targets.iter().zip(&groups) {
            encode_quad_pass(
                encoder.as_mut(),
                "cube face",
                target,
                LoadOp::Clear(LinearRgba::BLACK),
                &self.pipeline,
                group,
                &self.quad,
            );
        }
        self.device.submit_command_buffer(encoder.finish())?;

        log::debug!(
            "Projected '{}' onto a {face_size}x{face_size} cube",
            panorama.label()
        );
        Ok(cube)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_face_up_vectors_follow_cube_convention() {
        let expected_up = [Vec3::Y, Vec3::Y, -Vec3::Z, Vec3::Z, Vec3::Y, Vec3::Y];
        for (face, up) in expected_up.into_iter().enumerate() {
            let camera = face_camera(face).unwrap();
            let actual = camera.up();
            assert_relative_eq!(actual.x, up.x);
            assert_relative_eq!(actual.y, up.y);
            assert_relative_eq!(actual.z, up.z);
        }
    }

    #[test]
    fn test_face_cameras_look_along_their_axis() {
        for (face, (direction, right)) in CUBE_FACE_BASES.iter().enumerate() {
            let camera = face_camera(face).unwrap();
            let forward = camera.forward();
            assert_relative_eq!(forward.dot(*direction), 1.0);
            assert_relative_eq!(camera.right().dot(*right), 1.0, epsilon = 1e-6);
            assert_relative_eq!(camera.aspect_ratio, 1.0);
            assert_relative_eq!(camera.fov_y_radians, FRAC_PI_2);
        }
        assert!(face_camera(6).is_none());
    }

    #[test]
    fn test_default_policy_rebuilds() {
        assert_eq!(CubemapPolicy::default(), CubemapPolicy::RebuildEveryFrame);
    }
}
