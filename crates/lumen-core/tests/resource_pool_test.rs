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

use lumen_core::math::{Extent2D, Extent3D, LinearRgba, Origin3D};
use lumen_core::renderer::api::*;
use lumen_core::renderer::resource::{
    Primitive, ResourcePool, TextureAccess, TextureFaces, TextureSpec, UniformBuffer,
};
use lumen_core::renderer::traits::{CommandEncoder, GraphicsDevice, RenderPass};
use lumen_core::renderer::ResourceError;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Tracks live objects so tests can check that RAII owners release everything.
#[derive(Debug, Default)]
struct TrackingDevice {
    next_id: AtomicUsize,
    textures: Mutex<HashMap<usize, TextureDescriptor<'static>>>,
    views: Mutex<HashMap<usize, (usize, TextureViewDimension, u32)>>,
    buffers: Mutex<HashSet<usize>>,
    copies: Mutex<Vec<TextureToBufferCopy>>,
    texture_writes: Mutex<Vec<(usize, usize, Extent3D)>>,
}

impl TrackingDevice {
    fn next(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn live_textures(&self) -> usize {
        self.textures.lock().unwrap().len()
    }

    fn live_views(&self) -> usize {
        self.views.lock().unwrap().len()
    }

    fn live_buffers(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }
}

struct NullRenderPass;

impl RenderPass<'_> for NullRenderPass {
    fn set_pipeline(&mut self, _pipeline: &RenderPipelineId) {}
    fn set_bind_group(&mut self, _index: u32, _bind_group: &BindGroupId) {}
    fn set_vertex_buffer(&mut self, _slot: u32, _buffer: &BufferId, _offset: u64) {}
    fn set_index_buffer(&mut self, _buffer: &BufferId, _offset: u64, _index_format: IndexFormat) {}
    fn draw(&mut self, _vertices: Range<u32>, _instances: Range<u32>) {}
    fn draw_indexed(&mut self, _indices: Range<u32>, _base_vertex: i32, _instances: Range<u32>) {}
}

struct RecordingEncoder {
    device: Arc<TrackingDevice>,
}

impl CommandEncoder for RecordingEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        _descriptor: &RenderPassDescriptor<'encoder>,
    ) -> Box<dyn RenderPass<'encoder> + 'encoder> {
        Box::new(NullRenderPass)
    }

    fn copy_texture_to_buffer(&mut self, copy: &TextureToBufferCopy) {
        self.device.copies.lock().unwrap().push(*copy);
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        CommandBufferId(0)
    }
}

#[derive(Debug)]
struct SharedDevice(Arc<TrackingDevice>);

impl GraphicsDevice for SharedDevice {
    fn create_shader_module(&self, _d: &ShaderModuleDescriptor) -> Result<ShaderModuleId, ResourceError> {
        Ok(ShaderModuleId(self.0.next()))
    }
    fn destroy_shader_module(&self, _id: ShaderModuleId) -> Result<(), ResourceError> {
        Ok(())
    }
    fn create_bind_group_layout(
        &self,
        _d: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        Ok(BindGroupLayoutId(self.0.next()))
    }
    fn destroy_bind_group_layout(&self, _id: BindGroupLayoutId) -> Result<(), ResourceError> {
        Ok(())
    }
    fn create_bind_group(&self, _d: &BindGroupDescriptor) -> Result<BindGroupId, ResourceError> {
        Ok(BindGroupId(self.0.next()))
    }
    fn destroy_bind_group(&self, _id: BindGroupId) -> Result<(), ResourceError> {
        Ok(())
    }
    fn create_render_pipeline(
        &self,
        _d: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        Ok(RenderPipelineId(self.0.next()))
    }
    fn destroy_render_pipeline(&self, _id: RenderPipelineId) -> Result<(), ResourceError> {
        Ok(())
    }
    fn create_buffer(&self, _d: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = self.0.next();
        self.0.buffers.lock().unwrap().insert(id);
        Ok(BufferId(id))
    }
    fn create_buffer_with_data(
        &self,
        d: &BufferDescriptor,
        _data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        self.create_buffer(d)
    }
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        if self.0.buffers.lock().unwrap().remove(&id.0) {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }
    fn write_buffer(&self, _id: BufferId, _offset: u64, _data: &[u8]) -> Result<(), ResourceError> {
        Ok(())
    }
    fn read_buffer(&self, _id: BufferId) -> Result<Vec<u8>, ResourceError> {
        Err(ResourceError::NotFound)
    }
    fn create_texture(&self, d: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let id = self.0.next();
        let owned = TextureDescriptor {
            label: d.label.as_ref().map(|l| std::borrow::Cow::Owned(l.to_string())),
            size: d.size,
            format: d.format,
            usage: d.usage,
        };
        self.0.textures.lock().unwrap().insert(id, owned);
        Ok(TextureId(id))
    }
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        self.0
            .textures
            .lock()
            .unwrap()
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }
    fn write_texture(
        &self,
        texture_id: TextureId,
        data: &[u8],
        _bytes_per_row: Option<u32>,
        _offset: Origin3D,
        size: Extent3D,
    ) -> Result<(), ResourceError> {
        self.0
            .texture_writes
            .lock()
            .unwrap()
            .push((texture_id.0, data.len(), size));
        Ok(())
    }
    fn create_texture_view(
        &self,
        texture_id: TextureId,
        d: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        let id = self.0.next();
        self.0
            .views
            .lock()
            .unwrap()
            .insert(id, (texture_id.0, d.dimension, d.base_array_layer));
        Ok(TextureViewId(id))
    }
    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        self.0
            .views
            .lock()
            .unwrap()
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }
    fn create_sampler(&self, _d: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        Ok(SamplerId(self.0.next()))
    }
    fn destroy_sampler(&self, _id: SamplerId) -> Result<(), ResourceError> {
        Ok(())
    }
    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(RecordingEncoder {
            device: self.0.clone(),
        })
    }
    fn submit_command_buffer(&self, _command_buffer: CommandBufferId) -> Result<(), ResourceError> {
        Ok(())
    }
    fn get_adapter_info(&self) -> RendererAdapterInfo {
        RendererAdapterInfo::default()
    }
}

fn setup() -> (Arc<TrackingDevice>, ResourcePool) {
    let tracking = Arc::new(TrackingDevice::default());
    let device: Arc<dyn GraphicsDevice> = Arc::new(SharedDevice(tracking.clone()));
    (tracking, ResourcePool::new(device))
}

#[test]
fn sampled_texture_gets_one_view_and_releases_it() {
    let (tracking, pool) = setup();
    let spec = TextureSpec::render_target("hdr", Extent2D::new(8, 4), TextureFormat::Rgba16Float);
    {
        let texture = pool.create_texture(&spec).unwrap();
        assert!(texture.sampled_view().is_some());
        assert_eq!(tracking.live_textures(), 1);
        assert_eq!(tracking.live_views(), 1);
    }
    assert_eq!(tracking.live_textures(), 0);
    assert_eq!(tracking.live_views(), 0);
}

#[test]
fn cube_texture_has_six_layers_and_a_cube_view() {
    let (tracking, pool) = setup();
    let mut cube = pool
        .create_texture(&TextureSpec::cube_render_target("env", 16, TextureFormat::Rgba16Float))
        .unwrap();

    let size = tracking.textures.lock().unwrap()[&cube.id().0].size;
    assert_eq!(size, Extent3D::new(16, 16, 6));
    let view = cube.sampled_view().unwrap();
    assert_eq!(tracking.views.lock().unwrap()[&view.0].1, TextureViewDimension::Cube);

    let mut seen = HashSet::new();
    for face in 0..6 {
        let target = pool.create_render_target(&mut cube, face).unwrap();
        assert_eq!(target.face(), face);
        assert!(seen.insert(*target.view()));
        assert_eq!(tracking.views.lock().unwrap()[&target.view().0].2, face);
    }
    assert_eq!(cube.render_target_count(), 6);
    assert_eq!(tracking.live_views(), 7);

    drop(cube);
    assert_eq!(tracking.live_views(), 0);
    assert_eq!(tracking.live_textures(), 0);
}

#[test]
fn render_target_face_out_of_range_is_rejected() {
    let (_tracking, pool) = setup();
    let mut texture = pool
        .create_texture(&TextureSpec::render_target("lum", Extent2D::new(4, 4), TextureFormat::R32Float))
        .unwrap();
    assert!(matches!(
        pool.create_render_target(&mut texture, 1),
        Err(ResourceError::OutOfBounds)
    ));
    let first = pool.create_render_target(&mut texture, 0).unwrap();
    let again = pool.create_render_target(&mut texture, 0).unwrap();
    assert_eq!(first, again);
    assert_eq!(texture.render_target_count(), 1);
}

#[test]
fn non_renderable_texture_cannot_get_a_render_target() {
    let (_tracking, pool) = setup();
    let mut texture = pool
        .create_texture(&TextureSpec::sampled("pano", Extent2D::new(4, 2), TextureFormat::Rgba16Float))
        .unwrap();
    assert!(matches!(
        pool.create_render_target(&mut texture, 0),
        Err(ResourceError::InvalidHandle)
    ));
}

#[test]
fn zero_sized_texture_is_rejected() {
    let (tracking, pool) = setup();
    let spec = TextureSpec::render_target("empty", Extent2D::new(0, 16), TextureFormat::R32Float);
    assert!(matches!(pool.create_texture(&spec), Err(ResourceError::OutOfBounds)));
    assert_eq!(tracking.live_textures(), 0);
}

#[test]
fn staging_copy_records_padded_copy_and_releases_buffer() {
    let (tracking, pool) = setup();
    let texture = pool
        .create_texture(&TextureSpec::render_target("lum", Extent2D::new(1, 1), TextureFormat::R32Float))
        .unwrap();
    let mut encoder = pool.device().create_command_encoder(Some("copy"));
    let staging = pool.create_staging_copy(encoder.as_mut(), &texture).unwrap();
    assert_eq!(staging.extent(), Extent2D::new(1, 1));
    assert_eq!(tracking.live_buffers(), 1);

    let copies = tracking.copies.lock().unwrap().clone();
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].texture, texture.id());
    assert_eq!(copies[0].layer, 0);
    assert_eq!(copies[0].bytes_per_row, 256);

    drop(staging);
    assert_eq!(tracking.live_buffers(), 0);
}

#[test]
fn upload_texture_checks_texel_count_and_writes_every_face() {
    let (tracking, pool) = setup();
    let mut spec = TextureSpec::sampled("cube", Extent2D::new(2, 2), TextureFormat::Rgba32Float);
    spec.faces = TextureFaces::Cube;

    let short = vec![LinearRgba::WHITE; 4];
    assert!(matches!(pool.upload_texture(&spec, &short), Err(ResourceError::OutOfBounds)));

    let texels = vec![LinearRgba::WHITE; 24];
    let texture = pool.upload_texture(&spec, &texels).unwrap();
    assert!(texture.access().contains(TextureAccess::COPY_DST));
    let writes = tracking.texture_writes.lock().unwrap().clone();
    assert_eq!(writes, vec![(texture.id().0, 24 * 16, Extent3D::new(2, 2, 6))]);
}

#[test]
fn uniform_buffer_and_primitive_release_their_buffers() {
    let (tracking, pool) = setup();
    {
        let _uniforms =
            UniformBuffer::new(pool.device().clone(), "tone map", &ToneMapUniforms::new(1.0, 1.0))
                .unwrap();
        let quad = Primitive::screen_quad(pool.device().clone()).unwrap();
        assert_eq!(quad.index_count(), 6);
        assert_eq!(tracking.live_buffers(), 3);
    }
    assert_eq!(tracking.live_buffers(), 0);
}
