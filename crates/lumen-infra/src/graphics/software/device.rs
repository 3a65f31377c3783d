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

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use lumen_core::math::{dimension, LinearRgba};
use lumen_core::renderer::api::bind_group::{self as api_bg};
use lumen_core::renderer::api::buffer::{self as api_buf};
use lumen_core::renderer::api::command::{self as api_cmd};
use lumen_core::renderer::api::texture::{self as api_tex};
use lumen_core::renderer::api::util::texel;
use lumen_core::renderer::traits::CommandEncoder;
use lumen_core::renderer::{
    ColorUniforms, GraphicsBackendType, GraphicsDevice, IndexFormat, PipelineError,
    PrimitiveTopology, ReduceUniforms, RenderPipelineDescriptor, RenderPipelineId,
    RendererAdapterInfo, RendererDeviceType, ResourceError, ShaderError, ShaderModuleDescriptor,
    ShaderModuleId, ShaderProgram, TextureFormat, ToneMapUniforms, VertexFormat, ViewRayUniforms,
    CUBE_FACE_COUNT,
};

use super::command::{PassCommand, RecordedCommand, RecordedPass, SoftwareCommandEncoder};
use super::kernels::{Kernel, SamplerState, TextureSnapshot};
use super::raster::{assemble_triangles, rasterize_triangle, RasterVertex};

#[derive(Debug)]
struct SoftwareBuffer {
    data: Vec<u8>,
    usage: api_buf::BufferUsage,
}

/// Texel storage of one texture. Layers are swapped wholesale so readers keep
/// a consistent snapshot while a pass writes.
#[derive(Debug)]
struct SoftwareTexture {
    label: String,
    extent: dimension::Extent3D,
    format: TextureFormat,
    usage: api_tex::TextureUsage,
    layers: RwLock<Vec<Arc<Vec<LinearRgba>>>>,
}

impl SoftwareTexture {
    fn texel_count(&self) -> usize {
        self.extent.width as usize * self.extent.height as usize
    }

    fn layer(&self, index: u32) -> Result<Arc<Vec<LinearRgba>>, ResourceError> {
        let layers = self
            .layers
            .read()
            .map_err(|e| ResourceError::BackendError(format!("Texture lock poisoned: {e}")))?;
        layers
            .get(index as usize)
            .cloned()
            .ok_or(ResourceError::OutOfBounds)
    }

    fn store_layer(&self, index: u32, texels: Vec<LinearRgba>) -> Result<(), ResourceError> {
        if texels.len() != self.texel_count() {
            return Err(ResourceError::OutOfBounds);
        }
        let mut layers = self
            .layers
            .write()
            .map_err(|e| ResourceError::BackendError(format!("Texture lock poisoned: {e}")))?;
        let slot = layers
            .get_mut(index as usize)
            .ok_or(ResourceError::OutOfBounds)?;
        *slot = Arc::new(texels);
        Ok(())
    }

    fn update_layer(
        &self,
        index: u32,
        update: impl FnOnce(&mut Vec<LinearRgba>),
    ) -> Result<(), ResourceError> {
        let mut layers = self
            .layers
            .write()
            .map_err(|e| ResourceError::BackendError(format!("Texture lock poisoned: {e}")))?;
        let slot = layers
            .get_mut(index as usize)
            .ok_or(ResourceError::OutOfBounds)?;
        update(Arc::make_mut(slot));
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct SoftwareView {
    texture_id: api_tex::TextureId,
    texture: Arc<SoftwareTexture>,
    dimension: api_tex::TextureViewDimension,
    base_layer: u32,
    layer_count: u32,
}

#[derive(Debug)]
struct SoftwarePipeline {
    label: String,
    program: ShaderProgram,
    topology: PrimitiveTopology,
    target_format: TextureFormat,
    vertex_stride: u64,
    position_offset: u64,
    uv_offset: u64,
}

/// Counters describing what a [`SoftwareDevice`] currently holds and has executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareDeviceStats {
    /// Textures alive right now.
    pub live_textures: usize,
    /// The most textures alive at once since creation or the last [`SoftwareDevice::reset_peak`].
    pub peak_textures: usize,
    /// Texture views alive right now.
    pub live_texture_views: usize,
    /// Buffers alive right now.
    pub live_buffers: usize,
    /// Bind groups alive right now.
    pub live_bind_groups: usize,
    /// Render passes executed.
    pub render_passes: usize,
    /// Draw calls executed.
    pub draw_calls: usize,
    /// Command buffers submitted.
    pub submissions: usize,
}

#[derive(Debug)]
struct SoftwareDeviceInternal {
    shader_modules: Mutex<HashMap<ShaderModuleId, ShaderProgram>>,
    bind_group_layouts: Mutex<HashMap<api_bg::BindGroupLayoutId, Arc<Vec<api_bg::BindGroupLayoutEntry>>>>,
    bind_groups: Mutex<HashMap<api_bg::BindGroupId, Arc<Vec<api_bg::BindGroupEntry>>>>,
    pipelines: Mutex<HashMap<RenderPipelineId, Arc<SoftwarePipeline>>>,
    buffers: Mutex<HashMap<api_buf::BufferId, SoftwareBuffer>>,
    textures: Mutex<HashMap<api_tex::TextureId, Arc<SoftwareTexture>>>,
    texture_views: Mutex<HashMap<api_tex::TextureViewId, SoftwareView>>,
    samplers: Mutex<HashMap<api_tex::SamplerId, SamplerState>>,
    pending_command_buffers:
        Mutex<HashMap<api_cmd::CommandBufferId, (Option<String>, Vec<RecordedCommand>)>>,

    next_id: AtomicUsize,
    command_buffer_id_counter: AtomicU64,

    /// Number of texture creations left before the injected failure.
    texture_fault: Mutex<Option<usize>>,

    peak_textures: AtomicUsize,
    render_passes: AtomicUsize,
    draw_calls: AtomicUsize,
    submissions: AtomicUsize,
}

/// A CPU implementation of [`GraphicsDevice`].
///
/// Commands are recorded by the encoder and executed in order on submission;
/// every program is evaluated per pixel with a triangle rasterizer. Writes
/// through `write_buffer`/`write_texture` take effect immediately, which matches
/// queue-write ordering for a single submitting thread.
///
/// Cloning yields another handle to the same device.
#[derive(Clone, Debug)]
pub struct SoftwareDevice {
    internal: Arc<SoftwareDeviceInternal>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

fn lookup<K: Eq + Hash + std::fmt::Debug, V: Clone>(
    table: &Mutex<HashMap<K, V>>,
    id: &K,
    what: &str,
) -> Result<V, ResourceError> {
    lock(table, what)?.get(id).cloned().ok_or_else(|| {
        log::debug!("SoftwareDevice: {id:?} not found in {what}.");
        ResourceError::NotFound
    })
}

#[derive(Debug, Default)]
struct DrawState {
    pipeline: Option<Arc<SoftwarePipeline>>,
    bind_groups: HashMap<u32, api_bg::BindGroupId>,
    vertex_buffer: Option<(api_buf::BufferId, u64)>,
    index_buffer: Option<(api_buf::BufferId, u64, IndexFormat)>,
}

struct PassTarget {
    texture_id: api_tex::TextureId,
    texture: Arc<SoftwareTexture>,
    layer: u32,
    texels: Vec<LinearRgba>,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDevice {
    /// Creates an empty device.
    pub fn new() -> Self {
        log::info!("SoftwareDevice: created CPU reference device.");
        Self {
            internal: Arc::new(SoftwareDeviceInternal {
                shader_modules: Mutex::new(HashMap::new()),
                bind_group_layouts: Mutex::new(HashMap::new()),
                bind_groups: Mutex::new(HashMap::new()),
                pipelines: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                texture_views: Mutex::new(HashMap::new()),
                samplers: Mutex::new(HashMap::new()),
                pending_command_buffers: Mutex::new(HashMap::new()),
                next_id: AtomicUsize::new(0),
                command_buffer_id_counter: AtomicU64::new(0),
                texture_fault: Mutex::new(None),
                peak_textures: AtomicUsize::new(0),
                render_passes: AtomicUsize::new(0),
                draw_calls: AtomicUsize::new(0),
                submissions: AtomicUsize::new(0),
            }),
        }
    }

    /// Makes the texture creation after the next `successes` ones fail with
    /// `ResourceError::BackendError`. The fault fires once.
    pub fn fail_texture_creation_after(&self, successes: usize) {
        if let Ok(mut fault) = self.internal.texture_fault.lock() {
            *fault = Some(successes);
        }
    }

    /// Removes a pending injected texture fault.
    pub fn clear_texture_fault(&self) {
        if let Ok(mut fault) = self.internal.texture_fault.lock() {
            *fault = None;
        }
    }

    /// A snapshot of the device counters.
    pub fn stats(&self) -> SoftwareDeviceStats {
        let count = |n: Result<usize, ResourceError>| n.unwrap_or_default();
        SoftwareDeviceStats {
            live_textures: count(lock(&self.internal.textures, "textures").map(|t| t.len())),
            peak_textures: self.internal.peak_textures.load(Ordering::Relaxed),
            live_texture_views: count(
                lock(&self.internal.texture_views, "texture_views").map(|t| t.len()),
            ),
            live_buffers: count(lock(&self.internal.buffers, "buffers").map(|t| t.len())),
            live_bind_groups: count(
                lock(&self.internal.bind_groups, "bind_groups").map(|t| t.len()),
            ),
            render_passes: self.internal.render_passes.load(Ordering::Relaxed),
            draw_calls: self.internal.draw_calls.load(Ordering::Relaxed),
            submissions: self.internal.submissions.load(Ordering::Relaxed),
        }
    }

    /// Restarts peak tracking from the current number of live textures.
    pub fn reset_peak(&self) {
        let live = self.stats().live_textures;
        self.internal.peak_textures.store(live, Ordering::Relaxed);
    }

    /// Reads back one layer of a texture, bypassing the copy path.
    pub fn read_texture_layer(
        &self,
        texture: api_tex::TextureId,
        layer: u32,
    ) -> Result<Vec<LinearRgba>, ResourceError> {
        let texture = lookup(&self.internal.textures, &texture, "textures")?;
        Ok(texture.layer(layer)?.as_ref().clone())
    }

    fn next_raw_id(&self) -> usize {
        self.internal.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn take_texture_fault(&self) -> Result<bool, ResourceError> {
        let mut fault = lock(&self.internal.texture_fault, "texture_fault")?;
        match *fault {
            Some(0) => {
                *fault = None;
                Ok(true)
            }
            Some(n) => {
                *fault = Some(n - 1);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn register_command_buffer(
        &self,
        label: Option<String>,
        commands: Vec<RecordedCommand>,
    ) -> api_cmd::CommandBufferId {
        let id = api_cmd::CommandBufferId(
            self.internal
                .command_buffer_id_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        match self.internal.pending_command_buffers.lock() {
            Ok(mut pending) => {
                pending.insert(id, (label, commands));
            }
            Err(e) => log::error!("SoftwareDevice: dropping command buffer {id:?}: {e}"),
        }
        id
    }

    fn buffer_contents(&self, id: api_buf::BufferId) -> Result<Vec<u8>, ResourceError> {
        lock(&self.internal.buffers, "buffers")?
            .get(&id)
            .map(|b| b.data.clone())
            .ok_or(ResourceError::NotFound)
    }

    // --- Binding resolution ---

    fn read_uniform<T: bytemuck::Pod>(
        &self,
        resource: api_bg::BindingResource,
    ) -> Result<T, ResourceError> {
        let api_bg::BindingResource::Buffer(binding) = resource else {
            return Err(ResourceError::BackendError(
                "expected a uniform buffer binding".to_string(),
            ));
        };
        let buffers = lock(&self.internal.buffers, "buffers")?;
        let buffer = buffers.get(&binding.buffer).ok_or(ResourceError::NotFound)?;
        let start = binding.offset as usize;
        let bytes = buffer
            .data
            .get(start..start + std::mem::size_of::<T>())
            .ok_or(ResourceError::OutOfBounds)?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    fn snapshot(&self, resource: api_bg::BindingResource) -> Result<TextureSnapshot, ResourceError> {
        let api_bg::BindingResource::TextureView(view_id) = resource else {
            return Err(ResourceError::BackendError(
                "expected a texture view binding".to_string(),
            ));
        };
        let view = lookup(&self.internal.texture_views, &view_id, "texture_views")?;
        let layers = (view.base_layer..view.base_layer + view.layer_count)
            .map(|layer| view.texture.layer(layer))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TextureSnapshot {
            texture: view.texture_id,
            width: view.texture.extent.width,
            height: view.texture.extent.height,
            layers,
        })
    }

    fn sampler_state(&self, resource: api_bg::BindingResource) -> Result<SamplerState, ResourceError> {
        let api_bg::BindingResource::Sampler(sampler) = resource else {
            return Err(ResourceError::BackendError(
                "expected a sampler binding".to_string(),
            ));
        };
        lookup(&self.internal.samplers, &sampler, "samplers")
    }

    /// Builds the kernel of `pipeline` from the bind group set at index 0.
    fn resolve_kernel(
        &self,
        pipeline: &SoftwarePipeline,
        bind_groups: &HashMap<u32, api_bg::BindGroupId>,
    ) -> Result<Kernel, ResourceError> {
        let group = bind_groups.get(&0).ok_or_else(|| {
            ResourceError::BackendError(format!(
                "pipeline '{}' drawn without a bind group at index 0",
                pipeline.label
            ))
        })?;
        let entries = lookup(&self.internal.bind_groups, group, "bind_groups")?;
        let binding = |index: u32| {
            entries
                .iter()
                .find(|entry| entry.binding == index)
                .map(|entry| entry.resource)
                .ok_or_else(|| {
                    ResourceError::BackendError(format!(
                        "pipeline '{}' reads binding {index}, which is not bound",
                        pipeline.label
                    ))
                })
        };

        let kernel = match pipeline.program {
            ShaderProgram::LogLuminance => Kernel::LogLuminance {
                source: self.snapshot(binding(0)?)?,
            },
            ShaderProgram::LuminanceReduce => Kernel::LuminanceReduce {
                uniforms: self.read_uniform::<ReduceUniforms>(binding(0)?)?,
                source: self.snapshot(binding(1)?)?,
            },
            ShaderProgram::ToneMap => Kernel::ToneMap {
                uniforms: self.read_uniform::<ToneMapUniforms>(binding(0)?)?,
                source: self.snapshot(binding(1)?)?,
                sampler: self.sampler_state(binding(2)?)?,
            },
            ShaderProgram::BrightPass => Kernel::BrightPass {
                uniforms: self.read_uniform::<ToneMapUniforms>(binding(0)?)?,
                source: self.snapshot(binding(1)?)?,
                sampler: self.sampler_state(binding(2)?)?,
            },
            ShaderProgram::EquirectProjection => Kernel::EquirectProjection {
                inv_view_proj: self.read_uniform::<ViewRayUniforms>(binding(0)?)?.inverse(),
                panorama: self.snapshot(binding(1)?)?,
                sampler: self.sampler_state(binding(2)?)?,
            },
            ShaderProgram::Skybox => Kernel::Skybox {
                inv_view_proj: self.read_uniform::<ViewRayUniforms>(binding(0)?)?.inverse(),
                cube: self.snapshot(binding(1)?)?,
                sampler: self.sampler_state(binding(2)?)?,
            },
            ShaderProgram::SolidColor => {
                let [r, g, b, a] = self.read_uniform::<ColorUniforms>(binding(0)?)?.color;
                Kernel::SolidColor {
                    color: LinearRgba::new(r, g, b, a),
                }
            }
            ShaderProgram::Custom(name) => {
                return Err(ShaderError::UnsupportedProgram {
                    label: pipeline.label.clone(),
                    program: name.to_string(),
                }
                .into())
            }
        };
        Ok(kernel)
    }

    // --- Execution ---

    fn execute_pass(&self, pass: &RecordedPass) -> Result<(), ResourceError> {
        let mut targets = Vec::with_capacity(pass.attachments.len());
        for (view_id, load) in &pass.attachments {
            let view = lookup(&self.internal.texture_views, view_id, "texture_views")?;
            let texture = &view.texture;
            if !texture
                .usage
                .contains(api_tex::TextureUsage::RENDER_ATTACHMENT)
                || view.dimension != api_tex::TextureViewDimension::D2
            {
                log::error!(
                    "SoftwareDevice: view {view_id:?} of '{}' is not a renderable 2D view.",
                    texture.label
                );
                return Err(ResourceError::InvalidHandle);
            }
            let texels = match load {
                api_cmd::LoadOp::Load => texture.layer(view.base_layer)?.as_ref().clone(),
                api_cmd::LoadOp::Clear(color) => {
                    vec![texel::quantize(texture.format, *color); texture.texel_count()]
                }
            };
            targets.push(PassTarget {
                texture_id: view.texture_id,
                texture: Arc::clone(texture),
                layer: view.base_layer,
                texels,
            });
        }

        let mut state = DrawState::default();
        for command in &pass.commands {
            match command {
                PassCommand::SetPipeline(id) => {
                    let pipeline = lookup(&self.internal.pipelines, id, "pipelines")
                        .map_err(|_| PipelineError::InvalidRenderPipeline { id: *id })?;
                    state.pipeline = Some(pipeline);
                }
                PassCommand::SetBindGroup(index, id) => {
                    state.bind_groups.insert(*index, *id);
                }
                PassCommand::SetVertexBuffer {
                    slot,
                    buffer,
                    offset,
                } => {
                    if *slot == 0 {
                        state.vertex_buffer = Some((*buffer, *offset));
                    }
                }
                PassCommand::SetIndexBuffer {
                    buffer,
                    offset,
                    format,
                } => {
                    state.index_buffer = Some((*buffer, *offset, *format));
                }
                PassCommand::Draw {
                    vertices,
                    instances,
                } => {
                    if !instances.is_empty() {
                        let indices: Vec<u32> = vertices.clone().collect();
                        self.draw(&state, &mut targets, &indices, None)?;
                    }
                }
                PassCommand::DrawIndexed {
                    indices,
                    base_vertex,
                    instances,
                } => {
                    if !instances.is_empty() {
                        let (indices, restart) =
                            self.fetch_indices(&state, indices, *base_vertex)?;
                        self.draw(&state, &mut targets, &indices, Some(restart))?;
                    }
                }
            }
        }

        for target in targets {
            target.texture.store_layer(target.layer, target.texels)?;
        }
        self.internal.render_passes.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "SoftwareDevice: executed pass '{}' ({} commands)",
            pass.label.as_deref().unwrap_or_default(),
            pass.commands.len()
        );
        Ok(())
    }

    fn fetch_indices(
        &self,
        state: &DrawState,
        range: &Range<u32>,
        base_vertex: i32,
    ) -> Result<(Vec<u32>, u32), ResourceError> {
        let (buffer, offset, format) = state.index_buffer.ok_or_else(|| {
            ResourceError::BackendError("indexed draw without an index buffer".to_string())
        })?;
        let data = self.buffer_contents(buffer)?;
        let size = format.size() as usize;
        let start = offset as usize + range.start as usize * size;
        let end = offset as usize + range.end as usize * size;
        let bytes = data.get(start..end).ok_or(ResourceError::OutOfBounds)?;

        let (raw, restart): (Vec<u32>, u32) = match format {
            IndexFormat::Uint16 => (
                bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                    .collect(),
                u16::MAX as u32,
            ),
            IndexFormat::Uint32 => (
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
                u32::MAX,
            ),
        };
        let shifted = raw
            .into_iter()
            .map(|i| {
                if i == restart {
                    i
                } else {
                    (i as i64 + base_vertex as i64) as u32
                }
            })
            .collect();
        Ok((shifted, restart))
    }

    fn draw(
        &self,
        state: &DrawState,
        targets: &mut [PassTarget],
        indices: &[u32],
        restart: Option<u32>,
    ) -> Result<(), ResourceError> {
        let pipeline = state.pipeline.as_ref().ok_or_else(|| {
            ResourceError::BackendError("draw issued without a pipeline".to_string())
        })?;
        let target = targets.first_mut().ok_or_else(|| {
            ResourceError::BackendError("draw issued in a pass without attachments".to_string())
        })?;
        if target.texture.format != pipeline.target_format {
            return Err(PipelineError::IncompatibleColorTarget(format!(
                "pipeline '{}' writes {:?} but '{}' is {:?}",
                pipeline.label, pipeline.target_format, target.texture.label, target.texture.format
            ))
            .into());
        }

        let kernel = self.resolve_kernel(pipeline, &state.bind_groups)?;
        if kernel.sampled_texture() == Some(target.texture_id) {
            return Err(ResourceError::BackendError(format!(
                "texture '{}' is sampled and rendered in the same pass",
                target.texture.label
            )));
        }

        let (vertex_buffer, vertex_offset) = state.vertex_buffer.ok_or_else(|| {
            ResourceError::BackendError("draw issued without a vertex buffer".to_string())
        })?;
        let vertex_data = self.buffer_contents(vertex_buffer)?;
        let read_pair = |at: u64| -> Result<[f32; 2], ResourceError> {
            let start = at as usize;
            vertex_data
                .get(start..start + 8)
                .map(bytemuck::pod_read_unaligned::<[f32; 2]>)
                .ok_or(ResourceError::OutOfBounds)
        };
        let fetch = |index: u32| -> Result<RasterVertex, ResourceError> {
            let base = vertex_offset + index as u64 * pipeline.vertex_stride;
            Ok(RasterVertex {
                position: read_pair(base + pipeline.position_offset)?,
                uv: read_pair(base + pipeline.uv_offset)?,
            })
        };

        let width = target.texture.extent.width;
        let height = target.texture.extent.height;
        let format = pipeline.target_format;
        let texels = &mut target.texels;
        for [a, b, c] in assemble_triangles(indices, pipeline.topology, restart) {
            let vertices = [fetch(a)?, fetch(b)?, fetch(c)?];
            rasterize_triangle(vertices, width, height, |fragment| {
                let index = fragment.y as usize * width as usize + fragment.x as usize;
                texels[index] = texel::quantize(format, kernel.shade(&fragment));
            });
        }
        self.internal.draw_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn execute_copy(&self, copy: &api_cmd::TextureToBufferCopy) -> Result<(), ResourceError> {
        let texture = lookup(&self.internal.textures, &copy.texture, "textures")?;
        if !texture.usage.contains(api_tex::TextureUsage::COPY_SRC) {
            return Err(ResourceError::InvalidHandle);
        }
        if copy.layer >= texture.extent.depth_or_array_layers
            || copy.size.width > texture.extent.width
            || copy.size.height > texture.extent.height
        {
            return Err(ResourceError::OutOfBounds);
        }

        let bpp = texture.format.bytes_per_pixel() as usize;
        let row_bytes = copy.size.width as usize * bpp;
        let pitch = copy.bytes_per_row as usize;
        if pitch < row_bytes {
            return Err(ResourceError::OutOfBounds);
        }
        let texels = texture.layer(copy.layer)?;

        let mut buffers = lock(&self.internal.buffers, "buffers")?;
        let buffer = buffers
            .get_mut(&copy.buffer)
            .ok_or(ResourceError::NotFound)?;
        if !buffer.usage.contains(api_buf::BufferUsage::COPY_DST) {
            return Err(ResourceError::InvalidHandle);
        }
        let rows = copy.size.height as usize;
        if rows > 0 && buffer.data.len() < pitch * (rows - 1) + row_bytes {
            return Err(ResourceError::OutOfBounds);
        }

        let texture_width = texture.extent.width as usize;
        for y in 0..rows {
            let row = &mut buffer.data[y * pitch..y * pitch + row_bytes];
            for (x, out) in row.chunks_exact_mut(bpp).enumerate() {
                texel::encode_texel(texture.format, texels[y * texture_width + x], out);
            }
        }
        Ok(())
    }
}

impl GraphicsDevice for SoftwareDevice {
    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        // Only the declared program matters; the WGSL source is not parsed.
        let id = ShaderModuleId(self.next_raw_id());
        lock(&self.internal.shader_modules, "shader_modules")?.insert(id, descriptor.program);
        log::debug!(
            "SoftwareDevice: Created shader module '{}' ({}) with ID: {id:?}",
            descriptor.label.unwrap_or_default(),
            descriptor.program.name()
        );
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        lock(&self.internal.shader_modules, "shader_modules")?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ShaderError::NotFound { id }.into())
    }

    // --- Bind Group Operations ---

    fn create_bind_group_layout(
        &self,
        descriptor: &api_bg::BindGroupLayoutDescriptor,
    ) -> Result<api_bg::BindGroupLayoutId, ResourceError> {
        let id = api_bg::BindGroupLayoutId(self.next_raw_id());
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .insert(id, Arc::new(descriptor.entries.to_vec()));
        Ok(id)
    }

    fn destroy_bind_group_layout(
        &self,
        id: api_bg::BindGroupLayoutId,
    ) -> Result<(), ResourceError> {
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_bind_group(
        &self,
        descriptor: &api_bg::BindGroupDescriptor,
    ) -> Result<api_bg::BindGroupId, ResourceError> {
        let layout = lookup(
            &self.internal.bind_group_layouts,
            &descriptor.layout,
            "bind_group_layouts",
        )?;
        let label = descriptor.label.unwrap_or_default();
        if descriptor.entries.len() != layout.len() {
            return Err(ResourceError::BackendError(format!(
                "bind group '{label}' has {} entries, its layout {}",
                descriptor.entries.len(),
                layout.len()
            )));
        }

        for entry in descriptor.entries {
            let layout_entry = layout
                .iter()
                .find(|l| l.binding == entry.binding)
                .ok_or(ResourceError::InvalidHandle)?;
            match (layout_entry.ty, entry.resource) {
                (api_bg::BindingType::UniformBuffer, api_bg::BindingResource::Buffer(binding)) => {
                    let buffers = lock(&self.internal.buffers, "buffers")?;
                    let buffer = buffers.get(&binding.buffer).ok_or(ResourceError::NotFound)?;
                    if !buffer.usage.contains(api_buf::BufferUsage::UNIFORM) {
                        return Err(ResourceError::InvalidHandle);
                    }
                }
                (
                    api_bg::BindingType::Texture {
                        sample_type: api_bg::TextureSampleType::Float { filterable },
                        view_dimension,
                    },
                    api_bg::BindingResource::TextureView(view_id),
                ) => {
                    let view = lookup(&self.internal.texture_views, &view_id, "texture_views")?;
                    if !view
                        .texture
                        .usage
                        .contains(api_tex::TextureUsage::TEXTURE_BINDING)
                        || view.dimension != view_dimension
                    {
                        return Err(ResourceError::InvalidHandle);
                    }
                    if filterable && !view.texture.format.is_filterable() {
                        return Err(ResourceError::BackendError(format!(
                            "bind group '{label}' binds {:?} texture '{}' as filterable",
                            view.texture.format, view.texture.label
                        )));
                    }
                }
                (api_bg::BindingType::Sampler(_), api_bg::BindingResource::Sampler(sampler)) => {
                    lookup(&self.internal.samplers, &sampler, "samplers")?;
                }
                _ => {
                    return Err(ResourceError::BackendError(format!(
                        "bind group '{label}' binding {} does not match its layout",
                        entry.binding
                    )))
                }
            }
        }

        let id = api_bg::BindGroupId(self.next_raw_id());
        lock(&self.internal.bind_groups, "bind_groups")?
            .insert(id, Arc::new(descriptor.entries.to_vec()));
        Ok(id)
    }

    fn destroy_bind_group(&self, id: api_bg::BindGroupId) -> Result<(), ResourceError> {
        lock(&self.internal.bind_groups, "bind_groups")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    // -- Render Pipeline Operations ---

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();
        let program_of = |id: ShaderModuleId| {
            lookup(&self.internal.shader_modules, &id, "shader_modules").map_err(|_| {
                ResourceError::Pipeline(PipelineError::InvalidShaderModuleForPipeline {
                    id,
                    pipeline_label: Some(label.clone()),
                })
            })
        };
        program_of(descriptor.vertex_shader_module)?;
        let program = program_of(descriptor.fragment_shader_module)?;
        if let ShaderProgram::Custom(name) = program {
            return Err(ShaderError::UnsupportedProgram {
                label,
                program: name.to_string(),
            }
            .into());
        }

        let compilation_failed = |details: String| {
            ResourceError::Pipeline(PipelineError::CompilationFailed {
                label: Some(label.clone()),
                details,
            })
        };
        let layout = descriptor
            .vertex_buffers_layout
            .first()
            .ok_or_else(|| compilation_failed("no vertex buffer layout".to_string()))?;
        let attribute = |location: u32| {
            layout
                .attributes
                .iter()
                .find(|a| a.shader_location == location && a.format == VertexFormat::Float32x2)
                .map(|a| a.offset)
                .ok_or_else(|| {
                    compilation_failed(format!("no Float32x2 attribute at location {location}"))
                })
        };
        let position_offset = attribute(0)?;
        let uv_offset = attribute(1)?;

        let target_format = descriptor
            .color_target_states
            .first()
            .map(|target| target.format)
            .ok_or_else(|| {
                PipelineError::IncompatibleColorTarget(format!("pipeline '{label}' has no color target"))
            })?;
        for layout_id in descriptor.bind_group_layouts.iter() {
            lookup(&self.internal.bind_group_layouts, layout_id, "bind_group_layouts")?;
        }

        let id = RenderPipelineId(self.next_raw_id());
        lock(&self.internal.pipelines, "pipelines")?.insert(
            id,
            Arc::new(SoftwarePipeline {
                label: label.clone(),
                program,
                topology: descriptor.primitive_state.topology,
                target_format,
                vertex_stride: layout.array_stride,
                position_offset,
                uv_offset,
            }),
        );
        log::debug!(
            "SoftwareDevice: Created render pipeline '{label}' ({}) with ID: {id:?}",
            program.name()
        );
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        lock(&self.internal.pipelines, "pipelines")?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PipelineError::InvalidRenderPipeline { id }.into())
    }

    // --- Buffer Operations ---

    fn create_buffer(
        &self,
        descriptor: &api_buf::BufferDescriptor,
    ) -> Result<api_buf::BufferId, ResourceError> {
        let id = api_buf::BufferId(self.next_raw_id());
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            SoftwareBuffer {
                data: vec![0; descriptor.size as usize],
                usage: descriptor.usage,
            },
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &api_buf::BufferDescriptor,
        data: &[u8],
    ) -> Result<api_buf::BufferId, ResourceError> {
        let id = api_buf::BufferId(self.next_raw_id());
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            SoftwareBuffer {
                data: data.to_vec(),
                usage: descriptor.usage,
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: api_buf::BufferId) -> Result<(), ResourceError> {
        lock(&self.internal.buffers, "buffers")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn write_buffer(
        &self,
        id: api_buf::BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let mut buffers = lock(&self.internal.buffers, "buffers")?;
        let buffer = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let start = offset as usize;
        buffer
            .data
            .get_mut(start..start + data.len())
            .ok_or(ResourceError::OutOfBounds)?
            .copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, id: api_buf::BufferId) -> Result<Vec<u8>, ResourceError> {
        let buffers = lock(&self.internal.buffers, "buffers")?;
        let buffer = buffers.get(&id).ok_or(ResourceError::NotFound)?;
        if !buffer.usage.contains(api_buf::BufferUsage::MAP_READ) {
            return Err(ResourceError::InvalidHandle);
        }
        Ok(buffer.data.clone())
    }

    // --- Texture Operations ---

    fn create_texture(
        &self,
        descriptor: &api_tex::TextureDescriptor,
    ) -> Result<api_tex::TextureId, ResourceError> {
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();
        if self.take_texture_fault()? {
            log::debug!("SoftwareDevice: injected failure creating texture '{label}'");
            return Err(ResourceError::BackendError(format!(
                "injected failure creating texture '{label}'"
            )));
        }
        let size = descriptor.size;
        if size.width == 0 || size.height == 0 || size.depth_or_array_layers == 0 {
            return Err(ResourceError::OutOfBounds);
        }

        let texel_count = size.width as usize * size.height as usize;
        let layers = (0..size.depth_or_array_layers)
            .map(|_| Arc::new(vec![LinearRgba::TRANSPARENT; texel_count]))
            .collect();
        let texture = SoftwareTexture {
            label,
            extent: size,
            format: descriptor.format,
            usage: descriptor.usage,
            layers: RwLock::new(layers),
        };

        let id = api_tex::TextureId(self.next_raw_id());
        let live = {
            let mut textures = lock(&self.internal.textures, "textures")?;
            textures.insert(id, Arc::new(texture));
            textures.len()
        };
        self.internal.peak_textures.fetch_max(live, Ordering::Relaxed);
        log::trace!(
            "SoftwareDevice: Created texture '{}' {}x{}x{} {:?} with ID: {id:?}",
            descriptor.label.as_deref().unwrap_or_default(),
            size.width,
            size.height,
            size.depth_or_array_layers,
            descriptor.format
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: api_tex::TextureId) -> Result<(), ResourceError> {
        lock(&self.internal.textures, "textures")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn write_texture(
        &self,
        texture_id: api_tex::TextureId,
        data: &[u8],
        bytes_per_row: Option<u32>,
        offset: dimension::Origin3D,
        size: dimension::Extent3D,
    ) -> Result<(), ResourceError> {
        let texture = lookup(&self.internal.textures, &texture_id, "textures")?;
        if !texture.usage.contains(api_tex::TextureUsage::COPY_DST) {
            return Err(ResourceError::InvalidHandle);
        }
        let extent = texture.extent;
        if offset.x + size.width > extent.width
            || offset.y + size.height > extent.height
            || offset.z + size.depth_or_array_layers > extent.depth_or_array_layers
        {
            return Err(ResourceError::OutOfBounds);
        }
        if size.width == 0 || size.height == 0 || size.depth_or_array_layers == 0 {
            return Ok(());
        }

        let bpp = texture.format.bytes_per_pixel() as usize;
        let row_bytes = size.width as usize * bpp;
        let pitch = bytes_per_row.map_or(row_bytes, |b| b as usize);
        let rows = size.height as usize;
        let image_bytes = pitch * rows;
        let needed = image_bytes * (size.depth_or_array_layers as usize - 1)
            + pitch * (rows - 1)
            + row_bytes;
        if pitch < row_bytes || data.len() < needed {
            return Err(ResourceError::OutOfBounds);
        }

        let width = extent.width as usize;
        for z in 0..size.depth_or_array_layers {
            let image = &data[z as usize * image_bytes..];
            texture.update_layer(offset.z + z, |texels| {
                for y in 0..rows {
                    let row = &image[y * pitch..y * pitch + row_bytes];
                    let first = (offset.y as usize + y) * width + offset.x as usize;
                    for (x, chunk) in row.chunks_exact(bpp).enumerate() {
                        texels[first + x] = texel::decode_texel(texture.format, chunk);
                    }
                }
            })?;
        }
        Ok(())
    }

    fn create_texture_view(
        &self,
        texture_id: api_tex::TextureId,
        descriptor: &api_tex::TextureViewDescriptor,
    ) -> Result<api_tex::TextureViewId, ResourceError> {
        let texture = lookup(&self.internal.textures, &texture_id, "textures")?;
        let extent = texture.extent;
        let end = descriptor.base_array_layer + descriptor.array_layer_count;
        let shape_ok = match descriptor.dimension {
            api_tex::TextureViewDimension::D2 => descriptor.array_layer_count == 1,
            api_tex::TextureViewDimension::Cube => {
                descriptor.array_layer_count == CUBE_FACE_COUNT && extent.width == extent.height
            }
        };
        if !shape_ok || end > extent.depth_or_array_layers {
            return Err(ResourceError::OutOfBounds);
        }

        let id = api_tex::TextureViewId(self.next_raw_id());
        lock(&self.internal.texture_views, "texture_views")?.insert(
            id,
            SoftwareView {
                texture_id,
                texture,
                dimension: descriptor.dimension,
                base_layer: descriptor.base_array_layer,
                layer_count: descriptor.array_layer_count,
            },
        );
        Ok(id)
    }

    fn destroy_texture_view(&self, id: api_tex::TextureViewId) -> Result<(), ResourceError> {
        lock(&self.internal.texture_views, "texture_views")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_sampler(
        &self,
        descriptor: &api_tex::SamplerDescriptor,
    ) -> Result<api_tex::SamplerId, ResourceError> {
        let id = api_tex::SamplerId(self.next_raw_id());
        lock(&self.internal.samplers, "samplers")?.insert(
            id,
            SamplerState {
                address_u: descriptor.address_mode_u,
                address_v: descriptor.address_mode_v,
                mag_filter: descriptor.mag_filter,
                min_filter: descriptor.min_filter,
            },
        );
        Ok(id)
    }

    fn destroy_sampler(&self, id: api_tex::SamplerId) -> Result<(), ResourceError> {
        lock(&self.internal.samplers, "samplers")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    // --- Command Operations ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(SoftwareCommandEncoder {
            label: label.map(String::from),
            commands: Vec::new(),
            device: self.clone(),
        })
    }

    fn submit_command_buffer(
        &self,
        command_buffer_id: api_cmd::CommandBufferId,
    ) -> Result<(), ResourceError> {
        let (label, commands) = lock(
            &self.internal.pending_command_buffers,
            "pending_command_buffers",
        )?
        .remove(&command_buffer_id)
        .ok_or_else(|| {
            log::error!("SoftwareDevice: Unknown command buffer {command_buffer_id:?} submitted.");
            ResourceError::InvalidHandle
        })?;
        self.internal.submissions.fetch_add(1, Ordering::Relaxed);

        for command in &commands {
            let result = match command {
                RecordedCommand::RenderPass(pass) => self.execute_pass(pass),
                RecordedCommand::CopyTextureToBuffer(copy) => self.execute_copy(copy),
            };
            if let Err(e) = result {
                log::error!(
                    "SoftwareDevice: command buffer '{}' failed: {e}",
                    label.as_deref().unwrap_or_default()
                );
                return Err(e);
            }
        }
        Ok(())
    }

    fn get_adapter_info(&self) -> RendererAdapterInfo {
        RendererAdapterInfo {
            name: "Lumen software rasterizer".to_string(),
            backend_type: GraphicsBackendType::Software,
            device_type: RendererDeviceType::Cpu,
        }
    }
}
