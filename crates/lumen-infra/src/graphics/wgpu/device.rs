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
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use wgpu::util::DeviceExt;

use lumen_core::math::dimension;
use lumen_core::renderer::api::bind_group::{self as api_bg};
use lumen_core::renderer::api::buffer::{self as api_buf};
use lumen_core::renderer::api::command::{self as api_cmd};
use lumen_core::renderer::api::texture::{self as api_tex};
use lumen_core::renderer::traits::CommandEncoder;
use lumen_core::renderer::{
    GraphicsDevice, PipelineError, RenderPipelineDescriptor, RenderPipelineId, RendererAdapterInfo,
    ResourceError, ShaderError, ShaderModuleDescriptor, ShaderModuleId, ShaderSourceData,
};

use super::command::WgpuCommandEncoder;
use super::context::WgpuGraphicsContext;
use super::conversions::{from_wgpu_backend, from_wgpu_device_type, IntoWgpu};

#[derive(Debug)]
pub(crate) struct WgpuBufferEntry {
    pub(crate) wgpu_buffer: Arc<wgpu::Buffer>,
    pub(crate) size: u64,
}

#[derive(Debug)]
pub(crate) struct WgpuTextureEntry {
    pub(crate) wgpu_texture: Arc<wgpu::Texture>,
    pub(crate) size: u64,
}

/// The internal, non-clonable state of the WgpuDevice.
/// Every backend object lives in a table keyed by the abstract ID handed out
/// to callers.
#[derive(Debug)]
struct WgpuDeviceInternal {
    context: Arc<WgpuGraphicsContext>,
    shader_modules: Mutex<HashMap<ShaderModuleId, Arc<wgpu::ShaderModule>>>,
    bind_group_layouts: Mutex<HashMap<api_bg::BindGroupLayoutId, Arc<wgpu::BindGroupLayout>>>,
    bind_groups: Mutex<HashMap<api_bg::BindGroupId, Arc<wgpu::BindGroup>>>,
    pipelines: Mutex<HashMap<RenderPipelineId, Arc<wgpu::RenderPipeline>>>,
    buffers: Mutex<HashMap<api_buf::BufferId, WgpuBufferEntry>>,
    textures: Mutex<HashMap<api_tex::TextureId, WgpuTextureEntry>>,
    texture_views: Mutex<HashMap<api_tex::TextureViewId, Arc<wgpu::TextureView>>>,
    samplers: Mutex<HashMap<api_tex::SamplerId, Arc<wgpu::Sampler>>>,

    next_id: AtomicUsize,

    // VRAM Tracking
    vram_allocated_bytes: AtomicU64,
    vram_peak_bytes: AtomicU64,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<api_cmd::CommandBufferId, wgpu::CommandBuffer>>,
    /// A thread-safe counter to generate unique command buffer IDs.
    command_buffer_id_counter: AtomicU64,
}

/// A clonable, thread-safe handle to the WGPU graphics device.
/// It wraps the actual device state in an Arc, allowing it to be shared
/// with command encoders.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
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
        log::warn!("WgpuDevice: {what} {id:?} not found.");
        ResourceError::NotFound
    })
}

impl WgpuDevice {
    /// Wraps an initialized context.
    pub fn new(context: WgpuGraphicsContext) -> Self {
        Self {
            internal: Arc::new(WgpuDeviceInternal {
                context: Arc::new(context),
                shader_modules: Mutex::new(HashMap::new()),
                bind_group_layouts: Mutex::new(HashMap::new()),
                bind_groups: Mutex::new(HashMap::new()),
                pipelines: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                texture_views: Mutex::new(HashMap::new()),
                samplers: Mutex::new(HashMap::new()),
                next_id: AtomicUsize::new(0),
                vram_allocated_bytes: AtomicU64::new(0),
                vram_peak_bytes: AtomicU64::new(0),
                pending_command_buffers: Mutex::new(HashMap::new()),
                command_buffer_id_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Opens a headless device on the preferred adapter.
    pub fn headless() -> anyhow::Result<Self> {
        let context = WgpuGraphicsContext::blocking_new(wgpu::PowerPreference::HighPerformance)?;
        Ok(Self::new(context))
    }

    /// The context this device renders with.
    pub fn context(&self) -> &WgpuGraphicsContext {
        &self.internal.context
    }

    fn next_raw_id(&self) -> usize {
        self.internal.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn track_allocation(&self, bytes: u64) {
        let current = self
            .internal
            .vram_allocated_bytes
            .fetch_add(bytes, Ordering::Relaxed)
            + bytes;
        self.internal
            .vram_peak_bytes
            .fetch_max(current, Ordering::Relaxed);
    }

    fn track_release(&self, bytes: u64) {
        self.internal
            .vram_allocated_bytes
            .fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Bytes of buffer and texture memory currently allocated through this device.
    pub fn allocated_bytes(&self) -> u64 {
        self.internal.vram_allocated_bytes.load(Ordering::Relaxed)
    }

    /// The highest value [`WgpuDevice::allocated_bytes`] has reached.
    pub fn peak_allocated_bytes(&self) -> u64 {
        self.internal.vram_peak_bytes.load(Ordering::Relaxed)
    }

    /// Helper to calculate texture size in bytes
    fn calculate_texture_size_in_bytes(descriptor: &api_tex::TextureDescriptor) -> u64 {
        let bytes_per_pixel = descriptor.format.bytes_per_pixel();
        let num_pixels = descriptor.size.width as u64
            * descriptor.size.height as u64
            * descriptor.size.depth_or_array_layers as u64;
        num_pixels * bytes_per_pixel as u64
    }

    pub(crate) fn get_wgpu_render_pipeline(
        &self,
        id: RenderPipelineId,
    ) -> Option<Arc<wgpu::RenderPipeline>> {
        lookup(&self.internal.pipelines, &id, "render pipeline").ok()
    }

    pub(crate) fn get_wgpu_bind_group(
        &self,
        id: api_bg::BindGroupId,
    ) -> Option<Arc<wgpu::BindGroup>> {
        lookup(&self.internal.bind_groups, &id, "bind group").ok()
    }

    pub(crate) fn get_wgpu_buffer(&self, id: api_buf::BufferId) -> Option<Arc<wgpu::Buffer>> {
        lock(&self.internal.buffers, "buffers")
            .ok()?
            .get(&id)
            .map(|entry| Arc::clone(&entry.wgpu_buffer))
    }

    pub(crate) fn get_wgpu_texture(&self, id: api_tex::TextureId) -> Option<Arc<wgpu::Texture>> {
        lock(&self.internal.textures, "textures")
            .ok()?
            .get(&id)
            .map(|entry| Arc::clone(&entry.wgpu_texture))
    }

    pub(crate) fn get_wgpu_texture_view(
        &self,
        id: &api_tex::TextureViewId,
    ) -> Option<Arc<wgpu::TextureView>> {
        lookup(&self.internal.texture_views, id, "texture view").ok()
    }

    /// (crate-internal) Registers a finished wgpu::CommandBuffer, storing it
    /// in a map and returning an abstract ID for it.
    pub(crate) fn register_command_buffer(
        &self,
        buffer: wgpu::CommandBuffer,
    ) -> api_cmd::CommandBufferId {
        let new_id = api_cmd::CommandBufferId(
            self.internal
                .command_buffer_id_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        match self.internal.pending_command_buffers.lock() {
            Ok(mut guard) => {
                guard.insert(new_id, buffer);
            }
            Err(e) => log::error!("WgpuDevice: dropping command buffer {new_id:?}: {e}"),
        }
        new_id
    }
}

impl GraphicsDevice for WgpuDevice {
    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let wgpu_source = match &descriptor.source {
            ShaderSourceData::Wgsl(cow_str) => wgpu::ShaderSource::Wgsl(cow_str.clone()),
        };
        let label = descriptor.label;

        log::debug!(
            "WgpuDevice: Creating wgpu::ShaderModule '{}' for program {}",
            label.unwrap_or_default(),
            descriptor.program.name()
        );
        let module = self
            .internal
            .context
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label,
                source: wgpu_source,
            });

        let id = ShaderModuleId(self.next_raw_id());
        lock(&self.internal.shader_modules, "shader_modules")?.insert(id, Arc::new(module));
        log::debug!("WgpuDevice: Created shader module with ID: {id:?}");
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        if lock(&self.internal.shader_modules, "shader_modules")?
            .remove(&id)
            .is_some()
        {
            log::debug!("WgpuDevice: Destroyed shader module with ID: {id:?}");
            Ok(())
        } else {
            Err(ShaderError::NotFound { id }.into())
        }
    }

    // --- Bind Group Operations ---

    fn create_bind_group_layout(
        &self,
        descriptor: &api_bg::BindGroupLayoutDescriptor,
    ) -> Result<api_bg::BindGroupLayoutId, ResourceError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = descriptor
            .entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility.into_wgpu(),
                ty: entry.ty.into_wgpu(),
                count: None,
            })
            .collect();

        let layout =
            self.internal
                .context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: descriptor.label,
                    entries: &entries,
                });

        let id = api_bg::BindGroupLayoutId(self.next_raw_id());
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?.insert(id, Arc::new(layout));
        log::debug!(
            "WgpuDevice: Created bind group layout '{}' with ID: {:?}",
            descriptor.label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_bind_group_layout(
        &self,
        id: api_bg::BindGroupLayoutId,
    ) -> Result<(), ResourceError> {
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .remove(&id)
            .map(|_| log::debug!("WgpuDevice: Destroyed bind group layout with ID: {id:?}"))
            .ok_or(ResourceError::NotFound)
    }

    fn create_bind_group(
        &self,
        descriptor: &api_bg::BindGroupDescriptor,
    ) -> Result<api_bg::BindGroupId, ResourceError> {
        let layout = lookup(
            &self.internal.bind_group_layouts,
            &descriptor.layout,
            "bind group layout",
        )?;

        // Resolve every resource first so the wgpu entries can borrow them.
        enum Resolved {
            Buffer(Arc<wgpu::Buffer>, u64, Option<std::num::NonZeroU64>),
            View(Arc<wgpu::TextureView>),
            Sampler(Arc<wgpu::Sampler>),
        }
        let mut resolved = Vec::with_capacity(descriptor.entries.len());
        for entry in descriptor.entries {
            let resource = match entry.resource {
                api_bg::BindingResource::Buffer(binding) => {
                    let buffer = self
                        .get_wgpu_buffer(binding.buffer)
                        .ok_or(ResourceError::NotFound)?;
                    Resolved::Buffer(buffer, binding.offset, binding.size)
                }
                api_bg::BindingResource::TextureView(view) => Resolved::View(lookup(
                    &self.internal.texture_views,
                    &view,
                    "texture view",
                )?),
                api_bg::BindingResource::Sampler(sampler) => {
                    Resolved::Sampler(lookup(&self.internal.samplers, &sampler, "sampler")?)
                }
            };
            resolved.push((entry.binding, resource));
        }

        let entries: Vec<wgpu::BindGroupEntry> = resolved
            .iter()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: match resource {
                    Resolved::Buffer(buffer, offset, size) => {
                        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer,
                            offset: *offset,
                            size: *size,
                        })
                    }
                    Resolved::View(view) => wgpu::BindingResource::TextureView(view),
                    Resolved::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
                },
            })
            .collect();

        let bind_group = self
            .internal
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: descriptor.label,
                layout: &layout,
                entries: &entries,
            });

        let id = api_bg::BindGroupId(self.next_raw_id());
        lock(&self.internal.bind_groups, "bind_groups")?.insert(id, Arc::new(bind_group));
        log::trace!("WgpuDevice: Created bind group with ID: {id:?}");
        Ok(id)
    }

    fn destroy_bind_group(&self, id: api_bg::BindGroupId) -> Result<(), ResourceError> {
        lock(&self.internal.bind_groups, "bind_groups")?
            .remove(&id)
            .map(|_| log::trace!("WgpuDevice: Destroyed bind group with ID: {id:?}"))
            .ok_or(ResourceError::NotFound)
    }

    // -- Render Pipeline Operations ---

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        log::debug!(
            "WgpuDevice: Creating render pipeline with label: {:?}",
            descriptor.label
        );

        // 1. Get the shader modules
        let module_for = |id: ShaderModuleId| {
            lookup(&self.internal.shader_modules, &id, "shader module").map_err(|_| {
                ResourceError::Pipeline(PipelineError::InvalidShaderModuleForPipeline {
                    id,
                    pipeline_label: descriptor.label.as_deref().map(String::from),
                })
            })
        };
        let vs_module = module_for(descriptor.vertex_shader_module)?;
        let fs_module = module_for(descriptor.fragment_shader_module)?;

        // 2. Convert vertex buffers layout
        let wgpu_vertex_attributes_storage: Vec<Vec<wgpu::VertexAttribute>> = descriptor
            .vertex_buffers_layout
            .iter()
            .map(|vb_layout_desc| {
                vb_layout_desc
                    .attributes
                    .iter()
                    .map(|attr_desc| wgpu::VertexAttribute {
                        format: attr_desc.format.into_wgpu(),
                        offset: attr_desc.offset,
                        shader_location: attr_desc.shader_location,
                    })
                    .collect()
            })
            .collect();

        let wgpu_vertex_buffers_layouts: Vec<wgpu::VertexBufferLayout> = descriptor
            .vertex_buffers_layout
            .iter()
            .zip(wgpu_vertex_attributes_storage.iter())
            .map(
                |(vb_layout_desc, attributes_for_this_layout)| wgpu::VertexBufferLayout {
                    array_stride: vb_layout_desc.array_stride,
                    step_mode: vb_layout_desc.step_mode.into_wgpu(),
                    attributes: attributes_for_this_layout,
                },
            )
            .collect();

        // 3. Converts primitive state
        let primitive_state = wgpu::PrimitiveState {
            topology: descriptor.primitive_state.topology.into_wgpu(),
            strip_index_format: descriptor
                .primitive_state
                .strip_index_format
                .map(|f| f.into_wgpu()),
            ..Default::default()
        };

        // 4. Convert color target states
        let color_target_states: Vec<Option<wgpu::ColorTargetState>> = descriptor
            .color_target_states
            .iter()
            .map(|cts| {
                Some(wgpu::ColorTargetState {
                    format: cts.format.into_wgpu(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        // 5. Resolve the bind group layouts
        let layouts = descriptor
            .bind_group_layouts
            .iter()
            .map(|id| lookup(&self.internal.bind_group_layouts, id, "bind group layout"))
            .collect::<Result<Vec<_>, _>>()?;
        let layout_refs: Vec<Option<&wgpu::BindGroupLayout>> =
            layouts.iter().map(|l| Some(l.as_ref())).collect();

        // 6. Create pipeline layout and render pipeline
        let device = &self.internal.context.device;
        let pipeline_layout_label = descriptor.label.as_deref().map(|s| format!("{s}_Layout"));
        let wgpu_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: pipeline_layout_label.as_deref(),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: descriptor.label.as_deref(),
            layout: Some(&wgpu_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vs_module,
                entry_point: Some(descriptor.vertex_entry_point.as_ref()),
                buffers: &wgpu_vertex_buffers_layouts,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fs_module,
                entry_point: Some(descriptor.fragment_entry_point.as_ref()),
                targets: &color_target_states,
                compilation_options: Default::default(),
            }),
            primitive: primitive_state,
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let id = RenderPipelineId(self.next_raw_id());
        lock(&self.internal.pipelines, "pipelines")?.insert(id, Arc::new(pipeline));

        log::info!(
            "WgpuDevice: Successfully created render pipeline '{}' with ID: {:?}",
            descriptor.label.as_deref().unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        if lock(&self.internal.pipelines, "pipelines")?
            .remove(&id)
            .is_some()
        {
            log::debug!("WgpuDevice: Destroyed render pipeline with ID: {id:?}");
            Ok(())
        } else {
            Err(PipelineError::InvalidRenderPipeline { id }.into())
        }
    }

    // --- Buffer Operations ---

    fn create_buffer(
        &self,
        descriptor: &api_buf::BufferDescriptor,
    ) -> Result<api_buf::BufferId, ResourceError> {
        let wgpu_buffer = self
            .internal
            .context
            .device
            .create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size,
                usage: descriptor.usage.into_wgpu(),
                mapped_at_creation: descriptor.mapped_at_creation,
            });
        let id = api_buf::BufferId(self.next_raw_id());
        self.track_allocation(descriptor.size);

        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: descriptor.size,
            },
        );

        log::trace!(
            "WgpuDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &api_buf::BufferDescriptor,
        data: &[u8],
    ) -> Result<api_buf::BufferId, ResourceError> {
        let wgpu_buffer =
            self.internal
                .context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: descriptor.label.as_deref(),
                    contents: data,
                    usage: descriptor.usage.into_wgpu(),
                });

        let id = api_buf::BufferId(self.next_raw_id());
        let buffer_size = data.len() as u64;
        self.track_allocation(buffer_size);

        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: buffer_size,
            },
        );

        log::trace!(
            "WgpuDevice: Created buffer '{}' with initial data. ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            buffer_size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: api_buf::BufferId) -> Result<(), ResourceError> {
        let entry = lock(&self.internal.buffers, "buffers")?
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        self.track_release(entry.size);
        log::trace!("WgpuDevice: Destroyed buffer with ID: {id:?}");
        Ok(())
    }

    fn write_buffer(
        &self,
        id: api_buf::BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let buffer = self.get_wgpu_buffer(id).ok_or(ResourceError::NotFound)?;
        self.internal
            .context
            .queue
            .write_buffer(&buffer, offset, data);
        Ok(())
    }

    fn read_buffer(&self, id: api_buf::BufferId) -> Result<Vec<u8>, ResourceError> {
        let buffer = self.get_wgpu_buffer(id).ok_or(ResourceError::NotFound)?;
        let slice = buffer.slice(..);

        let (sender, receiver) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        // Blocks until every submission touching the buffer has completed.
        self.internal
            .context
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| ResourceError::BackendError(format!("Device poll failed: {e}")))?;

        receiver
            .recv()
            .map_err(|e| ResourceError::BackendError(format!("Map callback dropped: {e}")))?
            .map_err(|e| ResourceError::BackendError(format!("Buffer map failed: {e}")))?;

        let bytes = {
            let view = slice.get_mapped_range();
            view.to_vec()
        };
        buffer.unmap();
        Ok(bytes)
    }

    // --- Texture Operations ---

    fn create_texture(
        &self,
        descriptor: &api_tex::TextureDescriptor,
    ) -> Result<api_tex::TextureId, ResourceError> {
        let wgpu_texture = self
            .internal
            .context
            .device
            .create_texture(&wgpu::TextureDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size.into_wgpu(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: descriptor.format.into_wgpu(),
                usage: descriptor.usage.into_wgpu(),
                view_formats: &[],
            });
        let id = api_tex::TextureId(self.next_raw_id());
        let size_in_bytes = Self::calculate_texture_size_in_bytes(descriptor);
        self.track_allocation(size_in_bytes);

        lock(&self.internal.textures, "textures")?.insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(wgpu_texture),
                size: size_in_bytes,
            },
        );

        log::debug!(
            "WgpuDevice: Created texture '{}' with ID: {:?}, size: {} bytes (VRAM)",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            size_in_bytes
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: api_tex::TextureId) -> Result<(), ResourceError> {
        let entry = lock(&self.internal.textures, "textures")?
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        self.track_release(entry.size);
        entry.wgpu_texture.destroy();
        log::debug!("WgpuDevice: Destroyed texture with ID: {id:?}");
        Ok(())
    }

    fn write_texture(
        &self,
        texture_id: api_tex::TextureId,
        data: &[u8],
        bytes_per_row: Option<u32>,
        offset: dimension::Origin3D,
        size: dimension::Extent3D,
    ) -> Result<(), ResourceError> {
        let texture = self
            .get_wgpu_texture(texture_id)
            .ok_or(ResourceError::NotFound)?;

        self.internal.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: offset.into_wgpu(),
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row,
                rows_per_image: Some(size.height),
            },
            size.into_wgpu(),
        );
        Ok(())
    }

    fn create_texture_view(
        &self,
        texture_id: api_tex::TextureId,
        descriptor: &api_tex::TextureViewDescriptor,
    ) -> Result<api_tex::TextureViewId, ResourceError> {
        let texture = self
            .get_wgpu_texture(texture_id)
            .ok_or(ResourceError::NotFound)?;

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: descriptor.label.as_deref(),
            dimension: Some(descriptor.dimension.into_wgpu()),
            base_array_layer: descriptor.base_array_layer,
            array_layer_count: Some(descriptor.array_layer_count),
            ..Default::default()
        });

        let id = api_tex::TextureViewId(self.next_raw_id());
        lock(&self.internal.texture_views, "texture_views")?.insert(id, Arc::new(view));
        log::trace!(
            "WgpuDevice: Created texture view '{}' with ID: {:?}",
            descriptor.label.as_deref().unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_texture_view(&self, id: api_tex::TextureViewId) -> Result<(), ResourceError> {
        lock(&self.internal.texture_views, "texture_views")?
            .remove(&id)
            .map(|_| log::trace!("WgpuDevice: Destroyed texture view with ID: {id:?}"))
            .ok_or(ResourceError::NotFound)
    }

    fn create_sampler(
        &self,
        descriptor: &api_tex::SamplerDescriptor,
    ) -> Result<api_tex::SamplerId, ResourceError> {
        let sampler = self
            .internal
            .context
            .device
            .create_sampler(&wgpu::SamplerDescriptor {
                label: descriptor.label.as_deref(),
                address_mode_u: descriptor.address_mode_u.into_wgpu(),
                address_mode_v: descriptor.address_mode_v.into_wgpu(),
                address_mode_w: descriptor.address_mode_w.into_wgpu(),
                mag_filter: descriptor.mag_filter.into_wgpu(),
                min_filter: descriptor.min_filter.into_wgpu(),
                ..Default::default()
            });

        let id = api_tex::SamplerId(self.next_raw_id());
        lock(&self.internal.samplers, "samplers")?.insert(id, Arc::new(sampler));
        log::debug!("WgpuDevice: Created sampler with ID: {id:?}");
        Ok(id)
    }

    fn destroy_sampler(&self, id: api_tex::SamplerId) -> Result<(), ResourceError> {
        lock(&self.internal.samplers, "samplers")?
            .remove(&id)
            .map(|_| log::debug!("WgpuDevice: Destroyed sampler with ID: {id:?}"))
            .ok_or(ResourceError::NotFound)
    }

    // --- Command Operations ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        let encoder = self
            .internal
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label });
        Box::new(WgpuCommandEncoder {
            encoder,
            device: self.clone(),
        })
    }

    fn submit_command_buffer(
        &self,
        command_buffer_id: api_cmd::CommandBufferId,
    ) -> Result<(), ResourceError> {
        let buffer = lock(
            &self.internal.pending_command_buffers,
            "pending_command_buffers",
        )?
        .remove(&command_buffer_id)
        .ok_or_else(|| {
            log::error!("WgpuDevice: Unknown command buffer {command_buffer_id:?} submitted.");
            ResourceError::InvalidHandle
        })?;
        self.internal.context.queue.submit(std::iter::once(buffer));
        Ok(())
    }

    fn get_adapter_info(&self) -> RendererAdapterInfo {
        let context = &self.internal.context;
        RendererAdapterInfo {
            name: context.adapter_name.clone(),
            backend_type: from_wgpu_backend(context.adapter_backend),
            device_type: from_wgpu_device_type(context.adapter_device_type),
        }
    }
}
