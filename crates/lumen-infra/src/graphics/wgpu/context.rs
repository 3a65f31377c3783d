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

use anyhow::anyhow;
use anyhow::Result;

/// Holds the core WGPU state objects required for rendering.
///
/// The context is headless: frames are rendered into textures and handed to a
/// [`Presenter`](lumen_core::renderer::Presenter), never to a window surface.
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    /// The selected adapter.
    pub adapter: wgpu::Adapter,
    /// The logical device.
    pub device: wgpu::Device,
    /// The device's command queue.
    pub queue: wgpu::Queue,

    // Store info for easy access
    /// Human-readable adapter name.
    pub adapter_name: String,
    /// The native API behind the adapter.
    pub adapter_backend: wgpu::Backend,
    /// Integrated, discrete, virtual or CPU.
    pub adapter_device_type: wgpu::DeviceType,
    /// Limits of the opened device.
    pub device_limits: wgpu::Limits,
}

impl WgpuGraphicsContext {
    /// Asynchronously selects an adapter and opens a logical device on it.
    ///
    /// ## Arguments
    /// * `power_preference` - Which adapter to prefer when several are present.
    ///
    /// ## Returns
    /// * `Result<Self>` - The initialized context, or an error if no adapter or
    ///   device is available.
    pub async fn new_headless(power_preference: wgpu::PowerPreference) -> Result<Self> {
        log::info!("Initializing headless WGPU Graphics Context...");

        let instance = wgpu::Instance::default();

        // --- 1. Select Adapter ---
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("No suitable graphics adapter found: {}", e))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        // --- 2. Create Logical Device and Command Queue from Adapter ---
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Lumen Logical Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("Logical device and command queue created.");

        let device_limits = device.limits();
        log::debug!("Device limits: {device_limits:?}");

        Ok(WgpuGraphicsContext {
            adapter,
            device,
            queue,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            adapter_device_type: adapter_info.device_type,
            device_limits,
        })
    }

    /// Blocking variant of [`WgpuGraphicsContext::new_headless`].
    pub fn blocking_new(power_preference: wgpu::PowerPreference) -> Result<Self> {
        pollster::block_on(Self::new_headless(power_preference))
    }

    /// The logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
