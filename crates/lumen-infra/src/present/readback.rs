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

use std::sync::Arc;

use image::RgbaImage;
use lumen_core::math::LinearRgba;
use lumen_core::renderer::api::util::texel::linear_to_srgb8;
use lumen_core::renderer::resource::{GpuTexture, ResourcePool};
use lumen_core::renderer::{GraphicsDevice, Presenter, RenderError, TextureFormat};

/// Converts decoded texels of a `width x height` frame into an 8-bit sRGB image.
///
/// Texels of `Rgba8Unorm` frames are taken to be display-encoded already; every
/// other format is treated as linear. Single-channel formats are shown as grey.
pub fn frame_to_rgba8(
    width: u32,
    height: u32,
    format: TextureFormat,
    texels: &[LinearRgba],
) -> Option<RgbaImage> {
    let unorm = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut bytes = Vec::with_capacity(texels.len() * 4);
    for t in texels {
        let rgb = match format {
            TextureFormat::R16Float | TextureFormat::R32Float => [t.r, t.r, t.r],
            _ => [t.r, t.g, t.b],
        };
        match format {
            TextureFormat::Rgba8Unorm => bytes.extend(rgb.map(unorm)),
            _ => bytes.extend(rgb.map(linear_to_srgb8)),
        }
        bytes.push(unorm(t.a));
    }
    RgbaImage::from_raw(width, height, bytes)
}

/// A presenter that copies frames back to the CPU on request.
///
/// Readback blocks on the device, so it only happens for frames asked for with
/// [`ReadbackPresenter::capture_next`].
#[derive(Debug)]
pub struct ReadbackPresenter {
    pool: ResourcePool,
    capture_requested: bool,
    last_capture: Option<RgbaImage>,
    frames_presented: u64,
}

impl ReadbackPresenter {
    /// Creates a presenter reading back through `device`.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            pool: ResourcePool::new(device),
            capture_requested: false,
            last_capture: None,
            frames_presented: 0,
        }
    }

    /// Captures the next presented frame.
    pub fn capture_next(&mut self) {
        self.capture_requested = true;
    }

    /// Takes the most recent capture, if any.
    pub fn take_capture(&mut self) -> Option<RgbaImage> {
        self.last_capture.take()
    }

    /// Number of frames received so far.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Copies `frame` back immediately and converts it to 8-bit sRGB.
    pub fn capture(&self, frame: &GpuTexture) -> Result<RgbaImage, RenderError> {
        let device = self.pool.device();
        let mut encoder = device.create_command_encoder(Some("Frame readback"));
        let staging = self.pool.create_staging_copy(encoder.as_mut(), frame)?;
        device.submit_command_buffer(encoder.finish())?;

        let texels = staging.map()?;
        let extent = staging.extent();
        frame_to_rgba8(extent.width, extent.height, staging.format(), &texels).ok_or_else(|| {
            RenderError::Internal(format!(
                "readback of '{}' returned {} texels for {}x{}",
                frame.label(),
                texels.len(),
                extent.width,
                extent.height
            ))
        })
    }
}

impl Presenter for ReadbackPresenter {
    fn present(&mut self, frame: &GpuTexture) -> Result<(), RenderError> {
        self.frames_presented += 1;
        if self.capture_requested {
            self.capture_requested = false;
            let image = self.capture(frame)?;
            log::debug!(
                "ReadbackPresenter: captured frame {} ({}x{})",
                self.frames_presented,
                image.width(),
                image.height()
            );
            self.last_capture = Some(image);
        }
        Ok(())
    }
}
