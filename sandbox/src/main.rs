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

// Lumen sandbox
// Renders a few frames of an environment headlessly and writes the last one as a PNG.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lumen_agents::{CameraInput, RenderAgent, RenderSettings, SkyboxUnit, SolidColorUnit};
use lumen_core::math::{Extent2D, LinearRgba, Vec3};
use lumen_core::renderer::resource::{GpuTexture, ResourcePool, TextureSpec};
use lumen_core::renderer::{equirect_direction, GraphicsDevice, TextureFormat};
use lumen_infra::{ReadbackPresenter, SoftwareDevice, WgpuDevice};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SKY_WIDTH: u32 = 512;
const SKY_HEIGHT: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Headless wgpu on the preferred adapter.
    Wgpu,
    /// The CPU rasterizer.
    Software,
}

#[derive(Debug, Parser)]
#[command(version, about = "Renders an adaptively exposed environment to a PNG")]
struct Args {
    /// Number of frames to render.
    #[arg(short, long, default_value_t = 60)]
    frames: u32,

    /// Viewport width, overriding the settings file.
    #[arg(long)]
    width: Option<u32>,

    /// Viewport height, overriding the settings file.
    #[arg(long)]
    height: Option<u32>,

    /// Frame step fed to the exposure filter, in seconds.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Camera yaw per frame, in degrees.
    #[arg(long, default_value_t = 1.0)]
    spin: f32,

    /// Graphics backend.
    #[arg(short, long, value_enum, default_value_t = Backend::Wgpu)]
    backend: Backend,

    /// Equirectangular Radiance HDR panorama. A procedural sky is used otherwise.
    #[arg(short, long)]
    panorama: Option<PathBuf>,

    /// RON render settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where the last frame is written.
    #[arg(short, long, default_value = "frame.png")]
    output: PathBuf,
}

fn open_device(backend: Backend) -> Result<Arc<dyn GraphicsDevice>> {
    let device: Arc<dyn GraphicsDevice> = match backend {
        Backend::Wgpu => Arc::new(WgpuDevice::headless().context("no wgpu adapter available")?),
        Backend::Software => Arc::new(SoftwareDevice::new()),
    };
    Ok(device)
}

/// A clear sky over a dark ground with a small, very bright sun.
fn procedural_sky() -> Vec<LinearRgba> {
    let sun = Vec3::new(0.4, 0.5, 0.77).normalize();
    let zenith = LinearRgba::rgb(0.15, 0.3, 0.8);
    let horizon = LinearRgba::rgb(0.8, 0.85, 0.9);
    let ground = LinearRgba::rgb(0.08, 0.07, 0.06);

    let mut texels = Vec::with_capacity((SKY_WIDTH * SKY_HEIGHT) as usize);
    for y in 0..SKY_HEIGHT {
        for x in 0..SKY_WIDTH {
            let u = (x as f32 + 0.5) / SKY_WIDTH as f32;
            let v = (y as f32 + 0.5) / SKY_HEIGHT as f32;
            let d = equirect_direction(u, v);
            let base = if d.y >= 0.0 {
                horizon * (1.0 - d.y) + zenith * d.y
            } else {
                ground
            };
            let texel = if d.dot(sun) > 0.999 {
                LinearRgba::splat(200.0)
            } else {
                base
            };
            texels.push(texel);
        }
    }
    texels
}

fn load_panorama(pool: &ResourcePool, path: Option<&Path>) -> Result<GpuTexture> {
    let (extent, texels, label) = match path {
        Some(path) => {
            let image = image::open(path)
                .with_context(|| format!("failed to decode {}", path.display()))?
                .into_rgb32f();
            let extent = Extent2D::new(image.width(), image.height());
            let texels = image
                .pixels()
                .map(|p| LinearRgba::rgb(p[0], p[1], p[2]))
                .collect::<Vec<_>>();
            log::info!(
                "Decoded panorama {} ({}x{}).",
                path.display(),
                extent.width,
                extent.height
            );
            (extent, texels, path.display().to_string())
        }
        None => (
            Extent2D::new(SKY_WIDTH, SKY_HEIGHT),
            procedural_sky(),
            "procedural sky".to_string(),
        ),
    };
    let panorama = pool.upload_texture(
        &TextureSpec::sampled(label, extent, TextureFormat::Rgba16Float),
        &texels,
    )?;
    Ok(panorama)
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .init();

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => RenderSettings::load(path)?,
        None => RenderSettings::default(),
    };
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }

    let device = open_device(args.backend)?;
    let presenter = ReadbackPresenter::new(device.clone());
    let mut agent = RenderAgent::new(device, presenter, settings)?;

    let panorama = load_panorama(agent.resource_pool(), args.panorama.as_deref())?;
    agent.set_environment(panorama);
    agent.add_unit(Box::new(SkyboxUnit::new()))?;
    // A small emissive panel so the exposure has something to react to as it turns into view.
    agent.add_unit(Box::new(SolidColorUnit::rect(
        LinearRgba::rgb(20.0, 18.0, 15.0),
        0.6,
        0.9,
        -0.3,
        0.3,
    )))?;

    for frame in 0..args.frames {
        if frame + 1 == args.frames {
            agent.presenter_mut().capture_next();
        }
        agent.queue_camera_input(CameraInput::Rotate {
            yaw_degrees: args.spin,
            pitch_degrees: 0.0,
        });
        let report = agent.render_frame_with_delta(args.dt)?;
        log::info!(
            "frame {:>4}: measured {}, adapted {}, exposure {:.4}",
            report.frame_index,
            report
                .measured_luminance
                .map_or_else(|| "-".to_string(), |l| format!("{l:.4}")),
            report
                .adapted_luminance
                .map_or_else(|| "-".to_string(), |l| format!("{l:.4}")),
            report.exposure
        );
    }

    let image = agent
        .presenter_mut()
        .take_capture()
        .context("no frame was captured")?;
    image
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!("Wrote {}.", args.output.display());
    Ok(())
}
