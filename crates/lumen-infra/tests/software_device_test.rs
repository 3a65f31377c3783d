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

use approx::assert_relative_eq;
use lumen_core::math::{Extent2D, LinearRgba};
use lumen_core::renderer::api::util::texel;
use lumen_core::renderer::api::*;
use lumen_core::renderer::resource::{
    BindGroup, BindGroupLayout, GpuTexture, PipelineSpec, Primitive, ProgramPipeline,
    RenderTarget, ResourcePool, Sampler, TextureSpec, UniformBuffer,
};
use lumen_core::renderer::{
    GraphicsDevice, PipelineError, Presenter, ResourceError, ShaderError,
};
use lumen_infra::{ReadbackPresenter, SoftwareDevice};
use std::sync::Arc;

const NO_SOURCE: &str = "// evaluated natively";

fn devices() -> (SoftwareDevice, Arc<dyn GraphicsDevice>) {
    let software = SoftwareDevice::new();
    let shared: Arc<dyn GraphicsDevice> = Arc::new(software.clone());
    (software, shared)
}

fn uniform_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry::uniform(binding, ShaderStageFlags::FRAGMENT)
}

fn texture_entry(binding: u32, filterable: bool) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry::texture(
        binding,
        ShaderStageFlags::FRAGMENT,
        TextureSampleType::Float { filterable },
        TextureViewDimension::D2,
    )
}

fn pipeline(
    device: &Arc<dyn GraphicsDevice>,
    program: ShaderProgram,
    layout: &BindGroupLayout,
    target_format: TextureFormat,
) -> Result<ProgramPipeline, ResourceError> {
    ProgramPipeline::new(
        device.clone(),
        &PipelineSpec {
            label: program.name(),
            program,
            source: NO_SOURCE,
            bind_group_layouts: &[layout.id()],
            target_format,
            topology: PrimitiveTopology::TriangleList,
        },
    )
}

fn draw(
    device: &Arc<dyn GraphicsDevice>,
    pipeline: &ProgramPipeline,
    group: &BindGroup,
    primitive: &Primitive,
    target: &RenderTarget,
    load: LoadOp<LinearRgba>,
) -> Result<(), ResourceError> {
    let mut encoder = device.create_command_encoder(Some("test"));
    {
        let attachments = [RenderPassColorAttachment {
            view: target.view(),
            ops: Operations {
                load,
                store: StoreOp::Store,
            },
        }];
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("test pass"),
            color_attachments: &attachments,
        });
        pass.set_pipeline(pipeline.id());
        pass.set_bind_group(0, group.id());
        primitive.draw(&mut *pass);
    }
    device.submit_command_buffer(encoder.finish())
}

fn solid_color_setup(
    device: &Arc<dyn GraphicsDevice>,
    color: LinearRgba,
    format: TextureFormat,
) -> (BindGroupLayout, UniformBuffer<ColorUniforms>, BindGroup, ProgramPipeline) {
    let layout = BindGroupLayout::new(device.clone(), "color layout", &[uniform_entry(0)]).unwrap();
    let uniforms = UniformBuffer::new(device.clone(), "color", &ColorUniforms::from(color)).unwrap();
    let group = BindGroup::new(
        device.clone(),
        &BindGroupDescriptor {
            label: Some("color group"),
            layout: layout.id(),
            entries: &[BindGroupEntry::buffer(0, uniforms.id())],
        },
    )
    .unwrap();
    let pipeline = pipeline(device, ShaderProgram::SolidColor, &layout, format).unwrap();
    (layout, uniforms, group, pipeline)
}

fn read_face0(pool: &ResourcePool, texture: &GpuTexture) -> Vec<LinearRgba> {
    let device = pool.device();
    let mut encoder = device.create_command_encoder(Some("readback"));
    let staging = pool.create_staging_copy(encoder.as_mut(), texture).unwrap();
    device.submit_command_buffer(encoder.finish()).unwrap();
    staging.map().unwrap()
}

#[test]
fn test_solid_color_fills_target_through_staging_copy() {
    let (_software, device) = devices();
    let pool = ResourcePool::new(device.clone());
    let color = LinearRgba::rgb(0.25, 2.0, 8.0);
    let (_layout, _uniforms, group, pipeline) =
        solid_color_setup(&device, color, TextureFormat::Rgba16Float);
    let quad = Primitive::screen_quad(device.clone()).unwrap();

    let mut target = pool
        .create_texture(&TextureSpec::render_target("target", Extent2D::new(7, 5), TextureFormat::Rgba16Float))
        .unwrap();
    let rt = pool.create_render_target(&mut target, 0).unwrap();
    draw(&device, &pipeline, &group, &quad, &rt, LoadOp::Clear(LinearRgba::BLACK)).unwrap();

    let texels = read_face0(&pool, &target);
    assert_eq!(texels.len(), 35);
    for t in texels {
        assert_eq!(t, texel::quantize(TextureFormat::Rgba16Float, color));
    }
}

#[test]
fn test_inset_quad_only_touches_top_left_window() {
    let (_software, device) = devices();
    let pool = ResourcePool::new(device.clone());
    let (_layout, _uniforms, group, pipeline) =
        solid_color_setup(&device, LinearRgba::WHITE, TextureFormat::Rgba8Unorm);
    let inset = Primitive::screen_inset_quad(device.clone(), 0.0).unwrap();

    let mut target = pool
        .create_texture(&TextureSpec::render_target("target", Extent2D::new(8, 8), TextureFormat::Rgba8Unorm))
        .unwrap();
    let rt = pool.create_render_target(&mut target, 0).unwrap();
    draw(&device, &pipeline, &group, &inset, &rt, LoadOp::Clear(LinearRgba::BLACK)).unwrap();

    let texels = read_face0(&pool, &target);
    for (i, t) in texels.iter().enumerate() {
        let (x, y) = (i % 8, i / 8);
        let expected = if x < 4 && y < 4 { 1.0 } else { 0.0 };
        assert_eq!(t.r, expected, "texel ({x}, {y})");
    }
}

#[test]
fn test_log_luminance_pass_matches_formula() {
    let (_software, device) = devices();
    let pool = ResourcePool::new(device.clone());
    let source_texels = vec![
        LinearRgba::rgb(1.0, 1.0, 1.0),
        LinearRgba::rgb(0.0, 0.0, 0.0),
        LinearRgba::rgb(4.0, 0.5, 0.25),
        LinearRgba::rgb(100.0, 100.0, 100.0),
    ];
    let source = pool
        .upload_texture(
            &TextureSpec::sampled("hdr", Extent2D::new(2, 2), TextureFormat::Rgba32Float),
            &source_texels,
        )
        .unwrap();
    let layout = BindGroupLayout::new(device.clone(), "log layout", &[texture_entry(0, false)]).unwrap();
    let group = BindGroup::new(
        device.clone(),
        &BindGroupDescriptor {
            label: Some("log group"),
            layout: layout.id(),
            entries: &[BindGroupEntry::texture_view(0, source.sampled_view().unwrap())],
        },
    )
    .unwrap();
    let pipeline = pipeline(&device, ShaderProgram::LogLuminance, &layout, TextureFormat::R32Float).unwrap();
    let quad = Primitive::screen_quad(device.clone()).unwrap();

    let mut log_texture = pool
        .create_texture(&TextureSpec::render_target("log", Extent2D::new(2, 2), TextureFormat::R32Float))
        .unwrap();
    let rt = pool.create_render_target(&mut log_texture, 0).unwrap();
    draw(&device, &pipeline, &group, &quad, &rt, LoadOp::Clear(LinearRgba::BLACK)).unwrap();

    let texels = read_face0(&pool, &log_texture);
    for (written, input) in texels.iter().zip(&source_texels) {
        assert_relative_eq!(written.r, encode_log_luminance(input.luminance()), epsilon = 1e-6);
    }
}

#[test]
fn test_reduce_pass_box_filters_two_to_one() {
    let (_software, device) = devices();
    let pool = ResourcePool::new(device.clone());
    let values: Vec<LinearRgba> = (0..16)
        .map(|i| LinearRgba::new(i as f32, 0.0, 0.0, 1.0))
        .collect();
    let source = pool
        .upload_texture(
            &TextureSpec::sampled("level 0", Extent2D::new(4, 4), TextureFormat::R32Float),
            &values,
        )
        .unwrap();

    let layout = BindGroupLayout::new(
        device.clone(),
        "reduce layout",
        &[uniform_entry(0), texture_entry(1, false)],
    )
    .unwrap();
    let uniforms = UniformBuffer::new(
        device.clone(),
        "reduce",
        &ReduceUniforms {
            src_size: [4, 4],
            dst_size: [2, 2],
        },
    )
    .unwrap();
    let group = BindGroup::new(
        device.clone(),
        &BindGroupDescriptor {
            label: Some("reduce group"),
            layout: layout.id(),
            entries: &[
                BindGroupEntry::buffer(0, uniforms.id()),
                BindGroupEntry::texture_view(1, source.sampled_view().unwrap()),
            ],
        },
    )
    .unwrap();
    let pipeline = pipeline(&device, ShaderProgram::LuminanceReduce, &layout, TextureFormat::R32Float).unwrap();
    let quad = Primitive::screen_quad(device.clone()).unwrap();
    let mut level = pool
        .create_texture(&TextureSpec::render_target("level 1", Extent2D::new(2, 2), TextureFormat::R32Float))
        .unwrap();
    let rt = pool.create_render_target(&mut level, 0).unwrap();
    draw(&device, &pipeline, &group, &quad, &rt, LoadOp::Clear(LinearRgba::BLACK)).unwrap();

    let texels = read_face0(&pool, &level);
    // Top-left block holds 0, 1, 4, 5.
    assert_relative_eq!(texels[0].r, 2.5);
    assert_relative_eq!(texels[1].r, 4.5);
    assert_relative_eq!(texels[2].r, 10.5);
    assert_relative_eq!(texels[3].r, 12.5);
}

#[test]
fn test_tone_map_pass_applies_exposure_and_curve() {
    let (_software, device) = devices();
    let pool = ResourcePool::new(device.clone());
    let hdr = LinearRgba::rgb(0.5, 1.0, 3.0);
    let source = pool
        .upload_texture(
            &TextureSpec::sampled("hdr", Extent2D::new(4, 4), TextureFormat::Rgba16Float),
            &vec![hdr; 16],
        )
        .unwrap();
    let layout = BindGroupLayout::new(
        device.clone(),
        "tone layout",
        &[
            uniform_entry(0),
            texture_entry(1, true),
            BindGroupLayoutEntry::sampler(2, ShaderStageFlags::FRAGMENT, SamplerBindingType::Filtering),
        ],
    )
    .unwrap();
    let uniforms = UniformBuffer::new(device.clone(), "tone", &ToneMapUniforms::new(2.0, 1.0)).unwrap();
    let sampler = Sampler::new(device.clone(), &SamplerDescriptor::default()).unwrap();
    let group = BindGroup::new(
        device.clone(),
        &BindGroupDescriptor {
            label: Some("tone group"),
            layout: layout.id(),
            entries: &[
                BindGroupEntry::buffer(0, uniforms.id()),
                BindGroupEntry::texture_view(1, source.sampled_view().unwrap()),
                BindGroupEntry::sampler(2, sampler.id()),
            ],
        },
    )
    .unwrap();
    let pipeline = pipeline(&device, ShaderProgram::ToneMap, &layout, TextureFormat::Rgba16Float).unwrap();
    let quad = Primitive::screen_quad(device.clone()).unwrap();
    let mut output = pool
        .create_texture(&TextureSpec::render_target("ldr", Extent2D::new(4, 4), TextureFormat::Rgba16Float))
        .unwrap();
    let rt = pool.create_render_target(&mut output, 0).unwrap();
    draw(&device, &pipeline, &group, &quad, &rt, LoadOp::Clear(LinearRgba::BLACK)).unwrap();

    let stored = texel::quantize(TextureFormat::Rgba16Float, hdr);
    let expected = tone_map(stored, 2.0);
    for t in read_face0(&pool, &output) {
        assert_relative_eq!(t.r, expected.r, epsilon = 2e-3);
        assert_relative_eq!(t.g, expected.g, epsilon = 2e-3);
        assert_relative_eq!(t.b, expected.b, epsilon = 2e-3);
    }
}

#[test]
fn test_custom_program_is_rejected_at_pipeline_creation() {
    let (_software, device) = devices();
    let layout = BindGroupLayout::new(device.clone(), "layout", &[uniform_entry(0)]).unwrap();
    let result = pipeline(
        &device,
        ShaderProgram::Custom("pbr"),
        &layout,
        TextureFormat::Rgba16Float,
    );
    assert!(matches!(
        result,
        Err(ResourceError::Shader(ShaderError::UnsupportedProgram { .. }))
    ));
}

#[test]
fn test_target_format_mismatch_fails_the_submission() {
    let (_software, device) = devices();
    let pool = ResourcePool::new(device.clone());
    let (_layout, _uniforms, group, pipeline) =
        solid_color_setup(&device, LinearRgba::WHITE, TextureFormat::Rgba16Float);
    let quad = Primitive::screen_quad(device.clone()).unwrap();
    let mut target = pool
        .create_texture(&TextureSpec::render_target("target", Extent2D::new(2, 2), TextureFormat::R32Float))
        .unwrap();
    let rt = pool.create_render_target(&mut target, 0).unwrap();
    let result = draw(&device, &pipeline, &group, &quad, &rt, LoadOp::Load);
    assert!(matches!(
        result,
        Err(ResourceError::Pipeline(PipelineError::IncompatibleColorTarget(_)))
    ));
}

#[test]
fn test_filterable_binding_of_float32_texture_is_rejected() {
    let (_software, device) = devices();
    let pool = ResourcePool::new(device.clone());
    let texture = pool
        .create_texture(&TextureSpec::render_target("log", Extent2D::new(2, 2), TextureFormat::R32Float))
        .unwrap();
    let layout = BindGroupLayout::new(device.clone(), "layout", &[texture_entry(0, true)]).unwrap();
    let result = BindGroup::new(
        device.clone(),
        &BindGroupDescriptor {
            label: Some("bad group"),
            layout: layout.id(),
            entries: &[BindGroupEntry::texture_view(0, texture.sampled_view().unwrap())],
        },
    );
    assert!(matches!(result, Err(ResourceError::BackendError(_))));
}

#[test]
fn test_sampling_the_render_target_is_rejected() {
    let (_software, device) = devices();
    let pool = ResourcePool::new(device.clone());
    let mut texture = pool
        .create_texture(&TextureSpec::render_target("log", Extent2D::new(2, 2), TextureFormat::R32Float))
        .unwrap();
    let layout = BindGroupLayout::new(device.clone(), "layout", &[texture_entry(0, false)]).unwrap();
    let group = BindGroup::new(
        device.clone(),
        &BindGroupDescriptor {
            label: Some("feedback group"),
            layout: layout.id(),
            entries: &[BindGroupEntry::texture_view(0, texture.sampled_view().unwrap())],
        },
    )
    .unwrap();
    let pipeline = pipeline(&device, ShaderProgram::LogLuminance, &layout, TextureFormat::R32Float).unwrap();
    let quad = Primitive::screen_quad(device.clone()).unwrap();
    let rt = pool.create_render_target(&mut texture, 0).unwrap();
    let result = draw(&device, &pipeline, &group, &quad, &rt, LoadOp::Load);
    assert!(matches!(result, Err(ResourceError::BackendError(_))));
}

#[test]
fn test_texture_fault_fires_once_after_successes() {
    let (software, device) = devices();
    let pool = ResourcePool::new(device);
    let spec = TextureSpec::render_target("t", Extent2D::new(1, 1), TextureFormat::R32Float);
    software.fail_texture_creation_after(1);
    let first = pool.create_texture(&spec);
    let second = pool.create_texture(&spec);
    let third = pool.create_texture(&spec);
    assert!(first.is_ok());
    assert!(matches!(second, Err(ResourceError::BackendError(_))));
    assert!(third.is_ok());
}

#[test]
fn test_stats_track_live_and_peak_textures() {
    let (software, device) = devices();
    let pool = ResourcePool::new(device);
    let spec = TextureSpec::render_target("t", Extent2D::new(1, 1), TextureFormat::R32Float);
    {
        let _a = pool.create_texture(&spec).unwrap();
        let _b = pool.create_texture(&spec).unwrap();
        let stats = software.stats();
        assert_eq!(stats.live_textures, 2);
        assert_eq!(stats.live_texture_views, 2);
    }
    let stats = software.stats();
    assert_eq!(stats.live_textures, 0);
    assert_eq!(stats.live_texture_views, 0);
    assert_eq!(stats.peak_textures, 2);
    software.reset_peak();
    assert_eq!(software.stats().peak_textures, 0);
}

#[test]
fn test_submitting_twice_is_an_invalid_handle() {
    let (_software, device) = devices();
    let encoder = device.create_command_encoder(None);
    let id = encoder.finish();
    device.submit_command_buffer(id).unwrap();
    assert!(matches!(
        device.submit_command_buffer(id),
        Err(ResourceError::InvalidHandle)
    ));
}

#[test]
fn test_readback_presenter_captures_only_on_request() {
    let (_software, device) = devices();
    let pool = ResourcePool::new(device.clone());
    let (_layout, _uniforms, group, pipeline) =
        solid_color_setup(&device, LinearRgba::rgb(0.5, 0.0, 1.0), TextureFormat::Rgba16Float);
    let quad = Primitive::screen_quad(device.clone()).unwrap();
    let mut frame = pool
        .create_texture(&TextureSpec::render_target("frame", Extent2D::new(3, 2), TextureFormat::Rgba16Float))
        .unwrap();
    let rt = pool.create_render_target(&mut frame, 0).unwrap();
    draw(&device, &pipeline, &group, &quad, &rt, LoadOp::Clear(LinearRgba::BLACK)).unwrap();

    let mut presenter = ReadbackPresenter::new(device.clone());
    presenter.present(&frame).unwrap();
    assert!(presenter.take_capture().is_none());

    presenter.capture_next();
    presenter.present(&frame).unwrap();
    let image = presenter.take_capture().unwrap();
    assert_eq!(presenter.frames_presented(), 2);
    assert_eq!((image.width(), image.height()), (3, 2));
    let pixel = image.get_pixel(2, 1).0;
    assert_eq!(pixel, [texel::linear_to_srgb8(0.5), 0, 255, 255]);
}
