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

//! CPU evaluation of the shader programs.
//!
//! Every kernel mirrors the WGSL program of the same name: same bindings,
//! same sampling rules, same formulas (shared through `lumen_core::renderer::api::program`).

use std::sync::Arc;

use lumen_core::math::{LinearRgba, Mat4, Vec3};
use lumen_core::renderer::api::util::cube::cube_face_uv;
use lumen_core::renderer::{
    bright_pass, encode_log_luminance, equirect_uv, tone_map, view_ray, AddressMode, FilterMode,
    ReduceUniforms, TextureId, ToneMapUniforms,
};

use super::raster::Fragment;

/// Sampler state captured from a sampler object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SamplerState {
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
}

impl SamplerState {
    /// Fragments carry no derivatives, so magnification and minification cannot
    /// be told apart; linear wins when either filter asks for it.
    fn filter(&self) -> FilterMode {
        if self.mag_filter == FilterMode::Linear || self.min_filter == FilterMode::Linear {
            FilterMode::Linear
        } else {
            FilterMode::Nearest
        }
    }
}

/// A snapshot of the layers a texture view exposes to a kernel.
#[derive(Debug, Clone)]
pub(crate) struct TextureSnapshot {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Arc<Vec<LinearRgba>>>,
}

fn wrap(coord: i64, size: u32, mode: AddressMode) -> usize {
    let size = size as i64;
    let wrapped = match mode {
        AddressMode::Repeat => coord.rem_euclid(size),
        AddressMode::ClampToEdge => coord.clamp(0, size - 1),
    };
    wrapped as usize
}

impl TextureSnapshot {
    /// `textureLoad`: fetches one texel, clamping the coordinates to the layer.
    pub fn load(&self, layer: usize, x: i64, y: i64) -> LinearRgba {
        let x = wrap(x, self.width, AddressMode::ClampToEdge);
        let y = wrap(y, self.height, AddressMode::ClampToEdge);
        self.layers
            .get(layer)
            .and_then(|texels| texels.get(y * self.width as usize + x))
            .copied()
            .unwrap_or(LinearRgba::TRANSPARENT)
    }

    fn fetch(&self, layer: usize, x: i64, y: i64, sampler: &SamplerState) -> LinearRgba {
        let x = wrap(x, self.width, sampler.address_u);
        let y = wrap(y, self.height, sampler.address_v);
        self.layers
            .get(layer)
            .and_then(|texels| texels.get(y * self.width as usize + x))
            .copied()
            .unwrap_or(LinearRgba::TRANSPARENT)
    }

    /// `textureSample` on one layer at normalized coordinates.
    pub fn sample(&self, layer: usize, u: f32, v: f32, sampler: &SamplerState) -> LinearRgba {
        match sampler.filter() {
            FilterMode::Nearest => {
                let x = (u * self.width as f32).floor() as i64;
                let y = (v * self.height as f32).floor() as i64;
                self.fetch(layer, x, y, sampler)
            }
            FilterMode::Linear => {
                let fx = u * self.width as f32 - 0.5;
                let fy = v * self.height as f32 - 0.5;
                let (x0, y0) = (fx.floor(), fy.floor());
                let (tx, ty) = (fx - x0, fy - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let t00 = self.fetch(layer, x0, y0, sampler);
                let t10 = self.fetch(layer, x0 + 1, y0, sampler);
                let t01 = self.fetch(layer, x0, y0 + 1, sampler);
                let t11 = self.fetch(layer, x0 + 1, y0 + 1, sampler);
                let top = t00 * (1.0 - tx) + t10 * tx;
                let bottom = t01 * (1.0 - tx) + t11 * tx;
                top * (1.0 - ty) + bottom * ty
            }
        }
    }

    /// `textureSample` on a cube view by direction. Filtering stays within the hit face.
    pub fn sample_cube(&self, direction: Vec3, sampler: &SamplerState) -> LinearRgba {
        let edge = SamplerState {
            address_u: AddressMode::ClampToEdge,
            address_v: AddressMode::ClampToEdge,
            ..*sampler
        };
        match cube_face_uv(direction) {
            Some((face, u, v)) => self.sample(face as usize, u, v, &edge),
            None => LinearRgba::TRANSPARENT,
        }
    }
}

/// A draw's program with every binding resolved.
#[derive(Debug, Clone)]
pub(crate) enum Kernel {
    LogLuminance {
        source: TextureSnapshot,
    },
    LuminanceReduce {
        uniforms: ReduceUniforms,
        source: TextureSnapshot,
    },
    ToneMap {
        uniforms: ToneMapUniforms,
        source: TextureSnapshot,
        sampler: SamplerState,
    },
    BrightPass {
        uniforms: ToneMapUniforms,
        source: TextureSnapshot,
        sampler: SamplerState,
    },
    EquirectProjection {
        inv_view_proj: Mat4,
        panorama: TextureSnapshot,
        sampler: SamplerState,
    },
    Skybox {
        inv_view_proj: Mat4,
        cube: TextureSnapshot,
        sampler: SamplerState,
    },
    SolidColor {
        color: LinearRgba,
    },
}

/// Length of `[i, i + 1) ∩ [lo, hi)`.
fn overlap(i: u32, lo: f64, hi: f64) -> f64 {
    (f64::from(i + 1).min(hi) - f64::from(i).max(lo)).max(0.0)
}

/// Averages every source texel under the footprint of destination texel
/// `(x, y)`, weighted by the covered area.
///
/// A level therefore has exactly the mean of the level it was reduced from,
/// whatever the size ratio. For 2:1 levels this is the 2×2 box.
fn reduce_footprint(
    source: &TextureSnapshot,
    uniforms: &ReduceUniforms,
    x: u32,
    y: u32,
) -> LinearRgba {
    let footprint = |p: u32, src: u32, dst: u32| {
        let scale = f64::from(src) / f64::from(dst.max(1));
        let (lo, hi) = (f64::from(p) * scale, f64::from(p + 1) * scale);
        let covered = (lo.floor() as u32)..(hi.ceil() as u32).min(src);
        (lo, hi, covered, scale)
    };
    let [src_w, src_h] = uniforms.src_size;
    let [dst_w, dst_h] = uniforms.dst_size;
    let (x_lo, x_hi, columns, x_scale) = footprint(x, src_w, dst_w);
    let (y_lo, y_hi, rows, y_scale) = footprint(y, src_h, dst_h);

    let mut sum = 0.0f64;
    for sy in rows {
        let wy = overlap(sy, y_lo, y_hi);
        for sx in columns.clone() {
            let texel = source.load(0, i64::from(sx), i64::from(sy));
            sum += wy * overlap(sx, x_lo, x_hi) * f64::from(texel.r);
        }
    }
    LinearRgba::new((sum / (x_scale * y_scale)) as f32, 0.0, 0.0, 1.0)
}

impl Kernel {
    /// Evaluates the fragment program for one covered pixel.
    pub fn shade(&self, fragment: &Fragment) -> LinearRgba {
        let [u, v] = fragment.uv;
        match self {
            Kernel::LogLuminance { source } => {
                let texel = source.load(0, fragment.x as i64, fragment.y as i64);
                LinearRgba::new(encode_log_luminance(texel.luminance()), 0.0, 0.0, 1.0)
            }
            Kernel::LuminanceReduce { uniforms, source } => {
                reduce_footprint(source, uniforms, fragment.x, fragment.y)
            }
            Kernel::ToneMap {
                uniforms,
                source,
                sampler,
            } => tone_map(source.sample(0, u, v, sampler), uniforms.exposure),
            Kernel::BrightPass {
                uniforms,
                source,
                sampler,
            } => bright_pass(
                source.sample(0, u, v, sampler),
                uniforms.exposure,
                uniforms.bright_threshold,
            ),
            Kernel::EquirectProjection {
                inv_view_proj,
                panorama,
                sampler,
            } => {
                let direction = view_ray(inv_view_proj, fragment.ndc[0], fragment.ndc[1]);
                let (pu, pv) = equirect_uv(direction);
                panorama.sample(0, pu, pv, sampler)
            }
            Kernel::Skybox {
                inv_view_proj,
                cube,
                sampler,
            } => {
                let direction = view_ray(inv_view_proj, fragment.ndc[0], fragment.ndc[1]);
                cube.sample_cube(direction, sampler)
            }
            Kernel::SolidColor { color } => *color,
        }
    }

    /// The texture the kernel reads, if any.
    pub fn sampled_texture(&self) -> Option<TextureId> {
        match self {
            Kernel::LogLuminance { source }
            | Kernel::LuminanceReduce { source, .. }
            | Kernel::ToneMap { source, .. }
            | Kernel::BrightPass { source, .. } => Some(source.texture),
            Kernel::EquirectProjection { panorama, .. } => Some(panorama.texture),
            Kernel::Skybox { cube, .. } => Some(cube.texture),
            Kernel::SolidColor { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn snapshot(width: u32, height: u32, values: &[f32]) -> TextureSnapshot {
        TextureSnapshot {
            texture: TextureId(0),
            width,
            height,
            layers: vec![Arc::new(
                values.iter().map(|&r| LinearRgba::new(r, 0.0, 0.0, 1.0)).collect(),
            )],
        }
    }

    fn linear_clamp() -> SamplerState {
        SamplerState {
            address_u: AddressMode::ClampToEdge,
            address_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
        }
    }

    #[test]
    fn test_bilinear_sample_at_texel_centre_is_exact() {
        let tex = snapshot(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let s = linear_clamp();
        assert_relative_eq!(tex.sample(0, 0.25, 0.25, &s).r, 1.0);
        assert_relative_eq!(tex.sample(0, 0.75, 0.75, &s).r, 4.0);
        assert_relative_eq!(tex.sample(0, 0.5, 0.5, &s).r, 2.5);
    }

    #[test]
    fn test_repeat_wraps_horizontally() {
        let tex = snapshot(4, 1, &[1.0, 0.0, 0.0, 3.0]);
        let s = SamplerState {
            address_u: AddressMode::Repeat,
            ..linear_clamp()
        };
        // Halfway between the last and the first texel.
        assert_relative_eq!(tex.sample(0, 0.0, 0.5, &s).r, 2.0);
    }

    #[test]
    fn test_two_to_one_reduce_is_box_filter() {
        let tex = snapshot(2, 2, &[1.0, 2.0, 3.0, 6.0]);
        let uniforms = ReduceUniforms {
            src_size: [2, 2],
            dst_size: [1, 1],
        };
        assert_relative_eq!(reduce_footprint(&tex, &uniforms, 0, 0).r, 3.0);
    }

    #[test]
    fn test_upsampling_reduce_weights_by_overlap() {
        let tex = snapshot(3, 1, &[1.0, 2.0, 3.0]);
        let uniforms = ReduceUniforms {
            src_size: [3, 1],
            dst_size: [4, 4],
        };
        // Footprints are [0, 0.75), [0.75, 1.5), [1.5, 2.25) and [2.25, 3).
        let row: Vec<f32> = (0..4)
            .map(|x| reduce_footprint(&tex, &uniforms, x, 2).r)
            .collect();
        assert_relative_eq!(row[0], 1.0);
        assert_relative_eq!(row[1], 5.0 / 3.0, max_relative = 1e-6);
        assert_relative_eq!(row[2], 7.0 / 3.0, max_relative = 1e-6);
        assert_relative_eq!(row[3], 3.0);
        // Every source texel keeps its share of the mean.
        assert_relative_eq!(row.iter().sum::<f32>() / 4.0, 2.0, max_relative = 1e-6);
    }

    #[test]
    fn test_downsampling_reduce_covers_partial_texels() {
        let tex = snapshot(3, 1, &[3.0, 0.0, 6.0]);
        let uniforms = ReduceUniforms {
            src_size: [3, 1],
            dst_size: [2, 1],
        };
        // [0, 1.5) and [1.5, 3).
        assert_relative_eq!(reduce_footprint(&tex, &uniforms, 0, 0).r, 2.0, max_relative = 1e-6);
        assert_relative_eq!(reduce_footprint(&tex, &uniforms, 1, 0).r, 4.0, max_relative = 1e-6);
    }

    #[test]
    fn test_solid_color_ignores_fragment() {
        let kernel = Kernel::SolidColor {
            color: LinearRgba::rgb(0.5, 2.0, 4.0),
        };
        let fragment = Fragment {
            x: 3,
            y: 9,
            ndc: [0.0, 0.0],
            uv: [0.2, 0.7],
        };
        assert_eq!(kernel.shade(&fragment), LinearRgba::rgb(0.5, 2.0, 4.0));
        assert!(kernel.sampled_texture().is_none());
    }
}
