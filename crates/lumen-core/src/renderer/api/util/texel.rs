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

//! Encoding of [`LinearRgba`] texels into the byte layout of each [`TextureFormat`].
//!
//! Single-channel formats store the red channel and decode to `(r, 0, 0, 1)`.
//! sRGB formats are encoded with the sRGB transfer function.

use crate::math::color::{linear_to_srgb, srgb_to_linear};
use crate::math::LinearRgba;
use crate::renderer::TextureFormat;
use half::f16;

/// Required alignment of `bytes_per_row` for texture/buffer copies.
pub const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = 256;

/// Returns the row pitch of a copy of a `width`-texel row, padded to
/// [`COPY_BYTES_PER_ROW_ALIGNMENT`].
pub fn padded_bytes_per_row(width: u32, format: TextureFormat) -> u32 {
    let unpadded = width * format.bytes_per_pixel();
    unpadded.div_ceil(COPY_BYTES_PER_ROW_ALIGNMENT) * COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Copies `rows` rows of `unpadded` bytes out of data laid out with a `padded` pitch.
pub fn strip_row_padding(data: &[u8], unpadded: usize, padded: usize, rows: usize) -> Vec<u8> {
    if unpadded == padded {
        return data[..unpadded * rows].to_vec();
    }
    let mut out = Vec::with_capacity(unpadded * rows);
    for row in data.chunks(padded).take(rows) {
        out.extend_from_slice(&row[..unpadded]);
    }
    out
}

fn unorm8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Writes one texel into `out`, which must be `format.bytes_per_pixel()` long.
pub fn encode_texel(format: TextureFormat, texel: LinearRgba, out: &mut [u8]) {
    match format {
        TextureFormat::R32Float => out.copy_from_slice(&texel.r.to_le_bytes()),
        TextureFormat::R16Float => out.copy_from_slice(&f16::from_f32(texel.r).to_le_bytes()),
        TextureFormat::Rgba32Float => {
            for (chunk, c) in out.chunks_exact_mut(4).zip([texel.r, texel.g, texel.b, texel.a]) {
                chunk.copy_from_slice(&c.to_le_bytes());
            }
        }
        TextureFormat::Rgba16Float => {
            for (chunk, c) in out.chunks_exact_mut(2).zip([texel.r, texel.g, texel.b, texel.a]) {
                chunk.copy_from_slice(&f16::from_f32(c).to_le_bytes());
            }
        }
        TextureFormat::Rgba8Unorm => {
            out.copy_from_slice(&[unorm8(texel.r), unorm8(texel.g), unorm8(texel.b), unorm8(texel.a)]);
        }
        TextureFormat::Rgba8UnormSrgb => {
            let s = texel.to_srgb();
            out.copy_from_slice(&[unorm8(s.r), unorm8(s.g), unorm8(s.b), unorm8(s.a)]);
        }
    }
}

/// Reads one texel from `bytes`, which must be `format.bytes_per_pixel()` long.
pub fn decode_texel(format: TextureFormat, bytes: &[u8]) -> LinearRgba {
    let f32_at = |i: usize| f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    let f16_at = |i: usize| f16::from_le_bytes([bytes[i], bytes[i + 1]]).to_f32();
    let u8_at = |i: usize| bytes[i] as f32 / 255.0;
    match format {
        TextureFormat::R32Float => LinearRgba::new(f32_at(0), 0.0, 0.0, 1.0),
        TextureFormat::R16Float => LinearRgba::new(f16_at(0), 0.0, 0.0, 1.0),
        TextureFormat::Rgba32Float => LinearRgba::new(f32_at(0), f32_at(4), f32_at(8), f32_at(12)),
        TextureFormat::Rgba16Float => LinearRgba::new(f16_at(0), f16_at(2), f16_at(4), f16_at(6)),
        TextureFormat::Rgba8Unorm => LinearRgba::new(u8_at(0), u8_at(1), u8_at(2), u8_at(3)),
        TextureFormat::Rgba8UnormSrgb => LinearRgba::new(
            srgb_to_linear(u8_at(0)),
            srgb_to_linear(u8_at(1)),
            srgb_to_linear(u8_at(2)),
            u8_at(3),
        ),
    }
}

/// Rounds a texel through the precision of `format`, as storing and reloading it would.
pub fn quantize(format: TextureFormat, texel: LinearRgba) -> LinearRgba {
    let mut buf = [0u8; 16];
    let size = format.bytes_per_pixel() as usize;
    encode_texel(format, texel, &mut buf[..size]);
    decode_texel(format, &buf[..size])
}

/// Encodes a slice of texels, tightly packed.
pub fn encode_texels(format: TextureFormat, texels: &[LinearRgba]) -> Vec<u8> {
    let size = format.bytes_per_pixel() as usize;
    let mut bytes = vec![0u8; texels.len() * size];
    for (chunk, texel) in bytes.chunks_exact_mut(size).zip(texels) {
        encode_texel(format, *texel, chunk);
    }
    bytes
}

/// Decodes tightly packed texel bytes.
pub fn decode_texels(format: TextureFormat, bytes: &[u8]) -> Vec<LinearRgba> {
    bytes
        .chunks_exact(format.bytes_per_pixel() as usize)
        .map(|chunk| decode_texel(format, chunk))
        .collect()
}

/// Maps a linear value to its sRGB-encoded 8-bit value.
pub fn linear_to_srgb8(c: f32) -> u8 {
    unorm8(linear_to_srgb(c.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(1, TextureFormat::R32Float), 256);
        assert_eq!(padded_bytes_per_row(64, TextureFormat::R32Float), 256);
        assert_eq!(padded_bytes_per_row(65, TextureFormat::R32Float), 512);
        assert_eq!(padded_bytes_per_row(32, TextureFormat::Rgba16Float), 256);
    }

    #[test]
    fn test_strip_row_padding() {
        let mut data = vec![0u8; 512];
        data[0..4].copy_from_slice(&[1, 2, 3, 4]);
        data[256..260].copy_from_slice(&[5, 6, 7, 8]);
        assert_eq!(strip_row_padding(&data, 4, 256, 2), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_float_formats_keep_hdr_values() {
        let c = LinearRgba::new(12.5, 0.25, 3.0, 1.0);
        assert_eq!(quantize(TextureFormat::Rgba32Float, c), c);
        let half = quantize(TextureFormat::Rgba16Float, c);
        assert_relative_eq!(half.r, 12.5);
        assert_relative_eq!(half.g, 0.25);
        assert_eq!(quantize(TextureFormat::R32Float, c), LinearRgba::new(12.5, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_unorm_formats_clamp() {
        let c = quantize(TextureFormat::Rgba8Unorm, LinearRgba::new(2.0, -1.0, 0.5, 1.0));
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert_relative_eq!(c.b, 128.0 / 255.0);
    }

    #[test]
    fn test_srgb_round_trip_within_quantization() {
        let c = LinearRgba::rgb(0.2, 0.5, 0.8);
        let q = quantize(TextureFormat::Rgba8UnormSrgb, c);
        assert_relative_eq!(q.r, c.r, epsilon = 5e-3);
        assert_relative_eq!(q.g, c.g, epsilon = 5e-3);
        assert_relative_eq!(q.b, c.b, epsilon = 5e-3);
        assert_eq!(linear_to_srgb8(1.0), 255);
        assert_eq!(linear_to_srgb8(0.0), 0);
    }

    #[test]
    fn test_encode_texels_layout() {
        let bytes = encode_texels(TextureFormat::R32Float, &[LinearRgba::splat(1.0), LinearRgba::splat(2.0)]);
        assert_eq!(bytes.len(), 8);
        let back = decode_texels(TextureFormat::R32Float, &bytes);
        assert_eq!(back[1].r, 2.0);
    }
}
