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

//! Triangle setup and scan conversion for the software backend.
//!
//! Coverage is sampled at pixel centres. Attributes are interpolated affinely,
//! which is exact for the flat screen-space geometry every program draws.

use lumen_core::renderer::PrimitiveTopology;

/// A vertex after fetch: clip-space position (w = 1) and texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RasterVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// One covered pixel and its interpolated inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Fragment {
    pub x: u32,
    pub y: u32,
    /// Normalized device coordinates of the pixel centre.
    pub ndc: [f32; 2],
    pub uv: [f32; 2],
}

/// Splits an index stream into triangles.
///
/// Strips restart at `restart`; list topologies ignore it and drop a trailing
/// partial triangle.
pub(crate) fn assemble_triangles(
    indices: &[u32],
    topology: PrimitiveTopology,
    restart: Option<u32>,
) -> Vec<[u32; 3]> {
    match topology {
        PrimitiveTopology::TriangleList => indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect(),
        PrimitiveTopology::TriangleStrip => {
            let mut triangles = Vec::new();
            let runs = indices.split(|i| Some(*i) == restart);
            for run in runs {
                for (n, window) in run.windows(3).enumerate() {
                    // Odd triangles swap their first two vertices to keep the winding.
                    if n % 2 == 0 {
                        triangles.push([window[0], window[1], window[2]]);
                    } else {
                        triangles.push([window[1], window[0], window[2]]);
                    }
                }
            }
            triangles
        }
    }
}

const COVERAGE_EPSILON: f32 = 1e-6;

#[inline]
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn to_pixel(v: &RasterVertex, width: u32, height: u32) -> [f32; 2] {
    [
        (v.position[0] + 1.0) * 0.5 * width as f32,
        (1.0 - v.position[1]) * 0.5 * height as f32,
    ]
}

/// Calls `shade` for every pixel centre of a `width x height` target covered by the triangle.
///
/// Both windings are accepted; degenerate triangles cover nothing.
pub(crate) fn rasterize_triangle(
    vertices: [RasterVertex; 3],
    width: u32,
    height: u32,
    mut shade: impl FnMut(Fragment),
) {
    let p = vertices.map(|v| to_pixel(&v, width, height));
    let area = edge(p[0], p[1], p[2]);
    if area.abs() <= f32::EPSILON {
        return;
    }

    let min_x = p.iter().map(|q| q[0]).fold(f32::INFINITY, f32::min);
    let max_x = p.iter().map(|q| q[0]).fold(f32::NEG_INFINITY, f32::max);
    let min_y = p.iter().map(|q| q[1]).fold(f32::INFINITY, f32::min);
    let max_y = p.iter().map(|q| q[1]).fold(f32::NEG_INFINITY, f32::max);

    let x0 = min_x.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().max(0.0) as u32).min(width);
    let y0 = min_y.floor().max(0.0) as u32;
    let y1 = (max_y.ceil().max(0.0) as u32).min(height);

    let inv_area = 1.0 / area;
    for y in y0..y1 {
        for x in x0..x1 {
            let centre = [x as f32 + 0.5, y as f32 + 0.5];
            let b0 = edge(p[1], p[2], centre) * inv_area;
            let b1 = edge(p[2], p[0], centre) * inv_area;
            let b2 = edge(p[0], p[1], centre) * inv_area;
            // Shared edges may be shaded twice; there is no blending to double-count.
            if b0 < -COVERAGE_EPSILON || b1 < -COVERAGE_EPSILON || b2 < -COVERAGE_EPSILON {
                continue;
            }
            let uv = [
                b0 * vertices[0].uv[0] + b1 * vertices[1].uv[0] + b2 * vertices[2].uv[0],
                b0 * vertices[0].uv[1] + b1 * vertices[1].uv[1] + b2 * vertices[2].uv[1],
            ];
            let ndc = [
                centre[0] / width as f32 * 2.0 - 1.0,
                1.0 - centre[1] / height as f32 * 2.0,
            ];
            shade(Fragment { x, y, ndc, uv });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    fn quad() -> [RasterVertex; 4] {
        let v = |x, y, u, w| RasterVertex {
            position: [x, y],
            uv: [u, w],
        };
        [
            v(-1.0, -1.0, 0.0, 1.0),
            v(1.0, -1.0, 1.0, 1.0),
            v(1.0, 1.0, 1.0, 0.0),
            v(-1.0, 1.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_list_assembly_drops_partial_triangle() {
        let tris = assemble_triangles(&[0, 2, 1, 2, 0, 3, 7], PrimitiveTopology::TriangleList, None);
        assert_eq!(tris, vec![[0, 2, 1], [2, 0, 3]]);
    }

    #[test]
    fn test_strip_assembly_restarts_and_alternates_winding() {
        let tris = assemble_triangles(
            &[0, 1, 2, 3, u32::MAX, 4, 5, 6],
            PrimitiveTopology::TriangleStrip,
            Some(u32::MAX),
        );
        assert_eq!(tris, vec![[0, 1, 2], [2, 1, 3], [4, 5, 6]]);
    }

    #[test]
    fn test_quad_covers_every_pixel_once_per_triangle_pair() {
        let q = quad();
        let mut covered = HashSet::new();
        for [a, b, c] in assemble_triangles(&[0, 2, 1, 2, 0, 3], PrimitiveTopology::TriangleList, None) {
            rasterize_triangle([q[a as usize], q[b as usize], q[c as usize]], 5, 3, |f| {
                covered.insert((f.x, f.y));
            });
        }
        assert_eq!(covered.len(), 15);
    }

    #[test]
    fn test_uv_is_interpolated_at_pixel_centres() {
        let q = quad();
        let mut seen = Vec::new();
        rasterize_triangle([q[0], q[2], q[1]], 4, 4, |f| seen.push(f));
        rasterize_triangle([q[2], q[0], q[3]], 4, 4, |f| seen.push(f));
        for f in seen {
            assert_relative_eq!(f.uv[0], (f.x as f32 + 0.5) / 4.0, epsilon = 1e-5);
            assert_relative_eq!(f.uv[1], (f.y as f32 + 0.5) / 4.0, epsilon = 1e-5);
            assert_relative_eq!(f.ndc[0], f.uv[0] * 2.0 - 1.0, epsilon = 1e-5);
            assert_relative_eq!(f.ndc[1], 1.0 - f.uv[1] * 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_inset_window_only_covers_top_left() {
        let v = |x, y| RasterVertex {
            position: [x, y],
            uv: [0.0, 0.0],
        };
        let mut covered = HashSet::new();
        // x in [-1, 0], y in [0, 1] on an 8x8 target.
        let corners = [v(-1.0, 0.0), v(0.0, 0.0), v(0.0, 1.0), v(-1.0, 1.0)];
        for [a, b, c] in [[0usize, 2, 1], [2, 0, 3]] {
            rasterize_triangle([corners[a], corners[b], corners[c]], 8, 8, |f| {
                covered.insert((f.x, f.y));
            });
        }
        assert_eq!(covered.len(), 16);
        assert!(covered.iter().all(|&(x, y)| x < 4 && y < 4));
    }

    #[test]
    fn test_degenerate_triangle_covers_nothing() {
        let q = quad();
        let mut count = 0;
        rasterize_triangle([q[0], q[0], q[1]], 4, 4, |_| count += 1);
        assert_eq!(count, 0);
    }
}
