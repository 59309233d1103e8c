// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::{Vec2, Vec3};

use super::buffers::{SampleBuffer, TexelSample};
use crate::constants::RASTER_EDGE_EPS;
use crate::uvgen::LightmapLayout;

/// Barycentric weights of `p` in the 2D triangle `abc`. Non-finite for a
/// zero-area triangle.
pub fn barycentric_2d(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let inv_det = 1.0 / v0.perp_dot(v1);
    let w1 = v2.perp_dot(v1) * inv_det;
    let w2 = v0.perp_dot(v2) * inv_det;
    Vec3::new(1.0 - w1 - w2, w1, w2)
}

/// Rasterise every chart of `layout` at each sampling offset and record which
/// triangle and barycentrics each texel sample lands on.
///
/// Samples with non-finite weights are skipped. The first triangle to cover a
/// sample keeps it.
pub fn compute_sample_buffer(layout: &LightmapLayout, offsets: &[Vec2]) -> SampleBuffer {
    let size = layout.size;
    let mut buffer = SampleBuffer::new(size, size, offsets.len());
    let mut degenerate = 0usize;

    for quad in &layout.quads {
        let rect = quad.rect();
        for (&tri, local) in quad.triangles.iter().zip(&quad.local_uvs) {
            let [a, b, c] = local.map(|uv| quad.to_atlas(uv));
            let lo = a.min(b).min(c).floor().max(Vec2::new(rect.x as f32, rect.y as f32));
            let hi = a.max(b).max(c).ceil().min(Vec2::new(rect.right() as f32, rect.top() as f32));
            if lo.x >= hi.x || lo.y >= hi.y {
                continue;
            }

            for y in lo.y as u32..hi.y as u32 {
                for x in lo.x as u32..hi.x as u32 {
                    for (s, offset) in offsets.iter().enumerate() {
                        if buffer.get(x, y, s).filled {
                            continue;
                        }
                        let p = Vec2::new(x as f32, y as f32) + *offset;
                        let w = barycentric_2d(p, a, b, c);
                        if !w.is_finite() {
                            degenerate += 1;
                            continue;
                        }
                        if w.min_element() < -RASTER_EDGE_EPS {
                            continue;
                        }
                        let w = w.max(Vec3::ZERO);
                        *buffer.get_mut(x, y, s) = TexelSample {
                            filled: true,
                            triangle: tri,
                            barycentric: w / w.element_sum(),
                        };
                    }
                }
            }
        }
    }

    if degenerate > 0 {
        log::trace!("Skipped {degenerate} degenerate samples");
    }
    buffer
}
