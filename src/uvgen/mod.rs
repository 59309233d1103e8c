// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Lightmap UV generation: chart extraction, projection, packing and emission.

pub mod chart;
pub mod packer;
pub mod rect_tree;

use std::collections::HashMap;

use glam::Vec2;

use self::chart::{Chart, extract_charts, project_chart};
use self::packer::pack_charts;
use self::rect_tree::Rect;
use crate::error::Result;
use crate::geometry::mesh::Mesh;

/// A chart placed in the atlas, in texel units.
#[derive(Debug, Clone, PartialEq)]
pub struct LightmapperQuad {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub rotated: bool,
    /// Triangle indices into the mesh.
    pub triangles: Vec<u32>,
    /// Per-corner coordinates in [0, 1] relative to this quad (rotation applied).
    pub local_uvs: Vec<[Vec2; 3]>,
}

impl LightmapperQuad {
    fn from_chart(chart: Chart, rect: Rect, rotated: bool) -> Self {
        let local_uvs = if rotated {
            chart
                .local_uvs
                .iter()
                .map(|tri| tri.map(|uv| Vec2::new(uv.y, 1.0 - uv.x)))
                .collect()
        } else {
            chart.local_uvs
        };
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            rotated,
            triangles: chart.triangles,
            local_uvs,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Atlas texel position of a quad-local coordinate.
    pub fn to_atlas(&self, local: Vec2) -> Vec2 {
        Vec2::new(
            self.x as f32 + local.x * self.width as f32,
            self.y as f32 + local.y * self.height as f32,
        )
    }
}

/// Packed lightmap atlas for one mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightmapLayout {
    /// Side of the square atlas, a power of two.
    pub size: u32,
    pub quads: Vec<LightmapperQuad>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvOptions {
    /// Texels per object-space world unit.
    pub texels_per_unit: f32,
    /// Empty texels around every chart.
    pub margin: u32,
    /// Search chart rotations and allow 90° turns while packing.
    pub rotate_charts: bool,
}

/// Unwrap `mesh` into a lightmap atlas and write its lightmap UVs.
///
/// Vertices shared by triangles of different charts are duplicated so each
/// chart owns its corners; triangle order is preserved.
pub fn generate_lightmap_uvs(mesh: &mut Mesh, options: &UvOptions) -> Result<()> {
    let positions = mesh.positions();
    let mut indices = mesh.indices().to_vec();

    let charts: Vec<Chart> = extract_charts(&positions, &indices)
        .into_iter()
        .map(|tris| {
            project_chart(
                &positions,
                &indices,
                tris,
                options.texels_per_unit,
                options.margin,
                options.rotate_charts,
            )
        })
        .collect();

    let sizes: Vec<(u32, u32)> = charts.iter().map(|c| (c.width, c.height)).collect();
    let (placements, bounds) = pack_charts(&sizes, options.rotate_charts)?;
    let size = bounds.0.max(bounds.1).max(1).next_power_of_two();

    let quads: Vec<LightmapperQuad> = charts
        .into_iter()
        .zip(&placements)
        .map(|(chart, p)| LightmapperQuad::from_chart(chart, p.rect, p.rotated))
        .collect();

    let mut vertices = mesh.vertices().to_vec();
    let mut owner: Vec<Option<usize>> = vec![None; vertices.len()];
    let mut split: HashMap<(usize, u32), u32> = HashMap::new();
    let inv_size = 1.0 / size as f32;

    for (q, quad) in quads.iter().enumerate() {
        for (&tri, uvs) in quad.triangles.iter().zip(&quad.local_uvs) {
            for (c, local) in uvs.iter().enumerate() {
                let slot = tri as usize * 3 + c;
                let vertex = indices[slot];
                let target = match owner[vertex as usize] {
                    None => {
                        owner[vertex as usize] = Some(q);
                        vertex
                    }
                    Some(o) if o == q => vertex,
                    Some(_) => *split.entry((q, vertex)).or_insert_with(|| {
                        vertices.push(vertices[vertex as usize]);
                        vertices.len() as u32 - 1
                    }),
                };
                let uv = (quad.to_atlas(*local) * inv_size).clamp(Vec2::ZERO, Vec2::ONE);
                vertices[target as usize].lightmap_uv = uv.into();
                indices[slot] = target;
            }
        }
    }

    log::debug!(
        "Lightmap UVs: {} charts, atlas {}x{} (bounds {}x{}), {} split vertices",
        quads.len(),
        size,
        size,
        bounds.0,
        bounds.1,
        split.len()
    );

    mesh.set_lightmap(vertices, indices, LightmapLayout { size, quads });
    Ok(())
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::geometry::mesh::vertex;

    fn quad_mesh(w: f32, h: f32) -> Mesh {
        let n = [0.0, 0.0, 1.0];
        Mesh::new(
            vec![
                vertex([0.0, 0.0, 0.0], [0.0, 0.0], n),
                vertex([w, 0.0, 0.0], [1.0, 0.0], n),
                vertex([w, h, 0.0], [1.0, 1.0], n),
                vertex([0.0, h, 0.0], [0.0, 1.0], n),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    fn cube_mesh() -> Mesh {
        let (positions, indices) = chart::tests::cube();
        let vertices = positions
            .iter()
            .map(|p| vertex((*p).into(), [0.0, 0.0], p.normalize().into()))
            .collect();
        Mesh::new(vertices, indices).unwrap()
    }

    #[test]
    fn test_single_quad_layout() {
        let mut mesh = quad_mesh(3.0, 2.0);
        let options = UvOptions {
            texels_per_unit: 1.0,
            margin: 1,
            rotate_charts: true,
        };
        generate_lightmap_uvs(&mut mesh, &options).unwrap();

        let layout = mesh.layout().unwrap();
        assert_eq!(layout.quads.len(), 1);
        let quad = &layout.quads[0];
        let (w, h) = if quad.rotated { (quad.height, quad.width) } else { (quad.width, quad.height) };
        assert_eq!((w, h), (5, 4));
        assert_eq!(layout.size, 8);
        assert_eq!(mesh.vertices().len(), 4);
    }

    #[test]
    fn test_uvs_in_unit_square_and_quads_disjoint() {
        let mut mesh = cube_mesh();
        let options = UvOptions {
            texels_per_unit: 7.0,
            margin: 2,
            rotate_charts: true,
        };
        generate_lightmap_uvs(&mut mesh, &options).unwrap();
        let layout = mesh.layout().unwrap();
        assert!(layout.size.is_power_of_two());

        for v in mesh.vertices() {
            assert!(v.lightmap_uv.iter().all(|c| (0.0..=1.0).contains(c)));
        }
        for (i, a) in layout.quads.iter().enumerate() {
            assert!(a.x + a.width <= layout.size && a.y + a.height <= layout.size);
            for b in &layout.quads[i + 1..] {
                assert!(!a.rect().overlaps(&b.rect()));
            }
        }
    }

    #[test]
    fn test_shared_vertices_are_split_between_charts() {
        // Two perpendicular quads sharing the edge x = 1.
        let n = [0.0, 0.0, 1.0];
        let mut mesh = Mesh::new(
            vec![
                vertex([0.0, 0.0, 0.0], [0.0, 0.0], n),
                vertex([1.0, 0.0, 0.0], [0.0, 0.0], n),
                vertex([1.0, 1.0, 0.0], [0.0, 0.0], n),
                vertex([0.0, 1.0, 0.0], [0.0, 0.0], n),
                vertex([1.0, 0.0, -1.0], [0.0, 0.0], n),
                vertex([1.0, 1.0, -1.0], [0.0, 0.0], n),
            ],
            vec![0, 1, 2, 0, 2, 3, 1, 4, 5, 1, 5, 2],
        )
        .unwrap();
        let before: Vec<Vec3> = (0..4).map(|t| mesh.triangle_positions(t)[0]).collect();
        generate_lightmap_uvs(
            &mut mesh,
            &UvOptions {
                texels_per_unit: 4.0,
                margin: 1,
                rotate_charts: false,
            },
        )
        .unwrap();

        assert_eq!(mesh.layout().unwrap().quads.len(), 2);
        assert_eq!(mesh.vertices().len(), 8);
        let after: Vec<Vec3> = (0..4).map(|t| mesh.triangle_positions(t)[0]).collect();
        assert_eq!(before, after);
    }
}
