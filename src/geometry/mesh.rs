// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::OnceLock;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::accel::bvh::Bvh;
use crate::constants::VERTEX_STRIDE;
use crate::error::{BakeError, Result};
use crate::uvgen::LightmapLayout;

/// Interleaved vertex, 13 floats. Matches the layout consumers hand us.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub lightmap_uv: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == VERTEX_STRIDE * 4);

/// Attributes interpolated at a point inside a triangle (object space).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
}

/// Triangle-list mesh. Vertex data is read-only once baking starts; the only
/// mutation is the one-time lightmap UV write performed by the UV generator.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    layout: Option<LightmapLayout>,
    bvh: OnceLock<Bvh>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(BakeError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(BakeError::InvalidMesh(format!(
                "index {bad} out of range ({} vertices)",
                vertices.len()
            )));
        }
        Ok(Self {
            vertices,
            indices,
            layout: None,
            bvh: OnceLock::new(),
        })
    }

    /// Build from an interleaved float buffer with a stride of 13 floats.
    pub fn from_raw(data: &[f32], indices: Vec<u32>) -> Result<Self> {
        let vertices: &[Vertex] = bytemuck::try_cast_slice(data).map_err(|_| {
            BakeError::InvalidMesh(format!(
                "vertex buffer length {} is not a multiple of {VERTEX_STRIDE}",
                data.len()
            ))
        })?;
        Self::new(vertices.to_vec(), indices)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Interleaved float view of the vertex buffer.
    pub fn as_raw(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, tri: u32) -> [u32; 3] {
        let base = tri as usize * 3;
        [
            self.indices[base],
            self.indices[base + 1],
            self.indices[base + 2],
        ]
    }

    pub fn position(&self, vertex: u32) -> Vec3 {
        Vec3::from(self.vertices[vertex as usize].position)
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| Vec3::from(v.position)).collect()
    }

    pub fn triangle_positions(&self, tri: u32) -> [Vec3; 3] {
        self.triangle(tri).map(|i| self.position(i))
    }

    /// Interpolate vertex attributes with barycentric weights `(w0, w1, w2)`.
    pub fn interpolate(&self, tri: u32, weights: Vec3) -> SurfacePoint {
        let [a, b, c] = self.triangle(tri).map(|i| &self.vertices[i as usize]);
        let mix3 = |pa: [f32; 3], pb: [f32; 3], pc: [f32; 3]| {
            Vec3::from(pa) * weights.x + Vec3::from(pb) * weights.y + Vec3::from(pc) * weights.z
        };
        SurfacePoint {
            position: mix3(a.position, b.position, c.position),
            normal: mix3(a.normal, b.normal, c.normal).normalize_or_zero(),
            tangent: mix3(a.tangent, b.tangent, c.tangent).normalize_or_zero(),
            uv: Vec2::from(a.uv) * weights.x
                + Vec2::from(b.uv) * weights.y
                + Vec2::from(c.uv) * weights.z,
        }
    }

    pub fn layout(&self) -> Option<&LightmapLayout> {
        self.layout.as_ref()
    }

    /// BVH over the mesh triangles, built on first use.
    pub fn bvh(&self) -> &Bvh {
        self.bvh
            .get_or_init(|| Bvh::build(&self.positions(), &self.indices))
    }

    pub fn has_bvh(&self) -> bool {
        self.bvh.get().is_some()
    }

    /// Install the UV generator's output: possibly split vertices, rewritten
    /// indices (same triangle order) and the atlas layout.
    pub(crate) fn set_lightmap(
        &mut self,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        layout: LightmapLayout,
    ) {
        debug_assert_eq!(indices.len(), self.indices.len());
        self.vertices = vertices;
        self.indices = indices;
        self.layout = Some(layout);
        self.bvh = OnceLock::new();
    }

    /// Approximate heap footprint, for status reporting.
    pub fn memory_bytes(&self) -> u64 {
        (self.vertices.len() * std::mem::size_of::<Vertex>()
            + self.indices.len() * std::mem::size_of::<u32>()) as u64
    }
}

/// Vertex with position, uv and normal; tangent and lightmap uv left zeroed.
pub fn vertex(position: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> Vertex {
    Vertex {
        position,
        uv,
        normal,
        ..Vertex::default()
    }
}

/// Per-vertex tangents accumulated from triangle uv gradients, falling back
/// to any vector orthogonal to the normal when the uv mapping is degenerate.
pub fn generate_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let mut acc = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        let (p0, p1, p2) = (
            Vec3::from(vertices[a].position),
            Vec3::from(vertices[b].position),
            Vec3::from(vertices[c].position),
        );
        let (t0, t1, t2) = (
            Vec2::from(vertices[a].uv),
            Vec2::from(vertices[b].uv),
            Vec2::from(vertices[c].uv),
        );
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let d1 = t1 - t0;
        let d2 = t2 - t0;
        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < 1e-12 {
            continue;
        }
        let tangent = (e1 * d2.y - e2 * d1.y) / det;
        for i in [a, b, c] {
            acc[i] += tangent;
        }
    }

    for (v, t) in vertices.iter_mut().zip(acc) {
        let n = Vec3::from(v.normal).normalize_or_zero();
        let ortho = (t - n * n.dot(t)).normalize_or_zero();
        let tangent = if ortho == Vec3::ZERO && n != Vec3::ZERO {
            n.any_orthonormal_vector()
        } else {
            ortho
        };
        v.tangent = tangent.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_checks_stride() {
        let data = vec![0.0f32; VERTEX_STRIDE * 3];
        let mesh = Mesh::from_raw(&data, vec![0, 1, 2]).unwrap();
        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.as_raw().len(), VERTEX_STRIDE * 3);

        let short = vec![0.0f32; VERTEX_STRIDE * 3 - 1];
        assert!(matches!(
            Mesh::from_raw(&short, vec![0, 1, 2]),
            Err(BakeError::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_rejects_bad_indices() {
        let verts = vec![Vertex::default(); 3];
        assert!(Mesh::new(verts.clone(), vec![0, 1]).is_err());
        assert!(Mesh::new(verts, vec![0, 1, 3]).is_err());
    }

    #[test]
    fn test_interpolate_midpoint() {
        let mesh = Mesh::new(
            vec![
                vertex([0.0, 0.0, 0.0], [0.0, 0.0], [0.0, 0.0, 1.0]),
                vertex([2.0, 0.0, 0.0], [1.0, 0.0], [0.0, 0.0, 1.0]),
                vertex([0.0, 2.0, 0.0], [0.0, 1.0], [0.0, 0.0, 1.0]),
            ],
            vec![0, 1, 2],
        )
        .unwrap();
        let p = mesh.interpolate(0, Vec3::new(0.0, 0.5, 0.5));
        assert_eq!(p.position, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(p.normal, Vec3::Z);
        assert_eq!(p.uv, Vec2::new(0.5, 0.5));
    }

    #[test]
    fn test_tangents_follow_u_axis() {
        let mut verts = vec![
            vertex([0.0, 0.0, 0.0], [0.0, 0.0], [0.0, 0.0, 1.0]),
            vertex([1.0, 0.0, 0.0], [1.0, 0.0], [0.0, 0.0, 1.0]),
            vertex([0.0, 1.0, 0.0], [0.0, 1.0], [0.0, 0.0, 1.0]),
        ];
        generate_tangents(&mut verts, &[0, 1, 2]);
        for v in &verts {
            assert!(Vec3::from(v.tangent).distance(Vec3::X) < 1e-5);
        }
    }
}
