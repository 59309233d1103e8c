// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;

use crate::geometry::mesh::{Mesh, Vertex, generate_tangents};

/// Load an OBJ file as one triangle mesh. All models in the file are merged;
/// missing normals are replaced by area-weighted face normals and tangents are
/// generated from the texture coordinates.
pub fn load_obj(path: &Path) -> Result<Mesh> {
    let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .with_context(|| format!("Failed to load OBJ: {}", path.display()))?;

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for model in &models {
        let mesh = &model.mesh;
        let base = vertices.len() as u32;
        let count = mesh.positions.len() / 3;
        let has_normals = mesh.normals.len() == mesh.positions.len();
        let has_uvs = mesh.texcoords.len() / 2 == count;

        vertices.extend((0..count).map(|i| Vertex {
            position: read3(&mesh.positions, i),
            normal: if has_normals { read3(&mesh.normals, i) } else { [0.0; 3] },
            uv: if has_uvs {
                [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0; 2]
            },
            ..Vertex::default()
        }));
        indices.extend(mesh.indices.iter().map(|&i| base + i));

        if !has_normals {
            accumulate_face_normals(&mut vertices[base as usize..], &mesh.indices);
        }
    }

    generate_tangents(&mut vertices, &indices);
    let mesh = Mesh::new(vertices, indices)
        .with_context(|| format!("Invalid mesh data in OBJ: {}", path.display()))?;

    log::info!(
        "Loaded OBJ '{}': {} vertices, {} triangles",
        path.display(),
        mesh.vertices().len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

fn read3(data: &[f32], index: usize) -> [f32; 3] {
    [data[index * 3], data[index * 3 + 1], data[index * 3 + 2]]
}

fn accumulate_face_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut sums = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(vertices[i as usize].position));
        let n = (b - a).cross(c - a);
        for &i in tri {
            sums[i as usize] += n;
        }
    }
    for (v, n) in vertices.iter_mut().zip(sums) {
        v.normal = n.normalize_or_zero().into();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_loads_quad_without_normals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 1 0 1\nv 0 0 1\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 4/4 3/3 2/2\n",
        )
        .unwrap();

        let mesh = load_obj(&path).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        for v in mesh.vertices() {
            assert!((Vec3::from(v.normal) - Vec3::Y).length() < 1e-5);
            assert!(Vec3::from(v.tangent).length() > 0.5);
        }
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_obj(Path::new("/definitely/not/here.obj")).unwrap_err();
        assert!(err.to_string().contains("here.obj"));
    }
}
