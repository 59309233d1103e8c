// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::{HashMap, VecDeque};

use glam::{Vec2, Vec3};

use crate::constants::{CHART_NORMAL_TOLERANCE, CHART_ROTATION_STEPS, CHART_VERTICAL_THRESHOLD};

/// A connected, near-planar group of triangles unwrapped together.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Triangle indices into the mesh.
    pub triangles: Vec<u32>,
    pub normal: Vec3,
    /// Per-corner coordinates normalised to the chart rectangle (margin included).
    pub local_uvs: Vec<[Vec2; 3]>,
    /// Footprint in texels, margin included on all sides.
    pub width: u32,
    pub height: u32,
}

impl Chart {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

type PositionKey = [u32; 3];

fn position_key(p: Vec3) -> PositionKey {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

fn edge_key(a: Vec3, b: Vec3) -> (PositionKey, PositionKey) {
    let (ka, kb) = (position_key(a), position_key(b));
    if ka <= kb { (ka, kb) } else { (kb, ka) }
}

pub fn face_normal(v: &[Vec3; 3]) -> Vec3 {
    (v[1] - v[0]).cross(v[2] - v[0]).normalize_or_zero()
}

/// Group triangles into charts by flood fill across shared edges. Edges are
/// shared when their endpoint positions are bit-identical; a neighbour joins
/// when its normal deviates from the seed's by less than the tolerance.
pub fn extract_charts(positions: &[Vec3], indices: &[u32]) -> Vec<Vec<u32>> {
    let tris: Vec<[Vec3; 3]> = indices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]].map(|i| positions[i as usize]))
        .collect();
    let normals: Vec<Vec3> = tris.iter().map(face_normal).collect();

    let mut edges: HashMap<(PositionKey, PositionKey), Vec<u32>> = HashMap::new();
    for (i, v) in tris.iter().enumerate() {
        for (a, b) in [(0, 1), (1, 2), (2, 0)] {
            edges.entry(edge_key(v[a], v[b])).or_default().push(i as u32);
        }
    }

    let mut assigned = vec![false; tris.len()];
    let mut charts = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..tris.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let seed_normal = normals[seed];
        let mut chart = vec![seed as u32];
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            let v = &tris[current];
            for (a, b) in [(0, 1), (1, 2), (2, 0)] {
                let Some(neighbours) = edges.get(&edge_key(v[a], v[b])) else {
                    continue;
                };
                for &n in neighbours {
                    let n = n as usize;
                    if assigned[n] || 1.0 - normals[n].dot(seed_normal) >= CHART_NORMAL_TOLERANCE {
                        continue;
                    }
                    assigned[n] = true;
                    chart.push(n as u32);
                    queue.push_back(n);
                }
            }
        }

        charts.push(chart);
    }

    charts
}

/// Orthonormal (right, up) pair spanning the plane perpendicular to `normal`.
pub fn chart_basis(normal: Vec3) -> (Vec3, Vec3) {
    let normal = normal.try_normalize().unwrap_or(Vec3::Z);
    let up = if normal.y.abs() > CHART_VERTICAL_THRESHOLD {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let right = up.cross(normal).normalize();
    (right, normal.cross(right))
}

fn rotate(p: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(p.x * c - p.y * s, p.x * s + p.y * c)
}

fn bounds_2d(points: &[Vec2]) -> (Vec2, Vec2) {
    points.iter().fold(
        (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
        |(lo, hi), &p| (lo.min(p), hi.max(p)),
    )
}

/// Rotation in 1° steps over 0..90° giving the smallest bounding area. Earlier
/// angles win ties.
pub fn find_best_rotation(points: &[Vec2]) -> f32 {
    let mut best_angle = 0.0;
    let mut best_area = f32::INFINITY;
    for step in 0..CHART_ROTATION_STEPS {
        let angle = (step as f32).to_radians();
        let rotated: Vec<Vec2> = points.iter().map(|&p| rotate(p, angle)).collect();
        let (lo, hi) = bounds_2d(&rotated);
        let extent = hi - lo;
        let area = extent.x * extent.y;
        if area < best_area {
            best_area = area;
            best_angle = angle;
        }
    }
    best_angle
}

fn texel_extent(extent: f32) -> u32 {
    ((extent - 1e-3).ceil().max(1.0)) as u32
}

/// Flatten a chart into its own texel rectangle.
pub fn project_chart(
    positions: &[Vec3],
    indices: &[u32],
    triangles: Vec<u32>,
    texels_per_unit: f32,
    margin: u32,
    rotate_chart: bool,
) -> Chart {
    let corner = |tri: u32, c: usize| positions[indices[tri as usize * 3 + c] as usize];
    let normal = triangles
        .first()
        .map(|&t| face_normal(&[corner(t, 0), corner(t, 1), corner(t, 2)]))
        .unwrap_or(Vec3::Z);
    let (right, up) = chart_basis(normal);

    let mut points: Vec<Vec2> = triangles
        .iter()
        .flat_map(|&t| (0..3).map(move |c| (t, c)))
        .map(|(t, c)| {
            let p = corner(t, c);
            Vec2::new(p.dot(right), p.dot(up)) * texels_per_unit
        })
        .collect();

    if rotate_chart && points.len() > 3 {
        let angle = find_best_rotation(&points);
        if angle != 0.0 {
            for p in &mut points {
                *p = rotate(*p, angle);
            }
        }
    }

    let (lo, hi) = bounds_2d(&points);
    let extent = (hi - lo).max(Vec2::ZERO);
    let width = texel_extent(extent.x) + 2 * margin;
    let height = texel_extent(extent.y) + 2 * margin;
    let size = Vec2::new(width as f32, height as f32);
    let offset = Vec2::splat(margin as f32);

    let local_uvs = points
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]].map(|p| ((p - lo + offset) / size).clamp(Vec2::ZERO, Vec2::ONE)))
        .collect();

    Chart {
        triangles,
        normal,
        local_uvs,
        width,
        height,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unit cube as 12 triangles with separate vertices per face.
    pub(crate) fn cube() -> (Vec<Vec3>, Vec<u32>) {
        let mut positions = Vec::new();
        let mut indices = Vec::new();
        for axis in 0..3 {
            for sign in [-1.0f32, 1.0] {
                let n = Vec3::AXES[axis] * sign;
                let (u, v) = (Vec3::AXES[(axis + 1) % 3], Vec3::AXES[(axis + 2) % 3]);
                let base = positions.len() as u32;
                for (a, b) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                    positions.push((n + u * a + v * b) * 0.5);
                }
                let quad = if sign > 0.0 { [0, 1, 2, 0, 2, 3] } else { [0, 2, 1, 0, 3, 2] };
                indices.extend(quad.iter().map(|i| base + i));
            }
        }
        (positions, indices)
    }

    #[test]
    fn test_cube_has_six_charts() {
        let (positions, indices) = cube();
        let charts = extract_charts(&positions, &indices);
        assert_eq!(charts.len(), 6);
        assert!(charts.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn test_coplanar_strip_is_one_chart() {
        let positions: Vec<Vec3> = (0..6)
            .map(|i| Vec3::new((i / 2) as f32, (i % 2) as f32, 0.0))
            .collect();
        let indices = vec![0, 2, 1, 1, 2, 3, 2, 4, 3, 3, 4, 5];
        assert_eq!(extract_charts(&positions, &indices).len(), 1);
    }

    #[test]
    fn test_basis_is_orthonormal_for_vertical_normal() {
        for n in [Vec3::Y, -Vec3::Y, Vec3::X, Vec3::new(1.0, 2.0, 3.0).normalize()] {
            let (r, u) = chart_basis(n);
            assert!(r.dot(u).abs() < 1e-5);
            assert!(r.dot(n).abs() < 1e-5);
            assert!(u.dot(n).abs() < 1e-5);
            assert!((r.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_quad_footprint_matches_world_size() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(3.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        let chart = project_chart(&positions, &indices, vec![0, 1], 1.0, 1, true);
        assert_eq!((chart.width, chart.height), (5, 4));
        for uv in chart.local_uvs.iter().flatten() {
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
        }
    }

    #[test]
    fn test_rotation_search_straightens_diamond() {
        let points: Vec<Vec2> = [(0.0, -2.0), (2.0, 0.0), (0.0, 2.0), (-2.0, 0.0)]
            .into_iter()
            .map(Vec2::from)
            .collect();
        let angle = find_best_rotation(&points).to_degrees();
        assert!((angle - 45.0).abs() < 0.5);
    }
}
