// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::Vec3;

use super::aabb::Aabb;
use super::intersect::{TriangleHit, ray_triangle};
use crate::constants::RAY_EPSILON;

#[derive(Debug, Clone, PartialEq)]
pub enum BvhNodeKind {
    Internal { left: u32, right: u32 },
    Leaf { triangles: Vec<u32> },
}

/// Arena node. Children are addressed by index into `Bvh::nodes`.
#[derive(Debug, Clone, PartialEq)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub kind: BvhNodeKind,
    /// Triangles below this node (diagnostics only).
    pub triangle_count: u32,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, BvhNodeKind::Leaf { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct BvhTriangle {
    vertices: [Vec3; 3],
    indices: [u32; 3],
}

/// One ray/triangle intersection reported by `Bvh::test_ray`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub position: Vec3,
    /// Geometric normal from the winding order, normalised.
    pub normal: Vec3,
    pub triangle: u32,
    /// Vertex indices of the struck triangle.
    pub indices: [u32; 3],
    pub barycentric: Vec3,
    pub front_face: bool,
}

/// Bounding volume hierarchy over one mesh's triangles, in object space.
///
/// Built bottom-up by greedy nearest-centroid pairing. Every triangle lives in
/// exactly one leaf, so a traversal never tests a triangle twice. Immutable
/// once built.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    root: Option<u32>,
    triangles: Vec<BvhTriangle>,
}

impl Bvh {
    /// Build over an indexed triangle list. Trailing indices that do not form
    /// a whole triangle are ignored. An empty list yields an empty hierarchy.
    pub fn build(positions: &[Vec3], indices: &[u32]) -> Self {
        let triangles: Vec<BvhTriangle> = indices
            .chunks_exact(3)
            .map(|tri| {
                let indices = [tri[0], tri[1], tri[2]];
                BvhTriangle {
                    vertices: indices.map(|i| positions[i as usize]),
                    indices,
                }
            })
            .collect();

        if triangles.is_empty() {
            return Self::default();
        }

        let mut nodes: Vec<BvhNode> = Vec::with_capacity(2 * triangles.len());
        let mut level: Vec<u32> = Vec::with_capacity(triangles.len());
        for (i, tri) in triangles.iter().enumerate() {
            level.push(nodes.len() as u32);
            nodes.push(BvhNode {
                bounds: Aabb::from_triangle(&tri.vertices),
                kind: BvhNodeKind::Leaf {
                    triangles: vec![i as u32],
                },
                triangle_count: 1,
            });
        }

        while level.len() > 1 {
            level = Self::merge_level(&mut nodes, &level);
        }

        log::debug!(
            "Built BVH: {} triangles, {} nodes",
            triangles.len(),
            nodes.len()
        );

        Self {
            root: level.first().copied(),
            nodes,
            triangles,
        }
    }

    /// One round of agglomerative clustering: every unmatched node pairs with the
    /// closest unmatched node by centre distance. A node left without a partner
    /// passes through to the next round.
    fn merge_level(nodes: &mut Vec<BvhNode>, level: &[u32]) -> Vec<u32> {
        let mut matched = vec![false; level.len()];
        let mut next = Vec::with_capacity(level.len() / 2 + 1);

        for i in 0..level.len() {
            if matched[i] {
                continue;
            }
            matched[i] = true;

            let center = nodes[level[i] as usize].bounds.center();
            let mut best: Option<(usize, f32)> = None;
            for j in (i + 1)..level.len() {
                if matched[j] {
                    continue;
                }
                let d = center.distance_squared(nodes[level[j] as usize].bounds.center());
                if best.is_none_or(|(_, best_d)| d < best_d) {
                    best = Some((j, d));
                }
            }

            let Some((j, _)) = best else {
                next.push(level[i]);
                continue;
            };
            matched[j] = true;

            let (left, right) = (level[i], level[j]);
            let (l, r) = (&nodes[left as usize], &nodes[right as usize]);
            let parent = BvhNode {
                bounds: l.bounds.union(r.bounds),
                kind: BvhNodeKind::Internal { left, right },
                triangle_count: l.triangle_count + r.triangle_count,
            };
            next.push(nodes.len() as u32);
            nodes.push(parent);
        }

        next
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<u32> {
        self.root
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounds(&self) -> Aabb {
        self.root
            .map_or(Aabb::EMPTY, |r| self.nodes[r as usize].bounds)
    }

    fn intersect(&self, tri: u32, origin: Vec3, dir: Vec3) -> Option<TriangleHit> {
        let [v0, v1, v2] = self.triangles[tri as usize].vertices;
        ray_triangle(origin, dir, v0, v1, v2)
    }

    fn make_hit(&self, tri: u32, origin: Vec3, dir: Vec3, hit: &TriangleHit) -> RayHit {
        let t = &self.triangles[tri as usize];
        let [v0, v1, v2] = t.vertices;
        RayHit {
            distance: hit.t,
            position: origin + dir * hit.t,
            normal: (v1 - v0).cross(v2 - v0).normalize_or_zero(),
            triangle: tri,
            indices: t.indices,
            barycentric: hit.barycentric(),
            front_face: hit.front_face,
        }
    }

    /// True when any triangle is hit at `RAY_EPSILON < t <= max_length`.
    pub fn test_occlusion(&self, origin: Vec3, dir: Vec3, max_length: f32) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let inv_dir = dir.recip();
        let mut stack = Vec::with_capacity(64);
        stack.push(root);

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if node.bounds.intersect_ray(origin, inv_dir, max_length).is_none() {
                continue;
            }
            match &node.kind {
                BvhNodeKind::Leaf { triangles } => {
                    for &tri in triangles {
                        if let Some(hit) = self.intersect(tri, origin, dir)
                            && hit.t > RAY_EPSILON
                            && hit.t <= max_length
                        {
                            return true;
                        }
                    }
                }
                BvhNodeKind::Internal { left, right } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
        false
    }

    /// Every hit along the ray (no distance limit), nearest first.
    pub fn test_ray(&self, origin: Vec3, dir: Vec3) -> Vec<RayHit> {
        let mut hits = Vec::new();
        let Some(root) = self.root else {
            return hits;
        };
        let inv_dir = dir.recip();
        let mut stack = vec![root];

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if node
                .bounds
                .intersect_ray(origin, inv_dir, f32::INFINITY)
                .is_none()
            {
                continue;
            }
            match &node.kind {
                BvhNodeKind::Leaf { triangles } => {
                    for &tri in triangles {
                        if let Some(hit) = self.intersect(tri, origin, dir)
                            && hit.t > RAY_EPSILON
                        {
                            hits.push(self.make_hit(tri, origin, dir, &hit));
                        }
                    }
                }
                BvhNodeKind::Internal { left, right } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Nearest hit within `max_length`, pruning subtrees behind the current best.
    pub fn closest_hit(&self, origin: Vec3, dir: Vec3, max_length: f32) -> Option<RayHit> {
        let root = self.root?;
        let inv_dir = dir.recip();
        let mut best: Option<(u32, TriangleHit)> = None;
        let mut best_t = max_length;
        let mut stack = vec![root];

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if node.bounds.intersect_ray(origin, inv_dir, best_t).is_none() {
                continue;
            }
            match &node.kind {
                BvhNodeKind::Leaf { triangles } => {
                    for &tri in triangles {
                        if let Some(hit) = self.intersect(tri, origin, dir)
                            && hit.t > RAY_EPSILON
                            && hit.t <= best_t
                        {
                            best_t = hit.t;
                            best = Some((tri, hit));
                        }
                    }
                }
                BvhNodeKind::Internal { left, right } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        best.map(|(tri, hit)| self.make_hit(tri, origin, dir, &hit))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_soup(rng: &mut StdRng, count: usize) -> (Vec<Vec3>, Vec<u32>) {
        let mut positions = Vec::new();
        for _ in 0..count {
            let center = Vec3::new(
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
            );
            for _ in 0..3 {
                positions.push(
                    center
                        + Vec3::new(
                            rng.random_range(-1.0..1.0),
                            rng.random_range(-1.0..1.0),
                            rng.random_range(-1.0..1.0),
                        ),
                );
            }
        }
        let indices = (0..positions.len() as u32).collect();
        (positions, indices)
    }

    fn random_ray(rng: &mut StdRng) -> (Vec3, Vec3) {
        let origin = Vec3::new(
            rng.random_range(-8.0..8.0),
            rng.random_range(-8.0..8.0),
            rng.random_range(-8.0..8.0),
        );
        let target = Vec3::new(
            rng.random_range(-4.0..4.0),
            rng.random_range(-4.0..4.0),
            rng.random_range(-4.0..4.0),
        );
        (origin, (target - origin).normalize())
    }

    fn brute_force(positions: &[Vec3], indices: &[u32], origin: Vec3, dir: Vec3) -> Vec<(u32, f32)> {
        indices
            .chunks_exact(3)
            .enumerate()
            .filter_map(|(i, tri)| {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|v| positions[v as usize]);
                ray_triangle(origin, dir, a, b, c)
                    .filter(|h| h.t > RAY_EPSILON)
                    .map(|h| (i as u32, h.t))
            })
            .collect()
    }

    fn check_invariants(bvh: &Bvh, idx: u32) -> u32 {
        let node = &bvh.nodes()[idx as usize];
        match &node.kind {
            BvhNodeKind::Leaf { triangles } => {
                assert!(!triangles.is_empty());
                triangles.len() as u32
            }
            BvhNodeKind::Internal { left, right } => {
                for child in [*left, *right] {
                    assert!(node.bounds.contains(&bvh.nodes()[child as usize].bounds));
                }
                let count = check_invariants(bvh, *left) + check_invariants(bvh, *right);
                assert_eq!(count, node.triangle_count);
                count
            }
        }
    }

    #[test]
    fn test_tree_invariants() {
        let mut rng = StdRng::seed_from_u64(7);
        let (positions, indices) = random_soup(&mut rng, 37);
        let bvh = Bvh::build(&positions, &indices);
        let root = bvh.root().unwrap();
        assert_eq!(check_invariants(&bvh, root), 37);
        // Strict binary tree: n leaves, n - 1 internal nodes.
        assert_eq!(bvh.nodes().len(), 2 * 37 - 1);
    }

    #[test]
    fn test_queries_match_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let (positions, indices) = random_soup(&mut rng, 60);
        let bvh = Bvh::build(&positions, &indices);

        for _ in 0..300 {
            let (origin, dir) = random_ray(&mut rng);
            let mut expected = brute_force(&positions, &indices, origin, dir);
            expected.sort_by(|a, b| a.1.total_cmp(&b.1));

            let hits = bvh.test_ray(origin, dir);
            let mut got: Vec<u32> = hits.iter().map(|h| h.triangle).collect();
            let mut want: Vec<u32> = expected.iter().map(|e| e.0).collect();
            assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
            got.sort_unstable();
            want.sort_unstable();
            assert_eq!(got, want);

            let max_length = rng.random_range(0.5..12.0);
            let occluded = expected.iter().any(|&(_, t)| t <= max_length);
            assert_eq!(bvh.test_occlusion(origin, dir, max_length), occluded);

            let closest = bvh.closest_hit(origin, dir, f32::INFINITY);
            assert_eq!(closest.map(|h| h.triangle), expected.first().map(|e| e.0));
        }
    }

    #[test]
    fn test_ray_away_from_geometry() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let bvh = Bvh::build(&positions, &[0, 1, 2]);
        let origin = Vec3::new(0.2, 0.2, 1.0);
        assert!(!bvh.test_occlusion(origin, Vec3::Z, f32::INFINITY));
        assert!(bvh.test_ray(origin, Vec3::Z).is_empty());

        let hits = bvh.test_ray(origin, -Vec3::Z);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].front_face);
        assert_eq!(hits[0].indices, [0, 1, 2]);
        assert!((hits[0].position - Vec3::new(0.2, 0.2, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_empty_mesh_never_hits() {
        let bvh = Bvh::build(&[], &[]);
        assert!(bvh.root().is_none());
        assert!(bvh.bounds().is_empty());
        assert!(!bvh.test_occlusion(Vec3::ZERO, Vec3::X, f32::INFINITY));
        assert!(bvh.test_ray(Vec3::ZERO, Vec3::X).is_empty());
        assert!(bvh.closest_hit(Vec3::ZERO, Vec3::X, f32::INFINITY).is_none());
    }
}
