// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::Vec3;

use crate::constants::TRIANGLE_DET_EPS;

/// Raw ray/triangle intersection. `u` and `v` weight the second and third vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
    /// The ray approaches from the side the winding-order normal points to.
    pub front_face: bool,
}

impl TriangleHit {
    pub fn barycentric(&self) -> Vec3 {
        Vec3::new(1.0 - self.u - self.v, self.u, self.v)
    }
}

/// Möller-Trumbore ray-triangle intersection, two-sided. Only hits in front of
/// the origin (`t > 0`) are reported; `dir` need not be normalised.
pub fn ray_triangle(origin: Vec3, dir: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let h = dir.cross(e2);
    let a = e1.dot(h);
    if a.abs() < TRIANGLE_DET_EPS {
        return None;
    }
    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = f * dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = f * e2.dot(q);
    (t > 0.0).then_some(TriangleHit {
        t,
        u,
        v,
        front_face: a > 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const V0: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    const V1: Vec3 = Vec3::new(1.0, 0.0, 0.0);
    const V2: Vec3 = Vec3::new(0.0, 1.0, 0.0);

    #[test]
    fn test_front_and_back_hits() {
        let front = ray_triangle(Vec3::new(0.25, 0.25, 1.0), -Vec3::Z, V0, V1, V2).unwrap();
        assert!((front.t - 1.0).abs() < 1e-6);
        assert!(front.front_face);
        assert!((front.barycentric() - Vec3::new(0.5, 0.25, 0.25)).length() < 1e-6);

        let back = ray_triangle(Vec3::new(0.25, 0.25, -1.0), Vec3::Z, V0, V1, V2).unwrap();
        assert!(!back.front_face);
    }

    #[test]
    fn test_misses() {
        assert!(ray_triangle(Vec3::new(0.9, 0.9, 1.0), -Vec3::Z, V0, V1, V2).is_none());
        assert!(ray_triangle(Vec3::new(0.25, 0.25, 1.0), Vec3::Z, V0, V1, V2).is_none());
        assert!(ray_triangle(Vec3::new(0.25, 0.25, 1.0), Vec3::X, V0, V1, V2).is_none());
    }
}
