// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::Vec3;

use crate::constants::AABB_EPS;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Padded box around a triangle.
    pub fn from_triangle(v: &[Vec3; 3]) -> Self {
        Self::from_point(v[0]).expand(v[1]).expand(v[2]).pad()
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expand(self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, other: &Self) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    /// Expands any axis thinner than `AABB_EPS` by `AABB_EPS` on each side to avoid
    /// degenerate zero-width slabs during ray-slab intersection.
    pub fn pad(self) -> Self {
        self.pad_axis(0, AABB_EPS)
            .pad_axis(1, AABB_EPS)
            .pad_axis(2, AABB_EPS)
    }

    fn pad_axis(mut self, axis: usize, eps: f32) -> Self {
        if self.max[axis] - self.min[axis] < eps {
            self.min[axis] -= eps;
            self.max[axis] += eps;
        }
        self
    }

    /// Slab test. Returns the entry distance (clamped to 0 when the origin is
    /// inside) or `None` when the ray misses the box within `[0, t_max]`.
    pub fn intersect_ray(&self, origin: Vec3, inv_dir: Vec3, t_max: f32) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let t1 = (self.min - origin) * inv_dir;
        let t2 = (self.max - origin) * inv_dir;

        let t_enter = t1.min(t2).max_element();
        let t_exit = t1.max(t2).min_element();

        if t_enter > t_exit || t_exit < 0.0 || t_enter > t_max {
            None
        } else {
            Some(t_enter.max(0.0))
        }
    }
}
