// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};

use crate::accel::aabb::Aabb;

/// Model matrix of a geometry instance with its cached inverse and normal matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryTransform {
    model: Mat4,
    inverse: Mat4,
    normal: Mat3,
}

impl Default for GeometryTransform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

impl GeometryTransform {
    pub fn new(model: Mat4) -> Self {
        let inverse = model.inverse();
        Self {
            model,
            inverse,
            normal: Mat3::from_mat4(inverse).transpose(),
        }
    }

    /// Build from translation, Euler XYZ rotation in degrees and uniform scale.
    pub fn from_position_rotation_scale(position: Vec3, rotation_deg: Vec3, scale: f32) -> Self {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            rotation_deg.x.to_radians(),
            rotation_deg.y.to_radians(),
            rotation_deg.z.to_radians(),
        );
        Self::new(Mat4::from_scale_rotation_translation(
            Vec3::splat(scale),
            rotation,
            position,
        ))
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn inverse(&self) -> Mat4 {
        self.inverse
    }

    pub fn point_to_world(&self, p: Vec3) -> Vec3 {
        self.model.transform_point3(p)
    }

    pub fn vector_to_world(&self, v: Vec3) -> Vec3 {
        self.model.transform_vector3(v)
    }

    pub fn normal_to_world(&self, n: Vec3) -> Vec3 {
        (self.normal * n).normalize_or_zero()
    }

    /// Bring a world-space ray into object space. The direction is not
    /// renormalised, so a ray parameter `t` addresses the same point in both spaces.
    pub fn ray_to_object(&self, origin: Vec3, dir: Vec3) -> (Vec3, Vec3) {
        (
            self.inverse.transform_point3(origin),
            self.inverse.transform_vector3(dir),
        )
    }

    /// World-space box enclosing the transformed corners of an object-space box.
    pub fn bounds_to_world(&self, bounds: &Aabb) -> Aabb {
        if bounds.is_empty() {
            return Aabb::EMPTY;
        }
        let mut out = Aabb::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { bounds.min.x } else { bounds.max.x },
                if i & 2 == 0 { bounds.min.y } else { bounds.max.y },
                if i & 4 == 0 { bounds.min.z } else { bounds.max.z },
            );
            out = out.expand(self.point_to_world(corner));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_parameter_is_preserved() {
        let transform = GeometryTransform::from_position_rotation_scale(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 45.0, 0.0),
            2.0,
        );
        let origin = Vec3::new(-4.0, 1.0, 0.5);
        let dir = Vec3::new(0.3, -0.2, 0.9).normalize();
        let (o, d) = transform.ray_to_object(origin, dir);

        let world = origin + dir * 3.5;
        let object = o + d * 3.5;
        assert!(transform.point_to_world(object).distance(world) < 1e-4);
    }

    #[test]
    fn test_normals_follow_non_uniform_scale() {
        let transform = GeometryTransform::new(Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0)));
        // Plane x = y in object space; after stretching x its normal tilts toward +y.
        let n = transform.normal_to_world(Vec3::new(1.0, -1.0, 0.0).normalize());
        let tangent = transform.vector_to_world(Vec3::new(1.0, 1.0, 0.0));
        assert!(n.dot(tangent).abs() < 1e-5);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }
}
