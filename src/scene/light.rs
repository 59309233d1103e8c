// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AMBIENT, DEFAULT_LIGHT_COLOR, DEFAULT_POINT_CUTOFF, DEFAULT_POINT_LUMINANCE,
    DEFAULT_POINT_SIZE, DEFAULT_SPOT_INNER_ANGLE, DEFAULT_SPOT_OUTER_ANGLE,
    DEFAULT_SUN_ANGULAR_SIZE, DEFAULT_SUN_DIRECTION,
};

/// Light sources understood by the baker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels in.
    #[serde(default = "default_sun_direction")]
    pub direction: [f32; 3],
    /// Apparent diameter in degrees; drives soft shadow jitter.
    #[serde(default = "default_sun_angular_size")]
    pub angular_size: f32,
    #[serde(default = "default_color")]
    pub diffuse: [f32; 3],
    #[serde(default = "default_ambient")]
    pub ambient: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    #[serde(default)]
    pub position: [f32; 3],
    /// Emitter radius; drives soft shadow jitter.
    #[serde(default = "default_point_size")]
    pub size: f32,
    #[serde(default = "default_color")]
    pub color: [f32; 3],
    #[serde(default = "default_luminance")]
    pub luminance: f32,
    /// Texels receiving less than this (luminance / distance²) are skipped.
    #[serde(default = "default_cutoff")]
    pub cutoff: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    #[serde(flatten)]
    pub point: PointLight,
    #[serde(default = "default_spot_direction")]
    pub direction: [f32; 3],
    /// Full-intensity half angle, degrees.
    #[serde(default = "default_inner_angle")]
    pub inner_angle: f32,
    /// Zero-intensity half angle, degrees.
    #[serde(default = "default_outer_angle")]
    pub outer_angle: f32,
}

fn default_sun_direction() -> [f32; 3] {
    DEFAULT_SUN_DIRECTION
}

fn default_sun_angular_size() -> f32 {
    DEFAULT_SUN_ANGULAR_SIZE
}

fn default_color() -> [f32; 3] {
    DEFAULT_LIGHT_COLOR
}

fn default_ambient() -> [f32; 3] {
    DEFAULT_AMBIENT
}

fn default_point_size() -> f32 {
    DEFAULT_POINT_SIZE
}

fn default_luminance() -> f32 {
    DEFAULT_POINT_LUMINANCE
}

fn default_cutoff() -> f32 {
    DEFAULT_POINT_CUTOFF
}

fn default_spot_direction() -> [f32; 3] {
    [0.0, -1.0, 0.0]
}

fn default_inner_angle() -> f32 {
    DEFAULT_SPOT_INNER_ANGLE
}

fn default_outer_angle() -> f32 {
    DEFAULT_SPOT_OUTER_ANGLE
}

/// Direction from a surface point toward the light and the distance to travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRay {
    pub dir: Vec3,
    pub distance: f32,
}

impl Light {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Directional(_) => "Directional",
            Self::Point(_) => "Point",
            Self::Spot(_) => "Spot",
        }
    }

    fn point(&self) -> Option<&PointLight> {
        match self {
            Self::Directional(_) => None,
            Self::Point(p) => Some(p),
            Self::Spot(s) => Some(&s.point),
        }
    }

    /// Constant term added regardless of visibility.
    pub fn ambient(&self) -> Vec3 {
        match self {
            Self::Directional(d) => Vec3::from(d.ambient),
            Self::Point(_) | Self::Spot(_) => Vec3::ZERO,
        }
    }

    /// Unjittered ray toward the light centre.
    pub fn ray_from(&self, position: Vec3) -> LightRay {
        match self {
            Self::Directional(d) => LightRay {
                dir: -Vec3::from(d.direction).normalize_or_zero(),
                distance: f32::INFINITY,
            },
            Self::Point(PointLight { position: p, .. })
            | Self::Spot(SpotLight {
                point: PointLight { position: p, .. },
                ..
            }) => {
                let to_light = Vec3::from(*p) - position;
                let distance = to_light.length();
                LightRay {
                    dir: to_light.normalize_or_zero(),
                    distance,
                }
            }
        }
    }

    /// Ray toward a random point of the emitter: a cone of the sun's angular
    /// size, or a ball of the point light's radius.
    pub fn jittered_ray_from<R: Rng>(&self, position: Vec3, rng: &mut R) -> LightRay {
        match self {
            Self::Directional(d) => {
                let axis = -Vec3::from(d.direction).normalize_or_zero();
                let half_angle = (d.angular_size * 0.5).to_radians();
                LightRay {
                    dir: sample_cone(axis, half_angle, rng),
                    distance: f32::INFINITY,
                }
            }
            Self::Point(p) | Self::Spot(SpotLight { point: p, .. }) => {
                let target = Vec3::from(p.position) + sample_ball(rng) * p.size;
                let to_light = target - position;
                LightRay {
                    dir: to_light.normalize_or_zero(),
                    distance: to_light.length(),
                }
            }
        }
    }

    /// Received intensity scale at `position` before N·L, used for the bake cutoff.
    fn attenuation(&self, position: Vec3) -> f32 {
        match self {
            Self::Directional(_) => 1.0,
            Self::Point(p) => p.luminance / Vec3::from(p.position).distance_squared(position).max(1e-8),
            Self::Spot(s) => {
                let p = &s.point;
                let to_point = position - Vec3::from(p.position);
                let d2 = to_point.length_squared().max(1e-8);
                let cos_angle = to_point
                    .normalize_or_zero()
                    .dot(Vec3::from(s.direction).normalize_or_zero());
                let cone = smoothstep(
                    s.outer_angle.to_radians().cos(),
                    s.inner_angle.to_radians().cos(),
                    cos_angle,
                );
                p.luminance * cone / d2
            }
        }
    }

    /// True when the light's contribution at `position` is negligible.
    pub fn below_cutoff(&self, position: Vec3) -> bool {
        match self.point() {
            Some(p) => self.attenuation(position) < p.cutoff,
            None => false,
        }
    }

    /// Unshadowed direct irradiance: colour × attenuation × max(N·L, 0).
    pub fn irradiance(&self, position: Vec3, normal: Vec3) -> Vec3 {
        let ray = self.ray_from(position);
        let n_dot_l = normal.dot(ray.dir).max(0.0);
        if n_dot_l <= 0.0 {
            return Vec3::ZERO;
        }
        let color = match self {
            Self::Directional(d) => Vec3::from(d.diffuse),
            Self::Point(p) => Vec3::from(p.color),
            Self::Spot(s) => Vec3::from(s.point.color),
        };
        color * self.attenuation(position) * n_dot_l
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x >= edge1 { 1.0 } else { 0.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Uniform direction inside a cone around `axis`.
pub fn sample_cone<R: Rng>(axis: Vec3, half_angle: f32, rng: &mut R) -> Vec3 {
    if half_angle <= 0.0 || axis == Vec3::ZERO {
        return axis;
    }
    let cos_max = half_angle.cos();
    let cos_theta = 1.0 - rng.random::<f32>() * (1.0 - cos_max);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = TAU * rng.random::<f32>();
    let (b1, b2) = axis.any_orthonormal_pair();
    (axis * cos_theta + (b1 * phi.cos() + b2 * phi.sin()) * sin_theta).normalize()
}

/// Uniform point in the unit ball.
pub fn sample_ball<R: Rng>(rng: &mut R) -> Vec3 {
    let z = 2.0 * rng.random::<f32>() - 1.0;
    let phi = TAU * rng.random::<f32>();
    let r_xy = (1.0 - z * z).max(0.0).sqrt();
    let dir = Vec3::new(r_xy * phi.cos(), r_xy * phi.sin(), z);
    dir * rng.random::<f32>().cbrt()
}
