// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::Rng;

use super::buffers::LightSample;
use crate::accel::aabb::Aabb;
use crate::error::Result;
use crate::geometry::instance::{Geometry, GeometryId};
use crate::geometry::mesh::Mesh;
use crate::scene::config::BakeConfig;
use crate::scene::light::Light;
use crate::scene::scene::Scene;

/// A texel sample resolved to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
}

impl WorldPoint {
    /// Interpolate `mesh` at `(triangle, barycentric)` and move the result
    /// into the geometry's world frame.
    pub fn on(geometry: &Geometry, mesh: &Mesh, triangle: u32, barycentric: Vec3) -> Self {
        let surface = mesh.interpolate(triangle, barycentric);
        let transform = &geometry.transform;
        Self {
            position: transform.point_to_world(surface.position),
            normal: transform.normal_to_world(surface.normal),
            tangent: transform.vector_to_world(surface.tangent).normalize_or_zero(),
        }
    }
}

/// Nearest surface struck by a scene ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHit {
    pub geometry: GeometryId,
    pub distance: f32,
    pub position: Vec3,
    /// Interpolated shading normal, world space.
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Ray queries over every geometry of a scene. Each instance is culled by its
/// world-space bounds, then the ray is moved into object space and handed to
/// the mesh BVH.
pub struct SceneTracer<'a> {
    scene: &'a Scene,
    bounds: Vec<Aabb>,
}

impl<'a> SceneTracer<'a> {
    pub fn new(scene: &'a Scene) -> Result<Self> {
        let bounds = scene
            .geometries
            .iter()
            .map(|g| {
                let mesh = scene.mesh_of(g)?;
                Ok(g.transform.bounds_to_world(&mesh.bvh().bounds()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { scene, bounds })
    }

    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    fn candidates(&self, origin: Vec3, dir: Vec3, max_length: f32) -> impl Iterator<Item = (GeometryId, &'a Geometry)> + '_ {
        let inv_dir = dir.recip();
        self.scene
            .geometries
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.bounds[*i].intersect_ray(origin, inv_dir, max_length).is_some())
    }

    /// True when anything blocks the segment `origin + t * dir`, `t <= max_length`.
    pub fn occluded(&self, origin: Vec3, dir: Vec3, max_length: f32) -> bool {
        self.candidates(origin, dir, max_length).any(|(_, geometry)| {
            let mesh = &self.scene.meshes[geometry.mesh];
            let (o, d) = geometry.transform.ray_to_object(origin, dir);
            mesh.bvh().test_occlusion(o, d, max_length)
        })
    }

    /// Closest hit across all geometries.
    pub fn trace(&self, origin: Vec3, dir: Vec3, max_length: f32) -> Option<SceneHit> {
        let mut best: Option<(GeometryId, crate::accel::bvh::RayHit)> = None;
        let mut best_t = max_length;

        for (id, geometry) in self.candidates(origin, dir, max_length) {
            let mesh = &self.scene.meshes[geometry.mesh];
            let (o, d) = geometry.transform.ray_to_object(origin, dir);
            if let Some(hit) = mesh.bvh().closest_hit(o, d, best_t) {
                best_t = hit.distance;
                best = Some((id, hit));
            }
        }

        let (id, hit) = best?;
        let geometry = &self.scene.geometries[id];
        let mesh = &self.scene.meshes[geometry.mesh];
        let surface = mesh.interpolate(hit.triangle, hit.barycentric);
        let shading = if surface.normal == Vec3::ZERO { hit.normal } else { surface.normal };
        Some(SceneHit {
            geometry: id,
            distance: hit.distance,
            position: origin + dir * hit.distance,
            normal: geometry.transform.normal_to_world(shading),
            uv: surface.uv,
        })
    }
}

/// Cosine-weighted direction in the hemisphere around `normal`.
pub fn cosine_hemisphere<R: Rng>(normal: Vec3, tangent: Vec3, rng: &mut R) -> Vec3 {
    let t = (tangent - normal * normal.dot(tangent)).normalize_or_zero();
    let (t, b) = if t == Vec3::ZERO {
        normal.any_orthonormal_pair()
    } else {
        (t, normal.cross(t))
    };
    let r = rng.random::<f32>().sqrt();
    let phi = TAU * rng.random::<f32>();
    let z = (1.0 - r * r).max(0.0).sqrt();
    (t * (r * phi.cos()) + b * (r * phi.sin()) + normal * z).normalize_or_zero()
}

/// Evaluates direct, shadow and indirect terms of one light at texel samples.
pub struct LightEvaluator<'s, 'a> {
    tracer: &'s SceneTracer<'a>,
    light: &'s Light,
    config: &'s BakeConfig,
}

impl<'s, 'a> LightEvaluator<'s, 'a> {
    pub fn new(tracer: &'s SceneTracer<'a>, light: &'s Light, config: &'s BakeConfig) -> Self {
        Self {
            tracer,
            light,
            config,
        }
    }

    /// Lighting terms at `point`. `rays` is incremented by every ray cast.
    pub fn evaluate<R: Rng>(&self, point: &WorldPoint, rng: &mut R, rays: &mut u64) -> LightSample {
        if self.light.below_cutoff(point.position) {
            return LightSample::default();
        }
        let direct = if self.config.direct_lighting_enabled {
            self.light.irradiance(point.position, point.normal)
        } else {
            Vec3::ZERO
        };
        LightSample {
            direct,
            shadow: self.shadow(point, rng, rays),
            indirect: self.indirect(point, rng, rays),
        }
    }

    fn shadow<R: Rng>(&self, point: &WorldPoint, rng: &mut R, rays: &mut u64) -> f32 {
        if !self.config.shadows_enabled {
            return 1.0;
        }
        let facing = self.light.ray_from(point.position).dir.dot(point.normal);
        if facing <= 0.0 {
            return 0.0;
        }

        let origin = point.position + point.normal * self.config.ray_offset;
        let total = self.config.effective_shadow_rays();
        let mut blocked = 0;
        for _ in 0..total {
            let ray = if self.config.fast_mode {
                self.light.ray_from(origin)
            } else {
                self.light.jittered_ray_from(origin, rng)
            };
            *rays += 1;
            if self.tracer.occluded(origin, ray.dir, ray.distance) {
                blocked += 1;
            }
        }
        1.0 - blocked as f32 / total as f32
    }

    fn indirect<R: Rng>(&self, point: &WorldPoint, rng: &mut R, rays: &mut u64) -> Vec3 {
        if !self.config.indirect_active() {
            return self.light.ambient();
        }
        let count = self.config.indirect_rays_per_sample.max(1);
        let mut total = Vec3::ZERO;
        for _ in 0..count {
            total += self.trace_path(point, rng, rays);
        }
        total / count as f32
    }

    /// One bounce path. Stops at the first bounce point that sees the light, or
    /// when the ray leaves the scene and picks up the ambient term.
    fn trace_path<R: Rng>(&self, point: &WorldPoint, rng: &mut R, rays: &mut u64) -> Vec3 {
        let offset = self.config.ray_offset;
        let mut origin = point.position + point.normal * offset;
        let mut dir = cosine_hemisphere(point.normal, point.tangent, rng);
        let mut throughput = Vec3::ONE;

        for _ in 0..self.config.indirect_bounces {
            *rays += 1;
            let Some(hit) = self.tracer.trace(origin, dir, f32::INFINITY) else {
                return self.light.ambient() * throughput;
            };
            let geometry = &self.tracer.scene().geometries[hit.geometry];
            throughput *= geometry.albedo(hit.uv);

            let normal = if hit.normal.dot(dir) > 0.0 { -hit.normal } else { hit.normal };
            let bounce_origin = hit.position + normal * offset;
            let to_light = self.light.ray_from(bounce_origin);
            *rays += 1;
            if to_light.dir.dot(normal) > 0.0
                && !self.tracer.occluded(bounce_origin, to_light.dir, to_light.distance)
            {
                return self.light.irradiance(hit.position, normal) * throughput;
            }

            origin = bounce_origin;
            dir = cosine_hemisphere(normal, Vec3::ZERO, rng);
        }
        Vec3::ZERO
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::geometry::mesh::vertex;
    use crate::geometry::texture::decode_albedo;
    use crate::geometry::transform::GeometryTransform;
    use crate::scene::light::{DirectionalLight, PointLight};

    /// Unit quad in the XZ plane facing +Y, centred at the origin.
    pub(crate) fn floor_mesh(half: f32) -> Mesh {
        let n = [0.0, 1.0, 0.0];
        Mesh::new(
            vec![
                vertex([-half, 0.0, -half], [0.0, 0.0], n),
                vertex([half, 0.0, -half], [1.0, 0.0], n),
                vertex([half, 0.0, half], [1.0, 1.0], n),
                vertex([-half, 0.0, half], [0.0, 1.0], n),
            ],
            vec![0, 2, 1, 0, 3, 2],
        )
        .unwrap()
    }

    fn two_floors() -> Scene {
        let mut scene = Scene::default();
        let mesh = scene.add_mesh(floor_mesh(1.0));
        scene.add_geometry(Geometry::new("low", mesh, GeometryTransform::default()));
        scene.add_geometry(Geometry::new(
            "high",
            mesh,
            GeometryTransform::from_position_rotation_scale(Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO, 1.0),
        ));
        scene
    }

    fn sun() -> Light {
        Light::Directional(DirectionalLight {
            direction: [0.0, -1.0, 0.0],
            angular_size: 0.0,
            diffuse: [1.0, 1.0, 1.0],
            ambient: [0.2, 0.2, 0.2],
        })
    }

    #[test]
    fn test_tracer_hits_nearest_instance() {
        let scene = two_floors();
        let tracer = SceneTracer::new(&scene).unwrap();
        let hit = tracer.trace(Vec3::new(0.1, 5.0, 0.1), Vec3::NEG_Y, f32::INFINITY).unwrap();
        assert_eq!(hit.geometry, 1);
        assert!((hit.distance - 3.0).abs() < 1e-4);
        assert!((hit.position.y - 2.0).abs() < 1e-4);

        assert!(tracer.occluded(Vec3::new(0.1, 1.0, 0.1), Vec3::Y, 5.0));
        assert!(!tracer.occluded(Vec3::new(0.1, 1.0, 0.1), Vec3::Y, 0.5));
        assert!(tracer.trace(Vec3::new(5.0, 1.0, 0.0), Vec3::X, f32::INFINITY).is_none());
    }

    #[test]
    fn test_shadowed_point_has_zero_shadow_term() {
        let scene = two_floors();
        let tracer = SceneTracer::new(&scene).unwrap();
        let light = sun();
        let config = BakeConfig {
            indirect_lighting_enabled: false,
            ..BakeConfig::default()
        };
        let evaluator = LightEvaluator::new(&tracer, &light, &config);
        let mut rng = StdRng::seed_from_u64(1);
        let mut rays = 0;

        let below = WorldPoint {
            position: Vec3::new(0.2, 0.0, 0.3),
            normal: Vec3::Y,
            tangent: Vec3::X,
        };
        let above = WorldPoint {
            position: Vec3::new(0.2, 2.0, 0.3),
            ..below
        };
        let shaded = evaluator.evaluate(&below, &mut rng, &mut rays);
        let lit = evaluator.evaluate(&above, &mut rng, &mut rays);
        assert_eq!(shaded.shadow, 0.0);
        assert_eq!(lit.shadow, 1.0);
        assert_eq!(shaded.indirect, Vec3::splat(0.2));
        assert!(rays >= 2);
    }

    #[test]
    fn test_open_sky_indirect_is_ambient() {
        let mut scene = Scene::default();
        let mesh = scene.add_mesh(floor_mesh(1.0));
        scene.add_geometry(Geometry::new("floor", mesh, GeometryTransform::default()));
        let tracer = SceneTracer::new(&scene).unwrap();
        let light = sun();
        let config = BakeConfig {
            indirect_rays_per_sample: 8,
            ..BakeConfig::default()
        };
        let evaluator = LightEvaluator::new(&tracer, &light, &config);
        let point = WorldPoint {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            tangent: Vec3::X,
        };
        let sample = evaluator.evaluate(&point, &mut StdRng::seed_from_u64(3), &mut 0);
        assert!((sample.indirect - Vec3::splat(0.2)).abs().max_element() < 1e-6);
        assert!((sample.direct - Vec3::ONE).abs().max_element() < 1e-6);
    }

    #[test]
    fn test_bounce_off_lit_ceiling_carries_albedo() {
        let mut scene = Scene::default();
        let mesh = scene.add_mesh(floor_mesh(1.0));
        let albedo = [0.5, 0.4, 0.3];
        scene.add_geometry(
            Geometry::new(
                "ceiling",
                mesh,
                GeometryTransform::from_position_rotation_scale(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO, 1000.0),
            )
            .with_albedo(albedo),
        );
        let tracer = SceneTracer::new(&scene).unwrap();
        // Shines upward onto the ceiling's underside, away from the floor point.
        let light = Light::Directional(DirectionalLight {
            direction: [0.0, 1.0, 0.0],
            angular_size: 0.0,
            diffuse: [2.0, 1.0, 0.5],
            ambient: [0.0, 0.0, 0.0],
        });
        let config = BakeConfig {
            indirect_bounces: 1,
            indirect_rays_per_sample: 16,
            ..BakeConfig::default()
        };
        let evaluator = LightEvaluator::new(&tracer, &light, &config);
        let point = WorldPoint {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            tangent: Vec3::X,
        };
        let mut rays = 0;
        let sample = evaluator.evaluate(&point, &mut StdRng::seed_from_u64(11), &mut rays);

        let expected = Vec3::new(2.0, 1.0, 0.5) * decode_albedo([albedo[0], albedo[1], albedo[2], 1.0]);
        assert!(
            (sample.indirect - expected).abs().max_element() < 1e-4,
            "{} != {expected}",
            sample.indirect
        );
        assert!((sample.indirect.x - 2.0 * 0.5f32.powf(2.2)).abs() < 1e-4);
        assert_eq!(sample.direct, Vec3::ZERO);
        assert_eq!(sample.shadow, 0.0);
        // One trace and one visibility ray per path.
        assert_eq!(rays, 32);
    }

    #[test]
    fn test_fast_mode_casts_single_unjittered_shadow_ray() {
        let scene = two_floors();
        let tracer = SceneTracer::new(&scene).unwrap();
        let light = Light::Directional(DirectionalLight {
            direction: [0.0, -1.0, 0.0],
            angular_size: 40.0,
            diffuse: [1.0, 1.0, 1.0],
            ambient: [0.2, 0.2, 0.2],
        });
        let config = BakeConfig {
            fast_mode: true,
            shadow_rays_per_sample: 16,
            indirect_rays_per_sample: 8,
            ..BakeConfig::default()
        };
        let evaluator = LightEvaluator::new(&tracer, &light, &config);
        let mut rng = StdRng::seed_from_u64(5);

        // Near the rim of the upper floor: a wide cone would let some rays past it.
        let below = WorldPoint {
            position: Vec3::new(0.9, 0.0, 0.0),
            normal: Vec3::Y,
            tangent: Vec3::X,
        };
        for _ in 0..8 {
            let mut rays = 0;
            let sample = evaluator.evaluate(&below, &mut rng, &mut rays);
            assert_eq!(rays, 1);
            assert_eq!(sample.shadow, 0.0);
            assert_eq!(sample.indirect, Vec3::splat(0.2));
        }
    }

    #[test]
    fn test_point_light_below_cutoff_yields_nothing() {
        let scene = two_floors();
        let tracer = SceneTracer::new(&scene).unwrap();
        let light = Light::Point(PointLight {
            position: [0.0, 30.0, 0.0],
            size: 0.5,
            color: [1.0, 1.0, 1.0],
            luminance: 1.0,
            cutoff: 0.01,
        });
        let config = BakeConfig::default();
        let evaluator = LightEvaluator::new(&tracer, &light, &config);
        let point = WorldPoint {
            position: Vec3::new(0.0, 2.0, 0.0),
            normal: Vec3::Y,
            tangent: Vec3::X,
        };
        let mut rays = 0;
        let sample = evaluator.evaluate(&point, &mut StdRng::seed_from_u64(2), &mut rays);
        assert_eq!(sample, LightSample::default());
        assert_eq!(rays, 0);
    }

    #[test]
    fn test_cosine_hemisphere_stays_above_surface() {
        let mut rng = StdRng::seed_from_u64(9);
        let n = Vec3::new(0.3, 0.9, -0.1).normalize();
        for _ in 0..256 {
            let d = cosine_hemisphere(n, Vec3::X, &mut rng);
            assert!(d.dot(n) >= -1e-6);
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }
}
