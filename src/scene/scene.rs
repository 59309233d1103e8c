// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use super::config::BakeConfig;
use super::light::Light;
use crate::error::{BakeError, Result};
use crate::geometry::instance::{Geometry, GeometryId};
use crate::geometry::mesh::Mesh;

/// Everything a bake consumes: a mesh arena, the instances placing those
/// meshes, the lights and the settings.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub geometries: Vec<Geometry>,
    pub lights: Vec<Light>,
    pub config: BakeConfig,
}

impl Scene {
    pub fn new(config: BakeConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.push(geometry);
        self.geometries.len() - 1
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn mesh_of(&self, geometry: &Geometry) -> Result<&Mesh> {
        self.meshes
            .get(geometry.mesh)
            .ok_or(BakeError::MissingMesh(geometry.mesh))
    }

    /// Fail early if any instance points outside the mesh arena.
    pub fn validate(&self) -> Result<()> {
        for geometry in &self.geometries {
            self.mesh_of(geometry)?;
        }
        Ok(())
    }

    /// Indices of meshes referenced by at least one geometry.
    pub fn used_meshes(&self) -> Vec<usize> {
        let mut used: Vec<usize> = self.geometries.iter().map(|g| g.mesh).collect();
        used.sort_unstable();
        used.dedup();
        used
    }
}
