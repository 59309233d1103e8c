// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::lightmap_writer::LightmapFormat;
use super::obj_loader::load_obj;
use super::texture_loader::load_texture;
use crate::constants::{DEFAULT_OUTPUT_DIR, resolve_resource_path};
use crate::geometry::instance::Geometry;
use crate::geometry::texture::AlbedoTexture;
use crate::geometry::transform::GeometryTransform;
use crate::scene::config::BakeConfig;
use crate::scene::light::Light;
use crate::scene::scene::Scene;

/// One placed OBJ model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshRef {
    /// Output name; defaults to the OBJ file stem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub path: String,

    #[serde(default, skip_serializing_if = "is_zero_vec3")]
    pub position: [f32; 3],

    /// Euler XYZ, degrees.
    #[serde(default, skip_serializing_if = "is_zero_vec3")]
    pub rotation: [f32; 3],

    #[serde(default = "default_scale", skip_serializing_if = "is_default_scale")]
    pub scale: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,

    /// Flat albedo used when no texture is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub albedo: Option<[f32; 3]>,
}

fn default_scale() -> f32 {
    1.0
}

fn is_default_scale(v: &f32) -> bool {
    *v == default_scale()
}

fn is_zero_vec3(v: &[f32; 3]) -> bool {
    v[0] == 0.0 && v[1] == 0.0 && v[2] == 0.0
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

/// On-disk scene description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(default, alias = "models")]
    pub meshes: Vec<MeshRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lights: Vec<Light>,

    #[serde(default)]
    pub config: BakeConfig,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default)]
    pub output_format: LightmapFormat,
}

impl MeshRef {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            Path::new(&self.path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("mesh")
                .to_string()
        })
    }

    pub fn transform(&self) -> GeometryTransform {
        GeometryTransform::from_position_rotation_scale(
            Vec3::from(self.position),
            Vec3::from(self.rotation),
            self.scale,
        )
    }
}

/// Parse a scene file (JSON by extension, YAML otherwise) and resolve its
/// relative paths against the file's directory.
pub fn read_scene_file(path: &Path) -> Result<SceneFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene file: {}", path.display()))?;

    let mut file: SceneFile = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON scene file: {}", path.display()))?,
        _ => serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML scene file: {}", path.display()))?,
    };

    let scene_dir = path.parent().unwrap_or(Path::new("."));
    for mesh in &mut file.meshes {
        mesh.path = resolve_resource_path(scene_dir, &mesh.path);
        if let Some(ref tex) = mesh.texture {
            mesh.texture = Some(resolve_resource_path(scene_dir, tex));
        }
    }
    file.output_dir = scene_dir.join(&file.output_dir).to_string_lossy().into_owned();
    Ok(file)
}

/// A scene ready to bake plus where its lightmaps go.
#[derive(Debug)]
pub struct LoadedScene {
    pub scene: Scene,
    pub output_dir: PathBuf,
    pub output_format: LightmapFormat,
}

/// Read a scene file and load every mesh and texture it references. Models
/// and textures referenced more than once are loaded once and shared.
pub fn load_scene(path: &Path) -> Result<LoadedScene> {
    let file = read_scene_file(path)?;
    let mut scene = Scene::new(file.config.clone());
    let mut meshes: HashMap<String, usize> = HashMap::new();
    let mut textures: HashMap<String, Arc<dyn AlbedoTexture>> = HashMap::new();

    for entry in &file.meshes {
        let mesh = match meshes.get(&entry.path) {
            Some(&id) => id,
            None => {
                let id = scene.add_mesh(load_obj(Path::new(&entry.path))?);
                meshes.insert(entry.path.clone(), id);
                id
            }
        };

        let mut geometry = Geometry::new(entry.display_name(), mesh, entry.transform());
        if let Some(ref tex) = entry.texture {
            let texture = match textures.get(tex) {
                Some(texture) => Arc::clone(texture),
                None => {
                    let texture: Arc<dyn AlbedoTexture> = Arc::new(load_texture(Path::new(tex))?);
                    textures.insert(tex.clone(), Arc::clone(&texture));
                    texture
                }
            };
            geometry = geometry.with_texture(texture);
        } else if let Some(albedo) = entry.albedo {
            geometry = geometry.with_albedo(albedo);
        }
        scene.add_geometry(geometry);
    }

    for light in &file.lights {
        scene.add_light(light.clone());
    }

    log::info!(
        "Loaded scene '{}': {} meshes, {} geometries, {} lights",
        path.display(),
        scene.meshes.len(),
        scene.geometries.len(),
        scene.lights.len()
    );

    Ok(LoadedScene {
        scene,
        output_dir: PathBuf::from(file.output_dir),
        output_format: file.output_format,
    })
}
