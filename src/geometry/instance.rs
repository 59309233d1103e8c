// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use glam::{Vec2, Vec3};

use super::texture::{AlbedoTexture, SolidColor, decode_albedo};
use super::transform::GeometryTransform;
use crate::constants::DEFAULT_ALBEDO;

/// Index of a geometry instance inside its scene.
pub type GeometryId = usize;

/// One placed copy of a mesh. Many instances may share the same mesh.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub name: String,
    /// Index into the scene's mesh list.
    pub mesh: usize,
    pub transform: GeometryTransform,
    pub texture: Option<Arc<dyn AlbedoTexture>>,
}

impl Geometry {
    pub fn new(name: impl Into<String>, mesh: usize, transform: GeometryTransform) -> Self {
        Self {
            name: name.into(),
            mesh,
            transform,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: Arc<dyn AlbedoTexture>) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_albedo(self, color: [f32; 3]) -> Self {
        self.with_texture(Arc::new(SolidColor([color[0], color[1], color[2], 1.0])))
    }

    /// Linear albedo at a texture coordinate.
    pub fn albedo(&self, uv: Vec2) -> Vec3 {
        match &self.texture {
            Some(texture) => decode_albedo(texture.sample(uv)),
            None => decode_albedo(DEFAULT_ALBEDO),
        }
    }
}
