// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt::Debug;

use glam::{Vec2, Vec3};

use crate::constants::ALBEDO_GAMMA;

/// Decoded albedo surface owned by the caller. Fetches are nearest-neighbour
/// by integer texel coordinate and may happen from any worker thread.
pub trait AlbedoTexture: Send + Sync + Debug {
    fn size(&self) -> (u32, u32);

    /// RGBA in [0, 1], gamma-encoded.
    fn fetch(&self, x: u32, y: u32) -> [f32; 4];

    /// Nearest-neighbour lookup by normalised coordinate, wrapping outside [0, 1).
    fn sample(&self, uv: Vec2) -> [f32; 4] {
        let (w, h) = self.size();
        if w == 0 || h == 0 {
            return [0.0; 4];
        }
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);
        let x = ((u * w as f32) as u32).min(w - 1);
        let y = ((v * h as f32) as u32).min(h - 1);
        self.fetch(x, y)
    }
}

/// Linear-space albedo from a gamma-encoded RGBA texel.
pub fn decode_albedo(texel: [f32; 4]) -> Vec3 {
    Vec3::new(texel[0], texel[1], texel[2])
        .max(Vec3::ZERO)
        .powf(ALBEDO_GAMMA)
}

/// Uniform colour, used for geometry without a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidColor(pub [f32; 4]);

impl AlbedoTexture for SolidColor {
    fn size(&self) -> (u32, u32) {
        (1, 1)
    }

    fn fetch(&self, _x: u32, _y: u32) -> [f32; 4] {
        self.0
    }
}

/// Plain in-memory RGBA float surface, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaTexture {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl RgbaTexture {
    /// Returns `None` when the pixel count does not match the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn memory_bytes(&self) -> u64 {
        (self.pixels.len() * std::mem::size_of::<[f32; 4]>()) as u64
    }
}

impl AlbedoTexture for RgbaTexture {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fetch(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[(y * self.width + x) as usize]
    }
}
