// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use anyhow::{Context, Result};

use crate::geometry::texture::RgbaTexture;

/// Decode an image file into an albedo texture (RGBA floats, still gamma-encoded).
pub fn load_texture(path: &Path) -> Result<RgbaTexture> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load texture: {}", path.display()))?
        .to_rgba32f();

    let (width, height) = img.dimensions();
    let pixels: Vec<[f32; 4]> = img
        .as_raw()
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect();

    let texture = RgbaTexture::new(width, height, pixels)
        .with_context(|| format!("Texture has no pixels: {}", path.display()))?;
    log::info!("Loaded texture '{}' ({width}x{height})", path.display());
    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::texture::AlbedoTexture;

    #[test]
    fn test_png_round_trips_through_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("albedo.png");
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 255, 255]));
        img.save(&path).unwrap();

        let texture = load_texture(&path).unwrap();
        assert_eq!(texture.size(), (2, 1));
        assert_eq!(texture.fetch(0, 0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(texture.fetch(1, 0), [0.0, 0.0, 1.0, 1.0]);
    }
}
