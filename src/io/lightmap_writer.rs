// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bake::upload::UploadCommand;
use crate::constants::ALBEDO_GAMMA;

/// Image format for lightmaps dumped by the command-line baker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightmapFormat {
    /// 8-bit, gamma-encoded.
    #[default]
    Png,
    /// 32-bit float, linear.
    Exr,
}

impl LightmapFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Exr => "exr",
        }
    }
}

/// `<dir>/<name>.<ext>`, with path separators in `name` replaced.
pub fn lightmap_path(dir: &Path, name: &str, format: LightmapFormat) -> PathBuf {
    let safe: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    dir.join(format!("{safe}.{}", format.extension()))
}

fn encode_channel(v: f32) -> u8 {
    (v.max(0.0).powf(1.0 / ALBEDO_GAMMA).min(1.0) * 255.0 + 0.5) as u8
}

/// Write a finished lightmap to disk, creating the parent directory.
pub fn write_lightmap(command: &UploadCommand, path: &Path, format: LightmapFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let saved = match format {
        LightmapFormat::Png => {
            let bytes = command.data.iter().map(|&v| encode_channel(v)).collect();
            let img = image::RgbImage::from_raw(command.width, command.height, bytes)
                .context("Failed to create image from lightmap data")?;
            img.save(path)
        }
        LightmapFormat::Exr => {
            let img = image::Rgb32FImage::from_raw(command.width, command.height, command.data.clone())
                .context("Failed to create image from lightmap data")?;
            img.save(path)
        }
    };
    saved.with_context(|| format!("Failed to save lightmap to {}", path.display()))?;

    log::info!(
        "Lightmap {}x{} saved to {}",
        command.width,
        command.height,
        path.display()
    );
    Ok(())
}
