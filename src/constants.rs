// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

// Mesh layout: position(3) uv(2) normal(3) tangent(3) lightmap uv(2)
pub const VERTEX_STRIDE: usize = 13;

// AABB padding
pub const AABB_EPS: f32 = 0.0001;

// Ray/triangle intersection
pub const RAY_EPSILON: f32 = 1e-5;
pub const TRIANGLE_DET_EPS: f32 = 1e-9;

// Chart extraction: maximum `1 - dot(n, seed_n)` for a triangle to join a chart.
pub const CHART_NORMAL_TOLERANCE: f32 = 1.0 / 256.0;
// Normals with |y| above this use Z as the look-at "up" axis.
pub const CHART_VERTICAL_THRESHOLD: f32 = 0.999;
pub const CHART_ROTATION_STEPS: u32 = 90;

// Packer: placed-quad count at which overlap tests switch to the rect tree.
pub const PACKER_INDEX_BATCH: usize = 32;

// Rasterization: barycentric slack for samples on shared edges.
pub const RASTER_EDGE_EPS: f32 = 1e-5;

// Albedo textures are stored gamma-encoded.
pub const ALBEDO_GAMMA: f32 = 2.2;
pub const DEFAULT_ALBEDO: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

// Margin dilation budget multiplier relative to the chart margin.
pub const MARGIN_ITERATION_FACTOR: u32 = 4;

// Bake defaults
pub const DEFAULT_RAY_OFFSET: f32 = 0.001;
pub const DEFAULT_INDIRECT_BOUNCES: u32 = 2;
pub const DEFAULT_INDIRECT_RAYS_PER_SAMPLE: u32 = 16;
pub const DEFAULT_SHADOW_RAYS_PER_SAMPLE: u32 = 8;
pub const DEFAULT_SHADOW_BLUR_AREA: f32 = 1.0;
pub const DEFAULT_INDIRECT_BLUR_AREA: f32 = 2.0;
pub const DEFAULT_TEXELS_PER_UNIT: f32 = 16.0;
pub const DEFAULT_CHART_MARGIN: u32 = 2;
pub const DEFAULT_SEED: u64 = 0x5eed_1157;

// Light defaults
pub const DEFAULT_LIGHT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
pub const DEFAULT_AMBIENT: [f32; 3] = [0.1, 0.1, 0.1];
pub const DEFAULT_SUN_DIRECTION: [f32; 3] = [-0.3, -1.0, -0.2];
pub const DEFAULT_SUN_ANGULAR_SIZE: f32 = 0.5;
pub const DEFAULT_POINT_SIZE: f32 = 0.1;
pub const DEFAULT_POINT_LUMINANCE: f32 = 10.0;
pub const DEFAULT_POINT_CUTOFF: f32 = 0.001;
pub const DEFAULT_SPOT_INNER_ANGLE: f32 = 20.0;
pub const DEFAULT_SPOT_OUTER_ANGLE: f32 = 30.0;

// CLI
pub const DEFAULT_OUTPUT_DIR: &str = "lightmaps";
pub const PROGRESS_POLL_MS: u64 = 250;

/// Resolve a data-file path: check next to the executable first, then macOS bundle, then CWD.
pub fn resolve_data_path(relative: &str) -> PathBuf {
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let candidates = [dir.join(relative), dir.join("../Resources").join(relative)];
        for path in &candidates {
            if path.exists() {
                return path.clone();
            }
        }
    }
    PathBuf::from(relative)
}

/// Resolve a relative asset path referenced by a scene file:
/// 1. Return as-is if the path already exists
/// 2. Try relative to the scene file's directory
/// 3. Try via `resolve_data_path()`
/// 4. Fall back to the original path unchanged
pub fn resolve_resource_path(scene_dir: &Path, relative: &str) -> String {
    if Path::new(relative).exists() {
        return relative.to_string();
    }
    let scene_relative = scene_dir.join(relative);
    if scene_relative.exists() {
        return scene_relative.to_string_lossy().into_owned();
    }
    let data = resolve_data_path(relative);
    if data.exists() {
        return data.to_string_lossy().into_owned();
    }
    relative.to_string()
}
