// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CHART_MARGIN, DEFAULT_INDIRECT_BLUR_AREA, DEFAULT_INDIRECT_BOUNCES,
    DEFAULT_INDIRECT_RAYS_PER_SAMPLE, DEFAULT_RAY_OFFSET, DEFAULT_SEED,
    DEFAULT_SHADOW_BLUR_AREA, DEFAULT_SHADOW_RAYS_PER_SAMPLE, DEFAULT_TEXELS_PER_UNIT,
};
use crate::sampling::SamplingMode;
use crate::uvgen::UvOptions;

/// Filter applied to the shadow and indirect terms before combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenoiserKind {
    None,
    #[default]
    Gaussian,
    Median,
}

/// Global bake settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakeConfig {
    #[serde(default)]
    pub sampling_mode: SamplingMode,

    /// Distance along the surface normal that secondary rays start from.
    #[serde(default = "default_ray_offset")]
    pub ray_offset: f32,

    #[serde(default = "default_indirect_bounces")]
    pub indirect_bounces: u32,

    #[serde(default = "default_indirect_rays")]
    pub indirect_rays_per_sample: u32,

    #[serde(default = "default_shadow_rays")]
    pub shadow_rays_per_sample: u32,

    /// Gaussian area (sigma, texels) for the shadow term; 0 disables.
    #[serde(default = "default_shadow_blur")]
    pub shadow_blur_area: f32,

    /// Gaussian area (sigma, texels) for the indirect term; 0 disables.
    #[serde(default = "default_indirect_blur")]
    pub indirect_lighting_blur_area: f32,

    #[serde(default = "default_true")]
    pub direct_lighting_enabled: bool,

    #[serde(default = "default_true")]
    pub shadows_enabled: bool,

    #[serde(default = "default_true")]
    pub indirect_lighting_enabled: bool,

    /// One unjittered shadow ray, no indirect light.
    #[serde(default)]
    pub fast_mode: bool,

    /// Lightmap texels per object-space unit.
    #[serde(default = "default_texels_per_unit")]
    pub texels_per_unit: f32,

    /// Empty texels kept around every chart.
    #[serde(default = "default_chart_margin")]
    pub chart_margin: u32,

    #[serde(default = "default_true")]
    pub rotate_charts: bool,

    #[serde(default)]
    pub denoiser: DenoiserKind,

    /// Base seed for all stochastic sampling; bakes are reproducible.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Worker count; 0 uses the available hardware concurrency.
    #[serde(default)]
    pub threads: usize,
}

fn default_ray_offset() -> f32 {
    DEFAULT_RAY_OFFSET
}

fn default_indirect_bounces() -> u32 {
    DEFAULT_INDIRECT_BOUNCES
}

fn default_indirect_rays() -> u32 {
    DEFAULT_INDIRECT_RAYS_PER_SAMPLE
}

fn default_shadow_rays() -> u32 {
    DEFAULT_SHADOW_RAYS_PER_SAMPLE
}

fn default_shadow_blur() -> f32 {
    DEFAULT_SHADOW_BLUR_AREA
}

fn default_indirect_blur() -> f32 {
    DEFAULT_INDIRECT_BLUR_AREA
}

fn default_true() -> bool {
    true
}

fn default_texels_per_unit() -> f32 {
    DEFAULT_TEXELS_PER_UNIT
}

fn default_chart_margin() -> u32 {
    DEFAULT_CHART_MARGIN
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            sampling_mode: SamplingMode::default(),
            ray_offset: default_ray_offset(),
            indirect_bounces: default_indirect_bounces(),
            indirect_rays_per_sample: default_indirect_rays(),
            shadow_rays_per_sample: default_shadow_rays(),
            shadow_blur_area: default_shadow_blur(),
            indirect_lighting_blur_area: default_indirect_blur(),
            direct_lighting_enabled: true,
            shadows_enabled: true,
            indirect_lighting_enabled: true,
            fast_mode: false,
            texels_per_unit: default_texels_per_unit(),
            chart_margin: default_chart_margin(),
            rotate_charts: true,
            denoiser: DenoiserKind::default(),
            seed: default_seed(),
            threads: 0,
        }
    }
}

impl BakeConfig {
    pub fn uv_options(&self) -> UvOptions {
        UvOptions {
            texels_per_unit: self.texels_per_unit,
            margin: self.chart_margin,
            rotate_charts: self.rotate_charts,
        }
    }

    /// Shadow rays actually traced per sample.
    pub fn effective_shadow_rays(&self) -> u32 {
        if self.fast_mode {
            1
        } else {
            self.shadow_rays_per_sample.max(1)
        }
    }

    pub fn indirect_active(&self) -> bool {
        self.indirect_lighting_enabled && !self.fast_mode && self.indirect_bounces > 0
    }

    pub fn worker_count(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        }
    }
}
