// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::mpsc::Sender;

use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::buffers::{LightBuffer, SampleBuffer};
use super::lighting::{LightEvaluator, SceneTracer, WorldPoint};
use super::rasterize::compute_sample_buffer;
use super::status::{BakeStage, BakeStatus};
use super::upload::UploadCommand;
use crate::error::{BakeError, Result};
use crate::geometry::instance::{Geometry, GeometryId};
use crate::geometry::mesh::Mesh;
use crate::post::blur::GaussianBlur;
use crate::post::margin::{dilate, margin_budget};
use crate::post::median::MedianDenoiser;
use crate::post::pixels::{Pixel, PixelAccess, PixelBuffer};
use crate::scene::config::{BakeConfig, DenoiserKind};
use crate::scene::light::Light;
use crate::scene::scene::Scene;
use crate::uvgen::rect_tree::Rect;
use crate::uvgen::{LightmapLayout, generate_lightmap_uvs};

/// Share of the progress bar spent before the first geometry starts.
const PREPARE_PERCENT: f32 = 15.0;

pub fn build_pool(config: &BakeConfig) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(config.worker_count())
        .thread_name(|i| format!("lightbaker-{i}"))
        .build()
        .map_err(|e| BakeError::WorkerFailure(e.to_string()))
}

/// Bake every geometry of `scene`, sending one `UploadCommand` per geometry.
///
/// Meshes without lightmap UVs are unwrapped first. Phases run one after
/// another on a pool sized to the hardware; each blocks until its workers are
/// done.
pub fn bake_scene(scene: &mut Scene, status: &BakeStatus, uploads: &Sender<UploadCommand>) -> Result<()> {
    scene.validate()?;
    let pool = build_pool(&scene.config)?;
    log::info!(
        "Baking {} geometries, {} lights on {} threads",
        scene.geometries.len(),
        scene.lights.len(),
        pool.current_num_threads()
    );

    status.enter(BakeStage::LoadTextures, 0.0, "");
    let texture_bytes: u64 = scene
        .geometries
        .iter()
        .filter_map(|g| g.texture.as_ref())
        .map(|t| {
            let (w, h) = t.size();
            u64::from(w) * u64::from(h) * 16
        })
        .sum();
    status.set_memory(texture_bytes);

    status.enter(BakeStage::ScheduleUvs, 2.0, "");
    let used = scene.used_meshes();
    let pending: Vec<usize> = used
        .iter()
        .copied()
        .filter(|&i| scene.meshes[i].layout().is_none())
        .collect();
    log::info!("Generating lightmap UVs for {} of {} meshes", pending.len(), used.len());

    status.enter(BakeStage::WaitUvs, 5.0, "");
    let options = scene.config.uv_options();
    pool.install(|| {
        scene
            .meshes
            .par_iter_mut()
            .enumerate()
            .filter(|(i, _)| pending.binary_search(i).is_ok())
            .try_for_each(|(_, mesh)| generate_lightmap_uvs(mesh, &options))
    })?;

    status.enter(BakeStage::WaitBvh, 10.0, "");
    let scene: &Scene = scene;
    let unbuilt: Vec<usize> = used.iter().copied().filter(|&i| !scene.meshes[i].has_bvh()).collect();
    log::info!("Building {} BVHs", unbuilt.len());
    pool.install(|| {
        unbuilt.par_iter().for_each(|&i| {
            scene.meshes[i].bvh();
        })
    });

    let tracer = SceneTracer::new(scene)?;
    let count = scene.geometries.len().max(1) as f32;
    for (id, geometry) in scene.geometries.iter().enumerate() {
        let mesh = scene.mesh_of(geometry)?;
        let layout = mesh.layout().ok_or(BakeError::MissingLayout(geometry.mesh))?;
        let span = (100.0 - PREPARE_PERCENT) / count;
        let baker = GeometryBaker {
            pool: &pool,
            tracer: &tracer,
            status,
            id,
            geometry,
            mesh,
            layout,
            config: &scene.config,
            lights: &scene.lights,
            base_bytes: texture_bytes,
            percent_start: PREPARE_PERCENT + span * id as f32,
            percent_span: span,
        };
        let data = baker.run()?;

        status.enter(BakeStage::UploadTexture, baker.percent(1.0), &geometry.name);
        let command = UploadCommand {
            geometry: id,
            width: layout.size,
            height: layout.size,
            data,
        };
        if uploads.send(command).is_err() {
            log::warn!("Upload queue closed, dropping lightmap of '{}'", geometry.name);
        }
    }

    status.set_percent(100.0);
    status.set_message("Done");
    log::info!("Bake finished: {} rays", status.snapshot().rays);
    Ok(())
}

/// Per-scanline seed so results do not depend on scheduling.
fn scanline_seed(seed: u64, geometry: GeometryId, light: usize, row: usize) -> u64 {
    [geometry, light, row].iter().fold(seed, |h, &v| {
        (h ^ v as u64)
            .wrapping_mul(0xbf58_476d_1ce4_e5b9)
            .rotate_left(31)
    })
}

/// Averaged per-texel terms of one light.
struct LightTerms {
    direct: PixelBuffer<Vec3>,
    shadow: PixelBuffer<f32>,
    indirect: PixelBuffer<Vec3>,
}

struct GeometryBaker<'s, 'a> {
    pool: &'s ThreadPool,
    tracer: &'s SceneTracer<'a>,
    status: &'s BakeStatus,
    id: GeometryId,
    geometry: &'a Geometry,
    mesh: &'a Mesh,
    layout: &'a LightmapLayout,
    config: &'a BakeConfig,
    lights: &'a [Light],
    base_bytes: u64,
    percent_start: f32,
    percent_span: f32,
}

impl GeometryBaker<'_, '_> {
    fn percent(&self, fraction: f32) -> f32 {
        self.percent_start + self.percent_span * fraction
    }

    fn enter(&self, stage: BakeStage, fraction: f32) {
        self.status.enter(stage, self.percent(fraction), &self.geometry.name);
    }

    /// Flat RGB lightmap of this geometry.
    fn run(&self) -> Result<Vec<f32>> {
        let size = self.layout.size;
        log::info!("Baking '{}' into a {size}x{size} lightmap", self.geometry.name);

        self.enter(BakeStage::ComputeSampleBuffers, 0.0);
        let offsets = self.config.sampling_mode.offsets();
        let samples = compute_sample_buffer(self.layout, &offsets);
        log::debug!(
            "'{}': {} of {} samples filled",
            self.geometry.name,
            samples.filled_count(),
            size as usize * size as usize * offsets.len()
        );

        let mut result = PixelBuffer::<Vec3>::new(size, size);
        for y in 0..size {
            for x in 0..size {
                if samples.is_covered(x, y) {
                    result.fill(x, y, Vec3::ZERO);
                }
            }
        }

        let light_count = self.lights.len().max(1) as f32;
        for (index, light) in self.lights.iter().enumerate() {
            let fraction = 0.1 + 0.8 * index as f32 / light_count;
            self.enter(BakeStage::BakeLightmapTile, fraction);
            let buffer = self.bake_light(index, light, &samples);
            self.status.set_memory(
                self.base_bytes
                    + self.mesh.memory_bytes()
                    + samples.memory_bytes()
                    + buffer.memory_bytes()
                    + result.memory_bytes(),
            );
            let mut terms = resolve_terms(&buffer, &samples);
            drop(buffer);

            self.enter(BakeStage::Denoise, fraction + 0.6 / light_count);
            self.denoise(&mut terms.shadow, self.config.shadow_blur_area);
            self.denoise(&mut terms.indirect, self.config.indirect_lighting_blur_area);

            self.enter(BakeStage::Combine, fraction + 0.7 / light_count);
            combine(&mut result, &terms);
        }

        self.enter(BakeStage::GenerateMargins, 0.9);
        let margin = self.config.chart_margin;
        self.per_chart(&mut result, |tile| {
            let budget = margin_budget(tile.width(), tile.height(), margin);
            dilate(tile, budget);
        });

        self.enter(BakeStage::Output, 0.95);
        Ok(result.pixels().iter().flat_map(|p| p.to_array()).collect())
    }

    /// Evaluate one light at every filled sample, one scanline per task.
    fn bake_light(&self, index: usize, light: &Light, samples: &SampleBuffer) -> LightBuffer {
        let size = self.layout.size;
        let per_texel = samples.samples();
        let mut buffer = LightBuffer::new(size, size, per_texel);
        let row_len = buffer.row_len();
        let evaluator = LightEvaluator::new(self.tracer, light, self.config);

        self.pool.install(|| {
            buffer
                .as_mut_slice()
                .par_chunks_mut(row_len)
                .enumerate()
                .for_each(|(y, row)| {
                    let mut rng = StdRng::seed_from_u64(scanline_seed(self.config.seed, self.id, index, y));
                    let mut rays = 0;
                    for x in 0..size {
                        for s in 0..per_texel {
                            let sample = samples.get(x, y as u32, s);
                            if !sample.filled {
                                continue;
                            }
                            let point = WorldPoint::on(self.geometry, self.mesh, sample.triangle, sample.barycentric);
                            row[x as usize * per_texel + s] = evaluator.evaluate(&point, &mut rng, &mut rays);
                        }
                    }
                    self.status.add_rays(rays);
                });
        });
        buffer
    }

    fn denoise<P: Pixel>(&self, image: &mut PixelBuffer<P>, area: f32) {
        match self.config.denoiser {
            DenoiserKind::None => {}
            DenoiserKind::Gaussian => {
                if let Some(blur) = GaussianBlur::new(area) {
                    self.per_chart(image, |tile| blur.apply(tile));
                }
            }
            DenoiserKind::Median => {
                if area > 0.0 {
                    let median = MedianDenoiser {
                        radius: area.ceil() as u32,
                        ..MedianDenoiser::default()
                    };
                    self.per_chart(image, |tile| median.apply(tile));
                }
            }
        }
    }

    /// Run `filter` on every chart footprint in parallel. Each chart works on
    /// its own copy, written back once all are done.
    fn per_chart<P: Pixel>(&self, image: &mut PixelBuffer<P>, filter: impl Fn(&mut PixelBuffer<P>) + Sync) {
        let source = &*image;
        let tiles: Vec<(Rect, PixelBuffer<P>)> = self.pool.install(|| {
            self.layout
                .quads
                .par_iter()
                .map(|quad| {
                    let rect = quad.rect();
                    let mut tile = source.crop(rect);
                    filter(&mut tile);
                    (rect, tile)
                })
                .collect()
        });
        for (rect, tile) in &tiles {
            image.paste(*rect, tile);
        }
    }
}

/// Average the filled samples of every texel. Fully lit shadow texels are
/// marked ignored so the denoiser leaves them alone.
fn resolve_terms(buffer: &LightBuffer, samples: &SampleBuffer) -> LightTerms {
    let (width, height) = (buffer.width(), buffer.height());
    let mut terms = LightTerms {
        direct: PixelBuffer::new(width, height),
        shadow: PixelBuffer::new(width, height),
        indirect: PixelBuffer::new(width, height),
    };

    for y in 0..height {
        for x in 0..width {
            let mut direct = Vec3::ZERO;
            let mut shadow = 0.0;
            let mut indirect = Vec3::ZERO;
            let mut filled = 0;
            for (light, sample) in buffer.texel(x, y).iter().zip(samples.texel(x, y)) {
                if sample.filled {
                    direct += light.direct;
                    shadow += light.shadow;
                    indirect += light.indirect;
                    filled += 1;
                }
            }
            if filled == 0 {
                continue;
            }
            let inv = 1.0 / filled as f32;
            terms.direct.fill(x, y, direct * inv);
            terms.shadow.fill(x, y, shadow * inv);
            terms.shadow.set_ignored(x, y, shadow * inv >= 1.0);
            terms.indirect.fill(x, y, indirect * inv);
        }
    }
    terms
}

/// `result += direct × shadow + indirect` over covered texels.
fn combine(result: &mut PixelBuffer<Vec3>, terms: &LightTerms) {
    for y in 0..result.height() {
        for x in 0..result.width() {
            if !terms.direct.is_valid(x, y) {
                continue;
            }
            let lit = terms.direct.get(x, y) * terms.shadow.get(x, y) + terms.indirect.get(x, y);
            result.fill(x, y, result.get(x, y) + lit);
        }
    }
}
