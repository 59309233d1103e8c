// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

/// Pipeline phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeStage {
    LoadTextures,
    ScheduleUvs,
    WaitUvs,
    WaitBvh,
    ComputeSampleBuffers,
    BakeLightmapTile,
    Denoise,
    Combine,
    GenerateMargins,
    Output,
    UploadTexture,
}

impl BakeStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::LoadTextures => "Loading textures",
            Self::ScheduleUvs => "Scheduling UV generation",
            Self::WaitUvs => "Generating lightmap UVs",
            Self::WaitBvh => "Building BVHs",
            Self::ComputeSampleBuffers => "Computing sample buffers",
            Self::BakeLightmapTile => "Baking light",
            Self::Denoise => "Denoising",
            Self::Combine => "Combining",
            Self::GenerateMargins => "Generating margins",
            Self::Output => "Writing output",
            Self::UploadTexture => "Uploading texture",
        }
    }

    /// Position in `ALL`.
    pub fn index(self) -> usize {
        self as usize
    }

    pub const ALL: &[Self] = &[
        Self::LoadTextures,
        Self::ScheduleUvs,
        Self::WaitUvs,
        Self::WaitBvh,
        Self::ComputeSampleBuffers,
        Self::BakeLightmapTile,
        Self::Denoise,
        Self::Combine,
        Self::GenerateMargins,
        Self::Output,
        Self::UploadTexture,
    ];
}

/// Progress record shared between the bake thread and pollers.
///
/// Best-effort: fields are updated independently, so a snapshot may mix
/// values from neighbouring moments.
#[derive(Debug)]
pub struct BakeStatus {
    percent_bits: AtomicU32,
    message: Mutex<String>,
    /// Index of the current stage plus one; 0 before the first stage.
    stage: AtomicU32,
    has_error: AtomicBool,
    rays: AtomicU64,
    memory_bytes: AtomicU64,
    started: Instant,
}

/// Point-in-time copy of a `BakeStatus`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub percent: f32,
    pub message: String,
    pub stage: Option<BakeStage>,
    pub has_error: bool,
    pub rays: u64,
    pub rays_per_second: f64,
    pub memory_bytes: u64,
}

impl Default for BakeStatus {
    fn default() -> Self {
        Self {
            percent_bits: AtomicU32::new(0),
            message: Mutex::new(String::from("Waiting")),
            stage: AtomicU32::new(0),
            has_error: AtomicBool::new(false),
            rays: AtomicU64::new(0),
            memory_bytes: AtomicU64::new(0),
            started: Instant::now(),
        }
    }
}

impl BakeStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_percent(&self, percent: f32) {
        let clamped = percent.clamp(0.0, 100.0);
        self.percent_bits.store(clamped.to_bits(), Ordering::Relaxed);
    }

    pub fn percent(&self) -> f32 {
        f32::from_bits(self.percent_bits.load(Ordering::Relaxed))
    }

    pub fn set_message(&self, message: impl Into<String>) {
        *self.message.lock() = message.into();
    }

    /// Enter a stage: sets percent and a "<label>: <detail>" message.
    pub fn enter(&self, stage: BakeStage, percent: f32, detail: &str) {
        self.set_percent(percent);
        self.stage.store(stage.index() as u32 + 1, Ordering::Relaxed);
        if detail.is_empty() {
            self.set_message(stage.label());
        } else {
            self.set_message(format!("{}: {detail}", stage.label()));
        }
    }

    pub fn add_rays(&self, count: u64) {
        self.rays.fetch_add(count, Ordering::Relaxed);
    }

    pub fn set_memory(&self, bytes: u64) {
        self.memory_bytes.store(bytes, Ordering::Relaxed);
    }

    /// Raise the error flag; the message becomes "Error: <message>".
    pub fn fail(&self, message: &str) {
        self.set_message(format!("Error: {message}"));
        self.has_error.store(true, Ordering::Release);
    }

    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::Acquire)
    }

    /// Last stage entered.
    pub fn stage(&self) -> Option<BakeStage> {
        let index = self.stage.load(Ordering::Relaxed) as usize;
        index.checked_sub(1).and_then(|i| BakeStage::ALL.get(i).copied())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let rays = self.rays.load(Ordering::Relaxed);
        let elapsed = self.started.elapsed().as_secs_f64();
        StatusSnapshot {
            percent: self.percent(),
            message: self.message.lock().clone(),
            stage: self.stage(),
            has_error: self.has_error(),
            rays,
            rays_per_second: if elapsed > 0.0 { rays as f64 / elapsed } else { 0.0 },
            memory_bytes: self.memory_bytes.load(Ordering::Relaxed),
        }
    }
}
