// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Lightmap baking: sample buffers, per-light ray evaluation, denoising,
//! combination, margins and hand-off of the finished textures.

pub mod buffers;
pub mod lighting;
pub mod pipeline;
pub mod rasterize;
pub mod status;
pub mod task;
pub mod upload;

pub use status::{BakeStage, BakeStatus, StatusSnapshot};
pub use task::BakeTask;
pub use upload::{UploadCommand, UploadQueue};
