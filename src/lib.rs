// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Offline lightmap baker.
//!
//! Meshes are unwrapped into per-mesh lightmap atlases, every texel is sampled
//! against the scene's lights with BVH-accelerated rays, and the denoised,
//! margin-dilated result is handed back as a float RGB buffer per geometry.

pub mod accel;
pub mod bake;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod io;
pub mod post;
pub mod sampling;
pub mod scene;
pub mod uvgen;

pub use bake::{BakeTask, UploadCommand, UploadQueue};
pub use error::{BakeError, Result};
pub use scene::scene::Scene;
