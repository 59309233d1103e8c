// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error types for the baking core.

use thiserror::Error;

/// Fatal conditions that abort an unwrap or a bake.
///
/// Degenerate samples (zero-area triangles, non-finite barycentrics) are not
/// represented here: the rasterizer skips them and carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BakeError {
    /// Raw mesh buffers do not describe a valid triangle list.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A geometry instance points at a mesh that is not in the scene.
    #[error("Geometry references missing mesh {0}")]
    MissingMesh(usize),

    /// The packer found no attachment point for a chart.
    #[error("Lightmap packing exhausted: no placement for chart {chart} ({width}x{height} texels)")]
    PackingExhausted {
        chart: usize,
        width: u32,
        height: u32,
    },

    /// A mesh reached the sample pass without lightmap UVs.
    #[error("Mesh {0} has no lightmap layout")]
    MissingLayout(usize),

    /// A parallel task failed; the whole bake is aborted.
    #[error("Worker failure: {0}")]
    WorkerFailure(String),
}

pub type Result<T> = std::result::Result<T, BakeError>;
