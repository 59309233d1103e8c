// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! File adapters used by the command-line baker: scene files, OBJ meshes,
//! albedo textures and lightmap images.

pub mod lightmap_writer;
pub mod obj_loader;
pub mod scene_file;
pub mod texture_loader;
