// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod instance;
pub mod mesh;
pub mod texture;
pub mod transform;
