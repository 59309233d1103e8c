// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod config;
pub mod light;
#[allow(clippy::module_inception)]
pub mod scene;
