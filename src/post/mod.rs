// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Image filters run on the baked atlas: denoising and margin dilation.

pub mod blur;
pub mod margin;
pub mod median;
pub mod pixels;
