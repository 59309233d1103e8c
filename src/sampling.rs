// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::sync::LazyLock;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Sub-texel sample offsets, keyed by pattern name ("x1", "x3", ...).
static PATTERNS: LazyLock<HashMap<String, Vec<[f32; 2]>>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../resources/sample_patterns.json"))
        .expect("bundled sample_patterns.json is valid")
});

/// Number of samples evaluated per lightmap texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    X1,
    X3,
    #[default]
    X4,
    X5,
    X7,
    X8,
    X9,
    X11,
    X12,
    X13,
    X15,
    X16,
}

impl SamplingMode {
    pub const ALL: &[Self] = &[
        Self::X1,
        Self::X3,
        Self::X4,
        Self::X5,
        Self::X7,
        Self::X8,
        Self::X9,
        Self::X11,
        Self::X12,
        Self::X13,
        Self::X15,
        Self::X16,
    ];

    pub fn sample_count(self) -> usize {
        match self {
            Self::X1 => 1,
            Self::X3 => 3,
            Self::X4 => 4,
            Self::X5 => 5,
            Self::X7 => 7,
            Self::X8 => 8,
            Self::X9 => 9,
            Self::X11 => 11,
            Self::X12 => 12,
            Self::X13 => 13,
            Self::X15 => 15,
            Self::X16 => 16,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::X1 => "1x",
            Self::X3 => "3x",
            Self::X4 => "4x",
            Self::X5 => "5x",
            Self::X7 => "7x",
            Self::X8 => "8x",
            Self::X9 => "9x",
            Self::X11 => "11x",
            Self::X12 => "12x",
            Self::X13 => "13x",
            Self::X15 => "15x",
            Self::X16 => "16x",
        }
    }

    /// Offsets in [0, 1)² inside a texel.
    pub fn offsets(self) -> Vec<Vec2> {
        PATTERNS
            .get(&format!("x{}", self.sample_count()))
            .map(|pts| pts.iter().map(|&p| Vec2::from(p)).collect())
            .unwrap_or_else(|| vec![Vec2::splat(0.5)])
    }
}
