// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::Vec3;

/// Where one sample of one texel lands on the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexelSample {
    pub filled: bool,
    pub triangle: u32,
    pub barycentric: Vec3,
}

/// Lighting terms of one sample for one light.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightSample {
    pub direct: Vec3,
    /// Fraction of shadow rays that reached the light.
    pub shadow: f32,
    pub indirect: Vec3,
}

/// Dense (x, y, sample) array, rows contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid<T> {
    width: u32,
    height: u32,
    samples: usize,
    data: Vec<T>,
}

pub type SampleBuffer = SampleGrid<TexelSample>;
pub type LightBuffer = SampleGrid<LightSample>;

impl<T: Copy + Default> SampleGrid<T> {
    pub fn new(width: u32, height: u32, samples: usize) -> Self {
        Self {
            width,
            height,
            samples,
            data: vec![T::default(); width as usize * height as usize * samples],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    fn index(&self, x: u32, y: u32, sample: usize) -> usize {
        (y as usize * self.width as usize + x as usize) * self.samples + sample
    }

    pub fn get(&self, x: u32, y: u32, sample: usize) -> &T {
        &self.data[self.index(x, y, sample)]
    }

    pub fn get_mut(&mut self, x: u32, y: u32, sample: usize) -> &mut T {
        let i = self.index(x, y, sample);
        &mut self.data[i]
    }

    /// All samples of one texel.
    pub fn texel(&self, x: u32, y: u32) -> &[T] {
        let start = self.index(x, y, 0);
        &self.data[start..start + self.samples]
    }

    /// Number of values in one row (`width * samples`).
    pub fn row_len(&self) -> usize {
        self.width as usize * self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn memory_bytes(&self) -> u64 {
        (self.data.len() * std::mem::size_of::<T>()) as u64
    }
}

impl SampleBuffer {
    pub fn is_covered(&self, x: u32, y: u32) -> bool {
        self.texel(x, y).iter().any(|s| s.filled)
    }

    pub fn filled_count(&self) -> usize {
        self.data.iter().filter(|s| s.filled).count()
    }
}
