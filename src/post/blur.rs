// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use super::pixels::{Pixel, PixelAccess};

/// Separable Gaussian filter honouring coverage and ignore masks.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianBlur {
    radius: u32,
    kernel: Vec<f32>,
}

impl GaussianBlur {
    /// Kernel for a blur "area" (sigma in texels). Returns `None` when the area
    /// is too small to have any effect.
    pub fn new(area: f32) -> Option<Self> {
        if !area.is_finite() || area <= 0.0 {
            return None;
        }
        let radius = (area * 2.0).ceil().max(1.0) as u32;
        Some(Self::with_radius(radius, area))
    }

    pub fn with_radius(radius: u32, sigma: f32) -> Self {
        let two_sigma2 = 2.0 * sigma * sigma;
        let kernel = (0..=radius)
            .map(|d| (-((d * d) as f32) / two_sigma2).exp())
            .collect();
        Self { radius, kernel }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Horizontal pass, then vertical pass.
    pub fn apply<A: PixelAccess>(&self, image: &mut A) {
        self.pass(image, true);
        self.pass(image, false);
    }

    fn pass<A: PixelAccess>(&self, image: &mut A, horizontal: bool) {
        let (width, height) = (image.width(), image.height());
        let r = self.radius as i64;
        let mut out = Vec::with_capacity(width as usize * height as usize);

        for y in 0..height {
            for x in 0..width {
                if !image.is_filterable(x, y) {
                    out.push(None);
                    continue;
                }
                let mut sum = A::Pixel::ZERO;
                let mut weight = 0.0;
                for k in -r..=r {
                    let (nx, ny) = if horizontal {
                        (x as i64 + k, y as i64)
                    } else {
                        (x as i64, y as i64 + k)
                    };
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let (nx, ny) = (nx as u32, ny as u32);
                    if !image.is_filterable(nx, ny) {
                        continue;
                    }
                    let w = self.kernel[k.unsigned_abs() as usize];
                    sum = sum.add(image.get(nx, ny).scale(w));
                    weight += w;
                }
                out.push(Some(sum.scale(1.0 / weight)));
            }
        }

        for (i, value) in out.into_iter().enumerate() {
            if let Some(value) = value {
                image.set(i as u32 % width, i as u32 / width, value);
            }
        }
    }
}
