// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use super::pixels::{Pixel, PixelAccess};

/// Median filter by luminance with optional similarity-weighted re-averaging.
///
/// After the median pass, each pixel may be replaced by a weighted mean of its
/// neighbourhood where weights fall off with distance (Gaussian, `spatial_sigma`)
/// and with luminance difference from the median (Gaussian, `similarity`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedianDenoiser {
    pub radius: u32,
    pub similarity: Option<f32>,
    pub spatial_sigma: f32,
}

impl Default for MedianDenoiser {
    fn default() -> Self {
        Self {
            radius: 1,
            similarity: Some(0.1),
            spatial_sigma: 1.0,
        }
    }
}

impl MedianDenoiser {
    pub fn apply<A: PixelAccess>(&self, image: &mut A) {
        let (width, height) = (image.width(), image.height());
        let mut out = Vec::with_capacity(width as usize * height as usize);
        let mut window: Vec<(i32, i32, A::Pixel)> = Vec::new();

        for y in 0..height {
            for x in 0..width {
                if !image.is_filterable(x, y) {
                    out.push(None);
                    continue;
                }
                self.gather(image, x, y, &mut window);
                window.sort_by(|a, b| a.2.luminance().total_cmp(&b.2.luminance()));
                let median = window[window.len() / 2].2;

                let value = match self.similarity {
                    Some(sigma) if sigma > 0.0 => self.reaverage(&window, median, sigma),
                    _ => median,
                };
                out.push(Some(value));
            }
        }

        for (i, value) in out.into_iter().enumerate() {
            if let Some(value) = value {
                image.set(i as u32 % width, i as u32 / width, value);
            }
        }
    }

    /// Filterable neighbours as (dx, dy, value); always contains the centre.
    fn gather<A: PixelAccess>(&self, image: &A, x: u32, y: u32, window: &mut Vec<(i32, i32, A::Pixel)>) {
        window.clear();
        let r = self.radius as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                let nx = x as i64 + dx as i64;
                let ny = y as i64 + dy as i64;
                if nx < 0 || ny < 0 || nx >= image.width() as i64 || ny >= image.height() as i64 {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                if image.is_filterable(nx, ny) {
                    window.push((dx, dy, image.get(nx, ny)));
                }
            }
        }
    }

    fn reaverage<P: Pixel>(&self, window: &[(i32, i32, P)], median: P, sigma: f32) -> P {
        let two_spatial = 2.0 * self.spatial_sigma.max(1e-3).powi(2);
        let two_range = 2.0 * sigma * sigma;
        let target = median.luminance();

        let mut sum = P::ZERO;
        let mut weight = 0.0;
        for &(dx, dy, value) in window {
            let d2 = (dx * dx + dy * dy) as f32;
            let diff = value.luminance() - target;
            let w = (-d2 / two_spatial).exp() * (-(diff * diff) / two_range).exp();
            sum = sum.add(value.scale(w));
            weight += w;
        }
        if weight > 0.0 { sum.scale(1.0 / weight) } else { median }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::pixels::PixelBuffer;

    #[test]
    fn test_removes_isolated_spike() {
        let mut image = PixelBuffer::filled(5, 5, 0.2f32);
        image.set(2, 2, 50.0);
        MedianDenoiser {
            similarity: None,
            ..MedianDenoiser::default()
        }
        .apply(&mut image);
        assert_eq!(image.get(2, 2), 0.2);
    }

    #[test]
    fn test_similarity_pass_preserves_edges() {
        let mut image = PixelBuffer::filled(6, 3, 0.0f32);
        for y in 0..3 {
            for x in 3..6 {
                image.set(x, y, 1.0);
            }
        }
        MedianDenoiser::default().apply(&mut image);
        assert!(image.get(2, 1) < 0.01);
        assert!(image.get(3, 1) > 0.99);
    }
}
