// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use super::pixels::{Pixel, PixelAccess, PixelBuffer};
use crate::constants::MARGIN_ITERATION_FACTOR;

/// Iteration budget for a chart footprint of the given size and margin.
pub fn margin_budget(width: u32, height: u32, margin: u32) -> u32 {
    width.max(height).max(margin * MARGIN_ITERATION_FACTOR)
}

const ORTHOGONAL: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

/// Dilate filled texels into empty ones. Each synchronous step gives every
/// empty texel the average of its filled 4-neighbours, or of its filled
/// diagonal neighbours when none is orthogonal. Returns the number of steps
/// that changed something.
pub fn dilate<P: Pixel>(image: &mut PixelBuffer<P>, max_iterations: u32) -> u32 {
    let (width, height) = (image.width(), image.height());
    let mut steps = 0;

    while steps < max_iterations {
        let mut updates = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if image.is_valid(x, y) {
                    continue;
                }
                let value = average_of(image, x, y, &ORTHOGONAL)
                    .or_else(|| average_of(image, x, y, &DIAGONAL));
                if let Some(value) = value {
                    updates.push((x, y, value));
                }
            }
        }
        if updates.is_empty() {
            break;
        }
        for (x, y, value) in updates {
            image.fill(x, y, value);
        }
        steps += 1;
    }
    steps
}

fn average_of<P: Pixel>(image: &PixelBuffer<P>, x: u32, y: u32, offsets: &[(i32, i32)]) -> Option<P> {
    let mut sum = P::ZERO;
    let mut count = 0;
    for &(dx, dy) in offsets {
        let nx = x as i64 + dx as i64;
        let ny = y as i64 + dy as i64;
        if nx < 0 || ny < 0 || nx >= image.width() as i64 || ny >= image.height() as i64 {
            continue;
        }
        let (nx, ny) = (nx as u32, ny as u32);
        if image.is_valid(nx, ny) {
            sum = sum.add(image.get(nx, ny));
            count += 1;
        }
    }
    (count > 0).then(|| sum.scale(1.0 / count as f32))
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_converges_to_full_coverage() {
        let mut image = PixelBuffer::<Vec3>::new(8, 6);
        image.fill(3, 2, Vec3::ONE);
        image.fill(4, 2, Vec3::new(0.0, 1.0, 0.0));
        let steps = dilate(&mut image, margin_budget(8, 6, 2));
        assert!(steps > 0);
        assert_eq!(image.valid_count(), 48);
        for p in image.pixels() {
            assert!(p.y == 1.0 && p.x >= 0.0 && p.x <= 1.0);
        }
    }

    #[test]
    fn test_diagonal_fallback() {
        let mut image = PixelBuffer::<f32>::new(2, 2);
        image.fill(0, 0, 4.0);
        image.fill(1, 1, 2.0);
        dilate(&mut image, 1);
        assert_eq!(image.get(1, 0), 3.0);

        let mut corner = PixelBuffer::<f32>::new(3, 3);
        corner.fill(1, 1, 5.0);
        dilate(&mut corner, 1);
        // Corners only see the centre diagonally, edges see it orthogonally.
        assert_eq!(corner.get(0, 0), 5.0);
        assert_eq!(corner.valid_count(), 9);
    }

    #[test]
    fn test_budget_stops_early() {
        let mut image = PixelBuffer::<f32>::new(16, 1);
        image.fill(0, 0, 1.0);
        assert_eq!(dilate(&mut image, 3), 3);
        assert_eq!(image.valid_count(), 4);
    }

    #[test]
    fn test_budget_respects_margin() {
        assert_eq!(margin_budget(4, 3, 2), 8);
        assert_eq!(margin_budget(20, 3, 2), 20);
    }

    #[test]
    fn test_empty_image_is_fixed_point() {
        let mut image = PixelBuffer::<f32>::new(4, 4);
        assert_eq!(dilate(&mut image, 10), 0);
    }
}
