// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::Vec3;

use crate::uvgen::rect_tree::Rect;

/// Value type the filters can blend.
pub trait Pixel: Copy + Send + Sync + PartialEq + std::fmt::Debug {
    const ZERO: Self;
    fn add(self, other: Self) -> Self;
    fn scale(self, s: f32) -> Self;
    fn luminance(self) -> f32;
}

impl Pixel for f32 {
    const ZERO: Self = 0.0;

    fn add(self, other: Self) -> Self {
        self + other
    }

    fn scale(self, s: f32) -> Self {
        self * s
    }

    fn luminance(self) -> f32 {
        self
    }
}

impl Pixel for Vec3 {
    const ZERO: Self = Vec3::ZERO;

    fn add(self, other: Self) -> Self {
        self + other
    }

    fn scale(self, s: f32) -> Self {
        self * s
    }

    fn luminance(self) -> f32 {
        self.dot(Vec3::new(0.2126, 0.7152, 0.0722))
    }
}

/// Read/write access to a 2D image with coverage and ignore masks.
///
/// Invalid pixels (outside any chart) are never read by a filter. Ignored
/// pixels keep their value and do not contribute to their neighbours.
pub trait PixelAccess {
    type Pixel: Pixel;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn get(&self, x: u32, y: u32) -> Self::Pixel;
    fn set(&mut self, x: u32, y: u32, value: Self::Pixel);
    fn is_valid(&self, x: u32, y: u32) -> bool;

    fn is_ignored(&self, _x: u32, _y: u32) -> bool {
        false
    }

    /// Valid and not ignored.
    fn is_filterable(&self, x: u32, y: u32) -> bool {
        self.is_valid(x, y) && !self.is_ignored(x, y)
    }
}

/// Dense row-major image with per-pixel masks.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer<P> {
    width: u32,
    height: u32,
    pixels: Vec<P>,
    valid: Vec<bool>,
    ignored: Vec<bool>,
}

impl<P: Pixel> PixelBuffer<P> {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![P::ZERO; len],
            valid: vec![false; len],
            ignored: vec![false; len],
        }
    }

    /// Image where every pixel is valid.
    pub fn filled(width: u32, height: u32, value: P) -> Self {
        let mut buffer = Self::new(width, height);
        buffer.pixels.fill(value);
        buffer.valid.fill(true);
        buffer
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Write a value and mark the pixel valid.
    pub fn fill(&mut self, x: u32, y: u32, value: P) {
        let i = self.index(x, y);
        self.pixels[i] = value;
        self.valid[i] = true;
    }

    pub fn set_ignored(&mut self, x: u32, y: u32, ignored: bool) {
        let i = self.index(x, y);
        self.ignored[i] = ignored;
    }

    /// Copy of a sub-rectangle, masks included.
    pub fn crop(&self, region: Rect) -> Self {
        let mut out = Self::new(region.width, region.height);
        for y in 0..region.height {
            let src = self.index(region.x, region.y + y);
            let dst = out.index(0, y);
            let n = region.width as usize;
            out.pixels[dst..dst + n].copy_from_slice(&self.pixels[src..src + n]);
            out.valid[dst..dst + n].copy_from_slice(&self.valid[src..src + n]);
            out.ignored[dst..dst + n].copy_from_slice(&self.ignored[src..src + n]);
        }
        out
    }

    /// Write `tile` back at the origin of `region`.
    pub fn paste(&mut self, region: Rect, tile: &Self) {
        for y in 0..region.height.min(tile.height) {
            let src = tile.index(0, y);
            let dst = self.index(region.x, region.y + y);
            let n = region.width.min(tile.width) as usize;
            self.pixels[dst..dst + n].copy_from_slice(&tile.pixels[src..src + n]);
            self.valid[dst..dst + n].copy_from_slice(&tile.valid[src..src + n]);
            self.ignored[dst..dst + n].copy_from_slice(&tile.ignored[src..src + n]);
        }
    }

    pub fn memory_bytes(&self) -> u64 {
        (self.pixels.len() * (std::mem::size_of::<P>() + 2)) as u64
    }
}

impl<P: Pixel> PixelAccess for PixelBuffer<P> {
    type Pixel = P;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn get(&self, x: u32, y: u32) -> P {
        self.pixels[self.index(x, y)]
    }

    fn set(&mut self, x: u32, y: u32, value: P) {
        let i = self.index(x, y);
        self.pixels[i] = value;
    }

    fn is_valid(&self, x: u32, y: u32) -> bool {
        self.valid[self.index(x, y)]
    }

    fn is_ignored(&self, x: u32, y: u32) -> bool {
        self.ignored[self.index(x, y)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_and_paste_round_trip_region() {
        let mut image = PixelBuffer::<f32>::new(6, 5);
        image.fill(2, 1, 3.0);
        image.fill(4, 3, 7.0);
        image.set_ignored(4, 3, true);

        let region = Rect::new(2, 1, 3, 3);
        let mut tile = image.crop(region);
        assert_eq!(tile.get(0, 0), 3.0);
        assert!(tile.is_ignored(2, 2));
        assert!(!tile.is_valid(1, 1));

        tile.set(0, 0, 9.0);
        image.paste(region, &tile);
        assert_eq!(image.get(2, 1), 9.0);
        assert_eq!(image.get(4, 3), 7.0);
        assert_eq!(image.valid_count(), 2);
    }
}
