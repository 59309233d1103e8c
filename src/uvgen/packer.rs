// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use super::rect_tree::{Rect, RectTree};
use crate::constants::PACKER_INDEX_BATCH;
use crate::error::{BakeError, Result};

/// Where one chart ended up in the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub chart: usize,
    pub rect: Rect,
    /// Chart turned by 90°, `rect` holds the swapped size.
    pub rotated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointSet {
    Top,
    Right,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: (u32, u64),
    rect: Rect,
    rotated: bool,
    set: PointSet,
    point: usize,
}

/// Pack chart rectangles `(width, height)` into one atlas.
///
/// Charts go in order of decreasing area. Each placed rectangle offers an
/// attachment point on its top edge and one on its right edge; every later
/// chart tries all free points (and optionally a 90° turn) and keeps the
/// overlap-free placement whose atlas bounds have the smallest side, then the
/// smallest area. Returns the placements in chart order and the atlas bounds.
pub fn pack_charts(sizes: &[(u32, u32)], allow_rotation: bool) -> Result<(Vec<Placement>, (u32, u32))> {
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(u64::from(sizes[i].0) * u64::from(sizes[i].1)));

    let mut placements: Vec<Option<Placement>> = vec![None; sizes.len()];
    let mut tree = RectTree::new(PACKER_INDEX_BATCH);
    let mut top_points: Vec<(u32, u32)> = Vec::new();
    let mut right_points: Vec<(u32, u32)> = Vec::new();
    let mut bounds = (0u32, 0u32);

    for (n, &chart) in order.iter().enumerate() {
        let (w, h) = sizes[chart];

        let placement = if n == 0 {
            Placement {
                chart,
                rect: Rect::new(0, 0, w, h),
                rotated: false,
            }
        } else {
            let mut best: Option<Candidate> = None;
            for (set, points) in [(PointSet::Top, &top_points), (PointSet::Right, &right_points)] {
                for (point, &(px, py)) in points.iter().enumerate() {
                    for rotated in [false, true] {
                        if rotated && (!allow_rotation || w == h) {
                            continue;
                        }
                        let (rw, rh) = if rotated { (h, w) } else { (w, h) };
                        let rect = Rect::new(px, py, rw, rh);
                        let bw = bounds.0.max(rect.right());
                        let bh = bounds.1.max(rect.top());
                        let score = (bw.max(bh), u64::from(bw) * u64::from(bh));
                        if best.is_some_and(|b| b.score <= score) || tree.overlaps(&rect) {
                            continue;
                        }
                        best = Some(Candidate {
                            score,
                            rect,
                            rotated,
                            set,
                            point,
                        });
                    }
                }
            }

            let Some(best) = best else {
                return Err(BakeError::PackingExhausted {
                    chart,
                    width: w,
                    height: h,
                });
            };
            match best.set {
                PointSet::Top => top_points.swap_remove(best.point),
                PointSet::Right => right_points.swap_remove(best.point),
            };
            Placement {
                chart,
                rect: best.rect,
                rotated: best.rotated,
            }
        };

        let rect = placement.rect;
        tree.insert(rect);
        top_points.push((rect.x, rect.top()));
        right_points.push((rect.right(), rect.y));
        bounds = (bounds.0.max(rect.right()), bounds.1.max(rect.top()));
        placements[chart] = Some(placement);
    }

    let placements: Vec<Placement> = placements.into_iter().flatten().collect();
    log::debug!(
        "Packed {} charts into {}x{} texels",
        placements.len(),
        bounds.0,
        bounds.1
    );
    Ok((placements, bounds))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn assert_valid(placements: &[Placement], sizes: &[(u32, u32)], bounds: (u32, u32)) {
        assert_eq!(placements.len(), sizes.len());
        for (i, p) in placements.iter().enumerate() {
            assert_eq!(p.chart, i);
            let (w, h) = sizes[i];
            let expected = if p.rotated { (h, w) } else { (w, h) };
            assert_eq!((p.rect.width, p.rect.height), expected);
            assert!(p.rect.right() <= bounds.0 && p.rect.top() <= bounds.1);
            for q in &placements[i + 1..] {
                assert!(!p.rect.overlaps(&q.rect), "{:?} overlaps {:?}", p.rect, q.rect);
            }
        }
    }

    #[test]
    fn test_single_chart_at_origin() {
        let (placements, bounds) = pack_charts(&[(5, 4)], true).unwrap();
        assert_eq!(placements[0].rect, Rect::new(0, 0, 5, 4));
        assert_eq!(bounds, (5, 4));
    }

    #[test]
    fn test_random_charts_never_overlap() {
        let mut rng = StdRng::seed_from_u64(11);
        for round in 0..6 {
            let count = 10 + round * 25;
            let sizes: Vec<(u32, u32)> = (0..count)
                .map(|_| (rng.random_range(1..40), rng.random_range(1..40)))
                .collect();
            let (placements, bounds) = pack_charts(&sizes, round % 2 == 0).unwrap();
            assert_valid(&placements, &sizes, bounds);
        }
    }

    #[test]
    fn test_equal_squares_pack_tightly() {
        let sizes = vec![(4, 4); 4];
        let (placements, bounds) = pack_charts(&sizes, true).unwrap();
        assert_valid(&placements, &sizes, bounds);
        assert_eq!(bounds, (8, 8));
    }
}
