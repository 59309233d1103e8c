// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

/// Integer rectangle in texel units, half-open: `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn top(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }

    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.top().max(other.top()) - y,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RectNodeKind {
    Internal { left: u32, right: u32 },
    Leaf,
}

#[derive(Debug, Clone, Copy)]
struct RectNode {
    bounds: Rect,
    kind: RectNodeKind,
}

/// Overlap index for placed rectangles. Recent insertions sit in a linear
/// pending list; once `batch` of them accumulate the whole set is rebuilt into
/// a binary merge tree so queries prune by subtree bounds.
#[derive(Debug, Clone)]
pub struct RectTree {
    rects: Vec<Rect>,
    nodes: Vec<RectNode>,
    root: Option<u32>,
    indexed: usize,
    batch: usize,
}

impl RectTree {
    pub fn new(batch: usize) -> Self {
        Self {
            rects: Vec::new(),
            nodes: Vec::new(),
            root: None,
            indexed: 0,
            batch: batch.max(1),
        }
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_indexed(&self) -> bool {
        self.root.is_some()
    }

    pub fn insert(&mut self, rect: Rect) {
        self.rects.push(rect);
        if self.rects.len() - self.indexed >= self.batch {
            self.rebuild();
        }
    }

    /// True if `rect` overlaps any stored rectangle.
    pub fn overlaps(&self, rect: &Rect) -> bool {
        if self.rects[self.indexed..].iter().any(|r| r.overlaps(rect)) {
            return true;
        }
        let Some(root) = self.root else {
            return false;
        };
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if !node.bounds.overlaps(rect) {
                continue;
            }
            match node.kind {
                RectNodeKind::Leaf => return true,
                RectNodeKind::Internal { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        false
    }

    fn rebuild(&mut self) {
        self.nodes.clear();
        let mut order: Vec<u32> = (0..self.rects.len() as u32).collect();
        order.sort_by_key(|&i| {
            let r = &self.rects[i as usize];
            (r.x + r.width / 2, r.y + r.height / 2)
        });

        let mut level: Vec<u32> = order
            .into_iter()
            .map(|rect| {
                self.nodes.push(RectNode {
                    bounds: self.rects[rect as usize],
                    kind: RectNodeKind::Leaf,
                });
                self.nodes.len() as u32 - 1
            })
            .collect();

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len() / 2 + 1);
            for pair in level.chunks(2) {
                if let [left, right] = *pair {
                    let bounds = self.nodes[left as usize]
                        .bounds
                        .union(&self.nodes[right as usize].bounds);
                    self.nodes.push(RectNode {
                        bounds,
                        kind: RectNodeKind::Internal { left, right },
                    });
                    next.push(self.nodes.len() as u32 - 1);
                } else {
                    next.push(pair[0]);
                }
            }
            level = next;
        }

        self.root = level.first().copied();
        self.indexed = self.rects.len();
    }
}
