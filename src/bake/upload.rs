// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::mpsc::{Receiver, Sender, channel};

use crate::geometry::instance::GeometryId;

/// A finished lightmap ready to be handed to the renderer. Owns its buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCommand {
    pub geometry: GeometryId,
    pub width: u32,
    pub height: u32,
    /// Row-major RGB, three floats per texel.
    pub data: Vec<f32>,
}

impl UploadCommand {
    pub fn texel(&self, x: u32, y: u32) -> [f32; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// Receiving end of the upload channel, drained on the caller's thread.
#[derive(Debug)]
pub struct UploadQueue {
    rx: Receiver<UploadCommand>,
}

impl UploadQueue {
    pub fn channel() -> (Sender<UploadCommand>, Self) {
        let (tx, rx) = channel();
        (tx, Self { rx })
    }

    /// Run `apply` for every command received so far (non-blocking).
    /// Returns how many were applied.
    pub fn apply_pending(&self, mut apply: impl FnMut(UploadCommand)) -> usize {
        let mut count = 0;
        while let Ok(command) = self.rx.try_recv() {
            apply(command);
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_pending_drains_in_order() {
        let (tx, queue) = UploadQueue::channel();
        for geometry in 0..3 {
            tx.send(UploadCommand {
                geometry,
                width: 1,
                height: 1,
                data: vec![geometry as f32; 3],
            })
            .unwrap();
        }

        let mut seen = Vec::new();
        assert_eq!(queue.apply_pending(|cmd| seen.push(cmd.geometry)), 3);
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(queue.apply_pending(|_| panic!("queue should be empty")), 0);
    }
}
