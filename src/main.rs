// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use lightbaker::bake::{BakeTask, UploadCommand, UploadQueue};
use lightbaker::constants::PROGRESS_POLL_MS;
use lightbaker::io::lightmap_writer::{LightmapFormat, lightmap_path, write_lightmap};
use lightbaker::io::scene_file::load_scene;

struct Output<'a> {
    dir: &'a Path,
    format: LightmapFormat,
    names: Vec<String>,
    written: usize,
}

impl Output<'_> {
    fn drain(&mut self, queue: &UploadQueue) -> Result<()> {
        let mut ready: Vec<UploadCommand> = Vec::new();
        queue.apply_pending(|command| ready.push(command));
        for command in &ready {
            let name = self
                .names
                .get(command.geometry)
                .map_or("lightmap", String::as_str);
            write_lightmap(command, &lightmap_path(self.dir, name, self.format), self.format)?;
            self.written += 1;
        }
        Ok(())
    }
}

/// Geometry names made unique so no two lightmaps share a file.
fn unique_names(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .enumerate()
        .map(|(i, name)| {
            if seen.insert(name.clone()) {
                name
            } else {
                format!("{name}_{i}")
            }
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        bail!("Usage: lightbaker <scene.yaml|scene.json>");
    };
    let loaded = load_scene(Path::new(&path))?;
    let mut output = Output {
        dir: &loaded.output_dir,
        format: loaded.output_format,
        names: unique_names(loaded.scene.geometries.iter().map(|g| g.name.clone())),
        written: 0,
    };

    let (tx, queue) = UploadQueue::channel();
    let task = BakeTask::spawn(loaded.scene, tx);
    let mut last_message = String::new();

    loop {
        let finished = task.is_finished();
        output.drain(&queue)?;

        let status = task.status().snapshot();
        if status.message != last_message {
            log::info!(
                "[{:5.1}%] {} ({:.0} rays/s, {:.1} MiB)",
                status.percent,
                status.message,
                status.rays_per_second,
                status.memory_bytes as f64 / (1024.0 * 1024.0)
            );
            last_message = status.message;
        }
        if finished {
            break;
        }
        thread::sleep(Duration::from_millis(PROGRESS_POLL_MS));
    }

    task.join().context("Bake failed")?;
    output.drain(&queue)?;
    log::info!("Wrote {} lightmaps to {}", output.written, output.dir.display());
    Ok(())
}
