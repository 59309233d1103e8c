// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use super::pipeline::bake_scene;
use super::status::BakeStatus;
use super::upload::UploadCommand;
use crate::error::{BakeError, Result};
use crate::scene::scene::Scene;

/// Handle to a bake running on its own thread.
///
/// The scene moves into the task and comes back from `join` with its lightmap
/// UVs written. Progress is polled through `status`.
pub struct BakeTask {
    status: Arc<BakeStatus>,
    handle: Option<JoinHandle<Result<Scene>>>,
}

impl BakeTask {
    pub fn spawn(scene: Scene, uploads: Sender<UploadCommand>) -> Self {
        let status = Arc::new(BakeStatus::new());
        let worker_status = Arc::clone(&status);

        let handle = thread::Builder::new()
            .name("lightbaker-bake".into())
            .spawn(move || run(scene, &worker_status, &uploads));

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to spawn bake thread: {e}");
                status.fail(&e.to_string());
                None
            }
        };
        Self { status, handle }
    }

    pub fn status(&self) -> &Arc<BakeStatus> {
        &self.status
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub fn has_error(&self) -> bool {
        self.status.has_error()
    }

    /// Wait for the bake. Worker panics come back as `WorkerFailure`.
    pub fn join(mut self) -> Result<Scene> {
        let Some(handle) = self.handle.take() else {
            return Err(BakeError::WorkerFailure("bake thread was never started".into()));
        };
        match handle.join() {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.status.fail(&message);
                Err(BakeError::WorkerFailure(message))
            }
        }
    }
}

/// Runs on the bake thread. Errors and worker panics both land on `status`
/// before the thread exits.
fn run(mut scene: Scene, status: &BakeStatus, uploads: &Sender<UploadCommand>) -> Result<Scene> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| bake_scene(&mut scene, status, uploads)))
        .unwrap_or_else(|payload| Err(BakeError::WorkerFailure(panic_message(payload.as_ref()))));
    match outcome {
        Ok(()) => Ok(scene),
        Err(e) => {
            log::error!("Bake failed: {e}");
            status.fail(&e.to_string());
            Err(e)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::bake::lighting::tests::floor_mesh;
    use crate::bake::upload::UploadQueue;
    use crate::geometry::instance::Geometry;
    use crate::geometry::texture::AlbedoTexture;
    use crate::geometry::transform::GeometryTransform;
    use crate::scene::config::BakeConfig;
    use crate::scene::light::{DirectionalLight, Light, PointLight};

    #[derive(Debug)]
    struct CorruptTexture;

    impl AlbedoTexture for CorruptTexture {
        fn size(&self) -> (u32, u32) {
            (4, 4)
        }

        fn fetch(&self, _x: u32, _y: u32) -> [f32; 4] {
            panic!("corrupt texel");
        }
    }

    #[test]
    fn test_task_returns_scene_with_uvs() {
        let mut scene = Scene::new(BakeConfig {
            texels_per_unit: 2.0,
            indirect_rays_per_sample: 1,
            shadow_rays_per_sample: 1,
            threads: 1,
            ..BakeConfig::default()
        });
        let mesh = scene.add_mesh(floor_mesh(1.0));
        scene.add_geometry(Geometry::new("floor", mesh, GeometryTransform::default()));
        scene.add_light(Light::Point(PointLight {
            position: Vec3::new(0.0, 2.0, 0.0).into(),
            ..serde_json::from_str("{}").unwrap()
        }));

        let (tx, queue) = UploadQueue::channel();
        let task = BakeTask::spawn(scene, tx);
        let status = Arc::clone(task.status());
        let scene = task.join().unwrap();

        assert!(scene.meshes[mesh].layout().is_some());
        assert!(!status.has_error());
        assert!(status.snapshot().rays > 0);

        let mut uploads = Vec::new();
        queue.apply_pending(|cmd| uploads.push(cmd.geometry));
        assert_eq!(uploads, vec![0]);
    }

    #[test]
    fn test_failure_is_reported() {
        let mut scene = Scene::default();
        scene.add_geometry(Geometry::new("ghost", 3, GeometryTransform::default()));
        let (tx, queue) = UploadQueue::channel();
        let task = BakeTask::spawn(scene, tx);
        let status = Arc::clone(task.status());

        assert_eq!(task.join().unwrap_err(), BakeError::MissingMesh(3));
        assert!(status.has_error());
        assert!(status.snapshot().message.starts_with("Error: "));
        assert_eq!(queue.apply_pending(|_| {}), 0);
    }

    #[test]
    fn test_worker_panic_reaches_status_before_join() {
        let mut scene = Scene::new(BakeConfig {
            texels_per_unit: 2.0,
            indirect_rays_per_sample: 4,
            threads: 2,
            ..BakeConfig::default()
        });
        let mesh = scene.add_mesh(floor_mesh(1.0));
        let texture: Arc<dyn AlbedoTexture> = Arc::new(CorruptTexture);
        scene.add_geometry(Geometry::new("low", mesh, GeometryTransform::default()).with_texture(Arc::clone(&texture)));
        scene.add_geometry(
            Geometry::new(
                "high",
                mesh,
                GeometryTransform::from_position_rotation_scale(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO, 4.0),
            )
            .with_texture(texture),
        );
        scene.add_light(Light::Directional(DirectionalLight {
            direction: [0.0, -1.0, 0.0],
            angular_size: 0.0,
            diffuse: [1.0, 1.0, 1.0],
            ambient: [0.1, 0.1, 0.1],
        }));

        let (tx, _queue) = UploadQueue::channel();
        let task = BakeTask::spawn(scene, tx);
        while !task.is_finished() {
            thread::sleep(std::time::Duration::from_millis(5));
        }

        assert!(task.has_error());
        let snap = task.status().snapshot();
        assert!(snap.message.starts_with("Error: "), "{}", snap.message);
        assert!(snap.message.contains("corrupt texel"), "{}", snap.message);
        assert_eq!(
            task.join().unwrap_err(),
            BakeError::WorkerFailure("corrupt texel".into())
        );
    }

    #[test]
    fn test_panic_payload_message() {
        let payload: Box<dyn Any + Send> = Box::new("tile exploded");
        assert_eq!(panic_message(payload.as_ref()), "tile exploded");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "worker panicked");
    }
}
