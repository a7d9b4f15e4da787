use std::time::Instant;

use voxelbox_camera::{Camera, Projection};
use voxelbox_common::MathError;
use voxelbox_input::{InputSnapshot, InputSource};
use voxelbox_terrain::{GeneratorError, MeshOptions, World};

use crate::config::SessionConfig;
use crate::meshes::{ChunkMeshes, SyncStats};
use crate::renderer::{RenderError, Renderer};

/// Errors that abort a frame or stop a session from being built.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Math(#[from] MathError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

/// Something frames are shown on: a window, or a stand-in for tests.
pub trait Surface {
    /// True once the frame loop should stop.
    fn should_close(&self) -> bool;

    /// Show the finished frame.
    fn present(&mut self) -> Result<(), RenderError>;
}

/// Per-frame statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Zero-based index of the frame.
    pub frame: u64,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    pub sync: SyncStats,
    pub draws: usize,
    /// Quads across every uploaded chunk mesh.
    pub quads: usize,
}

/// Owns the world, the camera and the renderer-side mesh bookkeeping, and
/// turns input into frames.
#[derive(Debug)]
pub struct Session {
    world: World,
    camera: Camera,
    projection: Projection,
    meshes: ChunkMeshes,
    frame_index: u64,
}

impl Session {
    pub fn new(world: World, camera: Camera, projection: Projection, options: MeshOptions) -> Self {
        Self {
            world,
            camera,
            projection,
            meshes: ChunkMeshes::new(options),
            frame_index: 0,
        }
    }

    /// Build the world and camera described by `config`.
    pub fn from_config(config: &SessionConfig) -> Result<Self, FrameError> {
        let generator = config.generator.build(config.chunk_size)?;
        let world = World::generated(generator.as_ref());
        let camera = Camera::new(config.camera)?;
        Ok(Self::new(world, camera, config.projection, config.mesh))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut Projection {
        &mut self.projection
    }

    pub fn meshes(&self) -> &ChunkMeshes {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut ChunkMeshes {
        &mut self.meshes
    }

    /// Frames completed so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Run one frame: move the camera, re-upload changed chunks, draw.
    pub fn frame<R: Renderer + ?Sized>(
        &mut self,
        input: &InputSnapshot,
        delta_time: f32,
        renderer: &mut R,
    ) -> Result<FrameStats, FrameError> {
        let _span = tracing::trace_span!("frame", index = self.frame_index).entered();

        renderer.begin_frame();
        self.camera.process_input(input, delta_time);
        let view = self.camera.view_matrix()?;
        let projection = self.projection.matrix()?;

        let sync = self.meshes.sync(&mut self.world, renderer)?;
        let draws = self
            .meshes
            .draw(&self.world, renderer, &projection, &view)?;

        let stats = FrameStats {
            frame: self.frame_index,
            delta_time,
            sync,
            draws,
            quads: self.meshes.quad_count(),
        };
        self.frame_index += 1;
        tracing::trace!(
            draws = stats.draws,
            uploaded = sync.uploaded,
            dt = delta_time,
            "frame done"
        );
        Ok(stats)
    }

    /// Drive frames until `surface` asks to close. Returns the number of frames run.
    ///
    /// `delta_time` is measured from wall-clock time between frames. A failed
    /// present is logged and the loop carries on.
    pub fn run<S, I, R>(
        &mut self,
        surface: &mut S,
        input: &mut I,
        renderer: &mut R,
    ) -> Result<u64, FrameError>
    where
        S: Surface + ?Sized,
        I: InputSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let start = self.frame_index;
        let mut last = Instant::now();
        while !surface.should_close() {
            let now = Instant::now();
            let delta_time = now.duration_since(last).as_secs_f32();
            last = now;

            let snapshot = input.poll();
            self.frame(&snapshot, delta_time, renderer)?;
            if let Err(e) = surface.present() {
                tracing::warn!(error = %e, "present failed");
            }
        }
        let frames = self.frame_index - start;
        tracing::info!(frames, "frame loop finished");
        Ok(frames)
    }

    /// Release every GPU mesh this session uploaded.
    pub fn shutdown<R: Renderer + ?Sized>(&mut self, renderer: &mut R) {
        self.meshes.release_all(renderer);
    }
}
