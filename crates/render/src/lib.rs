//! Rendering Adapter: renderer-agnostic interface and the frame loop.
//!
//! # Invariants
//! - Renderers never see the world; they only receive flat vertex/index arrays
//!   and matrices.
//! - GPU resources are owned by the renderer and named by opaque handles.
//! - A chunk mesh is uploaded again only when the chunk changed or was replaced.
//!
//! [`HeadlessRenderer`] records everything it is asked to do, so the session can
//! be driven and inspected without a window or GPU.

mod config;
mod meshes;
mod renderer;
mod session;

pub use config::{ConfigError, SessionConfig};
pub use meshes::{ChunkMeshes, SyncStats};
pub use renderer::{
    DrawCall, HeadlessRenderer, MeshHandle, RenderError, Renderer, ShaderHandle, validate_mesh,
};
pub use session::{FrameError, FrameStats, Session, Surface};
