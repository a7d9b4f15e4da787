//! wgpu render backend for voxel chunk meshes.
//!
//! Implements [`voxelbox_render::Renderer`]: one pipeline per vertex layout,
//! one set of GPU buffers per uploaded mesh. Draws are queued during the frame
//! and encoded by [`WgpuRenderer::render_frame`].
//!
//! # Invariants
//! - Back faces are culled; front faces wind counter-clockwise.
//! - Projections arrive in OpenGL depth convention and are remapped to wgpu's
//!   `[0, 1]` depth range here, nowhere else.

mod gpu;
mod shaders;

pub use gpu::WgpuRenderer;
