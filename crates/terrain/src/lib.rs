//! Terrain: block grids, chunk meshing and the chunk world.
//!
//! # Invariants
//! - A chunk's block array always holds exactly `size.x * size.y * size.z` entries.
//! - Block access outside a chunk is an error, never clamped or wrapped.
//! - Meshing is a pure function of the block grid. Faces are emitted only where a
//!   solid block borders air or the chunk boundary.
//! - The world holds at most one chunk per chunk coordinate and never fabricates
//!   chunks on lookup.
//!
//! # Simplification
//! Faces on the chunk boundary are always emitted; there is no cross-chunk culling.

mod block;
mod chunk;
mod coord;
mod generator;
mod mesh;
mod world;

pub use block::BlockId;
pub use chunk::{Chunk, ChunkError};
pub use coord::{ChunkCoord, ChunkSize};
pub use generator::{
    GeneratorConfig, GeneratorError, OriginGenerator, RadiusConfig, RadiusGenerator, Surface,
    WorldGenerator,
};
pub use mesh::{ChunkMesh, FaceDirection, MeshOptions, MeshStrategy, VertexLayout};
pub use world::World;
