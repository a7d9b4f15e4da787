use glam::{IVec3, UVec3};

use crate::block::BlockId;
use crate::coord::ChunkSize;
use crate::mesh::{self, ChunkMesh, MeshOptions, MeshStrategy, VertexLayout};

/// Errors from chunk construction and block access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("block ({x}, {y}, {z}) is outside chunk of size {size}")]
    OutOfRange {
        x: i32,
        y: i32,
        z: i32,
        size: ChunkSize,
    },
    #[error("chunk extents must be positive, got {0}")]
    InvalidSize(UVec3),
}

/// Fixed-size dense grid of block ids.
///
/// Every mutation bumps the chunk's revision and drops its cached mesh, so the
/// next mesh request regenerates geometry. Nothing here renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    size: ChunkSize,
    blocks: Vec<BlockId>,
    revision: u64,
    cached: Option<(MeshOptions, ChunkMesh)>,
}

impl Chunk {
    /// Create an all-air chunk.
    pub fn new(size: ChunkSize) -> Self {
        Self {
            size,
            blocks: vec![BlockId::AIR; size.volume()],
            revision: 0,
            cached: None,
        }
    }

    /// Create a chunk whose blocks are produced by `f(local_position)`.
    pub fn from_fn(size: ChunkSize, mut f: impl FnMut(UVec3) -> BlockId) -> Self {
        let extent = size.extent();
        let mut blocks = Vec::with_capacity(size.volume());
        // Same x-fastest order as `index`.
        for z in 0..extent.z {
            for y in 0..extent.y {
                for x in 0..extent.x {
                    blocks.push(f(UVec3::new(x, y, z)));
                }
            }
        }
        Self {
            size,
            blocks,
            revision: 0,
            cached: None,
        }
    }

    pub fn size(&self) -> ChunkSize {
        self.size
    }

    /// Mutation counter. Starts at 0 and grows by one per write.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when no mesh has been built since the last mutation.
    pub fn is_dirty(&self) -> bool {
        self.cached.is_none()
    }

    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Result<BlockId, ChunkError> {
        let idx = self.index(x, y, z)?;
        Ok(self.blocks[idx])
    }

    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> Result<(), ChunkError> {
        let idx = self.index(x, y, z)?;
        self.blocks[idx] = block;
        self.invalidate();
        Ok(())
    }

    /// Overwrite every block.
    pub fn fill(&mut self, block: BlockId) {
        self.blocks.fill(block);
        self.invalidate();
    }

    /// Number of non-air blocks.
    pub fn solid_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_solid()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.is_air())
    }

    /// Block at a local position, treating anything outside the chunk as air.
    pub(crate) fn block_or_air(&self, pos: IVec3) -> BlockId {
        if self.size.contains(pos) {
            self.blocks[self.flat_index(pos)]
        } else {
            BlockId::AIR
        }
    }

    /// Face-culled mesh with position-only vertices.
    pub fn generate_mesh(&self) -> ChunkMesh {
        self.generate_mesh_with(VertexLayout::Position)
    }

    /// Face-culled mesh: one quad per solid face bordering air or the boundary.
    pub fn generate_mesh_with(&self, layout: VertexLayout) -> ChunkMesh {
        mesh::culled_mesh(self, layout)
    }

    /// Greedy-merged mesh with position-only vertices.
    pub fn greedy_mesh(&self) -> ChunkMesh {
        self.greedy_mesh_with(VertexLayout::Position)
    }

    /// Same visible surface as [`Chunk::generate_mesh_with`], with coplanar
    /// same-type faces merged into larger quads.
    pub fn greedy_mesh_with(&self, layout: VertexLayout) -> ChunkMesh {
        mesh::greedy_mesh(self, layout)
    }

    /// Cached mesh for `options`, rebuilt when the chunk is dirty or the
    /// options changed since the last build.
    pub fn mesh(&mut self, options: MeshOptions) -> &ChunkMesh {
        let entry = match self.cached.take() {
            Some((cached_options, mesh)) if cached_options == options => (cached_options, mesh),
            _ => {
                let mesh = match options.strategy {
                    MeshStrategy::Culled => self.generate_mesh_with(options.layout),
                    MeshStrategy::Greedy => self.greedy_mesh_with(options.layout),
                };
                tracing::debug!(
                    revision = self.revision,
                    strategy = ?options.strategy,
                    quads = mesh.quad_count(),
                    "rebuilt chunk mesh"
                );
                (options, mesh)
            }
        };
        &self.cached.insert(entry).1
    }

    fn invalidate(&mut self) {
        self.revision += 1;
        self.cached = None;
    }

    fn index(&self, x: i32, y: i32, z: i32) -> Result<usize, ChunkError> {
        let pos = IVec3::new(x, y, z);
        if !self.size.contains(pos) {
            return Err(ChunkError::OutOfRange {
                x,
                y,
                z,
                size: self.size,
            });
        }
        Ok(self.flat_index(pos))
    }

    fn flat_index(&self, pos: IVec3) -> usize {
        let e = self.size.extent();
        pos.x as usize + e.x as usize * (pos.y as usize + e.y as usize * pos.z as usize)
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new(ChunkSize::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_is_all_air() {
        let chunk = Chunk::default();
        assert!(chunk.is_empty());
        assert_eq!(chunk.solid_count(), 0);
        assert_eq!(chunk.get_block(15, 15, 15).unwrap(), BlockId::AIR);
    }

    #[test]
    fn set_then_get_round_trips_everywhere() {
        let size = ChunkSize::new(3, 4, 5).unwrap();
        let mut chunk = Chunk::new(size);
        for z in 0..5 {
            for y in 0..4 {
                for x in 0..3 {
                    let id = BlockId((x + 3 * y + 12 * z + 1) as u8);
                    chunk.set_block(x, y, z, id).unwrap();
                }
            }
        }
        for z in 0..5 {
            for y in 0..4 {
                for x in 0..3 {
                    let id = BlockId((x + 3 * y + 12 * z + 1) as u8);
                    assert_eq!(chunk.get_block(x, y, z).unwrap(), id);
                }
            }
        }
    }

    #[test]
    fn out_of_range_access_fails() {
        let mut chunk = Chunk::default();
        let outside = [
            (16, 0, 0),
            (0, 16, 0),
            (0, 0, 16),
            (-1, 0, 0),
            (0, -1, 0),
            (0, 0, -1),
            (i32::MAX, i32::MIN, 0),
        ];
        for (x, y, z) in outside {
            assert!(matches!(
                chunk.get_block(x, y, z),
                Err(ChunkError::OutOfRange { .. })
            ));
            assert!(matches!(
                chunk.set_block(x, y, z, BlockId::STONE),
                Err(ChunkError::OutOfRange { .. })
            ));
        }
        // A failed write leaves the chunk untouched.
        assert_eq!(chunk.revision(), 0);
        assert!(chunk.is_empty());
    }

    #[test]
    fn set_block_marks_mesh_stale() {
        let mut chunk = Chunk::default();
        assert!(chunk.is_dirty());
        chunk.mesh(MeshOptions::default());
        assert!(!chunk.is_dirty());

        chunk.set_block(1, 1, 1, BlockId::STONE).unwrap();
        assert!(chunk.is_dirty());
        assert_eq!(chunk.revision(), 1);
        assert_eq!(chunk.mesh(MeshOptions::default()).quad_count(), 6);
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn cached_mesh_follows_options() {
        let mut chunk = Chunk::default();
        chunk.fill(BlockId::DIRT);
        let culled = chunk.mesh(MeshOptions::default()).quad_count();
        let greedy = chunk
            .mesh(MeshOptions {
                strategy: MeshStrategy::Greedy,
                ..MeshOptions::default()
            })
            .quad_count();
        assert_eq!(culled, 6 * 16 * 16);
        assert_eq!(greedy, 6);
    }

    #[test]
    fn from_fn_uses_same_layout_as_accessors() {
        let size = ChunkSize::new(4, 3, 2).unwrap();
        let chunk = Chunk::from_fn(size, |p| {
            if p == UVec3::new(3, 1, 0) {
                BlockId::GRASS
            } else {
                BlockId::AIR
            }
        });
        assert_eq!(chunk.get_block(3, 1, 0).unwrap(), BlockId::GRASS);
        assert_eq!(chunk.solid_count(), 1);
    }

    #[test]
    fn fill_counts_every_block() {
        let mut chunk = Chunk::new(ChunkSize::cube(4).unwrap());
        chunk.fill(BlockId::STONE);
        assert_eq!(chunk.solid_count(), 64);
        chunk.fill(BlockId::AIR);
        assert!(chunk.is_empty());
    }
}
