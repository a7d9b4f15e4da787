use std::collections::BTreeMap;

use crate::chunk::Chunk;
use crate::coord::ChunkCoord;
use crate::generator::WorldGenerator;

#[derive(Debug, Clone)]
struct Slot {
    chunk: Chunk,
    generation: u64,
}

/// The set of loaded chunks, keyed by chunk coordinate.
///
/// Uses BTreeMap so chunks are always visited in the same order. Every
/// insertion stamps its slot with a fresh generation, letting consumers tell a
/// replaced chunk apart from the one it replaced even when both sit at the same
/// revision.
#[derive(Debug, Clone, Default)]
pub struct World {
    chunks: BTreeMap<ChunkCoord, Slot>,
    next_generation: u64,
}

impl World {
    /// Create a world with no chunks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world and populate it with `generator`.
    pub fn generated(generator: &dyn WorldGenerator) -> Self {
        let mut world = Self::new();
        world.generate(generator);
        world
    }

    /// Run a generator against this world.
    pub fn generate(&mut self, generator: &dyn WorldGenerator) {
        generator.generate(self);
    }

    /// Insert a chunk at `coord`, returning whatever chunk was there before.
    pub fn add_chunk(&mut self, coord: ChunkCoord, chunk: Chunk) -> Option<Chunk> {
        let generation = self.next_generation;
        self.next_generation += 1;
        let previous = self.chunks.insert(coord, Slot { chunk, generation });
        if previous.is_some() {
            tracing::debug!(%coord, generation, "replaced chunk");
        }
        previous.map(|slot| slot.chunk)
    }

    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord).map(|slot| &slot.chunk)
    }

    pub fn get_chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord).map(|slot| &mut slot.chunk)
    }

    /// Insertion stamp of the chunk currently at `coord`.
    pub fn generation(&self, coord: ChunkCoord) -> Option<u64> {
        self.chunks.get(&coord).map(|slot| slot.generation)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk coordinates in ascending order.
    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    pub fn chunks(&self) -> impl Iterator<Item = (ChunkCoord, &Chunk)> {
        self.chunks.iter().map(|(coord, slot)| (*coord, &slot.chunk))
    }

    pub fn chunks_mut(&mut self) -> impl Iterator<Item = (ChunkCoord, &mut Chunk)> {
        self.chunks
            .iter_mut()
            .map(|(coord, slot)| (*coord, &mut slot.chunk))
    }

    /// Total non-air blocks across every chunk.
    pub fn solid_count(&self) -> usize {
        self.chunks.values().map(|slot| slot.chunk.solid_count()).sum()
    }
}
