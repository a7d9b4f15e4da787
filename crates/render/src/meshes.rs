use std::collections::BTreeMap;

use glam::Mat4;
use voxelbox_terrain::{ChunkCoord, MeshOptions, VertexLayout, World};

use crate::renderer::{MeshHandle, RenderError, Renderer, ShaderHandle};

/// What one [`ChunkMeshes::sync`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Chunks whose mesh was rebuilt and uploaded.
    pub uploaded: usize,
    /// Old handles handed back to the renderer.
    pub released: usize,
    /// Chunks that changed but produced no geometry.
    pub empty: usize,
    /// Chunks left untouched.
    pub unchanged: usize,
}

#[derive(Debug, Clone, Copy)]
struct Uploaded {
    /// `None` when the chunk meshed to nothing.
    handle: Option<MeshHandle>,
    options: MeshOptions,
    generation: u64,
    revision: u64,
    quads: usize,
}

/// Keeps renderer-side meshes in step with the world's chunks.
///
/// Each entry remembers which chunk generation and revision it was built from,
/// so only new, replaced or edited chunks are meshed and uploaded again.
#[derive(Debug, Default)]
pub struct ChunkMeshes {
    options: MeshOptions,
    programs: BTreeMap<VertexLayout, ShaderHandle>,
    uploaded: BTreeMap<ChunkCoord, Uploaded>,
}

impl ChunkMeshes {
    pub fn new(options: MeshOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> MeshOptions {
        self.options
    }

    /// Change meshing options. Every chunk is rebuilt on the next sync.
    pub fn set_options(&mut self, options: MeshOptions) {
        self.options = options;
    }

    /// Number of chunks with a live mesh handle.
    pub fn mesh_count(&self) -> usize {
        self.uploaded.values().filter(|e| e.handle.is_some()).count()
    }

    /// Quads across every uploaded chunk mesh.
    pub fn quad_count(&self) -> usize {
        self.uploaded.values().map(|e| e.quads).sum()
    }

    pub fn handle(&self, coord: ChunkCoord) -> Option<MeshHandle> {
        self.uploaded.get(&coord).and_then(|e| e.handle)
    }

    /// Rebuild and upload meshes for new or changed chunks, and release meshes
    /// whose chunk left the world.
    pub fn sync<R: Renderer + ?Sized>(
        &mut self,
        world: &mut World,
        renderer: &mut R,
    ) -> Result<SyncStats, RenderError> {
        let mut stats = SyncStats::default();

        let removed: Vec<ChunkCoord> = self
            .uploaded
            .keys()
            .copied()
            .filter(|coord| !world.contains(*coord))
            .collect();
        for coord in removed {
            if let Some(handle) = self.uploaded.remove(&coord).and_then(|e| e.handle) {
                renderer.release_mesh(handle);
                stats.released += 1;
            }
        }

        let shader = self.program(renderer)?;
        let coords: Vec<ChunkCoord> = world.coords().collect();
        for coord in coords {
            let (Some(generation), Some(chunk)) =
                (world.generation(coord), world.get_chunk_mut(coord))
            else {
                continue;
            };
            let revision = chunk.revision();
            let previous = self.uploaded.get(&coord).copied();
            if previous.is_some_and(|e| {
                e.generation == generation && e.revision == revision && e.options == self.options
            }) {
                stats.unchanged += 1;
                continue;
            }

            let mesh = chunk.mesh(self.options);
            let handle = if mesh.is_empty() {
                stats.empty += 1;
                None
            } else {
                let handle =
                    renderer.create_mesh(mesh.vertices(), mesh.indices(), mesh.layout(), shader)?;
                stats.uploaded += 1;
                Some(handle)
            };
            let quads = mesh.quad_count();

            if let Some(old) = previous.and_then(|e| e.handle) {
                renderer.release_mesh(old);
                stats.released += 1;
            }
            self.uploaded.insert(
                coord,
                Uploaded {
                    handle,
                    options: self.options,
                    generation,
                    revision,
                    quads,
                },
            );
        }

        if stats.uploaded > 0 || stats.released > 0 {
            tracing::debug!(
                uploaded = stats.uploaded,
                released = stats.released,
                empty = stats.empty,
                "synced chunk meshes"
            );
        }
        Ok(stats)
    }

    /// Draw every uploaded chunk still in `world`. Returns the number of draws.
    pub fn draw<R: Renderer + ?Sized>(
        &self,
        world: &World,
        renderer: &mut R,
        projection: &Mat4,
        view: &Mat4,
    ) -> Result<usize, RenderError> {
        let mut drawn = 0;
        for (coord, chunk) in world.chunks() {
            let Some(handle) = self.handle(coord) else {
                continue;
            };
            let origin = coord.origin_in_blocks(chunk.size()).as_vec3();
            let model_view = *view * Mat4::from_translation(origin);
            renderer.draw(handle, projection, &model_view)?;
            drawn += 1;
        }
        Ok(drawn)
    }

    /// Hand every mesh back to the renderer.
    pub fn release_all<R: Renderer + ?Sized>(&mut self, renderer: &mut R) {
        for entry in std::mem::take(&mut self.uploaded).into_values() {
            if let Some(handle) = entry.handle {
                renderer.release_mesh(handle);
            }
        }
    }

    fn program<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
    ) -> Result<ShaderHandle, RenderError> {
        let layout = self.options.layout;
        if let Some(&shader) = self.programs.get(&layout) {
            return Ok(shader);
        }
        let shader = renderer.compile_program(layout)?;
        self.programs.insert(layout, shader);
        Ok(shader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HeadlessRenderer;
    use glam::Vec3;
    use voxelbox_terrain::{BlockId, Chunk, MeshStrategy};

    fn world_with_blocks() -> World {
        let mut world = World::new();
        for x in 0..3 {
            let mut chunk = Chunk::default();
            chunk.set_block(1, 1, 1, BlockId::STONE).unwrap();
            world.add_chunk(ChunkCoord::new(x, 0, 0), chunk);
        }
        world
    }

    #[test]
    fn first_sync_uploads_every_chunk() {
        let mut world = world_with_blocks();
        let mut renderer = HeadlessRenderer::new();
        let mut meshes = ChunkMeshes::default();

        let stats = meshes.sync(&mut world, &mut renderer).unwrap();
        assert_eq!(stats.uploaded, 3);
        assert_eq!(stats.released, 0);
        assert_eq!(renderer.mesh_count(), 3);
        assert_eq!(meshes.quad_count(), 18);
    }

    #[test]
    fn second_sync_without_changes_uploads_nothing() {
        let mut world = world_with_blocks();
        let mut renderer = HeadlessRenderer::new();
        let mut meshes = ChunkMeshes::default();
        meshes.sync(&mut world, &mut renderer).unwrap();

        let stats = meshes.sync(&mut world, &mut renderer).unwrap();
        assert_eq!(stats.uploaded, 0);
        assert_eq!(stats.unchanged, 3);
        assert_eq!(renderer.uploads(), 3);
    }

    #[test]
    fn only_dirty_chunk_is_reuploaded() {
        let mut world = world_with_blocks();
        let mut renderer = HeadlessRenderer::new();
        let mut meshes = ChunkMeshes::default();
        meshes.sync(&mut world, &mut renderer).unwrap();

        let coord = ChunkCoord::new(1, 0, 0);
        let old = meshes.handle(coord).unwrap();
        world
            .get_chunk_mut(coord)
            .unwrap()
            .set_block(2, 1, 1, BlockId::DIRT)
            .unwrap();

        let stats = meshes.sync(&mut world, &mut renderer).unwrap();
        assert_eq!(stats.uploaded, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.unchanged, 2);
        assert!(!renderer.contains_mesh(old));
        assert_ne!(meshes.handle(coord), Some(old));
        assert_eq!(renderer.mesh_count(), 3);
    }

    #[test]
    fn replaced_chunk_is_reuploaded_even_at_same_revision() {
        let mut world = world_with_blocks();
        let mut renderer = HeadlessRenderer::new();
        let mut meshes = ChunkMeshes::default();
        meshes.sync(&mut world, &mut renderer).unwrap();

        let coord = ChunkCoord::new(0, 0, 0);
        let mut replacement = Chunk::default();
        replacement.set_block(5, 5, 5, BlockId::GRASS).unwrap();
        world.add_chunk(coord, replacement);

        let stats = meshes.sync(&mut world, &mut renderer).unwrap();
        assert_eq!(stats.uploaded, 1);
        assert_eq!(stats.released, 1);
    }

    #[test]
    fn empty_chunks_get_no_handle() {
        let mut world = World::new();
        world.add_chunk(ChunkCoord::ORIGIN, Chunk::default());
        let mut renderer = HeadlessRenderer::new();
        let mut meshes = ChunkMeshes::default();

        let stats = meshes.sync(&mut world, &mut renderer).unwrap();
        assert_eq!(stats.empty, 1);
        assert_eq!(renderer.mesh_count(), 0);
        assert_eq!(meshes.handle(ChunkCoord::ORIGIN), None);

        // Clearing a chunk releases its mesh.
        let mut world = world_with_blocks();
        meshes.sync(&mut world, &mut renderer).unwrap();
        world
            .get_chunk_mut(ChunkCoord::ORIGIN)
            .unwrap()
            .fill(BlockId::AIR);
        let stats = meshes.sync(&mut world, &mut renderer).unwrap();
        assert_eq!(stats.empty, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(renderer.mesh_count(), 2);
    }

    #[test]
    fn chunks_missing_from_world_are_released() {
        let mut world = world_with_blocks();
        let mut renderer = HeadlessRenderer::new();
        let mut meshes = ChunkMeshes::default();
        meshes.sync(&mut world, &mut renderer).unwrap();

        let mut smaller = World::new();
        smaller.add_chunk(ChunkCoord::new(7, 0, 0), Chunk::default());
        let stats = meshes.sync(&mut smaller, &mut renderer).unwrap();
        assert_eq!(stats.released, 3);
        assert_eq!(renderer.mesh_count(), 0);
    }

    #[test]
    fn changing_options_rebuilds_everything() {
        let mut world = world_with_blocks();
        let mut renderer = HeadlessRenderer::new();
        let mut meshes = ChunkMeshes::default();
        meshes.sync(&mut world, &mut renderer).unwrap();

        meshes.set_options(MeshOptions {
            layout: VertexLayout::PositionUv,
            strategy: MeshStrategy::Greedy,
        });
        let stats = meshes.sync(&mut world, &mut renderer).unwrap();
        assert_eq!(stats.uploaded, 3);
        assert_eq!(stats.released, 3);
        assert!(renderer.report().contains("PositionUv"));
    }

    #[test]
    fn draw_translates_by_chunk_origin() {
        let mut world = world_with_blocks();
        let mut renderer = HeadlessRenderer::new();
        let mut meshes = ChunkMeshes::default();
        meshes.sync(&mut world, &mut renderer).unwrap();

        renderer.begin_frame();
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let drawn = meshes
            .draw(&world, &mut renderer, &Mat4::IDENTITY, &view)
            .unwrap();
        assert_eq!(drawn, 3);

        let last = &renderer.draws()[2];
        let origin = last.model_view.transform_point3(Vec3::ZERO);
        assert_eq!(origin, Vec3::new(32.0, 0.0, -5.0));
    }

    #[test]
    fn release_all_empties_renderer() {
        let mut world = world_with_blocks();
        let mut renderer = HeadlessRenderer::new();
        let mut meshes = ChunkMeshes::default();
        meshes.sync(&mut world, &mut renderer).unwrap();
        meshes.release_all(&mut renderer);
        assert_eq!(renderer.mesh_count(), 0);
        assert_eq!(meshes.mesh_count(), 0);
    }
}
