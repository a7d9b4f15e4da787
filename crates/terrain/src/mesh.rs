use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::chunk::Chunk;

/// Texture coordinates for the four corners of every quad.
const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Two counter-clockwise triangles over four corners.
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Per-vertex attributes of a mesh, fixed for the whole mesh.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VertexLayout {
    /// `x, y, z`
    #[default]
    Position,
    /// `x, y, z, u, v`
    PositionUv,
}

impl VertexLayout {
    pub const fn floats_per_vertex(self) -> usize {
        match self {
            Self::Position => 3,
            Self::PositionUv => 5,
        }
    }
}

/// Which mesher builds a chunk's geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshStrategy {
    /// One quad per visible block face.
    #[default]
    Culled,
    /// Visible faces merged into maximal same-type rectangles.
    Greedy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshOptions {
    pub layout: VertexLayout,
    pub strategy: MeshStrategy,
}

/// The six axis-aligned face directions of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceDirection {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl FaceDirection {
    pub const ALL: [Self; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    pub fn normal(self) -> IVec3 {
        match self {
            Self::PosX => IVec3::X,
            Self::NegX => IVec3::NEG_X,
            Self::PosY => IVec3::Y,
            Self::NegY => IVec3::NEG_Y,
            Self::PosZ => IVec3::Z,
            Self::NegZ => IVec3::NEG_Z,
        }
    }

    /// Index of the axis the normal points along (0 = x, 1 = y, 2 = z).
    pub fn axis(self) -> usize {
        match self {
            Self::PosX | Self::NegX => 0,
            Self::PosY | Self::NegY => 1,
            Self::PosZ | Self::NegZ => 2,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Self::PosX | Self::PosY | Self::PosZ)
    }

    /// Corners of this face on the unit cube `[0, 1]³`, counter-clockwise
    /// when seen from outside the cube.
    #[rustfmt::skip]
    pub fn corners(self) -> [Vec3; 4] {
        let v = Vec3::new;
        match self {
            Self::PosX => [v(1.0, 0.0, 1.0), v(1.0, 0.0, 0.0), v(1.0, 1.0, 0.0), v(1.0, 1.0, 1.0)],
            Self::NegX => [v(0.0, 0.0, 0.0), v(0.0, 0.0, 1.0), v(0.0, 1.0, 1.0), v(0.0, 1.0, 0.0)],
            Self::PosY => [v(0.0, 1.0, 1.0), v(1.0, 1.0, 1.0), v(1.0, 1.0, 0.0), v(0.0, 1.0, 0.0)],
            Self::NegY => [v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 0.0, 1.0), v(0.0, 0.0, 1.0)],
            Self::PosZ => [v(0.0, 0.0, 1.0), v(1.0, 0.0, 1.0), v(1.0, 1.0, 1.0), v(0.0, 1.0, 1.0)],
            Self::NegZ => [v(1.0, 0.0, 0.0), v(0.0, 0.0, 0.0), v(0.0, 1.0, 0.0), v(1.0, 1.0, 0.0)],
        }
    }
}

/// Flat vertex/index buffers for one chunk, in chunk-local block units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    layout: VertexLayout,
    vertices: Vec<f32>,
    indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn new(layout: VertexLayout) -> Self {
        Self {
            layout,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.floats_per_vertex()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn quad_count(&self) -> usize {
        self.indices.len() / QUAD_INDICES.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex positions, skipping any texture coordinates.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices
            .chunks_exact(self.layout.floats_per_vertex())
            .map(|v| Vec3::new(v[0], v[1], v[2]))
    }

    /// Total area covered by the mesh's quads, in square blocks.
    pub fn surface_area(&self) -> f32 {
        let positions: Vec<Vec3> = self.positions().collect();
        positions
            .chunks_exact(4)
            .map(|q| (q[1] - q[0]).cross(q[3] - q[0]).length())
            .sum()
    }

    fn push_quad(&mut self, corners: [Vec3; 4]) {
        let base = self.vertex_count() as u32;
        for (corner, uv) in corners.iter().zip(QUAD_UVS) {
            self.vertices.extend_from_slice(&corner.to_array());
            if self.layout == VertexLayout::PositionUv {
                self.vertices.extend_from_slice(&uv);
            }
        }
        self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }
}

/// A face is visible when the neighbouring cell is air or outside the chunk.
fn face_visible(chunk: &Chunk, pos: IVec3, dir: FaceDirection) -> bool {
    chunk.block_or_air(pos + dir.normal()).is_air()
}

pub(crate) fn culled_mesh(chunk: &Chunk, layout: VertexLayout) -> ChunkMesh {
    let mut mesh = ChunkMesh::new(layout);
    if chunk.is_empty() {
        return mesh;
    }

    let extent = chunk.size().as_ivec3();
    for z in 0..extent.z {
        for y in 0..extent.y {
            for x in 0..extent.x {
                let pos = IVec3::new(x, y, z);
                if chunk.block_or_air(pos).is_air() {
                    continue;
                }
                let offset = pos.as_vec3();
                for dir in FaceDirection::ALL {
                    if face_visible(chunk, pos, dir) {
                        mesh.push_quad(dir.corners().map(|c| c + offset));
                    }
                }
            }
        }
    }
    mesh
}

/// Greedy meshing over the same visibility predicate as [`culled_mesh`].
///
/// For every face direction the chunk is swept slice by slice. Each slice builds
/// a 2D mask of visible face block ids, and the mask is consumed by growing
/// rectangles first along `u`, then along `v`, only over identical block ids.
pub(crate) fn greedy_mesh(chunk: &Chunk, layout: VertexLayout) -> ChunkMesh {
    let mut mesh = ChunkMesh::new(layout);
    if chunk.is_empty() {
        return mesh;
    }

    let extent = chunk.size().as_ivec3();
    for dir in FaceDirection::ALL {
        // (u, v, d) is a cyclic permutation of (x, y, z), so u × v points along +d.
        let d = dir.axis();
        let u = (d + 1) % 3;
        let v = (d + 2) % 3;
        let (du, dv) = (extent[u] as usize, extent[v] as usize);
        let mut mask = vec![BlockId::AIR; du * dv];

        for w in 0..extent[d] {
            for j in 0..dv {
                for i in 0..du {
                    let mut pos = IVec3::ZERO;
                    pos[d] = w;
                    pos[u] = i as i32;
                    pos[v] = j as i32;
                    let block = chunk.block_or_air(pos);
                    mask[i + j * du] = if block.is_solid() && face_visible(chunk, pos, dir) {
                        block
                    } else {
                        BlockId::AIR
                    };
                }
            }

            let plane = (if dir.is_positive() { w + 1 } else { w }) as f32;
            let corner = |a: usize, b: usize| {
                let mut p = Vec3::ZERO;
                p[d] = plane;
                p[u] = a as f32;
                p[v] = b as f32;
                p
            };

            for j in 0..dv {
                let mut i = 0;
                while i < du {
                    let block = mask[i + j * du];
                    if block.is_air() {
                        i += 1;
                        continue;
                    }

                    let mut width = 1;
                    while i + width < du && mask[i + width + j * du] == block {
                        width += 1;
                    }

                    let mut height = 1;
                    'grow: while j + height < dv {
                        for k in 0..width {
                            if mask[i + k + (j + height) * du] != block {
                                break 'grow;
                            }
                        }
                        height += 1;
                    }

                    for jj in 0..height {
                        for ii in 0..width {
                            mask[i + ii + (j + jj) * du] = BlockId::AIR;
                        }
                    }

                    let (i1, j1) = (i + width, j + height);
                    let quad = if dir.is_positive() {
                        [corner(i, j), corner(i1, j), corner(i1, j1), corner(i, j1)]
                    } else {
                        [corner(i, j), corner(i, j1), corner(i1, j1), corner(i1, j)]
                    };
                    mesh.push_quad(quad);
                    i += width;
                }
            }
        }
    }
    mesh
}
