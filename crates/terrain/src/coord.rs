use std::fmt;

use glam::{IVec3, UVec3};
use serde::{Deserialize, Serialize};

use crate::chunk::ChunkError;

/// Extent of a chunk in blocks. Every axis is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UVec3", into = "UVec3")]
pub struct ChunkSize(UVec3);

impl ChunkSize {
    /// The default 16×16×16 chunk.
    pub const DEFAULT: Self = Self(UVec3::splat(16));

    pub fn new(x: u32, y: u32, z: u32) -> Result<Self, ChunkError> {
        Self::try_from(UVec3::new(x, y, z))
    }

    /// Cubic chunk of side `n`.
    pub fn cube(n: u32) -> Result<Self, ChunkError> {
        Self::new(n, n, n)
    }

    pub fn extent(self) -> UVec3 {
        self.0
    }

    pub fn as_ivec3(self) -> IVec3 {
        self.0.as_ivec3()
    }

    /// Number of blocks in a chunk of this size.
    pub fn volume(self) -> usize {
        self.0.x as usize * self.0.y as usize * self.0.z as usize
    }

    /// Whether the local coordinate lies inside `[0, size)` on every axis.
    pub fn contains(self, pos: IVec3) -> bool {
        pos.cmpge(IVec3::ZERO).all() && pos.cmplt(self.as_ivec3()).all()
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<UVec3> for ChunkSize {
    type Error = ChunkError;

    fn try_from(extent: UVec3) -> Result<Self, Self::Error> {
        if extent.cmpeq(UVec3::ZERO).any() {
            return Err(ChunkError::InvalidSize(extent));
        }
        Ok(Self(extent))
    }
}

impl From<ChunkSize> for UVec3 {
    fn from(size: ChunkSize) -> Self {
        size.0
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.0.x, self.0.y, self.0.z)
    }
}

/// Chunk-space coordinate: one unit is one chunk extent along that axis.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    /// Minimum corner of this chunk in world block space.
    pub fn origin_in_blocks(self, size: ChunkSize) -> IVec3 {
        self.as_ivec3() * size.as_ivec3()
    }

    /// Chunk containing a world-space block position (floor division).
    pub fn from_block(block: IVec3, size: ChunkSize) -> Self {
        let c = block.div_euclid(size.as_ivec3());
        Self::new(c.x, c.y, c.z)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_extent_is_rejected() {
        assert!(matches!(
            ChunkSize::new(16, 0, 16),
            Err(ChunkError::InvalidSize(_))
        ));
        assert!(ChunkSize::cube(0).is_err());
    }

    #[test]
    fn default_size_is_sixteen_cubed() {
        let size = ChunkSize::default();
        assert_eq!(size.extent(), UVec3::splat(16));
        assert_eq!(size.volume(), 4096);
    }

    #[test]
    fn contains_checks_every_axis() {
        let size = ChunkSize::new(2, 3, 4).unwrap();
        assert!(size.contains(IVec3::new(1, 2, 3)));
        assert!(!size.contains(IVec3::new(2, 0, 0)));
        assert!(!size.contains(IVec3::new(0, 3, 0)));
        assert!(!size.contains(IVec3::new(0, 0, 4)));
        assert!(!size.contains(IVec3::new(-1, 0, 0)));
    }

    #[test]
    fn block_to_chunk_floors_negative_positions() {
        let size = ChunkSize::DEFAULT;
        assert_eq!(
            ChunkCoord::from_block(IVec3::new(15, 0, 16), size),
            ChunkCoord::new(0, 0, 1)
        );
        assert_eq!(
            ChunkCoord::from_block(IVec3::new(-1, -16, -17), size),
            ChunkCoord::new(-1, -1, -2)
        );
    }

    #[test]
    fn origin_in_blocks_scales_by_size() {
        let size = ChunkSize::new(16, 32, 8).unwrap();
        assert_eq!(
            ChunkCoord::new(1, -1, 2).origin_in_blocks(size),
            IVec3::new(16, -32, 16)
        );
    }

    #[test]
    fn size_deserialization_validates() {
        let ok: ChunkSize = serde_json::from_str("[8, 8, 8]").unwrap();
        assert_eq!(ok, ChunkSize::cube(8).unwrap());
        assert!(serde_json::from_str::<ChunkSize>("[8, 0, 8]").is_err());
    }
}
