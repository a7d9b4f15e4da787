use std::f32::consts::TAU;
use std::ops::RangeInclusive;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::chunk::Chunk;
use crate::coord::{ChunkCoord, ChunkSize};
use crate::world::World;

/// Depth of the dirt band under the grass layer.
const DIRT_DEPTH: i32 = 3;

/// Rejected generator settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    #[error("radius {radius} around column {center} leaves the chunk coordinate range")]
    RadiusOutOfRange { center: IVec2, radius: u32 },
    #[error("layer range {min_layer}..={max_layer} is empty")]
    InvertedLayers { min_layer: i32, max_layer: i32 },
}

/// Populates a world with chunks.
pub trait WorldGenerator {
    fn generate(&self, world: &mut World);
}

/// A single all-air chunk at the origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginGenerator {
    pub size: ChunkSize,
}

impl WorldGenerator for OriginGenerator {
    fn generate(&self, world: &mut World) {
        world.add_chunk(ChunkCoord::ORIGIN, Chunk::new(self.size));
        tracing::info!(size = %self.size, "generated origin chunk");
    }
}

/// Terrain height function over world block columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Surface {
    /// Every column has the same height.
    Flat { height: i32 },
    /// Rolling sine/cosine hills around `base`.
    Hills {
        base: i32,
        amplitude: f32,
        wavelength: f32,
    },
}

impl Surface {
    /// Number of solid blocks in the column above world `y = 0`. Blocks at world
    /// `y < height_at(x, z)` are solid.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        match *self {
            Self::Flat { height } => height,
            Self::Hills {
                base,
                amplitude,
                wavelength,
            } => {
                if wavelength <= 0.0 {
                    return base;
                }
                let k = TAU / wavelength;
                let offset = amplitude * 0.5 * ((x as f32 * k).sin() + (z as f32 * k).cos());
                base + offset.round() as i32
            }
        }
    }

    /// Block at world position `y` in a column of the given surface height.
    fn block_at(height: i32, y: i32) -> BlockId {
        if y >= height {
            BlockId::AIR
        } else if y == height - 1 {
            BlockId::GRASS
        } else if y >= height - 1 - DIRT_DEPTH {
            BlockId::DIRT
        } else {
            BlockId::STONE
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::Hills {
            base: 12,
            amplitude: 6.0,
            wavelength: 48.0,
        }
    }
}

/// Settings for [`RadiusGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusConfig {
    /// Centre chunk column as `[x, z]`.
    pub center: IVec2,
    /// Square radius in chunk columns around `center`.
    pub radius: u32,
    /// Lowest vertical chunk layer, inclusive.
    pub min_layer: i32,
    /// Highest vertical chunk layer, inclusive.
    pub max_layer: i32,
    pub surface: Surface,
}

impl RadiusConfig {
    /// Chunk column ranges along x and z covered by this config.
    fn column_ranges(&self) -> Result<(RangeInclusive<i32>, RangeInclusive<i32>), GeneratorError> {
        let out_of_range = || GeneratorError::RadiusOutOfRange {
            center: self.center,
            radius: self.radius,
        };
        let r = i32::try_from(self.radius).map_err(|_| out_of_range())?;
        let span = |c: i32| -> Option<RangeInclusive<i32>> {
            Some(c.checked_sub(r)?..=c.checked_add(r)?)
        };
        let xs = span(self.center.x).ok_or_else(out_of_range)?;
        let zs = span(self.center.y).ok_or_else(out_of_range)?;
        Ok((xs, zs))
    }

    /// Check the radius and layer range without generating anything.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if self.min_layer > self.max_layer {
            return Err(GeneratorError::InvertedLayers {
                min_layer: self.min_layer,
                max_layer: self.max_layer,
            });
        }
        self.column_ranges().map(|_| ())
    }
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            center: IVec2::ZERO,
            radius: 2,
            min_layer: 0,
            max_layer: 1,
            surface: Surface::default(),
        }
    }
}

/// Fills every chunk within a square radius of a centre column from a
/// [`Surface`]. Chunks above the surface are still added, all air.
#[derive(Debug, Clone)]
pub struct RadiusGenerator {
    config: RadiusConfig,
    size: ChunkSize,
    xs: RangeInclusive<i32>,
    zs: RangeInclusive<i32>,
}

impl RadiusGenerator {
    pub fn new(config: RadiusConfig, size: ChunkSize) -> Result<Self, GeneratorError> {
        config.validate()?;
        let (xs, zs) = config.column_ranges()?;
        Ok(Self {
            config,
            size,
            xs,
            zs,
        })
    }

    pub fn config(&self) -> &RadiusConfig {
        &self.config
    }

    fn build_chunk(&self, coord: ChunkCoord) -> Chunk {
        let origin = coord.origin_in_blocks(self.size);
        let surface = self.config.surface;
        Chunk::from_fn(self.size, |local| {
            let world = origin + local.as_ivec3();
            Surface::block_at(surface.height_at(world.x, world.z), world.y)
        })
    }
}

impl WorldGenerator for RadiusGenerator {
    fn generate(&self, world: &mut World) {
        let RadiusConfig {
            radius,
            min_layer,
            max_layer,
            ..
        } = self.config;
        let mut added = 0usize;
        for cz in self.zs.clone() {
            for cx in self.xs.clone() {
                for cy in min_layer..=max_layer {
                    let coord = ChunkCoord::new(cx, cy, cz);
                    world.add_chunk(coord, self.build_chunk(coord));
                    added += 1;
                }
            }
        }
        tracing::info!(
            chunks = added,
            radius,
            min_layer,
            max_layer,
            size = %self.size,
            "generated terrain"
        );
    }
}

/// Serializable choice of world generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    Origin,
    Radius(RadiusConfig),
}

impl GeneratorConfig {
    pub fn build(&self, size: ChunkSize) -> Result<Box<dyn WorldGenerator>, GeneratorError> {
        Ok(match *self {
            Self::Origin => Box::new(OriginGenerator { size }),
            Self::Radius(config) => Box::new(RadiusGenerator::new(config, size)?),
        })
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::Radius(RadiusConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_generator_adds_one_empty_chunk() {
        let world = World::generated(&OriginGenerator::default());
        assert_eq!(world.chunk_count(), 1);
        let chunk = world.get_chunk(ChunkCoord::ORIGIN).unwrap();
        assert!(chunk.is_empty());
        assert_eq!(chunk.size(), ChunkSize::DEFAULT);
        assert!(chunk.generate_mesh().is_empty());
    }

    #[test]
    fn radius_generator_covers_square_and_layers() {
        let config = RadiusConfig {
            center: IVec2::new(5, -3),
            radius: 1,
            min_layer: -1,
            max_layer: 0,
            surface: Surface::Flat { height: 4 },
        };
        let world = World::generated(&RadiusGenerator::new(config, ChunkSize::DEFAULT).unwrap());
        assert_eq!(world.chunk_count(), 3 * 3 * 2);
        assert!(world.contains(ChunkCoord::new(4, -1, -4)));
        assert!(world.contains(ChunkCoord::new(6, 0, -2)));
        assert!(!world.contains(ChunkCoord::new(7, 0, -3)));
    }

    #[test]
    fn flat_surface_layers_grass_dirt_stone() {
        let config = RadiusConfig {
            radius: 0,
            min_layer: 0,
            max_layer: 0,
            surface: Surface::Flat { height: 8 },
            ..RadiusConfig::default()
        };
        let world = World::generated(&RadiusGenerator::new(config, ChunkSize::DEFAULT).unwrap());
        let chunk = world.get_chunk(ChunkCoord::ORIGIN).unwrap();
        assert_eq!(chunk.get_block(3, 8, 3).unwrap(), BlockId::AIR);
        assert_eq!(chunk.get_block(3, 7, 3).unwrap(), BlockId::GRASS);
        for y in 4..7 {
            assert_eq!(chunk.get_block(3, y, 3).unwrap(), BlockId::DIRT);
        }
        for y in 0..4 {
            assert_eq!(chunk.get_block(3, y, 3).unwrap(), BlockId::STONE);
        }
        assert_eq!(chunk.solid_count(), 16 * 16 * 8);
        // Top and bottom merge fully; each side keeps one quad per block type.
        assert_eq!(chunk.greedy_mesh().quad_count(), 2 + 4 * 3);
    }

    #[test]
    fn chunks_below_surface_are_solid_and_above_are_empty() {
        let config = RadiusConfig {
            radius: 0,
            min_layer: -1,
            max_layer: 1,
            surface: Surface::Flat { height: 8 },
            ..RadiusConfig::default()
        };
        let world = World::generated(&RadiusGenerator::new(config, ChunkSize::DEFAULT).unwrap());
        let below = world.get_chunk(ChunkCoord::new(0, -1, 0)).unwrap();
        assert_eq!(below.solid_count(), 16 * 16 * 16);
        assert!(world.get_chunk(ChunkCoord::new(0, 1, 0)).unwrap().is_empty());
    }

    #[test]
    fn hills_stay_within_amplitude() {
        let surface = Surface::Hills {
            base: 10,
            amplitude: 4.0,
            wavelength: 32.0,
        };
        for x in -40..40 {
            for z in -40..40 {
                let h = surface.height_at(x, z);
                assert!((6..=14).contains(&h), "height {h} at ({x}, {z})");
            }
        }
        assert_eq!(surface.height_at(0, 0), 12);
    }

    #[test]
    fn zero_wavelength_degrades_to_base() {
        let surface = Surface::Hills {
            base: 7,
            amplitude: 10.0,
            wavelength: 0.0,
        };
        assert_eq!(surface.height_at(13, -4), 7);
    }

    #[test]
    fn generator_config_deserializes_tagged() {
        let origin: GeneratorConfig = serde_json::from_str(r#"{"kind":"origin"}"#).unwrap();
        assert_eq!(origin, GeneratorConfig::Origin);

        let radius: GeneratorConfig = serde_json::from_str(
            r#"{"kind":"radius","radius":3,"surface":{"shape":"flat","height":5}}"#,
        )
        .unwrap();
        let GeneratorConfig::Radius(config) = radius else {
            panic!("expected radius generator, got {radius:?}");
        };
        assert_eq!(config.radius, 3);
        assert_eq!(config.surface, Surface::Flat { height: 5 });
        assert_eq!(config.max_layer, RadiusConfig::default().max_layer);
    }

    #[test]
    fn built_generators_populate_world() {
        let size = ChunkSize::cube(8).unwrap();
        let world = World::generated(GeneratorConfig::Origin.build(size).unwrap().as_ref());
        assert_eq!(world.chunk_count(), 1);

        let world = World::generated(GeneratorConfig::default().build(size).unwrap().as_ref());
        assert_eq!(world.chunk_count(), 5 * 5 * 2);
        assert!(world.solid_count() > 0);
    }

    #[test]
    fn radius_beyond_i32_is_rejected() {
        let config = RadiusConfig {
            radius: u32::MAX,
            ..RadiusConfig::default()
        };
        assert_eq!(
            RadiusGenerator::new(config, ChunkSize::DEFAULT).unwrap_err(),
            GeneratorError::RadiusOutOfRange {
                center: IVec2::ZERO,
                radius: u32::MAX
            }
        );
        assert!(GeneratorConfig::Radius(config).build(ChunkSize::DEFAULT).is_err());
    }

    #[test]
    fn radius_overflowing_the_centre_is_rejected() {
        let config = RadiusConfig {
            center: IVec2::new(i32::MAX - 1, 0),
            radius: 2,
            ..RadiusConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GeneratorError::RadiusOutOfRange { .. })
        ));
    }

    #[test]
    fn inverted_layers_are_rejected() {
        let config = RadiusConfig {
            min_layer: 2,
            max_layer: 1,
            ..RadiusConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(GeneratorError::InvertedLayers {
                min_layer: 2,
                max_layer: 1
            })
        );
        assert!(RadiusGenerator::new(config, ChunkSize::DEFAULT).is_err());

        let single = RadiusConfig {
            radius: 0,
            min_layer: 3,
            max_layer: 3,
            ..RadiusConfig::default()
        };
        let world = World::generated(&RadiusGenerator::new(single, ChunkSize::DEFAULT).unwrap());
        assert_eq!(world.chunk_count(), 1);
    }
}
