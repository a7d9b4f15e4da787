use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use voxelbox_camera::{CameraConfig, Projection};
use voxelbox_terrain::{ChunkSize, GeneratorConfig, MeshOptions};

/// Errors from loading or saving a session config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported config format: {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Everything needed to start a session. Every field has a default, so a
/// config file only lists what it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub chunk_size: ChunkSize,
    pub camera: CameraConfig,
    pub projection: Projection,
    pub generator: GeneratorConfig,
    pub mesh: MeshOptions,
}

impl SessionConfig {
    /// Read a config file, choosing JSON or YAML by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let config = match format {
            Format::Json => serde_json::from_str(&text)?,
            Format::Yaml => serde_yaml::from_str(&text)?,
        };
        tracing::debug!(path = %path.display(), "loaded session config");
        Ok(config)
    }

    /// Write this config, choosing JSON or YAML by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Yaml => serde_yaml::to_string(self)?,
        };
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use voxelbox_terrain::{MeshStrategy, RadiusConfig, Surface, VertexLayout};

    fn custom_config() -> SessionConfig {
        SessionConfig {
            chunk_size: ChunkSize::new(8, 32, 8).unwrap(),
            camera: CameraConfig {
                position: Vec3::new(1.0, 2.0, 3.0),
                speed: 4.0,
                ..CameraConfig::default()
            },
            projection: Projection {
                fov_degrees: 75.0,
                ..Projection::default()
            },
            generator: GeneratorConfig::Radius(RadiusConfig {
                radius: 1,
                surface: Surface::Flat { height: 3 },
                ..RadiusConfig::default()
            }),
            mesh: MeshOptions {
                layout: VertexLayout::PositionUv,
                strategy: MeshStrategy::Greedy,
            },
        }
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let config = custom_config();
        config.save(&path).unwrap();
        assert_eq!(SessionConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn yaml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["session.yaml", "session.yml"] {
            let path = dir.path().join(name);
            let config = custom_config();
            config.save(&path).unwrap();
            assert_eq!(SessionConfig::load(&path).unwrap(), config);
        }
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.yaml");
        std::fs::write(
            &path,
            "projection:\n  fov_degrees: 90.0\nmesh:\n  strategy: greedy\n",
        )
        .unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.projection.fov_degrees, 90.0);
        assert_eq!(config.projection.near, Projection::default().near);
        assert_eq!(config.mesh.strategy, MeshStrategy::Greedy);
        assert_eq!(config.mesh.layout, VertexLayout::Position);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            SessionConfig::load(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SessionConfig::load(dir.path().join("absent.json")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn zero_chunk_extent_fails_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"chunk_size": [16, 0, 16]}"#).unwrap();
        assert!(matches!(
            SessionConfig::load(&path),
            Err(ConfigError::Json(_))
        ));
    }
}
