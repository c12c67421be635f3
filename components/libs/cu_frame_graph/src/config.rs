//! Static description of a transform tree.
//! The configuration lists the frames of the tree with their parent and transform, it is
//! serialized in the RON format:
//!
//! ```ron
//! (
//!     root: "world",
//!     frames: [
//!         (id: "base_link", parent: "world", transform: (translation: (0.0, 0.0, 0.3))),
//!         (id: "lidar", parent: "base_link"),
//!         (id: "map"),
//!     ],
//! )
//! ```
//!
//! A frame without parent is added as a new root, a frame without transform gets the identity.

use crate::error::{FrameGraphError, FrameGraphResult};
use crate::transform::Transform;
use crate::tree::DEFAULT_ROOT_FRAME;
use ron::extensions::Extensions;
use ron::Options;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;

fn default_root() -> String {
    DEFAULT_ROOT_FRAME.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl FrameConfig {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            parent: None,
            transform: None,
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameTreeConfig {
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default)]
    pub frames: Vec<FrameConfig>,
}

impl Default for FrameTreeConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            frames: Vec::new(),
        }
    }
}

impl FrameTreeConfig {
    fn get_options() -> Options {
        Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .with_default_extension(Extensions::UNWRAP_NEWTYPES)
    }

    pub fn serialize_ron(&self) -> FrameGraphResult<String> {
        let pretty = ron::ser::PrettyConfig::default();
        Self::get_options()
            .to_string_pretty(self, pretty)
            .map_err(|e| FrameGraphError::Config(format!("Failed to serialize configuration: {e}")))
    }

    pub fn deserialize_ron(ron: &str) -> FrameGraphResult<Self> {
        Self::get_options()
            .from_str(ron)
            .map_err(|e| FrameGraphError::Config(format!("Syntax Error in config: {e}")))
    }
}

/// Read a frame tree configuration from a file.
pub fn read_configuration(config_filename: &str) -> FrameGraphResult<FrameTreeConfig> {
    let config_content = read_to_string(config_filename).map_err(|e| {
        FrameGraphError::Config(format!(
            "Failed to read configuration file {config_filename:?}: {e}"
        ))
    })?;
    read_configuration_str(&config_content)
}

/// Read a frame tree configuration from a string.
pub fn read_configuration_str(config_content: &str) -> FrameGraphResult<FrameTreeConfig> {
    FrameTreeConfig::deserialize_ron(config_content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        let config = read_configuration_str(
            r#"(
                root: "world",
                frames: [
                    (id: "base_link", parent: "world", transform: (translation: (0.0, 0.0, 0.3))),
                    (id: "lidar", parent: "base_link"),
                    (id: "map"),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(config.root, "world");
        assert_eq!(config.frames.len(), 3);
        assert_eq!(config.frames[0].parent.as_deref(), Some("world"));
        let tf = config.frames[0].transform.unwrap();
        assert_eq!(tf.translation, [0.0, 0.0, 0.3]);
        assert_eq!(tf.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert!(config.frames[1].transform.is_none());
        assert!(config.frames[2].parent.is_none());
    }

    #[test]
    fn test_defaults() {
        let config = read_configuration_str("(frames: [])").unwrap();
        assert_eq!(config, FrameTreeConfig::default());
        assert_eq!(config.root, "root");
    }

    #[test]
    fn test_syntax_error() {
        let result = read_configuration_str("(frames: [ (parent: ) ])");
        assert!(matches!(result, Err(FrameGraphError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = read_configuration("/definitely/not/here.ron");
        assert!(matches!(result, Err(FrameGraphError::Config(_))));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = FrameTreeConfig {
            root: "world".to_string(),
            frames: vec![
                FrameConfig::new("base_link")
                    .with_parent("world")
                    .with_transform(Transform::from_translation(1.0, 0.0, 0.0)),
                FrameConfig::new("map"),
            ],
        };
        let serialized = config.serialize_ron().unwrap();
        assert_eq!(FrameTreeConfig::deserialize_ron(&serialized).unwrap(), config);
    }
}
