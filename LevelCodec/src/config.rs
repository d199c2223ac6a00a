//! Codec limits
//!
//! Every count read from disk is checked against these caps before anything
//! is allocated, so a corrupt pointer fails fast instead of exhausting memory.
//! Limits can be loaded from a TOML file:
//!
//! ```toml
//! max_vertices = 65535
//! max_bones = 255
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecLimits {
    pub max_vertices: usize,
    pub max_texture_configs: usize,
    pub max_bones: usize,
    pub max_animations: usize,
    pub max_frames: usize,
    pub max_attachments: usize,
    pub max_sounds: usize,
    pub max_collision_buckets: usize,
    pub max_terrain_fragments: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_vertices: u16::MAX as usize,
            max_texture_configs: 1024,
            max_bones: u8::MAX as usize,
            max_animations: u8::MAX as usize,
            max_frames: u8::MAX as usize,
            max_attachments: 64,
            max_sounds: u8::MAX as usize,
            max_collision_buckets: 4096,
            max_terrain_fragments: 4096,
        }
    }
}

impl CodecLimits {
    /// Parse limits from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load limits from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let limits = CodecLimits::from_toml_str("max_bones = 64\n").unwrap();
        assert_eq!(limits.max_bones, 64);
        assert_eq!(limits.max_vertices, CodecLimits::default().max_vertices);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = CodecLimits::from_toml_str("max_bones = \"lots\"").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }
}
