use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::config::CodecLimits;
use crate::formats::mesh::{TexConfigShape, VertexLayout};

pub mod collision;
pub mod mesh;
pub mod rig;
pub mod texture;

/// Parse a decimal or `0x`-prefixed hexadecimal offset.
fn parse_offset(s: &str) -> Result<usize, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("Invalid offset '{s}': {e}"))
}

/// Load codec limits from an optional TOML file.
pub(crate) fn load_limits(path: Option<&Path>) -> anyhow::Result<CodecLimits> {
    match path {
        Some(path) => Ok(CodecLimits::load(path)?),
        None => Ok(CodecLimits::default()),
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Skinned rig operations
    Rig {
        #[command(subcommand)]
        command: RigCommands,
    },

    /// Mesh block operations
    Mesh {
        #[command(subcommand)]
        command: MeshCommands,
    },

    /// Collision grid operations
    Collision {
        #[command(subcommand)]
        command: CollisionCommands,
    },

    /// DXT5 texture operations
    Texture {
        #[command(subcommand)]
        command: TextureCommands,
    },
}

#[derive(Subcommand)]
pub enum RigCommands {
    /// Show the structure of a rig
    Inspect {
        /// Level file
        #[arg(short, long)]
        file: PathBuf,

        /// Offset of the rig header (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = parse_offset)]
        offset: usize,

        /// Model id of the rig
        #[arg(long)]
        id: u16,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// TOML file overriding the codec limits
        #[arg(long)]
        limits: Option<PathBuf>,
    },

    /// Decode a rig and encode it again
    Roundtrip {
        /// Level file
        #[arg(short, long)]
        file: PathBuf,

        /// Offset of the rig header (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = parse_offset)]
        offset: usize,

        /// Model id of the rig
        #[arg(long)]
        id: u16,

        /// Where to write the re-encoded rig
        #[arg(long)]
        output: PathBuf,

        /// TOML file overriding the codec limits
        #[arg(long)]
        limits: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum MeshCommands {
    /// Show the tables of a static mesh block
    Inspect {
        /// Level file
        #[arg(short, long)]
        file: PathBuf,

        /// Offset of the mesh block (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = parse_offset)]
        offset: usize,

        /// Vertex layout (skinned, split-static, skybox, terrain)
        #[arg(long, default_value = "split-static")]
        layout: VertexLayout,

        /// Texture config records are 0x18 bytes instead of 0x10
        #[arg(long)]
        wide_configs: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// TOML file overriding the codec limits
        #[arg(long)]
        limits: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CollisionCommands {
    /// Decode a collision grid and summarize it
    Inspect {
        /// Level file
        #[arg(short, long)]
        file: PathBuf,

        /// Offset of the collision index (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = parse_offset)]
        offset: usize,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// TOML file overriding the codec limits
        #[arg(long)]
        limits: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum TextureCommands {
    /// Decompress a DXT5 surface to PNG
    Export {
        /// Level file
        #[arg(short, long)]
        file: PathBuf,

        /// Offset of the first block (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = parse_offset)]
        offset: usize,

        /// Surface width in pixels
        #[arg(long)]
        width: u32,

        /// Surface height in pixels
        #[arg(long)]
        height: u32,

        /// Output PNG file
        #[arg(long)]
        output: PathBuf,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Rig { command } => command.execute(),
            Commands::Mesh { command } => command.execute(),
            Commands::Collision { command } => command.execute(),
            Commands::Texture { command } => command.execute(),
        }
    }
}

impl RigCommands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            RigCommands::Inspect {
                file,
                offset,
                id,
                json,
                limits,
            } => rig::inspect(file, *offset, *id, *json, limits.as_deref()),
            RigCommands::Roundtrip {
                file,
                offset,
                id,
                output,
                limits,
            } => rig::roundtrip(file, *offset, *id, output, limits.as_deref()),
        }
    }
}

impl MeshCommands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            MeshCommands::Inspect {
                file,
                offset,
                layout,
                wide_configs,
                json,
                limits,
            } => {
                let shape = if *wide_configs {
                    TexConfigShape::Wide
                } else {
                    TexConfigShape::Compact
                };
                mesh::inspect(file, *offset, *layout, shape, *json, limits.as_deref())
            }
        }
    }
}

impl CollisionCommands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            CollisionCommands::Inspect {
                file,
                offset,
                json,
                limits,
            } => collision::inspect(file, *offset, *json, limits.as_deref()),
        }
    }
}

impl TextureCommands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            TextureCommands::Export {
                file,
                offset,
                width,
                height,
                output,
            } => texture::export(file, *offset, *width, *height, output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("4096"), Ok(4096));
        assert_eq!(parse_offset("0x1200"), Ok(0x1200));
        assert_eq!(parse_offset("0XFF"), Ok(0xFF));
        assert!(parse_offset("0xZZ").is_err());
    }
}
