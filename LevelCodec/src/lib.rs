#![allow(non_snake_case)]
//! # LevelCodec
//!
//! A pure-Rust codec for the binary level assets of a console-era 3D
//! platformer.
//!
//! ## Supported Formats
//!
//! - **Meshes** - Vertex, index and texture config tables in four layouts
//! - **Rigs** - Skinned models with skeletons, animations, sounds and attachments
//! - **Collision** - Sparse three-level grid decoded to a triangle soup
//! - **DXT5 Textures** - Block decompression to RGBA and PNG export
//!
//! All container data is big-endian; every pointer is relative to the block
//! that owns it.
//!
//! ## Quick Start
//!
//! ### Decoding and Re-encoding a Rig
//!
//! ```no_run
//! use levelcodec::prelude::*;
//!
//! let level = std::fs::read("level.bin")?;
//! let decoded = decode_rig(&level, 0x1200, 5, &CodecLimits::default())?;
//! for diagnostic in &decoded.diagnostics {
//!     println!("{diagnostic}");
//! }
//!
//! let rig = decoded.value;
//! let bytes = encode_rig(&rig, 0x1200)?;
//! # Ok::<(), levelcodec::Error>(())
//! ```
//!
//! ### Sampling an Animation
//!
//! ```no_run
//! use levelcodec::prelude::*;
//!
//! # let level = std::fs::read("level.bin")?;
//! let rig = decode_rig(&level, 0x1200, 5, &CodecLimits::default())?.value;
//! let skeleton = Skeleton::from_rig(&rig)?;
//! let pose = rig.sample_pose(0, 3, 0.25)?;
//! let palette = skeleton.skinning_matrices(&pose);
//! # Ok::<(), levelcodec::Error>(())
//! ```
//!
//! ### Exporting a Texture
//!
//! ```no_run
//! use levelcodec::converter::convert_dxt5_to_png;
//!
//! convert_dxt5_to_png("level.bin", 0x8000, 128, 128, "texture.png")?;
//! # Ok::<(), levelcodec::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `levelcodec` command-line binary

pub mod config;
pub mod converter;
pub mod error;
pub mod formats;
pub mod model;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::CodecLimits;
    pub use crate::error::{Error, Result};
    pub use crate::formats::common::{Block, Decoded, Diagnostic};

    // Meshes
    pub use crate::formats::mesh::{
        Mesh, ModelIdCounter, TerrainBuffers, TerrainFragment, TexConfigShape, TextureConfig,
        Vertex, VertexLayout, decode_static_mesh, decode_terrain_fragments, encode_static_mesh,
    };

    // Rigs
    pub use crate::formats::rig::{
        Animation, BoneTransform, Rig, RigMesh, RigSummary, Skeleton, decode_rig, encode_rig,
    };

    // Collision and textures
    pub use crate::formats::collision::{CollisionMesh, CollisionSummary, decode_collision};
    pub use crate::formats::texture::{CompressedTexture, decode_dxt5};

    pub use crate::model::{Capabilities, Model, ModelKind, StaticModel};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
