//! Level asset formats

pub mod collision;
pub mod common;
pub mod mesh;
pub mod rig;
pub mod texture;

pub use collision::{CollisionMesh, decode_collision};
pub use common::{Decoded, Diagnostic};
pub use mesh::{Mesh, TexConfigShape, TextureConfig, Vertex, VertexLayout};
pub use rig::{Rig, decode_rig, encode_rig};
pub use texture::{CompressedTexture, decode_dxt5};
