//! Spatial collision decoder

pub mod reader;
pub mod types;

pub use reader::{decode_collision, decode_collision_with_stats};
pub use types::{CollisionMesh, CollisionSummary, CollisionVertex, classification_color};
