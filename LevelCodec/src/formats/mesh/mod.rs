//! Mesh geometry codec
//!
//! Decodes and encodes the vertex, index and texture config tables shared by
//! every model kind. Four vertex layouts exist on disk:
//!
//! | Layout        | Stride | Fields                                           |
//! |---------------|--------|--------------------------------------------------|
//! | `Skinned`     | 0x28   | position, normal, uv, bone weights, bone ids     |
//! | `SplitStatic` | 0x18   | position, normal (+ 0x08 UV buffer)              |
//! | `Skybox`      | 0x18   | position, uv, packed color                       |
//! | `Terrain`     | 0x10   | position, packed color (+ 0x08 UV buffer)        |
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

pub mod reader;
pub mod terrain;
pub mod types;
pub mod writer;

pub use reader::{
    MeshHeader, decode_indices, decode_static_mesh, decode_texture_configs, decode_vertices,
};
pub use terrain::{
    ModelIdCounter, TerrainBuffers, TerrainFragment, decode_terrain_fragment,
    decode_terrain_fragments,
};
pub use types::{
    MESH_HEADER_SIZE, Mesh, TexConfigShape, TextureConfig, Vertex, VertexLayout,
    config_index_count, floats_per_vertex, partition_error,
};
pub use writer::{encode_indices, encode_static_mesh, encode_texture_configs, encode_vertices};
