//! Mesh data structures.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use serde::Serialize;

use crate::error::{Error, Result};

/// Size of the mesh sub-header shared by rigs and static models.
pub const MESH_HEADER_SIZE: usize = 0x20;

/// Size of one record in a separate UV buffer.
pub const UV_STRIDE: usize = 0x08;

/// On-disk vertex field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexLayout {
    /// 0x28: position, normal, uv, packed bone weights, packed bone ids.
    Skinned,
    /// 0x18 position + normal, UVs in a separate 0x08 buffer.
    SplitStatic,
    /// 0x18: position, uv, packed color at 0x14.
    Skybox,
    /// 0x10 position + packed color, UVs in a separate 0x08 buffer.
    Terrain,
}

impl VertexLayout {
    pub const fn stride(self) -> usize {
        match self {
            Self::Skinned => 0x28,
            Self::SplitStatic | Self::Skybox => 0x18,
            Self::Terrain => 0x10,
        }
    }

    /// Whether UVs live in their own buffer.
    pub const fn has_separate_uvs(self) -> bool {
        matches!(self, Self::SplitStatic | Self::Terrain)
    }

    pub const fn has_normals(self) -> bool {
        matches!(self, Self::Skinned | Self::SplitStatic)
    }

    pub const fn has_vertex_color(self) -> bool {
        matches!(self, Self::Skybox | Self::Terrain)
    }

    pub const fn has_skin(self) -> bool {
        matches!(self, Self::Skinned)
    }
}

impl FromStr for VertexLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skinned" | "rig" => Ok(Self::Skinned),
            "static" | "split" | "split-static" => Ok(Self::SplitStatic),
            "skybox" | "sky" => Ok(Self::Skybox),
            "terrain" => Ok(Self::Terrain),
            _ => Err(Error::UnsupportedVariant {
                context: "vertex layout",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for VertexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skinned => "skinned",
            Self::SplitStatic => "split-static",
            Self::Skybox => "skybox",
            Self::Terrain => "terrain",
        };
        f.write_str(name)
    }
}

/// On-disk texture config record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TexConfigShape {
    /// 0x10: id, start, size, mode.
    Compact,
    /// 0x18: id, start, size, reserved, mode, reserved.
    Wide,
}

impl TexConfigShape {
    pub const fn size(self) -> usize {
        match self {
            Self::Compact => 0x10,
            Self::Wide => 0x18,
        }
    }

    /// Select a shape by element size.
    ///
    /// # Errors
    /// Returns `UnsupportedVariant` for any size other than 0x10 or 0x18.
    pub fn from_elem_size(size: usize) -> Result<Self> {
        match size {
            0x10 => Ok(Self::Compact),
            0x18 => Ok(Self::Wide),
            _ => Err(Error::UnsupportedVariant {
                context: "texture config element size",
                value: format!("0x{size:X}"),
            }),
        }
    }
}

/// A (material, index range, render mode) record partitioning the index buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextureConfig {
    pub id: i32,
    pub start: i32,
    pub size: i32,
    pub mode: i32,
    /// Opaque words interleaved in the wide shape.
    pub reserved: [i32; 2],
}

/// A vertex with every attribute any layout can carry.
///
/// Attributes a layout does not store stay zeroed. The struct is `Pod` so a
/// mesh's vertex list can be handed to a renderer as one flat buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Packed RGBA (skybox and terrain).
    pub color: u32,
    pub bone_weights: [u8; 4],
    pub bone_ids: [u8; 4],
}

/// Geometry shared by every model kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub texture_configs: Vec<TextureConfig>,
    pub scale: f32,
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            texture_configs: Vec::new(),
            scale: 1.0,
        }
    }
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty() && self.texture_configs.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// The vertex list as raw bytes, in `Vertex` field order.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Vertices packed as consecutive `f32`s with only the attributes
    /// `layout` carries: position, normal, uv, color (4 normalized channels),
    /// then bone weights (normalized) and bone ids.
    pub fn flat_vertex_buffer(&self, layout: VertexLayout) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.vertices.len() * floats_per_vertex(layout));
        for v in &self.vertices {
            out.extend_from_slice(&v.position);
            if layout.has_normals() {
                out.extend_from_slice(&v.normal);
            }
            out.extend_from_slice(&v.uv);
            if layout.has_vertex_color() {
                out.extend(v.color.to_be_bytes().map(|c| f32::from(c) / 255.0));
            }
            if layout.has_skin() {
                out.extend(v.bone_weights.map(|w| f32::from(w) / 255.0));
                out.extend(v.bone_ids.map(f32::from));
            }
        }
        out
    }

    /// [`Mesh::flat_vertex_buffer`] as bytes, ready for upload.
    pub fn flat_vertex_bytes(&self, layout: VertexLayout) -> Vec<u8> {
        bytemuck::cast_slice(&self.flat_vertex_buffer(layout)).to_vec()
    }

    /// Index range covered by one texture config.
    pub fn config_indices(&self, config: &TextureConfig) -> Option<&[u16]> {
        let start = usize::try_from(config.start).ok()?;
        let size = usize::try_from(config.size).ok()?;
        self.indices.get(start..start.checked_add(size)?)
    }
}

/// Width of one vertex in [`Mesh::flat_vertex_buffer`], in floats.
pub const fn floats_per_vertex(layout: VertexLayout) -> usize {
    let mut n = 3 + 2;
    if layout.has_normals() {
        n += 3;
    }
    if layout.has_vertex_color() {
        n += 4;
    }
    if layout.has_skin() {
        n += 8;
    }
    n
}

/// Number of indices covered by a config list.
///
/// # Errors
/// Returns `InvalidCount` if any config has a negative size.
pub fn config_index_count(configs: &[TextureConfig], context: &'static str) -> Result<usize> {
    configs.iter().try_fold(0usize, |total, config| {
        usize::try_from(config.size)
            .map(|size| total + size)
            .map_err(|_| Error::InvalidCount {
                context,
                count: i64::from(config.size),
            })
    })
}

/// Describe the first way `configs` fails to partition `index_count` indices.
///
/// Configs must be ordered by start, cover whole triangles, and tile the
/// index buffer with no gap or overlap.
pub fn partition_error(configs: &[TextureConfig], index_count: usize) -> Option<String> {
    let mut expected_start = 0i64;
    for (i, config) in configs.iter().enumerate() {
        if config.size < 0 || config.size % 3 != 0 {
            return Some(format!("texture config {i} size {} is not a multiple of 3", config.size));
        }
        if i64::from(config.start) != expected_start {
            return Some(format!(
                "texture config {i} starts at {} but the previous range ends at {expected_start}",
                config.start
            ));
        }
        expected_start += i64::from(config.size);
    }
    if expected_start != index_count as i64 {
        return Some(format!(
            "texture configs cover {expected_start} indices but the index buffer holds {index_count}"
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(start: i32, size: i32) -> TextureConfig {
        TextureConfig {
            start,
            size,
            ..TextureConfig::default()
        }
    }

    #[test]
    fn test_layout_strides() {
        assert_eq!(VertexLayout::Skinned.stride(), 0x28);
        assert_eq!(VertexLayout::SplitStatic.stride(), 0x18);
        assert_eq!(VertexLayout::Skybox.stride(), 0x18);
        assert!(!VertexLayout::Skybox.has_normals());
        assert!(VertexLayout::Terrain.has_separate_uvs());
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
    }

    #[test]
    fn test_shape_from_elem_size() {
        assert_eq!(TexConfigShape::from_elem_size(0x10).unwrap(), TexConfigShape::Compact);
        assert_eq!(TexConfigShape::from_elem_size(0x18).unwrap(), TexConfigShape::Wide);
        assert!(matches!(
            TexConfigShape::from_elem_size(0x14),
            Err(Error::UnsupportedVariant { .. })
        ));
    }

    #[test]
    fn test_partition_checks() {
        assert_eq!(partition_error(&[config(0, 3), config(3, 6)], 9), None);
        assert!(partition_error(&[config(0, 4)], 4).is_some());
        assert!(partition_error(&[config(0, 3), config(6, 3)], 9).is_some());
        assert!(partition_error(&[config(0, 3)], 6).is_some());
        assert_eq!(partition_error(&[], 0), None);
    }

    #[test]
    fn test_flat_vertex_buffer_keeps_layout_attributes() {
        let mesh = Mesh {
            vertices: vec![Vertex {
                position: [1.0, 2.0, 3.0],
                uv: [0.5, 0.25],
                color: 0xFF00_00FF,
                ..Vertex::default()
            }],
            ..Mesh::default()
        };
        let flat = mesh.flat_vertex_buffer(VertexLayout::Skybox);
        assert_eq!(flat.len(), floats_per_vertex(VertexLayout::Skybox));
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 0.5, 0.25, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mesh.flat_vertex_bytes(VertexLayout::Skybox).len(), 9 * 4);
        assert_eq!(floats_per_vertex(VertexLayout::Skinned), 16);
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!("Skybox".parse::<VertexLayout>().unwrap(), VertexLayout::Skybox);
        assert!("voxel".parse::<VertexLayout>().is_err());
    }
}
