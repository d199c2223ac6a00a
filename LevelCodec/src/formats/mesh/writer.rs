//! Mesh table encoding
//!
//! The table writers reproduce the reader's field layouts exactly; where each
//! table lands is decided by the caller.

use super::types::{
    MESH_HEADER_SIZE, Mesh, TexConfigShape, TextureConfig, UV_STRIDE, Vertex, VertexLayout,
    partition_error,
};
use crate::error::{Error, Result};
use crate::formats::common::{Section, align_up};

/// Planned offsets of a mesh sub-header's tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshOffsets {
    pub tex_configs: Option<usize>,
    pub extra_tex_configs: Option<usize>,
    pub vertices: Option<usize>,
    pub indices: Option<usize>,
    pub uvs: Option<usize>,
}

/// Write a mesh sub-header.
pub fn write_mesh_header(
    section: &mut Section,
    tex_config_count: usize,
    extra_tex_config_count: usize,
    vertex_count: usize,
    extra_vertex_count: usize,
    offsets: &MeshOffsets,
) {
    let start = section.len();
    section.write_i32(tex_config_count as i32);
    section.write_i32(extra_tex_config_count as i32);
    section.write_ptr(offsets.tex_configs);
    section.write_ptr(offsets.extra_tex_configs);
    section.write_ptr(offsets.vertices);
    section.write_ptr(offsets.indices);
    section.write_u16(vertex_count as u16);
    section.write_u16(extra_vertex_count as u16);
    section.write_ptr(offsets.uvs);
    debug_assert_eq!(section.len() - start, MESH_HEADER_SIZE);
}

/// Write the vertex buffer for `layout`. Split layouts leave UVs to
/// [`write_uvs`].
pub fn write_vertices(section: &mut Section, vertices: &[Vertex], layout: VertexLayout) {
    for v in vertices {
        section.write_vec3(v.position);
        match layout {
            VertexLayout::Skinned => {
                section.write_vec3(v.normal);
                section.write_f32(v.uv[0]);
                section.write_f32(v.uv[1]);
                section.write_u32(u32::from_be_bytes(v.bone_weights));
                section.write_u32(u32::from_be_bytes(v.bone_ids));
            }
            VertexLayout::SplitStatic => {
                section.write_vec3(v.normal);
            }
            VertexLayout::Skybox => {
                section.write_f32(v.uv[0]);
                section.write_f32(v.uv[1]);
                section.write_u32(v.color);
            }
            VertexLayout::Terrain => {
                section.write_u32(v.color);
            }
        }
    }
}

/// Write the separate UV buffer of a split layout.
pub fn write_uvs(section: &mut Section, vertices: &[Vertex]) {
    for v in vertices {
        section.write_f32(v.uv[0]);
        section.write_f32(v.uv[1]);
    }
}

pub fn write_texture_configs(section: &mut Section, configs: &[TextureConfig], shape: TexConfigShape) {
    for c in configs {
        section.write_i32(c.id);
        section.write_i32(c.start);
        section.write_i32(c.size);
        match shape {
            TexConfigShape::Compact => section.write_i32(c.mode),
            TexConfigShape::Wide => {
                section.write_i32(c.reserved[0]);
                section.write_i32(c.mode);
                section.write_i32(c.reserved[1]);
            }
        }
    }
}

pub fn write_indices(section: &mut Section, indices: &[u16]) {
    for &i in indices {
        section.write_u16(i);
    }
}

/// Encode a vertex buffer on its own.
pub fn encode_vertices(vertices: &[Vertex], layout: VertexLayout) -> Vec<u8> {
    let mut section = Section::with_capacity(vertices.len() * layout.stride());
    write_vertices(&mut section, vertices, layout);
    section.into_bytes()
}

pub fn encode_texture_configs(configs: &[TextureConfig], shape: TexConfigShape) -> Vec<u8> {
    let mut section = Section::with_capacity(configs.len() * shape.size());
    write_texture_configs(&mut section, configs, shape);
    section.into_bytes()
}

pub fn encode_indices(indices: &[u16]) -> Vec<u8> {
    let mut section = Section::with_capacity(indices.len() * 2);
    write_indices(&mut section, indices);
    section.into_bytes()
}

/// Check that a config list and its index table can be written back.
///
/// # Errors
/// Returns `EncodeInvariant` if the configs do not partition `index_count`.
pub fn validate_texture_configs(
    configs: &[TextureConfig],
    index_count: usize,
    context: &str,
) -> Result<()> {
    match partition_error(configs, index_count) {
        Some(message) => Err(Error::encode(format!("{context}: {message}"))),
        None => Ok(()),
    }
}

/// Check a vertex list fits the u16 count field.
pub fn validate_vertex_count(count: usize, context: &str) -> Result<()> {
    if count > usize::from(u16::MAX) {
        return Err(Error::encode(format!(
            "{context}: {count} vertices do not fit a 16-bit count"
        )));
    }
    Ok(())
}

/// Lay out a mesh's primary tables back to back starting at `cursor`, each on
/// a 16-byte boundary. Returns the offsets and the end of the last table.
pub fn plan_mesh_tables(
    mesh: &Mesh,
    layout: VertexLayout,
    shape: TexConfigShape,
    mut cursor: usize,
) -> (MeshOffsets, usize) {
    let mut offsets = MeshOffsets::default();
    let mut place = |len: usize| {
        cursor = align_up(cursor, 16);
        let at = cursor;
        cursor += len;
        at
    };

    if !mesh.texture_configs.is_empty() {
        offsets.tex_configs = Some(place(mesh.texture_configs.len() * shape.size()));
    }
    if !mesh.vertices.is_empty() {
        offsets.vertices = Some(place(mesh.vertices.len() * layout.stride()));
        if layout.has_separate_uvs() {
            offsets.uvs = Some(place(mesh.vertices.len() * UV_STRIDE));
        }
    }
    if !mesh.indices.is_empty() {
        offsets.indices = Some(place(mesh.indices.len() * 2));
    }
    (offsets, cursor)
}

/// Encode a static mesh block: the mesh sub-header followed by its tables.
///
/// Pointers are relative to the start of the returned block. Empty tables
/// are written as null pointers, so a mesh with no configs and no vertices
/// encodes to the bare header.
pub fn encode_static_mesh(
    mesh: &Mesh,
    layout: VertexLayout,
    shape: TexConfigShape,
) -> Result<Vec<u8>> {
    validate_texture_configs(&mesh.texture_configs, mesh.indices.len(), "static mesh")?;
    validate_vertex_count(mesh.vertices.len(), "static mesh")?;

    let (offsets, total) = plan_mesh_tables(mesh, layout, shape, MESH_HEADER_SIZE);
    let mut section = Section::with_capacity(total);

    write_mesh_header(
        &mut section,
        mesh.texture_configs.len(),
        0,
        mesh.vertices.len(),
        0,
        &offsets,
    );
    if let Some(at) = offsets.tex_configs {
        section.pad_to(at);
        write_texture_configs(&mut section, &mesh.texture_configs, shape);
    }
    if let Some(at) = offsets.vertices {
        section.pad_to(at);
        write_vertices(&mut section, &mesh.vertices, layout);
    }
    if let Some(at) = offsets.uvs {
        section.pad_to(at);
        write_uvs(&mut section, &mesh.vertices);
    }
    if let Some(at) = offsets.indices {
        section.pad_to(at);
        write_indices(&mut section, &mesh.indices);
    }

    debug_assert_eq!(section.len(), total);
    Ok(section.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecLimits;
    use crate::formats::common::Block;
    use crate::formats::mesh::decode_static_mesh;
    use pretty_assertions::assert_eq;

    fn triangle_mesh(layout: VertexLayout) -> Mesh {
        let vertices = (0..3)
            .map(|i| {
                let f = i as f32;
                Vertex {
                    position: [f, f + 0.5, -f],
                    normal: if layout.has_normals() { [0.0, 1.0, 0.0] } else { [0.0; 3] },
                    uv: [f * 0.25, 1.0 - f * 0.25],
                    color: if layout.has_vertex_color() { 0x80402010 + i } else { 0 },
                    ..Vertex::default()
                }
            })
            .collect();
        Mesh {
            vertices,
            indices: vec![0, 1, 2],
            texture_configs: vec![TextureConfig {
                id: 4,
                start: 0,
                size: 3,
                mode: 1,
                reserved: [0, 0],
            }],
            scale: 0.5,
        }
    }

    #[test]
    fn test_empty_mesh_is_header_only() {
        let mesh = Mesh::default();
        let bytes = encode_static_mesh(&mesh, VertexLayout::SplitStatic, TexConfigShape::Compact).unwrap();
        assert_eq!(bytes.len(), MESH_HEADER_SIZE);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_static_layouts_roundtrip() {
        for layout in [VertexLayout::SplitStatic, VertexLayout::Skybox, VertexLayout::Terrain] {
            let mesh = triangle_mesh(layout);
            let bytes = encode_static_mesh(&mesh, layout, TexConfigShape::Wide).unwrap();
            let decoded = decode_static_mesh(
                &Block::new(&bytes),
                0,
                layout,
                TexConfigShape::Wide,
                0.5,
                &CodecLimits::default(),
            )
            .unwrap();
            assert!(decoded.is_clean());
            assert_eq!(decoded.value, mesh);
        }
    }

    #[test]
    fn test_tables_are_16_byte_aligned() {
        let mesh = triangle_mesh(VertexLayout::SplitStatic);
        let (offsets, end) =
            plan_mesh_tables(&mesh, VertexLayout::SplitStatic, TexConfigShape::Compact, MESH_HEADER_SIZE);
        assert_eq!(offsets.tex_configs, Some(0x20));
        assert_eq!(offsets.vertices, Some(0x30));
        // 3 * 0x18 = 0x48 bytes of vertices, rounded up
        assert_eq!(offsets.uvs, Some(0x80));
        assert_eq!(offsets.indices, Some(0xA0));
        assert_eq!(end, 0xA6);
    }

    #[test]
    fn test_table_encoders_match_reader_layouts() {
        let mesh = triangle_mesh(VertexLayout::Skybox);
        let bytes = encode_vertices(&mesh.vertices, VertexLayout::Skybox);
        assert_eq!(bytes.len(), 3 * 0x18);
        let decoded = crate::formats::mesh::decode_vertices(&Block::new(&bytes), 0, 3, VertexLayout::Skybox, None).unwrap();
        assert_eq!(decoded, mesh.vertices);

        let configs = encode_texture_configs(&mesh.texture_configs, TexConfigShape::Wide);
        assert_eq!(&configs[0x10..0x14], &1i32.to_be_bytes());
        assert_eq!(encode_indices(&[1, 0x203]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_broken_partition_is_rejected() {
        let mut mesh = triangle_mesh(VertexLayout::SplitStatic);
        mesh.texture_configs[0].size = 2;
        let err = encode_static_mesh(&mesh, VertexLayout::SplitStatic, TexConfigShape::Compact).unwrap_err();
        assert!(matches!(err, Error::EncodeInvariant(_)));
    }
}
