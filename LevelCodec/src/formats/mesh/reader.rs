//! Mesh table decoding
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use byteorder::ByteOrder;

use super::types::{
    MESH_HEADER_SIZE, Mesh, TexConfigShape, TextureConfig, UV_STRIDE, Vertex, VertexLayout,
    config_index_count, partition_error,
};
use crate::config::CodecLimits;
use crate::error::{Error, Result};
use crate::formats::common::{Block, Decoded, DiagnosticLog, Endian, checked_count};

/// The mesh sub-header (0x20 bytes).
///
/// Pointers are relative to the block that owns the mesh (the rig base for
/// skinned models, the mesh block itself for static models).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshHeader {
    pub tex_config_count: i32,
    pub extra_tex_config_count: i32,
    pub tex_config_ptr: Option<usize>,
    pub extra_tex_config_ptr: Option<usize>,
    pub vertex_ptr: Option<usize>,
    pub index_ptr: Option<usize>,
    pub vertex_count: u16,
    pub extra_vertex_count: u16,
    /// UV buffer for split layouts; reserved otherwise.
    pub uv_ptr: i32,
}

impl MeshHeader {
    pub fn read(block: &Block<'_>, offset: usize) -> Result<Self> {
        block.slice(offset, MESH_HEADER_SIZE, "mesh header")?;
        Ok(Self {
            tex_config_count: block.read_i32(offset, "mesh header")?,
            extra_tex_config_count: block.read_i32(offset + 0x04, "mesh header")?,
            tex_config_ptr: block.read_ptr(offset + 0x08, "texture config pointer")?,
            extra_tex_config_ptr: block.read_ptr(offset + 0x0C, "extra texture config pointer")?,
            vertex_ptr: block.read_ptr(offset + 0x10, "vertex pointer")?,
            index_ptr: block.read_ptr(offset + 0x14, "index pointer")?,
            vertex_count: block.read_u16(offset + 0x18, "mesh header")?,
            extra_vertex_count: block.read_u16(offset + 0x1A, "mesh header")?,
            uv_ptr: block.read_i32(offset + 0x1C, "mesh header")?,
        })
    }
}

/// Decode `count` vertices of the given layout.
///
/// Split layouts take their UVs from `uv_ptr`; a null UV pointer leaves UVs
/// zeroed.
pub fn decode_vertices(
    block: &Block<'_>,
    vertex_ptr: usize,
    count: usize,
    layout: VertexLayout,
    uv_ptr: Option<usize>,
) -> Result<Vec<Vertex>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let stride = layout.stride();
    let raw = block.table(vertex_ptr, count, stride, "vertex buffer")?;
    let uvs = match uv_ptr {
        Some(ptr) if layout.has_separate_uvs() => {
            Some(block.table(ptr, count, UV_STRIDE, "uv buffer")?)
        }
        _ => None,
    };

    let mut vertices = Vec::with_capacity(count);
    for (i, v) in raw.chunks_exact(stride).enumerate() {
        let f = |at: usize| Endian::read_f32(&v[at..at + 4]);
        let mut vertex = Vertex {
            position: [f(0x00), f(0x04), f(0x08)],
            ..Vertex::default()
        };
        match layout {
            VertexLayout::Skinned => {
                vertex.normal = [f(0x0C), f(0x10), f(0x14)];
                vertex.uv = [f(0x18), f(0x1C)];
                vertex.bone_weights = Endian::read_u32(&v[0x20..0x24]).to_be_bytes();
                vertex.bone_ids = Endian::read_u32(&v[0x24..0x28]).to_be_bytes();
            }
            VertexLayout::SplitStatic => {
                vertex.normal = [f(0x0C), f(0x10), f(0x14)];
            }
            VertexLayout::Skybox => {
                vertex.uv = [f(0x0C), f(0x10)];
                vertex.color = Endian::read_u32(&v[0x14..0x18]);
            }
            VertexLayout::Terrain => {
                vertex.color = Endian::read_u32(&v[0x0C..0x10]);
            }
        }
        if let Some(uvs) = uvs {
            let uv = &uvs[i * UV_STRIDE..(i + 1) * UV_STRIDE];
            vertex.uv = [Endian::read_f32(&uv[0..4]), Endian::read_f32(&uv[4..8])];
        }
        vertices.push(vertex);
    }
    Ok(vertices)
}

/// Decode `count` texture configs of the given shape.
///
/// With `negate_first`, the first entry's start is subtracted from every
/// entry so ranges become local to the decoded index buffer.
pub fn decode_texture_configs(
    block: &Block<'_>,
    ptr: usize,
    count: usize,
    shape: TexConfigShape,
    negate_first: bool,
) -> Result<Vec<TextureConfig>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let size = shape.size();
    let raw = block.table(ptr, count, size, "texture configs")?;
    let mut configs: Vec<TextureConfig> = raw
        .chunks_exact(size)
        .map(|c| {
            let word = |at: usize| Endian::read_i32(&c[at..at + 4]);
            match shape {
                TexConfigShape::Compact => TextureConfig {
                    id: word(0x00),
                    start: word(0x04),
                    size: word(0x08),
                    mode: word(0x0C),
                    reserved: [0, 0],
                },
                TexConfigShape::Wide => TextureConfig {
                    id: word(0x00),
                    start: word(0x04),
                    size: word(0x08),
                    mode: word(0x10),
                    reserved: [word(0x0C), word(0x14)],
                },
            }
        })
        .collect();

    if negate_first {
        let bias = configs[0].start;
        for config in &mut configs {
            config.start = config.start.checked_sub(bias).ok_or(Error::InvalidIndex {
                context: "biased texture config start",
                index: i64::from(config.start),
                limit: i32::MAX as usize,
            })?;
        }
    }
    Ok(configs)
}

/// Decode `count` u16 indices, subtracting `vertex_bias` from each.
///
/// # Errors
/// Returns `InvalidIndex` if a stored index is below the bias.
pub fn decode_indices(
    block: &Block<'_>,
    ptr: usize,
    count: usize,
    vertex_bias: u16,
) -> Result<Vec<u16>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let raw = block.table(ptr, count, 2, "index buffer")?;
    raw.chunks_exact(2)
        .map(|c| {
            let stored = Endian::read_u16(c);
            stored.checked_sub(vertex_bias).ok_or(Error::InvalidIndex {
                context: "biased index",
                index: i64::from(stored),
                limit: usize::from(vertex_bias),
            })
        })
        .collect()
}

/// Decode a texture config table referenced by a header, flagging a count
/// paired with a null pointer.
pub(crate) fn decode_config_table(
    block: &Block<'_>,
    ptr: Option<usize>,
    count: i32,
    shape: TexConfigShape,
    limits: &CodecLimits,
    log: &mut DiagnosticLog,
    context: &'static str,
    count_offset: usize,
) -> Result<Vec<TextureConfig>> {
    let count = checked_count(i64::from(count), limits.max_texture_configs, context)?;
    match ptr {
        Some(ptr) => decode_texture_configs(block, ptr, count, shape, false),
        None => {
            log.expect_zero(context, count_offset, count as i64);
            Ok(Vec::new())
        }
    }
}

/// Report configs that do not partition their index table.
pub(crate) fn check_partition(
    configs: &[TextureConfig],
    index_count: usize,
    log: &mut DiagnosticLog,
    context: &'static str,
    offset: usize,
) {
    if let Some(message) = partition_error(configs, index_count) {
        tracing::warn!("{context}: {message}");
        log.report(context, offset, index_count as i64);
    }
}

/// Decode a static mesh block: a mesh sub-header at `header_offset` and the
/// tables it points to.
pub fn decode_static_mesh(
    block: &Block<'_>,
    header_offset: usize,
    layout: VertexLayout,
    shape: TexConfigShape,
    scale: f32,
    limits: &CodecLimits,
) -> Result<Decoded<Mesh>> {
    let mut log = DiagnosticLog::default();
    let header = MeshHeader::read(block, header_offset)?;
    let header_abs = block.base() + header_offset;

    log.expect_zero(
        "extra texture config count",
        header_abs + 0x04,
        i64::from(header.extra_tex_config_count),
    );
    log.expect_zero(
        "extra vertex count",
        header_abs + 0x1A,
        i64::from(header.extra_vertex_count),
    );
    let uv_ptr = if layout.has_separate_uvs() {
        checked_ptr(header.uv_ptr, block, "uv pointer")?
    } else {
        log.expect_zero("uv pointer", header_abs + 0x1C, i64::from(header.uv_ptr));
        None
    };

    let texture_configs = decode_config_table(
        block,
        header.tex_config_ptr,
        header.tex_config_count,
        shape,
        limits,
        &mut log,
        "texture config count",
        header_abs,
    )?;
    let index_count = config_index_count(&texture_configs, "texture config size")?;
    check_partition(&texture_configs, index_count, &mut log, "texture config partition", header_abs);

    let vertex_count = checked_count(
        i64::from(header.vertex_count),
        limits.max_vertices,
        "vertex count",
    )?;
    let vertices = match header.vertex_ptr {
        Some(ptr) => decode_vertices(block, ptr, vertex_count, layout, uv_ptr)?,
        None => {
            log.expect_zero("vertex count", header_abs + 0x18, vertex_count as i64);
            Vec::new()
        }
    };
    let indices = match header.index_ptr {
        Some(ptr) => decode_indices(block, ptr, index_count, 0)?,
        None => {
            log.expect_zero("index count", header_abs + 0x14, index_count as i64);
            Vec::new()
        }
    };

    tracing::debug!(
        "Decoded {layout} mesh at 0x{header_abs:X}: {} vertices, {} indices, {} texture configs",
        vertices.len(),
        indices.len(),
        texture_configs.len()
    );

    Ok(log.finish(Mesh {
        vertices,
        indices,
        texture_configs,
        scale,
    }))
}

pub(crate) fn checked_ptr(raw: i32, block: &Block<'_>, context: &'static str) -> Result<Option<usize>> {
    match raw {
        0 => Ok(None),
        p if p < 0 => Err(Error::InvalidIndex {
            context,
            index: i64::from(p),
            limit: block.data().len(),
        }),
        p => Ok(Some(p as usize)),
    }
}
