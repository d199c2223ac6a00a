//! Terrain fragment decoding
//!
//! Terrain is split into fragments that share one vertex buffer, one UV
//! buffer and one index buffer. Each fragment stores its texture config
//! ranges and indices biased by its position in those shared buffers; both
//! biases are removed here so every fragment decodes to a self-contained mesh.

use super::reader::{decode_indices, decode_texture_configs, decode_vertices};
use super::types::{Mesh, TexConfigShape, UV_STRIDE, VertexLayout, config_index_count};
use crate::config::CodecLimits;
use crate::error::{Error, Result};
use crate::formats::common::{Block, Decoded, DiagnosticLog, checked_count};

/// Size of a terrain fragment header.
pub const TERRAIN_FRAGMENT_SIZE: usize = 0x20;

/// Hands out model ids to decoded terrain fragments.
///
/// The caller owns the counter, so decoding stays free of global state and
/// two levels can be decoded side by side.
#[derive(Debug, Clone, Default)]
pub struct ModelIdCounter {
    next: u32,
}

impl ModelIdCounter {
    pub fn starting_at(first: u16) -> Self {
        Self {
            next: u32::from(first),
        }
    }

    /// Take the next id. `u16::MAX` is handed out like any other id.
    ///
    /// # Errors
    /// Returns `LimitExceeded` once the 16-bit id space is used up.
    pub fn next_id(&mut self) -> Result<u16> {
        let id = u16::try_from(self.next).map_err(|_| Error::LimitExceeded {
            context: "model ids",
            count: self.next as usize + 1,
            limit: usize::from(u16::MAX) + 1,
        })?;
        self.next += 1;
        Ok(id)
    }

    /// The id the next call hands out; `None` once exhausted.
    pub fn peek(&self) -> Option<u16> {
        u16::try_from(self.next).ok()
    }
}

/// Offsets of the buffers every fragment indexes into, relative to the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainBuffers {
    pub vertex_ptr: usize,
    pub uv_ptr: usize,
    pub index_ptr: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainFragment {
    pub id: u16,
    pub culling_center: [f32; 3],
    pub culling_radius: f32,
    /// First vertex of this fragment in the shared vertex buffer.
    pub vertex_start: u16,
    /// First index of this fragment in the shared index buffer.
    pub index_start: i32,
    pub mesh: Mesh,
}

/// Decode the fragment header at `offset` and the geometry it covers.
pub fn decode_terrain_fragment(
    block: &Block<'_>,
    offset: usize,
    buffers: &TerrainBuffers,
    ids: &mut ModelIdCounter,
    limits: &CodecLimits,
) -> Result<Decoded<TerrainFragment>> {
    let mut log = DiagnosticLog::default();
    block.slice(offset, TERRAIN_FRAGMENT_SIZE, "terrain fragment")?;
    let abs = block.base() + offset;

    let culling_center = block.read_vec3(offset, "terrain fragment")?;
    let culling_radius = block.read_f32(offset + 0x0C, "terrain fragment")?;
    let config_ptr = block.read_ptr(offset + 0x10, "terrain texture config pointer")?;
    let config_count = checked_count(
        i64::from(block.read_u16(offset + 0x14, "terrain fragment")?),
        limits.max_texture_configs,
        "terrain texture config count",
    )?;
    let vertex_start = block.read_u16(offset + 0x16, "terrain fragment")?;
    let vertex_count = checked_count(
        i64::from(block.read_u16(offset + 0x18, "terrain fragment")?),
        limits.max_vertices,
        "terrain vertex count",
    )?;
    log.expect_zero(
        "terrain fragment reserved",
        abs + 0x1A,
        i64::from(block.read_u16(offset + 0x1A, "terrain fragment")?),
    );
    log.expect_zero(
        "terrain fragment reserved",
        abs + 0x1C,
        i64::from(block.read_i32(offset + 0x1C, "terrain fragment")?),
    );

    let (texture_configs, index_start) = match config_ptr {
        Some(ptr) if config_count > 0 => {
            let index_start = block.read_i32(ptr + 0x04, "terrain texture configs")?;
            let configs = decode_texture_configs(block, ptr, config_count, TexConfigShape::Wide, true)?;
            (configs, index_start)
        }
        _ => {
            log.expect_zero("terrain texture config count", abs + 0x14, config_count as i64);
            (Vec::new(), 0)
        }
    };
    let index_count = config_index_count(&texture_configs, "terrain texture config size")?;
    let index_start_usize = usize::try_from(index_start).map_err(|_| Error::InvalidIndex {
        context: "terrain index start",
        index: i64::from(index_start),
        limit: block.data().len(),
    })?;

    let first_vertex = usize::from(vertex_start);
    let vertices = decode_vertices(
        block,
        buffers.vertex_ptr + first_vertex * VertexLayout::Terrain.stride(),
        vertex_count,
        VertexLayout::Terrain,
        Some(buffers.uv_ptr + first_vertex * UV_STRIDE),
    )?;
    let indices = decode_indices(
        block,
        buffers.index_ptr + index_start_usize * 2,
        index_count,
        vertex_start,
    )?;
    if let Some(&bad) = indices.iter().find(|&&i| usize::from(i) >= vertex_count) {
        return Err(Error::InvalidIndex {
            context: "terrain index",
            index: i64::from(bad),
            limit: vertex_count,
        });
    }

    let id = ids.next_id()?;
    tracing::debug!(
        "Terrain fragment {id} at 0x{abs:X}: {} vertices from {vertex_start}, {} indices from {index_start}",
        vertices.len(),
        indices.len()
    );

    Ok(log.finish(TerrainFragment {
        id,
        culling_center,
        culling_radius,
        vertex_start,
        index_start,
        mesh: Mesh {
            vertices,
            indices,
            texture_configs,
            scale: 1.0,
        },
    }))
}

/// Decode `count` consecutive fragment headers starting at `table_offset`.
pub fn decode_terrain_fragments(
    block: &Block<'_>,
    table_offset: usize,
    count: usize,
    buffers: &TerrainBuffers,
    ids: &mut ModelIdCounter,
    limits: &CodecLimits,
) -> Result<Decoded<Vec<TerrainFragment>>> {
    if count > limits.max_terrain_fragments {
        return Err(Error::LimitExceeded {
            context: "terrain fragment count",
            count,
            limit: limits.max_terrain_fragments,
        });
    }
    let mut log = DiagnosticLog::default();
    let mut fragments = Vec::with_capacity(count);
    for i in 0..count {
        let decoded = decode_terrain_fragment(
            block,
            table_offset + i * TERRAIN_FRAGMENT_SIZE,
            buffers,
            ids,
            limits,
        )?;
        log.extend(decoded.diagnostics);
        fragments.push(decoded.value);
    }
    Ok(log.finish(fragments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::common::Section;

    /// Two fragments sharing buffers; the second starts at vertex 3, index 3.
    fn shared_terrain() -> (Vec<u8>, TerrainBuffers) {
        let mut s = Section::new();
        // Fragment headers at 0x00 and 0x20
        for (config_ptr, vertex_start) in [(0x40, 0u16), (0x58, 3u16)] {
            s.write_vec3([1.0, 2.0, 3.0]);
            s.write_f32(10.0);
            s.write_i32(config_ptr);
            s.write_u16(1);
            s.write_u16(vertex_start);
            s.write_u16(3);
            s.write_u16(0);
            s.write_i32(0);
        }
        // Wide configs at 0x40 and 0x58
        for start in [0, 3] {
            for word in [9, start, 3, 0, 2, 0] {
                s.write_i32(word);
            }
        }
        // Shared vertices at 0x70 (6 x 0x10)
        for i in 0..6 {
            s.write_vec3([i as f32, 0.0, 0.0]);
            s.write_u32(0xFF00_0000 | i);
        }
        // Shared UVs at 0xD0 (6 x 0x08)
        for i in 0..6 {
            s.write_f32(i as f32 / 8.0);
            s.write_f32(0.0);
        }
        // Shared indices at 0x100, biased by each fragment's vertex start
        for i in [0u16, 1, 2, 5, 4, 3] {
            s.write_u16(i);
        }
        let buffers = TerrainBuffers {
            vertex_ptr: 0x70,
            uv_ptr: 0xD0,
            index_ptr: 0x100,
        };
        (s.into_bytes(), buffers)
    }

    #[test]
    fn test_fragments_are_unbiased() {
        let (data, buffers) = shared_terrain();
        let mut ids = ModelIdCounter::starting_at(100);
        let decoded = decode_terrain_fragments(
            &Block::new(&data),
            0,
            2,
            &buffers,
            &mut ids,
            &CodecLimits::default(),
        )
        .unwrap();
        assert!(decoded.is_clean());

        let [first, second] = decoded.value.as_slice() else {
            panic!("expected two fragments");
        };
        assert_eq!((first.id, second.id), (100, 101));
        assert_eq!(ids.peek(), Some(102));
        assert_eq!(second.mesh.indices, vec![2, 1, 0]);
        assert_eq!(second.mesh.texture_configs[0].start, 0);
        assert_eq!(second.index_start, 3);
        assert_eq!(second.mesh.vertices[0].position[0], 3.0);
        assert_eq!(second.mesh.vertices[0].uv[0], 3.0 / 8.0);
        assert_eq!(second.mesh.vertices[2].color, 0xFF00_0005);
    }

    #[test]
    fn test_id_counter_exhaustion() {
        let mut ids = ModelIdCounter::starting_at(u16::MAX - 1);
        assert_eq!(ids.next_id().unwrap(), u16::MAX - 1);
        assert_eq!(ids.next_id().unwrap(), u16::MAX);
        assert_eq!(ids.peek(), None);
        assert!(matches!(ids.next_id(), Err(Error::LimitExceeded { context: "model ids", .. })));
        assert!(ids.next_id().is_err());
    }

    #[test]
    fn test_fragment_count_uses_terrain_limit() {
        let (data, buffers) = shared_terrain();
        let limits = CodecLimits {
            max_terrain_fragments: 1,
            max_collision_buckets: 0,
            ..CodecLimits::default()
        };
        let mut ids = ModelIdCounter::default();
        let err = decode_terrain_fragments(&Block::new(&data), 0, 2, &buffers, &mut ids, &limits)
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { count: 2, limit: 1, .. }));
        assert_eq!(ids.peek(), Some(0));

        let one = decode_terrain_fragments(&Block::new(&data), 0, 1, &buffers, &mut ids, &limits)
            .unwrap();
        assert_eq!(one.value.len(), 1);
    }
}
