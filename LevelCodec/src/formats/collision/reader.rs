//! Collision grid decoding
//!
//! The collision block is a three-level spatial grid: a Z level whose cells
//! point at Y levels, whose cells point at X levels, whose cells point at
//! leaves. Each level stores the index of its first cell (`shift`) and a
//! table of u32 offsets relative to the collision block, zero meaning an
//! empty cell. Leaf vertices are fixed-point offsets inside their cell.
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use byteorder::ByteOrder;

use super::types::{
    COLLISION_CELL_SIZE, COLLISION_FIXED_ONE, CollisionMesh, CollisionVertex, LEAF_HEADER_SIZE,
    LEAF_TRIANGLE_SIZE, LEAF_VERTEX_SIZE, classification_color,
};
use crate::config::CodecLimits;
use crate::error::{Error, Result};
use crate::formats::common::{Block, Decoded, DiagnosticLog, Endian, checked_count};

const UNREFERENCED_COLOR: [u8; 4] = [0xFF; 4];

/// One grid level: its first cell index and the cell offsets.
struct Level {
    shift: u16,
    cells: Vec<Option<usize>>,
}

impl Level {
    fn read(block: &Block<'_>, offset: usize, limits: &CodecLimits) -> Result<Self> {
        let shift = block.read_u16(offset, "collision level")?;
        let count = checked_count(
            i64::from(block.read_u16(offset + 0x02, "collision level")?),
            limits.max_collision_buckets,
            "collision cell count",
        )?;
        let raw = block.table(offset + 0x04, count, 4, "collision cell table")?;
        let cells = raw
            .chunks_exact(4)
            .map(|c| match Endian::read_u32(c) {
                0 => None,
                p => Some(p as usize),
            })
            .collect();
        Ok(Self { shift, cells })
    }

    /// Occupied cells with their world-space axis origin.
    fn occupied(&self) -> impl Iterator<Item = (f32, usize)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            cell.map(|offset| {
                let origin =
                    COLLISION_CELL_SIZE * (f32::from(self.shift) + i as f32 + 0.5);
                (origin, offset)
            })
        })
    }
}

/// Decoder state shared across leaves.
struct CollisionBuilder<'a> {
    block: Block<'a>,
    log: DiagnosticLog,
    mesh: CollisionMesh,
    leaves: usize,
}

impl CollisionBuilder<'_> {
    fn leaf(&mut self, offset: usize, origin: [f32; 3]) -> Result<()> {
        let block = &self.block;
        let face_count = usize::from(block.read_u16(offset, "collision leaf")?);
        let vertex_count = usize::from(block.read_u8(offset + 0x02, "collision leaf")?);
        let restart_count = usize::from(block.read_u8(offset + 0x03, "collision leaf")?);

        let vertices_at = offset + LEAF_HEADER_SIZE;
        let triangles_at = vertices_at + vertex_count * LEAF_VERTEX_SIZE;
        let restarts_at = triangles_at + face_count * LEAF_TRIANGLE_SIZE;
        let raw_vertices = block.table(vertices_at, vertex_count, LEAF_VERTEX_SIZE, "collision vertices")?;
        let raw_triangles = block.table(triangles_at, face_count, LEAF_TRIANGLE_SIZE, "collision triangles")?;
        let restarts = block.slice(restarts_at, restart_count, "collision restarts")?;

        if restart_count > face_count {
            self.log.report(
                "collision restarts past face count",
                block.base() + offset + 0x03,
                restart_count as i64,
            );
        }

        let base = self.mesh.vertices.len();
        let global = u32::try_from(base).map_err(|_| Error::LimitExceeded {
            context: "collision vertices",
            count: base,
            limit: u32::MAX as usize,
        })?;
        self.mesh.vertices.extend(raw_vertices.chunks_exact(LEAF_VERTEX_SIZE).map(|v| {
            let axis = |at: usize, origin: f32| {
                f32::from(Endian::read_i16(&v[at..at + 2])) / COLLISION_FIXED_ONE + origin
            };
            CollisionVertex {
                position: [axis(0, origin[0]), axis(2, origin[1]), axis(4, origin[2])],
                color: UNREFERENCED_COLOR,
            }
        }));

        let local = |index: u8| -> Result<u32> {
            if usize::from(index) >= vertex_count {
                return Err(Error::InvalidIndex {
                    context: "collision vertex",
                    index: i64::from(index),
                    limit: vertex_count,
                });
            }
            Ok(global + u32::from(index))
        };

        let mut triangles = Vec::with_capacity(face_count + restart_count);
        for t in raw_triangles.chunks_exact(LEAF_TRIANGLE_SIZE) {
            triangles.push(([local(t[0])?, local(t[1])?, local(t[2])?], t[3]));
        }
        for (k, &restart) in restarts.iter().enumerate().take(face_count) {
            let ([first, _, third], class) = triangles[k];
            triangles.push(([first, third, local(restart)?], class));
        }

        for (tri, class) in triangles {
            let color = classification_color(class);
            for index in tri {
                self.mesh.vertices[index as usize].color = color;
            }
            self.mesh.indices.extend_from_slice(&tri);
            self.mesh.classifications.push(class);
        }
        self.leaves += 1;
        Ok(())
    }
}

/// Decode the collision grid at the start of `block` into a triangle soup.
///
/// Cells are visited Z, then Y, then X, in ascending order; leaf vertices are
/// numbered in visit order.
///
/// # Errors
/// Fails on out-of-bounds reads, cell tables over
/// `limits.max_collision_buckets`, or a triangle naming a vertex its leaf
/// does not have.
pub fn decode_collision(block: &Block<'_>, limits: &CodecLimits) -> Result<Decoded<CollisionMesh>> {
    let (decoded, _) = decode_collision_with_stats(block, limits)?;
    Ok(decoded)
}

/// [`decode_collision`], also returning the number of leaves visited.
pub fn decode_collision_with_stats(
    block: &Block<'_>,
    limits: &CodecLimits,
) -> Result<(Decoded<CollisionMesh>, usize)> {
    let mut builder = CollisionBuilder {
        block: *block,
        log: DiagnosticLog::default(),
        mesh: CollisionMesh::default(),
        leaves: 0,
    };

    let z_level = Level::read(block, 0, limits)?;
    for (z, y_offset) in z_level.occupied() {
        let y_level = Level::read(block, y_offset, limits)?;
        for (y, x_offset) in y_level.occupied() {
            let x_level = Level::read(block, x_offset, limits)?;
            for (x, leaf) in x_level.occupied() {
                builder.leaf(leaf, [x, y, z])?;
            }
        }
    }

    tracing::debug!(
        "Decoded collision at 0x{:X}: {} leaves, {} vertices, {} triangles",
        block.base(),
        builder.leaves,
        builder.mesh.vertices.len(),
        builder.mesh.triangle_count()
    );
    let leaves = builder.leaves;
    Ok((builder.log.finish(builder.mesh), leaves))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::common::Section;

    fn level(s: &mut Section, shift: u16, cells: &[u32]) {
        s.write_u16(shift);
        s.write_u16(cells.len() as u16);
        for &c in cells {
            s.write_u32(c);
        }
    }

    fn leaf(s: &mut Section, vertices: &[[i16; 3]], triangles: &[[u8; 4]], restarts: &[u8]) {
        s.write_u16(triangles.len() as u16);
        s.write_u8(vertices.len() as u8);
        s.write_u8(restarts.len() as u8);
        for v in vertices {
            for &c in v {
                s.write_i16(c);
            }
            s.write_i16(0);
        }
        for t in triangles {
            s.write_bytes(t);
        }
        s.write_bytes(restarts);
    }

    /// Z level at 0x00 (1 cell), Y level at 0x10, X level at 0x20 with an
    /// empty first cell, leaf at 0x30.
    fn single_leaf(triangles: &[[u8; 4]], restarts: &[u8]) -> Vec<u8> {
        let mut s = Section::new();
        level(&mut s, 2, &[0x10]);
        s.pad_to(0x10);
        level(&mut s, 0, &[0x20]);
        s.pad_to(0x20);
        level(&mut s, 5, &[0, 0x30]);
        s.pad_to(0x30);
        leaf(&mut s, &[[512, 0, -1024], [0, 2048, 0], [1024, 1024, 0], [0, 0, 0]], triangles, restarts);
        s.into_bytes()
    }

    #[test]
    fn test_single_triangle_positions() {
        let data = single_leaf(&[[0, 1, 2, 7]], &[]);
        let decoded = decode_collision(&Block::new(&data), &CodecLimits::default()).unwrap();
        assert!(decoded.is_clean());
        let mesh = decoded.value;

        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.classifications, vec![7]);
        // x: shift 5, cell 1; y: shift 0, cell 0; z: shift 2, cell 0
        assert_eq!(mesh.vertices[0].position, [0.5 + 4.0 * 6.5, 2.0, -1.0 + 4.0 * 2.5]);
        assert_eq!(mesh.vertices[1].position[1], 2.0 + 2.0);
        assert_eq!(mesh.vertices[0].color, classification_color(7));
        assert_eq!(mesh.vertices[3].color, UNREFERENCED_COLOR);
    }

    #[test]
    fn test_single_leaf_single_triangle() {
        let mut s = Section::new();
        level(&mut s, 1, &[0x10]);
        s.pad_to(0x10);
        level(&mut s, 3, &[0x20]);
        s.pad_to(0x20);
        level(&mut s, 7, &[0, 0, 0x30]);
        s.pad_to(0x30);
        leaf(&mut s, &[[256, 0, 0], [-512, 1024, 0], [0, 0, 3072]], &[[2, 0, 1, 5]], &[]);
        let data = s.into_bytes();

        let (decoded, leaves) =
            decode_collision_with_stats(&Block::new(&data), &CodecLimits::default()).unwrap();
        assert!(decoded.is_clean());
        assert_eq!(leaves, 1);
        let mesh = decoded.value;
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangle(0), Some([2, 0, 1]));

        // raw / 1024 + 4 * (shift + cell + 0.5) on every axis
        let x_origin = 4.0 * (7.0 + 2.0 + 0.5);
        let y_origin = 4.0 * (3.0 + 0.5);
        let z_origin = 4.0 * (1.0 + 0.5);
        assert_eq!(mesh.vertices[0].position, [0.25 + x_origin, y_origin, z_origin]);
        assert_eq!(mesh.vertices[1].position, [-0.5 + x_origin, 1.0 + y_origin, z_origin]);
        assert_eq!(mesh.vertices[2].position, [x_origin, y_origin, 3.0 + z_origin]);
        assert!(mesh.vertices.iter().all(|v| v.color == classification_color(5)));
    }

    #[test]
    fn test_restart_adds_fan_triangle() {
        let data = single_leaf(&[[0, 1, 2, 7]], &[3]);
        let mesh = decode_collision(&Block::new(&data), &CodecLimits::default()).unwrap().value;
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangle(1), Some([0, 2, 3]));
        assert_eq!(mesh.classifications, vec![7, 7]);
    }

    #[test]
    fn test_last_triangle_sets_color() {
        let data = single_leaf(&[[0, 1, 2, 1], [2, 3, 0, 4]], &[]);
        let mesh = decode_collision(&Block::new(&data), &CodecLimits::default()).unwrap().value;
        assert_eq!(mesh.vertices[1].color, classification_color(1));
        assert_eq!(mesh.vertices[2].color, classification_color(4));
    }

    #[test]
    fn test_local_index_out_of_range_is_fatal() {
        let data = single_leaf(&[[0, 1, 4, 0]], &[]);
        let err = decode_collision(&Block::new(&data), &CodecLimits::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidIndex { index: 4, limit: 4, .. }));
    }

    #[test]
    fn test_leaves_share_a_running_vertex_counter() {
        let mut s = Section::new();
        level(&mut s, 0, &[0x10]);
        s.pad_to(0x10);
        level(&mut s, 0, &[0x20]);
        s.pad_to(0x20);
        level(&mut s, 0, &[0x30, 0x50]);
        s.pad_to(0x30);
        leaf(&mut s, &[[0, 0, 0]; 3], &[[0, 1, 2, 0]], &[]);
        s.pad_to(0x50);
        leaf(&mut s, &[[0, 0, 0]; 3], &[[2, 1, 0, 0]], &[]);
        let data = s.into_bytes();

        let (decoded, leaves) =
            decode_collision_with_stats(&Block::new(&data), &CodecLimits::default()).unwrap();
        assert_eq!(leaves, 2);
        assert_eq!(decoded.value.indices, vec![0, 1, 2, 5, 4, 3]);
        assert_eq!(decoded.value.vertices[3].position[0], 4.0 * 1.5);
    }

    #[test]
    fn test_oversized_cell_table_is_rejected() {
        let mut s = Section::new();
        level(&mut s, 0, &[0; 8]);
        let data = s.into_bytes();
        let limits = CodecLimits {
            max_collision_buckets: 4,
            ..CodecLimits::default()
        };
        assert!(matches!(
            decode_collision(&Block::new(&data), &limits),
            Err(Error::LimitExceeded { .. })
        ));
    }
}
