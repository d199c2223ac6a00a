//! Rig decoding
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use byteorder::ByteOrder;

use super::animation::decode_animation;
use super::types::{
    ATTACHMENT_HEADER_SIZE, Animation, Attachment, BONE_DATA_SIZE, BONE_MATRIX_SIZE, BoneData,
    BoneMatrix, EXTRA_VERTEX_SIZE, HITBOX_ENTRY_SIZE, ModelSound, RIG_HEADER_SIZE, Rig, RigMesh,
    RigUnknowns, SOUND_SIZE,
};
use crate::config::CodecLimits;
use crate::error::{Error, Result};
use crate::formats::common::{Block, Decoded, DiagnosticLog, Endian, align_up, checked_count};
use crate::formats::mesh::reader::{check_partition, decode_config_table};
use crate::formats::mesh::{
    Mesh, MeshHeader, TexConfigShape, VertexLayout, config_index_count, decode_indices,
    decode_static_mesh, decode_vertices,
};

/// The fixed rig header plus its animation pointer table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RigHeader {
    pub mesh_ptr: Option<usize>,
    pub bone_count: u8,
    pub low_poly_bone_count: u8,
    pub hitbox_entries: u8,
    pub animation_count: u8,
    pub sound_count: u8,
    pub hitbox_ptr: Option<usize>,
    pub bone_matrix_ptr: Option<usize>,
    pub bone_data_ptr: Option<usize>,
    pub attachment_ptr: Option<usize>,
    pub scale: f32,
    pub sound_ptr: Option<usize>,
    pub color: u32,
    pub unknowns: RigUnknowns,
    pub animation_ptrs: Vec<Option<usize>>,
}

impl RigHeader {
    fn read(block: &Block<'_>, log: &mut DiagnosticLog) -> Result<Self> {
        block.slice(0, RIG_HEADER_SIZE, "rig header")?;
        let base = block.base();
        let byte = |at: usize| block.read_u8(at, "rig header");

        log.expect_zero("rig reserved", base + 0x04, i64::from(block.read_i32(0x04, "rig header")?));
        log.expect_zero("rig reserved", base + 0x20, i64::from(block.read_i32(0x20, "rig header")?));
        log.expect_zero("rig reserved", base + 0x2C, i64::from(block.read_i32(0x2C, "rig header")?));

        let mut floats = [0.0; 4];
        for (i, value) in floats.iter_mut().enumerate() {
            *value = block.read_f32(0x30 + i * 4, "rig header")?;
        }

        let animation_count = byte(0x0C)?;
        let pointers = block.table(
            RIG_HEADER_SIZE,
            usize::from(animation_count),
            4,
            "animation pointer table",
        )?;
        let animation_ptrs = pointers
            .chunks_exact(4)
            .enumerate()
            .map(|(i, raw)| match Endian::read_i32(raw) {
                0 => Ok(None),
                p if p < 0 => Err(Error::InvalidIndex {
                    context: "animation pointer",
                    index: i64::from(p),
                    limit: block.data().len(),
                }),
                p => {
                    tracing::trace!("Animation {i} at +0x{p:X}");
                    Ok(Some(p as usize))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mesh_ptr: block.read_ptr(0x00, "rig mesh pointer")?,
            bone_count: byte(0x08)?,
            low_poly_bone_count: byte(0x09)?,
            hitbox_entries: byte(0x0B)?,
            animation_count,
            sound_count: byte(0x0D)?,
            hitbox_ptr: block.read_ptr(0x10, "hitbox pointer")?,
            bone_matrix_ptr: block.read_ptr(0x14, "bone matrix pointer")?,
            bone_data_ptr: block.read_ptr(0x18, "bone data pointer")?,
            attachment_ptr: block.read_ptr(0x1C, "attachment pointer")?,
            scale: block.read_f32(0x24, "rig header")?,
            sound_ptr: block.read_ptr(0x28, "sound pointer")?,
            color: block.read_u32(0x40, "rig header")?,
            unknowns: RigUnknowns {
                byte_0a: byte(0x0A)?,
                low_poly_render_distance: byte(0x0E)?,
                byte_0f: byte(0x0F)?,
                floats,
                word_44: block.read_u32(0x44, "rig header")?,
            },
            animation_ptrs,
        })
    }

    pub fn effective_bone_count(&self) -> u8 {
        if self.bone_count == 0 {
            self.low_poly_bone_count
        } else {
            self.bone_count
        }
    }
}

/// Decodes a rig one sub-block at a time.
///
/// Each step validates what it reads before the next one runs; `build`
/// hands back the finished rig with every diagnostic raised on the way.
struct RigBuilder<'a, 'l> {
    block: Block<'a>,
    limits: &'l CodecLimits,
    log: DiagnosticLog,
    header: RigHeader,
    rig: Rig,
}

impl<'a, 'l> RigBuilder<'a, 'l> {
    fn new(block: Block<'a>, id: u16, limits: &'l CodecLimits) -> Result<Self> {
        let mut log = DiagnosticLog::default();
        let header = RigHeader::read(&block, &mut log)?;
        checked_count(
            i64::from(header.animation_count),
            limits.max_animations,
            "animation count",
        )?;
        checked_count(i64::from(header.sound_count), limits.max_sounds, "sound count")?;

        let mut rig = Rig::new(id);
        rig.bone_count = header.bone_count;
        rig.low_poly_bone_count = header.low_poly_bone_count;
        rig.scale = header.scale;
        rig.color = header.color;
        rig.unknowns = header.unknowns;

        Ok(Self {
            block,
            limits,
            log,
            header,
            rig,
        })
    }

    fn mesh(mut self) -> Result<Self> {
        let Some(header_offset) = self.header.mesh_ptr else {
            return Ok(self);
        };
        let block = &self.block;
        let log = &mut self.log;
        let header = MeshHeader::read(block, header_offset)?;
        let abs = block.base() + header_offset;

        log.expect_zero("rig mesh uv pointer", abs + 0x1C, i64::from(header.uv_ptr));

        let configs = decode_config_table(
            block,
            header.tex_config_ptr,
            header.tex_config_count,
            TexConfigShape::Compact,
            self.limits,
            log,
            "texture config count",
            abs,
        )?;
        let extra_configs = decode_config_table(
            block,
            header.extra_tex_config_ptr,
            header.extra_tex_config_count,
            TexConfigShape::Compact,
            self.limits,
            log,
            "extra texture config count",
            abs + 0x04,
        )?;
        let index_count = config_index_count(&configs, "texture config size")?;
        let extra_index_count = config_index_count(&extra_configs, "extra texture config size")?;
        check_partition(&configs, index_count, log, "texture config partition", abs);
        check_partition(&extra_configs, extra_index_count, log, "extra texture config partition", abs + 0x04);

        let vertex_count = checked_count(
            i64::from(header.vertex_count),
            self.limits.max_vertices,
            "vertex count",
        )?;
        let extra_vertex_count = checked_count(
            i64::from(header.extra_vertex_count),
            self.limits.max_vertices,
            "extra vertex count",
        )?;

        let (vertices, extra_vertices) = match header.vertex_ptr {
            Some(ptr) => {
                let vertices = decode_vertices(block, ptr, vertex_count, VertexLayout::Skinned, None)?;
                let extra_at = align_up(ptr + vertex_count * VertexLayout::Skinned.stride(), 16);
                let raw = block.table(extra_at, extra_vertex_count, EXTRA_VERTEX_SIZE, "extra vertex buffer")?;
                let extra = raw
                    .chunks_exact(EXTRA_VERTEX_SIZE)
                    .map(|c| {
                        let mut record = [0u8; EXTRA_VERTEX_SIZE];
                        record.copy_from_slice(c);
                        record
                    })
                    .collect();
                (vertices, extra)
            }
            None => {
                log.expect_zero("vertex count", abs + 0x18, vertex_count as i64);
                log.expect_zero("extra vertex count", abs + 0x1A, extra_vertex_count as i64);
                (Vec::new(), Vec::new())
            }
        };

        let (indices, extra_indices) = match header.index_ptr {
            Some(ptr) => {
                let indices = decode_indices(block, ptr, index_count, 0)?;
                let extra_at = align_up(ptr + index_count * 2, 16);
                (indices, decode_indices(block, extra_at, extra_index_count, 0)?)
            }
            None => {
                log.expect_zero("index count", abs + 0x14, (index_count + extra_index_count) as i64);
                (Vec::new(), Vec::new())
            }
        };

        tracing::debug!(
            "Rig {} mesh: {} vertices (+{} extra), {} indices (+{} extra)",
            self.rig.id,
            vertices.len(),
            extra_vertices.len(),
            indices.len(),
            extra_indices.len()
        );

        self.rig.mesh = Some(RigMesh {
            mesh: Mesh {
                vertices,
                indices,
                texture_configs: configs,
                scale: self.header.scale,
            },
            extra_texture_configs: extra_configs,
            extra_indices,
            extra_vertices,
        });
        Ok(self)
    }

    fn hitbox(mut self) -> Result<Self> {
        let entries = usize::from(self.header.hitbox_entries);
        match self.header.hitbox_ptr {
            Some(ptr) => {
                self.rig.hitbox = self
                    .block
                    .table(ptr, entries, HITBOX_ENTRY_SIZE, "hitbox")?
                    .to_vec();
            }
            None => self
                .log
                .expect_zero("hitbox entry count", self.block.base() + 0x0B, entries as i64),
        }
        Ok(self)
    }

    fn sounds(mut self) -> Result<Self> {
        let count = usize::from(self.header.sound_count);
        match self.header.sound_ptr {
            Some(ptr) => {
                let raw = self.block.table(ptr, count, SOUND_SIZE, "sounds")?;
                self.rig.sounds = raw
                    .chunks_exact(SOUND_SIZE)
                    .map(|c| {
                        let mut sound = ModelSound::default();
                        Endian::read_u32_into(c, &mut sound.raw);
                        sound
                    })
                    .collect();
            }
            None => self
                .log
                .expect_zero("sound count", self.block.base() + 0x0D, count as i64),
        }
        Ok(self)
    }

    fn attachments(mut self) -> Result<Self> {
        let Some(table) = self.header.attachment_ptr else {
            return Ok(self);
        };
        let count = checked_count(
            i64::from(self.block.read_i32(table, "attachment table")?),
            self.limits.max_attachments,
            "attachment count",
        )?;
        self.block.table(table + 4, count, 4, "attachment table")?;

        for i in 0..count {
            let Some(entry) = self.block.read_ptr(table + 4 + i * 4, "attachment pointer")? else {
                self.log.report(
                    "null attachment pointer",
                    self.block.base() + table + 4 + i * 4,
                    i as i64,
                );
                continue;
            };
            self.block.slice(entry, ATTACHMENT_HEADER_SIZE, "attachment header")?;
            let abs = self.block.base() + entry;
            let bone = self.block.read_i32(entry, "attachment header")?;
            let mesh_ptr = self.block.read_ptr(entry + 0x04, "attachment mesh pointer")?;
            for at in [0x08, 0x0C] {
                self.log.expect_zero(
                    "attachment reserved",
                    abs + at,
                    i64::from(self.block.read_i32(entry + at, "attachment header")?),
                );
            }

            let mesh = match mesh_ptr {
                Some(ptr) => {
                    let decoded = decode_static_mesh(
                        &self.block,
                        ptr,
                        VertexLayout::Skinned,
                        TexConfigShape::Compact,
                        self.header.scale,
                        self.limits,
                    )?;
                    self.log.extend(decoded.diagnostics);
                    decoded.value
                }
                None => Mesh {
                    scale: self.header.scale,
                    ..Default::default()
                },
            };
            self.rig.attachments.push(Attachment { bone, mesh });
        }
        Ok(self)
    }

    fn bones(mut self) -> Result<Self> {
        let count = checked_count(
            i64::from(self.header.effective_bone_count()),
            self.limits.max_bones,
            "bone count",
        )?;

        if let Some(ptr) = self.header.bone_matrix_ptr {
            let raw = self.block.table(ptr, count, BONE_MATRIX_SIZE, "bone matrices")?;
            self.rig.bone_matrices = raw
                .chunks_exact(BONE_MATRIX_SIZE)
                .map(|c| {
                    let mut floats = [0.0f32; 15];
                    Endian::read_f32_into(&c[..0x3C], &mut floats);
                    let row = |r: usize| [floats[r * 4], floats[r * 4 + 1], floats[r * 4 + 2], floats[r * 4 + 3]];
                    BoneMatrix::from_rows(
                        [row(0), row(1), row(2)],
                        [floats[12], floats[13], floats[14]],
                        Endian::read_i32(&c[0x3C..0x40]),
                    )
                })
                .collect();
        }

        if let Some(ptr) = self.header.bone_data_ptr {
            let raw = self.block.table(ptr, count, BONE_DATA_SIZE, "bone data")?;
            let bone_data: Vec<BoneData> = raw
                .chunks_exact(BONE_DATA_SIZE)
                .map(|c| BoneData {
                    parent: Endian::read_i32(&c[0x00..0x04]),
                    rest_translation: [
                        Endian::read_f32(&c[0x04..0x08]),
                        Endian::read_f32(&c[0x08..0x0C]),
                        Endian::read_f32(&c[0x0C..0x10]),
                    ],
                })
                .collect();

            for (bone, data) in bone_data.iter().enumerate().skip(1) {
                if data.parent < 0 || data.parent as usize >= bone {
                    return Err(Error::InvalidSkeleton {
                        bone,
                        parent: data.parent,
                    });
                }
            }
            self.rig.bone_data = bone_data;
        }
        Ok(self)
    }

    fn animations(mut self) -> Result<Self> {
        let mut animations = Vec::with_capacity(self.header.animation_ptrs.len());
        for ptr in &self.header.animation_ptrs {
            animations.push(match ptr {
                Some(ptr) => decode_animation(&self.block, *ptr, self.limits, &mut self.log)?,
                None => Animation::default(),
            });
        }
        self.rig.animations = animations;
        Ok(self)
    }

    fn build(self) -> Decoded<Rig> {
        tracing::debug!(
            "Decoded rig {} at 0x{:X}: {} bones, {} animations, {} attachments, {} diagnostics",
            self.rig.id,
            self.block.base(),
            self.rig.effective_bone_count(),
            self.rig.animations.len(),
            self.rig.attachments.len(),
            self.log.len()
        );
        self.log.finish(self.rig)
    }
}

/// Decode the rig whose header starts at `base_offset` in `source`.
///
/// Every pointer inside the rig is relative to `base_offset`. `id` is the
/// rig's slot in the level's model table; it selects shared-skeleton
/// behavior for ids 1 and 2.
///
/// # Errors
/// Fails if any sub-block lies outside `source`, a count is negative or over
/// its limit, or a bone's parent does not precede it.
pub fn decode_rig(
    source: &[u8],
    base_offset: usize,
    id: u16,
    limits: &CodecLimits,
) -> Result<Decoded<Rig>> {
    let block = Block::at(source, base_offset)?;
    Ok(RigBuilder::new(block, id, limits)?
        .mesh()?
        .hitbox()?
        .sounds()?
        .attachments()?
        .bones()?
        .animations()?
        .build())
}

/// Read only the rig header, for inspection.
pub fn read_rig_header(source: &[u8], base_offset: usize) -> Result<Decoded<RigHeader>> {
    let block = Block::at(source, base_offset)?;
    let mut log = DiagnosticLog::default();
    let header = RigHeader::read(&block, &mut log)?;
    Ok(log.finish(header))
}
