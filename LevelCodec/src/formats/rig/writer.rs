//! Rig encoding
//!
//! Encoding runs in two passes. [`RigLayout::plan`] assigns every sub-block
//! its offset relative to the rig base; the write pass then emits the blocks
//! in that order, zero-filling the gaps between them.
//!
//! Sub-block order:
//!
//! ```text
//! header + animation pointers
//! [menu hook gap (id 0) | reserved gap (id > 2)]
//! mesh header, texture configs, extra texture configs
//! [pad to an absolute 0x80 boundary]
//! vertex buffer, extra vertex buffer, indices, extra indices
//! hitbox, sounds, attachments, bone matrices, bone data, animations
//! ```
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use super::animation::{AnimationPlan, validate_animation, write_animation};
use super::types::{
    ATTACHMENT_HEADER_SIZE, BONE_DATA_SIZE, BONE_MATRIX_SIZE, EXTRA_VERTEX_SIZE, HIGH_ID_GAP,
    HITBOX_ENTRY_SIZE, MENU_HOOK_GAP, RIG_HEADER_SIZE, Rig, RigMesh, SOUND_SIZE,
    VERTEX_BUFFER_ALIGNMENT, uses_shared_skeleton,
};
use crate::error::{Error, Result};
use crate::formats::common::{Section, align_up};
use crate::formats::mesh::writer::{
    MeshOffsets, plan_mesh_tables, validate_texture_configs, validate_vertex_count,
    write_indices, write_mesh_header, write_texture_configs, write_uvs, write_vertices,
};
use crate::formats::mesh::{MESH_HEADER_SIZE, Mesh, TexConfigShape, VertexLayout};

const SHAPE: TexConfigShape = TexConfigShape::Compact;
const LAYOUT: VertexLayout = VertexLayout::Skinned;

/// Offsets of the rig mesh and its secondary tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RigMeshPlan {
    header: usize,
    offsets: MeshOffsets,
    extra_vertices: usize,
    extra_indices: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttachmentPlan {
    header: usize,
    mesh_header: usize,
    offsets: MeshOffsets,
}

/// Every sub-block offset of an encoded rig, relative to the rig base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RigLayout {
    mesh: Option<RigMeshPlan>,
    hitbox: Option<usize>,
    sounds: Option<usize>,
    attachment_table: Option<usize>,
    attachments: Vec<AttachmentPlan>,
    bone_matrices: Option<usize>,
    bone_data: Option<usize>,
    animations: Vec<Option<AnimationPlan>>,
    /// Total encoded size.
    pub size: usize,
}

/// Hands out 16-byte aligned offsets in order.
struct Cursor(usize);

impl Cursor {
    fn place(&mut self, len: usize) -> usize {
        let at = align_up(self.0, 16);
        self.0 = at + len;
        at
    }

    fn place_nonempty(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.place(len))
    }
}

impl RigLayout {
    /// Plan the layout of `rig` when its header lands at `file_offset`.
    pub fn plan(rig: &Rig, file_offset: usize) -> Self {
        let mut layout = Self::default();
        let mut cursor = Cursor(RIG_HEADER_SIZE + rig.animations.len() * 4);

        cursor.0 = align_up(cursor.0, 16);
        match rig.id {
            0 => cursor.0 += MENU_HOOK_GAP,
            1 | 2 => {}
            _ => cursor.0 += HIGH_ID_GAP,
        }

        if let Some(rig_mesh) = &rig.mesh {
            layout.mesh = Some(plan_rig_mesh(rig_mesh, &mut cursor, file_offset));
        }

        layout.hitbox = cursor.place_nonempty(rig.hitbox.len());
        layout.sounds = cursor.place_nonempty(rig.sounds.len() * SOUND_SIZE);

        if !rig.attachments.is_empty() {
            layout.attachment_table = Some(cursor.place(4 + rig.attachments.len() * 4));
            for attachment in &rig.attachments {
                let header = cursor.place(ATTACHMENT_HEADER_SIZE);
                let mesh_header = cursor.place(MESH_HEADER_SIZE);
                let (offsets, end) = plan_mesh_tables(&attachment.mesh, LAYOUT, SHAPE, cursor.0);
                cursor.0 = end;
                layout.attachments.push(AttachmentPlan {
                    header,
                    mesh_header,
                    offsets,
                });
            }
        }

        if !uses_shared_skeleton(rig.id) {
            layout.bone_matrices = cursor.place_nonempty(rig.bone_matrices.len() * BONE_MATRIX_SIZE);
            layout.bone_data = cursor.place_nonempty(rig.bone_data.len() * BONE_DATA_SIZE);
        }

        layout.animations = rig
            .animations
            .iter()
            .map(|animation| {
                if animation.frames.is_empty() {
                    return None;
                }
                let (plan, end) = AnimationPlan::new(animation, cursor.0);
                cursor.0 = end;
                Some(plan)
            })
            .collect();

        layout.size = align_up(cursor.0, 16);
        layout
    }

    /// Offset of the primary vertex buffer, if the rig has one.
    pub fn vertex_buffer(&self) -> Option<usize> {
        self.mesh.as_ref().and_then(|m| m.offsets.vertices)
    }

    pub fn mesh_header(&self) -> Option<usize> {
        self.mesh.as_ref().map(|m| m.header)
    }

    pub fn bone_matrices(&self) -> Option<usize> {
        self.bone_matrices
    }

    pub fn bone_data(&self) -> Option<usize> {
        self.bone_data
    }

    /// Offset of each animation block; `None` for animations without frames.
    pub fn animation_offsets(&self) -> Vec<Option<usize>> {
        self.animations
            .iter()
            .map(|a| a.as_ref().map(|p| p.header))
            .collect()
    }
}

fn plan_rig_mesh(rig_mesh: &RigMesh, cursor: &mut Cursor, file_offset: usize) -> RigMeshPlan {
    let mesh = &rig_mesh.mesh;
    let mut plan = RigMeshPlan {
        header: cursor.place(MESH_HEADER_SIZE),
        ..RigMeshPlan::default()
    };
    plan.offsets.tex_configs = cursor.place_nonempty(mesh.texture_configs.len() * SHAPE.size());
    plan.offsets.extra_tex_configs =
        cursor.place_nonempty(rig_mesh.extra_texture_configs.len() * SHAPE.size());

    if !mesh.vertices.is_empty() || !rig_mesh.extra_vertices.is_empty() {
        cursor.0 = align_up(cursor.0, 16);
        let misalignment = (file_offset + cursor.0) % VERTEX_BUFFER_ALIGNMENT;
        if misalignment != 0 {
            cursor.0 += VERTEX_BUFFER_ALIGNMENT - misalignment;
        }
        let vertices = cursor.place(mesh.vertices.len() * LAYOUT.stride());
        plan.offsets.vertices = Some(vertices);
        plan.extra_vertices = cursor.place(rig_mesh.extra_vertices.len() * EXTRA_VERTEX_SIZE);
    }

    if !mesh.indices.is_empty() || !rig_mesh.extra_indices.is_empty() {
        plan.offsets.indices = Some(cursor.place(mesh.indices.len() * 2));
        plan.extra_indices = cursor.place(rig_mesh.extra_indices.len() * 2);
    }
    plan
}

fn count_u8(len: usize, context: &str) -> Result<u8> {
    u8::try_from(len).map_err(|_| Error::encode(format!("{context}: {len} does not fit an 8-bit count")))
}

/// The header holds the only scale on disk; every mesh must agree with it.
fn validate_scale(mesh: &Mesh, header_scale: f32, context: &str) -> Result<()> {
    if mesh.scale.to_bits() != header_scale.to_bits() {
        return Err(Error::encode(format!(
            "{context}: mesh scale {} differs from the rig scale {header_scale}",
            mesh.scale
        )));
    }
    Ok(())
}

/// Reject rigs the header cannot describe.
fn validate(rig: &Rig) -> Result<()> {
    if let Some(rig_mesh) = &rig.mesh {
        validate_rig_mesh(rig_mesh)?;
        validate_scale(&rig_mesh.mesh, rig.scale, "rig mesh")?;
    }

    if rig.hitbox.len() % HITBOX_ENTRY_SIZE != 0 {
        return Err(Error::encode(format!(
            "hitbox: {} bytes is not a whole number of 0x{HITBOX_ENTRY_SIZE:X}-byte entries",
            rig.hitbox.len()
        )));
    }
    count_u8(rig.hitbox.len() / HITBOX_ENTRY_SIZE, "hitbox entries")?;
    count_u8(rig.sounds.len(), "sounds")?;
    count_u8(rig.animations.len(), "animations")?;
    count_u8(rig.bone_matrices.len(), "bone matrices")?;
    count_u8(rig.bone_data.len(), "bone data")?;

    if !uses_shared_skeleton(rig.id) {
        let bones = rig.effective_bone_count();
        for (name, len) in [("bone matrices", rig.bone_matrices.len()), ("bone data", rig.bone_data.len())] {
            if len != 0 && len != bones {
                return Err(Error::encode(format!(
                    "{name}: {len} entries but the header declares {bones} bones"
                )));
            }
        }
        for (bone, data) in rig.bone_data.iter().enumerate().skip(1) {
            if data.parent < 0 || data.parent as usize >= bone {
                return Err(Error::encode(format!(
                    "bone {bone}: parent {} does not precede it",
                    data.parent
                )));
            }
        }
    }

    for (i, attachment) in rig.attachments.iter().enumerate() {
        if attachment.bone < 0 {
            return Err(Error::encode(format!(
                "attachment {i}: negative bone index {}",
                attachment.bone
            )));
        }
        validate_texture_configs(&attachment.mesh.texture_configs, attachment.mesh.indices.len(), "attachment mesh")?;
        validate_vertex_count(attachment.mesh.vertices.len(), "attachment mesh")?;
        validate_scale(&attachment.mesh, rig.scale, "attachment mesh")?;
    }

    for (i, animation) in rig.animations.iter().enumerate() {
        validate_animation(animation, i)?;
    }
    Ok(())
}

fn validate_rig_mesh(rig_mesh: &RigMesh) -> Result<()> {
    let mesh = &rig_mesh.mesh;
    validate_texture_configs(&mesh.texture_configs, mesh.indices.len(), "rig mesh")?;
    validate_texture_configs(
        &rig_mesh.extra_texture_configs,
        rig_mesh.extra_indices.len(),
        "rig mesh extra tables",
    )?;
    validate_vertex_count(mesh.vertices.len(), "rig mesh")?;
    validate_vertex_count(rig_mesh.extra_vertices.len(), "rig mesh extra vertices")
}

/// Encode `rig` as it would sit at `file_offset` in its container.
///
/// `file_offset` only influences padding: the vertex buffer is aligned to an
/// absolute 0x80 boundary. All pointers are relative to the rig base.
///
/// The header's uniform scale is the only scale stored on disk, so the rig
/// mesh and every attachment mesh must carry `rig.scale`.
///
/// # Errors
/// Returns `EncodeInvariant` if a count overflows its header field, the
/// texture configs do not partition their indices, the bone tables disagree
/// with the bone count, a mesh scale differs from the rig scale, or an
/// attachment names a negative bone.
pub fn encode_rig(rig: &Rig, file_offset: usize) -> Result<Vec<u8>> {
    validate(rig)?;
    let layout = RigLayout::plan(rig, file_offset);
    let mut section = Section::with_capacity(layout.size);

    write_header(&mut section, rig, &layout);

    if let (Some(rig_mesh), Some(plan)) = (&rig.mesh, &layout.mesh) {
        write_rig_mesh(&mut section, rig_mesh, plan);
    }
    if let Some(at) = layout.hitbox {
        section.pad_to(at);
        section.write_bytes(&rig.hitbox);
    }
    if let Some(at) = layout.sounds {
        section.pad_to(at);
        for sound in &rig.sounds {
            for word in sound.raw {
                section.write_u32(word);
            }
        }
    }
    if let Some(at) = layout.attachment_table {
        section.pad_to(at);
        section.write_i32(rig.attachments.len() as i32);
        for plan in &layout.attachments {
            section.write_ptr(Some(plan.header));
        }
        for (attachment, plan) in rig.attachments.iter().zip(&layout.attachments) {
            section.pad_to(plan.header);
            section.write_i32(attachment.bone);
            section.write_ptr(Some(plan.mesh_header));
            section.write_i32(0);
            section.write_i32(0);
            section.pad_to(plan.mesh_header);
            write_mesh(&mut section, &attachment.mesh, &plan.offsets);
        }
    }
    if let Some(at) = layout.bone_matrices {
        section.pad_to(at);
        for matrix in &rig.bone_matrices {
            for row in matrix.rows() {
                for value in row {
                    section.write_f32(value);
                }
            }
            section.write_vec3(matrix.aux);
            section.write_i32(matrix.id);
        }
    }
    if let Some(at) = layout.bone_data {
        section.pad_to(at);
        for data in &rig.bone_data {
            section.write_i32(data.parent);
            section.write_vec3(data.rest_translation);
        }
    }
    for (animation, plan) in rig.animations.iter().zip(&layout.animations) {
        if let Some(plan) = plan {
            write_animation(&mut section, animation, plan);
        }
    }

    section.pad_to(layout.size);
    debug_assert_eq!(section.len(), layout.size);
    tracing::debug!(
        "Encoded rig {} at file offset 0x{file_offset:X}: 0x{:X} bytes",
        rig.id,
        section.len()
    );
    Ok(section.into_bytes())
}

fn write_header(section: &mut Section, rig: &Rig, layout: &RigLayout) {
    let hitbox_entries = rig.hitbox.len() / HITBOX_ENTRY_SIZE;

    section.write_ptr(layout.mesh.as_ref().map(|m| m.header));
    section.write_i32(0);
    section.write_u8(rig.bone_count);
    section.write_u8(rig.low_poly_bone_count);
    section.write_u8(rig.unknowns.byte_0a);
    section.write_u8(hitbox_entries as u8);
    section.write_u8(rig.animations.len() as u8);
    section.write_u8(rig.sounds.len() as u8);
    section.write_u8(rig.unknowns.low_poly_render_distance);
    section.write_u8(rig.unknowns.byte_0f);
    section.write_ptr(layout.hitbox);
    section.write_ptr(layout.bone_matrices);
    section.write_ptr(layout.bone_data);
    section.write_ptr(layout.attachment_table);
    section.write_i32(0);
    section.write_f32(rig.scale);
    section.write_ptr(layout.sounds);
    section.write_i32(0);
    for value in rig.unknowns.floats {
        section.write_f32(value);
    }
    section.write_u32(rig.color);
    section.write_u32(rig.unknowns.word_44);
    debug_assert_eq!(section.len(), RIG_HEADER_SIZE);

    for plan in &layout.animations {
        section.write_ptr(plan.as_ref().map(|p| p.header));
    }
}

fn write_rig_mesh(section: &mut Section, rig_mesh: &RigMesh, plan: &RigMeshPlan) {
    let mesh = &rig_mesh.mesh;
    section.pad_to(plan.header);
    write_mesh_header(
        section,
        mesh.texture_configs.len(),
        rig_mesh.extra_texture_configs.len(),
        mesh.vertices.len(),
        rig_mesh.extra_vertices.len(),
        &plan.offsets,
    );
    if let Some(at) = plan.offsets.tex_configs {
        section.pad_to(at);
        write_texture_configs(section, &mesh.texture_configs, SHAPE);
    }
    if let Some(at) = plan.offsets.extra_tex_configs {
        section.pad_to(at);
        write_texture_configs(section, &rig_mesh.extra_texture_configs, SHAPE);
    }
    if let Some(at) = plan.offsets.vertices {
        section.pad_to(at);
        write_vertices(section, &mesh.vertices, LAYOUT);
        section.pad_to(plan.extra_vertices);
        for record in &rig_mesh.extra_vertices {
            section.write_bytes(record);
        }
    }
    if let Some(at) = plan.offsets.indices {
        section.pad_to(at);
        write_indices(section, &mesh.indices);
        section.pad_to(plan.extra_indices);
        write_indices(section, &rig_mesh.extra_indices);
    }
}

/// Write a mesh header whose tables were planned by `plan_mesh_tables`.
fn write_mesh(section: &mut Section, mesh: &Mesh, offsets: &MeshOffsets) {
    write_mesh_header(section, mesh.texture_configs.len(), 0, mesh.vertices.len(), 0, offsets);
    if let Some(at) = offsets.tex_configs {
        section.pad_to(at);
        write_texture_configs(section, &mesh.texture_configs, SHAPE);
    }
    if let Some(at) = offsets.vertices {
        section.pad_to(at);
        write_vertices(section, &mesh.vertices, LAYOUT);
    }
    if let Some(at) = offsets.uvs {
        section.pad_to(at);
        write_uvs(section, &mesh.vertices);
    }
    if let Some(at) = offsets.indices {
        section.pad_to(at);
        write_indices(section, &mesh.indices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecLimits;
    use crate::formats::mesh::{TextureConfig, Vertex};
    use crate::formats::rig::decode_rig;
    use crate::formats::rig::types::{
        Animation, AnimationFrame, Attachment, BoneData, BoneKey, BoneMatrix, ModelSound,
    };
    use glam::{Mat4, Quat, Vec3};
    use pretty_assertions::assert_eq;

    fn skinned_triangle() -> Mesh {
        Mesh {
            vertices: (0..3)
                .map(|i| Vertex {
                    position: [i as f32, 0.0, 1.0],
                    normal: [0.0, 0.0, 1.0],
                    uv: [0.5, i as f32],
                    bone_weights: [255, 0, 0, 0],
                    bone_ids: [i as u8 % 2, 0, 0, 0],
                    ..Vertex::default()
                })
                .collect(),
            indices: vec![0, 1, 2],
            texture_configs: vec![TextureConfig {
                id: 1,
                start: 0,
                size: 3,
                mode: 0,
                reserved: [0, 0],
            }],
            scale: 1.5,
        }
    }

    fn two_bone_rig(id: u16) -> Rig {
        let mut rig = Rig::new(id);
        rig.bone_count = 2;
        rig.scale = 1.5;
        rig.color = 0x8080_80FF;
        rig.unknowns.low_poly_render_distance = 12;
        rig.mesh = Some(RigMesh {
            mesh: skinned_triangle(),
            extra_texture_configs: vec![TextureConfig {
                id: 2,
                start: 0,
                size: 3,
                mode: 1,
                reserved: [0, 0],
            }],
            extra_indices: vec![2, 1, 0],
            extra_vertices: vec![[7; EXTRA_VERTEX_SIZE]],
        });
        rig.hitbox = vec![0x11; 2 * HITBOX_ENTRY_SIZE];
        rig.sounds = vec![ModelSound { raw: [1, 2, 3, 4, 5, 6, 7, 8] }];
        rig.attachments = vec![Attachment {
            bone: 1,
            mesh: skinned_triangle(),
        }];
        rig.bone_matrices = vec![
            BoneMatrix::from_rows(
                [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
                [0.0; 3],
                0,
            ),
            BoneMatrix::from_rows(
                [[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
                [0.0; 3],
                1,
            ),
        ];
        rig.bone_data = vec![
            BoneData {
                parent: -1,
                rest_translation: [0.0; 3],
            },
            BoneData {
                parent: 0,
                rest_translation: [1.0, 0.0, 0.0],
            },
        ];
        rig.animations = vec![
            Animation {
                unknown: [0.0; 4],
                speed_override: None,
                frames: vec![
                    AnimationFrame {
                        speed: 1.0,
                        bones: vec![BoneKey {
                            rotation: Some(Quat::IDENTITY),
                            translation: Some(Vec3::ZERO),
                            scale: None,
                        }],
                    },
                    AnimationFrame {
                        speed: 1.0,
                        bones: vec![BoneKey {
                            rotation: None,
                            translation: Some(Vec3::X),
                            scale: None,
                        }],
                    },
                ],
            },
            Animation::default(),
        ];
        rig
    }

    #[test]
    fn test_rig_roundtrip() {
        let rig = two_bone_rig(5);
        let bytes = encode_rig(&rig, 0).unwrap();
        let decoded = decode_rig(&bytes, 0, 5, &CodecLimits::default()).unwrap();
        assert!(decoded.is_clean(), "{:?}", decoded.diagnostics);
        assert_eq!(decoded.value, rig);
    }

    #[test]
    fn test_roundtrip_at_unaligned_file_offset() {
        let rig = two_bone_rig(3);
        let bytes = encode_rig(&rig, 0x230).unwrap();
        let mut file = vec![0u8; 0x230];
        file.extend_from_slice(&bytes);
        let decoded = decode_rig(&file, 0x230, 3, &CodecLimits::default()).unwrap();
        assert!(decoded.is_clean());
        assert_eq!(decoded.value, rig);
    }

    #[test]
    fn test_header_gap_depends_on_id() {
        // Two animations: header + pointers = 0x50 bytes
        let menu = RigLayout::plan(&two_bone_rig(0), 0);
        let shared = RigLayout::plan(&two_bone_rig(1), 0);
        let high = RigLayout::plan(&two_bone_rig(4), 0);
        assert_eq!(shared.mesh_header(), Some(0x50));
        assert_eq!(menu.mesh_header(), Some(0x50 + MENU_HOOK_GAP));
        assert_eq!(high.mesh_header(), Some(0x50 + HIGH_ID_GAP));
    }

    #[test]
    fn test_vertex_buffer_on_absolute_128_byte_boundary() {
        let rig = two_bone_rig(4);
        for file_offset in [0, 0x10, 0x40, 0x1234_5670] {
            let layout = RigLayout::plan(&rig, file_offset);
            let vertices = layout.vertex_buffer().unwrap();
            assert_eq!((file_offset + vertices) % VERTEX_BUFFER_ALIGNMENT, 0);
            assert!(vertices >= layout.mesh_header().unwrap() + MESH_HEADER_SIZE);
        }
    }

    #[test]
    fn test_empty_animation_gets_null_pointer() {
        let rig = two_bone_rig(4);
        let layout = RigLayout::plan(&rig, 0);
        let offsets = layout.animation_offsets();
        assert!(offsets[0].is_some());
        assert_eq!(offsets[1], None);

        let bytes = encode_rig(&rig, 0).unwrap();
        assert_eq!(&bytes[RIG_HEADER_SIZE + 4..RIG_HEADER_SIZE + 8], &[0; 4]);
    }

    #[test]
    fn test_shared_skeleton_rigs_skip_bone_blocks() {
        for id in [1, 2] {
            let rig = two_bone_rig(id);
            let layout = RigLayout::plan(&rig, 0);
            assert_eq!(layout.bone_matrices(), None);
            assert_eq!(layout.bone_data(), None);

            let bytes = encode_rig(&rig, 0).unwrap();
            assert_eq!(bytes[0x08], 2, "bone count is kept");
            assert_eq!(&bytes[0x14..0x1C], &[0; 8]);

            let decoded = decode_rig(&bytes, 0, id, &CodecLimits::default()).unwrap().value;
            assert!(decoded.bone_matrices.is_empty());
            assert!(decoded.bone_data.is_empty());
        }
    }

    #[test]
    fn test_bone_table_mismatch_is_rejected() {
        let mut rig = two_bone_rig(4);
        rig.bone_count = 3;
        assert!(matches!(encode_rig(&rig, 0), Err(Error::EncodeInvariant(_))));
    }

    #[test]
    fn test_too_many_sounds_is_rejected() {
        let mut rig = two_bone_rig(4);
        rig.sounds = vec![ModelSound::default(); 256];
        assert!(matches!(encode_rig(&rig, 0), Err(Error::EncodeInvariant(_))));
    }

    #[test]
    fn test_negative_attachment_bone_is_rejected() {
        let mut rig = two_bone_rig(4);
        rig.attachments[0].bone = -1;
        assert!(matches!(encode_rig(&rig, 0), Err(Error::EncodeInvariant(_))));
    }

    #[test]
    fn test_mesh_scale_must_match_header_scale() {
        let mut rig = two_bone_rig(4);
        if let Some(rig_mesh) = rig.mesh.as_mut() {
            rig_mesh.mesh.scale = 3.0;
        }
        assert!(matches!(encode_rig(&rig, 0), Err(Error::EncodeInvariant(_))));

        let mut rig = two_bone_rig(4);
        rig.attachments[0].mesh.scale = 1.0;
        assert!(matches!(encode_rig(&rig, 0), Err(Error::EncodeInvariant(_))));

        // Changing every scale together is fine
        let mut rig = two_bone_rig(4);
        rig.scale = 0.25;
        if let Some(rig_mesh) = rig.mesh.as_mut() {
            rig_mesh.mesh.scale = 0.25;
        }
        for attachment in &mut rig.attachments {
            attachment.mesh.scale = 0.25;
        }
        let bytes = encode_rig(&rig, 0).unwrap();
        assert_eq!(decode_rig(&bytes, 0, 4, &CodecLimits::default()).unwrap().value, rig);
    }

    #[test]
    fn test_bind_pose_survives_roundtrip() {
        let rig = two_bone_rig(4);
        let bytes = encode_rig(&rig, 0).unwrap();
        let decoded = decode_rig(&bytes, 0, 4, &CodecLimits::default()).unwrap().value;
        assert_eq!(decoded.bind_matrix(1), Some(Mat4::from_translation(Vec3::X)));
    }
}
