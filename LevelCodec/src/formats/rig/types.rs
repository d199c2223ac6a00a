//! Rig data structures.

use glam::{Mat4, Quat, Vec3, Vec4};
use serde::Serialize;

use crate::formats::mesh::{Mesh, TextureConfig};

// ============================================================================
// Block sizes
// ============================================================================

/// Fixed part of the rig header, before the animation pointer table.
pub const RIG_HEADER_SIZE: usize = 0x48;
pub const BONE_MATRIX_SIZE: usize = 0x40;
pub const BONE_DATA_SIZE: usize = 0x10;
pub const SOUND_SIZE: usize = 0x20;
pub const HITBOX_ENTRY_SIZE: usize = 0x10;
pub const EXTRA_VERTEX_SIZE: usize = 0x10;
pub const ATTACHMENT_HEADER_SIZE: usize = 0x10;
pub const ANIMATION_HEADER_SIZE: usize = 0x20;
pub const FRAME_HEADER_SIZE: usize = 0x08;

// ============================================================================
// Encoder quirks
// ============================================================================

/// Gap the engine fills with menu animation hooks for rig id 0.
pub const MENU_HOOK_GAP: usize = 0x80;
/// Gap reserved after the header for rig ids above 2.
pub const HIGH_ID_GAP: usize = 0x20;
/// Vertex buffers start on this absolute file boundary.
pub const VERTEX_BUFFER_ALIGNMENT: usize = 0x80;

/// Rig ids 1 and 2 borrow their skeleton from a shared rig elsewhere.
pub const fn uses_shared_skeleton(id: u16) -> bool {
    matches!(id, 1 | 2)
}

// ============================================================================
// Rig
// ============================================================================

/// Header fields with no recovered meaning, kept for round-tripping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RigUnknowns {
    pub byte_0a: u8,
    pub low_poly_render_distance: u8,
    pub byte_0f: u8,
    pub floats: [f32; 4],
    pub word_44: u32,
}

/// A skinned model: bones, animations, sounds, attachments and a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Rig {
    pub id: u16,
    /// Header bone count; zero means "use the low-poly count".
    pub bone_count: u8,
    pub low_poly_bone_count: u8,
    pub scale: f32,
    /// Packed RGBA.
    pub color: u32,
    pub unknowns: RigUnknowns,
    pub mesh: Option<RigMesh>,
    /// Opaque hitbox records, 0x10 bytes each.
    pub hitbox: Vec<u8>,
    pub sounds: Vec<ModelSound>,
    pub attachments: Vec<Attachment>,
    pub bone_matrices: Vec<BoneMatrix>,
    pub bone_data: Vec<BoneData>,
    pub animations: Vec<Animation>,
}

impl Rig {
    /// An empty rig with the given id.
    pub fn new(id: u16) -> Self {
        Self {
            id,
            bone_count: 0,
            low_poly_bone_count: 0,
            scale: 1.0,
            color: 0,
            unknowns: RigUnknowns::default(),
            mesh: None,
            hitbox: Vec::new(),
            sounds: Vec::new(),
            attachments: Vec::new(),
            bone_matrices: Vec::new(),
            bone_data: Vec::new(),
            animations: Vec::new(),
        }
    }

    /// Number of bones the bone tables hold.
    pub fn effective_bone_count(&self) -> usize {
        if self.bone_count == 0 {
            usize::from(self.low_poly_bone_count)
        } else {
            usize::from(self.bone_count)
        }
    }

    pub fn rest_translation(&self, bone: usize) -> Vec3 {
        self.bone_data
            .get(bone)
            .map_or(Vec3::ZERO, |b| Vec3::from_array(b.rest_translation))
    }

    pub fn bind_matrix(&self, bone: usize) -> Option<Mat4> {
        self.bone_matrices.get(bone).map(|m| m.transform)
    }

    pub fn inverse_bind_matrix(&self, bone: usize) -> Option<Mat4> {
        self.bind_matrix(bone).map(|m| m.inverse())
    }
}

/// The rig's geometry: a skinned mesh plus the secondary tables that follow it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RigMesh {
    pub mesh: Mesh,
    pub extra_texture_configs: Vec<TextureConfig>,
    pub extra_indices: Vec<u16>,
    /// Opaque 0x10-byte records following the vertex buffer.
    pub extra_vertices: Vec<[u8; EXTRA_VERTEX_SIZE]>,
}

/// An opaque sound binding record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelSound {
    pub raw: [u32; 8],
}

/// A sub-mesh attached to one bone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachment {
    pub bone: i32,
    pub mesh: Mesh,
}

/// A bone's bind transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneMatrix {
    pub id: i32,
    pub transform: Mat4,
    /// Three floats between the matrix rows and the id; meaning unknown.
    pub aux: [f32; 3],
}

impl BoneMatrix {
    /// Build from the three stored rows of a row-major 3x4 affine matrix.
    pub fn from_rows(rows: [[f32; 4]; 3], aux: [f32; 3], id: i32) -> Self {
        let [r0, r1, r2] = rows;
        let transform = Mat4::from_cols(
            Vec4::new(r0[0], r1[0], r2[0], 0.0),
            Vec4::new(r0[1], r1[1], r2[1], 0.0),
            Vec4::new(r0[2], r1[2], r2[2], 0.0),
            Vec4::new(r0[3], r1[3], r2[3], 1.0),
        );
        Self { id, transform, aux }
    }

    /// The three stored rows of the affine part.
    pub fn rows(&self) -> [[f32; 4]; 3] {
        [
            self.transform.row(0).to_array(),
            self.transform.row(1).to_array(),
            self.transform.row(2).to_array(),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BoneData {
    pub parent: i32,
    pub rest_translation: [f32; 3],
}

// ============================================================================
// Animation
// ============================================================================

/// One bone's key in a frame. Absent parts fall back to the bind pose.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoneKey {
    pub rotation: Option<Quat>,
    pub translation: Option<Vec3>,
    pub scale: Option<Vec3>,
}

impl BoneKey {
    pub fn is_empty(&self) -> bool {
        self.rotation.is_none() && self.translation.is_none() && self.scale.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationFrame {
    pub speed: f32,
    /// Keys by bone index; bones past the end have no key.
    pub bones: Vec<BoneKey>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    pub unknown: [f32; 4],
    pub speed_override: Option<f32>,
    pub frames: Vec<AnimationFrame>,
}

/// Summary of a rig for inspection output.
#[derive(Debug, Clone, Serialize)]
pub struct RigSummary {
    pub id: u16,
    pub bone_count: usize,
    pub scale: f32,
    pub color: u32,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub texture_config_count: usize,
    pub extra_vertex_count: usize,
    pub hitbox_entries: usize,
    pub sound_count: usize,
    pub attachment_count: usize,
    pub animation_frames: Vec<usize>,
    pub unknowns: RigUnknowns,
}

impl From<&Rig> for RigSummary {
    fn from(rig: &Rig) -> Self {
        let mesh = rig.mesh.as_ref();
        Self {
            id: rig.id,
            bone_count: rig.effective_bone_count(),
            scale: rig.scale,
            color: rig.color,
            vertex_count: mesh.map_or(0, |m| m.mesh.vertices.len()),
            triangle_count: mesh.map_or(0, |m| m.mesh.triangle_count()),
            texture_config_count: mesh.map_or(0, |m| m.mesh.texture_configs.len()),
            extra_vertex_count: mesh.map_or(0, |m| m.extra_vertices.len()),
            hitbox_entries: rig.hitbox.len() / HITBOX_ENTRY_SIZE,
            sound_count: rig.sounds.len(),
            attachment_count: rig.attachments.len(),
            animation_frames: rig.animations.iter().map(|a| a.frames.len()).collect(),
            unknowns: rig.unknowns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bone_matrix_rows_roundtrip() {
        let rows = [
            [1.0, 0.0, 0.0, 5.0],
            [0.0, 0.0, -1.0, 6.0],
            [0.0, 1.0, 0.0, 7.0],
        ];
        let matrix = BoneMatrix::from_rows(rows, [0.5, 0.25, 0.125], 3);
        assert_eq!(matrix.rows(), rows);
        assert_eq!(matrix.transform.w_axis, Vec4::new(5.0, 6.0, 7.0, 1.0));
        assert_eq!(matrix.transform.transform_point3(Vec3::ZERO), Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn test_effective_bone_count_falls_back_to_low_poly() {
        let mut rig = Rig::new(5);
        rig.low_poly_bone_count = 4;
        assert_eq!(rig.effective_bone_count(), 4);
        rig.bone_count = 9;
        assert_eq!(rig.effective_bone_count(), 9);
    }

    #[test]
    fn test_shared_skeleton_ids() {
        assert!(!uses_shared_skeleton(0));
        assert!(uses_shared_skeleton(1));
        assert!(uses_shared_skeleton(2));
        assert!(!uses_shared_skeleton(3));
    }
}
