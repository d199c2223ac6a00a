//! Animation sampling
//!
//! A pose for one bone is blended between frame N and frame N+1 (wrapping to
//! frame 0 after the last). Channels a frame does not key fall back to the
//! bind pose: identity rotation, the bone's rest translation and unit scale.

use glam::{Mat4, Quat, Vec3};
use serde::Serialize;

use super::types::{Animation, BoneKey, Rig};
use crate::error::{Error, Result};

/// A decomposed local bone transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoneTransform {
    pub rotation: Quat,
    pub translation: Vec3,
    pub scale: Vec3,
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    /// The bind pose of a bone at `rest_translation`.
    pub fn rest(rest_translation: Vec3) -> Self {
        Self {
            translation: rest_translation,
            ..Self::IDENTITY
        }
    }

    /// `key` with missing channels filled from the bind pose.
    pub fn from_key(key: Option<&BoneKey>, rest_translation: Vec3) -> Self {
        let rest = Self::rest(rest_translation);
        match key {
            Some(key) => Self {
                rotation: key.rotation.unwrap_or(rest.rotation),
                translation: key.translation.unwrap_or(rest.translation),
                scale: key.scale.unwrap_or(rest.scale),
            },
            None => rest,
        }
    }

    /// Blend toward `other`; `t` is clamped to [0, 1] and the endpoints are exact.
    pub fn blend(&self, other: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 {
            return *self;
        }
        if t == 1.0 {
            return *other;
        }
        Self {
            rotation: self.rotation.slerp(other.rotation, t),
            translation: self.translation.lerp(other.translation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    /// Local matrix: translation, then rotation, then scale (T * R * S).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Animation {
    /// Speed used when advancing from `frame`: the override when present,
    /// otherwise the frame's own speed.
    pub fn effective_speed(&self, frame: usize) -> f32 {
        self.speed_override
            .or_else(|| self.frames.get(frame).map(|f| f.speed))
            .unwrap_or(0.0)
    }

    /// The frame blended toward from `frame`.
    pub fn next_frame(&self, frame: usize) -> usize {
        if frame + 1 >= self.frames.len() { 0 } else { frame + 1 }
    }

    /// Sample one bone at `frame` with `blend` toward the next frame.
    ///
    /// A frame whose own speed is exactly zero steps discretely: the blend is
    /// pinned at 1.0 whatever the speed override says.
    ///
    /// # Errors
    /// Returns `InvalidIndex` if `frame` is past the last frame.
    pub fn sample_bone(
        &self,
        bone: usize,
        frame: usize,
        blend: f32,
        rest_translation: Vec3,
    ) -> Result<BoneTransform> {
        let current = self.frames.get(frame).ok_or(Error::InvalidIndex {
            context: "animation frame",
            index: frame as i64,
            limit: self.frames.len(),
        })?;
        let next = &self.frames[self.next_frame(frame)];

        let blend = if current.speed == 0.0 { 1.0 } else { blend };
        let from = BoneTransform::from_key(current.bones.get(bone), rest_translation);
        let to = BoneTransform::from_key(next.bones.get(bone), rest_translation);
        Ok(from.blend(&to, blend))
    }
}

impl Rig {
    /// Sample `bone` of animation `animation` at `frame` + `blend`.
    ///
    /// # Errors
    /// Returns `InvalidIndex` if the animation, frame or bone does not exist.
    pub fn sample_bone(
        &self,
        animation: usize,
        bone: usize,
        frame: usize,
        blend: f32,
    ) -> Result<BoneTransform> {
        let anim = self.animations.get(animation).ok_or(Error::InvalidIndex {
            context: "animation",
            index: animation as i64,
            limit: self.animations.len(),
        })?;
        let bones = self.effective_bone_count().max(self.bone_data.len());
        if bone >= bones {
            return Err(Error::InvalidIndex {
                context: "bone",
                index: bone as i64,
                limit: bones,
            });
        }
        anim.sample_bone(bone, frame, blend, self.rest_translation(bone))
    }

    /// Local transform matrix of `bone`, see [`Rig::sample_bone`].
    pub fn local_transform(
        &self,
        animation: usize,
        bone: usize,
        frame: usize,
        blend: f32,
    ) -> Result<Mat4> {
        Ok(self.sample_bone(animation, bone, frame, blend)?.to_matrix())
    }

    /// Local transforms of every bone, indexed by bone.
    pub fn sample_pose(&self, animation: usize, frame: usize, blend: f32) -> Result<Vec<Mat4>> {
        (0..self.effective_bone_count())
            .map(|bone| self.local_transform(animation, bone, frame, blend))
            .collect()
    }
}
