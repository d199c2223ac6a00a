//! Bone hierarchy
//!
//! Bind matrices are stored in model space. The hierarchy derived here adds
//! parent-relative transforms and a depth-first traversal order.

use glam::{Mat4, Vec3};

use super::types::{BoneData, BoneMatrix, Rig};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonBone {
    pub index: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Model-space bind transform.
    pub bind: Mat4,
    pub inverse_bind: Mat4,
    /// Bind transform relative to the parent's.
    pub relative: Mat4,
    pub rest_translation: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    bones: Vec<SkeletonBone>,
}

impl Skeleton {
    /// Build the hierarchy of a decoded rig.
    ///
    /// # Errors
    /// Returns `InvalidSkeleton` if a bone's parent does not precede it.
    pub fn from_rig(rig: &Rig) -> Result<Self> {
        Self::from_parts(&rig.bone_matrices, &rig.bone_data)
    }

    /// Build from separate bind and bone data tables. Either may be empty;
    /// bones without data hang off the root, bones without a matrix bind at
    /// their rest translation.
    pub fn from_parts(matrices: &[BoneMatrix], data: &[BoneData]) -> Result<Self> {
        let count = matrices.len().max(data.len());
        let mut bones: Vec<SkeletonBone> = Vec::with_capacity(count);

        for index in 0..count {
            let rest_translation = data
                .get(index)
                .map_or(Vec3::ZERO, |d| Vec3::from_array(d.rest_translation));
            let parent = match (index, data.get(index)) {
                (0, _) => None,
                (_, None) => Some(0),
                (_, Some(d)) if d.parent >= 0 && (d.parent as usize) < index => Some(d.parent as usize),
                (_, Some(d)) => {
                    return Err(Error::InvalidSkeleton {
                        bone: index,
                        parent: d.parent,
                    });
                }
            };
            let bind = matrices
                .get(index)
                .map_or_else(|| Mat4::from_translation(rest_translation), |m| m.transform);
            let relative = match parent {
                Some(p) => bones[p].inverse_bind * bind,
                None => bind,
            };
            if let Some(p) = parent {
                bones[p].children.push(index);
            }
            bones.push(SkeletonBone {
                index,
                parent,
                children: Vec::new(),
                bind,
                inverse_bind: bind.inverse(),
                relative,
                rest_translation,
            });
        }

        tracing::trace!("Built skeleton with {count} bones");
        Ok(Self { bones })
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[SkeletonBone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&SkeletonBone> {
        self.bones.get(index)
    }

    pub fn root(&self) -> Option<&SkeletonBone> {
        self.bones.first()
    }

    /// Bone indices in depth-first order from the root.
    pub fn depth_first(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack: Vec<usize> = self.root().map(|r| r.index).into_iter().collect();
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.bones[index].children.iter().rev());
        }
        order
    }

    /// Compose per-bone local transforms into model-space matrices.
    ///
    /// `local` is indexed by bone; missing entries use the bind-relative
    /// transform.
    pub fn model_transforms(&self, local: &[Mat4]) -> Vec<Mat4> {
        let mut world = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let own = local.get(bone.index).copied().unwrap_or(bone.relative);
            world.push(match bone.parent {
                Some(p) => world[p] * own,
                None => own,
            });
        }
        world
    }

    /// Skinning matrices (model transform times inverse bind) for a pose.
    pub fn skinning_matrices(&self, local: &[Mat4]) -> Vec<Mat4> {
        self.model_transforms(local)
            .into_iter()
            .zip(&self.bones)
            .map(|(world, bone)| world * bone.inverse_bind)
            .collect()
    }
}
