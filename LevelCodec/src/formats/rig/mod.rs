//! Skinned rig codec
//!
//! A rig block holds a skinned mesh with its bind skeleton, animations,
//! sound bindings, hitboxes and bone attachments. Every pointer inside a rig
//! is relative to the rig header.
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

pub mod animation;
pub mod pose;
pub mod reader;
pub mod skeleton;
pub mod types;
pub mod writer;

pub use animation::frame_size;
pub use pose::BoneTransform;
pub use reader::{RigHeader, decode_rig, read_rig_header};
pub use skeleton::{Skeleton, SkeletonBone};
pub use types::{
    Animation, AnimationFrame, Attachment, BoneData, BoneKey, BoneMatrix, ModelSound, Rig,
    RigMesh, RigSummary, RigUnknowns, uses_shared_skeleton,
};
pub use writer::{RigLayout, encode_rig};
