//! Animation block codec
//!
//! An animation block is a 0x20-byte header followed (somewhere) by a table
//! of frame pointers. Each frame stores a speed, one flag byte per bone
//! channel and then the keys those flags announce.

use glam::{Quat, Vec3};

use super::types::{ANIMATION_HEADER_SIZE, Animation, AnimationFrame, BoneKey, FRAME_HEADER_SIZE};
use crate::config::CodecLimits;
use crate::error::{Error, Result};
use crate::formats::common::{Block, DiagnosticLog, Section, align_up, checked_count};

const KEY_ROTATION: u8 = 0x01;
const KEY_TRANSLATION: u8 = 0x02;
const KEY_SCALE: u8 = 0x04;

const SPEED_OVERRIDE: u8 = 0x01;

fn channel_flags(key: &BoneKey) -> u8 {
    let mut flags = 0;
    if key.rotation.is_some() {
        flags |= KEY_ROTATION;
    }
    if key.translation.is_some() {
        flags |= KEY_TRANSLATION;
    }
    if key.scale.is_some() {
        flags |= KEY_SCALE;
    }
    flags
}

/// Encoded size of one frame.
pub fn frame_size(frame: &AnimationFrame) -> usize {
    let keys: usize = frame
        .bones
        .iter()
        .map(|k| {
            usize::from(k.rotation.is_some()) * 16
                + usize::from(k.translation.is_some()) * 12
                + usize::from(k.scale.is_some()) * 12
        })
        .sum();
    FRAME_HEADER_SIZE + align_up(frame.bones.len(), 4) + keys
}

/// Decode the animation block at `offset`.
pub(crate) fn decode_animation(
    block: &Block<'_>,
    offset: usize,
    limits: &CodecLimits,
    log: &mut DiagnosticLog,
) -> Result<Animation> {
    block.slice(offset, ANIMATION_HEADER_SIZE, "animation header")?;
    let abs = block.base() + offset;

    let mut unknown = [0.0; 4];
    for (i, value) in unknown.iter_mut().enumerate() {
        *value = block.read_f32(offset + i * 4, "animation header")?;
    }
    let frame_count = checked_count(
        i64::from(block.read_u8(offset + 0x10, "animation header")?),
        limits.max_frames,
        "animation frame count",
    )?;
    let flags = block.read_u8(offset + 0x11, "animation header")?;
    log.expect_zero(
        "animation reserved",
        abs + 0x12,
        i64::from(block.read_u16(offset + 0x12, "animation header")?),
    );
    let speed = block.read_f32(offset + 0x14, "animation header")?;
    let frame_table = block.read_ptr(offset + 0x18, "animation frame table")?;
    log.expect_zero(
        "animation reserved",
        abs + 0x1C,
        i64::from(block.read_i32(offset + 0x1C, "animation header")?),
    );
    log.expect_zero("animation flags", abs + 0x11, i64::from(flags & !SPEED_OVERRIDE));

    let speed_override = if flags & SPEED_OVERRIDE == 0 {
        log.expect_zero("animation speed without override", abs + 0x14, i64::from(speed.to_bits()));
        None
    } else {
        Some(speed)
    };

    let mut frames = Vec::with_capacity(frame_count);
    match frame_table {
        Some(table) => {
            block.table(table, frame_count, 4, "animation frame table")?;
            for i in 0..frame_count {
                match block.read_ptr(table + i * 4, "animation frame pointer")? {
                    Some(ptr) => frames.push(decode_frame(block, ptr, limits, log)?),
                    None => {
                        log.report("null animation frame pointer", block.base() + table + i * 4, i as i64);
                        frames.push(AnimationFrame::default());
                    }
                }
            }
        }
        None => log.expect_zero("animation frame count", abs + 0x10, frame_count as i64),
    }

    Ok(Animation {
        unknown,
        speed_override,
        frames,
    })
}

fn decode_frame(
    block: &Block<'_>,
    offset: usize,
    limits: &CodecLimits,
    log: &mut DiagnosticLog,
) -> Result<AnimationFrame> {
    let abs = block.base() + offset;
    let speed = block.read_f32(offset, "animation frame")?;
    let channels = checked_count(
        i64::from(block.read_u16(offset + 0x04, "animation frame")?),
        limits.max_bones,
        "animation channel count",
    )?;
    log.expect_zero(
        "animation frame reserved",
        abs + 0x06,
        i64::from(block.read_u16(offset + 0x06, "animation frame")?),
    );

    let flags = block.slice(offset + FRAME_HEADER_SIZE, channels, "animation channel flags")?;
    let mut cursor = offset + FRAME_HEADER_SIZE + align_up(channels, 4);
    let mut bones = Vec::with_capacity(channels);
    for (channel, &flag) in flags.iter().enumerate() {
        log.expect_zero(
            "animation channel flags",
            abs + FRAME_HEADER_SIZE + channel,
            i64::from(flag & !(KEY_ROTATION | KEY_TRANSLATION | KEY_SCALE)),
        );
        let mut key = BoneKey::default();
        if flag & KEY_ROTATION != 0 {
            let [x, y, z] = block.read_vec3(cursor, "rotation key")?;
            let w = block.read_f32(cursor + 12, "rotation key")?;
            key.rotation = Some(Quat::from_xyzw(x, y, z, w));
            cursor += 16;
        }
        if flag & KEY_TRANSLATION != 0 {
            key.translation = Some(Vec3::from_array(block.read_vec3(cursor, "translation key")?));
            cursor += 12;
        }
        if flag & KEY_SCALE != 0 {
            key.scale = Some(Vec3::from_array(block.read_vec3(cursor, "scale key")?));
            cursor += 12;
        }
        bones.push(key);
    }

    Ok(AnimationFrame { speed, bones })
}

/// Offsets of one animation's pieces within the rig block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnimationPlan {
    pub header: usize,
    pub frame_table: usize,
    pub frames: Vec<usize>,
}

impl AnimationPlan {
    /// Lay out `animation` starting at `cursor`; returns the plan and its end.
    pub fn new(animation: &Animation, cursor: usize) -> (Self, usize) {
        let header = align_up(cursor, 16);
        let frame_table = header + ANIMATION_HEADER_SIZE;
        let mut end = frame_table + animation.frames.len() * 4;
        let frames = animation
            .frames
            .iter()
            .map(|frame| {
                let at = align_up(end, 16);
                end = at + frame_size(frame);
                at
            })
            .collect();
        (
            Self {
                header,
                frame_table,
                frames,
            },
            end,
        )
    }
}

/// Check an animation fits its u8/u16 count fields.
pub(crate) fn validate_animation(animation: &Animation, index: usize) -> Result<()> {
    if animation.frames.len() > usize::from(u8::MAX) {
        return Err(Error::encode(format!(
            "animation {index}: {} frames do not fit an 8-bit count",
            animation.frames.len()
        )));
    }
    if let Some(frame) = animation.frames.iter().find(|f| f.bones.len() > usize::from(u8::MAX)) {
        return Err(Error::encode(format!(
            "animation {index}: {} channels in one frame exceed the bone limit",
            frame.bones.len()
        )));
    }
    Ok(())
}

/// Write an animation at the offsets in `plan`.
pub(crate) fn write_animation(section: &mut Section, animation: &Animation, plan: &AnimationPlan) {
    section.pad_to(plan.header);
    for value in animation.unknown {
        section.write_f32(value);
    }
    section.write_u8(animation.frames.len() as u8);
    section.write_u8(if animation.speed_override.is_some() { SPEED_OVERRIDE } else { 0 });
    section.write_u16(0);
    section.write_f32(animation.speed_override.unwrap_or(0.0));
    section.write_ptr((!animation.frames.is_empty()).then_some(plan.frame_table));
    section.write_i32(0);

    for &at in &plan.frames {
        section.write_ptr(Some(at));
    }
    for (frame, &at) in animation.frames.iter().zip(&plan.frames) {
        section.pad_to(at);
        write_frame(section, frame);
    }
}

fn write_frame(section: &mut Section, frame: &AnimationFrame) {
    section.write_f32(frame.speed);
    section.write_u16(frame.bones.len() as u16);
    section.write_u16(0);
    for key in &frame.bones {
        section.write_u8(channel_flags(key));
    }
    section.align(4);
    for key in &frame.bones {
        if let Some(q) = key.rotation {
            section.write_vec3([q.x, q.y, q.z]);
            section.write_f32(q.w);
        }
        if let Some(t) = key.translation {
            section.write_vec3(t.to_array());
        }
        if let Some(s) = key.scale {
            section.write_vec3(s.to_array());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_animation() -> Animation {
        Animation {
            unknown: [1.0, 0.0, -1.0, 0.5],
            speed_override: Some(2.0),
            frames: vec![
                AnimationFrame {
                    speed: 1.0,
                    bones: vec![
                        BoneKey {
                            rotation: Some(Quat::from_rotation_y(0.5)),
                            translation: Some(Vec3::new(1.0, 2.0, 3.0)),
                            scale: None,
                        },
                        BoneKey::default(),
                        BoneKey {
                            rotation: None,
                            translation: None,
                            scale: Some(Vec3::splat(2.0)),
                        },
                    ],
                },
                AnimationFrame {
                    speed: 0.5,
                    bones: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn test_frame_size_pads_flags() {
        let animation = sample_animation();
        // 8 header + 4 flag bytes (3 padded) + 16 + 12 + 12
        assert_eq!(frame_size(&animation.frames[0]), 8 + 4 + 40);
        assert_eq!(frame_size(&animation.frames[1]), 8);
    }

    #[test]
    fn test_animation_roundtrip() {
        let animation = sample_animation();
        let (plan, end) = AnimationPlan::new(&animation, 0x10);
        assert_eq!(plan.header, 0x10);
        assert_eq!(plan.frame_table, 0x30);
        assert_eq!(plan.frames, vec![0x40, 0x80]);
        assert_eq!(end, 0x88);

        let mut section = Section::new();
        write_animation(&mut section, &animation, &plan);
        assert_eq!(section.len(), end);

        let mut log = DiagnosticLog::default();
        let bytes = section.into_bytes();
        let decoded = decode_animation(&Block::new(&bytes), 0x10, &CodecLimits::default(), &mut log).unwrap();
        assert!(log.finish(()).is_clean());
        assert_eq!(decoded, animation);
    }

    #[test]
    fn test_speed_without_override_flag_is_reported() {
        let animation = Animation {
            speed_override: Some(3.0),
            ..Animation::default()
        };
        let (plan, _) = AnimationPlan::new(&animation, 0);
        let mut section = Section::new();
        write_animation(&mut section, &animation, &plan);
        let mut bytes = section.into_bytes();
        bytes[0x11] = 0;

        let mut log = DiagnosticLog::default();
        let decoded = decode_animation(&Block::new(&bytes), 0, &CodecLimits::default(), &mut log).unwrap();
        assert_eq!(decoded.speed_override, None);
        let diagnostics = log.finish(()).diagnostics;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].offset, 0x14);
    }

    #[test]
    fn test_too_many_frames_is_rejected() {
        let animation = Animation {
            frames: vec![AnimationFrame::default(); 256],
            ..Animation::default()
        };
        assert!(matches!(validate_animation(&animation, 0), Err(Error::EncodeInvariant(_))));
    }
}
