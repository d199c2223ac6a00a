//! Rig CLI commands
//!
//! Commands for inspecting and round-tripping skinned rigs.

use std::path::Path;

use super::load_limits;
use crate::formats::rig::{RigSummary, Skeleton, decode_rig, encode_rig};

/// Decode a rig and display its structure.
pub fn inspect(
    path: &Path,
    offset: usize,
    id: u16,
    json: bool,
    limits: Option<&Path>,
) -> anyhow::Result<()> {
    let limits = load_limits(limits)?;
    let data = std::fs::read(path)?;
    let decoded = decode_rig(&data, offset, id, &limits)?;
    let rig = &decoded.value;
    let summary = RigSummary::from(rig);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Rig {} at 0x{offset:X} in {}", rig.id, path.display());
    println!();
    println!("Bones:          {}", summary.bone_count);
    println!("Scale:          {}", summary.scale);
    println!("Color:          0x{:08X}", summary.color);
    println!("Vertices:       {}", summary.vertex_count);
    println!("Triangles:      {}", summary.triangle_count);
    println!("Texture configs: {}", summary.texture_config_count);
    println!("Extra vertices: {}", summary.extra_vertex_count);
    println!("Hitbox entries: {}", summary.hitbox_entries);
    println!("Sounds:         {}", summary.sound_count);
    println!("Attachments:    {}", summary.attachment_count);
    println!();

    println!("Animations ({}):", summary.animation_frames.len());
    for (i, frames) in summary.animation_frames.iter().enumerate() {
        println!("  [{i:2}] {frames} frames");
    }

    if !rig.bone_data.is_empty() {
        let skeleton = Skeleton::from_rig(rig)?;
        println!();
        println!("Skeleton:");
        for index in skeleton.depth_first() {
            if let Some(bone) = skeleton.bone(index) {
                let depth = std::iter::successors(bone.parent, |&p| {
                    skeleton.bone(p).and_then(|b| b.parent)
                })
                .count();
                let [x, y, z] = bone.rest_translation.to_array();
                println!(
                    "  {:indent$}{index} ({x:.3}, {y:.3}, {z:.3})",
                    "",
                    indent = depth * 2
                );
            }
        }
    }

    if !decoded.diagnostics.is_empty() {
        println!();
        println!("Diagnostics ({}):", decoded.diagnostics.len());
        for diagnostic in &decoded.diagnostics {
            println!("  - {diagnostic}");
        }
    }

    Ok(())
}

/// Decode a rig, re-encode it at the same offset and write the result.
pub fn roundtrip(
    path: &Path,
    offset: usize,
    id: u16,
    output: &Path,
    limits: Option<&Path>,
) -> anyhow::Result<()> {
    let limits = load_limits(limits)?;
    let data = std::fs::read(path)?;
    let decoded = decode_rig(&data, offset, id, &limits)?;
    for diagnostic in &decoded.diagnostics {
        tracing::warn!("{diagnostic}");
    }

    let bytes = encode_rig(&decoded.value, offset)?;
    std::fs::write(output, &bytes)?;

    // Decoding the fresh encoding must give back the same rig
    let matches = decode_rig(&bytes, 0, id, &limits)?.value == decoded.value;

    println!("Encoded rig {id}: {} bytes", bytes.len());
    println!("Written to: {}", output.display());
    println!("Round-trip: {}", if matches { "OK" } else { "MISMATCH" });

    if !matches {
        anyhow::bail!("re-encoded rig does not decode to the original");
    }
    Ok(())
}
