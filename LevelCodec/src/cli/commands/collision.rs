//! Collision CLI commands

use std::path::Path;

use super::load_limits;
use crate::formats::collision::{CollisionSummary, decode_collision_with_stats};
use crate::formats::common::Block;

/// Decode a collision grid and display a summary of its triangles.
pub fn inspect(path: &Path, offset: usize, json: bool, limits: Option<&Path>) -> anyhow::Result<()> {
    let limits = load_limits(limits)?;
    let data = std::fs::read(path)?;
    let block = Block::at(&data, offset)?;
    let (decoded, leaves) = decode_collision_with_stats(&block, &limits)?;
    let summary = CollisionSummary::new(&decoded.value, leaves);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Collision grid at 0x{offset:X} in {}", path.display());
    println!();
    println!("Leaves:    {}", summary.leaf_count);
    println!("Vertices:  {}", summary.vertex_count);
    println!("Triangles: {}", summary.triangle_count);
    println!(
        "Bounds:    ({:.2}, {:.2}, {:.2}) - ({:.2}, {:.2}, {:.2})",
        summary.bounds_min[0],
        summary.bounds_min[1],
        summary.bounds_min[2],
        summary.bounds_max[0],
        summary.bounds_max[1],
        summary.bounds_max[2]
    );
    println!();

    println!("Classifications ({}):", summary.classes.len());
    for (class, count) in &summary.classes {
        println!("  0x{class:02X}: {count} triangles");
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
