//! Mesh CLI commands

use std::path::Path;

use super::load_limits;
use crate::formats::common::Block;
use crate::formats::mesh::{TexConfigShape, VertexLayout, decode_static_mesh};

/// Decode a static mesh block and display its tables.
pub fn inspect(
    path: &Path,
    offset: usize,
    layout: VertexLayout,
    shape: TexConfigShape,
    json: bool,
    limits: Option<&Path>,
) -> anyhow::Result<()> {
    let limits = load_limits(limits)?;
    let data = std::fs::read(path)?;
    let block = Block::at(&data, offset)?;
    let decoded = decode_static_mesh(&block, 0, layout, shape, 1.0, &limits)?;
    let mesh = &decoded.value;

    if json {
        let summary = serde_json::json!({
            "layout": layout.to_string(),
            "vertex_count": mesh.vertices.len(),
            "index_count": mesh.indices.len(),
            "triangle_count": mesh.triangle_count(),
            "texture_configs": mesh.texture_configs,
            "diagnostics": decoded.diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Mesh block at 0x{offset:X} in {} ({layout})", path.display());
    println!();
    println!("Vertices:  {}", mesh.vertices.len());
    println!("Indices:   {}", mesh.indices.len());
    println!("Triangles: {}", mesh.triangle_count());
    println!();

    println!("Texture configs ({}):", mesh.texture_configs.len());
    for (i, config) in mesh.texture_configs.iter().enumerate() {
        println!(
            "  [{i:2}] texture {:5} | indices {:>6}..{:<6} | mode {}",
            config.id,
            config.start,
            config.start + config.size,
            config.mode
        );
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
