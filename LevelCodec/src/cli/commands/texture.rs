//! CLI commands for texture operations

use std::path::Path;

use crate::converter::write_texture_png;
use crate::formats::texture::CompressedTexture;

/// Decompress a DXT5 surface from a level file and write it as PNG
pub fn export(
    path: &Path,
    offset: usize,
    width: u32,
    height: u32,
    output: &Path,
) -> anyhow::Result<()> {
    let data = std::fs::read(path)?;
    let texture = CompressedTexture::from_source(&data, offset, width, height, 1)?;
    let info = texture.info();

    println!("Exporting DXT5 texture at 0x{offset:X} from {}", path.display());
    println!("Dimensions: {}x{}", info.width, info.height);
    println!("Compressed size: {} bytes", info.compressed_size);

    write_texture_png(&texture, output)?;

    println!("Written to: {}", output.display());
    Ok(())
}
