//! DXT5 texture to PNG export
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::RgbaImage;

use crate::error::{Error, Result};
use crate::formats::texture::{CompressedTexture, decode_dxt5};

/// Encode an RGBA raster as PNG bytes.
///
/// # Errors
/// Returns an error if PNG encoding fails.
pub fn rgba_to_png_bytes(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut png_data = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_data);
    image
        .write_with_encoder(encoder)
        .map_err(|e| Error::PngEncodeFailed {
            message: e.to_string(),
        })?;
    Ok(png_data)
}

/// Decode a DXT5 surface and encode it as PNG bytes.
///
/// # Errors
/// Returns an error if the surface cannot be decoded or encoded.
pub fn dxt5_bytes_to_png_bytes(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    rgba_to_png_bytes(&decode_dxt5(data, width, height)?)
}

/// Write a texture's top level to a PNG file.
///
/// # Errors
/// Returns an error if decoding, encoding or writing fails.
pub fn write_texture_png<P: AsRef<Path>>(texture: &CompressedTexture, png_path: P) -> Result<()> {
    let image = texture.rgba()?;
    let png_data = rgba_to_png_bytes(&image)?;
    let mut output = BufWriter::new(File::create(png_path.as_ref())?);
    output.write_all(&png_data)?;
    output.flush()?;
    tracing::debug!(
        "Wrote {}x{} texture to {}",
        texture.width(),
        texture.height(),
        png_path.as_ref().display()
    );
    Ok(())
}

/// Export a DXT5 surface found at `offset` in `source_path` to a PNG file.
///
/// # Errors
/// Returns an error if the file cannot be read, the surface lies outside it,
/// or conversion fails.
pub fn convert_dxt5_to_png<P: AsRef<Path>, Q: AsRef<Path>>(
    source_path: P,
    offset: usize,
    width: u32,
    height: u32,
    png_path: Q,
) -> Result<()> {
    let source = std::fs::read(source_path.as_ref())?;
    let texture = CompressedTexture::from_source(&source, offset, width, height, 1)?;
    write_texture_png(&texture, png_path)
}
