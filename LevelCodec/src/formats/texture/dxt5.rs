//! DXT5 (BC3) block decompression
//!
//! Each 4x4 block is 16 bytes: two alpha anchors, 48 bits of 3-bit alpha
//! indices, two RGB565 color anchors and 32 bits of 2-bit color indices.
//! Block payloads are little-endian regardless of the container's byte order.
//!
//! The palette math uses exact integer rounding so output matches the
//! hardware decoder bit for bit.

use image::RgbaImage;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Bytes per compressed 4x4 block.
pub const DXT5_BLOCK_SIZE: usize = 16;

/// Size in bytes of a DXT5 surface of the given dimensions.
///
/// # Errors
/// Returns `InvalidCount` if the size does not fit in `usize`.
pub fn dxt5_surface_size(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .div_ceil(4)
        .checked_mul((height as usize).div_ceil(4))
        .and_then(|blocks| blocks.checked_mul(DXT5_BLOCK_SIZE))
        .ok_or(Error::InvalidCount {
            context: "texture dimensions",
            count: i64::from(width.max(height)),
        })
}

/// Expand a 5-bit channel to 8 bits.
pub const fn expand_5(c: u16) -> u8 {
    let t = c as u32 * 255 + 16;
    ((t / 32 + t) / 32) as u8
}

/// Expand a 6-bit channel to 8 bits.
pub const fn expand_6(c: u16) -> u8 {
    let t = c as u32 * 255 + 32;
    ((t / 64 + t) / 64) as u8
}

fn rgb565(c: u16) -> [u8; 3] {
    [expand_5(c >> 11), expand_6((c >> 5) & 0x3F), expand_5(c & 0x1F)]
}

/// The four-entry color palette of a block.
fn color_palette(c0: u16, c1: u16) -> [[u8; 3]; 4] {
    let a = rgb565(c0);
    let b = rgb565(c1);
    let mix = |wa: u32, wb: u32| -> [u8; 3] {
        std::array::from_fn(|i| ((wa * u32::from(a[i]) + wb * u32::from(b[i])) / 3) as u8)
    };
    [a, b, mix(2, 1), mix(1, 2)]
}

/// The eight-entry alpha palette of a block.
fn alpha_palette(a0: u8, a1: u8) -> [u8; 8] {
    let (a0w, a1w) = (u32::from(a0), u32::from(a1));
    let mut palette = [0u8; 8];
    palette[0] = a0;
    palette[1] = a1;
    if a0 > a1 {
        for i in 2..8u32 {
            palette[i as usize] = (((8 - i) * a0w + (i - 1) * a1w) / 7) as u8;
        }
    } else {
        for i in 2..6u32 {
            palette[i as usize] = (((6 - i) * a0w + (i - 1) * a1w) / 5) as u8;
        }
        palette[6] = 0;
        palette[7] = 255;
    }
    palette
}

/// Decode one block into 16 RGBA pixels in row-major order.
pub fn decode_block(block: &[u8; DXT5_BLOCK_SIZE]) -> [[u8; 4]; 16] {
    let alphas = alpha_palette(block[0], block[1]);
    let mut alpha_bits = [0u8; 8];
    alpha_bits[..6].copy_from_slice(&block[2..8]);
    let alpha_bits = u64::from_le_bytes(alpha_bits);

    let c0 = u16::from_le_bytes([block[8], block[9]]);
    let c1 = u16::from_le_bytes([block[10], block[11]]);
    let colors = color_palette(c0, c1);
    let color_bits = u32::from_le_bytes([block[12], block[13], block[14], block[15]]);

    let mut pixels = [[0u8; 4]; 16];
    for (p, pixel) in pixels.iter_mut().enumerate() {
        let [r, g, b] = colors[((color_bits >> (2 * p)) & 0x3) as usize];
        let a = alphas[((alpha_bits >> (3 * p)) & 0x7) as usize];
        *pixel = [r, g, b, a];
    }
    pixels
}

/// Decompress a DXT5 surface to RGBA.
///
/// Edge blocks of surfaces whose sides are not multiples of 4 are decoded in
/// full; only their in-bounds pixels are written.
///
/// # Errors
/// Returns `InvalidCount` for a zero dimension and `OutOfBounds` if `data`
/// holds fewer blocks than the surface needs.
pub fn decode_dxt5(data: &[u8], width: u32, height: u32) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidCount {
            context: "texture dimensions",
            count: i64::from(width.min(height)),
        });
    }
    let needed = dxt5_surface_size(width, height)?;
    if data.len() < needed {
        return Err(Error::OutOfBounds {
            context: "dxt5 blocks",
            offset: 0,
            len: needed,
            available: data.len(),
        });
    }

    let width_px = width as usize;
    let blocks_x = width_px.div_ceil(4);
    let row_bytes = width_px * 4;
    let len = row_bytes.checked_mul(height as usize).ok_or(Error::InvalidCount {
        context: "texture dimensions",
        count: i64::from(height),
    })?;
    let mut rgba = vec![0u8; len];

    rgba.par_chunks_mut(row_bytes * 4)
        .enumerate()
        .for_each(|(by, rows)| {
            let rows_in_block = rows.len() / row_bytes;
            for bx in 0..blocks_x {
                let at = (by * blocks_x + bx) * DXT5_BLOCK_SIZE;
                let mut block = [0u8; DXT5_BLOCK_SIZE];
                block.copy_from_slice(&data[at..at + DXT5_BLOCK_SIZE]);
                let pixels = decode_block(&block);

                for py in 0..rows_in_block {
                    for px in 0..4 {
                        let x = bx * 4 + px;
                        if x >= width_px {
                            break;
                        }
                        let dst = py * row_bytes + x * 4;
                        rows[dst..dst + 4].copy_from_slice(&pixels[py * 4 + px]);
                    }
                }
            }
        });

    tracing::trace!("Decoded {width}x{height} DXT5 surface ({needed} bytes)");
    RgbaImage::from_raw(width, height, rgba).ok_or(Error::ImageBufferFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(a0: u8, a1: u8, alpha_idx: u64, c0: u16, c1: u16, color_idx: u32) -> [u8; 16] {
        let mut b = [0u8; 16];
        b[0] = a0;
        b[1] = a1;
        b[2..8].copy_from_slice(&alpha_idx.to_le_bytes()[..6]);
        b[8..10].copy_from_slice(&c0.to_le_bytes());
        b[10..12].copy_from_slice(&c1.to_le_bytes());
        b[12..16].copy_from_slice(&color_idx.to_le_bytes());
        b
    }

    #[test]
    fn test_channel_expansion() {
        assert_eq!(expand_5(0), 0);
        assert_eq!(expand_5(31), 255);
        assert_eq!(expand_5(16), 132);
        assert_eq!(expand_6(0), 0);
        assert_eq!(expand_6(63), 255);
        assert_eq!(expand_6(32), 130);
    }

    #[test]
    fn test_solid_block_is_uniform() {
        // Pure red, opaque, every index 0
        let data = block(255, 255, 0, 0xF800, 0xF800, 0);
        let image = decode_dxt5(&data, 4, 4).unwrap();
        assert!(image.pixels().all(|p| p.0 == [255, 0, 0, 255]));
    }

    #[test]
    fn test_interpolated_colors() {
        // Black to white; pixels 0..4 use indices 0, 1, 2, 3
        let data = block(255, 255, 0, 0x0000, 0xFFFF, 0b11_10_01_00);
        let image = decode_dxt5(&data, 4, 4).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(2, 0).0, [85, 85, 85, 255]);
        assert_eq!(image.get_pixel(3, 0).0, [170, 170, 170, 255]);
    }

    #[test]
    fn test_five_step_alpha_extremes() {
        // a0 <= a1 selects the 5-step palette; pixel 0 index 6, pixel 1 index 7
        let alpha_idx = 6 | (7 << 3);
        let data = block(0, 255, alpha_idx, 0, 0, 0);
        let image = decode_dxt5(&data, 4, 4).unwrap();
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(1, 0).0[3], 255);
    }

    #[test]
    fn test_alpha_palettes() {
        assert_eq!(alpha_palette(255, 0), [255, 0, 218, 182, 145, 109, 72, 36]);
        assert_eq!(alpha_palette(0, 255), [0, 255, 51, 102, 153, 204, 0, 255]);
    }

    #[test]
    fn test_partial_edge_blocks() {
        // 5x6 needs 2x2 blocks; the first block is red, the rest green
        let mut data = Vec::new();
        data.extend_from_slice(&block(255, 255, 0, 0xF800, 0, 0));
        for _ in 0..3 {
            data.extend_from_slice(&block(255, 255, 0, 0x07E0, 0, 0));
        }
        let image = decode_dxt5(&data, 5, 6).unwrap();
        assert_eq!(image.dimensions(), (5, 6));
        assert_eq!(image.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(4, 0).0, [0, 255, 0, 255]);
        assert_eq!(image.get_pixel(4, 5).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_short_data_is_rejected() {
        assert!(matches!(
            decode_dxt5(&[0u8; 16], 8, 4),
            Err(Error::OutOfBounds { len: 32, available: 16, .. })
        ));
        assert!(matches!(decode_dxt5(&[], 0, 4), Err(Error::InvalidCount { .. })));
    }

    #[test]
    fn test_surface_size() {
        assert_eq!(dxt5_surface_size(4, 4).unwrap(), 16);
        assert_eq!(dxt5_surface_size(5, 6).unwrap(), 64);
        assert!(matches!(
            dxt5_surface_size(u32::MAX, u32::MAX),
            Err(Error::InvalidCount { context: "texture dimensions", .. })
        ));
        assert!(matches!(
            decode_dxt5(&[0u8; 16], u32::MAX, u32::MAX),
            Err(Error::InvalidCount { .. })
        ));
    }
}
