//! Compressed texture with a cached decode

use std::sync::{Arc, OnceLock};

use image::RgbaImage;
use serde::Serialize;

use super::dxt5::{decode_dxt5, dxt5_surface_size};
use crate::error::{Error, Result};

/// A DXT5 surface and its mip chain, decoded on demand.
///
/// The top level is decoded once on the first [`CompressedTexture::rgba`]
/// call and shared from then on; clones share the cache.
#[derive(Debug, Clone)]
pub struct CompressedTexture {
    width: u32,
    height: u32,
    mip_levels: u32,
    compressed_size: usize,
    data: Arc<[u8]>,
    decoded: Arc<OnceLock<Arc<RgbaImage>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub compressed_size: usize,
}

/// Dimensions of mip `level`, never smaller than 1x1.
pub fn mip_dimensions(width: u32, height: u32, level: u32) -> (u32, u32) {
    let shrink = |d: u32| d.checked_shr(level).unwrap_or(0).max(1);
    (shrink(width), shrink(height))
}

impl CompressedTexture {
    /// Wrap compressed data holding `mip_levels` levels, largest first.
    ///
    /// # Errors
    /// Returns `InvalidCount` for zero dimensions or levels or a mip chain too
    /// large to address, and `OutOfBounds` if `data` is shorter than the chain.
    pub fn new(width: u32, height: u32, mip_levels: u32, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidCount {
                context: "texture dimensions",
                count: i64::from(width.min(height)),
            });
        }
        if mip_levels == 0 || mip_levels > 32 {
            return Err(Error::InvalidCount {
                context: "mip levels",
                count: i64::from(mip_levels),
            });
        }
        let data = data.into();
        let needed = Self::chain_size(width, height, mip_levels)?;
        if data.len() < needed {
            return Err(Error::OutOfBounds {
                context: "texture mip chain",
                offset: 0,
                len: needed,
                available: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            mip_levels,
            compressed_size: needed,
            data,
            decoded: Arc::new(OnceLock::new()),
        })
    }

    /// Copy a texture out of a larger buffer.
    pub fn from_source(
        source: &[u8],
        offset: usize,
        width: u32,
        height: u32,
        mip_levels: u32,
    ) -> Result<Self> {
        let needed = Self::chain_size(width, height, mip_levels.min(32))?;
        let end = offset.checked_add(needed).filter(|&end| end <= source.len());
        let Some(end) = end else {
            return Err(Error::OutOfBounds {
                context: "texture data",
                offset,
                len: needed,
                available: source.len(),
            });
        };
        Self::new(width, height, mip_levels, &source[offset..end])
    }

    /// Bytes taken by the first `levels` mips.
    fn chain_size(width: u32, height: u32, levels: u32) -> Result<usize> {
        (0..levels).try_fold(0usize, |total, level| {
            let (w, h) = mip_dimensions(width, height, level);
            total
                .checked_add(dxt5_surface_size(w, h)?)
                .ok_or(Error::InvalidCount {
                    context: "texture mip chain",
                    count: i64::from(levels),
                })
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn info(&self) -> TextureInfo {
        TextureInfo {
            width: self.width,
            height: self.height,
            mip_levels: self.mip_levels,
            compressed_size: self.compressed_size,
        }
    }

    /// The top-level raster, decoded on first use.
    pub fn rgba(&self) -> Result<Arc<RgbaImage>> {
        if let Some(image) = self.decoded.get() {
            return Ok(Arc::clone(image));
        }
        let image = Arc::new(self.decode_mip(0)?);
        Ok(Arc::clone(self.decoded.get_or_init(|| image)))
    }

    /// Whether the top level has been decoded.
    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    /// Decode mip `level` without caching it.
    ///
    /// # Errors
    /// Returns `InvalidIndex` for a level past the chain.
    pub fn decode_mip(&self, level: u32) -> Result<RgbaImage> {
        if level >= self.mip_levels {
            return Err(Error::InvalidIndex {
                context: "mip level",
                index: i64::from(level),
                limit: self.mip_levels as usize,
            });
        }
        let offset = Self::chain_size(self.width, self.height, level)?;
        let (w, h) = mip_dimensions(self.width, self.height, level);
        let size = dxt5_surface_size(w, h)?;
        let surface = offset
            .checked_add(size)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(Error::OutOfBounds {
                context: "texture mip",
                offset,
                len: size,
                available: self.data.len(),
            })?;
        decode_dxt5(surface, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(color565: u16) -> [u8; 16] {
        let mut b = [0u8; 16];
        b[0] = 255;
        b[1] = 255;
        b[8..10].copy_from_slice(&color565.to_le_bytes());
        b[10..12].copy_from_slice(&color565.to_le_bytes());
        b
    }

    #[test]
    fn test_mip_dimensions() {
        assert_eq!(mip_dimensions(64, 16, 0), (64, 16));
        assert_eq!(mip_dimensions(64, 16, 3), (8, 2));
        assert_eq!(mip_dimensions(64, 16, 6), (1, 1));
        assert_eq!(mip_dimensions(64, 16, 40), (1, 1));
    }

    #[test]
    fn test_decode_is_cached_and_shared() {
        let texture = CompressedTexture::new(4, 4, 1, solid(0x001F).to_vec()).unwrap();
        let copy = texture.clone();
        assert!(!copy.is_decoded());
        let first = texture.rgba().unwrap();
        assert!(copy.is_decoded());
        let second = copy.rgba().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_mip_levels_decode_independently() {
        // 8x8 top level (4 blocks), then 4x4, 2x2 and 1x1 (one block each)
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&solid(0xF800));
        }
        for _ in 0..3 {
            data.extend_from_slice(&solid(0x07E0));
        }
        let texture = CompressedTexture::new(8, 8, 4, data).unwrap();
        assert_eq!(texture.info().compressed_size, 7 * 16);

        let mip = texture.decode_mip(2).unwrap();
        assert_eq!(mip.dimensions(), (2, 2));
        assert_eq!(mip.get_pixel(1, 1).0, [0, 255, 0, 255]);
        assert!(!texture.is_decoded());
        assert!(matches!(texture.decode_mip(4), Err(Error::InvalidIndex { .. })));
    }

    #[test]
    fn test_short_mip_chain_is_rejected() {
        assert!(matches!(
            CompressedTexture::new(8, 8, 2, vec![0u8; 64]),
            Err(Error::OutOfBounds { len: 80, .. })
        ));
        assert!(CompressedTexture::from_source(&[0u8; 32], 20, 4, 4, 1).is_err());
    }

    #[test]
    fn test_unaddressable_dimensions_are_rejected() {
        assert!(matches!(
            CompressedTexture::new(u32::MAX, u32::MAX, 1, vec![0u8; 16]),
            Err(Error::InvalidCount { .. })
        ));
        assert!(matches!(
            CompressedTexture::from_source(&[0u8; 16], 0, u32::MAX, u32::MAX, 32),
            Err(Error::InvalidCount { .. })
        ));
    }
}
