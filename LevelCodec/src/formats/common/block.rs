//! Bounds-checked block reader
//!
//! Every sub-block pointer in the level formats is relative to some owning
//! block (a rig, a mesh block, the collision index). `Block` pairs the source
//! buffer with that base so pointer arithmetic stays in one place.
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Byte order of every integer and float in the level containers.
pub type Endian = BigEndian;

/// A read-only view of the source buffer anchored at a base offset.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    data: &'a [u8],
    base: usize,
}

impl<'a> Block<'a> {
    /// View the whole buffer with base 0.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, base: 0 }
    }

    /// View the buffer anchored at `base`.
    ///
    /// # Errors
    /// Returns an error if `base` lies past the end of the buffer.
    pub fn at(data: &'a [u8], base: usize) -> Result<Self> {
        if base > data.len() {
            return Err(Error::OutOfBounds {
                context: "block base",
                offset: base,
                len: 0,
                available: data.len(),
            });
        }
        Ok(Self { data, base })
    }

    /// Absolute offset of this block in the source buffer.
    #[must_use]
    pub fn base(&self) -> usize {
        self.base
    }

    /// The whole source buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Borrow `len` bytes at `offset` (relative to the base).
    pub fn slice(&self, offset: usize, len: usize, context: &'static str) -> Result<&'a [u8]> {
        let start = self.base.checked_add(offset);
        let end = start.and_then(|s| s.checked_add(len));
        match (start, end) {
            (Some(start), Some(end)) if end <= self.data.len() => Ok(&self.data[start..end]),
            _ => Err(Error::OutOfBounds {
                context,
                offset: self.base.saturating_add(offset),
                len,
                available: self.data.len(),
            }),
        }
    }

    /// Borrow `count` records of `stride` bytes at `offset`.
    pub fn table(
        &self,
        offset: usize,
        count: usize,
        stride: usize,
        context: &'static str,
    ) -> Result<&'a [u8]> {
        let len = count.checked_mul(stride).ok_or(Error::OutOfBounds {
            context,
            offset: self.base.saturating_add(offset),
            len: usize::MAX,
            available: self.data.len(),
        })?;
        self.slice(offset, len, context)
    }

    pub fn read_u8(&self, offset: usize, context: &'static str) -> Result<u8> {
        Ok(self.slice(offset, 1, context)?[0])
    }

    pub fn read_u16(&self, offset: usize, context: &'static str) -> Result<u16> {
        Ok(Endian::read_u16(self.slice(offset, 2, context)?))
    }

    pub fn read_i16(&self, offset: usize, context: &'static str) -> Result<i16> {
        Ok(Endian::read_i16(self.slice(offset, 2, context)?))
    }

    pub fn read_u32(&self, offset: usize, context: &'static str) -> Result<u32> {
        Ok(Endian::read_u32(self.slice(offset, 4, context)?))
    }

    pub fn read_i32(&self, offset: usize, context: &'static str) -> Result<i32> {
        Ok(Endian::read_i32(self.slice(offset, 4, context)?))
    }

    pub fn read_f32(&self, offset: usize, context: &'static str) -> Result<f32> {
        Ok(Endian::read_f32(self.slice(offset, 4, context)?))
    }

    pub fn read_vec3(&self, offset: usize, context: &'static str) -> Result<[f32; 3]> {
        let raw = self.slice(offset, 12, context)?;
        Ok([
            Endian::read_f32(&raw[0..4]),
            Endian::read_f32(&raw[4..8]),
            Endian::read_f32(&raw[8..12]),
        ])
    }

    /// Read an i32 block pointer. Zero means "absent".
    ///
    /// # Errors
    /// Returns an error if the pointer is negative or the read is out of bounds.
    pub fn read_ptr(&self, offset: usize, context: &'static str) -> Result<Option<usize>> {
        match self.read_i32(offset, context)? {
            0 => Ok(None),
            p if p < 0 => Err(Error::InvalidIndex {
                context,
                index: i64::from(p),
                limit: self.data.len(),
            }),
            p => Ok(Some(p as usize)),
        }
    }
}

/// Round `len` up to the next multiple of `alignment`.
#[must_use]
pub const fn align_up(len: usize, alignment: usize) -> usize {
    len.div_ceil(alignment) * alignment
}

/// Check a declared count against zero and a configured limit.
///
/// # Errors
/// Returns an error if `count` is negative or larger than `limit`.
pub fn checked_count(count: i64, limit: usize, context: &'static str) -> Result<usize> {
    let Ok(count) = usize::try_from(count) else {
        return Err(Error::InvalidCount { context, count });
    };
    if count > limit {
        return Err(Error::LimitExceeded { context, count, limit });
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_big_endian_and_relative() {
        let data = [0xAA, 0x00, 0x00, 0x01, 0x02, 0x3F, 0x80, 0x00, 0x00];
        let block = Block::at(&data, 1).unwrap();
        assert_eq!(block.read_u32(0, "test").unwrap(), 0x0000_0102);
        assert_eq!(block.read_f32(4, "test").unwrap(), 1.0);
    }

    #[test]
    fn test_out_of_bounds_read_fails() {
        let data = [0u8; 4];
        let block = Block::new(&data);
        assert!(matches!(
            block.read_u32(2, "test"),
            Err(Error::OutOfBounds { offset: 2, len: 4, .. })
        ));
        assert!(block.table(0, usize::MAX, 2, "test").is_err());
    }

    #[test]
    fn test_negative_pointer_is_rejected() {
        let data = (-16i32).to_be_bytes();
        assert!(Block::new(&data).read_ptr(0, "test").is_err());
        assert_eq!(Block::new(&[0u8; 4]).read_ptr(0, "test").unwrap(), None);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(0x48, 16), 0x50);
        assert_eq!(align_up(0x80, 0x80), 0x80);
    }

    #[test]
    fn test_checked_count() {
        assert_eq!(checked_count(3, 10, "test").unwrap(), 3);
        assert!(matches!(checked_count(-1, 10, "test"), Err(Error::InvalidCount { .. })));
        assert!(matches!(checked_count(11, 10, "test"), Err(Error::LimitExceeded { .. })));
    }
}
