//! Block texture decompression
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

pub mod dxt5;
pub mod types;

pub use dxt5::{DXT5_BLOCK_SIZE, decode_block, decode_dxt5, dxt5_surface_size};
pub use types::{CompressedTexture, TextureInfo, mip_dimensions};
