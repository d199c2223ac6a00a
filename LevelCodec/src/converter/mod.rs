//! Format conversion utilities
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

mod texture_png;

pub use texture_png::{
    convert_dxt5_to_png, dxt5_bytes_to_png_bytes, rgba_to_png_bytes, write_texture_png,
};
