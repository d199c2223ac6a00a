//! Error types for `LevelCodec`

use thiserror::Error;

/// The error type for `LevelCodec` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Bounds Errors ====================
    /// A computed pointer/length reads outside the source buffer.
    #[error("{context}: read of {len} bytes at 0x{offset:X} is outside the buffer (0x{available:X} bytes)")]
    OutOfBounds {
        /// The sub-block being read.
        context: &'static str,
        /// Absolute offset of the read.
        offset: usize,
        /// Length of the read in bytes.
        len: usize,
        /// Size of the source buffer.
        available: usize,
    },

    /// A declared count is negative or otherwise unusable.
    #[error("{context}: invalid count {count}")]
    InvalidCount {
        /// The table whose count is invalid.
        context: &'static str,
        /// The declared count.
        count: i64,
    },

    /// A declared count exceeds the configured limit.
    #[error("{context}: count {count} exceeds limit {limit}")]
    LimitExceeded {
        /// The table whose count is too large.
        context: &'static str,
        /// The declared count.
        count: usize,
        /// The configured limit.
        limit: usize,
    },

    /// An index points outside the table it refers to.
    #[error("{context}: index {index} out of range (limit {limit})")]
    InvalidIndex {
        /// The table holding the index.
        context: &'static str,
        /// The offending index.
        index: i64,
        /// The exclusive upper bound.
        limit: usize,
    },

    // ==================== Rig Errors ====================
    /// A bone's parent link does not point at an earlier bone.
    #[error("bone {bone} has invalid parent {parent}")]
    InvalidSkeleton {
        /// The bone index.
        bone: usize,
        /// The stored parent index.
        parent: i32,
    },

    // ==================== Format Errors ====================
    /// A size or shape selector matches no known layout.
    #[error("unsupported {context}: {value}")]
    UnsupportedVariant {
        /// What was being selected.
        context: &'static str,
        /// The selector value found.
        value: String,
    },

    /// The in-memory model cannot be encoded without losing data.
    #[error("cannot encode: {0}")]
    EncodeInvariant(String),

    // ==================== Texture Export Errors ====================
    /// Failed to create an image buffer from texture data.
    #[error("failed to create image buffer")]
    ImageBufferFailed,

    /// Failed to encode PNG image.
    #[error("failed to encode PNG: {message}")]
    PngEncodeFailed {
        /// The encoding error message.
        message: String,
    },

    // ==================== Configuration Errors ====================
    /// Failed to parse a limits configuration file.
    #[error("invalid limits config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand used by the encoders.
    pub(crate) fn encode(message: impl Into<String>) -> Self {
        Self::EncodeInvariant(message.into())
    }
}

/// A specialized Result type for `LevelCodec` operations.
pub type Result<T> = std::result::Result<T, Error>;
