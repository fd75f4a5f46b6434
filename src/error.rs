//! Error types for the fallible edges of the crate.
//!
//! The containers themselves never fail visibly: lookups return `Option` or
//! `bool`, unknown string handles read as empty. Only pool configuration
//! and buffer file I/O report errors.

use thiserror::Error;

/// Rejected `PoolConfig`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Ref-counted pools need room for a generation in the handle.
    #[error("generation bits must be between 1 and {max} for a ref-counted pool, got {got}")]
    GenerationBits { got: u32, max: u32 },

    #[error("scratch buffer capacity must be non-zero")]
    ZeroScratch,
}

/// Failure while moving a `ByteBuffer` to or from a file.
#[derive(Error, Debug)]
pub enum BufferError {
    #[error("buffer I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
