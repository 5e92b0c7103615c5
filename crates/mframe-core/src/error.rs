//! Error types shared by the mframe crates.

use thiserror::Error;

/// Main error type for frame operations.
///
/// Nothing in this workspace panics across a public boundary; every fallible
/// operation reports through this enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("plane index {index} out of range for {planes} plane(s)")]
    PlaneIndex { index: usize, planes: usize },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unsupported conversion: {0}")]
    UnsupportedConversion(String),

    #[error("frame is end-of-stream")]
    Eos,

    #[error("buffer layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("resource descriptor too small: got {got} bytes, need {need}")]
    DescriptorVersion { got: u32, need: u32 },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(&'static str),
}

/// Result type alias for frame operations.
pub type Result<T> = std::result::Result<T, FrameError>;
