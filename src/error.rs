//! Error types for the animal pose coding library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (dimension mismatch, malformed HSV range,
    /// non-positive cluster count, bad parameter combination)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The chosen animal case requires a background image and none was loaded
    #[error("background image required but missing")]
    MissingBackground,

    /// Invalid input parameters provided (out-of-range manual direction,
    /// coordinates outside the frame, malformed CLI value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persisted record table is malformed
    #[error("Record error: {0}")]
    Record(String),

    /// Video reading or writing failed
    #[error("Video error: {0}")]
    Video(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
