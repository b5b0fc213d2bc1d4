//! Error types for the assembler

use thiserror::Error;

/// Main error type for assembly operations
#[derive(Error, Debug)]
pub enum IgaError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid knot vector: {0}")]
    InvalidKnots(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for assembly operations
pub type IgaResult<T> = Result<T, IgaError>;
