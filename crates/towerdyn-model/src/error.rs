//! Error types shared across the towerdyn crates.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    /// Invalid user input: unknown names, malformed intervals, mismatched
    /// array lengths. Detected eagerly, before any solve runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A numerical operation could not be carried out (singular matrix,
    /// non-positive-definite mass, no mode matching a requested category).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// An iterative procedure exhausted its budget without producing a
    /// usable result.
    #[error("failed to converge: {0}")]
    Nonconvergence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
