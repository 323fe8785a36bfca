use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("vecstore: dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("vecstore: key not found: {0}")]
    NotFound(String),

    #[error("vecstore: empty key")]
    EmptyKey,

    #[error("vecstore: invalid vector: {0}")]
    InvalidVector(String),

    #[error("vecstore: unavailable: {0}")]
    Unavailable(String),

    #[error("vecstore: invalid format: {0}")]
    InvalidFormat(String),
}

pub(crate) fn unavailable(e: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(e.to_string())
}
