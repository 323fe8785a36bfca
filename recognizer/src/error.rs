use bioid_vecstore::StoreError;
use thiserror::Error;

/// Errors returned by recognizer operations.
///
/// "Nobody matched" is not an error: [`crate::Recognizer::predict`] reports
/// it as [`crate::Prediction::Unknown`].
#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("recognizer: dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("recognizer: label not found: {0}")]
    NotFound(String),

    #[error("recognizer: no feature detected: {0}")]
    NoFeatureDetected(String),

    #[error("recognizer: {0} faces detected, expected one")]
    MultipleFaces(usize),

    #[error("recognizer: store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("recognizer: invalid input: {0}")]
    InvalidInput(String),

    #[error("recognizer: invalid audio: {0}")]
    InvalidAudio(String),

    #[error("recognizer: invalid config: {0}")]
    InvalidConfig(String),
}

impl From<StoreError> for RecognizeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DimensionMismatch { got, want } => {
                RecognizeError::DimensionMismatch { got, want }
            }
            StoreError::NotFound(key) => RecognizeError::NotFound(key),
            StoreError::EmptyKey => RecognizeError::InvalidInput("empty label".into()),
            StoreError::InvalidVector(msg) => RecognizeError::InvalidInput(msg),
            StoreError::Unavailable(msg) | StoreError::InvalidFormat(msg) => {
                RecognizeError::StoreUnavailable(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_kind() {
        let e: RecognizeError = StoreError::DimensionMismatch { got: 64, want: 128 }.into();
        assert!(matches!(
            e,
            RecognizeError::DimensionMismatch { got: 64, want: 128 }
        ));

        let e: RecognizeError = StoreError::NotFound("arnold".into()).into();
        assert!(matches!(e, RecognizeError::NotFound(ref k) if k == "arnold"));

        let e: RecognizeError = StoreError::InvalidFormat("truncated".into()).into();
        assert!(matches!(e, RecognizeError::StoreUnavailable(_)));

        let e: RecognizeError = StoreError::EmptyKey.into();
        assert!(matches!(e, RecognizeError::InvalidInput(_)));
    }
}
