use crate::error::RecognizeError;

/// Turns one raw input sample into a fixed-length embedding vector.
///
/// This is the capability a modality plugs into [`crate::Recognizer`]:
/// faces take an [`crate::ImageFrame`], voices take a
/// [`crate::Waveform`]. The output length must be the same for every
/// input handled by one extractor.
///
/// Implementations report inputs without a usable feature (no face in the
/// frame, silence) as [`RecognizeError::NoFeatureDetected`] instead of
/// returning a placeholder vector.
pub trait Extractor: Send + Sync {
    /// Raw input type consumed by this extractor.
    type Input: ?Sized;

    /// Computes the embedding for `input`.
    fn extract(&self, input: &Self::Input) -> Result<Vec<f32>, RecognizeError>;
}

/// Identity extractor for embeddings computed elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct Precomputed;

impl Extractor for Precomputed {
    type Input = [f32];

    fn extract(&self, input: &[f32]) -> Result<Vec<f32>, RecognizeError> {
        if input.is_empty() {
            return Err(RecognizeError::NoFeatureDetected("empty embedding".into()));
        }
        Ok(input.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precomputed_passes_through() {
        assert_eq!(Precomputed.extract(&[0.5, -0.5]).unwrap(), vec![0.5, -0.5]);
    }

    #[test]
    fn precomputed_rejects_empty() {
        assert!(matches!(
            Precomputed.extract(&[]),
            Err(RecognizeError::NoFeatureDetected(_))
        ));
    }
}
