use std::fmt;

use bioid_vecstore::{EmbeddingStore, Match, MemoryStore, RedbStore};
use tracing::{debug, info};

use crate::config::{check_threshold, RecognizerConfig};
use crate::error::RecognizeError;
use crate::extractor::Extractor;

/// Number of ranked results returned by a query when the caller has no
/// preference.
pub const DEFAULT_TOP_K: usize = 5;

/// Outcome of [`Recognizer::predict`].
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// The nearest enrolled label is within the match threshold.
    Known { label: String, distance: f32 },
    /// Nothing is enrolled, or the nearest label is too far away.
    Unknown,
}

impl Prediction {
    /// Returns the matched label, or `None` for [`Prediction::Unknown`].
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Known { label, .. } => Some(label),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known { .. })
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known { label, .. } => write!(f, "{label}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Enrolls labeled samples and identifies new samples by nearest neighbor.
///
/// A Recognizer binds one [`Extractor`] to one [`EmbeddingStore`] and a
/// single scalar match threshold. Enrollment is upsert: adding a label
/// again replaces its embedding.
///
/// # Example
///
/// ```
/// use bioid_recognizer::{Precomputed, Prediction, Recognizer};
///
/// let rec = Recognizer::in_memory(Precomputed, 0.3).unwrap();
/// rec.add("arnold", &[0.9, 0.1, 0.0]).unwrap();
/// rec.add("silvester", &[0.0, 0.2, 0.9]).unwrap();
///
/// assert_eq!(rec.predict(&[1.0, 0.1, 0.0]).unwrap().label(), Some("arnold"));
/// assert_eq!(rec.predict(&[0.0, -1.0, 0.0]).unwrap(), Prediction::Unknown);
/// ```
pub struct Recognizer<X: Extractor> {
    store: Box<dyn EmbeddingStore>,
    extractor: X,
    threshold: f32,
}

impl<X: Extractor> Recognizer<X> {
    /// Creates a Recognizer over an existing store.
    pub fn new(
        store: Box<dyn EmbeddingStore>,
        extractor: X,
        threshold: f32,
    ) -> Result<Self, RecognizeError> {
        check_threshold(threshold)?;
        Ok(Self {
            store,
            extractor,
            threshold,
        })
    }

    /// Creates a Recognizer that opens (or creates) the persistent store
    /// described by `cfg`. The store is closed when the Recognizer is dropped.
    pub fn open(cfg: &RecognizerConfig, extractor: X) -> Result<Self, RecognizeError> {
        cfg.validate()?;
        let store = RedbStore::open(&cfg.store_path, cfg.embedding_dimension)?;
        info!(
            path = %cfg.store_path.display(),
            threshold = cfg.match_threshold,
            "recognizer: store ready"
        );
        Self::new(Box::new(store), extractor, cfg.match_threshold)
    }

    /// Creates a Recognizer over a fresh in-memory store.
    pub fn in_memory(extractor: X, threshold: f32) -> Result<Self, RecognizeError> {
        Self::new(Box::new(MemoryStore::new()), extractor, threshold)
    }

    /// Enrolls `input` under `label`, replacing any previous sample.
    pub fn add(&self, label: &str, input: &X::Input) -> Result<(), RecognizeError> {
        let embedding = self.embed(input)?;
        self.store.upsert(label, &embedding)?;
        debug!(label, dim = embedding.len(), "recognizer: enrolled");
        Ok(())
    }

    /// Returns up to `top_k` enrolled labels ranked by ascending distance
    /// to `input`, without applying the threshold.
    pub fn query(&self, input: &X::Input, top_k: usize) -> Result<Vec<Match>, RecognizeError> {
        let embedding = self.embed(input)?;
        Ok(self.store.query(&embedding, top_k)?)
    }

    /// Identifies `input` as the nearest enrolled label if its distance is
    /// at most the match threshold.
    pub fn predict(&self, input: &X::Input) -> Result<Prediction, RecognizeError> {
        let embedding = self.embed(input)?;
        let best = self.store.query(&embedding, 1)?.into_iter().next();

        let prediction = match best {
            Some(m) if m.distance <= self.threshold => Prediction::Known {
                label: m.key,
                distance: m.distance,
            },
            Some(m) => {
                debug!(
                    nearest = %m.key,
                    distance = m.distance,
                    threshold = self.threshold,
                    "recognizer: nearest label above threshold"
                );
                Prediction::Unknown
            }
            None => Prediction::Unknown,
        };
        debug!(%prediction, "recognizer: predicted");
        Ok(prediction)
    }

    /// Removes a label. Removing an unknown label is not an error.
    pub fn remove(&self, label: &str) -> Result<(), RecognizeError> {
        self.store.delete(label)?;
        Ok(())
    }

    /// Returns the embedding enrolled under `label`.
    pub fn embedding(&self, label: &str) -> Result<Vec<f32>, RecognizeError> {
        Ok(self.store.get(label)?)
    }

    /// Returns all enrolled labels in ascending order.
    pub fn labels(&self) -> Result<Vec<String>, RecognizeError> {
        Ok(self.store.keys()?)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), RecognizeError> {
        check_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }

    pub fn store(&self) -> &dyn EmbeddingStore {
        self.store.as_ref()
    }

    fn embed(&self, input: &X::Input) -> Result<Vec<f32>, RecognizeError> {
        let embedding = self.extractor.extract(input)?;
        if embedding.is_empty() {
            return Err(RecognizeError::NoFeatureDetected(
                "extractor returned an empty embedding".into(),
            ));
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(RecognizeError::InvalidInput(
                "extractor returned non-finite values".into(),
            ));
        }
        if embedding.iter().all(|&x| x == 0.0) {
            return Err(RecognizeError::NoFeatureDetected(
                "extractor returned a zero embedding".into(),
            ));
        }
        Ok(embedding)
    }
}
