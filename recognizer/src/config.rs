use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RecognizeError;

/// Default maximum cosine distance accepted as a match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.75;

/// Configuration for one [`crate::Recognizer`] and the store it owns.
///
/// Missing fields fall back to [`RecognizerConfig::default`] when
/// deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Path of the persistent store file. Parent directories are created.
    pub store_path: PathBuf,

    /// Maximum cosine distance (inclusive) for `predict` to accept the
    /// nearest label. Lower is stricter: fewer false accepts, more
    /// false rejects. Must lie in `[0, 2]`.
    pub match_threshold: f32,

    /// Expected embedding length. When unset, the first enrolled sample
    /// establishes it.
    pub embedding_dimension: Option<usize>,
}

impl RecognizerConfig {
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            embedding_dimension: None,
        }
    }

    /// Default configuration for the face store.
    pub fn face() -> Self {
        Self::new(default_store_dir().join("face.redb"))
    }

    /// Default configuration for the voice store.
    pub fn voice() -> Self {
        Self::new(default_store_dir().join("voice.redb"))
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.match_threshold = threshold;
        self
    }

    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.embedding_dimension = Some(dim);
        self
    }

    pub fn with_store_path(mut self, path: impl AsRef<Path>) -> Self {
        self.store_path = path.as_ref().to_path_buf();
        self
    }

    pub fn validate(&self) -> Result<(), RecognizeError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(RecognizeError::InvalidConfig("store_path is empty".into()));
        }
        if self.embedding_dimension == Some(0) {
            return Err(RecognizeError::InvalidConfig(
                "embedding_dimension must be positive".into(),
            ));
        }
        check_threshold(self.match_threshold)
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self::new(default_store_dir().join("embeddings.redb"))
    }
}

/// Directory holding the default stores: the platform data directory,
/// or the system temp directory when there is none.
pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("bioid")
}

pub(crate) fn check_threshold(threshold: f32) -> Result<(), RecognizeError> {
    if !threshold.is_finite() || !(0.0..=2.0).contains(&threshold) {
        return Err(RecognizeError::InvalidConfig(format!(
            "match_threshold {threshold} outside cosine distance range [0, 2]"
        )));
    }
    Ok(())
}
