use crate::error::StoreError;

/// Match is a single ranked result from a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Key (label) the matched embedding is stored under.
    pub key: String,

    /// Cosine distance between the query and the stored embedding.
    /// Lower values indicate higher similarity.
    pub distance: f32,
}

/// EmbeddingStore is a key-addressed vector database over dense float32
/// embeddings, searched by cosine distance.
///
/// Within one store a key maps to exactly one embedding, and every
/// embedding has the same dimensionality. The dimension is either fixed
/// when the store is created or established by the first upsert.
///
/// All implementations must be safe for concurrent use (Send + Sync), but
/// writes to one store are expected to come from a single owner.
pub trait EmbeddingStore: Send + Sync {
    /// Insert an embedding, overwriting any previous embedding under `key`.
    fn upsert(&self, key: &str, embedding: &[f32]) -> Result<(), StoreError>;

    /// Upsert several embeddings. Either every entry is written or none is.
    fn upsert_batch(&self, entries: &[(&str, &[f32])]) -> Result<(), StoreError>;

    /// Remove the embedding stored under `key`. No error if it does not exist.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Return the embedding stored under `key`.
    fn get(&self, key: &str) -> Result<Vec<f32>, StoreError>;

    /// Return up to `top_k` stored entries closest to `embedding`, ordered by
    /// ascending distance (closest first). Ties are ordered by key.
    fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<Match>, StoreError>;

    /// Return all stored keys in ascending order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Return the number of stored embeddings.
    ///
    /// Still answers after a writer panicked; every other operation then
    /// fails with [`StoreError::Unavailable`].
    fn len(&self) -> usize;

    /// Return true if the store contains no embeddings.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the established dimensionality, if any.
    fn dimension(&self) -> Option<usize>;

    /// Ensure all completed writes are durable. Fails if the store can no
    /// longer be used.
    fn flush(&self) -> Result<(), StoreError>;
}
