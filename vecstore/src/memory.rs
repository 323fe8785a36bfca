use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cosine::cosine_distance;
use crate::error::{unavailable, StoreError};
use crate::store::{EmbeddingStore, Match};

/// Entries is the exact in-memory index shared by every store backend.
///
/// It owns the dimension rule: once `dim` is set, every stored and queried
/// vector must have that length.
#[derive(Debug, Default)]
pub(crate) struct Entries {
    dim: Option<usize>,
    vectors: HashMap<String, Vec<f32>>,
}

impl Entries {
    pub(crate) fn new(dim: Option<usize>) -> Self {
        Self {
            dim,
            vectors: HashMap::new(),
        }
    }

    pub(crate) fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub(crate) fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Validate a single upsert without applying it.
    pub(crate) fn check_upsert(&self, key: &str, vector: &[f32]) -> Result<(), StoreError> {
        check_key(key)?;
        check_vector(vector)?;
        check_dim(self.dim, vector.len())
    }

    /// Validate a batch as a whole. With no established dimension the first
    /// entry fixes it for the rest of the batch.
    pub(crate) fn check_batch(&self, entries: &[(&str, &[f32])]) -> Result<(), StoreError> {
        let mut want = self.dim;
        for (key, vector) in entries {
            check_key(key)?;
            check_vector(vector)?;
            check_dim(want, vector.len())?;
            want.get_or_insert(vector.len());
        }
        Ok(())
    }

    /// Insert a vector that already passed validation.
    pub(crate) fn insert(&mut self, key: &str, vector: Vec<f32>) {
        self.dim.get_or_insert(vector.len());
        self.vectors.insert(key.to_string(), vector);
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        self.vectors.remove(key).is_some()
    }

    pub(crate) fn get(&self, key: &str) -> Result<Vec<f32>, StoreError> {
        self.vectors
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.vectors.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Brute-force top-k by cosine distance.
    pub(crate) fn rank(&self, query: &[f32], top_k: usize) -> Result<Vec<Match>, StoreError> {
        let Some(dim) = self.dim else {
            return Ok(vec![]);
        };
        check_dim(Some(dim), query.len())?;
        if self.vectors.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }
        check_vector(query)?;

        let mut results: Vec<Match> = self
            .vectors
            .iter()
            .map(|(key, vec)| Match {
                key: key.clone(),
                distance: cosine_distance(query, vec),
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.key.cmp(&b.key))
        });
        results.truncate(top_k);
        Ok(results)
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    Ok(())
}

fn check_vector(vector: &[f32]) -> Result<(), StoreError> {
    if vector.is_empty() {
        return Err(StoreError::InvalidVector("empty vector".into()));
    }
    if let Some(i) = vector.iter().position(|x| !x.is_finite()) {
        return Err(StoreError::InvalidVector(format!(
            "non-finite value at index {i}"
        )));
    }
    if vector.iter().all(|&x| x == 0.0) {
        return Err(StoreError::InvalidVector("zero vector has no direction".into()));
    }
    Ok(())
}

pub(crate) fn check_dim(want: Option<usize>, got: usize) -> Result<(), StoreError> {
    match want {
        Some(want) if want != got => Err(StoreError::DimensionMismatch { got, want }),
        _ => Ok(()),
    }
}

/// MemoryStore is an in-memory [`EmbeddingStore`] using brute-force cosine
/// distance. Data is lost when the store is dropped.
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl MemoryStore {
    /// Create an empty store whose dimension is set by the first upsert.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::new(None)),
        }
    }

    /// Create an empty store that only accepts `dim`-length vectors.
    pub fn with_dimension(dim: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::new(Some(dim))),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Entries>, StoreError> {
        self.entries.read().map_err(unavailable)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>, StoreError> {
        self.entries.write().map_err(unavailable)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingStore for MemoryStore {
    fn upsert(&self, key: &str, embedding: &[f32]) -> Result<(), StoreError> {
        let mut entries = self.write()?;
        entries.check_upsert(key, embedding)?;
        entries.insert(key, embedding.to_vec());
        Ok(())
    }

    fn upsert_batch(&self, batch: &[(&str, &[f32])]) -> Result<(), StoreError> {
        let mut entries = self.write()?;
        entries.check_batch(batch)?;
        for (key, vec) in batch {
            entries.insert(key, vec.to_vec());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.write()?.remove(key);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<f32>, StoreError> {
        self.read()?.get(key)
    }

    fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<Match>, StoreError> {
        self.read()?.rank(embedding, top_k)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read()?.keys())
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn dimension(&self) -> Option<usize> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).dim()
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_query() {
        let store = MemoryStore::new();
        store.upsert("a", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        store.upsert("b", &[0.0, 1.0, 0.0, 0.0]).unwrap();
        store.upsert("c", &[0.9, 0.1, 0.0, 0.0]).unwrap();

        let matches = store.query(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].key, "a");
        assert_eq!(matches[1].key, "c");
        assert!(matches[0].distance <= matches[1].distance);
    }

    #[test]
    fn test_upsert_overwrites() {
        let store = MemoryStore::new();
        store.upsert("x", &[1.0, 0.0, 0.0]).unwrap();
        store.upsert("x", &[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("x").unwrap(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_first_upsert_fixes_dimension() {
        let store = MemoryStore::new();
        assert_eq!(store.dimension(), None);
        store.upsert("a", &[1.0; 128]).unwrap();
        assert_eq!(store.dimension(), Some(128));

        let err = store.upsert("b", &[1.0; 64]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch { got: 64, want: 128 }
        ));
        let err = store.query(&[1.0; 64], 1).unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_configured_dimension() {
        let store = MemoryStore::with_dimension(3);
        assert!(store.upsert("a", &[1.0, 0.0]).is_err());
        assert!(store.query(&[1.0, 0.0], 1).is_err());
        store.upsert("a", &[1.0, 0.0, 0.0]).unwrap();
    }

    #[test]
    fn test_dimension_survives_delete() {
        let store = MemoryStore::new();
        store.upsert("a", &[1.0, 0.0]).unwrap();
        store.delete("a").unwrap();
        assert!(store.is_empty());
        assert!(store.upsert("b", &[1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        let short: &[f32] = &[1.0, 0.0];
        let long: &[f32] = &[1.0, 0.0, 0.0];
        let err = store
            .upsert_batch(&[("a", short), ("b", long)])
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);

        let x: &[f32] = &[1.0, 0.0];
        let y: &[f32] = &[0.0, 1.0];
        store.upsert_batch(&[("a", x), ("b", y)]).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.upsert("", &[1.0]),
            Err(StoreError::EmptyKey)
        ));
        assert!(matches!(
            store.upsert("a", &[]),
            Err(StoreError::InvalidVector(_))
        ));
        assert!(matches!(
            store.upsert("a", &[1.0, f32::NAN]),
            Err(StoreError::InvalidVector(_))
        ));
    }

    #[test]
    fn test_rejects_zero_vector() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.upsert("a", &[0.0, 0.0]),
            Err(StoreError::InvalidVector(_))
        ));
        assert_eq!(store.dimension(), None);

        store.upsert("a", &[1.0, 0.0]).unwrap();
        assert!(matches!(
            store.query(&[0.0, -0.0], 1),
            Err(StoreError::InvalidVector(_))
        ));
        let zero: &[f32] = &[0.0, 0.0];
        let ok: &[f32] = &[0.0, 1.0];
        assert!(store.upsert_batch(&[("b", ok), ("c", zero)]).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_poisoned_lock() {
        let store = MemoryStore::new();
        store.upsert("a", &[1.0, 0.0]).unwrap();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.entries.write().unwrap();
            panic!("writer died");
        }));

        // Counters still report the last committed state.
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimension(), Some(2));
        assert!(matches!(store.get("a"), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.flush(), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_get_missing() {
        let store = MemoryStore::new();
        assert!(matches!(store.get("ghost"), Err(StoreError::NotFound(k)) if k == "ghost"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.upsert("a", &[1.0, 0.0]).unwrap();
        store.delete("a").unwrap();
        store.delete("a").unwrap();
        store.delete("nonexistent").unwrap();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_query_empty() {
        let store = MemoryStore::new();
        assert!(store.query(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());

        let store = MemoryStore::with_dimension(3);
        assert!(store.query(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_query_fewer_than_top_k() {
        let store = MemoryStore::new();
        store.upsert("a", &[1.0, 0.0]).unwrap();
        store.upsert("b", &[0.0, 1.0]).unwrap();
        let matches = store.query(&[1.0, 0.2], 5).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].key, "a");
        assert!(matches[0].distance < matches[1].distance);
    }

    #[test]
    fn test_query_top_k_zero() {
        let store = MemoryStore::new();
        store.upsert("a", &[1.0, 0.0]).unwrap();
        assert!(store.query(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_ordered_by_key() {
        let store = MemoryStore::new();
        store.upsert("b", &[2.0, 0.0]).unwrap();
        store.upsert("a", &[1.0, 0.0]).unwrap();
        let matches = store.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(matches[0].key, "a");
        assert_eq!(matches[1].key, "b");
    }
}
