//! Persistent [`EmbeddingStore`] backed by a redb database file.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info};

use crate::error::{unavailable, StoreError};
use crate::memory::{check_dim, Entries};
use crate::store::{EmbeddingStore, Match};

const EMBEDDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("embeddings");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const META_DIM: &str = "dim";

/// A persistent embedding store backed by redb.
///
/// Every mutation is committed to disk before it becomes visible to
/// queries. Queries run against an exact in-memory copy that is loaded
/// when the store is opened.
///
/// The database file is locked for the lifetime of the store; opening the
/// same path twice fails with [`StoreError::Unavailable`].
pub struct RedbStore {
    db: Database,
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl RedbStore {
    /// Open or create a store at `path`.
    ///
    /// `dim` fixes the embedding dimensionality up front. If the file already
    /// has an established dimension, a different `dim` is rejected with
    /// [`StoreError::DimensionMismatch`].
    pub fn open<P: AsRef<Path>>(path: P, dim: Option<usize>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("create {}: {e}", parent.display()))
            })?;
        }

        let db = Database::create(&path)
            .map_err(|e| StoreError::Unavailable(format!("open {}: {e}", path.display())))?;

        let tx = db.begin_write().map_err(unavailable)?;
        let mut entries;
        {
            let mut meta = tx.open_table(META).map_err(unavailable)?;
            let stored = meta
                .get(META_DIM)
                .map_err(unavailable)?
                .map(|v| v.value() as usize);

            let established = match (stored, dim) {
                (Some(want), Some(got)) => {
                    check_dim(Some(want), got)?;
                    Some(want)
                }
                (Some(want), None) => Some(want),
                (None, Some(got)) => {
                    meta.insert(META_DIM, got as u64).map_err(unavailable)?;
                    Some(got)
                }
                (None, None) => None,
            };
            entries = Entries::new(established);

            let table = tx.open_table(EMBEDDINGS).map_err(unavailable)?;
            for item in table.iter().map_err(unavailable)? {
                let (key, value) = item.map_err(unavailable)?;
                let key = key.value();
                let vector = decode_vector(key, value.value())?;
                check_dim(entries.dim(), vector.len()).map_err(|_| {
                    StoreError::InvalidFormat(format!(
                        "embedding {key:?} has {} values, store dimension is {:?}",
                        vector.len(),
                        entries.dim()
                    ))
                })?;
                entries.insert(key, vector);
            }
        }
        tx.commit().map_err(unavailable)?;

        info!(
            path = %path.display(),
            entries = entries.len(),
            dim = ?entries.dim(),
            "vecstore: opened"
        );

        Ok(Self {
            db,
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Entries>, StoreError> {
        self.entries.read().map_err(unavailable)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>, StoreError> {
        self.entries.write().map_err(unavailable)
    }

    /// Commit `batch` in one transaction, recording the dimension if this is
    /// the first write.
    fn commit(&self, entries: &Entries, batch: &[(&str, &[f32])]) -> Result<(), StoreError> {
        let tx = self.db.begin_write().map_err(unavailable)?;
        {
            if entries.dim().is_none() {
                if let Some((_, first)) = batch.first() {
                    let mut meta = tx.open_table(META).map_err(unavailable)?;
                    meta.insert(META_DIM, first.len() as u64)
                        .map_err(unavailable)?;
                }
            }
            let mut table = tx.open_table(EMBEDDINGS).map_err(unavailable)?;
            for (key, vector) in batch {
                let bytes = encode_vector(vector);
                table.insert(*key, bytes.as_slice()).map_err(unavailable)?;
            }
        }
        tx.commit().map_err(unavailable)
    }
}

impl EmbeddingStore for RedbStore {
    fn upsert(&self, key: &str, embedding: &[f32]) -> Result<(), StoreError> {
        let mut entries = self.write()?;
        entries.check_upsert(key, embedding)?;
        self.commit(&entries, &[(key, embedding)])?;
        entries.insert(key, embedding.to_vec());
        debug!(key, "vecstore: upserted");
        Ok(())
    }

    fn upsert_batch(&self, batch: &[(&str, &[f32])]) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut entries = self.write()?;
        entries.check_batch(batch)?;
        self.commit(&entries, batch)?;
        for (key, vector) in batch {
            entries.insert(key, vector.to_vec());
        }
        debug!(count = batch.len(), "vecstore: upserted batch");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.write()?;
        let tx = self.db.begin_write().map_err(unavailable)?;
        {
            let mut table = tx.open_table(EMBEDDINGS).map_err(unavailable)?;
            table.remove(key).map_err(unavailable)?;
        }
        tx.commit().map_err(unavailable)?;
        if entries.remove(key) {
            debug!(key, "vecstore: deleted");
        }
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
        // Every write commits its own durable transaction.
        self.read().map(|_| ())
    }
}

/// Little-endian f32 sequence.
fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

fn decode_vector(key: &str, bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(StoreError::InvalidFormat(format!(
            "embedding {key:?} has {} bytes, want a non-empty multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_redb_basic() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("face.redb"), None).unwrap();

        store.upsert("arnold", &[0.1, 0.2, 0.3]).unwrap();
        store.flush().unwrap();
        assert_eq!(store.get("arnold").unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(store.dimension(), Some(3));

        store.delete("arnold").unwrap();
        assert!(matches!(store.get("arnold"), Err(StoreError::NotFound(_))));
        store.delete("arnold").unwrap();
    }

    #[test]
    fn test_redb_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("voice.redb");
        {
            let store = RedbStore::open(&path, None).unwrap();
            store.upsert("a", &[1.0, 0.0, 0.0]).unwrap();
            store.upsert("b", &[0.0, 1.0, 0.0]).unwrap();
            store.upsert("a", &[0.0, 0.0, 1.0]).unwrap();
            store.delete("b").unwrap();
        }

        let store = RedbStore::open(&path, None).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimension(), Some(3));
        assert_eq!(store.get("a").unwrap(), vec![0.0, 0.0, 1.0]);

        let matches = store.query(&[0.0, 0.0, 1.0], 5).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key, "a");
        assert!(matches[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_redb_round_trip_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.redb");
        let v: Vec<f32> = (0..128).map(|i| (i as f32 * 0.37).sin()).collect();
        {
            let store = RedbStore::open(&path, None).unwrap();
            store.upsert("k", &v).unwrap();
        }
        let store = RedbStore::open(&path, None).unwrap();
        assert_eq!(store.get("k").unwrap(), v);
    }

    #[test]
    fn test_redb_dimension_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.redb");
        {
            let store = RedbStore::open(&path, None).unwrap();
            store.upsert("a", &[1.0; 128]).unwrap();
            store.delete("a").unwrap();
        }

        let store = RedbStore::open(&path, None).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), Some(128));
        assert!(matches!(
            store.upsert("b", &[1.0; 64]),
            Err(StoreError::DimensionMismatch { got: 64, want: 128 })
        ));
        drop(store);

        assert!(matches!(
            RedbStore::open(&path, Some(64)),
            Err(StoreError::DimensionMismatch { got: 64, want: 128 })
        ));
        assert!(RedbStore::open(&path, Some(128)).is_ok());
    }

    #[test]
    fn test_redb_configured_dimension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.redb");
        {
            let store = RedbStore::open(&path, Some(4)).unwrap();
            assert_eq!(store.dimension(), Some(4));
            assert!(store.upsert("a", &[1.0, 0.0]).is_err());
        }
        let store = RedbStore::open(&path, None).unwrap();
        assert_eq!(store.dimension(), Some(4));
    }

    #[test]
    fn test_redb_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.redb");
        let a: &[f32] = &[1.0, 0.0];
        let b: &[f32] = &[0.0, 1.0];
        let bad: &[f32] = &[0.0, 1.0, 0.0];
        {
            let store = RedbStore::open(&path, None).unwrap();
            assert!(store.upsert_batch(&[("a", a), ("c", bad)]).is_err());
            assert!(store.is_empty());
            store.upsert_batch(&[("a", a), ("b", b)]).unwrap();
        }
        let store = RedbStore::open(&path, None).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_redb_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("db.redb");
        let store = RedbStore::open(&path, None).unwrap();
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_redb_unavailable_path() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = RedbStore::open(blocker.join("db.redb"), None).err().unwrap();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_decode_rejects_truncated() {
        assert!(matches!(
            decode_vector("k", &[0, 0, 0]),
            Err(StoreError::InvalidFormat(_))
        ));
        assert_eq!(
            decode_vector("k", &encode_vector(&[1.5, -2.0])).unwrap(),
            vec![1.5, -2.0]
        );
    }
}
