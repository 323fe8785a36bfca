//! Key-addressed embedding store with exact cosine top-k search.
//!
//! [`EmbeddingStore`] is the storage contract: upsert, delete and fetch an
//! embedding by key, and query the closest entries by cosine distance.
//!
//! Two backends are provided:
//!
//! - [`MemoryStore`]: in-process, for tests and ephemeral use
//! - [`RedbStore`]: persistent, one redb file per store
//!
//! Distances follow `distance = 1 - cosine similarity`, so results are
//! ordered closest first:
//!
//! ```text
//! 0.0  same direction
//! 1.0  orthogonal
//! 2.0  opposite direction
//! ```

pub mod cosine;
pub mod error;
pub mod memory;
pub mod redb_store;
pub mod store;

pub use cosine::{cosine_distance, cosine_similarity};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use redb_store::RedbStore;
pub use store::{EmbeddingStore, Match};
