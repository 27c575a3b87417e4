//! Record store — the persistence collaborator behind the key table.
//!
//! The controller only ever talks to a store through the four
//! operations of [`RecordStore`]. Implementations:
//! - `MemoryStore` for fakes and demos (`memory`)
//! - `SqliteStore` for a local relational backend (`sqlite`, feature `sqlite-store`)
//! - `RestStore` for a hosted PostgREST backend (`rest`, feature `rest-store`)

pub mod memory;
#[cfg(feature = "rest-store")]
pub mod rest;
#[cfg(feature = "sqlite-store")]
pub mod sqlite;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::keys::{ApiKeyPatch, ApiKeyRecord, NewApiKeyRecord};

pub use memory::MemoryStore;
#[cfg(feature = "rest-store")]
pub use rest::{RestStore, RestStoreConfig};
#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;

/// CRUD access to API-key records. Every call may fail.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// All records owned by `owner_id`, in backend order.
    async fn list(&self, owner_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError>;

    /// Persist a new record; the store assigns `id` and `created_at`
    /// and forces usage to zero.
    async fn insert(&self, record: NewApiKeyRecord) -> Result<ApiKeyRecord, StoreError>;

    /// Apply `patch` to the record with `id` and return the stored result.
    async fn update(&self, id: &str, patch: ApiKeyPatch) -> Result<ApiKeyRecord, StoreError>;

    /// Remove the record with `id`. Removing a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
