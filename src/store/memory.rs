//! In-memory record store.
//!
//! Behaves like the hosted backend (store-assigned ids, zero usage on
//! insert, `NotFound` on updating a missing id) and can be switched into
//! a failing mode to exercise error paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::keys::{ApiKeyPatch, ApiKeyRecord, NewApiKeyRecord};

use super::RecordStore;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<Vec<ApiKeyRecord>>>,
    should_fail: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing rows, kept in the given order.
    pub fn with_records(records: Vec<ApiKeyRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            should_fail: Arc::default(),
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Overwrite the server-side usage counter of a record.
    pub async fn set_usage(&self, id: &str, usage: u64) {
        if let Some(r) = self.records.write().await.iter_mut().find(|r| r.id == id) {
            r.usage_count = usage;
        }
    }

    /// Every stored row, regardless of owner.
    pub async fn all(&self) -> Vec<ApiKeyRecord> {
        self.records.read().await.clone()
    }

    fn check_should_fail(&self) -> Result<(), StoreError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store configured to fail".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError> {
        self.check_should_fail()?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, record: NewApiKeyRecord) -> Result<ApiKeyRecord, StoreError> {
        self.check_should_fail()?;
        let stored = ApiKeyRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: record.owner_id,
            name: record.name,
            secret: record.secret,
            monthly_limit: record.monthly_limit,
            usage_count: 0,
            created_at: Utc::now(),
        };
        self.records.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: &str, patch: ApiKeyPatch) -> Result<ApiKeyRecord, StoreError> {
        self.check_should_fail()?;
        let mut records = self.records.write().await;
        let slot = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *slot = patch.apply_to(slot);
        Ok(slot.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.check_should_fail()?;
        self.records.write().await.retain(|r| r.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_assigns_id_and_zero_usage() {
        let store = MemoryStore::new();
        let a = store
            .insert(NewApiKeyRecord::new("u1", "a", "pk_live_a", None))
            .await
            .unwrap();
        let b = store
            .insert(NewApiKeyRecord::new("u1", "b", "pk_live_b", None))
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.usage_count, 0);
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner() {
        let store = MemoryStore::new();
        store
            .insert(NewApiKeyRecord::new("u1", "mine", "s1", None))
            .await
            .unwrap();
        store
            .insert(NewApiKeyRecord::new("u2", "theirs", "s2", None))
            .await
            .unwrap();
        let mine = store.list("u1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "mine");
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = MemoryStore::new();
        let patch = ApiKeyPatch {
            name: Some("x".into()),
            ..ApiKeyPatch::default()
        };
        assert_eq!(
            store.update("nope", patch).await.unwrap_err(),
            StoreError::NotFound("nope".into())
        );
    }

    #[tokio::test]
    async fn delete_missing_succeeds() {
        let store = MemoryStore::new();
        assert!(store.delete("nope").await.is_ok());
    }

    #[tokio::test]
    async fn failing_mode_rejects_every_call() {
        let store = MemoryStore::new();
        store.set_should_fail(true);
        assert!(store.list("u1").await.is_err());
        assert!(store.delete("x").await.is_err());
        store.set_should_fail(false);
        assert!(store.list("u1").await.is_ok());
    }
}
