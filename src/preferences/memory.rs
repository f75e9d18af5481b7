//! In-memory preferences store with the same semantics as the Postgres one.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, hash_map::Entry};
use tokio::sync::RwLock;

use super::{PreferencesPatch, PreferencesStore, StoreError, StoreResult, UserPreferences};

#[derive(Debug, Default)]
pub struct MemoryPreferencesStore {
    rows: RwLock<HashMap<String, UserPreferences>>,
}

impl MemoryPreferencesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl PreferencesStore for MemoryPreferencesStore {
    async fn find(&self, clerk_user_id: &str) -> StoreResult<Option<UserPreferences>> {
        Ok(self.rows.read().await.get(clerk_user_id).cloned())
    }

    async fn create(
        &self,
        clerk_user_id: &str,
        patch: &PreferencesPatch,
    ) -> StoreResult<UserPreferences> {
        match self.rows.write().await.entry(clerk_user_id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                let row = UserPreferences::new(clerk_user_id, patch, Utc::now());
                Ok(slot.insert(row).clone())
            }
        }
    }

    async fn update(
        &self,
        clerk_user_id: &str,
        patch: &PreferencesPatch,
    ) -> StoreResult<UserPreferences> {
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(clerk_user_id).ok_or(StoreError::NotFound)?;
        row.apply(patch, Utc::now());
        Ok(row.clone())
    }

    async fn upsert(
        &self,
        clerk_user_id: &str,
        patch: &PreferencesPatch,
    ) -> StoreResult<UserPreferences> {
        let now = Utc::now();
        match self.rows.write().await.entry(clerk_user_id.to_string()) {
            Entry::Occupied(mut slot) => {
                slot.get_mut().apply(patch, now);
                Ok(slot.get().clone())
            }
            Entry::Vacant(slot) => {
                let row = UserPreferences::new(clerk_user_id, patch, now);
                Ok(slot.insert(row).clone())
            }
        }
    }

    async fn delete(&self, clerk_user_id: &str) -> StoreResult<()> {
        self.rows
            .write()
            .await
            .remove(clerk_user_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
