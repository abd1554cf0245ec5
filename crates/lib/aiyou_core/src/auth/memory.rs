//! In-memory credential store.
//!
//! Backed by a `DashMap` keyed by email; the entry API gives atomic
//! insert-if-absent so duplicate sign-ups are rejected at write time.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::store::{CredentialStore, StoreError, UserRecord};

/// Process-local user records. Used for development and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, UserRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(email).map(|r| r.value().clone()))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|r| r.value().token.as_deref() == Some(token))
            .map(|r| r.value().clone()))
    }

    async fn create(&self, record: UserRecord) -> Result<(), StoreError> {
        match self.users.entry(record.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.email)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn set_token(&self, email: &str, token: &str) -> Result<bool, StoreError> {
        match self.users.get_mut(email) {
            Some(mut user) => {
                user.token = Some(token.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
