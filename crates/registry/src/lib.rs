//! In-memory store registry: the single source of truth for store lifecycle
//! state. Every read and write goes through one lock and callers only ever
//! see cloned snapshots.

use std::{collections::HashMap, sync::Arc};

use shared::domain::{StoreId, StoreRecord, StoreState};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("store '{0}' already exists")]
    AlreadyExists(StoreId),
    #[error("store '{0}' not found")]
    NotFound(StoreId),
    #[error("store '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        id: StoreId,
        from: StoreState,
        to: StoreState,
    },
}

/// Result of asking to start a teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionClaim {
    /// The caller owns the teardown and must finish or release it.
    Claimed(StoreRecord),
    /// Another caller is already tearing the store down, or the store is
    /// still being created and its creator will tear it down.
    InFlight(StoreRecord),
}

#[derive(Debug)]
struct Entry {
    record: StoreRecord,
    teardown_claimed: bool,
    creating: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StoreRegistry {
    entries: Arc<Mutex<HashMap<StoreId, Entry>>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record whose external resources are still being created.
    /// Until [`Self::finish_creation`] runs, a deletion request only marks the
    /// store `Deleting` and leaves the teardown to the creator.
    pub async fn insert(&self, record: StoreRecord) -> Result<(), RegistryError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(&record.id) {
            return Err(RegistryError::AlreadyExists(record.id));
        }
        entries.insert(
            record.id.clone(),
            Entry {
                record,
                teardown_claimed: false,
                creating: true,
            },
        );
        Ok(())
    }

    /// Ends the creation window and returns the current record. A record in
    /// `Deleting` means a delete arrived meanwhile; the caller then holds the
    /// teardown claim and must finish or release it.
    pub async fn finish_creation(&self, id: &StoreId) -> Result<StoreRecord, RegistryError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        entry.creating = false;
        Ok(entry.record.clone())
    }

    pub async fn get(&self, id: &StoreId) -> Option<StoreRecord> {
        self.entries
            .lock()
            .await
            .get(id)
            .map(|entry| entry.record.clone())
    }

    /// Snapshot of every record, oldest first.
    pub async fn list(&self) -> Vec<StoreRecord> {
        let mut records: Vec<StoreRecord> = self
            .entries
            .lock()
            .await
            .values()
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        records
    }

    pub async fn ids_in_state(&self, state: StoreState) -> Vec<StoreId> {
        let mut ids: Vec<StoreId> = self
            .entries
            .lock()
            .await
            .values()
            .filter(|entry| entry.record.state == state)
            .map(|entry| entry.record.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Applies a lifecycle transition, rejecting anything the state machine
    /// does not allow. Entering `Deleting` goes through [`Self::claim_deletion`].
    pub async fn transition(
        &self,
        id: &StoreId,
        next: StoreState,
    ) -> Result<StoreRecord, RegistryError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        let current = entry.record.state;
        if next == StoreState::Deleting || !current.can_transition_to(next) {
            return Err(RegistryError::InvalidTransition {
                id: id.clone(),
                from: current,
                to: next,
            });
        }
        entry.record.state = next;
        Ok(entry.record.clone())
    }

    /// Drops a record whose provisioning never got off the ground. Only
    /// succeeds while the store is still `Provisioning`.
    pub async fn discard_provisioning(&self, id: &StoreId) -> Result<StoreRecord, RegistryError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        if entry.record.state != StoreState::Provisioning {
            return Err(RegistryError::InvalidTransition {
                id: id.clone(),
                from: entry.record.state,
                to: StoreState::Deleting,
            });
        }
        let entry = entries
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        Ok(entry.record)
    }

    /// Moves the store to `Deleting` and hands the teardown to the caller,
    /// unless another teardown for it is still running.
    pub async fn claim_deletion(&self, id: &StoreId) -> Result<DeletionClaim, RegistryError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        if entry.teardown_claimed {
            return Ok(DeletionClaim::InFlight(entry.record.clone()));
        }
        if entry.record.state != StoreState::Deleting {
            if !entry.record.state.can_transition_to(StoreState::Deleting) {
                return Err(RegistryError::InvalidTransition {
                    id: id.clone(),
                    from: entry.record.state,
                    to: StoreState::Deleting,
                });
            }
            entry.record.state = StoreState::Deleting;
        }
        entry.teardown_claimed = true;
        if entry.creating {
            return Ok(DeletionClaim::InFlight(entry.record.clone()));
        }
        Ok(DeletionClaim::Claimed(entry.record.clone()))
    }

    /// Gives up a teardown claim after a failed attempt. The store stays
    /// `Deleting` so a later delete can retry.
    pub async fn release_deletion(&self, id: &StoreId) -> Result<(), RegistryError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        entry.teardown_claimed = false;
        Ok(())
    }

    /// Removes a store whose teardown completed.
    pub async fn remove_deleted(&self, id: &StoreId) -> Result<StoreRecord, RegistryError> {
        let mut entries = self.entries.lock().await;
        let state = entries
            .get(id)
            .map(|entry| entry.record.state)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        if state != StoreState::Deleting {
            return Err(RegistryError::InvalidTransition {
                id: id.clone(),
                from: state,
                to: StoreState::Deleting,
            });
        }
        let entry = entries
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        Ok(entry.record)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
