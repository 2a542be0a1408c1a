use registry::{DeletionClaim, RegistryError};
use shared::domain::{StoreId, StoreRecord};
use tracing::{debug, error, info, warn};

use crate::{Provisioner, TeardownError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// External resources are gone and the record was removed.
    Removed(StoreRecord),
    /// Another request is already tearing this store down, or the store is
    /// still being created and will be removed once that finishes.
    InProgress(StoreRecord),
}

impl Provisioner {
    /// Marks the store `Deleting`, uninstalls its release, deletes its
    /// namespace and only then drops the record. Resources that are already
    /// absent count as removed. On failure the store stays `Deleting` and
    /// the call can be repeated.
    pub async fn delete_store(&self, id: &StoreId) -> Result<DeleteOutcome, TeardownError> {
        match self.registry.claim_deletion(id).await {
            Ok(DeletionClaim::Claimed(_)) => {}
            Ok(DeletionClaim::InFlight(record)) => {
                info!(store_id = %id, "teardown already in progress");
                return Ok(DeleteOutcome::InProgress(record));
            }
            Err(RegistryError::NotFound(_)) => return Err(TeardownError::NotFound(id.clone())),
            Err(other) => return Err(other.into()),
        }
        info!(store_id = %id, "tearing down store");

        if let Err(failure) = self.release_resources(id).await {
            error!(store_id = %id, error = %failure, "teardown failed; store left in Deleting");
            if let Err(release) = self.registry.release_deletion(id).await {
                warn!(store_id = %id, error = %release, "could not release teardown claim");
            }
            return Err(failure);
        }

        let removed = self.registry.remove_deleted(id).await?;
        info!(store_id = %id, "store removed");
        Ok(DeleteOutcome::Removed(removed))
    }

    async fn release_resources(&self, id: &StoreId) -> Result<(), TeardownError> {
        match self.installer.uninstall(id.as_str(), id.as_str()).await {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                debug!(store_id = %id, "release already absent");
            }
            Err(source) => {
                return Err(TeardownError::Uninstall {
                    id: id.clone(),
                    source,
                })
            }
        }

        match self.cluster.delete_namespace(id.as_str()).await {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                debug!(store_id = %id, "namespace already absent");
            }
            Err(source) => {
                return Err(TeardownError::DeleteNamespace {
                    id: id.clone(),
                    source,
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/teardown_tests.rs"]
mod tests;
