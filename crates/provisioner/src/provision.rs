use std::sync::Arc;

use chrono::Utc;
use cluster::{ClusterError, PackageInstaller};
use registry::RegistryError;
use shared::domain::{StoreId, StoreRecord, StoreState};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    reconcile::{apply_install_outcome, InstallOutcome},
    ProvisionError, Provisioner,
};

pub const MAX_ALLOCATION_ATTEMPTS: usize = 8;

impl Provisioner {
    /// Allocates a store, creates its namespace and starts the package
    /// install in the background. Returns as soon as the namespace call has
    /// answered; readiness is picked up later by the reconciler.
    pub async fn create_store(&self) -> Result<StoreRecord, ProvisionError> {
        let (record, _install) = self.provision().await?;
        Ok(record)
    }

    pub(crate) async fn provision(
        &self,
    ) -> Result<(StoreRecord, Option<JoinHandle<()>>), ProvisionError> {
        let record = self.allocate().await?;
        let id = record.id.clone();
        info!(store_id = %id, endpoint = %record.endpoint, "store allocated");

        let created = self.cluster.create_namespace(id.as_str()).await;
        let current = self.registry.finish_creation(&id).await?;
        if current.state == StoreState::Deleting {
            return Err(self.withdraw(&id, created).await);
        }

        match created {
            Ok(()) => {
                let install = self.launch_install(id);
                Ok((current, Some(install)))
            }
            Err(error) if error.is_already_exists() => {
                if let Err(discard) = self.registry.discard_provisioning(&id).await {
                    warn!(store_id = %id, error = %discard, "could not discard colliding store");
                }
                Err(ProvisionError::NamespaceCollision(id))
            }
            Err(error) => {
                error!(store_id = %id, %error, "namespace creation failed");
                let record = match self.registry.transition(&id, StoreState::Failed).await {
                    Ok(updated) => updated,
                    Err(transition) => {
                        warn!(store_id = %id, error = %transition, "could not mark store failed");
                        self.registry.get(&id).await.unwrap_or(current)
                    }
                };
                Ok((record, None))
            }
        }
    }

    /// Finishes a delete that arrived while the namespace call was pending.
    /// Only a namespace this call created is removed. If that removal fails
    /// the store stays `Deleting` for a later delete to retry.
    async fn withdraw(&self, id: &StoreId, created: Result<(), ClusterError>) -> ProvisionError {
        if created.is_ok() {
            match self.cluster.delete_namespace(id.as_str()).await {
                Ok(()) => {}
                Err(error) if error.is_not_found() => {}
                Err(error) => {
                    error!(store_id = %id, %error, "could not remove namespace of withdrawn store");
                    if let Err(release) = self.registry.release_deletion(id).await {
                        warn!(store_id = %id, error = %release, "could not release teardown claim");
                    }
                    return ProvisionError::DeletedDuringCreation(id.clone());
                }
            }
        }
        match self.registry.remove_deleted(id).await {
            Ok(_) => info!(store_id = %id, "store deleted during creation"),
            Err(error) => warn!(store_id = %id, %error, "could not remove withdrawn store"),
        }
        ProvisionError::DeletedDuringCreation(id.clone())
    }

    async fn allocate(&self) -> Result<StoreRecord, ProvisionError> {
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let id = StoreId::generate(&self.config.store_prefix);
            let record = StoreRecord::provisioning(id, &self.config.store_domain, Utc::now());
            match self.registry.insert(record.clone()).await {
                Ok(()) => return Ok(record),
                Err(RegistryError::AlreadyExists(id)) => {
                    warn!(store_id = %id, "generated store id collided; retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(ProvisionError::IdExhausted {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }

    /// Runs the install off the request path. The outcome goes to the
    /// reconciler; if it is gone the outcome is applied here instead.
    fn launch_install(&self, id: StoreId) -> JoinHandle<()> {
        let installer = Arc::clone(&self.installer);
        let outcomes = self.outcomes.clone();
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let result = installer.install(id.as_str(), id.as_str()).await;
            let outcome = match result {
                Ok(()) => {
                    info!(store_id = %id, "package install finished");
                    let live = registry
                        .get(&id)
                        .await
                        .is_some_and(|record| record.state != StoreState::Deleting);
                    if !live {
                        remove_orphaned_release(installer.as_ref(), &id).await;
                    }
                    InstallOutcome::succeeded(id)
                }
                Err(error) => {
                    error!(store_id = %id, %error, "package install failed");
                    InstallOutcome::failed(id, error.to_string())
                }
            };
            if let Err(unsent) = outcomes.send(outcome) {
                warn!("reconciler is not running; applying install outcome directly");
                apply_install_outcome(&registry, unsent.0).await;
            }
        })
    }
}

/// Uninstalls a release whose store was deleted while the install ran.
async fn remove_orphaned_release(installer: &dyn PackageInstaller, id: &StoreId) {
    warn!(store_id = %id, "store deleted during install; removing release");
    match installer.uninstall(id.as_str(), id.as_str()).await {
        Ok(()) => {}
        Err(error) if error.is_not_found() => {}
        Err(error) => error!(store_id = %id, %error, "could not remove orphaned release"),
    }
}

#[cfg(test)]
#[path = "tests/provision_tests.rs"]
mod tests;
