use cluster::ClusterError;
use registry::RegistryError;
use shared::domain::StoreId;
use thiserror::Error;

/// Errors that reject a create request outright. Failures after the record
/// exists are recorded as `Failed` instead.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("could not allocate a unique store id after {attempts} attempts")]
    IdExhausted { attempts: usize },
    #[error("namespace for store '{0}' already exists")]
    NamespaceCollision(StoreId),
    #[error("store '{0}' was deleted while it was being created")]
    DeletedDuringCreation(StoreId),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("store '{0}' not found")]
    NotFound(StoreId),
    #[error("failed to uninstall release for store '{id}': {source}")]
    Uninstall {
        id: StoreId,
        #[source]
        source: ClusterError,
    },
    #[error("failed to delete namespace for store '{id}': {source}")]
    DeleteNamespace {
        id: StoreId,
        #[source]
        source: ClusterError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
