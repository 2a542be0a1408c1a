//! Collaborator contracts for the cluster control plane and the package
//! installer, plus command-line backed implementations (`kubectl`, `helm`).

use async_trait::async_trait;
use thiserror::Error;

mod command;
mod helm;
mod kubectl;

pub use helm::HelmInstaller;
pub use kubectl::KubectlControlPlane;

/// A workload unit (pod) and the readiness of each of its containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub name: String,
    pub ready: Vec<bool>,
}

impl Workload {
    pub fn new(name: impl Into<String>, ready: Vec<bool>) -> Self {
        Self {
            name: name.into(),
            ready,
        }
    }

    /// A workload with no reported containers is not ready.
    pub fn is_ready(&self) -> bool {
        !self.ready.is_empty() && self.ready.iter().all(|ready| *ready)
    }
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error(transparent)]
    Command(#[from] anyhow::Error),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClusterError::AlreadyExists { .. })
    }
}

#[async_trait]
pub trait ClusterControlPlane: Send + Sync {
    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError>;
    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError>;
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>, ClusterError>;
}

#[async_trait]
pub trait PackageInstaller: Send + Sync {
    async fn install(&self, release: &str, namespace: &str) -> Result<(), ClusterError>;
    async fn uninstall(&self, release: &str, namespace: &str) -> Result<(), ClusterError>;
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
