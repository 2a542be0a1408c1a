//! Store lifecycle core: allocation and provisioning, the readiness
//! reconciler, and teardown.

use std::{sync::Arc, time::Duration};

use cluster::{ClusterControlPlane, PackageInstaller};
use registry::StoreRegistry;
use shared::domain::{StoreId, StoreRecord};
use tokio::sync::mpsc;
use tracing::warn;

mod error;
mod provision;
mod reconcile;
mod teardown;

pub use error::{ProvisionError, TeardownError};
pub use provision::MAX_ALLOCATION_ATTEMPTS;
pub use reconcile::{workloads_ready, InstallOutcome, Reconciler};
pub use teardown::DeleteOutcome;

/// Shortest reconcile period accepted; smaller values are raised to it.
pub const MIN_RECONCILE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    pub store_prefix: String,
    pub store_domain: String,
    pub reconcile_interval: Duration,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            store_prefix: "store-".into(),
            store_domain: "localtest.me".into(),
            reconcile_interval: Duration::from_secs(5),
        }
    }
}

/// Entry point for the control surface. Cheap to clone; every clone shares
/// the same registry and reconciler channel.
#[derive(Clone)]
pub struct Provisioner {
    registry: StoreRegistry,
    cluster: Arc<dyn ClusterControlPlane>,
    installer: Arc<dyn PackageInstaller>,
    config: ProvisionerConfig,
    outcomes: mpsc::UnboundedSender<InstallOutcome>,
}

impl Provisioner {
    /// Builds the provisioner and the reconciler that owns its install
    /// outcomes. The reconciler must be driven with [`Reconciler::run`].
    pub fn new(
        mut config: ProvisionerConfig,
        cluster: Arc<dyn ClusterControlPlane>,
        installer: Arc<dyn PackageInstaller>,
    ) -> (Self, Reconciler) {
        if config.reconcile_interval < MIN_RECONCILE_INTERVAL {
            warn!(
                requested_ms = config.reconcile_interval.as_millis() as u64,
                "reconcile interval too short; using minimum"
            );
            config.reconcile_interval = MIN_RECONCILE_INTERVAL;
        }
        let registry = StoreRegistry::new();
        let (outcomes, outcomes_rx) = mpsc::unbounded_channel();
        let reconciler = Reconciler::new(
            registry.clone(),
            Arc::clone(&cluster),
            config.reconcile_interval,
            outcomes_rx,
        );
        let provisioner = Self {
            registry,
            cluster,
            installer,
            config,
            outcomes,
        };
        (provisioner, reconciler)
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub async fn list_stores(&self) -> Vec<StoreRecord> {
        self.registry.list().await
    }

    pub async fn get_store(&self, id: &StoreId) -> Option<StoreRecord> {
        self.registry.get(id).await
    }
}

#[cfg(test)]
#[path = "tests/fakes.rs"]
mod fakes;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
