use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::{
    command::{failure, run},
    ClusterControlPlane, ClusterError, Workload,
};

const NAMESPACE: &str = "namespace";

/// Control plane backed by the `kubectl` binary.
#[derive(Debug, Clone)]
pub struct KubectlControlPlane {
    program: String,
    context: Option<String>,
}

impl KubectlControlPlane {
    pub fn new(program: impl Into<String>, context: Option<String>) -> Self {
        Self {
            program: program.into(),
            context,
        }
    }

    fn args<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut all: Vec<String> = args.into_iter().map(str::to_string).collect();
        if let Some(context) = &self.context {
            all.push("--context".to_string());
            all.push(context.clone());
        }
        all
    }
}

#[async_trait]
impl ClusterControlPlane for KubectlControlPlane {
    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let output = run(&self.program, &self.args(["create", "namespace", name])).await?;
        if !output.status.success() {
            return Err(failure(NAMESPACE, name, &self.program, &output));
        }
        info!(namespace = name, "namespace created");
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let output = run(
            &self.program,
            &self.args(["delete", "namespace", name, "--wait=false"]),
        )
        .await?;
        if !output.status.success() {
            return Err(failure(NAMESPACE, name, &self.program, &output));
        }
        info!(namespace = name, "namespace deletion requested");
        Ok(())
    }

    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>, ClusterError> {
        let output = run(
            &self.program,
            &self.args(["get", "pods", "-n", namespace, "-o", "json"]),
        )
        .await?;
        if !output.status.success() {
            return Err(failure(NAMESPACE, namespace, &self.program, &output));
        }
        Ok(parse_pod_list(&output.stdout)?)
    }
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    #[serde(default)]
    metadata: PodMetadata,
    #[serde(default)]
    status: Option<PodStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct PodMetadata {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodStatus {
    #[serde(default)]
    container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Deserialize)]
struct ContainerStatus {
    #[serde(default)]
    ready: bool,
}

pub(crate) fn parse_pod_list(raw: &[u8]) -> anyhow::Result<Vec<Workload>> {
    let list: PodList = serde_json::from_slice(raw).context("invalid pod list json")?;
    Ok(list
        .items
        .into_iter()
        .map(|pod| {
            let ready = pod
                .status
                .map(|status| {
                    status
                        .container_statuses
                        .into_iter()
                        .map(|container| container.ready)
                        .collect()
                })
                .unwrap_or_default();
            Workload::new(pod.metadata.name, ready)
        })
        .collect())
}
