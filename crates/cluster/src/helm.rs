use async_trait::async_trait;
use tracing::info;

use crate::{
    command::{failure, run},
    ClusterError, PackageInstaller,
};

const RELEASE: &str = "release";

/// Package installer backed by the `helm` binary and a fixed chart.
#[derive(Debug, Clone)]
pub struct HelmInstaller {
    program: String,
    chart: String,
    kube_context: Option<String>,
}

impl HelmInstaller {
    pub fn new(program: impl Into<String>, chart: impl Into<String>, kube_context: Option<String>) -> Self {
        Self {
            program: program.into(),
            chart: chart.into(),
            kube_context,
        }
    }

    pub(crate) fn install_args(&self, release: &str, namespace: &str) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            release.to_string(),
            self.chart.clone(),
            "-n".to_string(),
            namespace.to_string(),
        ];
        self.push_context(&mut args);
        args
    }

    pub(crate) fn uninstall_args(&self, release: &str, namespace: &str) -> Vec<String> {
        let mut args = vec![
            "uninstall".to_string(),
            release.to_string(),
            "-n".to_string(),
            namespace.to_string(),
        ];
        self.push_context(&mut args);
        args
    }

    fn push_context(&self, args: &mut Vec<String>) {
        if let Some(context) = &self.kube_context {
            args.push("--kube-context".to_string());
            args.push(context.clone());
        }
    }
}

#[async_trait]
impl PackageInstaller for HelmInstaller {
    async fn install(&self, release: &str, namespace: &str) -> Result<(), ClusterError> {
        let output = run(&self.program, &self.install_args(release, namespace)).await?;
        if !output.status.success() {
            return Err(failure(RELEASE, release, &self.program, &output));
        }
        info!(release, namespace, "release installed");
        Ok(())
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<(), ClusterError> {
        let output = run(&self.program, &self.uninstall_args(release, namespace)).await?;
        if !output.status.success() {
            return Err(failure(RELEASE, release, &self.program, &output));
        }
        info!(release, namespace, "release uninstalled");
        Ok(())
    }
}
