use std::process::Output;

use anyhow::{anyhow, Context};
use tokio::process::Command;
use tracing::debug;

use crate::ClusterError;

pub(crate) async fn run(program: &str, args: &[String]) -> Result<Output, ClusterError> {
    debug!(program, ?args, "running command");
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("failed to invoke '{program}'"))?;
    Ok(output)
}

/// Turns a failed invocation into the matching `ClusterError`.
pub(crate) fn failure(kind: &'static str, name: &str, program: &str, output: &Output) -> ClusterError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    classify_stderr(kind, name, &stderr).unwrap_or_else(|| {
        ClusterError::Command(anyhow!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        ))
    })
}

/// Recognises the "already there" and "already gone" answers for the exact
/// resource `name`. Anything else, including a missing context or an
/// unreachable cluster, stays unclassified.
pub(crate) fn classify_stderr(kind: &'static str, name: &str, stderr: &str) -> Option<ClusterError> {
    let (exists, absent) = match kind {
        "namespace" => {
            let subject = format!("namespaces \"{name}\"");
            (
                stderr.contains("(AlreadyExists)") && stderr.contains(&format!("{subject} already exists")),
                stderr.contains("(NotFound)") && stderr.contains(&format!("{subject} not found")),
            )
        }
        "release" => (
            stderr.contains("cannot re-use a name that is still in use"),
            stderr.contains(&format!("Release not loaded: {name}:"))
                || stderr.contains(&format!("release: \"{name}\" not found")),
        ),
        _ => (false, false),
    };
    if exists {
        return Some(ClusterError::AlreadyExists {
            kind,
            name: name.to_string(),
        });
    }
    if absent {
        return Some(ClusterError::NotFound {
            kind,
            name: name.to_string(),
        });
    }
    None
}
