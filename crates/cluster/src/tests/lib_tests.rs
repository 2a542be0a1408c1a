use super::*;
use crate::command::classify_stderr;
use crate::kubectl::parse_pod_list;

#[test]
fn workload_readiness_requires_containers() {
    assert!(!Workload::new("web", Vec::new()).is_ready());
    assert!(!Workload::new("web", vec![true, false]).is_ready());
    assert!(Workload::new("web", vec![true, true]).is_ready());
}

#[test]
fn parses_container_readiness_from_pod_list() {
    let raw = serde_json::json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            {
                "metadata": { "name": "web-0" },
                "status": {
                    "phase": "Running",
                    "containerStatuses": [
                        { "name": "web", "ready": true },
                        { "name": "sidecar", "ready": false }
                    ]
                }
            },
            {
                "metadata": { "name": "db-0" },
                "status": { "phase": "Pending" }
            }
        ]
    })
    .to_string();

    let workloads = parse_pod_list(raw.as_bytes()).expect("parse");
    assert_eq!(
        workloads,
        vec![
            Workload::new("web-0", vec![true, false]),
            Workload::new("db-0", Vec::new()),
        ]
    );
}

#[test]
fn empty_pod_list_yields_no_workloads() {
    let workloads = parse_pod_list(br#"{"items": []}"#).expect("parse");
    assert!(workloads.is_empty());
}

#[test]
fn malformed_pod_list_is_an_error() {
    assert!(parse_pod_list(b"No resources found").is_err());
}

#[test]
fn classifies_kubectl_already_exists() {
    let err = classify_stderr(
        "namespace",
        "store-abc123",
        "Error from server (AlreadyExists): namespaces \"store-abc123\" already exists",
    )
    .expect("classified");
    assert!(err.is_already_exists());
}

#[test]
fn classifies_kubectl_and_helm_not_found() {
    let kubectl = classify_stderr(
        "namespace",
        "store-abc123",
        "Error from server (NotFound): namespaces \"store-abc123\" not found",
    )
    .expect("classified");
    assert!(kubectl.is_not_found());

    let helm = classify_stderr(
        "release",
        "store-abc123",
        "Error: uninstall: Release not loaded: store-abc123: release: not found",
    )
    .expect("classified");
    assert!(helm.is_not_found());
}

#[test]
fn leaves_other_failures_unclassified() {
    assert!(classify_stderr(
        "release",
        "store-abc123",
        "Error: INSTALLATION FAILED: Kubernetes cluster unreachable"
    )
    .is_none());
}

#[test]
fn unrelated_not_found_errors_are_not_treated_as_absent() {
    for stderr in [
        "error: context \"prod\" not found",
        "error: stat /root/.kube/config: no such file or directory",
        "Error from server (NotFound): namespaces \"store-other1\" not found",
        "Unable to connect to the server: dial tcp: lookup api.cluster: no such host",
    ] {
        assert!(
            classify_stderr("namespace", "store-abc123", stderr).is_none(),
            "classified: {stderr}"
        );
    }

    for stderr in [
        "Error: kubernetes cluster unreachable: context \"prod\" not found",
        "Error: uninstall: Release not loaded: store-other1: release: not found",
        "Error: plugin \"diff\" not found",
    ] {
        assert!(
            classify_stderr("release", "store-abc123", stderr).is_none(),
            "classified: {stderr}"
        );
    }
}

#[test]
fn unrelated_already_exists_errors_are_not_collisions() {
    assert!(classify_stderr(
        "namespace",
        "store-abc123",
        "Error from server (AlreadyExists): namespaces \"store-other1\" already exists",
    )
    .is_none());
    assert!(classify_stderr(
        "namespace",
        "store-abc123",
        "error: file \"/tmp/kubeconfig.lock\" already exists",
    )
    .is_none());
}

#[test]
fn classifies_helm_name_in_use() {
    let err = classify_stderr(
        "release",
        "store-abc123",
        "Error: INSTALLATION FAILED: cannot re-use a name that is still in use",
    )
    .expect("classified");
    assert!(err.is_already_exists());
}

#[test]
fn helm_args_include_chart_namespace_and_context() {
    let helm = HelmInstaller::new("helm", "./charts/store", Some("kind-dev".into()));
    assert_eq!(
        helm.install_args("store-1", "store-1"),
        vec![
            "install",
            "store-1",
            "./charts/store",
            "-n",
            "store-1",
            "--kube-context",
            "kind-dev"
        ]
    );
    let helm = HelmInstaller::new("helm", "./charts/store", None);
    assert_eq!(
        helm.uninstall_args("store-1", "store-1"),
        vec!["uninstall", "store-1", "-n", "store-1"]
    );
}

#[tokio::test]
async fn missing_binary_surfaces_command_error() {
    let kubectl = KubectlControlPlane::new("definitely-not-a-real-kubectl-binary", None);
    let err = kubectl
        .create_namespace("store-abc123")
        .await
        .expect_err("should fail");
    assert!(matches!(err, ClusterError::Command(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn non_zero_exit_without_marker_is_command_error() {
    let helm = HelmInstaller::new("false", "./charts/store", None);
    let err = helm
        .install("store-abc123", "store-abc123")
        .await
        .expect_err("should fail");
    assert!(matches!(err, ClusterError::Command(_)));
}
