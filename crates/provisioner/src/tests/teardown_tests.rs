use shared::domain::{StoreId, StoreState};

use super::DeleteOutcome;
use crate::fakes::{ready_workloads, setup, Failure};
use crate::TeardownError;

#[tokio::test]
async fn deleting_ready_store_removes_resources_then_record() {
    let (provisioner, mut reconciler, fake) = setup();
    let (record, install) = provisioner.provision().await.expect("create");
    install.expect("install launched").await.expect("join");
    fake.set_workloads(record.id.as_str(), ready_workloads(1)).await;
    reconciler.run_cycle().await;
    reconciler.settle().await;
    assert_eq!(
        provisioner.get_store(&record.id).await.expect("record").state,
        StoreState::Ready
    );

    let outcome = provisioner.delete_store(&record.id).await.expect("delete");

    let DeleteOutcome::Removed(removed) = outcome else {
        panic!("expected removal");
    };
    assert_eq!(removed.state, StoreState::Deleting);
    assert!(provisioner.get_store(&record.id).await.is_none());
    assert!(!fake.has_release(record.id.as_str()).await);
    assert!(!fake.has_namespace(record.id.as_str()).await);

    let calls = fake.calls().await;
    let id = record.id.as_str();
    let uninstall = calls
        .iter()
        .position(|c| *c == format!("uninstall {id}"))
        .expect("uninstall called");
    let delete = calls
        .iter()
        .position(|c| *c == format!("delete_namespace {id}"))
        .expect("namespace deleted");
    assert!(uninstall < delete);
}

#[tokio::test]
async fn deleting_unknown_store_is_not_found() {
    let (provisioner, _reconciler, fake) = setup();
    let err = provisioner
        .delete_store(&StoreId::from("store-nope00"))
        .await
        .expect_err("unknown");
    assert!(matches!(err, TeardownError::NotFound(_)));
    assert!(fake.calls().await.is_empty());
}

#[tokio::test]
async fn store_with_failed_namespace_tears_down_cleanly() {
    let (provisioner, _reconciler, fake) = setup();
    fake.fail("create_namespace", Failure::Broken).await;
    let record = provisioner.create_store().await.expect("create");
    assert_eq!(record.state, StoreState::Failed);

    let outcome = provisioner.delete_store(&record.id).await.expect("delete");

    assert!(matches!(outcome, DeleteOutcome::Removed(_)));
    assert_eq!(fake.count_calls("uninstall").await, 1);
    assert_eq!(fake.count_calls("delete_namespace").await, 1);
}

#[tokio::test]
async fn uninstall_failure_keeps_store_deleting_and_retry_succeeds() {
    let (provisioner, _reconciler, fake) = setup();
    let (record, install) = provisioner.provision().await.expect("create");
    install.expect("install launched").await.expect("join");
    fake.fail("uninstall", Failure::Broken).await;

    let err = provisioner
        .delete_store(&record.id)
        .await
        .expect_err("uninstall fails");
    assert!(matches!(err, TeardownError::Uninstall { .. }));
    assert_eq!(
        provisioner.get_store(&record.id).await.expect("kept").state,
        StoreState::Deleting
    );
    assert_eq!(fake.count_calls("delete_namespace").await, 0);

    fake.heal("uninstall").await;
    let outcome = provisioner.delete_store(&record.id).await.expect("retry");
    assert!(matches!(outcome, DeleteOutcome::Removed(_)));
    assert!(provisioner.list_stores().await.is_empty());
}

#[tokio::test]
async fn namespace_delete_failure_is_retried_with_release_already_gone() {
    let (provisioner, _reconciler, fake) = setup();
    let (record, install) = provisioner.provision().await.expect("create");
    install.expect("install launched").await.expect("join");
    fake.fail("delete_namespace", Failure::Broken).await;

    let err = provisioner
        .delete_store(&record.id)
        .await
        .expect_err("namespace delete fails");
    assert!(matches!(err, TeardownError::DeleteNamespace { .. }));
    assert!(!fake.has_release(record.id.as_str()).await);
    assert_eq!(
        provisioner.get_store(&record.id).await.expect("kept").state,
        StoreState::Deleting
    );

    fake.heal("delete_namespace").await;
    provisioner.delete_store(&record.id).await.expect("retry");
    assert!(!fake.has_namespace(record.id.as_str()).await);
    assert!(provisioner.get_store(&record.id).await.is_none());
}

#[tokio::test]
async fn concurrent_delete_returns_current_status_without_side_effects() {
    let (provisioner, _reconciler, fake) = setup();
    let (record, install) = provisioner.provision().await.expect("create");
    install.expect("install launched").await.expect("join");
    let gate = fake.gate("uninstall").await;

    let first = {
        let provisioner = provisioner.clone();
        let id = record.id.clone();
        tokio::spawn(async move { provisioner.delete_store(&id).await })
    };
    fake.wait_for_call(&format!("uninstall {}", record.id)).await;

    let second = provisioner.delete_store(&record.id).await.expect("second");
    let DeleteOutcome::InProgress(current) = second else {
        panic!("expected in-progress");
    };
    assert_eq!(current.state, StoreState::Deleting);
    assert_eq!(fake.count_calls("uninstall").await, 1);

    gate.notify_one();
    let first = first.await.expect("join").expect("first");
    assert!(matches!(first, DeleteOutcome::Removed(_)));
    assert_eq!(fake.count_calls("uninstall").await, 1);
    assert_eq!(fake.count_calls("delete_namespace").await, 1);
}

#[tokio::test]
async fn deleted_store_is_no_longer_probed() {
    let (provisioner, mut reconciler, fake) = setup();
    let record = provisioner.create_store().await.expect("create");
    provisioner.delete_store(&record.id).await.expect("delete");

    reconciler.run_cycle().await;
    reconciler.settle().await;

    assert_eq!(fake.count_calls("list_workloads").await, 0);
}

#[tokio::test]
async fn namespace_removed_out_of_band_counts_as_absent() {
    let (provisioner, _reconciler, fake) = setup();
    let (record, install) = provisioner.provision().await.expect("create");
    install.expect("install launched").await.expect("join");
    fake.delete_namespace_out_of_band(record.id.as_str()).await;

    provisioner.delete_store(&record.id).await.expect("delete");
    assert!(provisioner.get_store(&record.id).await.is_none());
}
