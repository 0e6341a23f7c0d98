//! Tests for disk cleanup

mod common;

use common::FakeExecutor;
use pc_buddy::{run_disk_cleanup, FailureCause, InlineCommand, Target, MSG_CLEANUP_DONE};

#[tokio::test]
async fn test_cleanup_runs_elevated_and_reports_completion() {
    let executor = FakeExecutor::new().respond_ok("");

    let message = run_disk_cleanup(&executor).await.unwrap();

    assert_eq!(message, MSG_CLEANUP_DONE);
    let requests = executor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, Target::Inline(InlineCommand::DISK_CLEANUP));
    assert!(requests[0].elevate);
}

#[tokio::test]
async fn test_cleanup_failure_propagates() {
    let executor = FakeExecutor::new().respond_err(FailureCause::Timeout, "timed out after 60s");

    let err = run_disk_cleanup(&executor).await.unwrap_err();

    assert_eq!(err.failure_cause(), Some(FailureCause::Timeout));
}
