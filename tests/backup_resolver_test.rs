//! Tests for backup location resolution

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{script_args, FakeExecutor, RecordingSink};
use pc_buddy::{
    BackupConfig, BackupPathResolver, BackupPathSource, Error, FailureCause, Script, Target,
};

const NOT_FOUND: &str =
    "ERROR: The system was unable to find the specified registry key or value.";

fn resolver(
    executor: &Arc<FakeExecutor>,
    sink: &Arc<RecordingSink>,
    home: Option<&str>,
) -> BackupPathResolver {
    let config = BackupConfig {
        home_dir: home.map(PathBuf::from),
        ..BackupConfig::default()
    };
    BackupPathResolver::new(executor.clone(), &config, sink.clone())
}

fn expected_default(home: &str) -> String {
    PathBuf::from(home)
        .join("Documents")
        .join("PC-Buddy-Backups")
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn test_absent_value_uses_default_location() {
    let executor = Arc::new(
        FakeExecutor::new().respond_err(FailureCause::NonZeroExit(Some(1)), NOT_FOUND),
    );
    let sink = Arc::new(RecordingSink::default());

    let resolution = resolver(&executor, &sink, Some("/home/tester"))
        .resolve_detailed()
        .await
        .unwrap();

    assert_eq!(resolution.source, BackupPathSource::Default);
    assert_eq!(resolution.path.as_str(), expected_default("/home/tester"));

    let requests = executor.requests();
    assert_eq!(requests.len(), 1);
    match &requests[0].target {
        Target::Registry(query) => {
            assert_eq!(query.key(), r"HKCU\Software\PC-Buddy");
            assert_eq!(query.value_name(), "BackupLocation");
        }
        other => panic!("expected a registry query, got {:?}", other),
    }
    assert!(!requests[0].elevate);
}

#[tokio::test]
async fn test_configured_registry_location_reaches_the_query() {
    let executor = Arc::new(FakeExecutor::new().respond_ok(
        "HKEY_CURRENT_USER\\Software\\Contoso\r\n    SaveDir    REG_SZ    D:\\Contoso\r\n",
    ));
    let sink = Arc::new(RecordingSink::default());
    let config = BackupConfig {
        home_dir: Some(PathBuf::from("/home/tester")),
        registry_key: r"HKCU\Software\Contoso".to_string(),
        value_name: "SaveDir".to_string(),
    };

    let resolution = BackupPathResolver::new(executor.clone(), &config, sink)
        .resolve_detailed()
        .await
        .unwrap();

    assert_eq!(resolution.source, BackupPathSource::Registry);
    assert_eq!(resolution.path.as_str(), r"D:\Contoso");
    match &executor.requests()[0].target {
        Target::Registry(query) => {
            assert_eq!(query.key(), r"HKCU\Software\Contoso");
            assert_eq!(query.value_name(), "SaveDir");
        }
        other => panic!("expected a registry query, got {:?}", other),
    }
}

#[tokio::test]
async fn test_configured_value_is_used() {
    let executor = Arc::new(FakeExecutor::new().respond_ok(
        "HKEY_CURRENT_USER\\Software\\PC-Buddy\r\n    BackupLocation    REG_SZ    D:\\Backups\r\n",
    ));
    let sink = Arc::new(RecordingSink::default());

    let resolution = resolver(&executor, &sink, Some("/home/tester"))
        .resolve_detailed()
        .await
        .unwrap();

    assert_eq!(resolution.source, BackupPathSource::Registry);
    assert_eq!(resolution.path.as_str(), r"D:\Backups");
}

#[tokio::test]
async fn test_invalid_configured_value_falls_back_to_default() {
    let executor = Arc::new(
        FakeExecutor::new().respond_ok("    BackupLocation    REG_SZ    \\\\server\\c$\\backups"),
    );
    let sink = Arc::new(RecordingSink::default());

    let path = resolver(&executor, &sink, Some("/home/tester"))
        .resolve()
        .await
        .unwrap();

    assert_eq!(path.as_str(), expected_default("/home/tester"));
    assert_eq!(sink.errors().len(), 1);
}

#[tokio::test]
async fn test_missing_home_is_invalid_path() {
    let executor = Arc::new(
        FakeExecutor::new().respond_err(FailureCause::NonZeroExit(Some(1)), NOT_FOUND),
    );
    let sink = Arc::new(RecordingSink::default());

    let err = resolver(&executor, &sink, None).resolve().await.unwrap_err();

    assert!(matches!(err, Error::InvalidPath(_)));
}

#[tokio::test]
async fn test_create_backup_runs_elevated_with_location_first() {
    let executor = Arc::new(
        FakeExecutor::new()
            .respond_ok("    BackupLocation    REG_SZ    E:\\PC Backups")
            .respond_ok(""),
    );
    let sink = Arc::new(RecordingSink::default());

    let message = resolver(&executor, &sink, Some("/home/tester"))
        .create_backup(&["Documents;Pictures".to_string()])
        .await
        .unwrap();

    assert_eq!(message, r"Backup created in E:\PC Backups.");

    let requests = executor.requests();
    assert_eq!(requests.len(), 2);
    let create = &requests[1];
    assert!(create.elevate);
    assert!(matches!(
        create.target,
        Target::Script {
            script: Script::CreateBackup,
            ..
        }
    ));
    assert_eq!(
        script_args(create),
        vec![
            (Some("-BackupLocation"), r"E:\PC Backups".to_string()),
            (None, "DocumentsPictures".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_backup_info_runs_unelevated_and_returns_output() {
    let executor = Arc::new(
        FakeExecutor::new()
            .respond_err(FailureCause::NonZeroExit(Some(1)), NOT_FOUND)
            .respond_ok("3 backups, latest 2025-01-01"),
    );
    let sink = Arc::new(RecordingSink::default());

    let info = resolver(&executor, &sink, Some("/home/tester"))
        .backup_info()
        .await
        .unwrap();

    assert_eq!(info, "3 backups, latest 2025-01-01");
    let requests = executor.requests();
    assert!(!requests[1].elevate);
    assert_eq!(
        script_args(&requests[1])[0].1,
        expected_default("/home/tester")
    );
}

#[tokio::test]
async fn test_script_failure_propagates() {
    let executor = Arc::new(
        FakeExecutor::new()
            .respond_err(FailureCause::NonZeroExit(Some(1)), NOT_FOUND)
            .respond_err(FailureCause::ElevationDenied, "elevation request was denied"),
    );
    let sink = Arc::new(RecordingSink::default());

    let err = resolver(&executor, &sink, Some("/home/tester"))
        .create_backup(&[])
        .await
        .unwrap_err();

    assert_eq!(err.failure_cause(), Some(FailureCause::ElevationDenied));
}

#[tokio::test]
async fn test_create_backup_reports_the_location_actually_passed() {
    let executor = Arc::new(
        FakeExecutor::new()
            .respond_ok("    BackupLocation    REG_SZ    E:\\Program Files (x86)\\Backups")
            .respond_ok(""),
    );
    let sink = Arc::new(RecordingSink::default());

    let message = resolver(&executor, &sink, Some("/home/tester"))
        .create_backup(&[])
        .await
        .unwrap();

    assert_eq!(message, r"Backup created in E:\Program Files x86\Backups.");
    assert_eq!(
        script_args(&executor.requests()[1])[0].1,
        r"E:\Program Files x86\Backups"
    );
}
