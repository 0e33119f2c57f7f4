use hashsync::config::RunConfig;
use hashsync::error::{ExitCode, SyncError};
use hashsync::output::{FAILURES_REPORT, MISSING_REPORT, SUMMARY_REPORT};
use hashsync::pipeline::{SyncRunner, TreeSide};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_missing_target_root_is_fatal() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let out = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "A").unwrap();

    let err = SyncRunner::new(
        RunConfig::new(&source, dir.path().join("no-such-target")).with_output_dir(&out),
    )
    .run()
    .unwrap_err();

    assert!(matches!(
        err,
        SyncError::TreeAccess {
            side: TreeSide::Target,
            ..
        }
    ));
    assert_eq!(err.exit_code(), ExitCode::GeneralError);
    assert!(!out.join(MISSING_REPORT).exists());
}

#[test]
fn test_root_that_is_a_file_is_fatal() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, "x").unwrap();
    fs::create_dir_all(dir.path().join("target")).unwrap();

    let result = SyncRunner::new(RunConfig::new(&file, dir.path().join("target"))).run();

    assert!(matches!(
        result,
        Err(SyncError::TreeAccess {
            side: TreeSide::Source,
            ..
        })
    ));
}

#[test]
fn test_unwritable_report_is_report_error() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    let out = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&target).unwrap();
    fs::write(source.join("a.txt"), "A").unwrap();
    // A non-empty directory where the summary should go cannot be replaced
    fs::create_dir_all(out.join(SUMMARY_REPORT).join("blocker")).unwrap();

    let err = SyncRunner::new(
        RunConfig::new(&source, &target)
            .with_output_dir(&out)
            .with_cache_dir(&out),
    )
    .run()
    .unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::ReportError);
    let SyncError::Report(report) = err else {
        panic!("expected a report error");
    };
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, out.join(SUMMARY_REPORT));
    // The other artifacts were still written
    assert!(out.join(MISSING_REPORT).exists());
    assert!(out.join("source_cache.json").exists());
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_goes_to_failures_report() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    let out = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&target).unwrap();
    fs::write(source.join("ok.txt"), "fine").unwrap();
    let locked = source.join("locked.txt");
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read(&locked).is_ok() {
        // Running with privileges that ignore permission bits
        return;
    }

    let outcome = SyncRunner::new(
        RunConfig::new(&source, &target)
            .with_output_dir(&out)
            .with_cache_dir(&out),
    )
    .run()
    .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].path, "locked.txt");
    assert_eq!(outcome.failures[0].tree, TreeSide::Source);
    let missing: Vec<&str> = outcome
        .comparison
        .missing
        .iter()
        .map(|m| m.path.as_str())
        .collect();
    assert_eq!(missing, vec!["ok.txt"]);

    let report = fs::read_to_string(out.join(FAILURES_REPORT)).unwrap();
    let mut lines = report.lines();
    assert_eq!(lines.next(), Some("tree,path,error"));
    assert!(lines.next().unwrap().starts_with("source,locked.txt,"));

    let summary = outcome.summary.unwrap();
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.source.stats.failed, 1);
}
