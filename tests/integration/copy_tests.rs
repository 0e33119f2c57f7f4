use filetime::FileTime;
use hashsync::config::RunConfig;
use hashsync::output::MISSING_REPORT;
use hashsync::pipeline::SyncRunner;
use hashsync::quarantine::Quarantine;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_copy_missing_files_into_quarantine() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    let out = dir.path().join("out");
    fs::create_dir_all(source.join("albums/2019")).unwrap();
    fs::create_dir_all(&target).unwrap();
    fs::write(source.join("albums/2019/song.mp3"), "mp3").unwrap();
    fs::write(source.join("present.txt"), "already there").unwrap();
    fs::write(target.join("moved.txt"), "already there").unwrap();
    filetime::set_file_mtime(
        source.join("albums/2019/song.mp3"),
        FileTime::from_unix_time(1_500_000_000, 0),
    )
    .unwrap();

    let config = RunConfig::new(&source, &target)
        .with_output_dir(&out)
        .with_cache_dir(&out);
    let outcome = SyncRunner::new(config.clone()).run().unwrap();
    assert_eq!(outcome.comparison.missing.len(), 1);

    let quarantine_dir = target.join("missed_files");
    let stats = Quarantine::new(&source, &quarantine_dir)
        .run(&out.join(MISSING_REPORT))
        .unwrap();

    assert_eq!(stats.copied, 1);
    assert_eq!(stats.failure_count(), 0);
    let copied = quarantine_dir.join("albums/2019/song.mp3");
    assert_eq!(fs::read_to_string(&copied).unwrap(), "mp3");
    assert_eq!(
        FileTime::from_last_modification_time(&fs::metadata(&copied).unwrap()),
        FileTime::from_unix_time(1_500_000_000, 0)
    );
    // Source is never modified
    assert!(source.join("albums/2019/song.mp3").exists());

    // The quarantined copy now satisfies the comparison
    let rerun = SyncRunner::new(config).run().unwrap();
    assert!(rerun.comparison.missing.is_empty());
}

#[test]
fn test_copy_accepts_absolute_report_paths() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let dest = dir.path().join("target").join("missed_files");
    fs::create_dir_all(source.join("sub")).unwrap();
    fs::write(source.join("sub/a.txt"), "A").unwrap();

    let report = dir.path().join("list.csv");
    fs::write(
        &report,
        format!("path\n{}\n", source.join("sub/a.txt").display()),
    )
    .unwrap();

    let stats = Quarantine::new(&source, &dest).run(&report).unwrap();

    assert_eq!(stats.copied, 1);
    assert!(dest.join("sub/a.txt").exists());
}

#[test]
fn test_copy_continues_after_bad_rows() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let dest = dir.path().join("dest");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("good.txt"), "ok").unwrap();
    fs::write(dir.path().join("outside.txt"), "nope").unwrap();

    let report = dir.path().join("missing_files.csv");
    fs::write(
        &report,
        "path,hash,size\nvanished.txt,,\n../outside.txt,,\ngood.txt,,\n",
    )
    .unwrap();

    let stats = Quarantine::new(&source, &dest).run(&report).unwrap();

    assert_eq!(stats.copied, 1);
    assert_eq!(stats.failure_count(), 2);
    assert!(dest.join("good.txt").exists());
    assert!(!dest.join("outside.txt").exists());
}
