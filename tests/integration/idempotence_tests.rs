use hashsync::config::RunConfig;
use hashsync::output::{
    FAILURES_REPORT, MISSING_REPORT, SOURCE_CACHE, SOURCE_DUPLICATES_REPORT, TARGET_CACHE,
    TARGET_DUPLICATES_REPORT,
};
use hashsync::pipeline::SyncRunner;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const ARTIFACTS: [&str; 6] = [
    MISSING_REPORT,
    SOURCE_DUPLICATES_REPORT,
    TARGET_DUPLICATES_REPORT,
    FAILURES_REPORT,
    SOURCE_CACHE,
    TARGET_CACHE,
];

fn populate(root: &Path) {
    let files = [
        ("a.txt", "dup"),
        ("b.txt", "dup"),
        ("music/track01.flac", "flac data"),
        ("music/track02.flac", "more flac data"),
        ("docs/readme.md", "# readme"),
        ("docs/nested/deep/copy.md", "# readme"),
        ("empty.bin", ""),
    ];
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

fn snapshot(out: &Path) -> Vec<Vec<u8>> {
    ARTIFACTS
        .iter()
        .map(|name| fs::read(out.join(name)).unwrap())
        .collect()
}

#[test]
fn test_repeated_runs_produce_identical_artifacts() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    let out = dir.path().join("out");
    populate(&source);
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("have.flac"), "flac data").unwrap();

    let config = RunConfig::new(&source, &target)
        .with_output_dir(&out)
        .with_cache_dir(&out)
        .with_worker_count(4);

    SyncRunner::new(config.clone()).run().unwrap();
    let first = snapshot(&out);

    SyncRunner::new(config).run().unwrap();
    let second = snapshot(&out);

    for (name, (a, b)) in ARTIFACTS.iter().zip(first.iter().zip(second.iter())) {
        assert_eq!(a, b, "{name} changed between runs");
    }
}

#[test]
fn test_worker_count_does_not_change_reports() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    populate(&source);
    fs::create_dir_all(&target).unwrap();

    let mut outputs = Vec::new();
    for workers in [1, 2, 8] {
        let out = dir.path().join(format!("out{workers}"));
        let config = RunConfig::new(&source, &target)
            .with_output_dir(&out)
            .with_cache_dir(&out)
            .with_worker_count(workers);
        SyncRunner::new(config).run().unwrap();
        outputs.push(snapshot(&out));
    }

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], outputs[2]);
}

#[test]
fn test_rerun_with_warm_cache_matches_cold_run() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    populate(&source);
    fs::create_dir_all(&target).unwrap();

    let warm_out = dir.path().join("warm");
    let config = RunConfig::new(&source, &target)
        .with_output_dir(&warm_out)
        .with_cache_dir(&warm_out);
    SyncRunner::new(config.clone()).run().unwrap();
    let warm = SyncRunner::new(config).run().unwrap();

    let cold_out = dir.path().join("cold");
    let cold = SyncRunner::new(
        RunConfig::new(&source, &target)
            .with_output_dir(&cold_out)
            .with_cache_dir(&cold_out),
    )
    .run()
    .unwrap();

    assert_eq!(warm.comparison.missing, cold.comparison.missing);
    assert_eq!(
        fs::read(warm_out.join(MISSING_REPORT)).unwrap(),
        fs::read(cold_out.join(MISSING_REPORT)).unwrap()
    );
}
