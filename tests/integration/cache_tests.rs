use filetime::FileTime;
use hashsync::cache::{HashCache, CACHE_VERSION};
use hashsync::config::RunConfig;
use hashsync::pipeline::SyncRunner;
use hashsync::scanner::HashMode;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

struct Trees {
    _dir: TempDir,
    source: PathBuf,
    target: PathBuf,
    out: PathBuf,
}

fn setup(source_files: &[(&str, &str)]) -> Trees {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    let out = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&target).unwrap();
    for (path, content) in source_files {
        let full = source.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    Trees {
        _dir: dir,
        source,
        target,
        out,
    }
}

fn config(t: &Trees) -> RunConfig {
    RunConfig::new(&t.source, &t.target)
        .with_output_dir(&t.out)
        .with_cache_dir(&t.out)
}

fn set_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

#[test]
fn test_second_run_reads_nothing() {
    let t = setup(&[("a.txt", "alpha"), ("dir/b.txt", "beta")]);

    let first = SyncRunner::new(config(&t)).run().unwrap().summary.unwrap();
    assert_eq!(first.source.stats.cache_misses, 2);
    assert_eq!(first.source.stats.files_hashed, 2);
    assert_eq!(first.source.stats.bytes_read, 9);

    let second = SyncRunner::new(config(&t)).run().unwrap().summary.unwrap();
    assert_eq!(second.source.stats.cache_hits, 2);
    assert_eq!(second.source.stats.cache_misses, 0);
    assert_eq!(second.source.stats.bytes_read, 0);
}

#[test]
fn test_changed_mtime_rehashes_only_that_file() {
    let t = setup(&[("a.txt", "alpha"), ("b.txt", "beta")]);
    set_mtime(&t.source.join("a.txt"), 1_600_000_000);
    set_mtime(&t.source.join("b.txt"), 1_600_000_000);
    SyncRunner::new(config(&t)).run().unwrap();

    set_mtime(&t.source.join("b.txt"), 1_600_000_100);
    let summary = SyncRunner::new(config(&t)).run().unwrap().summary.unwrap();

    assert_eq!(summary.source.stats.cache_hits, 1);
    assert_eq!(summary.source.stats.cache_misses, 1);
}

#[test]
fn test_changed_size_rehashes_and_updates_missing() {
    let t = setup(&[("a.txt", "one")]);
    fs::write(t.target.join("copy.txt"), "one").unwrap();
    let first = SyncRunner::new(config(&t)).run().unwrap();
    assert!(first.comparison.missing.is_empty());

    fs::write(t.source.join("a.txt"), "one, edited").unwrap();
    set_mtime(&t.source.join("a.txt"), 1_700_000_000);
    let second = SyncRunner::new(config(&t)).run().unwrap();

    assert_eq!(second.comparison.missing.len(), 1);
    assert_eq!(second.summary.unwrap().source.stats.cache_misses, 1);
}

#[test]
fn test_cache_trusts_size_and_mtime() {
    // Same size, same mtime, different bytes: the cached hash is reused
    let t = setup(&[("a.txt", "AAAA")]);
    set_mtime(&t.source.join("a.txt"), 1_650_000_000);
    SyncRunner::new(config(&t)).run().unwrap();

    fs::write(t.source.join("a.txt"), "BBBB").unwrap();
    set_mtime(&t.source.join("a.txt"), 1_650_000_000);
    let outcome = SyncRunner::new(config(&t)).run().unwrap();

    assert_eq!(outcome.summary.unwrap().source.stats.cache_hits, 1);
    assert_eq!(outcome.comparison.missing[0].hash, *blake3::hash(b"AAAA").as_bytes());
}

#[test]
fn test_cache_file_format() {
    let t = setup(&[("sub/a.txt", "abc")]);
    set_mtime(&t.source.join("sub/a.txt"), 1_700_000_000);
    SyncRunner::new(config(&t)).run().unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(t.out.join("source_cache.json")).unwrap())
            .unwrap();

    assert_eq!(json["version"], CACHE_VERSION);
    assert_eq!(json["hash_mode"], "blake3");
    let entry = &json["entries"]["sub/a.txt"];
    assert_eq!(entry["hash"], blake3::hash(b"abc").to_hex().as_str());
    assert_eq!(entry["size"], 3);
    assert_eq!(entry["mtime_secs"], 1_700_000_000);
    assert_eq!(entry["mtime_nanos"], 0);
    assert_eq!(
        json["root"],
        fs::canonicalize(&t.source).unwrap().to_string_lossy().as_ref()
    );
}

#[test]
fn test_corrupt_cache_is_rebuilt() {
    let t = setup(&[("a.txt", "alpha")]);
    fs::create_dir_all(&t.out).unwrap();
    fs::write(t.out.join("source_cache.json"), "{ not json").unwrap();

    let summary = SyncRunner::new(config(&t)).run().unwrap().summary.unwrap();

    assert_eq!(summary.source.stats.cache_misses, 1);
    let rebuilt = fs::read_to_string(t.out.join("source_cache.json")).unwrap();
    assert!(rebuilt.contains("a.txt"));
}

#[test]
fn test_cache_for_other_root_is_discarded() {
    let t = setup(&[("a.txt", "alpha")]);
    let other = tempdir().unwrap();
    let stale = HashCache::new(other.path(), HashMode::Full);
    stale.update(
        "a.txt",
        5,
        fs::metadata(t.source.join("a.txt")).unwrap().modified().unwrap(),
        "00".repeat(32),
    );
    stale.save(&t.out.join("source_cache.json")).unwrap();

    let outcome = SyncRunner::new(config(&t)).run().unwrap();

    let summary = outcome.summary.unwrap();
    assert_eq!(summary.source.stats.cache_hits, 0);
    assert_eq!(outcome.comparison.missing[0].hash, *blake3::hash(b"alpha").as_bytes());
}

#[test]
fn test_hash_mode_change_discards_cache() {
    let t = setup(&[("a.txt", "alpha")]);
    SyncRunner::new(config(&t)).run().unwrap();

    let sampled = HashMode::Sampled {
        threshold: 1024,
        sample_size: 16,
    };
    let summary = SyncRunner::new(config(&t).with_hash_mode(sampled))
        .run()
        .unwrap()
        .summary
        .unwrap();

    assert_eq!(summary.source.stats.cache_hits, 0);
    assert_eq!(summary.source.stats.cache_misses, 1);
}

#[test]
fn test_deleted_files_pruned_from_cache() {
    let t = setup(&[("keep.txt", "k"), ("gone.txt", "g")]);
    SyncRunner::new(config(&t)).run().unwrap();
    fs::remove_file(t.source.join("gone.txt")).unwrap();

    SyncRunner::new(config(&t)).run().unwrap();

    let cache = HashCache::open(
        &t.out.join("source_cache.json"),
        &fs::canonicalize(&t.source).unwrap(),
        HashMode::Full,
    )
    .unwrap();
    assert_eq!(cache.len(), 1);
    assert!(cache.get("keep.txt").is_some());
    assert!(cache.get("gone.txt").is_none());
}

#[test]
fn test_prune_disabled_keeps_entries() {
    let t = setup(&[("keep.txt", "k"), ("gone.txt", "g")]);
    SyncRunner::new(config(&t)).run().unwrap();
    fs::remove_file(t.source.join("gone.txt")).unwrap();

    let mut cfg = config(&t);
    cfg.prune_cache = false;
    let summary = SyncRunner::new(cfg).run().unwrap().summary.unwrap();

    assert_eq!(summary.source.cache_entries, 2);
    assert_eq!(summary.source.cache_pruned, 0);
}
