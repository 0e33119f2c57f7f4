use hashsync::compare::{CompareConfig, MatchMode, MissingPolicy};
use hashsync::config::RunConfig;
use hashsync::output::{read_missing_report, split_paths};
use hashsync::pipeline::SyncRunner;
use hashsync::scanner::WalkerConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(root).unwrap();
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

fn trees(source: &[(&str, &str)], target: &[(&str, &str)]) -> (TempDir, PathBuf, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let src = dir.path().join("source");
    let dst = dir.path().join("target");
    let out = dir.path().join("reports");
    write_tree(&src, source);
    write_tree(&dst, target);
    (dir, src, dst, out)
}

fn run(config: RunConfig) -> hashsync::pipeline::RunOutcome {
    SyncRunner::new(config).run().unwrap()
}

fn missing_paths(outcome: &hashsync::pipeline::RunOutcome) -> Vec<String> {
    outcome
        .comparison
        .missing
        .iter()
        .map(|m| m.path.clone())
        .collect()
}

#[test]
fn test_identical_trees_have_nothing_missing() {
    let files: &[(&str, &str)] = &[("a.txt", "alpha"), ("dir/b.txt", "beta")];
    let (_dir, src, dst, out) = trees(files, files);

    let outcome = run(RunConfig::new(&src, &dst).with_output_dir(&out).with_cache_dir(&out));

    assert!(outcome.comparison.missing.is_empty());
    assert!(outcome.comparison.source_duplicates.is_empty());
    assert_eq!(
        fs::read_to_string(out.join("missing_files.csv")).unwrap(),
        "path,hash,size\n"
    );
}

#[test]
fn test_renamed_file_is_not_missing() {
    let (_dir, src, dst, out) = trees(
        &[("photos/2020/img.jpg", "jpeg bytes")],
        &[("archive/renamed.jpg", "jpeg bytes")],
    );

    let outcome = run(RunConfig::new(&src, &dst).with_output_dir(&out).with_cache_dir(&out));

    assert!(outcome.comparison.missing.is_empty());
}

#[test]
fn test_same_path_different_content_is_missing() {
    let (_dir, src, dst, out) = trees(&[("notes.txt", "v2")], &[("notes.txt", "v1")]);

    let outcome = run(RunConfig::new(&src, &dst).with_output_dir(&out).with_cache_dir(&out));

    assert_eq!(missing_paths(&outcome), vec!["notes.txt"]);
}

#[test]
fn test_duplicate_source_files_all_reported_by_default() {
    let (_dir, src, dst, out) = trees(&[("a.txt", "X"), ("b.txt", "X")], &[("c.txt", "Y")]);

    let outcome = run(RunConfig::new(&src, &dst).with_output_dir(&out).with_cache_dir(&out));

    assert_eq!(missing_paths(&outcome), vec!["a.txt", "b.txt"]);
    let rows = read_missing_report(&out.join("missing_files.csv")).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].path, "a.txt");
    assert_eq!(rows[0].size, Some(1));
    assert_eq!(
        rows[0].hash.as_deref(),
        Some(blake3::hash(b"X").to_hex().as_str())
    );

    let duplicates = fs::read_to_string(out.join("source_duplicates.csv")).unwrap();
    let mut lines = duplicates.lines();
    assert_eq!(lines.next(), Some("hash,paths"));
    let row = lines.next().unwrap();
    let (hash, paths) = row.split_once(',').unwrap();
    assert_eq!(hash, blake3::hash(b"X").to_hex().as_str());
    assert_eq!(split_paths(paths), vec!["a.txt", "b.txt"]);
    assert_eq!(lines.next(), None);
}

#[test]
fn test_duplicate_source_files_one_per_group() {
    let (_dir, src, dst, out) = trees(&[("a.txt", "X"), ("b.txt", "X")], &[("c.txt", "Y")]);
    let config = RunConfig::new(&src, &dst)
        .with_output_dir(&out)
        .with_cache_dir(&out)
        .with_compare(CompareConfig::default().with_missing_policy(MissingPolicy::OnePerGroup));

    let outcome = run(config);

    assert_eq!(missing_paths(&outcome), vec!["a.txt"]);
}

#[test]
fn test_missing_rows_follow_scanner_order() {
    let (_dir, src, dst, out) = trees(
        &[
            ("z.txt", "1"),
            ("a/inner.txt", "2"),
            ("m.txt", "3"),
            ("a/b/deep.txt", "4"),
        ],
        &[],
    );

    let outcome = run(
        RunConfig::new(&src, &dst)
            .with_output_dir(&out)
            .with_cache_dir(&out)
            .with_worker_count(4),
    );

    // Name-sorted, depth-first
    assert_eq!(
        missing_paths(&outcome),
        vec!["a/b/deep.txt", "a/inner.txt", "m.txt", "z.txt"]
    );
}

#[test]
fn test_duplicates_in_target_reported() {
    let (_dir, src, dst, out) = trees(
        &[("a.txt", "same")],
        &[("x/one.txt", "same"), ("y/two.txt", "same"), ("z.txt", "other")],
    );

    let outcome = run(RunConfig::new(&src, &dst).with_output_dir(&out).with_cache_dir(&out));

    assert!(outcome.comparison.missing.is_empty());
    assert_eq!(outcome.comparison.target_duplicates.len(), 1);
    assert_eq!(
        outcome.comparison.target_duplicates[0].paths,
        vec!["x/one.txt", "y/two.txt"]
    );
}

#[test]
fn test_empty_files_group_together() {
    let (_dir, src, dst, out) = trees(&[("e1", ""), ("sub/e2", "")], &[]);

    let outcome = run(RunConfig::new(&src, &dst).with_output_dir(&out).with_cache_dir(&out));

    assert_eq!(outcome.comparison.source_duplicates.len(), 1);
    assert_eq!(outcome.comparison.source_duplicates[0].size, 0);
    assert_eq!(missing_paths(&outcome), vec!["e1", "sub/e2"]);
}

#[test]
fn test_skip_empty_excludes_empty_files() {
    let (_dir, src, dst, out) = trees(&[("e1", ""), ("f", "data")], &[]);
    let config = RunConfig::new(&src, &dst)
        .with_output_dir(&out)
        .with_cache_dir(&out)
        .with_walker(WalkerConfig::default().with_skip_empty(true));

    let outcome = run(config);

    assert_eq!(missing_paths(&outcome), vec!["f"]);
}

#[test]
fn test_extension_filters_apply_to_both_trees() {
    let (_dir, src, dst, out) = trees(
        &[("keep.jpg", "1"), ("skip.tmp", "2"), ("KEEP2.JPG", "3")],
        &[],
    );
    let config = RunConfig::new(&src, &dst)
        .with_output_dir(&out)
        .with_cache_dir(&out)
        .with_walker(WalkerConfig::default().with_include_extensions(vec![".jpg".into()]));

    let outcome = run(config);

    let mut paths = missing_paths(&outcome);
    paths.sort();
    assert_eq!(paths, vec!["KEEP2.JPG", "keep.jpg"]);
}

#[test]
fn test_match_by_path() {
    let (_dir, src, dst, out) = trees(
        &[("same.txt", "new content"), ("only_src.txt", "x")],
        &[("same.txt", "old content"), ("elsewhere.txt", "x")],
    );
    let config = RunConfig::new(&src, &dst)
        .with_output_dir(&out)
        .with_cache_dir(&out)
        .with_compare(CompareConfig::default().with_match_mode(MatchMode::Path));

    let outcome = run(config);

    assert_eq!(missing_paths(&outcome), vec!["only_src.txt"]);
}

#[test]
fn test_same_root_only_warns() {
    let (_dir, src, _dst, out) = trees(&[("a.txt", "A"), ("b.txt", "B")], &[]);

    let outcome = run(RunConfig::new(&src, &src).with_output_dir(&out).with_cache_dir(&out));

    assert!(outcome.comparison.missing.is_empty());
}

#[test]
fn test_summary_counts() {
    let (_dir, src, dst, out) = trees(
        &[("a.txt", "X"), ("b.txt", "X"), ("c.txt", "present")],
        &[("c.txt", "present")],
    );

    let outcome = run(RunConfig::new(&src, &dst).with_output_dir(&out).with_cache_dir(&out));

    let summary = outcome.summary.unwrap();
    assert_eq!(summary.missing_files, 2);
    assert_eq!(summary.missing_bytes, 2);
    assert_eq!(summary.source_duplicate_groups, 1);
    assert_eq!(summary.target_duplicate_groups, 0);
    assert_eq!(summary.source.stats.files_scanned, 3);
    assert_eq!(summary.target.stats.files_scanned, 1);
    assert!(!summary.interrupted);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(json["missing_files"], 2);
    assert_eq!(json["missing_policy"], "all");
    assert_eq!(json["match_mode"], "content");
}
