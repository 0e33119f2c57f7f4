use clap::Parser;
use hashsync::cli::Cli;
use hashsync::error::ExitCode;
use hashsync::run_app;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

fn workspace() -> Workspace {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    let out = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&target).unwrap();
    fs::write(source.join("a.txt"), "X").unwrap();
    fs::write(source.join("b.txt"), "X").unwrap();
    fs::write(target.join("c.txt"), "Y").unwrap();

    let config = dir.path().join("hashsync.toml");
    fs::write(
        &config,
        format!(
            "source_dir = \"{}\"\ntarget_dir = \"{}\"\ncache_dir = \"{}\"\noutput_dir = \"{}\"\nworker_count = 2\n",
            toml_path(&source),
            toml_path(&target),
            toml_path(&out),
            toml_path(&out),
        ),
    )
    .unwrap();

    Workspace { dir, config }
}

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let cli = Cli::try_parse_from(args).unwrap();
    run_app(cli)
}

#[test]
fn test_compare_succeeds_with_missing_files() {
    let ws = workspace();
    let config = ws.config.to_string_lossy().into_owned();

    let code = run(&["hashsync", "-q", "compare", "--config", &config]).unwrap();

    assert_eq!(code, ExitCode::Success);
    let report = fs::read_to_string(ws.path("out").join("missing_files.csv")).unwrap();
    assert_eq!(report.lines().count(), 3);
}

#[test]
fn test_compare_policy_flag_overrides_config() {
    let ws = workspace();
    let config = ws.config.to_string_lossy().into_owned();

    let code = run(&[
        "hashsync",
        "-q",
        "compare",
        "--config",
        &config,
        "--missing-policy",
        "one-per-group",
    ])
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let report = fs::read_to_string(ws.path("out").join("missing_files.csv")).unwrap();
    assert_eq!(report.lines().count(), 2);
}

#[test]
fn test_missing_config_file_exits_with_config_error() {
    let ws = workspace();
    let absent = ws.path("absent.toml").to_string_lossy().into_owned();

    let err = run(&["hashsync", "-q", "compare", "--config", &absent]).unwrap_err();

    assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigError);
    assert!(!ws.path("out").exists());
}

#[test]
fn test_missing_target_setting_exits_with_config_error() {
    let ws = workspace();
    let partial = ws.path("partial.toml");
    fs::write(&partial, "source_dir = \"/somewhere\"\n").unwrap();
    let partial = partial.to_string_lossy().into_owned();

    let err = run(&["hashsync", "-q", "compare", "--config", &partial]).unwrap_err();

    assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigError);
}

#[test]
fn test_inaccessible_source_exits_with_general_error() {
    let ws = workspace();
    let config = ws.config.to_string_lossy().into_owned();
    let missing = ws.path("no-such-dir").to_string_lossy().into_owned();

    let err = run(&[
        "hashsync", "-q", "compare", "--config", &config, "--source", &missing,
    ])
    .unwrap_err();

    assert_eq!(ExitCode::from_error(&err), ExitCode::GeneralError);
    assert!(err.to_string().contains("source"));
}

#[test]
fn test_report_failure_exits_with_report_error() {
    let ws = workspace();
    let config = ws.config.to_string_lossy().into_owned();
    fs::create_dir_all(ws.path("out").join("missing_files.csv").join("blocker")).unwrap();

    let err = run(&["hashsync", "-q", "compare", "--config", &config]).unwrap_err();

    assert_eq!(ExitCode::from_error(&err), ExitCode::ReportError);
}

#[test]
fn test_config_subcommand_succeeds() {
    let ws = workspace();
    let config = ws.config.to_string_lossy().into_owned();

    let code = run(&["hashsync", "-q", "config", "--config", &config]).unwrap();

    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_copy_subcommand_quarantines_missing_files() {
    let ws = workspace();
    let config = ws.config.to_string_lossy().into_owned();
    run(&["hashsync", "-q", "compare", "--config", &config]).unwrap();

    let code = run(&["hashsync", "-q", "copy", "--config", &config]).unwrap();

    assert_eq!(code, ExitCode::Success);
    let quarantine = ws.path("target").join("missed_files");
    assert_eq!(fs::read_to_string(quarantine.join("a.txt")).unwrap(), "X");
    assert_eq!(fs::read_to_string(quarantine.join("b.txt")).unwrap(), "X");
}

#[test]
fn test_copy_without_report_is_general_error() {
    let ws = workspace();
    let config = ws.config.to_string_lossy().into_owned();

    let err = run(&["hashsync", "-q", "copy", "--config", &config]).unwrap_err();

    assert_eq!(ExitCode::from_error(&err), ExitCode::GeneralError);
}
