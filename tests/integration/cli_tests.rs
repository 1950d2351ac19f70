use std::fs;

use clap::Parser;
use tempfile::tempdir;
use treedupe::cli::Cli;
use treedupe::error::ExitCode;

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["treedupe", "-q"];
    argv.extend_from_slice(args);
    treedupe::run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_exit_code_success_with_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"dup").unwrap();
    fs::write(dir.path().join("b.txt"), b"dup").unwrap();

    let code = run(&[
        "scan",
        "-r",
        dir.path().to_str().unwrap(),
        "--no-progress",
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_exit_code_no_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("unique.txt"), b"unique").unwrap();
    fs::write(dir.path().join("other.txt"), b"OTHER!").unwrap();

    let code = run(&[
        "scan",
        "--recursive",
        dir.path().to_str().unwrap(),
        "--output",
        "json",
        "--no-progress",
    ])
    .unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_every_output_format_runs() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    fs::write(&a, vec![3u8; 1000]).unwrap();
    fs::write(&b, vec![3u8; 1000]).unwrap();

    for format in ["text", "json", "csv"] {
        let code = run(&[
            "scan",
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "-o",
            format,
            "--chunk-size",
            "64",
            "--accelerate",
            "--max-chunk",
            "512",
            "--io-threads",
            "2",
            "--no-progress",
        ])
        .unwrap();
        assert_eq!(code, ExitCode::Success, "format {format}");
    }
}

#[test]
fn test_config_file_is_applied() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("treedupe.toml");
    fs::write(&config, "recursive = true\n\n[chunk]\nsize = 16\n").unwrap();

    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a"), b"same content").unwrap();
    fs::write(data.join("b"), b"same content").unwrap();

    // Without the config file's `recursive = true` the directory would be skipped.
    let code = run(&[
        "--config",
        config.to_str().unwrap(),
        "scan",
        data.to_str().unwrap(),
        "--no-progress",
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_invalid_config_value_is_an_error() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[chunk]\nsize = 0\n").unwrap();
    fs::write(dir.path().join("a"), b"x").unwrap();

    let err = run(&[
        "scan",
        dir.path().join("a").to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ])
    .unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{err:#}").contains("Chunk size"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.toml");

    let err = run(&["--config", missing.to_str().unwrap(), "config", "--show"]).unwrap_err();
    assert!(format!("{err:#}").contains("missing.toml"));
}

#[test]
fn test_config_subcommand() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("treedupe.toml");
    fs::write(&config, "io_threads = 3\n").unwrap();

    let code = run(&["--config", config.to_str().unwrap(), "config", "--show"]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let code = run(&["config", "--path"]).unwrap();
    assert_eq!(code, ExitCode::Success);
}
