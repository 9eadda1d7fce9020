use std::fs::create_dir_all;
use tempfile::tempdir;
use uirapuru::{cli::main_with_args, PipelineContext};

mod common;
use common::{write_raw_file, NUM_CHANS, NUM_TIME_SAMPLES};

/// Two observations of 3 files one second apart, an hour apart from each other, and a stray
/// file.
fn write_raw_dir(root: &std::path::Path) {
    let raw_dir = root.join("data").join("raw");
    create_dir_all(&raw_dir).unwrap();
    for (name, hhmmss) in [
        ("UIRAPURU_20230415_120000_59.fit", "120000"),
        ("UIRAPURU_20230415_120001_59.fit", "120001"),
        ("UIRAPURU_20230415_120002_59.fit", "120002"),
        ("UIRAPURU_20230415_130000_59.fit", "130000"),
        ("UIRAPURU_20230415_130001_59.fit", "130001"),
        ("UIRAPURU_20230415_130002_59.fit", "130002"),
        ("UIRAPURU_20230415_150000_59.fit", "150000"),
    ] {
        write_raw_file(&raw_dir.join(name), hhmmss);
    }
}

#[test]
fn test_summary_and_chunks() {
    let tmp_dir = tempdir().unwrap();
    write_raw_dir(tmp_dir.path());
    let root = tmp_dir.path().to_str().unwrap();

    assert_eq!(main_with_args(["uirapuru", "--root", root, "summary"]), 0);
    assert_eq!(
        main_with_args(["uirapuru", "--root", root, "--chunk-threshold", "0", "chunks", "1"]),
        0
    );
    // only 2 observations
    assert_eq!(main_with_args(["uirapuru", "--root", root, "chunks", "2"]), 1);
}

#[test]
fn test_load_observation() {
    let tmp_dir = tempdir().unwrap();
    write_raw_dir(tmp_dir.path());
    let root = tmp_dir.path().to_str().unwrap();

    #[rustfmt::skip]
    let args = [
        "uirapuru",
        "--root", root,
        "--chunk-threshold", "0",
        "--chunk-range", "1", "100",
        "--no-draw-progress",
        "load", "0",
    ];
    assert_eq!(main_with_args(args), 0);

    let context = PipelineContext {
        root: tmp_dir.path().to_path_buf(),
        chunk_threshold_mib: 0.0,
        chunk_range: 1..100,
        draw_progress: false,
        ..PipelineContext::default()
    };
    let series = context.run(0, &mut Default::default()).unwrap();
    // every file is its own chunk, the first is left out
    assert_eq!(series.num_times(), 2 * NUM_TIME_SAMPLES);
    assert_eq!(series.data.dim(), (2 * NUM_TIME_SAMPLES, NUM_CHANS));
}

#[test]
fn test_malformed_file() {
    let tmp_dir = tempdir().unwrap();
    write_raw_dir(tmp_dir.path());
    std::fs::write(
        tmp_dir.path().join("data/raw/UIRAPURU_20230415_160000_59.fit"),
        b"truncated",
    )
    .unwrap();
    let root = tmp_dir.path().to_str().unwrap();

    assert_eq!(main_with_args(["uirapuru", "--root", root, "summary"]), 1);
    assert_eq!(
        main_with_args(["uirapuru", "--root", root, "--skip-malformed", "summary"]),
        0
    );
}

#[test]
fn test_help_dry_run_and_bad_args() {
    assert_eq!(main_with_args(["uirapuru", "--help"]), 0);
    assert_eq!(main_with_args(["uirapuru", "--dry-run", "summary"]), 0);
    assert_eq!(main_with_args(["uirapuru", "--not-an-arg"]), 1);
    assert_eq!(
        main_with_args(["uirapuru", "--chunk-range", "3", "1", "summary"]),
        1
    );
}

#[test]
fn test_fetch_dry_run_by_name() {
    let tmp_dir = tempdir().unwrap();
    let root = tmp_dir.path().to_str().unwrap();
    // names are given, so the archive is never contacted
    assert_eq!(
        main_with_args([
            "uirapuru",
            "--root",
            root,
            "fetch",
            "--dry-run",
            "UIRAPURU_20230415_120000_59.fit",
        ]),
        0
    );
    assert!(!tmp_dir.path().join("data/raw").exists());
}
