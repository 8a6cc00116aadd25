use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

const ENV_KEYS: [&str; 9] = [
    "TOPCHART_URL",
    "TOPCHART_OUT",
    "TOPCHART_WAIT_TIMEOUT_MS",
    "TOPCHART_SETTLE_MS",
    "TOPCHART_RENDER_HARD_TIMEOUT_MS",
    "TOPCHART_RENDER_DISABLE",
    "TOPCHART_SNAPSHOT_HTML",
    "TOPCHART_NODE",
    "TOPCHART_NODE_PATH",
];

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A `topchart` command with no TOPCHART_* settings inherited from the caller.
fn topchart() -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("topchart");
    let mut cmd = Command::new(bin);
    for k in ENV_KEYS {
        cmd.env_remove(k);
    }
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn snapshot_run_writes_csv_with_repaired_titles() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("top.csv");
    let out = topchart()
        .env("TOPCHART_SNAPSHOT_HTML", fixture("chart_sample.html"))
        .env("TOPCHART_OUT", &out_path)
        .output()
        .expect("run topchart");

    assert!(
        out.status.success(),
        "topchart failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(predicate::str::contains("Total movies: 3").eval(&stdout));
    assert!(predicate::str::contains("Movies with proper titles: 3/250").eval(&stdout));
    assert!(predicate::str::contains("247 movie titles may be missing").eval(&stdout));

    let mut rdr = csv::Reader::from_path(&out_path).expect("read csv");
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        ["rank", "title", "year", "duration", "imdb_rating", "scraped_at"]
    );
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);

    let expected = [
        ["1", "The Shawshank Redemption", "1994", "2h 22m", "9.3"],
        ["2", "The Godfather", "1972", "2h 55m", "9.2"],
        ["3", "The Good, the Bad and the Ugly", "1966", "2h 58m", "8.8"],
    ];
    for (row, want) in rows.iter().zip(expected.iter()) {
        let got: Vec<&str> = row.iter().take(5).collect();
        assert_eq!(got, want);
    }

    // Same run timestamp on every row.
    let stamps: Vec<&str> = rows.iter().map(|r| &r[5]).collect();
    assert!(stamps.iter().all(|s| *s == stamps[0]));
    assert!(predicate::str::is_match(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$")
        .unwrap()
        .eval(stamps[0]));
}

#[test]
fn disabled_renderer_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("top.csv");
    let out = topchart()
        .env("TOPCHART_RENDER_DISABLE", "1")
        .env("TOPCHART_OUT", &out_path)
        .output()
        .expect("run topchart");

    assert!(!out.status.success(), "expected failure when rendering is disabled");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Scraping failed"), "stdout: {stdout}");
    assert!(!out_path.exists());
}

#[test]
fn snapshot_without_items_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("top.csv");
    let out = topchart()
        .env("TOPCHART_SNAPSHOT_HTML", fixture("chart_empty.html"))
        .env("TOPCHART_OUT", &out_path)
        .output()
        .expect("run topchart");

    assert!(!out.status.success());
    assert!(!out_path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn invalid_url_is_rejected() {
    let out = topchart()
        .env("TOPCHART_URL", "not a url")
        .env("TOPCHART_RENDER_DISABLE", "1")
        .output()
        .expect("run topchart");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("TOPCHART_"), "stderr: {stderr}");
}

#[test]
fn version_flag_prints_name() {
    let out = topchart().arg("--version").output().expect("run topchart --version");
    assert!(out.status.success());
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.trim_start().starts_with("topchart "));
}
