use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn write_poc(dir: &std::path::Path, file: &str, name: &str) {
    let yaml = format!(
        "name: {}\nrules:\n  r0:\n    request:\n      path: /probe\n    expression: response.status == 200\nexpression: r0()\ndetail:\n  author: tester\n  description: integration fixture\n",
        name
    );
    fs::write(dir.join(file), yaml).unwrap();
}

/// Running with no arguments should fail (clap requires a target or --list).
#[test]
fn test_no_args_shows_error() {
    cargo_bin_cmd!("pocrun").assert().failure();
}

/// --list prints every POC in the directory with its description.
#[test]
fn test_list_prints_pocs() {
    let dir = tempdir().unwrap();
    write_poc(dir.path(), "alpha-probe.yml", "alpha-probe");
    write_poc(dir.path(), "beta-probe.yml", "beta-probe");

    cargo_bin_cmd!("pocrun")
        .args(["--list", "--poc-dir", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha-probe.yml"))
        .stdout(predicate::str::contains("beta-probe.yml"))
        .stdout(predicate::str::contains("integration fixture"))
        .stdout(predicate::str::contains("2 POC file(s) found."));
}

/// --list against a missing directory fails with a clear message.
#[test]
fn test_list_missing_directory_fails() {
    cargo_bin_cmd!("pocrun")
        .args(["--list", "--poc-dir", "/nonexistent/poc/dir"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to list POCs"));
}

/// A search with no hits fails without contacting the target.
#[test]
fn test_search_no_match_fails() {
    let dir = tempdir().unwrap();
    write_poc(dir.path(), "alpha-probe.yml", "alpha-probe");

    cargo_bin_cmd!("pocrun")
        .args([
            "http://127.0.0.1:1",
            "--search",
            "zzz-no-such-poc",
            "--poc-dir",
            dir.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no POC matching"));
}

/// A target without --poc or --search is a usage error.
#[test]
fn test_target_without_poc_fails() {
    cargo_bin_cmd!("pocrun")
        .args(["http://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no POC specified"));
}

/// A missing POC file is a load error, exit code 1.
#[test]
fn test_missing_poc_file_fails() {
    cargo_bin_cmd!("pocrun")
        .args(["http://127.0.0.1:1", "--poc", "/nonexistent/poc.yml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load"));
}

/// A network failure must surface as "inconclusive" (exit 2), never as a
/// "not vulnerable" verdict.
#[test]
fn test_unreachable_target_is_inconclusive() {
    let dir = tempdir().unwrap();
    write_poc(dir.path(), "refused.yml", "refused-probe");

    cargo_bin_cmd!("pocrun")
        .args([
            "http://127.0.0.1:1",
            "--poc",
            dir.path().join("refused.yml").to_str().unwrap(),
            "--timeout",
            "2",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Inconclusive"))
        .stderr(predicate::str::contains("r0"));
}

/// Full run against a loopback server: vulnerable verdict on stdout, exit 0,
/// and a JSON line appended to the output file.
#[test]
fn test_end_to_end_vulnerable_verdict_and_output() {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf);
        let body = "service status: ok";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
    });

    let dir = tempdir().unwrap();
    write_poc(dir.path(), "probe.yml", "probe");
    let output = dir.path().join("results.json");

    cargo_bin_cmd!("pocrun")
        .arg(format!("http://{}", addr))
        .arg("--poc")
        .arg(dir.path().join("probe.yml"))
        .arg("-o")
        .arg(&output)
        .args(["--timeout", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VULNERABLE"));

    server.join().unwrap();

    let line = fs::read_to_string(&output).unwrap();
    assert!(line.contains("\"vulnerable\":true"));
    assert!(line.contains("\"poc\":\"probe\""));
}

/// One search hit runs directly without the interactive prompt; against a
/// closed port that still ends inconclusive.
#[test]
fn test_single_search_hit_runs_directly() {
    let dir = tempdir().unwrap();
    write_poc(dir.path(), "alpha-probe.yml", "alpha-probe");
    write_poc(dir.path(), "beta-probe.yml", "beta-probe");

    cargo_bin_cmd!("pocrun")
        .args([
            "http://127.0.0.1:1",
            "--search",
            "alpha",
            "--poc-dir",
            dir.path().to_str().unwrap(),
            "--timeout",
            "2",
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("One match, running: alpha-probe.yml"));
}

/// Several search hits prompt a numbered selection on stdin; answering "2"
/// runs the second listed POC (listing order is sorted by file name).
#[test]
fn test_multi_hit_search_prompts_for_selection() {
    let dir = tempdir().unwrap();
    write_poc(dir.path(), "alpha-probe.yml", "alpha-probe");
    write_poc(dir.path(), "beta-probe.yml", "beta-probe");

    cargo_bin_cmd!("pocrun")
        .args([
            "http://127.0.0.1:1",
            "--search",
            "probe",
            "--poc-dir",
            dir.path().to_str().unwrap(),
            "--timeout",
            "2",
        ])
        .write_stdin("2\n")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Found 2 matching POCs"))
        .stdout(predicate::str::contains("POC:       beta-probe"));
}

/// A selection outside the listed range is rejected before anything runs.
#[test]
fn test_selection_out_of_range_rejected() {
    let dir = tempdir().unwrap();
    write_poc(dir.path(), "alpha-probe.yml", "alpha-probe");
    write_poc(dir.path(), "beta-probe.yml", "beta-probe");

    cargo_bin_cmd!("pocrun")
        .args([
            "http://127.0.0.1:1",
            "--search",
            "probe",
            "--poc-dir",
            dir.path().to_str().unwrap(),
        ])
        .write_stdin("9\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("selection out of range"));
}
