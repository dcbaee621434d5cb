mod common;

use assert_cmd::prelude::*;
use common::*;
use kuper::remote::fake::FakeTransport;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    fs::write(&path, contents).unwrap();
    path
}

fn kuper(instance: &str, config: &Path, extra: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("kuper").unwrap();
    cmd.args(["--instance", instance, "--days", "7", "--config"])
        .arg(config)
        .args(extra)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "kuper=warn");
    cmd
}

fn html_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "html"))
        .collect()
}

fn gitlab() -> String {
    let a1 = commit_json("a1", ME, &hours_ago(30), "Add parser");
    let a2 = commit_json("a2", ME, &hours_ago(20), "Fix parser");
    let events = array(&[
        push_json(1, "feature/x", &hours_ago(2)),
        push_json(1, "main", &hours_ago(3)),
        push_json(2, "main", &hours_ago(4)),
    ]);
    serve(
        FakeTransport::new()
            .route("/user", &[], Reply::json(&user_json("me", ME)))
            .route("/events", &[("action", "pushed")], Reply::json(&events))
            .route("/projects/1", &[], Reply::json(&project_json(1, "group/A")))
            .route("/projects/2", &[], Reply::json(&project_json(2, "group/B")))
            .route(
                "/projects/1/repository/commits",
                &[("ref_name", "main")],
                Reply::json(&array(&[a2.clone(), a1])),
            )
            .route(
                "/projects/1/repository/commits",
                &[("ref_name", "feature/x")],
                Reply::json(&array(&[a2])),
            )
            .route(
                "/projects/2/repository/commits",
                &[],
                Reply::json(&array(&[commit_json("b1", ME, &hours_ago(10), "Excluded work")])),
            )
            .route(
                "/projects/1/repository/commits/a10123456789/diff",
                &[],
                Reply::json(
                    r#"[{"old_path": "parser.rs", "new_path": "parser.rs", "new_file": true, "diff": "@@ -0,0 +1 @@\n+fn parse() {}\n"}]"#,
                ),
            )
            .route(
                "/projects/1/repository/commits/a20123456789/diff",
                &[],
                Reply::json(
                    r#"[{"old_path": "parser.rs", "new_path": "parser.rs", "diff": "@@ -1 +1 @@\n-fn parse() {}\n+fn parse() -> bool { true }\n"}]"#,
                ),
            ),
    )
}

#[test]
fn days_out_of_range_are_rejected() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "token: abc\n");

    for days in ["0", "46", "seven"] {
        let output = Command::cargo_bin("kuper")
            .unwrap()
            .args(["--instance", "https://gitlab.com", "--days", days, "--config"])
            .arg(&config)
            .output()
            .unwrap();
        assert!(!output.status.success(), "--days {days} should fail");
    }
}

#[test]
fn malformed_instance_is_rejected() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "token: abc\n");

    for instance in ["gitlab.com", "https://gitlab.com:99999", "https://[::1", "https://@"] {
        let output = kuper(instance, &config, &[]).output().unwrap();
        assert_eq!(output.status.code(), Some(2), "{instance}");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("not a valid instance URL"), "{stderr}");
        assert!(!stderr.contains("Authentication"), "{stderr}");
    }
}

#[test]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();
    let output = kuper("https://gitlab.com", &dir.path().join("absent.yaml"), &[])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load configuration"), "{stderr}");
    assert!(stderr.contains("absent.yaml"), "{stderr}");
}

#[test]
fn config_without_token_fails() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "excludes:\n  - group/B\n");

    let output = kuper("https://gitlab.com", &config, &[]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("'token' not found"), "{stderr}");
}

#[test]
fn unreachable_instance_fails_on_identity_lookup() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "token: abc\n");

    let output = kuper("http://127.0.0.1:9", &config, &["--quiet", "--timeout", "2s"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not determine current user's profile"), "{stderr}");
}

#[test]
fn rejected_token_fails_on_identity_lookup() {
    let instance = serve(FakeTransport::new().route("/user", &[], Reply::status(401)));
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "token: wrong\n");

    let output = kuper(&instance, &config, &["--quiet"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Authentication"), "{stderr}");
}

#[test]
fn lists_commits_and_writes_html_report() {
    let instance = gitlab();
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "token: abc\nexcludes:\n  - group/B\n");
    let out_dir = dir.path().join("reports");

    let output = kuper(&instance, &config, &["--report", "--quiet", "--output-dir"])
        .arg(&out_dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("===== REPOSITORY: group/A"), "{stdout}");
    assert!(stdout.contains("main  |  a1"), "{stdout}");
    assert!(stdout.contains("main  |  a2"), "{stdout}");
    assert!(!stdout.contains("feature/x"), "{stdout}");
    assert!(!stdout.contains("group/B"), "{stdout}");
    assert!(stdout.contains("Successfully generated HTML report:"), "{stdout}");

    let reports = html_files(&out_dir);
    assert_eq!(reports.len(), 1);
    let html = fs::read_to_string(&reports[0]).unwrap();
    assert!(html.contains("<h2>group/A</h2>"));
    assert!(html.contains("+fn parse() -&gt; bool { true }"));
    assert!(html.contains("--- /dev/null"));
    assert!(html.find("Add parser").unwrap() < html.find("Fix parser").unwrap());
}

#[test]
fn json_output_is_machine_readable() {
    let instance = gitlab();
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "token: abc\nexcludes: [group/B]\n");

    let output = kuper(&instance, &config, &["--json", "--order", "desc"]).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["version"], 1);
    assert_eq!(doc["instance"], instance.as_str());
    let commits = doc["repositories"][0]["commits"].as_array().unwrap();
    let shorts: Vec<_> = commits.iter().map(|c| c["short_id"].as_str().unwrap()).collect();
    assert_eq!(shorts, vec!["a2", "a1"]);
}

#[test]
fn quiet_period_exits_cleanly_without_report() {
    let instance = serve(
        FakeTransport::new()
            .route("/user", &[], Reply::json(&user_json("me", ME)))
            .route("/events", &[], Reply::json("[]")),
    );
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "token: abc\n");

    let output = kuper(&instance, &config, &["--report", "--output-dir"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("KUPer"), "{stdout}");
    assert!(stdout.contains("No new commits found for this user in the specified period."));
    assert!(html_files(dir.path()).is_empty());
}
