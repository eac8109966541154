//! CLI integration tests
//!
//! Drive the `snitchdiff` binary against fixture directories and check what
//! it prints.

use std::fs;
use std::process::{Command, Output};

use serde_json::json;
use tempfile::TempDir;

fn write_fixtures(dir: &TempDir, nodes: usize) {
    let hosts: Vec<_> = (1..nodes)
        .map(|i| json!({"model": "host", "id": format!("h{}", i), "side": if i % 2 == 0 { "left" } else { "right" }}))
        .collect();
    let mut host_map = serde_json::Map::new();
    for i in 1..nodes {
        host_map.insert(format!("h{}", i), json!(i));
    }
    let structure = json!({
        "frame": {"model": "environment", "id": "prod", "side": "both", "children": hosts},
        "nodemap": {"environment": {"prod": 0}, "host": host_map},
        "nodecount": nodes,
    });
    let records: Vec<_> = (0..nodes)
        .map(|i| {
            json!({
                "both": {"hostname": format!("node-{}", i)},
                "left": {"ram": 8},
                "right": {"ram": 16},
            })
        })
        .collect();

    fs::write(dir.path().join("structure.json"), structure.to_string()).unwrap();
    fs::write(
        dir.path().join("nodes.json"),
        serde_json::Value::Array(records).to_string(),
    )
    .unwrap();
}

fn run(dir: &TempDir, extra: &[&str]) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_snitchdiff");
    let config = dir.path().join("view.toml");
    fs::write(&config, "[label_properties]\nhost = \"hostname\"\n").unwrap();

    Command::new(cli_bin)
        .args(&extra[..1])
        .args([
            "--fixtures",
            dir.path().to_str().unwrap(),
            "--type",
            "environment",
            "--id",
            "prod",
            "--left",
            "2024-03-01T00:00:00Z",
            "--right",
            "2024-03-08T00:00:00Z",
            "--poll-ms",
            "10",
            "--config",
            config.to_str().unwrap(),
        ])
        .args(&extra[1..])
        .output()
        .expect("Failed to execute CLI")
}

#[test]
fn test_cli_render_prints_status_and_nodes() {
    let dir = TempDir::new().unwrap();
    write_fixtures(&dir, 4);

    let output = run(&dir, &["render"]);

    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines[0], "status: Done");
    assert_eq!(lines.len(), 5, "status plus four nodes:\n{}", stdout);
    assert!(lines[1].ends_with("environment: prod [unchanged]"));
    assert!(stdout.contains("host: node-2 [removed]"));
    assert!(stdout.contains("host: node-3 [added]"));
}

#[test]
fn test_cli_render_null_frame_is_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("structure.json"),
        r#"{"frame": null, "nodemap": {}, "nodecount": 0}"#,
    )
    .unwrap();
    fs::write(dir.path().join("nodes.json"), "[]").unwrap();

    let output = run(&dir, &["render"]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "status: No meaningful differences."
    );
}

#[test]
fn test_cli_detail_prints_property_table() {
    let dir = TempDir::new().unwrap();
    write_fixtures(&dir, 3);

    let output = run(&dir, &["detail", "--node", "host:h1"]);

    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("host:h1\n"));
    assert!(stdout.contains("hostname\tnode-1\tnode-1\t\n"));
    assert!(stdout.contains("ram\t8\t16\tmodified\n"));
}

#[test]
fn test_cli_detail_unknown_node_fails() {
    let dir = TempDir::new().unwrap();
    write_fixtures(&dir, 3);

    let output = run(&dir, &["detail", "--node", "host:missing"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown node: host:missing"));
}
