//! Integration tests for the `presence` CLI binary.
//!
//! Argument parsing, help, completions and error exits run without an
//! add-on; the rest talk to a wiremock stand-in via `--server`.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const ISOLATED_HOME: &str = "/tmp/presence-cli-test-nonexistent";

/// Build a command for the `presence` binary with env isolation.
///
/// Clears all `PRESENCE_*` env vars and points config and data
/// directories at a nonexistent path.
fn presence_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("presence");
    cmd.env("HOME", ISOLATED_HOME)
        .env("XDG_CONFIG_HOME", ISOLATED_HOME)
        .env("XDG_DATA_HOME", ISOLATED_HOME)
        .env("XDG_CACHE_HOME", ISOLATED_HOME)
        .env("NO_COLOR", "1")
        .env_remove("PRESENCE_PROFILE")
        .env_remove("PRESENCE_SERVER")
        .env_remove("PRESENCE_BASE_PATH")
        .env_remove("PRESENCE_TOKEN")
        .env_remove("PRESENCE_INSECURE")
        .env_remove("PRESENCE_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// `presence` aimed at a mock add-on, with a private data directory.
fn presence_against(server: &MockServer, data: &tempfile::TempDir) -> assert_cmd::Command {
    let mut cmd = presence_cmd();
    cmd.env("XDG_DATA_HOME", data.path())
        .args(["--server", &server.uri()]);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn device_json(mac: &str, name: &str, status: &str, online: bool) -> serde_json::Value {
    json!({
        "mac": mac,
        "name": name,
        "vendor": "Acme",
        "status": status,
        "online": online,
        "last_ip": "192.168.88.10",
        "last_subnet": "192.168.88.0/24",
        "last_sources": ["dhcp"],
        "updated_at": "2025-03-01T10:00:00Z"
    })
}

async fn mock_addon(configured: bool) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ok", "configured": configured})),
        )
        .mount(&server)
        .await;
    server
}

async fn mount_devices(server: &MockServer) {
    let items = json!([
        device_json("aa:bb:cc:dd:ee:01", "Kitchen tablet", "registered", true),
        device_json("aa:bb:cc:dd:ee:02", "Device ee:02", "new", false),
    ]);
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = presence_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    presence_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("devices")
            .and(predicate::str::contains("capabilities"))
            .and(predicate::str::contains("global"))
            .and(predicate::str::contains("views")),
    );
}

#[test]
fn test_version_flag() {
    presence_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("presence"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    presence_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    presence_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = presence_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_devices_list_without_server() {
    presence_cmd()
        .args(["devices", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_desc_requires_sort() {
    presence_cmd()
        .args(["devices", "list", "--desc"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_config_show_no_config() {
    presence_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_views_list_empty() {
    let data = tempfile::tempdir().unwrap();
    presence_cmd()
        .env("XDG_DATA_HOME", data.path())
        .args(["-o", "json", "views", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

// ── Against a mock add-on ───────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_json() {
    let server = mock_addon(true).await;
    mount_devices(&server).await;
    let data = tempfile::tempdir().unwrap();

    let output = presence_against(&server, &data)
        .args(["-o", "json", "devices", "list", "--status", "new"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["mac"], "aa:bb:cc:dd:ee:02");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_plain_sorted_desc() {
    let server = mock_addon(true).await;
    mount_devices(&server).await;
    let data = tempfile::tempdir().unwrap();

    presence_against(&server, &data)
        .args(["-o", "plain", "devices", "list", "--sort", "name", "--desc"])
        .assert()
        .success()
        .stdout("aa:bb:cc:dd:ee:01\naa:bb:cc:dd:ee:02\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_saved_view_filters_list() {
    let server = mock_addon(true).await;
    mount_devices(&server).await;
    let data = tempfile::tempdir().unwrap();

    presence_cmd()
        .env("XDG_DATA_HOME", data.path())
        .args(["views", "save", "--name", "online", "--online", "online"])
        .assert()
        .success();

    presence_against(&server, &data)
        .args(["-o", "plain", "devices", "list", "--view", "online"])
        .assert()
        .success()
        .stdout("aa:bb:cc:dd:ee:01\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_matches_sources_and_counts_whole_collection() {
    let server = mock_addon(true).await;
    let mut wifi = device_json("aa:bb:cc:dd:ee:03", "Laptop", "registered", true);
    wifi["last_sources"] = json!(["wifi"]);
    let items = json!([
        device_json("aa:bb:cc:dd:ee:01", "Kitchen tablet", "registered", true),
        wifi,
    ]);
    // The add-on's own query only covers name, MAC, vendor and IP.
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(move |req: &Request| {
            if req.url.query().is_some() {
                ResponseTemplate::new(200).set_body_json(json!({ "items": [] }))
            } else {
                ResponseTemplate::new(200).set_body_json(json!({ "items": items }))
            }
        })
        .mount(&server)
        .await;
    let data = tempfile::tempdir().unwrap();

    presence_against(&server, &data)
        .args(["-o", "plain", "devices", "list", "--search", "WiFi"])
        .assert()
        .success()
        .stdout("aa:bb:cc:dd:ee:03\n");

    let output = presence_against(&server, &data)
        .args(["devices", "list", "--search", "wifi"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(
        combined_output(&output).contains("1 of 2 devices"),
        "{}",
        combined_output(&output)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_sends_form_and_refreshes() {
    let server = mock_addon(true).await;
    let mac = "aa:bb:cc:dd:ee:02";
    Mock::given(method("GET"))
        .and(path(format!("/api/devices/{mac}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(device_json(mac, "Device ee:02", "new", true)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/devices/{mac}/register")))
        .and(body_json(json!({"name": "Phone", "icon": "wifi", "comment": ""})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    let data = tempfile::tempdir().unwrap();

    presence_against(&server, &data)
        .args(["devices", "register", mac, "--name", "Phone", "--icon", "wifi"])
        .assert()
        .success()
        .stderr(predicate::str::contains("registered"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_device_exits_not_found() {
    let server = mock_addon(true).await;
    Mock::given(method("GET"))
        .and(path("/api/devices/aa:bb:cc:dd:ee:99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "not_found", "message": "device not found"}
        })))
        .mount(&server)
        .await;
    let data = tempfile::tempdir().unwrap();

    presence_against(&server, &data)
        .args(["devices", "get", "aa:bb:cc:dd:ee:99"])
        .assert()
        .failure()
        .code(4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_unconfigured_skips_device_counts() {
    let server = mock_addon(false).await;
    let data = tempfile::tempdir().unwrap();

    presence_against(&server, &data)
        .args(["-o", "json", "status"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"configured\": false")
                .and(predicate::str::contains("devices").not()),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_all_requires_yes_when_not_interactive() {
    let server = mock_addon(true).await;
    mount_devices(&server).await;
    let data = tempfile::tempdir().unwrap();

    presence_against(&server, &data)
        .args(["devices", "register-all"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_duplicate_saves_copy_under_new_id() {
    let server = mock_addon(true).await;
    Mock::given(method("GET"))
        .and(path("/api/automation/capabilities/internet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "internet",
            "label": "Internet access",
            "description": "",
            "category": "General",
            "control": {
                "type": "switch",
                "options": [
                    {"value": "on", "label": "On"},
                    {"value": "off", "label": "Off"}
                ]
            },
            "states": {
                "on": {"label": "On", "actions_on_enter": []},
                "off": {"label": "Off", "actions_on_enter": []}
            },
            "default_state": "off",
            "ha_expose": {
                "enabled": false,
                "entity_type": "switch",
                "entity_suffix": "",
                "name_template": ""
            }
        })))
        .mount(&server)
        .await;
    // The add-on answers with the stored template; echo the request back
    Mock::given(method("POST"))
        .and(path("/api/automation/capabilities"))
        .respond_with(|req: &Request| {
            ResponseTemplate::new(200).set_body_raw(req.body.clone(), "application/json")
        })
        .expect(1)
        .mount(&server)
        .await;
    let data = tempfile::tempdir().unwrap();

    presence_against(&server, &data)
        .args(["capabilities", "duplicate", "internet"])
        .assert()
        .success()
        .stderr(
            predicate::str::contains("Duplicated internet as internet.copy_")
                .and(predicate::str::contains("Internet access (Copy)")),
        );
}
