#![allow(clippy::unwrap_used)]
// Controller integration tests against a wiremock add-on.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use presence_core::{
    CapabilityEditor, CapabilityPatch, ClientConfig, Command, CommandResult, ConnectionState,
    Controller, CoreError, DeviceInput, DeviceListParams, DeviceStatus, QueryKey,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn device_json(mac: &str, name: &str, status: &str) -> serde_json::Value {
    json!({
        "mac": mac,
        "name": name,
        "vendor": "Acme",
        "status": status,
        "online": true,
        "last_ip": "192.168.88.10",
        "last_subnet": "192.168.88.0/24",
        "last_sources": ["dhcp"],
        "updated_at": "2025-03-01T10:00:00Z"
    })
}

fn guest_wifi_json(state: &str) -> serde_json::Value {
    json!({
        "id": "guest_wifi",
        "label": "Guest WiFi",
        "description": "",
        "control": {"type": "switch", "options": [
            {"value": "on", "label": "On"}, {"value": "off", "label": "Off"}
        ]},
        "state": state,
        "enabled": true
    })
}

fn server_error() -> ResponseTemplate {
    ResponseTemplate::new(500).set_body_json(json!({
        "error": {"code": "router_unreachable", "message": "router did not answer"}
    }))
}

/// A failure slow enough to observe the optimistic cache mid-request.
fn slow_server_error() -> ResponseTemplate {
    server_error().set_delay(Duration::from_millis(300))
}

/// Give a spawned command time to apply its prediction.
async fn mid_request() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

async fn mount_health(server: &MockServer, configured: bool) {
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ok", "configured": configured})),
        )
        .mount(server)
        .await;
}

async fn mount_devices(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

/// Connected controller with background polling disabled.
async fn connected(server: &MockServer) -> Controller {
    mount_health(server, true).await;
    let mut config = ClientConfig::new(server.uri().parse().unwrap());
    config.poll_interval = Duration::ZERO;
    let controller = Controller::new(config).unwrap();
    controller.connect().await.unwrap();
    controller
}

// ── Connection ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_reports_connected() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::Connected
    );
    assert!(controller.last_success().is_some());
    controller.disconnect().await;
    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn test_unconfigured_addon_is_not_a_connect_error() {
    let server = MockServer::start().await;
    mount_health(&server, false).await;

    let mut config = ClientConfig::new(server.uri().parse().unwrap());
    config.poll_interval = Duration::ZERO;
    let controller = Controller::new(config).unwrap();
    controller.connect().await.unwrap();

    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::NotConfigured
    );
    controller.disconnect().await;
}

#[tokio::test]
async fn test_execute_requires_connect() {
    let server = MockServer::start().await;
    let controller = Controller::new(ClientConfig::new(server.uri().parse().unwrap())).unwrap();

    let result = controller.execute(Command::RefreshDevices).await;
    assert!(matches!(result, Err(CoreError::ControllerDisconnected)));
}

#[tokio::test]
async fn test_oneshot_runs_against_a_connected_controller() {
    let server = MockServer::start().await;
    mount_health(&server, true).await;
    mount_devices(&server, json!([device_json("AA:BB:CC:DD:EE:01", "Phone", "new")])).await;

    let config = ClientConfig::new(server.uri().parse().unwrap());
    let summary = Controller::oneshot(config, |controller| async move {
        assert_eq!(
            *controller.connection_state().borrow(),
            ConnectionState::Connected
        );
        controller.summary(true).await
    })
    .await
    .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.new, 1);
}

#[tokio::test]
async fn test_oneshot_surfaces_connect_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(server_error())
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri().parse().unwrap());
    let result = Controller::oneshot(config, |_| async { Ok(()) }).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_pause_holds_only_the_device_list() {
    let server = MockServer::start().await;
    mount_health(&server, true).await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/global/capabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([guest_wifi_json("on")])))
        .expect(2..)
        .mount(&server)
        .await;

    let mut config = ClientConfig::new(server.uri().parse().unwrap());
    config.poll_interval = Duration::from_millis(50);
    let controller = Controller::new(config).unwrap();
    controller.pause();
    controller.track_global_capabilities(true);
    controller.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    controller.disconnect().await;

    assert!(controller.is_paused());
    assert!(
        controller
            .cache()
            .global_capabilities
            .data(&QueryKey::global_capabilities())
            .is_some()
    );
}

// ── Queries ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_device_list_is_served_from_cache() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [device_json("AA:BB:CC:DD:EE:01", "Phone", "new")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = DeviceListParams::default();
    let first = controller.device_list(&params, false).await.unwrap();
    let second = controller.device_list(&params, false).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    controller.disconnect().await;
}

#[tokio::test]
async fn test_unchanged_refetch_keeps_list_identity() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;
    mount_devices(
        &server,
        json!([device_json("AA:BB:CC:DD:EE:01", "Phone", "new")]),
    )
    .await;

    let params = DeviceListParams::default();
    let first = controller.device_list(&params, true).await.unwrap();
    let second = controller.device_list(&params, true).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(controller.summary(false).await.unwrap().new, 1);
    controller.disconnect().await;
}

#[tokio::test]
async fn test_failed_fetch_keeps_last_good_list() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [device_json("AA:BB:CC:DD:EE:01", "Phone", "new")]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(server_error())
        .mount(&server)
        .await;

    let params = DeviceListParams::default();
    controller.device_list(&params, true).await.unwrap();
    assert!(controller.device_list(&params, true).await.is_err());

    let state = controller
        .cache()
        .device_lists
        .state(&QueryKey::devices_list(&params));
    assert_eq!(state.data.unwrap().len(), 1);
    assert!(state.error.is_some());
    controller.disconnect().await;
}

#[tokio::test]
async fn test_missing_device_maps_to_device_not_found() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/devices/AA:BB:CC:DD:EE:99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "not_found", "message": "device not found"}
        })))
        .mount(&server)
        .await;

    let err = controller
        .device("AA:BB:CC:DD:EE:99", false)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DeviceNotFound { ref identifier } if identifier == "AA:BB:CC:DD:EE:99"));
    controller.disconnect().await;
}

// ── Device mutations ────────────────────────────────────────────────

#[tokio::test]
async fn test_register_refreshes_router_and_invalidates() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;
    mount_devices(
        &server,
        json!([device_json("AA:BB:CC:DD:EE:01", "Device EE:01", "new")]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/devices/AA:BB:CC:DD:EE:01/register"))
        .and(body_json(json!({"name": "Kitchen tablet", "comment": ""})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let params = DeviceListParams::default();
    controller.device_list(&params, false).await.unwrap();

    let input = DeviceInput {
        name: Some("Kitchen tablet".into()),
        icon: None,
        comment: Some(String::new()),
    };
    let result = controller
        .execute(Command::RegisterDevice {
            mac: "AA:BB:CC:DD:EE:01".into(),
            input,
        })
        .await
        .unwrap();
    assert!(matches!(result, CommandResult::Ok));

    let state = controller
        .cache()
        .device_lists
        .state(&QueryKey::devices_list(&params));
    let list = state.data.unwrap();
    assert_eq!(list[0].name, "Kitchen tablet");
    assert_eq!(list[0].status, DeviceStatus::Registered);
    assert!(state.invalidated);
    controller.disconnect().await;
}

#[tokio::test]
async fn test_failed_patch_restores_exact_snapshot() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;
    mount_devices(
        &server,
        json!([device_json("AA:BB:CC:DD:EE:01", "Phone", "registered")]),
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/api/devices/AA:BB:CC:DD:EE:01"))
        .respond_with(slow_server_error())
        .mount(&server)
        .await;

    let params = DeviceListParams::default();
    let before = controller.device_list(&params, false).await.unwrap();

    let input = DeviceInput {
        name: Some("Renamed".into()),
        icon: None,
        comment: None,
    };
    let pending = tokio::spawn({
        let controller = controller.clone();
        async move {
            controller
                .execute(Command::PatchDevice {
                    mac: "AA:BB:CC:DD:EE:01".into(),
                    input,
                })
                .await
        }
    });
    mid_request().await;

    let predicted = controller
        .cache()
        .device_lists
        .data(&QueryKey::devices_list(&params))
        .unwrap();
    assert_eq!(predicted[0].name, "Renamed");
    assert_eq!(predicted[0].status, DeviceStatus::Registered);

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::Api { status: 500, .. }));

    let after = controller
        .cache()
        .device_lists
        .data(&QueryKey::devices_list(&params))
        .unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after[0].name, "Phone");
    controller.disconnect().await;
}

#[tokio::test]
async fn test_failed_register_predicts_then_restores_detail_and_lists() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;
    let mac = "AA:BB:CC:DD:EE:01";
    mount_devices(&server, json!([device_json(mac, "Phone", "new")])).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/devices/{mac}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_json(mac, "Phone", "new")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/devices/{mac}/register")))
        .respond_with(slow_server_error())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&server)
        .await;

    let params = DeviceListParams::default();
    let list_before = controller.device_list(&params, false).await.unwrap();
    let detail_before = controller.device(mac, false).await.unwrap();

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move {
            controller
                .execute(Command::RegisterDevice {
                    mac: mac.into(),
                    input: DeviceInput {
                        name: Some("Kitchen".into()),
                        icon: None,
                        comment: Some(String::new()),
                    },
                })
                .await
        }
    });
    mid_request().await;

    let cache = controller.cache();
    let detail_key = QueryKey::device_detail(mac);
    let list_key = QueryKey::devices_list(&params);
    let predicted = cache.device_detail.data(&detail_key).unwrap();
    assert_eq!(predicted.name, "Kitchen");
    assert_eq!(predicted.status, DeviceStatus::Registered);
    assert_eq!(cache.device_lists.data(&list_key).unwrap()[0].name, "Kitchen");

    assert!(pending.await.unwrap().is_err());

    let detail_after = cache.device_detail.data(&detail_key).unwrap();
    assert!(Arc::ptr_eq(&detail_before, &detail_after));
    assert_eq!(detail_after.name, "Phone");
    assert_eq!(detail_after.status, DeviceStatus::New);
    assert!(Arc::ptr_eq(
        &list_before,
        &cache.device_lists.data(&list_key).unwrap()
    ));
    controller.disconnect().await;
}

#[tokio::test]
async fn test_bulk_registration_reports_each_device() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/devices/AA:BB:CC:DD:EE:01/register"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/devices/AA:BB:CC:DD:EE:02/register"))
        .respond_with(server_error())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let input = |name: &str| DeviceInput {
        name: Some(name.into()),
        icon: None,
        comment: Some(String::new()),
    };
    let result = controller
        .execute(Command::RegisterDevices {
            items: vec![
                ("AA:BB:CC:DD:EE:01".into(), input("Device EE:01")),
                ("AA:BB:CC:DD:EE:02".into(), input("Device EE:02")),
            ],
        })
        .await
        .unwrap();

    let CommandResult::Bulk { succeeded, failed } = result else {
        panic!("expected bulk result");
    };
    assert_eq!(succeeded, vec!["AA:BB:CC:DD:EE:01".to_owned()]);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "AA:BB:CC:DD:EE:02");
    controller.disconnect().await;
}

// ── Capability state ────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_patch_is_rejected_before_io() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&server)
        .await;

    let err = controller
        .execute(Command::SetGlobalCapability {
            capability_id: "guest_wifi".into(),
            patch: CapabilityPatch::default(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    controller.disconnect().await;
}

#[tokio::test]
async fn test_global_toggle_rolls_back_on_failure() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/global/capabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([guest_wifi_json("off")])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/global/capabilities/guest_wifi"))
        .respond_with(server_error())
        .mount(&server)
        .await;

    let before = controller.global_capabilities(false).await.unwrap();
    let result = controller
        .execute(Command::SetGlobalCapability {
            capability_id: "guest_wifi".into(),
            patch: CapabilityPatch::state("on"),
        })
        .await;
    assert!(result.is_err());

    let after = controller
        .cache()
        .global_capabilities
        .data(&QueryKey::global_capabilities())
        .unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after[0].state, "off");
    controller.disconnect().await;
}

#[tokio::test]
async fn test_assignment_toggle_is_predicted_then_rolled_back() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/automation/capabilities/internet/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "device_id": "AA:BB:CC:DD:EE:01",
            "device_name": "Phone",
            "device_ip": "192.168.88.10",
            "online": true,
            "enabled": true,
            "state": "on"
        }])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/automation/capabilities/internet/devices/AA:BB:CC:DD:EE:01"))
        .and(body_json(json!({"state": "off"})))
        .respond_with(slow_server_error())
        .expect(1)
        .mount(&server)
        .await;

    let before = controller.assignments("internet", false).await.unwrap();
    let pending = tokio::spawn({
        let controller = controller.clone();
        async move {
            controller
                .execute(Command::SetAssignment {
                    capability_id: "internet".into(),
                    device_id: "AA:BB:CC:DD:EE:01".into(),
                    patch: CapabilityPatch::state("off"),
                })
                .await
        }
    });
    mid_request().await;

    let key = QueryKey::assignments("internet");
    let predicted = controller.cache().assignments.data(&key).unwrap();
    assert_eq!(predicted[0].state, "off");

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::Api { status: 500, .. }));

    let after = controller.cache().assignments.data(&key).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after[0].state, "on");
    controller.disconnect().await;
}

#[tokio::test]
async fn test_device_capability_change_returns_warnings() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/devices/AA:BB/capabilities/internet"))
        .and(body_json(json!({"state": "deny"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "warnings": [{"type_id": "routeros.address_list.add", "message": "router offline"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = controller
        .execute(Command::SetDeviceCapability {
            mac: "AA:BB".into(),
            capability_id: "internet".into(),
            patch: CapabilityPatch::state("deny"),
        })
        .await
        .unwrap();

    let CommandResult::StateChanged(outcome) = result else {
        panic!("expected state change");
    };
    assert_eq!(outcome.warnings.len(), 1);
    controller.disconnect().await;
}

// ── Capability templates ────────────────────────────────────────────

#[tokio::test]
async fn test_save_new_capability_caches_detail() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    let mut editor = CapabilityEditor::create();
    editor.set_id("internet");
    editor.set_label("Internet access");
    let body = serde_json::to_value(editor.draft()).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/automation/capabilities"))
        .respond_with(ResponseTemplate::new(201).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let saved = controller.save_capability(&editor).await.unwrap();
    assert_eq!(saved.id, "internet");

    let cached = controller
        .cache()
        .capability_detail
        .data(&QueryKey::capability("internet"))
        .unwrap();
    assert_eq!(cached.label, "Internet access");
    controller.disconnect().await;
}

#[tokio::test]
async fn test_invalid_editor_is_not_sent() {
    let server = MockServer::start().await;
    let controller = connected(&server).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let editor = CapabilityEditor::create();
    let err = controller.save_capability(&editor).await.unwrap_err();
    assert!(err.to_string().contains("Capability id is required"));
    controller.disconnect().await;
}
