//! Data bridge from [`Controller`] query streams to TUI actions.
//!
//! Runs as a background task: subscribes to the polled queries and the
//! controller's connection observers, forwarding every change as an
//! [`Action`]. Screens steer which device and which capability's
//! assignments are watched through [`Subscription`] messages.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use presence_core::{
    ConnectionState, Controller, DeviceListParams, QueryState, QueryStream,
};

use crate::action::{Action, Notification};

/// Change the set of per-entity queries being watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    Device(Option<String>),
    Assignments(Option<String>),
}

/// Resolves to the next change of an optional stream; pends forever when
/// nothing is subscribed so the `select!` arm stays idle.
async fn next_change<T: Send + Sync + 'static>(
    stream: Option<&mut QueryStream<T>>,
) -> Option<QueryState<T>> {
    match stream {
        Some(stream) => stream.changed().await,
        None => std::future::pending().await,
    }
}

/// Forward `state.data` unless it is the same allocation as last time.
fn fresh<T>(state: &QueryState<T>, last: &mut Option<Arc<T>>) -> Option<Arc<T>> {
    let data = state.data.as_ref()?;
    if last.as_ref().is_some_and(|prev| Arc::ptr_eq(prev, data)) {
        return None;
    }
    *last = Some(Arc::clone(data));
    Some(Arc::clone(data))
}

fn connection_action(state: &ConnectionState) -> Option<Action> {
    match state {
        ConnectionState::Connected => Some(Action::Connected),
        ConnectionState::Disconnected => Some(Action::Disconnected("disconnected".into())),
        ConnectionState::Reconnecting { .. } => Some(Action::Reconnecting),
        ConnectionState::NotConfigured => Some(Action::NotConfigured),
        ConnectionState::Failed => Some(Action::Disconnected("connection failed".into())),
        ConnectionState::Connecting => None,
    }
}

/// Connect, push initial snapshots, then forward changes until
/// cancelled. A failed first probe is reported but the loop keeps
/// running: the poll task retries and the banner clears on recovery.
#[allow(clippy::too_many_lines)]
pub async fn spawn_data_bridge(
    controller: Controller,
    action_tx: mpsc::UnboundedSender<Action>,
    mut subscriptions: mpsc::UnboundedReceiver<Subscription>,
    cancel: CancellationToken,
) {
    let list_params = DeviceListParams::default();
    controller.set_device_list_params(Some(list_params.clone()));
    controller.track_global_capabilities(true);

    if let Err(e) = controller.connect().await {
        warn!(error = %e, "initial connection failed");
        let _ = action_tx.send(Action::Notify(Notification::error(e.to_string())));
    }
    controller.request_refresh();

    let mut devices = controller.device_list_stream(&list_params);
    let mut global = controller.global_capabilities_stream();
    let mut conn_state = controller.connection_state();
    let mut last_success = controller.last_success_watch();
    let mut paused = controller.paused_watch();

    let mut focused: Option<String> = None;
    let mut device = None;
    let mut device_caps = None;
    let mut assignment_id: Option<String> = None;
    let mut assignments = None;

    let mut last_devices = None;
    let mut last_global = None;
    let mut last_error: Option<String> = None;

    // Initial snapshots so screens render immediately
    if let Some(action) = connection_action(&conn_state.borrow_and_update()) {
        let _ = action_tx.send(action);
    }
    let _ = action_tx.send(Action::LastSuccess(*last_success.borrow_and_update()));
    let _ = action_tx.send(Action::PausedChanged(*paused.borrow_and_update()));
    if let Some(list) = fresh(devices.current(), &mut last_devices) {
        let _ = action_tx.send(Action::DevicesUpdated(list));
    }
    if let Some(caps) = fresh(global.current(), &mut last_global) {
        let _ = action_tx.send(Action::GlobalCapabilitiesUpdated(caps));
    }

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(sub) = subscriptions.recv() => match sub {
                Subscription::Device(mac) => {
                    if mac == focused {
                        continue;
                    }
                    debug!(?mac, "focusing device");
                    controller.focus_device(mac.clone());
                    device = mac.as_deref().map(|m| controller.device_stream(m));
                    device_caps = mac.as_deref().map(|m| controller.device_capabilities_stream(m));
                    if let (Some(mac), Some(stream)) = (&mac, &device_caps) {
                        if let Some(caps) = stream.data() {
                            let _ = action_tx.send(Action::DeviceCapabilitiesUpdated {
                                mac: mac.clone(),
                                capabilities: Arc::clone(caps),
                            });
                        }
                    }
                    focused = mac;
                    controller.request_refresh();
                }
                Subscription::Assignments(id) => {
                    assignments = id.as_deref().map(|i| controller.assignments_stream(i));
                    if let Some(id) = &id {
                        let ctrl = controller.clone();
                        let tx = action_tx.clone();
                        let id = id.clone();
                        tokio::spawn(async move {
                            if let Err(e) = ctrl.assignments(&id, true).await {
                                let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                            }
                        });
                    }
                    assignment_id = id;
                }
            },

            Some(state) = devices.changed() => {
                let error = state.error.as_ref().map(ToString::to_string);
                if error != last_error {
                    last_error.clone_from(&error);
                    let _ = action_tx.send(Action::DataError(error));
                }
                if let Some(list) = fresh(&state, &mut last_devices) {
                    debug!(count = list.len(), "dispatching DevicesUpdated");
                    let _ = action_tx.send(Action::DevicesUpdated(list));
                }
            }

            Some(state) = global.changed() => {
                if let Some(caps) = fresh(&state, &mut last_global) {
                    let _ = action_tx.send(Action::GlobalCapabilitiesUpdated(caps));
                }
            }

            Some(state) = next_change(device.as_mut()) => {
                if let Some(d) = state.data {
                    let _ = action_tx.send(Action::DeviceUpdated(d));
                }
            }

            Some(state) = next_change(device_caps.as_mut()) => {
                if let (Some(mac), Some(caps)) = (&focused, state.data) {
                    let _ = action_tx.send(Action::DeviceCapabilitiesUpdated {
                        mac: mac.clone(),
                        capabilities: caps,
                    });
                }
            }

            Some(state) = next_change(assignments.as_mut()) => {
                if let (Some(id), Some(list)) = (&assignment_id, state.data) {
                    let _ = action_tx.send(Action::AssignmentsUpdated {
                        capability_id: id.clone(),
                        assignments: list,
                    });
                }
            }

            Ok(()) = conn_state.changed() => {
                let state = conn_state.borrow_and_update().clone();
                if let Some(action) = connection_action(&state) {
                    let _ = action_tx.send(action);
                }
            }

            Ok(()) = last_success.changed() => {
                let at = *last_success.borrow_and_update();
                let _ = action_tx.send(Action::LastSuccess(at));
            }

            Ok(()) = paused.changed() => {
                let is_paused = *paused.borrow_and_update();
                let _ = action_tx.send(Action::PausedChanged(is_paused));
            }
        }
    }

    controller.disconnect().await;
    controller.shutdown();
    debug!("data bridge shut down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_skips_identical_allocations() {
        let data = Arc::new(vec![1, 2, 3]);
        let state = QueryState {
            data: Some(Arc::clone(&data)),
            ..QueryState::default()
        };
        let mut last = None;
        assert!(fresh(&state, &mut last).is_some());
        assert!(fresh(&state, &mut last).is_none());

        let replaced = QueryState {
            data: Some(Arc::new(vec![1, 2, 3])),
            ..QueryState::default()
        };
        assert!(fresh(&replaced, &mut last).is_some());
        assert!(fresh(&QueryState::<Vec<i32>>::default(), &mut last).is_none());
    }

    #[test]
    fn failed_state_reads_as_disconnected() {
        assert!(matches!(
            connection_action(&ConnectionState::Failed),
            Some(Action::Disconnected(_))
        ));
        assert!(connection_action(&ConnectionState::Connecting).is_none());
    }
}
