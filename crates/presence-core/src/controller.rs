// ── Controller abstraction ──
//
// Lifecycle for one presence add-on connection: health check, background
// polling, command routing with optimistic cache updates, and reactive
// query subscriptions over the `QueryCache`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use presence_api::PresenceClient;
use presence_api::transport::{TlsMode, TransportConfig};
use presence_api::types::{
    ActionType, CapabilityDeviceAssignment, CapabilityListParams, CapabilityTemplate,
    CapabilityUIModel, Device, DeviceInput, DeviceListParams, HealthStatus, StateSourceType,
};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::{ClientConfig, TlsVerification};
use crate::editor::CapabilityEditor;
use crate::error::CoreError;
use crate::filter::Summary;
use crate::store::cache::replace;
use crate::store::merge::merge_devices_for_list;
use crate::store::optimistic::{
    Snapshot, predict_assignments, predict_capabilities, predict_device, predict_device_list,
};
use crate::store::{
    ASSIGNMENTS_STALE, CAPABILITIES_STALE, DETAIL_STALE, DEVICE_CAPABILITIES_STALE,
    DEVICE_LIST_STALE, DeviceList, GLOBAL_CAPABILITIES_STALE, PRIMITIVES_STALE, QueryCache,
    QueryKey, QueryStore,
};
use crate::stream::QueryStream;

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Requests are failing at the transport level; polling continues.
    Reconnecting { attempt: u32 },
    /// The add-on is up but has no router integration configured.
    NotConfigured,
    Failed,
}

/// Queries the poll task keeps fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTargets {
    pub device_list: Option<DeviceListParams>,
    /// Device whose detail and capabilities are open.
    pub device: Option<String>,
    pub global_capabilities: bool,
}

impl Default for PollTargets {
    fn default() -> Self {
        Self {
            device_list: Some(DeviceListParams::default()),
            device: None,
            global_capabilities: false,
        }
    }
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Reads go through the
/// query methods (cached, stale-aware); writes go through
/// [`execute`](Self::execute).
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ClientConfig,
    client: PresenceClient,
    cache: Arc<QueryCache>,
    connection_state: watch::Sender<ConnectionState>,
    last_success: watch::Sender<Option<DateTime<Utc>>>,
    paused: watch::Sender<bool>,
    poll_targets: watch::Sender<PollTargets>,
    refresh_now: Notify,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    /// Child of `cancel`, replaced on every `connect()`.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller. Does NOT connect; call
    /// [`connect()`](Self::connect) to start background tasks.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client =
            PresenceClient::new(config.url.as_str(), config.base_path.clone(), &transport)?;
        Ok(Self::with_client(config, client))
    }

    /// Use a pre-built client (tests, custom transports).
    pub fn with_client(config: ClientConfig, client: PresenceClient) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (last_success, _) = watch::channel(None);
        let (paused, _) = watch::channel(false);
        let (poll_targets, _) = watch::channel(PollTargets::default());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = Mutex::new(cancel.child_token());

        Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                cache: QueryCache::new(),
                connection_state,
                last_success,
                paused,
                poll_targets,
                refresh_now: Notify::new(),
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel,
                cancel_child,
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &PresenceClient {
        &self.inner.client
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.inner.cache
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Spawn the command processor and poll task, then probe `/healthz`.
    ///
    /// Background tasks keep running when the probe fails, so a TUI can
    /// show a disconnected banner and recover on its own.
    pub async fn connect(&self) -> Result<(), CoreError> {
        if *self.inner.connection_state.borrow() != ConnectionState::Disconnected {
            self.disconnect().await;
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        {
            let mut handles = self.inner.task_handles.lock().await;
            if let Some(rx) = self.inner.command_rx.lock().await.take() {
                let ctrl = self.clone();
                handles.push(tokio::spawn(command_processor_task(ctrl, rx, child.clone())));
            }

            let period = self.inner.config.poll_interval;
            if !period.is_zero() {
                let ctrl = self.clone();
                handles.push(tokio::spawn(poll_task(ctrl, period, child)));
            }
        }

        match self.inner.client.health().await {
            Ok(health) if health.configured => {
                self.record_success();
                info!(url = %self.inner.config.url, "connected to presence add-on");
                Ok(())
            }
            Ok(_) => {
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::NotConfigured);
                warn!("add-on reachable but integration not configured");
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Failed);
                warn!(error = %err, "initial health check failed");
                Err(err)
            }
        }
    }

    /// Stop background tasks. The controller can be connected again.
    pub async fn disconnect(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Cancel everything, including any future `connect()`.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command through the command processor task.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.connection_state.borrow() == ConnectionState::Disconnected {
            return Err(CoreError::ControllerDisconnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerDisconnected)?;

        rx.await.map_err(|_| CoreError::ControllerDisconnected)?
    }

    /// Validate an editor draft and save it.
    pub async fn save_capability(
        &self,
        editor: &CapabilityEditor,
    ) -> Result<CapabilityTemplate, CoreError> {
        editor.validate()?;
        let cmd = Command::SaveCapability {
            original_id: editor.original_id().map(str::to_owned),
            template: Box::new(editor.draft().clone()),
        };
        match self.execute(cmd).await? {
            CommandResult::Capability(saved) => Ok(*saved),
            other => Err(CoreError::Internal(format!(
                "unexpected result for save: {other:?}"
            ))),
        }
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// Connect, run `f`, disconnect. Polling is disabled.
    pub async fn oneshot<F, Fut, T>(config: ClientConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let controller = Controller::new(cfg)?;
        if let Err(e) = controller.connect().await {
            controller.disconnect().await;
            return Err(e);
        }
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Time of the last successful request.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_success.borrow()
    }

    pub fn last_success_watch(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.inner.last_success.subscribe()
    }

    // ── Live updates ─────────────────────────────────────────────

    /// Stop timed refetches of the device list. Other poll targets and
    /// invalidation refetches are unaffected.
    pub fn pause(&self) {
        self.inner.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.inner.paused.send_replace(false);
    }

    /// Flip the pause flag; returns the new value.
    pub fn toggle_pause(&self) -> bool {
        let mut now_paused = false;
        self.inner.paused.send_modify(|p| {
            *p = !*p;
            now_paused = *p;
        });
        now_paused
    }

    pub fn is_paused(&self) -> bool {
        *self.inner.paused.borrow()
    }

    pub fn paused_watch(&self) -> watch::Receiver<bool> {
        self.inner.paused.subscribe()
    }

    pub fn poll_targets(&self) -> PollTargets {
        self.inner.poll_targets.borrow().clone()
    }

    pub fn set_device_list_params(&self, params: Option<DeviceListParams>) {
        self.inner
            .poll_targets
            .send_modify(|t| t.device_list = params);
    }

    /// Keep the given device's detail and capabilities fresh.
    pub fn focus_device(&self, mac: Option<String>) {
        self.inner.poll_targets.send_modify(|t| t.device = mac);
    }

    pub fn track_global_capabilities(&self, enabled: bool) {
        self.inner
            .poll_targets
            .send_modify(|t| t.global_capabilities = enabled);
    }

    /// Wake the poll task to refetch stale targets now.
    pub fn request_refresh(&self) {
        self.inner.refresh_now.notify_one();
    }

    /// Invalidate `prefix` and refetch whatever is being watched.
    pub fn invalidate(&self, prefix: &QueryKey) {
        self.inner.cache.invalidate(prefix);
        self.request_refresh();
    }

    // ── Queries ──────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthStatus, CoreError> {
        Ok(self.inner.client.health().await?)
    }

    pub async fn device_list(
        &self,
        params: &DeviceListParams,
        force: bool,
    ) -> Result<Arc<DeviceList>, CoreError> {
        let cache = &self.inner.cache;
        let list = self
            .run_query(
                &cache.device_lists,
                &QueryKey::devices_list(params),
                DEVICE_LIST_STALE,
                force,
                self.inner.client.list_devices(params),
                merge_devices_for_list,
            )
            .await?;

        if *params == DeviceListParams::default() {
            let key = QueryKey::devices_summary();
            let summary = Summary::from_devices(list.iter().map(|d| &**d));
            if cache.summary.data(&key).as_deref() != Some(&summary) {
                cache.summary.set_data(&key, Arc::new(summary));
            }
        }
        Ok(list)
    }

    /// Counts over the unfiltered device list.
    pub async fn summary(&self, force: bool) -> Result<Summary, CoreError> {
        let list = self.device_list(&DeviceListParams::default(), force).await?;
        Ok(Summary::from_devices(list.iter().map(|d| &**d)))
    }

    pub async fn device(&self, mac: &str, force: bool) -> Result<Arc<Device>, CoreError> {
        self.run_query(
            &self.inner.cache.device_detail,
            &QueryKey::device_detail(mac),
            DETAIL_STALE,
            force,
            self.inner.client.get_device(mac),
            replace,
        )
        .await
        .map_err(|e| match e {
            CoreError::NotFound { .. } => CoreError::DeviceNotFound {
                identifier: mac.to_owned(),
            },
            other => other,
        })
    }

    pub async fn device_capabilities(
        &self,
        mac: &str,
        force: bool,
    ) -> Result<Arc<Vec<CapabilityUIModel>>, CoreError> {
        self.run_query(
            &self.inner.cache.device_capabilities,
            &QueryKey::device_capabilities(mac),
            DEVICE_CAPABILITIES_STALE,
            force,
            self.inner.client.list_device_capabilities(mac),
            replace,
        )
        .await
    }

    pub async fn action_types(&self, force: bool) -> Result<Arc<Vec<ActionType>>, CoreError> {
        self.run_query(
            &self.inner.cache.action_types,
            &QueryKey::action_types(),
            PRIMITIVES_STALE,
            force,
            self.inner.client.list_action_types(),
            replace,
        )
        .await
    }

    pub async fn state_source_types(
        &self,
        force: bool,
    ) -> Result<Arc<Vec<StateSourceType>>, CoreError> {
        self.run_query(
            &self.inner.cache.state_source_types,
            &QueryKey::state_source_types(),
            PRIMITIVES_STALE,
            force,
            self.inner.client.list_state_source_types(),
            replace,
        )
        .await
    }

    pub async fn capabilities(
        &self,
        params: &CapabilityListParams,
        force: bool,
    ) -> Result<Arc<Vec<CapabilityTemplate>>, CoreError> {
        self.run_query(
            &self.inner.cache.capability_lists,
            &QueryKey::capabilities(params),
            CAPABILITIES_STALE,
            force,
            self.inner.client.list_capabilities(params),
            replace,
        )
        .await
    }

    pub async fn capability(
        &self,
        id: &str,
        force: bool,
    ) -> Result<Arc<CapabilityTemplate>, CoreError> {
        self.run_query(
            &self.inner.cache.capability_detail,
            &QueryKey::capability(id),
            CAPABILITIES_STALE,
            force,
            self.inner.client.get_capability(id),
            replace,
        )
        .await
    }

    pub async fn assignments(
        &self,
        capability_id: &str,
        force: bool,
    ) -> Result<Arc<Vec<CapabilityDeviceAssignment>>, CoreError> {
        self.run_query(
            &self.inner.cache.assignments,
            &QueryKey::assignments(capability_id),
            ASSIGNMENTS_STALE,
            force,
            self.inner.client.list_capability_assignments(capability_id),
            replace,
        )
        .await
    }

    pub async fn global_capabilities(
        &self,
        force: bool,
    ) -> Result<Arc<Vec<CapabilityUIModel>>, CoreError> {
        self.run_query(
            &self.inner.cache.global_capabilities,
            &QueryKey::global_capabilities(),
            GLOBAL_CAPABILITIES_STALE,
            force,
            self.inner.client.list_global_capabilities(),
            replace,
        )
        .await
    }

    // ── Subscriptions ────────────────────────────────────────────

    pub fn device_list_stream(&self, params: &DeviceListParams) -> QueryStream<DeviceList> {
        QueryStream::new(
            self.inner
                .cache
                .device_lists
                .subscribe(&QueryKey::devices_list(params)),
        )
    }

    pub fn device_stream(&self, mac: &str) -> QueryStream<Device> {
        QueryStream::new(
            self.inner
                .cache
                .device_detail
                .subscribe(&QueryKey::device_detail(mac)),
        )
    }

    pub fn device_capabilities_stream(&self, mac: &str) -> QueryStream<Vec<CapabilityUIModel>> {
        QueryStream::new(
            self.inner
                .cache
                .device_capabilities
                .subscribe(&QueryKey::device_capabilities(mac)),
        )
    }

    pub fn assignments_stream(
        &self,
        capability_id: &str,
    ) -> QueryStream<Vec<CapabilityDeviceAssignment>> {
        QueryStream::new(
            self.inner
                .cache
                .assignments
                .subscribe(&QueryKey::assignments(capability_id)),
        )
    }

    pub fn global_capabilities_stream(&self) -> QueryStream<Vec<CapabilityUIModel>> {
        QueryStream::new(
            self.inner
                .cache
                .global_capabilities
                .subscribe(&QueryKey::global_capabilities()),
        )
    }

    // ── Internals ────────────────────────────────────────────────

    /// Serve from cache when fresh, otherwise fetch and record the
    /// outcome. A failed fetch keeps the last good value.
    async fn run_query<T, R, Fut, M>(
        &self,
        store: &QueryStore<T>,
        key: &QueryKey,
        stale_time: Duration,
        force: bool,
        fetch: Fut,
        merge: M,
    ) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<R, presence_api::Error>>,
        M: FnOnce(Option<&Arc<T>>, R) -> Arc<T>,
    {
        if !force && !store.is_stale(key, stale_time) {
            if let Some(data) = store.data(key) {
                return Ok(data);
            }
        }

        let ticket = store.begin_fetch(key);
        debug!(%key, "fetching");
        match fetch.await {
            Ok(value) => {
                store.finish_fetch(key, ticket, Ok(value), merge);
                self.record_success();
                store
                    .data(key)
                    .ok_or_else(|| CoreError::Internal(format!("query {key} cleared mid-fetch")))
            }
            Err(e) => {
                let err = CoreError::from(e);
                store.finish_fetch(key, ticket, Err::<T, _>(err.clone()), replace);
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    fn record_success(&self) {
        self.inner.last_success.send_replace(Some(Utc::now()));
        self.inner.connection_state.send_if_modified(|state| {
            if matches!(state, ConnectionState::Connected | ConnectionState::Disconnected) {
                return false;
            }
            *state = ConnectionState::Connected;
            true
        });
    }

    fn record_failure(&self, err: &CoreError) {
        self.inner.connection_state.send_if_modified(|state| {
            let next = if err.is_not_configured() {
                ConnectionState::NotConfigured
            } else if err.is_connectivity() {
                match state {
                    ConnectionState::Disconnected => return false,
                    ConnectionState::Reconnecting { attempt } => ConnectionState::Reconnecting {
                        attempt: attempt.saturating_add(1),
                    },
                    _ => ConnectionState::Reconnecting { attempt: 1 },
                }
            } else {
                return false;
            };
            if *state == next || *state == ConnectionState::Disconnected {
                return false;
            }
            *state = next;
            true
        });
    }

    /// One refresh pass over the current poll targets. `with_list` is
    /// false for timer ticks while live updates are paused.
    async fn poll_once(&self, force: bool, with_list: bool) {
        let targets = self.poll_targets();

        if let Some(params) = targets.device_list.as_ref().filter(|_| with_list) {
            if let Err(e) = self.device_list(params, force).await {
                warn!(error = %e, "device list poll failed");
            }
        }
        if let Some(mac) = &targets.device {
            if let Err(e) = self.device(mac, force).await {
                warn!(%mac, error = %e, "device detail poll failed");
            }
            if let Err(e) = self.device_capabilities(mac, force).await {
                warn!(%mac, error = %e, "device capabilities poll failed");
            }
        }
        if targets.global_capabilities {
            if let Err(e) = self.global_capabilities(force).await {
                warn!(error = %e, "global capabilities poll failed");
            }
        }
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Write the predicted value, run `request`, and restore the
    /// snapshot if it fails.
    async fn optimistic<T, R, P, Fut>(
        &self,
        store: &QueryStore<T>,
        key: &QueryKey,
        predict: P,
        request: Fut,
    ) -> Result<R, CoreError>
    where
        T: Send + Sync + 'static,
        P: FnOnce(&T) -> T,
        Fut: Future<Output = Result<R, presence_api::Error>>,
    {
        let snapshot = Snapshot::capture(store, [key]);
        store.update(key, predict);
        match request.await {
            Ok(value) => Ok(value),
            Err(e) => {
                snapshot.restore(store);
                let err = CoreError::from(e);
                warn!(%key, error = %err, "mutation failed, cache rolled back");
                Err(err)
            }
        }
    }

    /// Optimistic register/patch across every cached device list and the
    /// device's detail entry.
    async fn mutate_device(
        &self,
        mac: &str,
        input: &DeviceInput,
        register: bool,
    ) -> Result<(), CoreError> {
        input.validate()?;
        let cache = &self.inner.cache;
        let client = &self.inner.client;

        let list_keys = cache.device_lists.keys_with_prefix(&QueryKey::devices_lists());
        let detail_key = QueryKey::device_detail(mac);
        let lists = Snapshot::capture(&cache.device_lists, &list_keys);
        let detail = Snapshot::capture(&cache.device_detail, [&detail_key]);

        for key in &list_keys {
            cache
                .device_lists
                .update(key, |list| predict_device_list(list, mac, input, register));
        }
        cache
            .device_detail
            .update(&detail_key, |d| predict_device(d, input, register));

        let result = if register {
            client.register_device(mac, input).await
        } else {
            client.patch_device(mac, input).await
        };

        if let Err(e) = result {
            lists.restore(&cache.device_lists);
            detail.restore(&cache.device_detail);
            let err = CoreError::from(e);
            warn!(%mac, error = %err, "device update failed, cache rolled back");
            return Err(err);
        }
        Ok(())
    }

    /// Ask the add-on to re-poll the router. Failure only delays fresh data.
    async fn trigger_router_refresh(&self) {
        if let Err(e) = self.inner.client.refresh_devices().await {
            warn!(error = %e, "router refresh after registration failed");
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Refetch poll targets every `period`; refetch stale targets
/// immediately when woken by an invalidation. Pausing only holds the
/// device list so detail and global capabilities stay live.
async fn poll_task(controller: Controller, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = controller.inner.refresh_now.notified() => {
                controller.poll_once(false, true).await;
            }
            _ = interval.tick() => {
                controller.poll_once(true, !controller.is_paused()).await;
            }
        }
    }
}

/// Process commands one at a time. The receiver is handed back on exit
/// so a later `connect()` can restart the processor.
async fn command_processor_task(
    controller: Controller,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
    *controller.inner.command_rx.lock().await = Some(rx);
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let cache = &controller.inner.cache;
    let client = &controller.inner.client;

    match cmd {
        // ── Devices ──────────────────────────────────────────────
        Command::RegisterDevice { mac, input } => {
            let result = controller.mutate_device(&mac, &input, true).await;
            if result.is_ok() {
                controller.trigger_router_refresh().await;
            }
            controller.invalidate(&QueryKey::devices());
            result.map(|()| CommandResult::Ok)
        }
        Command::PatchDevice { mac, input } => {
            let result = controller.mutate_device(&mac, &input, false).await;
            controller.invalidate(&QueryKey::devices());
            result.map(|()| CommandResult::Ok)
        }
        Command::RegisterDevices { items } => {
            let mut succeeded = Vec::new();
            let mut failed = Vec::new();
            for (mac, input) in items {
                match controller.mutate_device(&mac, &input, true).await {
                    Ok(()) => succeeded.push(mac),
                    Err(e) => failed.push((mac, e.to_string())),
                }
            }
            if !succeeded.is_empty() {
                controller.trigger_router_refresh().await;
            }
            controller.invalidate(&QueryKey::devices());
            info!(
                succeeded = succeeded.len(),
                failed = failed.len(),
                "bulk registration finished"
            );
            Ok(CommandResult::Bulk { succeeded, failed })
        }
        Command::RefreshDevices => {
            let result = client.refresh_devices().await;
            controller.invalidate(&QueryKey::devices());
            result?;
            Ok(CommandResult::Ok)
        }

        // ── Capability state ─────────────────────────────────────
        Command::SetDeviceCapability {
            mac,
            capability_id,
            patch,
        } => {
            patch.validate()?;
            let key = QueryKey::device_capabilities(&mac);
            let result = controller
                .optimistic(
                    &cache.device_capabilities,
                    &key,
                    |list| predict_capabilities(list, &capability_id, &patch),
                    client.patch_device_capability(&mac, &capability_id, &patch),
                )
                .await;
            cache.invalidate(&key);
            controller.invalidate(&QueryKey::device_detail(&mac));
            result.map(CommandResult::StateChanged)
        }
        Command::SetAssignment {
            capability_id,
            device_id,
            patch,
        } => {
            patch.validate()?;
            let key = QueryKey::assignments(&capability_id);
            let result = controller
                .optimistic(
                    &cache.assignments,
                    &key,
                    |list| predict_assignments(list, &device_id, &patch),
                    client.patch_capability_device(&capability_id, &device_id, &patch),
                )
                .await;
            cache.invalidate(&key);
            controller.invalidate(&QueryKey::device_capabilities(&device_id));
            result.map(CommandResult::StateChanged)
        }
        Command::SetGlobalCapability {
            capability_id,
            patch,
        } => {
            patch.validate()?;
            let key = QueryKey::global_capabilities();
            let result = controller
                .optimistic(
                    &cache.global_capabilities,
                    &key,
                    |list| predict_capabilities(list, &capability_id, &patch),
                    client.patch_global_capability(&capability_id, &patch),
                )
                .await;
            controller.invalidate(&key);
            result.map(CommandResult::StateChanged)
        }

        // ── Capability templates ─────────────────────────────────
        Command::SaveCapability {
            original_id,
            template,
        } => {
            let saved = match &original_id {
                None => client.create_capability(&template).await?,
                Some(id) => client.update_capability(id, &template).await?,
            };
            let id = original_id.unwrap_or_else(|| template.id.clone());
            cache.invalidate(&QueryKey::capabilities_lists());
            cache.invalidate(&QueryKey::capability(&id));
            controller.invalidate(&QueryKey::global_capabilities());
            cache
                .capability_detail
                .set_data(&QueryKey::capability(&saved.id), Arc::new(saved.clone()));
            info!(id = %saved.id, "capability saved");
            Ok(CommandResult::Capability(Box::new(saved)))
        }
        Command::DeleteCapability { id } => {
            client.delete_capability(&id).await?;
            cache.invalidate(&QueryKey::capabilities_lists());
            cache.invalidate(&QueryKey::capability(&id));
            cache.invalidate(&QueryKey::assignments(&id));
            controller.invalidate(&QueryKey::global_capabilities());
            info!(%id, "capability deleted");
            Ok(CommandResult::Ok)
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &ClientConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        token: config.token.clone(),
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
