//! Application core: event loop, screen management and action dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Tabs},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use presence_core::editor::duplicate_template;
use presence_core::format::format_updated_ago;
use presence_core::{
    CapabilityEditor, CapabilityTemplate, Command, CommandResult, Controller, QueryKey, SubmitMode,
};

use crate::action::{Action, ConfirmAction, Notification, NotificationLevel, Resource};
use crate::component::Component;
use crate::data_bridge::{Subscription, spawn_data_bridge};
use crate::event::{Cadence, Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;
use crate::widgets::centered_rect;

const TOAST_TTL: Duration = Duration::from_secs(3);

/// Connection status as seen by the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    NotConfigured,
}

/// Top-level application state and event loop.
pub struct App {
    active_screen: ScreenId,
    /// Screens to return to on GoBack; only off-bar screens push here.
    history: Vec<ScreenId>,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    running: bool,
    connection_status: ConnectionStatus,
    last_success: Option<DateTime<Utc>>,
    paused: bool,
    /// Last device-list fetch error, shown in the stale-data banner.
    data_error: Option<String>,
    help_visible: bool,
    search_active: bool,
    search_query: String,
    terminal_size: (u16, u16),
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    controller: Controller,
    data_cancel: CancellationToken,
    subscription_tx: mpsc::UnboundedSender<Subscription>,
    subscription_rx: Option<mpsc::UnboundedReceiver<Subscription>>,
    /// Pending confirmation dialog (blocks other input while active).
    pending_confirm: Option<ConfirmAction>,
    notification: Option<(Notification, Instant)>,
}

impl App {
    pub fn new(controller: Controller, page_size: usize) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (subscription_tx, subscription_rx) = mpsc::unbounded_channel();

        Self {
            active_screen: ScreenId::Devices,
            history: Vec::new(),
            screens: create_screens(page_size).into_iter().collect(),
            running: true,
            connection_status: ConnectionStatus::default(),
            last_success: None,
            paused: false,
            data_error: None,
            help_visible: false,
            search_active: false,
            search_query: String::new(),
            terminal_size: (0, 0),
            action_tx,
            action_rx,
            controller,
            data_cancel: CancellationToken::new(),
            subscription_tx,
            subscription_rx: Some(subscription_rx),
            pending_confirm: None,
            notification: None,
        }
    }

    fn init_screens(&mut self) -> Result<()> {
        for screen in self.screens.values_mut() {
            screen.init(self.action_tx.clone())?;
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        Ok(())
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::start()?;
        self.terminal_size = tui.size().unwrap_or((80, 24));
        self.init_screens()?;

        if let Some(subscriptions) = self.subscription_rx.take() {
            let controller = self.controller.clone();
            let cancel = self.data_cancel.clone();
            let tx = self.action_tx.clone();
            tokio::spawn(async move {
                spawn_data_bridge(controller, tx, subscriptions, cancel).await;
            });
        }

        let mut events = EventReader::spawn(Cadence::default());

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(action) = self.handle_mouse_event(mouse)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Paste(text) => {
                    for action in self.handle_paste(&text)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.data_cancel.cancel();
        events.stop();
        tui.stop();
        info!("TUI event loop ended");
        Ok(())
    }

    fn active(&self) -> Option<&dyn Component> {
        self.screens.get(&self.active_screen).map(Box::as_ref)
    }

    /// Map a key event to an action. Global keys are handled here;
    /// screen-specific keys go to the active screen.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        if self.pending_confirm.is_some() {
            return match key.code {
                KeyCode::Char('y' | 'Y') => Ok(Some(Action::ConfirmYes)),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => Ok(Some(Action::ConfirmNo)),
                _ => Ok(None),
            };
        }

        // Drawers, overlays and the editor own every key
        let captured = self.active_screen.is_modal()
            || self.active().is_some_and(Component::captures_input);
        if captured {
            if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                return screen.handle_key_event(key);
            }
            return Ok(None);
        }

        if self.search_active {
            return match key.code {
                KeyCode::Esc => {
                    self.search_query.clear();
                    Ok(Some(Action::CloseSearch))
                }
                KeyCode::Enter => Ok(Some(Action::SearchSubmit)),
                KeyCode::Backspace => {
                    self.search_query.pop();
                    Ok(Some(Action::SearchInput(self.search_query.clone())))
                }
                KeyCode::Char(c) => {
                    self.search_query.push(c);
                    Ok(Some(Action::SearchInput(self.search_query.clone())))
                }
                _ => Ok(None),
            };
        }

        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),
            (KeyModifiers::NONE, KeyCode::Char('/')) => return Ok(Some(Action::OpenSearch)),
            (KeyModifiers::NONE, KeyCode::Char('r')) => return Ok(Some(Action::Refresh)),
            (KeyModifiers::NONE, KeyCode::Char('p')) => return Ok(Some(Action::TogglePause)),

            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='4')) => {
                let screen = c
                    .to_digit(10)
                    .and_then(|n| u8::try_from(n).ok())
                    .and_then(ScreenId::from_number);
                if let Some(screen) = screen {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }

            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            (KeyModifiers::SHIFT, KeyCode::BackTab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }

            (KeyModifiers::NONE, KeyCode::Esc) => return Ok(Some(Action::GoBack)),

            _ => {}
        }

        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }
        Ok(None)
    }

    /// Pasted text goes to the search prompt or, char by char, to a screen
    /// that owns the keyboard. Line breaks are dropped since every input
    /// is single-line.
    fn handle_paste(&mut self, text: &str) -> Result<Vec<Action>> {
        if self.pending_confirm.is_some() || self.help_visible {
            return Ok(Vec::new());
        }
        let chars = text.chars().filter(|c| !c.is_control());

        let captured = self.active_screen.is_modal()
            || self.active().is_some_and(Component::captures_input);
        if captured {
            let Some(screen) = self.screens.get_mut(&self.active_screen) else {
                return Ok(Vec::new());
            };
            let mut actions = Vec::new();
            for c in chars {
                actions.extend(screen.handle_key_event(KeyEvent::new(
                    KeyCode::Char(c),
                    KeyModifiers::NONE,
                ))?);
            }
            return Ok(actions);
        }

        if self.search_active {
            self.search_query.extend(chars);
            return Ok(vec![Action::SearchInput(self.search_query.clone())]);
        }
        Ok(Vec::new())
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if self.pending_confirm.is_some() || self.help_visible {
            return Ok(None);
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_mouse_event(mouse);
        }
        Ok(None)
    }

    // ── Screen management ─────────────────────────────────────────

    fn focus(&mut self, target: ScreenId) {
        if target == self.active_screen {
            return;
        }
        debug!("switching screen: {} → {}", self.active_screen, target);
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(false);
        }
        self.active_screen = target;
        if let Some(screen) = self.screens.get_mut(&target) {
            screen.set_focused(true);
        }
    }

    /// Tab-bar screens reset the history; off-bar screens stack on it.
    fn switch_to(&mut self, target: ScreenId) {
        if target == self.active_screen {
            return;
        }
        if target.number() == 0 {
            self.history.push(self.active_screen);
        } else {
            self.history.clear();
        }
        self.focus(target);
    }

    fn go_back(&mut self) {
        if let Some(prev) = self.history.pop() {
            self.focus(prev);
        }
    }

    fn send_to(&mut self, id: ScreenId, action: &Action) -> Result<()> {
        if let Some(screen) = self.screens.get_mut(&id) {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    fn broadcast(&mut self, action: &Action) -> Result<()> {
        for screen in self.screens.values_mut() {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    fn subscribe(&self, subscription: Subscription) {
        if self.subscription_tx.send(subscription).is_err() {
            warn!("data bridge is gone; subscription dropped");
        }
    }

    fn notify(&self, notification: Notification) {
        let _ = self.action_tx.send(Action::Notify(notification));
    }

    /// Apply one action to app state and route it to the screens.
    #[allow(clippy::too_many_lines)]
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::Resize(w, h) => self.terminal_size = (*w, *h),

            Action::SwitchScreen(target) => self.switch_to(*target),

            Action::GoBack => self.go_back(),

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::OpenSearch => {
                self.search_active = true;
                self.search_query.clear();
            }

            Action::CloseSearch => {
                self.search_active = false;
                self.search_query.clear();
                self.send_to(self.active_screen, action)?;
            }

            Action::SearchSubmit => {
                self.search_active = false;
                self.send_to(self.active_screen, action)?;
            }

            // ── Connection ────────────────────────────────────────
            Action::Connected => self.connection_status = ConnectionStatus::Connected,
            Action::Disconnected(reason) => {
                debug!(%reason, "disconnected");
                self.connection_status = ConnectionStatus::Disconnected;
            }
            Action::Reconnecting => self.connection_status = ConnectionStatus::Reconnecting,
            Action::NotConfigured => self.connection_status = ConnectionStatus::NotConfigured,
            Action::LastSuccess(at) => self.last_success = *at,
            Action::PausedChanged(paused) => self.paused = *paused,

            Action::TogglePause => {
                let paused = self.controller.toggle_pause();
                self.notify(Notification::info(if paused {
                    "Device list updates paused"
                } else {
                    "Device list updates resumed"
                }));
            }

            Action::Refresh => {
                self.controller.invalidate(&QueryKey::devices());
                self.controller.invalidate(&QueryKey::automation());
                self.broadcast(action)?;
            }

            Action::Tick => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, created)| created.elapsed() > TOAST_TTL)
                {
                    self.notification = None;
                }
                self.send_to(self.active_screen, action)?;
            }

            Action::Render => {}

            // Data updates go to ALL screens so they stay in sync
            Action::DevicesUpdated(_)
            | Action::DeviceUpdated(_)
            | Action::DeviceCapabilitiesUpdated { .. }
            | Action::GlobalCapabilitiesUpdated(_)
            | Action::AssignmentsUpdated { .. }
            | Action::CapabilitiesLoaded { .. }
            | Action::PrimitivesLoaded { .. }
            | Action::CapabilitySaved(_)
            | Action::CapabilityDeleted(_) => self.broadcast(action)?,

            Action::DataError(error) => {
                self.data_error.clone_from(error);
                self.broadcast(action)?;
            }

            // ── Subscriptions & loads ─────────────────────────────
            Action::FocusDevice(mac) => self.subscribe(Subscription::Device(mac.clone())),
            Action::Load(resource) => self.load(resource.clone()),

            // ── Device commands ───────────────────────────────────
            Action::SubmitDevice { mac, input, mode } => {
                let (cmd, verb) = match mode {
                    SubmitMode::Register => (
                        Command::RegisterDevice {
                            mac: mac.clone(),
                            input: input.clone(),
                        },
                        "Registered",
                    ),
                    SubmitMode::Save => (
                        Command::PatchDevice {
                            mac: mac.clone(),
                            input: input.clone(),
                        },
                        "Saved",
                    ),
                };
                let name = input.name.clone().unwrap_or_else(|| mac.clone());
                self.execute_command(cmd, format!("{verb} {name}"));
            }

            Action::RequestBulkRegister(items) => {
                if items.is_empty() {
                    self.notify(Notification::info("No unregistered devices to register"));
                } else {
                    self.action_tx
                        .send(Action::ShowConfirm(ConfirmAction::RegisterDevices {
                            items: items.clone(),
                        }))?;
                }
            }

            Action::RefreshRouter => {
                self.execute_command(Command::RefreshDevices, "Refreshing devices from the router".into());
            }

            Action::SetDeviceCapability {
                mac,
                capability_id,
                patch,
            } => self.execute_state_change(
                Command::SetDeviceCapability {
                    mac: mac.clone(),
                    capability_id: capability_id.clone(),
                    patch: patch.clone(),
                },
                None,
            ),

            Action::SetGlobalCapability {
                capability_id,
                patch,
            } => self.execute_state_change(
                Command::SetGlobalCapability {
                    capability_id: capability_id.clone(),
                    patch: patch.clone(),
                },
                None,
            ),

            Action::SetAssignment {
                capability_id,
                device_id,
                patch,
            } => self.execute_state_change(
                Command::SetAssignment {
                    capability_id: capability_id.clone(),
                    device_id: device_id.clone(),
                    patch: patch.clone(),
                },
                Some(capability_id.clone()),
            ),

            // ── Capability commands ───────────────────────────────
            Action::RequestDeleteCapability { id, label } => {
                self.action_tx
                    .send(Action::ShowConfirm(ConfirmAction::DeleteCapability {
                        id: id.clone(),
                        label: label.clone(),
                    }))?;
            }

            Action::DuplicateCapability(template) => self.duplicate(template),

            Action::OpenAssignments { id, .. } => {
                self.send_to(ScreenId::Assignments, action)?;
                self.switch_to(ScreenId::Assignments);
                self.subscribe(Subscription::Assignments(Some(id.clone())));
            }

            // ── Editor ────────────────────────────────────────────
            Action::OpenEditor(id) => {
                self.switch_to(ScreenId::Editor);
                self.open_editor(id.clone());
            }

            Action::EditorLoaded(_) | Action::EditorFailed(_) => {
                self.send_to(ScreenId::Editor, action)?;
            }

            Action::SaveCapability(editor) => self.save_capability((**editor).clone()),

            Action::CloseEditor => {
                self.send_to(ScreenId::Editor, action)?;
                if self.active_screen == ScreenId::Editor {
                    self.go_back();
                }
            }

            // ── Confirm dialog ────────────────────────────────────
            Action::ShowConfirm(confirm) => self.pending_confirm = Some(confirm.clone()),

            Action::ConfirmYes => {
                if let Some(confirm) = self.pending_confirm.take() {
                    self.execute_confirm(confirm);
                }
            }

            Action::ConfirmNo => self.pending_confirm = None,

            // ── Notifications ─────────────────────────────────────
            Action::Notify(n) => self.notification = Some((n.clone(), Instant::now())),

            // Everything else goes to the active screen only
            other => self.send_to(self.active_screen, other)?,
        }

        Ok(())
    }

    // ── Controller calls ──────────────────────────────────────────

    /// Spawn a command execution task. Sends a Notify action on completion.
    fn execute_command(&self, cmd: Command, success_msg: String) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match controller.execute(cmd).await {
                Ok(_) => {
                    let _ = tx.send(Action::Notify(Notification::success(success_msg)));
                }
                Err(e) => {
                    warn!(error = %e, "command execution failed");
                    let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                }
            }
        });
    }

    /// State changes are silent on success; action warnings become a toast.
    fn execute_state_change(&self, cmd: Command, refetch_assignments: Option<String>) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match controller.execute(cmd).await {
                Ok(CommandResult::StateChanged(result)) => {
                    if let Some(n) = Notification::from_warnings(&result.warnings) {
                        let _ = tx.send(Action::Notify(n));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "state change failed");
                    let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                }
            }
            if let Some(id) = refetch_assignments {
                if let Err(e) = controller.assignments(&id, false).await {
                    debug!(error = %e, "assignments refetch failed");
                }
            }
        });
    }

    fn execute_confirm(&self, confirm: ConfirmAction) {
        match confirm {
            ConfirmAction::RegisterDevices { items } => {
                let controller = self.controller.clone();
                let tx = self.action_tx.clone();
                tokio::spawn(async move {
                    let n = match controller.execute(Command::RegisterDevices { items }).await {
                        Ok(CommandResult::Bulk { succeeded, failed }) => {
                            bulk_notification(&succeeded, &failed)
                        }
                        Ok(_) => Notification::success("Registered devices"),
                        Err(e) => Notification::error(e.to_string()),
                    };
                    let _ = tx.send(Action::Notify(n));
                });
            }
            ConfirmAction::DeleteCapability { id, label } => {
                let controller = self.controller.clone();
                let tx = self.action_tx.clone();
                tokio::spawn(async move {
                    match controller
                        .execute(Command::DeleteCapability { id: id.clone() })
                        .await
                    {
                        Ok(_) => {
                            let _ = tx.send(Action::Notify(Notification::success(format!(
                                "Deleted {label}"
                            ))));
                            let _ = tx.send(Action::CapabilityDeleted(id));
                        }
                        Err(e) => {
                            warn!(error = %e, "delete failed");
                            let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                        }
                    }
                });
            }
            ConfirmAction::DiscardEdits => {
                let _ = self.action_tx.send(Action::CloseEditor);
            }
        }
    }

    fn load(&self, resource: Resource) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let outcome = match resource {
                Resource::Capabilities(params) => controller
                    .capabilities(&params, false)
                    .await
                    .map(|capabilities| Action::CapabilitiesLoaded {
                        params,
                        capabilities,
                    }),
                Resource::Primitives => {
                    let (actions, sources) = tokio::join!(
                        controller.action_types(false),
                        controller.state_source_types(false),
                    );
                    actions.and_then(|action_types| {
                        sources.map(|source_types| Action::PrimitivesLoaded {
                            action_types,
                            source_types,
                        })
                    })
                }
            };
            match outcome {
                Ok(action) => {
                    let _ = tx.send(action);
                }
                Err(e) => {
                    warn!(error = %e, "load failed");
                    let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                }
            }
        });
    }

    fn open_editor(&self, id: Option<String>) {
        let Some(id) = id else {
            let _ = self
                .action_tx
                .send(Action::EditorLoaded(Box::new(CapabilityEditor::create())));
            return;
        };
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match controller.capability(&id, true).await {
                Ok(template) => {
                    let editor = CapabilityEditor::edit((*template).clone());
                    let _ = tx.send(Action::EditorLoaded(Box::new(editor)));
                }
                Err(e) => {
                    warn!(error = %e, id, "failed to load capability");
                    let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                    let _ = tx.send(Action::CloseEditor);
                }
            }
        });
    }

    fn save_capability(&self, editor: CapabilityEditor) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match controller.save_capability(&editor).await {
                Ok(saved) => {
                    let _ = tx.send(Action::Notify(Notification::success(format!(
                        "Saved {}",
                        saved.label
                    ))));
                    let _ = tx.send(Action::CapabilitySaved(Box::new(saved)));
                }
                Err(e) => {
                    warn!(error = %e, "save failed");
                    let _ = tx.send(Action::EditorFailed(e.to_string()));
                }
            }
        });
    }

    /// Save a copy under a fresh id, then open it in the editor.
    fn duplicate(&self, template: &CapabilityTemplate) {
        let copy = duplicate_template(template, Utc::now());
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let cmd = Command::SaveCapability {
                original_id: None,
                template: Box::new(copy),
            };
            match controller.execute(cmd).await {
                Ok(CommandResult::Capability(saved)) => {
                    let id = saved.id.clone();
                    let _ = tx.send(Action::Notify(Notification::success(format!(
                        "Duplicated as {}",
                        saved.label
                    ))));
                    let _ = tx.send(Action::CapabilitySaved(saved));
                    let _ = tx.send(Action::OpenEditor(Some(id)));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "duplicate failed");
                    let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                }
            }
        });
    }

    // ── Rendering ─────────────────────────────────────────────────

    fn show_stale_banner(&self) -> bool {
        self.data_error.is_some()
            || matches!(
                self.connection_status,
                ConnectionStatus::Disconnected | ConnectionStatus::NotConfigured
            )
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        if self.active_screen.is_modal() {
            if let Some(screen) = self.active() {
                screen.render(frame, area);
            }
        } else {
            let banner_height = u16::from(self.show_stale_banner());
            let layout = Layout::vertical([
                Constraint::Length(banner_height),
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

            if banner_height > 0 {
                self.render_banner(frame, layout[0]);
            }
            if let Some(screen) = self.active() {
                screen.render(frame, layout[1]);
            }
            self.render_tab_bar(frame, layout[2]);
            self.render_status_bar(frame, layout[3]);
        }

        if let Some((ref notif, _)) = self.notification {
            render_notification(frame, area, notif);
        }
        if let Some(ref confirm) = self.pending_confirm {
            render_confirm_dialog(frame, area, confirm);
        }
        if self.help_visible {
            render_help_overlay(frame, area);
        }
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect) {
        let reason = match (&self.data_error, self.connection_status) {
            (_, ConnectionStatus::NotConfigured) => "Add-on not configured".to_owned(),
            (Some(err), _) => err.clone(),
            (None, _) => "Connection lost".to_owned(),
        };
        let updated = format_updated_ago(self.last_success, Utc::now());
        let line = Line::from(vec![
            Span::styled(" ⚠ ", Style::default().fg(theme::ERROR_RED).add_modifier(Modifier::BOLD)),
            Span::styled(reason, Style::default().fg(theme::ERROR_RED)),
            Span::styled(format!(" · showing cached data · {updated} · "), theme::key_hint()),
            Span::styled("r", theme::key_hint_key()),
            Span::styled(" retry", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let narrow = self.terminal_size.0 < 80;
        let mut titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                let label = if narrow { id.label_short() } else { id.label() };
                Line::from(Span::styled(format!(" {} {label} ", id.number()), style))
            })
            .collect();
        if self.active_screen.number() == 0 {
            titles.push(Line::from(Span::styled(
                format!(" › {} ", self.active_screen.label()),
                theme::tab_active(),
            )));
        }

        let selected = ScreenId::ALL
            .iter()
            .position(|&s| s == self.active_screen)
            .unwrap_or(ScreenId::ALL.len());
        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(selected);
        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        if self.search_active {
            let line = Line::from(vec![
                Span::styled(" / ", Style::default().fg(theme::MAGENTA)),
                Span::styled(self.search_query.clone(), Style::default().fg(theme::TEAL)),
                Span::styled("█", Style::default().fg(theme::TEAL)),
                Span::styled("  Esc cancel  Enter submit", theme::key_hint()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            return;
        }

        let connection = match self.connection_status {
            ConnectionStatus::Connected => {
                Span::styled("● connected", Style::default().fg(theme::ONLINE_GREEN))
            }
            ConnectionStatus::Disconnected => {
                Span::styled("○ disconnected", Style::default().fg(theme::ERROR_RED))
            }
            ConnectionStatus::NotConfigured => {
                Span::styled("○ not configured", Style::default().fg(theme::ERROR_RED))
            }
            ConnectionStatus::Reconnecting => {
                Span::styled("◐ reconnecting", Style::default().fg(theme::AMBER))
            }
            ConnectionStatus::Connecting => {
                Span::styled("◐ connecting", Style::default().fg(theme::AMBER))
            }
        };

        let mut spans = vec![Span::raw(" "), connection];
        if self.paused {
            spans.push(Span::styled("  ⏸ paused", Style::default().fg(theme::AMBER)));
        }
        spans.push(Span::styled(
            format!(" │ {}", format_updated_ago(self.last_success, Utc::now())),
            theme::key_hint(),
        ));
        spans.push(Span::styled(
            " │ ? help  / search  r refresh  p pause  q quit",
            theme::key_hint(),
        ));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

/// Toast for the outcome of a bulk registration.
fn bulk_notification(succeeded: &[String], failed: &[(String, String)]) -> Notification {
    let plural = |n: usize| if n == 1 { "device" } else { "devices" };
    match failed {
        [] => Notification::success(format!(
            "Registered {} {}",
            succeeded.len(),
            plural(succeeded.len())
        )),
        [(mac, err), ..] if succeeded.is_empty() => Notification::error(format!(
            "Registration failed for {} {} ({mac}: {err})",
            failed.len(),
            plural(failed.len())
        )),
        [(mac, err), ..] => Notification::warning(format!(
            "Registered {}, {} failed ({mac}: {err})",
            succeeded.len(),
            failed.len()
        )),
    }
}

fn help_row(key: &str, label: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
        Span::styled(label.to_owned(), theme::key_hint()),
    ])
}

fn help_section(title: &'static str) -> [Line<'static>; 2] {
    [
        Line::from(Span::styled(
            format!("  {title}"),
            Style::default().fg(theme::TEAL),
        )),
        Line::from(Span::styled(
            format!("  {}", "─".repeat(title.chars().count())),
            theme::key_hint(),
        )),
    ]
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_area = centered_rect(area, 64, 34);
    frame.render_widget(Clear, help_area);
    frame.render_widget(
        Block::default().style(Style::default().bg(theme::BG_OVERLAY)),
        help_area,
    );

    let block = Block::default()
        .title(" Keyboard Shortcuts ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused());
    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let mut lines = Vec::new();
    lines.extend(help_section("Navigation"));
    lines.extend([
        help_row("1-4", "Jump to screen"),
        help_row("Tab", "Next screen"),
        help_row("j/k ↑/↓", "Move up/down"),
        help_row("g/G", "Top / bottom"),
        help_row("Ctrl+d/u", "Page down / up"),
        help_row("Enter", "Open / select"),
        help_row("Esc", "Back / close"),
    ]);
    lines.push(Line::default());
    lines.extend(help_section("Global"));
    lines.extend([
        help_row("/", "Search"),
        help_row("r", "Refresh now"),
        help_row("p", "Pause / resume device list updates"),
        help_row("?", "This help"),
        help_row("q", "Quit"),
    ]);
    lines.push(Line::default());
    lines.extend(help_section("Devices"));
    lines.extend([
        help_row("←/→", "Registration tab"),
        help_row("o s S", "Online filter, sort, direction"),
        help_row("f c", "Facet filters, clear filters"),
        help_row("v V", "Saved views, save current view"),
        help_row("Space B", "Mark, bulk register"),
        help_row("u", "Refresh from router"),
    ]);
    lines.push(Line::default());
    lines.extend(help_section("Capabilities"));
    lines.extend([
        help_row("n e", "New, edit"),
        help_row("y d", "Duplicate, delete"),
        help_row("a", "Device assignments"),
        help_row("Ctrl+s", "Save in the editor"),
    ]);
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "                         Esc or ? to close",
        theme::key_hint(),
    )));

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_confirm_dialog(frame: &mut Frame, area: Rect, confirm: &ConfirmAction) {
    let dialog_area = centered_rect(area, 60, 5);
    frame.render_widget(Clear, dialog_area);
    frame.render_widget(
        Block::default().style(Style::default().bg(theme::BG_OVERLAY)),
        dialog_area,
    );

    let block = Block::default()
        .title(" Confirm ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::AMBER));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let text = vec![
        Line::from(Span::styled(
            format!("  {confirm}"),
            Style::default().fg(theme::TEXT),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  y ", theme::key_hint_key()),
            Span::styled("confirm    ", theme::key_hint()),
            Span::styled("n ", theme::key_hint_key()),
            Span::styled("cancel", theme::key_hint()),
        ]),
    ];
    frame.render_widget(Paragraph::new(text), inner);
}

/// Notification toast in the bottom-right corner, above the status bar.
fn render_notification(frame: &mut Frame, area: Rect, notif: &Notification) {
    let msg_len = u16::try_from(notif.message.chars().count()).unwrap_or(u16::MAX);
    let width = msg_len.saturating_add(6).clamp(20, 72).min(area.width);
    let height = 3u16;

    let x = area.width.saturating_sub(width + 1);
    let y = area.height.saturating_sub(height + 2);
    let toast_area = Rect::new(area.x + x, area.y + y, width, height);

    let (border_color, icon) = match notif.level {
        NotificationLevel::Success => (theme::ONLINE_GREEN, "✓"),
        NotificationLevel::Error => (theme::ERROR_RED, "✗"),
        NotificationLevel::Warning => (theme::AMBER, "!"),
        NotificationLevel::Info => (theme::TEAL, "·"),
    };

    frame.render_widget(Clear, toast_area);
    frame.render_widget(
        Block::default().style(Style::default().bg(theme::BG_OVERLAY)),
        toast_area,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(toast_area);
    frame.render_widget(block, toast_area);

    let line = Line::from(vec![
        Span::styled(format!(" {icon} "), Style::default().fg(border_color)),
        Span::styled(notif.message.clone(), Style::default().fg(theme::TEXT)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}
