//! Devices screen: the presence table with registration tabs, facets,
//! saved views, bulk registration, and the device drawer.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;
use uuid::Uuid;

use presence_core::format::format_last_seen_label;
use presence_core::registration::bulk_registrations;
use presence_core::saved_views::SAVED_VIEWS_FILE;
use presence_core::table::PageItem;
use presence_core::{
    Device, DeviceFilter, DeviceList, DeviceListView, Facet, Pagination, RegistrationScope,
    SavedViews, SortColumn, SortDirection,
};

use crate::action::{Action, Notification};
use crate::component::Component;
use crate::debounce::Debounce;
use crate::screens::device_detail::DeviceDetail;
use crate::theme;
use crate::widgets::{
    centered_rect, cycle_index, key_hints, step_index, sub_tabs, text_field::TextField, truncate,
};

const SCOPES: [RegistrationScope; 4] = [
    RegistrationScope::All,
    RegistrationScope::New,
    RegistrationScope::Registered,
    RegistrationScope::Unregistered,
];

const SORT_COLUMNS: [SortColumn; 7] = [
    SortColumn::Name,
    SortColumn::Mac,
    SortColumn::Vendor,
    SortColumn::LastIp,
    SortColumn::LastSeen,
    SortColumn::Status,
    SortColumn::Online,
];

const FACETS: [Facet; 3] = [Facet::Vendor, Facet::Source, Facet::Subnet];

/// Pop-ups owned by the list; each captures all keys while open.
enum Overlay {
    None,
    Facets { facet: usize, value: usize },
    Views { index: usize },
    SaveView(TextField),
}

pub struct DevicesScreen {
    focused: bool,
    action_tx: Option<UnboundedSender<Action>>,
    devices: Arc<DeviceList>,
    filter: DeviceFilter,
    sort: Option<(SortColumn, SortDirection)>,
    view: DeviceListView,
    table_state: TableState,
    /// Macs marked for bulk registration.
    marked: BTreeSet<String>,
    search: Debounce<String>,
    overlay: Overlay,
    saved_views: SavedViews,
    detail: Option<DeviceDetail>,
    loaded: bool,
}

impl DevicesScreen {
    pub fn new(page_size: usize) -> Self {
        Self::with_views(
            page_size,
            SavedViews::load(presence_config::data_dir().join(SAVED_VIEWS_FILE)),
        )
    }

    fn with_views(page_size: usize, saved_views: SavedViews) -> Self {
        Self {
            focused: false,
            action_tx: None,
            devices: Arc::new(Vec::new()),
            filter: DeviceFilter::default(),
            sort: Some((SortColumn::Name, SortDirection::Asc)),
            view: DeviceListView {
                page: Pagination::new(page_size),
                ..DeviceListView::default()
            },
            table_state: TableState::default(),
            marked: BTreeSet::new(),
            search: Debounce::default(),
            overlay: Overlay::None,
            saved_views,
            detail: None,
            loaded: false,
        }
    }

    /// Re-run filter, sort, and paging; keep the cursor on the same device.
    fn rebuild(&mut self) {
        let keep = self.selected_device().map(|d| d.mac.clone());
        self.view = DeviceListView::build(&self.devices, &self.filter, self.sort, self.view.page);
        let rows = self.view.page_rows();
        let idx = keep
            .and_then(|mac| rows.iter().position(|d| d.mac == mac))
            .unwrap_or_else(|| self.table_state.selected().unwrap_or(0));
        self.table_state
            .select((!rows.is_empty()).then(|| idx.min(rows.len() - 1)));
    }

    /// Filter changes start from the first page.
    fn refilter(&mut self) {
        self.view.page.page_index = 0;
        self.table_state.select(Some(0));
        self.rebuild();
    }

    fn selected_device(&self) -> Option<&Arc<Device>> {
        self.view.page_rows().get(self.table_state.selected()?)
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.view.page_rows().len();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        self.table_state.select(Some(step_index(current, delta, len)));
    }

    fn cycle_scope(&mut self, forward: bool) {
        let idx = SCOPES
            .iter()
            .position(|s| *s == self.filter.registration)
            .unwrap_or(0);
        self.filter.registration = SCOPES[cycle_index(idx, forward, SCOPES.len())];
        self.refilter();
    }

    fn cycle_sort(&mut self) {
        let (column, direction) = self.sort.unwrap_or_default();
        let idx = SORT_COLUMNS.iter().position(|c| *c == column).unwrap_or(0);
        self.sort = Some((SORT_COLUMNS[cycle_index(idx, true, SORT_COLUMNS.len())], direction));
        self.rebuild();
    }

    fn flip_sort(&mut self) {
        let (column, direction) = self.sort.unwrap_or_default();
        self.sort = Some((column, direction.flip()));
        self.rebuild();
    }

    fn apply_search(&mut self, query: String) {
        if self.filter.search != query {
            self.filter.search = query;
            self.refilter();
        }
    }

    fn notify(&self, notification: Notification) {
        if let Some(tx) = &self.action_tx {
            let _ = tx.send(Action::Notify(notification));
        }
    }

    fn toggle_mark(&mut self) {
        if let Some(mac) = self.selected_device().map(|d| d.mac.clone()) {
            if !self.marked.remove(&mac) {
                self.marked.insert(mac);
            }
            self.move_selection(1);
        }
    }

    /// Register marked devices, or every filtered device when none are marked.
    fn bulk_register(&self) -> Option<Action> {
        let items = if self.marked.is_empty() {
            bulk_registrations(self.view.filtered.iter().map(|d| &**d))
        } else {
            bulk_registrations(
                self.devices
                    .iter()
                    .filter(|d| self.marked.contains(&d.mac))
                    .map(|d| &**d),
            )
        };
        if items.is_empty() {
            self.notify(Notification::info("No unregistered devices to register"));
            return None;
        }
        Some(Action::RequestBulkRegister(items))
    }

    fn open_detail(&mut self) -> Option<Action> {
        let device = Arc::clone(self.selected_device()?);
        let mac = device.mac.clone();
        self.detail = Some(DeviceDetail::new(device));
        Some(Action::FocusDevice(Some(mac)))
    }

    fn close_detail(&mut self) -> Action {
        self.detail = None;
        Action::FocusDevice(None)
    }

    // ── Overlay keys ─────────────────────────────────────────────────

    fn handle_facets_key(&mut self, key: KeyEvent, facet: usize, value: usize) {
        let options = self.view.facets.get(FACETS[facet]).to_vec();
        let (facet, value) = match key.code {
            KeyCode::Esc | KeyCode::Char('f' | 'q') => {
                self.overlay = Overlay::None;
                return;
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::BackTab => {
                (cycle_index(facet, false, FACETS.len()), 0)
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => {
                (cycle_index(facet, true, FACETS.len()), 0)
            }
            KeyCode::Down | KeyCode::Char('j') => (facet, step_index(value, 1, options.len())),
            KeyCode::Up | KeyCode::Char('k') => (facet, step_index(value, -1, options.len())),
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(v) = options.get(value) {
                    self.filter.toggle(FACETS[facet], v);
                    self.refilter();
                }
                (facet, value)
            }
            KeyCode::Char('c') => {
                self.filter.clear_facets();
                self.refilter();
                (facet, value)
            }
            _ => (facet, value),
        };
        self.overlay = Overlay::Facets { facet, value };
    }

    fn handle_views_key(&mut self, key: KeyEvent, index: usize) {
        let count = self.saved_views.views().len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('v' | 'q') => self.overlay = Overlay::None,
            KeyCode::Down | KeyCode::Char('j') => {
                self.overlay = Overlay::Views {
                    index: step_index(index, 1, count),
                };
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.overlay = Overlay::Views {
                    index: step_index(index, -1, count),
                };
            }
            KeyCode::Enter => {
                if let Some(view) = self.saved_views.views().get(index) {
                    self.filter = view.to_filter();
                    let name = view.name.clone();
                    self.search.cancel();
                    self.refilter();
                    self.notify(Notification::info(format!("Applied view {name}")));
                }
                self.overlay = Overlay::None;
            }
            KeyCode::Char('d') => {
                let id: Option<Uuid> = self.saved_views.views().get(index).map(|v| v.id);
                if let Some(id) = id {
                    if let Err(e) = self.saved_views.remove(id) {
                        warn!(error = %e, "failed to delete saved view");
                        self.notify(Notification::error(e.to_string()));
                    }
                }
                let count = self.saved_views.views().len();
                self.overlay = Overlay::Views {
                    index: step_index(index, 0, count),
                };
            }
            _ => {}
        }
    }

    fn handle_save_view_key(&mut self, key: KeyEvent, mut field: TextField) {
        match key.code {
            KeyCode::Esc => self.overlay = Overlay::None,
            KeyCode::Enter => {
                let name = field.value().trim().to_owned();
                let saved = if name.is_empty() {
                    self.saved_views.add(&self.filter).map(|v| v.name.clone())
                } else {
                    self.saved_views
                        .add_named(name, &self.filter)
                        .map(|v| v.name.clone())
                };
                match saved {
                    Ok(name) => self.notify(Notification::success(format!("Saved view {name}"))),
                    Err(e) => {
                        warn!(error = %e, "failed to save view");
                        self.notify(Notification::error(e.to_string()));
                    }
                }
                self.overlay = Overlay::None;
            }
            _ => {
                field.handle_key(key);
                self.overlay = Overlay::SaveView(field);
            }
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render_list(&self, frame: &mut Frame, area: Rect) {
        let shown = self.view.filtered.len();
        let total = self.devices.len();
        let mut title = format!(" Devices ({shown}/{total}) ");
        if !self.marked.is_empty() {
            title = format!(" Devices ({shown}/{total}) · {} marked ", self.marked.len());
        }
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused && self.detail.is_none() {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = Layout::vertical([
            Constraint::Length(1), // registration tabs
            Constraint::Length(1), // summary + active filters
            Constraint::Min(1),    // table
            Constraint::Length(1), // pager
            Constraint::Length(1), // hints
        ])
        .split(inner);

        let summary = &self.view.summary;
        let labels = [
            format!("All {}", summary.total),
            format!("New {}", summary.new),
            format!("Registered {}", summary.registered),
            format!("Unregistered {}", summary.unregistered),
        ];
        let active = SCOPES
            .iter()
            .position(|s| *s == self.filter.registration)
            .unwrap_or(0);
        frame.render_widget(
            Paragraph::new(sub_tabs::render_sub_tabs(&labels, active)),
            layout[0],
        );

        frame.render_widget(Paragraph::new(self.filter_line()), layout[1]);

        if !self.loaded {
            frame.render_widget(
                Paragraph::new(Span::styled("  Loading devices…", theme::key_hint())),
                layout[2],
            );
        } else if self.view.filtered.is_empty() {
            let msg = if self.devices.is_empty() {
                "  No devices seen yet."
            } else {
                "  No devices match the current filters. Press c to clear facets."
            };
            frame.render_widget(
                Paragraph::new(Span::styled(msg, theme::key_hint())),
                layout[2],
            );
        } else {
            self.render_table(frame, layout[2]);
        }

        frame.render_widget(Paragraph::new(self.pager_line()), layout[3]);

        let hints = key_hints(&[
            ("j/k", "move"),
            ("←/→", "tab"),
            ("Enter", "open"),
            ("Space", "mark"),
            ("B", "register"),
            ("o", "online"),
            ("s/S", "sort"),
            ("f", "facets"),
            ("v/V", "views"),
            ("u", "router refresh"),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[4]);
    }

    fn filter_line(&self) -> Line<'static> {
        let summary = &self.view.summary;
        let mut spans = vec![
            Span::styled(" ● ", Style::default().fg(theme::ONLINE_GREEN)),
            Span::styled(format!("{} online  ", summary.online), theme::value()),
            Span::styled("○ ", theme::key_hint()),
            Span::styled(format!("{} offline", summary.offline), theme::value()),
            Span::styled("  │ presence: ", theme::key_hint()),
            Span::styled(self.filter.online.to_string(), theme::key_hint_key()),
        ];
        if let Some((column, direction)) = self.sort {
            let arrow = match direction {
                SortDirection::Asc => "↑",
                SortDirection::Desc => "↓",
            };
            spans.push(Span::styled("  sort: ", theme::key_hint()));
            spans.push(Span::styled(format!("{column} {arrow}"), theme::key_hint_key()));
        }
        for facet in FACETS {
            let selected = self.filter.selected(facet);
            if !selected.is_empty() {
                spans.push(Span::styled(format!("  {facet}: "), theme::key_hint()));
                spans.push(Span::styled(
                    truncate(&selected.join(", "), 24),
                    Style::default().fg(theme::MAGENTA),
                ));
            }
        }
        if !self.filter.search.is_empty() {
            spans.push(Span::styled("  search: ", theme::key_hint()));
            spans.push(Span::styled(
                format!("\"{}\"", self.filter.search),
                Style::default().fg(theme::AMBER),
            ));
        }
        Line::from(spans)
    }

    fn pager_line(&self) -> Line<'static> {
        let current = self.view.page.page_index;
        let mut spans = vec![Span::styled(" [ ", theme::key_hint_key())];
        for item in self.view.page_items() {
            match item {
                PageItem::Page(p) if p == current => spans.push(Span::styled(
                    format!(" {} ", p + 1),
                    theme::tab_active().add_modifier(Modifier::REVERSED),
                )),
                PageItem::Page(p) => {
                    spans.push(Span::styled(format!(" {} ", p + 1), theme::tab_inactive()));
                }
                PageItem::Ellipsis => spans.push(Span::styled(" … ", theme::key_hint())),
            }
        }
        spans.push(Span::styled(" ]", theme::key_hint_key()));
        Line::from(spans)
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let wide = area.width >= 110;
        let now = Utc::now();
        let sorted = self.sort.map(|(c, _)| c);
        let header_cell = |label: &'static str, column: Option<SortColumn>| {
            let style = if column.is_some() && column == sorted {
                theme::table_header().fg(theme::ACCENT)
            } else {
                theme::table_header()
            };
            Cell::from(label).style(style)
        };

        let mut header = vec![
            header_cell("", None),
            header_cell("Name", Some(SortColumn::Name)),
            header_cell("MAC", Some(SortColumn::Mac)),
        ];
        if wide {
            header.push(header_cell("Vendor", Some(SortColumn::Vendor)));
        }
        header.push(header_cell("IP", Some(SortColumn::LastIp)));
        header.push(header_cell("Last seen", Some(SortColumn::LastSeen)));
        header.push(header_cell("Status", Some(SortColumn::Status)));

        let selected_idx = self.table_state.selected();
        let rows: Vec<Row> = self
            .view
            .page_rows()
            .iter()
            .enumerate()
            .map(|(i, device)| {
                let mark = if self.marked.contains(&device.mac) { "✓" } else { " " };
                let dot = if device.online { "●" } else { "○" };
                let name = if device.name.is_empty() {
                    "(unnamed)".to_owned()
                } else {
                    device.name.clone()
                };
                let name_style = if Some(i) == selected_idx {
                    Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD)
                } else {
                    theme::value()
                };

                let mut cells = vec![
                    Cell::from(format!("{mark}{dot}")).style(theme::online(device.online)),
                    Cell::from(name).style(name_style),
                    Cell::from(device.mac.clone()).style(theme::key_hint()),
                ];
                if wide {
                    cells.push(Cell::from(device.vendor.clone()).style(theme::value()));
                }
                cells.push(
                    Cell::from(device.last_ip.clone().unwrap_or_else(|| "─".into()))
                        .style(Style::default().fg(theme::TEAL)),
                );
                cells.push(
                    Cell::from(format_last_seen_label(device.online, device.last_seen_at, now))
                        .style(theme::online(device.online)),
                );
                cells.push(
                    Cell::from(device.status.to_string())
                        .style(theme::status(device.is_registered())),
                );
                Row::new(cells).style(theme::table_row())
            })
            .collect();

        let mut widths = vec![
            Constraint::Length(2),
            Constraint::Fill(2),
            Constraint::Length(17),
        ];
        if wide {
            widths.push(Constraint::Fill(1));
        }
        widths.extend([
            Constraint::Length(15),
            Constraint::Length(11),
            Constraint::Length(10),
        ]);

        let table = Table::new(rows, widths)
            .header(Row::new(header))
            .row_highlight_style(theme::table_selected());

        let mut state = self.table_state;
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_overlay(&self, frame: &mut Frame, area: Rect) {
        match &self.overlay {
            Overlay::None => {}
            Overlay::Facets { facet, value } => self.render_facets(frame, area, *facet, *value),
            Overlay::Views { index } => self.render_views(frame, area, *index),
            Overlay::SaveView(field) => {
                let popup = centered_rect(area, 50, 5);
                frame.render_widget(Clear, popup);
                let block = overlay_block(" Save view ");
                let inner = block.inner(popup);
                frame.render_widget(block, popup);
                let rows = Layout::vertical([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
                    .split(inner);
                field.render(frame, rows[0], "Name", true);
                frame.render_widget(
                    Paragraph::new(key_hints(&[("Enter", "save"), ("Esc", "cancel")])),
                    rows[2],
                );
            }
        }
    }

    fn render_facets(&self, frame: &mut Frame, area: Rect, facet: usize, value: usize) {
        let popup = centered_rect(area, 56, 18);
        frame.render_widget(Clear, popup);
        let block = overlay_block(" Facets ");
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

        let labels: Vec<String> = FACETS
            .iter()
            .map(|f| {
                let n = self.filter.selected(*f).len();
                if n == 0 {
                    f.to_string()
                } else {
                    format!("{f} ({n})")
                }
            })
            .collect();
        frame.render_widget(
            Paragraph::new(sub_tabs::render_sub_tabs(&labels, facet)),
            layout[0],
        );

        let selected = self.filter.selected(FACETS[facet]);
        let options = self.view.facets.get(FACETS[facet]);
        let visible = usize::from(layout[2].height).max(1);
        let offset = value.saturating_sub(visible - 1);
        let lines: Vec<Line> = options
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(i, option)| {
                let checked = if selected.contains(option) { "[x]" } else { "[ ]" };
                let style = if i == value {
                    theme::table_selected()
                } else {
                    theme::value()
                };
                Line::from(Span::styled(format!(" {checked} {option}"), style))
            })
            .collect();
        if lines.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(" No values", theme::key_hint())),
                layout[2],
            );
        } else {
            frame.render_widget(Paragraph::new(lines), layout[2]);
        }

        frame.render_widget(
            Paragraph::new(key_hints(&[
                ("←/→", "facet"),
                ("Space", "toggle"),
                ("c", "clear"),
                ("Esc", "close"),
            ])),
            layout[3],
        );
    }

    fn render_views(&self, frame: &mut Frame, area: Rect, index: usize) {
        let popup = centered_rect(area, 60, 16);
        frame.render_widget(Clear, popup);
        let block = overlay_block(" Saved views ");
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let layout = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);
        let views = self.saved_views.views();
        if views.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    " No saved views. Press V on the list to save one.",
                    theme::key_hint(),
                )),
                layout[0],
            );
        } else {
            let lines: Vec<Line> = views
                .iter()
                .enumerate()
                .map(|(i, view)| {
                    let style = if i == index {
                        theme::table_selected()
                    } else {
                        theme::value()
                    };
                    let detail = format!(
                        "{} · {}{}",
                        view.registration_scope,
                        view.online_scope,
                        if view.search.is_empty() {
                            String::new()
                        } else {
                            format!(" · \"{}\"", view.search)
                        }
                    );
                    Line::from(vec![
                        Span::styled(format!(" {:<24}", truncate(&view.name, 24)), style),
                        Span::styled(detail, theme::key_hint()),
                    ])
                })
                .collect();
            frame.render_widget(Paragraph::new(lines), layout[0]);
        }
        frame.render_widget(
            Paragraph::new(key_hints(&[("Enter", "apply"), ("d", "delete"), ("Esc", "close")])),
            layout[1],
        );
    }
}

fn overlay_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
        .style(Style::default().bg(theme::BG_OVERLAY))
}

impl Component for DevicesScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match std::mem::replace(&mut self.overlay, Overlay::None) {
            Overlay::None => {}
            Overlay::Facets { facet, value } => {
                self.handle_facets_key(key, facet, value);
                return Ok(None);
            }
            Overlay::Views { index } => {
                self.handle_views_key(key, index);
                return Ok(None);
            }
            Overlay::SaveView(field) => {
                self.handle_save_view_key(key, field);
                return Ok(None);
            }
        }

        if let Some(detail) = &mut self.detail {
            if key.code == KeyCode::Esc {
                return Ok(Some(self.close_detail()));
            }
            return Ok(detail.handle_key(key));
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('d') if ctrl => self.move_selection(10),
            KeyCode::Char('u') if ctrl => self.move_selection(-10),
            KeyCode::Char('g') => self.table_state.select(Some(0)),
            KeyCode::Char('G') => {
                let len = self.view.page_rows().len();
                self.table_state.select(Some(len.saturating_sub(1)));
            }
            KeyCode::Char('h') | KeyCode::Left => self.cycle_scope(false),
            KeyCode::Char('l') | KeyCode::Right => self.cycle_scope(true),
            KeyCode::Char('o') => {
                self.filter.online = self.filter.online.next();
                self.refilter();
            }
            KeyCode::Char('s') => self.cycle_sort(),
            KeyCode::Char('S') => self.flip_sort(),
            KeyCode::Char(']') => {
                self.view.page.next(self.view.filtered.len());
                self.table_state.select(Some(0));
                self.rebuild();
            }
            KeyCode::Char('[') => {
                self.view.page.prev();
                self.table_state.select(Some(0));
                self.rebuild();
            }
            KeyCode::Char('f') => self.overlay = Overlay::Facets { facet: 0, value: 0 },
            KeyCode::Char('c') => {
                self.filter.clear_facets();
                self.refilter();
            }
            KeyCode::Char('v') => self.overlay = Overlay::Views { index: 0 },
            KeyCode::Char('V') => self.overlay = Overlay::SaveView(TextField::default()),
            KeyCode::Char(' ') => self.toggle_mark(),
            KeyCode::Char('x') => self.marked.clear(),
            KeyCode::Char('B') => return Ok(self.bulk_register()),
            KeyCode::Char('u') => return Ok(Some(Action::RefreshRouter)),
            KeyCode::Enter => return Ok(self.open_detail()),
            _ => {}
        }
        Ok(None)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if self.detail.is_none() && matches!(self.overlay, Overlay::None) {
            match mouse.kind {
                MouseEventKind::ScrollDown => self.move_selection(1),
                MouseEventKind::ScrollUp => self.move_selection(-1),
                _ => {}
            }
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::DevicesUpdated(list) => {
                self.devices = Arc::clone(list);
                self.loaded = true;
                self.marked
                    .retain(|mac| list.iter().any(|d| &d.mac == mac));
                self.rebuild();
                if let Some(detail) = &mut self.detail {
                    if let Some(device) = list.iter().find(|d| d.mac == detail.mac()) {
                        detail.set_device(Arc::clone(device));
                    }
                }
            }
            Action::DeviceUpdated(device) => {
                if let Some(detail) = &mut self.detail {
                    detail.set_device(Arc::clone(device));
                }
            }
            Action::DeviceCapabilitiesUpdated { mac, capabilities } => {
                if let Some(detail) = &mut self.detail {
                    detail.set_capabilities(mac, Arc::clone(capabilities));
                }
            }
            Action::SearchInput(query) => self.search.push(query.clone(), Instant::now()),
            Action::SearchSubmit => {
                if let Some(query) = self.search.flush() {
                    self.apply_search(query);
                }
            }
            Action::CloseSearch => {
                self.search.cancel();
                self.apply_search(String::new());
            }
            Action::Tick => {
                if let Some(query) = self.search.poll(Instant::now()) {
                    self.apply_search(query);
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        if let Some(detail) = &self.detail {
            let chunks = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(area);
            self.render_list(frame, chunks[0]);
            detail.render(frame, chunks[1]);
        } else {
            self.render_list(frame, area);
        }
        self.render_overlay(frame, area);
    }

    fn captures_input(&self) -> bool {
        self.detail.is_some() || !matches!(self.overlay, Overlay::None)
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Devices"
    }
}
