//! Live dashboard.
//!
//! The loop redraws from a fresh store snapshot every pass, drains new
//! notifications into a short history and turns key presses into store
//! calls. Commands are spawned and never awaited here; their outcome shows
//! up as notifications and in the next refresh.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState},
};

use svdash_core::manage::ManageAction;
use svdash_core::model::{Process, SupervisorServer, total_processes};
use svdash_core::notify::{MemoryNotificator, Notification};
use svdash_core::schedule::{RefreshScheduler, ScheduleIntervals};
use svdash_core::state::{DashboardState, Loadable};
use svdash_core::store::DashboardStore;

use super::theme::theme;

const NOTIFICATION_HISTORY: usize = 6;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UiAction {
    Quit,
    Refresh,
    ToggleAutoRefresh,
    ToggleMutators,
    Command(ManageAction),
    Up,
    Down,
}

fn key_action(key: KeyEvent) -> Option<UiAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UiAction::Quit);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(UiAction::Quit),
        KeyCode::Char('r') => Some(UiAction::Refresh),
        KeyCode::Char('a') => Some(UiAction::ToggleAutoRefresh),
        KeyCode::Char('m') => Some(UiAction::ToggleMutators),
        KeyCode::Char('c') => Some(UiAction::Command(ManageAction::ClearProcessLog)),
        KeyCode::Char('k') => Some(UiAction::Command(ManageAction::CloneProcess)),
        KeyCode::Char('x') => Some(UiAction::Command(ManageAction::RemoveProcess)),
        KeyCode::Up => Some(UiAction::Up),
        KeyCode::Down => Some(UiAction::Down),
        _ => None,
    }
}

/// One table row per process, in server order
fn process_rows(state: &DashboardState) -> Vec<(SupervisorServer, Process)> {
    state
        .data
        .latest_fulfilled()
        .map(|supervisors| {
            supervisors
                .iter()
                .flat_map(|sv| {
                    sv.processes
                        .iter()
                        .map(move |p| (sv.server.clone(), p.clone()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Format the staleness counter as "12s" or "3m 05s"
fn format_age(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else {
        format!("{}m {:02}s", seconds / 60, seconds % 60)
    }
}

struct ViewState {
    selected: usize,
    table_state: TableState,
    notifications: VecDeque<Notification>,
    hint: Option<String>,
}

impl ViewState {
    fn new() -> Self {
        Self {
            selected: 0,
            table_state: TableState::default(),
            notifications: VecDeque::new(),
            hint: None,
        }
    }

    fn push_notifications(&mut self, incoming: Vec<Notification>) {
        for n in incoming {
            self.notifications.push_back(n);
            while self.notifications.len() > NOTIFICATION_HISTORY {
                self.notifications.pop_front();
            }
        }
    }

    fn clamp_selection(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            self.table_state.select(None);
        } else {
            self.selected = self.selected.min(len - 1);
            self.table_state.select(Some(self.selected));
        }
    }
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

pub async fn run_tui(
    store: Arc<DashboardStore>,
    notes: Arc<MemoryNotificator>,
    intervals: ScheduleIntervals,
) -> io::Result<()> {
    let mut terminal = setup_terminal()?;
    let scheduler = RefreshScheduler::spawn(Arc::clone(&store), intervals);

    let initial = Arc::clone(&store);
    tokio::spawn(async move {
        initial.invalidate_supervisors().await;
    });

    let result = tui_loop(&mut terminal, &store, &notes).await;

    scheduler.shutdown().await;
    restore_terminal(terminal)?;
    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    store: &Arc<DashboardStore>,
    notes: &MemoryNotificator,
) -> io::Result<()> {
    let mut view = ViewState::new();

    loop {
        let snapshot = store.snapshot().await;
        let rows = process_rows(&snapshot);
        view.clamp_selection(rows.len());
        view.push_notifications(notes.drain());

        terminal.draw(|f| render(f, &snapshot, &rows, &mut view))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let CEvent::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = key_action(key) else {
            continue;
        };

        view.hint = None;
        match action {
            UiAction::Quit => return Ok(()),
            UiAction::Up => view.selected = view.selected.saturating_sub(1),
            UiAction::Down => view.selected = view.selected.saturating_add(1),
            UiAction::Refresh => {
                let store = Arc::clone(store);
                tokio::spawn(async move {
                    store.invalidate_supervisors().await;
                });
            }
            UiAction::ToggleAutoRefresh => {
                store
                    .update_auto_refresh(!snapshot.auto_refresh_is_active)
                    .await;
            }
            UiAction::ToggleMutators => store.switch_allow_mutators().await,
            UiAction::Command(manage_action) => {
                if !snapshot.is_allow_mutators_active {
                    view.hint = Some("Mutators are disabled, press m to allow them".into());
                } else if let Some((server, process)) = rows.get(view.selected) {
                    tracing::info!(
                        event = "ui.command.dispatched",
                        action = %manage_action,
                        server = %server.name,
                        process = %process.full_name(),
                    );
                    // Fire and forget; the outcome arrives as a notification
                    drop(store.spawn_command(manage_action, server.clone(), process.clone()));
                } else {
                    view.hint = Some("No process selected".into());
                }
            }
        }
    }
}

fn render(
    f: &mut Frame,
    state: &DashboardState,
    rows: &[(SupervisorServer, Process)],
    view: &mut ViewState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(NOTIFICATION_HISTORY as u16 + 2),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, chunks[0], state);
    render_processes(f, chunks[1], state, rows, view);
    render_notifications(f, chunks[2], view);
    render_footer(f, chunks[3], state, view);
}

fn render_header(f: &mut Frame, area: Rect, state: &DashboardState) {
    let t = theme();
    let on_off = |on: bool| if on { "ON" } else { "OFF" };

    let mut spans = vec![
        Span::styled(" svdash ", t.title_style()),
        Span::styled("│ auto-refresh ", t.text_dim_style()),
        Span::styled(
            on_off(state.auto_refresh_is_active),
            t.flag_style(state.auto_refresh_is_active),
        ),
        Span::styled(" │ mutators ", t.text_dim_style()),
        Span::styled(
            on_off(state.is_allow_mutators_active),
            t.flag_style(state.is_allow_mutators_active),
        ),
        Span::styled(" │ updated ", t.text_dim_style()),
        Span::styled(
            format!("{} ago", format_age(state.server_time_diff)),
            t.staleness_style(state.server_time_diff),
        ),
    ];

    if let Some(snapshot) = state.actual_data() {
        if snapshot.is_pending() {
            spans.push(Span::styled(" │ refreshing…", t.text_dim_style()));
        } else if let Some(message) = snapshot.error() {
            spans.push(Span::styled(
                format!(" │ fetch failed: {}", message),
                t.error_style(),
            ));
        }
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn process_title(state: &DashboardState, rows: &[(SupervisorServer, Process)]) -> String {
    let supervisors = state
        .data
        .latest_fulfilled()
        .map(Vec::as_slice)
        .unwrap_or_default();
    let failed = rows.iter().filter(|(_, p)| p.state.is_failed()).count();

    let mut title = format!(
        " Processes ({} on {} servers",
        total_processes(supervisors),
        supervisors.len()
    );
    if failed > 0 {
        title.push_str(&format!(", {} failed", failed));
    }
    title.push_str(") ");
    title
}

fn render_processes(
    f: &mut Frame,
    area: Rect,
    state: &DashboardState,
    rows: &[(SupervisorServer, Process)],
    view: &mut ViewState,
) {
    let t = theme();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(t.border_style())
        .title(Span::styled(process_title(state, rows), t.title_style()));

    if rows.is_empty() {
        let message = match state.actual_data() {
            None | Some(Loadable::Pending) => "Loading supervisors…",
            Some(Loadable::Rejected(_)) => "Could not load supervisors",
            Some(Loadable::Fulfilled(_)) => "No processes reported",
        };
        f.render_widget(
            Paragraph::new(Span::styled(message, t.text_dim_style())).block(block),
            area,
        );
        return;
    }

    let header = Row::new(["", "server", "process", "state", "pid", "description"])
        .style(t.text_dim_style());

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|(server, process)| {
            let state_style = t.state_style(process.state);
            Row::new(vec![
                Cell::from(Span::styled(t.state_icon(process.state), state_style)),
                Cell::from(server.name.clone()),
                Cell::from(process.full_name()),
                Cell::from(Span::styled(process.state.label(), state_style)),
                Cell::from(process.pid.map(|p| p.to_string()).unwrap_or_default()),
                Cell::from(process.description.clone().unwrap_or_default()),
            ])
            .style(t.text_style())
        })
        .collect();

    let table = Table::new(
        table_rows,
        [
            Constraint::Length(2),
            Constraint::Length(16),
            Constraint::Min(20),
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(t.selection_style());

    f.render_stateful_widget(table, area, &mut view.table_state);
}

fn render_notifications(f: &mut Frame, area: Rect, view: &ViewState) {
    let t = theme();
    let items: Vec<ListItem> = view
        .notifications
        .iter()
        .rev()
        .map(|n| {
            // Error details can span several lines; keep one row each
            let text = n.message.split_whitespace().collect::<Vec<_>>().join(" ");
            let age = n.at.elapsed().map_or(0, |d| d.as_secs());
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>7} ", format_age(age)), t.text_dim_style()),
                Span::styled(text, t.notification_style(n.level)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style())
            .title(Span::styled(" Notifications ", t.title_style())),
    );
    f.render_widget(list, area);
}

fn render_footer(f: &mut Frame, area: Rect, state: &DashboardState, view: &ViewState) {
    let t = theme();

    if let Some(hint) = &view.hint {
        f.render_widget(
            Paragraph::new(Span::styled(format!(" {}", hint), t.error_style())),
            area,
        );
        return;
    }

    let mut keys = vec![("↑↓", "select"), ("r", "refresh"), ("a", "auto-refresh"), ("m", "mutators")];
    if state.is_allow_mutators_active {
        keys.extend([("c", "clear log"), ("k", "clone"), ("x", "remove")]);
    }
    keys.push(("q", "quit"));

    let mut spans = vec![Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(key, t.key_hint_style()));
        spans.push(Span::styled(format!(" {}  ", label), t.text_dim_style()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use svdash_core::model::{ProcessState, Supervisor};

    fn state_with(supervisors: Vec<Supervisor>) -> DashboardState {
        let mut state = DashboardState::default();
        state.data.begin();
        state.data.settle(1, Loadable::Fulfilled(supervisors));
        state
    }

    fn supervisor(name: &str, processes: &[&str]) -> Supervisor {
        Supervisor {
            server: SupervisorServer {
                name: name.into(),
                url: None,
                version: None,
                error: None,
            },
            processes: processes
                .iter()
                .map(|p| Process {
                    name: (*p).into(),
                    group: "app".into(),
                    state: ProcessState::Running,
                    pid: None,
                    description: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_process_rows_flatten_in_server_order() {
        let state = state_with(vec![
            supervisor("web-1", &["api", "worker"]),
            supervisor("db-1", &[]),
            supervisor("web-2", &["api"]),
        ]);
        let rows = process_rows(&state);
        let names: Vec<String> = rows
            .iter()
            .map(|(s, p)| format!("{}/{}", s.name, p.name))
            .collect();
        assert_eq!(names, vec!["web-1/api", "web-1/worker", "web-2/api"]);
    }

    #[test]
    fn test_process_rows_keep_previous_data_while_loading() {
        let mut state = state_with(vec![supervisor("web-1", &["api"])]);
        state.data.begin();
        assert_eq!(process_rows(&state).len(), 1);
    }

    #[test]
    fn test_process_title_counts_failures() {
        let mut sv = supervisor("web-1", &["api", "worker", "cron"]);
        sv.processes[1].state = ProcessState::Fatal;
        sv.processes[2].state = ProcessState::Backoff;
        let state = state_with(vec![sv, supervisor("db-1", &[])]);

        let rows = process_rows(&state);
        assert_eq!(
            process_title(&state, &rows),
            " Processes (3 on 2 servers, 2 failed) "
        );
        assert_eq!(
            process_title(&DashboardState::default(), &[]),
            " Processes (0 on 0 servers) "
        );
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(0), "0s");
        assert_eq!(format_age(59), "59s");
        assert_eq!(format_age(65), "1m 05s");
    }

    #[test]
    fn test_key_bindings() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(key_action(key(KeyCode::Char('q'))), Some(UiAction::Quit));
        assert_eq!(
            key_action(key(KeyCode::Char('x'))),
            Some(UiAction::Command(ManageAction::RemoveProcess))
        );
        assert_eq!(
            key_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(UiAction::Quit)
        );
        assert_eq!(
            key_action(key(KeyCode::Char('c'))),
            Some(UiAction::Command(ManageAction::ClearProcessLog))
        );
        assert_eq!(key_action(key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn test_selection_clamps_to_rows() {
        let mut view = ViewState::new();
        view.selected = 10;
        view.clamp_selection(3);
        assert_eq!(view.selected, 2);
        view.clamp_selection(0);
        assert_eq!(view.selected, 0);
        assert_eq!(view.table_state.selected(), None);
    }
}
