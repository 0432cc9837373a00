mod help;

use crate::controller::{run_console, UiCommand, UiEvent, WorkflowController};
use crate::model::{Decision, Run};
use crate::render::{self, BadgeTone};
use crate::store::DashboardMetrics;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

struct UiState {
    tab: usize,
    info: String,
    health_chip: String,
    model_chip: String,
    runs: Vec<Run>,
    pending: Vec<Run>,
    metrics: DashboardMetrics,
    runs_selected: usize,
    pending_selected: usize,
    detail: Option<Run>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            health_chip: "Backend: …".to_string(),
            model_chip: "Model: —".to_string(),
            runs: Vec::new(),
            pending: Vec::new(),
            metrics: DashboardMetrics::default(),
            runs_selected: 0,
            pending_selected: 0,
            detail: None,
        }
    }
}

pub async fn run(controller: Arc<WorkflowController>) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the
    // command loop.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the
    // Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = run_console(controller, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut event_rx: UnboundedReceiver<UiEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::default();
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 5;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = 4;
                    }
                    (_, KeyCode::Char('r')) => {
                        state.info = "Refreshing…".to_string();
                        let _ = cmd_tx.send(UiCommand::Refresh);
                    }
                    (_, KeyCode::Char('e')) => {
                        state.info = "Posting demo event…".to_string();
                        let _ = cmd_tx.send(UiCommand::SimulateEvent);
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => match state.tab {
                        1 => state.runs_selected = state.runs_selected.saturating_sub(1),
                        2 => state.pending_selected = state.pending_selected.saturating_sub(1),
                        _ => {}
                    },
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => match state.tab {
                        1 => {
                            if state.runs_selected + 1 < state.runs.len() {
                                state.runs_selected += 1;
                            }
                        }
                        2 => {
                            if state.pending_selected + 1 < state.pending.len() {
                                state.pending_selected += 1;
                            }
                        }
                        _ => {}
                    },
                    (_, KeyCode::Enter) => {
                        let run_id = match state.tab {
                            1 => state.runs.get(state.runs_selected).map(|r| r.run_id.clone()),
                            2 => state
                                .pending
                                .get(state.pending_selected)
                                .map(|r| r.run_id.clone()),
                            _ => None,
                        };
                        if let Some(run_id) = run_id {
                            state.info = format!("Opening {run_id}…");
                            state.tab = 3;
                            let _ = cmd_tx.send(UiCommand::OpenRun(run_id));
                        }
                    }
                    (_, KeyCode::Char('a')) => {
                        if state.tab == 2 {
                            if let Some(run) = state.pending.get(state.pending_selected) {
                                state.info = format!("Approving {}…", run.run_id);
                                let _ = cmd_tx.send(UiCommand::Decide {
                                    run_id: run.run_id.clone(),
                                    decision: Decision::Approved,
                                });
                            }
                        }
                    }
                    (_, KeyCode::Char('x')) => {
                        if state.tab == 2 {
                            if let Some(run) = state.pending.get(state.pending_selected) {
                                state.info = format!("Rejecting {}…", run.run_id);
                                let _ = cmd_tx.send(UiCommand::Decide {
                                    run_id: run.run_id.clone(),
                                    decision: Decision::Rejected,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn apply_event(state: &mut UiState, ev: UiEvent) {
    match ev {
        UiEvent::HealthChecked(health) => match health {
            Some(h) => {
                state.health_chip = if h.gemini_configured {
                    "Gemini: ON".to_string()
                } else {
                    "Gemini: OFF (stub)".to_string()
                };
                state.model_chip = format!(
                    "Model: {}",
                    if h.model.is_empty() { "—" } else { h.model.as_str() }
                );
            }
            None => {
                state.health_chip = "Backend: OFF".to_string();
                state.model_chip = "Model: —".to_string();
            }
        },
        UiEvent::RunsLoaded { runs, metrics } => {
            state.runs = runs;
            state.metrics = metrics;
            if state.runs_selected >= state.runs.len() {
                state.runs_selected = state.runs.len().saturating_sub(1);
            }
        }
        UiEvent::PendingLoaded(pending) => {
            state.pending = pending;
            if state.pending_selected >= state.pending.len() {
                state.pending_selected = state.pending.len().saturating_sub(1);
            }
        }
        UiEvent::RunOpened(run) => {
            state.info = format!("Run {}", run.run_id);
            state.detail = Some(*run);
            state.tab = 3;
        }
        UiEvent::Notice(msg) => state.info = msg,
        UiEvent::Failed(msg) => state.info = format!("Error: {msg}"),
    }
}

fn tone_color(tone: BadgeTone) -> Color {
    match tone {
        BadgeTone::Good => Color::Green,
        BadgeTone::Warn => Color::Yellow,
        BadgeTone::Bad => Color::Red,
        BadgeTone::Neutral => Color::Gray,
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("Runs"),
        Line::from("Approvals"),
        Line::from("Detail"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("opspilot"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_dashboard(chunks[1], f, state),
        1 => draw_runs(chunks[1], f, state),
        2 => draw_approvals(chunks[1], f, state),
        3 => draw_detail(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    let status = Paragraph::new(Line::from(vec![
        Span::styled(state.health_chip.as_str(), Style::default().fg(Color::Cyan)),
        Span::raw(" • "),
        Span::styled(state.model_chip.as_str(), Style::default().fg(Color::Gray)),
        Span::raw(" • "),
        Span::raw(state.info.as_str()),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[2]);
}

fn metric_tile(f: &mut ratatui::Frame, area: Rect, title: &str, value: Line<'_>) {
    let p = Paragraph::new(vec![Line::from(""), value])
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(p, area);
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let tiles = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(rows[0]);

    metric_tile(
        f,
        tiles[0],
        "Total runs",
        Line::from(state.metrics.total_runs.to_string()),
    );
    metric_tile(
        f,
        tiles[1],
        "Pending approvals",
        Line::from(Span::styled(
            state.metrics.pending_approvals.to_string(),
            Style::default().fg(if state.metrics.pending_approvals > 0 {
                Color::Yellow
            } else {
                Color::Green
            }),
        )),
    );
    let last = state
        .metrics
        .last_status
        .as_ref()
        .map(|s| render::status_badge(s))
        .map(|b| Span::styled(b.label, Style::default().fg(tone_color(b.tone))))
        .unwrap_or_else(|| Span::raw("—"));
    metric_tile(f, tiles[2], "Last status", Line::from(last));

    let mut lines: Vec<Line> = Vec::new();
    for row in render::run_rows(&state.runs).into_iter().take(10) {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<14}", row.run_id),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(format!("{:<6} {:<17} {:<22} ", row.environment, row.created, row.skill)),
            Span::styled(row.status.label, Style::default().fg(tone_color(row.status.tone))),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from("No runs yet. Submit an intent to get started."));
    }
    let recent = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Recent runs"),
    );
    f.render_widget(recent, rows[1]);
}

fn draw_runs(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, row) in render::run_rows(&state.runs).into_iter().enumerate() {
        let marker = if i == state.runs_selected { "▸ " } else { "  " };
        let base = if i == state.runs_selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{:<14}", row.run_id), base),
            Span::styled(
                format!("{:<6} {:<17} {:<22} {:<28} ", row.environment, row.created, row.skill, row.summary),
                base,
            ),
            Span::styled(row.status.label, Style::default().fg(tone_color(row.status.tone))),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from("No runs yet."));
    }
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Runs (enter: open, r: refresh)"),
    );
    f.render_widget(p, area);
}

fn draw_approvals(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, card) in render::approval_cards(&state.pending).into_iter().enumerate() {
        let marker = if i == state.pending_selected { "▸ " } else { "  " };
        let title_style = if i == state.pending_selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{} • {}", card.skill, card.run_id), title_style),
        ]));
        lines.push(Line::from(vec![
            Span::raw(format!("    {} — ", card.summary)),
            Span::styled(
                format!("{} risk", card.risk.label),
                Style::default().fg(tone_color(card.risk.tone)),
            ),
        ]));
        lines.push(Line::from(format!(
            "    Requested by {} ({}) • env {}",
            card.requested_by, card.role, card.environment
        )));
        lines.push(Line::from(""));
    }
    if lines.is_empty() {
        lines.push(Line::from("No pending approvals 🎉"));
    }
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Approvals (a: approve, x: reject, enter: view)"),
    );
    f.render_widget(p, area);
}

fn draw_detail(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let Some(run) = state.detail.as_ref() else {
        let p = Paragraph::new("No run selected. Open one from Runs or Approvals.")
            .block(Block::default().borders(Borders::ALL).title("Run details"));
        f.render_widget(p, area);
        return;
    };

    let kv = render::detail_view(run);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(kv.len() as u16 + 2),
            Constraint::Min(6),
            Constraint::Percentage(40),
        ])
        .split(area);

    let mut kv_lines: Vec<Line> = Vec::new();
    for (key, value) in &kv {
        kv_lines.push(Line::from(vec![
            Span::styled(format!("{key:<13}"), Style::default().fg(Color::Gray)),
            Span::raw(value.clone()),
        ]));
    }
    let panel = Paragraph::new(kv_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Run {}", run.run_id)),
    );
    f.render_widget(panel, rows[0]);

    let view = render::plan_view(run);
    let mut step_lines: Vec<Line> = vec![Line::from(vec![
        Span::styled(
            format!("{} • {}", view.skill, view.summary),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  "),
        Span::styled(view.risk.label.clone(), Style::default().fg(tone_color(view.risk.tone))),
    ])];
    step_lines.push(Line::from(view.approval_note.clone()));
    for step in &view.steps {
        step_lines.push(Line::from(format!("{} • {}", step.id, step.title)));
        step_lines.push(Line::from(Span::styled(
            format!("  {} (tool: {}, safe: {})", step.action, step.tool, if step.safe { "yes" } else { "no" }),
            Style::default().fg(Color::Gray),
        )));
    }
    let plan = Paragraph::new(step_lines)
        .block(Block::default().borders(Borders::ALL).title("Plan"));
    f.render_widget(plan, rows[1]);

    let evidence = Paragraph::new(render::evidence_json(run))
        .block(Block::default().borders(Borders::ALL).title("Evidence"));
    f.render_widget(evidence, rows[2]);
}
