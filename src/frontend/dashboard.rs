//! Full screen dashboard.
//!
//! ```text
//! ┌ Timer data ───────────────┐┌ Log ─────────────┐
//! │          12.34            ││ Connecting to …  │
//! └───────────────────────────┘│ Connected to …   │
//! ┌ Data sent to vMix at … ───┐│                  │
//! │          12.34            ││                  │
//! └───────────────────────────┘└──────────────────┘
//! ```
//!
//! Setters only update [`DashboardState`]; drawing happens in
//! [`Frontend::refresh`], which the bridge loop calls on a fixed tick. That
//! keeps per-reading cost constant no matter how fast the console talks.

use std::collections::VecDeque;
use std::io::Stdout;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use super::guard::TerminalGuard;
use super::Frontend;
use crate::output::ChannelTarget;

/// Maximum number of log lines kept for the log pane.
pub const LOG_HISTORY: usize = 500;

/// Placeholder shown before the first reading arrives.
const INITIAL_TIME: &str = "0.00";

/// Everything the dashboard displays.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Latest value read from the console.
    pub local_time: String,
    /// Latest value forwarded to vMix.
    pub remote_time: String,
    /// Title of the remote box, naming the vMix target.
    pub remote_label: String,
    /// Most recent log lines, oldest first.
    pub logs: VecDeque<String>,
}

impl DashboardState {
    /// Initial state for a target.
    pub fn new(target: &ChannelTarget) -> Self {
        Self {
            local_time: INITIAL_TIME.to_string(),
            remote_time: INITIAL_TIME.to_string(),
            remote_label: format!(
                "Data sent to vMix at {}:{}/{} {}",
                target.host, target.port, target.input_id, target.field_name
            ),
            logs: VecDeque::with_capacity(LOG_HISTORY),
        }
    }

    fn push_log(&mut self, text: &str) {
        if self.logs.len() == LOG_HISTORY {
            self.logs.pop_front();
        }
        self.logs.push_back(text.to_string());
    }
}

/// Ratatui dashboard frontend.
pub struct DashboardFrontend<B: Backend> {
    terminal: Terminal<B>,
    state: DashboardState,
    dirty: bool,
    /// Keyboard polling is only meaningful on a real terminal.
    poll_input: bool,
    _guard: Option<TerminalGuard>,
}

impl<B: Backend> std::fmt::Debug for DashboardFrontend<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardFrontend")
            .field("state", &self.state)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl DashboardFrontend<CrosstermBackend<Stdout>> {
    /// Take over stdout as a full screen dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout is not a terminal.
    pub fn stdout(target: &ChannelTarget) -> Result<Self> {
        let guard = TerminalGuard::enter().context("Failed to enter dashboard mode")?;
        let terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))
            .context("Failed to create terminal")?;

        let mut dashboard = Self::with_terminal(terminal, target);
        dashboard.poll_input = true;
        dashboard._guard = Some(guard);
        Ok(dashboard)
    }
}

impl<B: Backend> DashboardFrontend<B> {
    /// Dashboard drawing onto an existing terminal. Does not read input.
    pub fn with_terminal(terminal: Terminal<B>, target: &ChannelTarget) -> Self {
        Self {
            terminal,
            state: DashboardState::new(target),
            dirty: true,
            poll_input: false,
            _guard: None,
        }
    }

    /// Current display state.
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Underlying terminal.
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Drain pending key events; true if a quit key was pressed.
    fn quit_requested() -> Result<bool> {
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let ctrl_c = key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL);
                    if ctrl_c || matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                        return Ok(true);
                    }
                }
                Event::Resize(..) => {
                    // Full redraw on next refresh.
                }
                _ => {}
            }
        }
        Ok(false)
    }

    fn draw(&mut self) -> Result<()> {
        let state = &self.state;
        self.terminal
            .draw(|f| render(f, state))
            .map_err(|e| anyhow!("Failed to draw dashboard: {e}"))?;
        self.dirty = false;
        Ok(())
    }
}

impl<B: Backend> Frontend for DashboardFrontend<B> {
    fn add_log(&mut self, text: &str) {
        log::info!("{}", text);
        self.state.push_log(text);
        self.dirty = true;
    }

    fn set_local_time(&mut self, value: &str) {
        if self.state.local_time != value {
            self.state.local_time = value.to_string();
            self.dirty = true;
        }
    }

    fn set_remote_time(&mut self, value: &str) {
        log::debug!("Remote time set to {}", value);
        if self.state.remote_time != value {
            self.state.remote_time = value.to_string();
            self.dirty = true;
        }
    }

    fn refresh(&mut self) -> Result<bool> {
        let mut quit = false;
        if self.poll_input {
            quit = Self::quit_requested()?;
            // Resizes leave the screen stale; redraw every tick on a real tty.
            self.dirty = true;
        }
        if self.dirty {
            self.draw()?;
        }
        Ok(quit)
    }
}

/// Render the dashboard layout.
pub(crate) fn render(f: &mut Frame, state: &DashboardState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(f.area());

    let boxes = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    render_time_box(f, boxes[0], " Timer data ", &state.local_time);
    render_time_box(
        f,
        boxes[1],
        &format!(" {} ", state.remote_label),
        &state.remote_time,
    );

    // Tail of the log that fits inside the borders.
    let visible = usize::from(columns[1].height.saturating_sub(2));
    let skip = state.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .logs
        .iter()
        .skip(skip)
        .map(|l| Line::from(l.as_str()))
        .collect();

    let log = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Log "));
    f.render_widget(log, columns[1]);
}

fn render_time_box(f: &mut Frame, area: Rect, title: &str, value: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().fg(Color::White).bg(Color::Magenta));

    // Vertically centre the single line of text.
    let inner_height = area.height.saturating_sub(2);
    let mut lines = vec![Line::from(""); usize::from(inner_height / 2)];
    lines.push(Line::from(value.to_string()));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(paragraph, area);
}
