//! # Console Interface Module
//!
//! Terminal monitor for a running workbench.
//!
//! ## Features
//! - Live pin table with digital level, analog voltage and direction
//! - Part list with output counts and remote-readable status
//! - Keypad keys pressed from the host keyboard through the remote-control API
//! - Pause, single frame and reset commands

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::bus::PinAccess;
use crate::component::PartKind;
use crate::components::input::keypad::Key;
use crate::draw::CanvasCmd;
use crate::pin::PinDirection;
use crate::systems::Workbench;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Console configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub refresh_rate_ms: u64,
    /// Frames a keypad key stays pressed after its key event.
    pub key_hold_frames: u32,
    pub show_analog: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 50,
            key_hold_frames: 8,
            show_analog: true,
        }
    }
}

/// A keypad key held down by the console.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeldKey {
    remote_name: String,
    frames_left: u32,
}

/// Console UI application state
pub struct ConsoleApp {
    bench: Workbench,
    config: ConsoleConfig,
    running: bool,
    paused: bool,
    show_help: bool,
    held: Vec<HeldKey>,
    last_draw_cmds: usize,
    status: String,
}

impl ConsoleApp {
    pub fn new(bench: Workbench, config: ConsoleConfig) -> Self {
        Self {
            bench,
            config,
            running: false,
            paused: false,
            show_help: false,
            held: Vec::new(),
            last_draw_cmds: 0,
            status: String::from("running"),
        }
    }

    pub fn bench(&self) -> &Workbench {
        &self.bench
    }

    pub fn into_bench(self) -> Workbench {
        self.bench
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> Result<(), ConsoleError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        // restore the terminal even when the loop failed
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), ConsoleError> {
        self.running = true;
        let refresh = Duration::from_millis(self.config.refresh_rate_ms);
        let mut last_draw = Instant::now();

        while self.running {
            if event::poll(Duration::from_millis(5))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key.code);
                    }
                }
            }

            if last_draw.elapsed() >= refresh {
                if !self.paused {
                    self.step_frame();
                }
                terminal.draw(|f| self.draw_ui(f))?;
                last_draw = Instant::now();
            }
        }

        info!("console closed after {} frames", self.bench.frames());
        Ok(())
    }

    /// Run one bench frame and release keys whose hold time ran out.
    pub fn step_frame(&mut self) {
        let mut canvas: Vec<CanvasCmd> = Vec::new();
        self.bench.run_frame(&mut canvas, |_bus| {});
        self.last_draw_cmds = canvas.len();

        let mut released = Vec::new();
        self.held.retain_mut(|held| {
            held.frames_left = held.frames_left.saturating_sub(1);
            if held.frames_left == 0 {
                released.push(held.remote_name.clone());
                false
            } else {
                true
            }
        });
        for name in released {
            self.bench.set_remote_input(&name, 0);
        }
    }

    pub fn handle_key_event(&mut self, key: KeyCode) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                debug!("quit requested");
                self.running = false;
            }
            KeyCode::Char('h') | KeyCode::Char('H') => self.show_help = true,
            KeyCode::Char(' ') => {
                self.paused = !self.paused;
                self.status = if self.paused { "paused" } else { "running" }.to_string();
            }
            KeyCode::Char('n') | KeyCode::Char('N') if self.paused => {
                self.step_frame();
                self.status = format!("stepped to frame {}", self.bench.frames());
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.bench.reset();
                self.held.clear();
                self.status = "reset".to_string();
            }
            KeyCode::Char(c) => self.press_keypad_key(c),
            _ => {}
        }
    }

    /// Press `c` on every keypad of the bench.
    fn press_keypad_key(&mut self, c: char) {
        let Some(key) = Key::from_char(c) else {
            return;
        };

        let keypads: Vec<String> = self
            .bench
            .parts()
            .filter(|part| part.kind() == PartKind::Keypad)
            .map(|part| format!("{}.{}", part.name(), key.name()))
            .collect();

        for remote_name in keypads {
            if self.bench.set_remote_input(&remote_name, 1) {
                self.status = format!("pressed {}", remote_name);
                self.held.retain(|held| held.remote_name != remote_name);
                self.held.push(HeldKey {
                    remote_name,
                    frames_left: self.config.key_hold_frames.max(1),
                });
            }
        }
    }

    fn draw_ui(&self, f: &mut Frame) {
        let size = f.size();

        if self.show_help {
            self.draw_help_screen(f);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Title bar
                Constraint::Min(8),    // Main content
                Constraint::Length(3), // Status bar
            ])
            .split(size);

        let title_text = vec![
            Line::from(vec![Span::styled(
                format!("Workbench: {}", self.bench.name()),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(vec![
                Span::raw("Keys: "),
                Span::styled("q", Style::default().fg(Color::Yellow)),
                Span::raw("=quit, "),
                Span::styled("space", Style::default().fg(Color::Yellow)),
                Span::raw("=pause, "),
                Span::styled("n", Style::default().fg(Color::Yellow)),
                Span::raw("=step, "),
                Span::styled("r", Style::default().fg(Color::Yellow)),
                Span::raw("=reset, "),
                Span::styled("0-9 A-D * #", Style::default().fg(Color::Yellow)),
                Span::raw("=keypad"),
            ]),
        ];
        let title = Paragraph::new(title_text)
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .wrap(Wrap { trim: true });
        f.render_widget(title, chunks[0]);

        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        self.draw_bench_info(f, content_chunks[0]);
        self.draw_pins(f, content_chunks[1]);

        let held: Vec<&str> = self.held.iter().map(|h| h.remote_name.as_str()).collect();
        let status = format!(
            "{} | frame {} | held: {}",
            self.status,
            self.bench.frames(),
            if held.is_empty() { "-".to_string() } else { held.join(", ") }
        );
        let status_bar = Paragraph::new(status)
            .style(Style::default().fg(Color::White))
            .block(Block::default().borders(Borders::ALL).title("State"));
        f.render_widget(status_bar, chunks[2]);
    }

    fn draw_help_screen(&self, f: &mut Frame) {
        let size = f.size();
        let entry = |keys: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(keys, Style::default().fg(Color::Yellow)),
                Span::raw(what),
            ])
        };
        let help_text = vec![
            Line::from(vec![Span::styled(
                "Workbench Console Help",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            entry("  q, Esc", " - Quit"),
            entry("  space", " - Pause or resume frames"),
            entry("  n", " - Run a single frame while paused"),
            entry("  r", " - Reset every part"),
            entry("  0-9, A-D, *, #", " - Press the key on every keypad"),
            Line::from(""),
            Line::from(vec![Span::raw("Press any key to return to main view...")]),
        ];

        let help = Paragraph::new(help_text)
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Help"));
        f.render_widget(help, size);
    }

    fn draw_bench_info(&self, f: &mut Frame, area: Rect) {
        let timing = self.bench.timing();
        let rx = self.bench.rx();
        let mut lines = vec![
            Line::from(format!("Description: {}", self.bench.description())),
            Line::from(format!(
                "Timing: {} steps/frame, {} clocks/instr",
                timing.jump_steps, timing.clocks_per_instruction
            )),
            Line::from(format!(
                "Rx buffer: {}/{} bytes, {} dropped",
                rx.len(),
                rx.capacity(),
                rx.dropped()
            )),
            Line::from(format!("Draw commands last frame: {}", self.last_draw_cmds)),
            Line::from(""),
        ];

        for part in self.bench.parts() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{:<12}", part.name()),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" {:<22} ", part.kind().title())),
                Span::styled(part.write_preferences(), Style::default().fg(Color::DarkGray)),
            ]));
        }

        let widget = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Parts"))
            .wrap(Wrap { trim: true });
        f.render_widget(widget, area);
    }

    fn draw_pins(&self, f: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .bench
            .bus()
            .iter()
            .map(|(index, pin)| {
                let level_style = if pin.read().is_high() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                let dir = match pin.direction() {
                    PinDirection::Input => "in ",
                    PinDirection::Output => "out",
                };
                let mut spans = vec![
                    Span::raw(format!("{:>3} {:<6} {} ", index, pin.name(), dir)),
                    Span::styled(pin.read().to_str(), level_style),
                ];
                if self.config.show_analog {
                    spans.push(Span::raw(format!(" {:4.2}V", pin.analog())));
                }
                Line::from(spans)
            })
            .collect();

        let title = format!("Pins ({})", self.bench.bus().pin_count());
        let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(widget, area);
    }
}

/// Public interface for launching the console
pub fn run_console(bench: Workbench, config: ConsoleConfig) -> Result<Workbench, ConsoleError> {
    let mut app = ConsoleApp::new(bench, config);
    app.run()?;
    Ok(app.into_bench())
}
