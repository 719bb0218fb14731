use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};

use vision_terminal::config::AppConfig;
use vision_terminal::orchestrator::SessionState;
use vision_terminal::protocol::{ArtifactKind, MediaKind, SpeedMetrics};
use vision_terminal::selection::AnalysisKind;
use vision_terminal::state::{
    AppState, Delta, Focus, WorkerCommand, apply_delta, session_label,
};
use vision_terminal::upload::format_size;
use vision_terminal::viewer::{ClickTarget, ViewerState, download_offered};
use vision_terminal::worker::spawn_worker;

struct App {
    state: AppState,
    config: AppConfig,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<WorkerCommand>>,
    last_area: Rect,
}

impl App {
    fn new(config: AppConfig, cmd_tx: Option<mpsc::Sender<WorkerCommand>>) -> Self {
        Self {
            state: AppState::new(),
            config,
            should_quit: false,
            cmd_tx,
            last_area: Rect::default(),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.path_input.is_some() {
            self.on_path_key(key);
            return;
        }
        if self.state.viewer.is_open() {
            match key.code {
                KeyCode::Esc | KeyCode::Char('x') => self.state.viewer.close(),
                KeyCode::Char('d') => self.request_download(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.state.toggle_analysis(AnalysisKind::Tracking),
            KeyCode::Char('2') => self.state.toggle_analysis(AnalysisKind::Heatmap),
            KeyCode::Char('3') => self.state.toggle_analysis(AnalysisKind::Pose),
            KeyCode::Char('4') => self.state.toggle_analysis(AnalysisKind::Speed),
            KeyCode::Char(' ') if self.state.focus == Focus::Analyses => {
                self.state.toggle_analysis_at_cursor()
            }
            KeyCode::Char('o') => self.state.path_input = Some(String::new()),
            KeyCode::Char('r') => self.request_run(),
            KeyCode::Tab => self.state.toggle_focus(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Enter | KeyCode::Char('v') => match self.state.focus {
                Focus::Analyses => self.state.toggle_analysis_at_cursor(),
                Focus::Results => self.state.view_selected(),
            },
            KeyCode::Char('d') => self.request_download(),
            KeyCode::Char('c') => self.state.reset(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn on_path_key(&mut self, key: KeyEvent) {
        let Some(input) = self.state.path_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.state.path_input = None,
            KeyCode::Enter => {
                let raw = std::mem::take(input);
                self.state.path_input = None;
                self.state.load_file_from_path(&raw);
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        if !self.state.viewer.is_open() {
            return;
        }
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let popup = viewer_rect(self.last_area);
        let inside = mouse.column >= popup.x
            && mouse.column < popup.x + popup.width
            && mouse.row >= popup.y
            && mouse.row < popup.y + popup.height;
        let target = if inside {
            ClickTarget::Content
        } else {
            ClickTarget::Backdrop
        };
        self.state.viewer.on_click(target);
    }

    fn request_run(&mut self) {
        let Some(job) = self.state.start_run() else {
            return;
        };
        let run_id = job.run_id;
        let sent = self
            .cmd_tx
            .as_ref()
            .map(|tx| tx.send(WorkerCommand::Submit(job)).is_ok())
            .unwrap_or(false);
        if !sent {
            self.state.push_log("[WARN] Analysis worker unavailable");
            self.state
                .orchestrator
                .abort_run(run_id, "analysis worker unavailable");
        }
    }

    fn request_download(&mut self) {
        let Some(artifact) = self.state.download_selected() else {
            return;
        };
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Downloads unavailable");
            return;
        };
        if tx.send(WorkerCommand::Download(artifact)).is_err() {
            self.state.push_log("[WARN] Download request failed");
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let config = AppConfig::from_env();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_worker(tx, cmd_rx, config.clone());

    let mut app = App::new(config, Some(cmd_tx));
    app.state.push_log(format!("[INFO] Service origin {}", app.config.api_base));
    if let Some(path) = std::env::args().nth(1) {
        app.state.load_file_from_path(&path);
    }
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| {
            app.last_area = f.size();
            ui(f, app);
        })?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(42), Constraint::Percentage(58)])
        .split(chunks[1]);
    render_configuration(frame, columns[0], &app.state);
    render_results(frame, columns[1], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.viewer.is_open() {
        render_viewer(frame, frame.size(), &app.state.viewer);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let session = app.state.orchestrator.session();
    let line1 = format!(
        "  VISION TERMINAL | {} | {}",
        session_label(session),
        app.config.api_base
    );
    let line2 = "  Sports performance analysis".to_string();
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    if state.path_input.is_some() {
        return "Type a video path | Enter Load | Esc Cancel".to_string();
    }
    if state.viewer.is_open() {
        return "Esc/x Close | d Download | click outside to close | q Quit".to_string();
    }
    "1-4 Toggle | o Open file | r Run | Tab Focus | j/k Move | Enter/v View | d Download | c Clear | ? Help | q Quit"
        .to_string()
}

fn render_configuration(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = state.focus == Focus::Analyses;
    let block = Block::default()
        .title("Input & Configuration")
        .borders(Borders::ALL)
        .border_style(focus_style(focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(6),
            Constraint::Min(1),
        ])
        .split(inner);

    frame.render_widget(Paragraph::new(file_text(state)), rows[0]);

    let selection = state.orchestrator.selection();
    let mut lines = vec![Line::styled(
        "Select Analyses",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for (idx, kind) in AnalysisKind::ALL.iter().enumerate() {
        let mark = if selection.is_enabled(*kind) { "[x]" } else { "[ ]" };
        let cursor = if focused && idx == state.analysis_cursor { ">" } else { " " };
        let style = if selection.is_enabled(*kind) {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::styled(
            format!("{cursor}{} {mark} {}", idx + 1, kind.label()),
            style,
        ));
    }
    frame.render_widget(Paragraph::new(lines), rows[1]);

    let notice = if let Some(msg) = state.orchestrator.session().error() {
        Some((msg.to_string(), Color::Red))
    } else {
        state
            .orchestrator
            .speed_warning()
            .map(|warning| (warning.to_string(), Color::Yellow))
    };
    let mut notice_lines = Vec::new();
    if let Some((msg, color)) = notice {
        notice_lines.push(Line::styled(msg, Style::default().fg(color)));
        notice_lines.push(Line::raw(""));
    }
    let run_label = if state.orchestrator.is_loading() {
        Line::styled(
            "Processing Video...",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Line::styled(
            "r  Run Analysis",
            Style::default().add_modifier(Modifier::BOLD),
        )
    };
    notice_lines.push(run_label);
    frame.render_widget(
        Paragraph::new(notice_lines).wrap(Wrap { trim: true }),
        rows[2],
    );
}

fn file_text(state: &AppState) -> String {
    if let Some(input) = &state.path_input {
        return format!("Open: {input}_");
    }
    match state.orchestrator.file() {
        Some(file) => format!("Video: {} ({})", file.name(), format_size(file.len())),
        None => "Video: none (press o to choose)".to_string(),
    }
}

fn render_results(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = state.focus == Focus::Results;
    let block = Block::default()
        .title("Analysis Results")
        .borders(Borders::ALL)
        .border_style(focus_style(focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match state.orchestrator.session() {
        SessionState::Idle | SessionState::Error(_) => {
            let text = "Ready to analyze\nResults will appear here after you load a video and run.";
            let p = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
            frame.render_widget(p, inner);
        }
        SessionState::Loading => {
            let p = Paragraph::new("Analyzing footage...").style(Style::default().fg(Color::Blue));
            frame.render_widget(p, inner);
        }
        SessionState::Results(items) if items.is_empty() => {
            let p = Paragraph::new("The service produced no artifacts")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(p, inner);
        }
        SessionState::Results(items) => {
            let lines: Vec<Line> = items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    let selected = focused && idx == state.result_cursor;
                    let icon = match item.kind {
                        ArtifactKind::SpeedAnalysis => "SPD",
                        ArtifactKind::Media => match item.media_kind() {
                            MediaKind::Video => "VID",
                            MediaKind::Image => "IMG",
                        },
                    };
                    let actions = if download_offered(item) {
                        "View | Download"
                    } else {
                        "View"
                    };
                    let style = if selected {
                        Style::default().fg(Color::White).bg(Color::DarkGray)
                    } else {
                        Style::default()
                    };
                    Line::styled(format!(" {icon}  {:<32} {actions}", item.name), style)
                })
                .collect();
            frame.render_widget(Paragraph::new(lines), inner);
        }
    }
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn viewer_rect(area: Rect) -> Rect {
    centered_rect(80, 80, area)
}

fn render_viewer(frame: &mut Frame, area: Rect, viewer: &ViewerState) {
    let popup_area = viewer_rect(area);
    frame.render_widget(Clear, popup_area);

    match viewer {
        ViewerState::Closed => {}
        ViewerState::ShowingMedia { artifact, media } => {
            let kind = match media {
                MediaKind::Video => "Video",
                MediaKind::Image => "Image",
            };
            let location = if artifact.has_retrievable_file() {
                artifact.url.clone()
            } else {
                "no retrievable file".to_string()
            };
            let text = [
                format!("Name: {}", artifact.name),
                format!("Type: {kind}"),
                format!("Location: {location}"),
                String::new(),
                "Press d to download, Esc to close".to_string(),
            ]
            .join("\n");
            let p = Paragraph::new(text)
                .wrap(Wrap { trim: false })
                .block(Block::default().title(artifact.name.as_str()).borders(Borders::ALL));
            frame.render_widget(p, popup_area);
        }
        ViewerState::ShowingSpeedDashboard(data) => render_speed_dashboard(frame, popup_area, data),
    }
}

fn render_speed_dashboard(frame: &mut Frame, area: Rect, data: &SpeedMetrics) {
    let block = Block::default()
        .title("Player Speed Analysis")
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    let avg = Paragraph::new(speed_text(data.average_speed))
        .alignment(Alignment::Center)
        .block(Block::default().title("Average Speed").borders(Borders::ALL));
    frame.render_widget(avg, cards[0]);
    let max = Paragraph::new(speed_text(data.max_speed))
        .alignment(Alignment::Center)
        .block(Block::default().title("Maximum Speed").borders(Borders::ALL));
    frame.render_widget(max, cards[1]);

    frame.render_widget(
        Paragraph::new("Movement Intensity").style(Style::default().add_modifier(Modifier::BOLD)),
        rows[1],
    );

    let bands = [
        ("Walking/Standing", data.intensity.walking, Color::Blue),
        ("Jogging", data.intensity.jogging, Color::Yellow),
        ("Sprinting", data.intensity.sprinting, Color::Red),
    ];
    for (i, (label, value, color)) in bands.into_iter().enumerate() {
        frame.render_widget(intensity_gauge(label, value, color), rows[2 + i]);
    }
}

fn speed_text(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v} m/s"),
        None => "-".to_string(),
    }
}

fn intensity_gauge(label: &str, value: Option<f64>, color: Color) -> Gauge<'static> {
    let text = match value {
        Some(v) => format!("{v}%"),
        None => "-".to_string(),
    };
    // The share is shown as reported; only the bar fill is clamped.
    let ratio = value.unwrap_or(0.0).clamp(0.0, 100.0) / 100.0;
    Gauge::default()
        .block(Block::default().title(label.to_string()).borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(text)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Vision Terminal - Help",
        "",
        "Configuration:",
        "  1-4          Toggle analyses",
        "  Space        Toggle analysis under cursor",
        "  o            Open video file",
        "  r            Run analysis",
        "  c            Clear results / error",
        "",
        "Results:",
        "  Tab          Switch focus",
        "  j/k or ↑/↓   Move",
        "  Enter / v    View",
        "  d            Download",
        "  Esc / x      Close viewer",
        "",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
