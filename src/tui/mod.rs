use crate::events::EventDrain;
use crate::observer::PlanView;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Duration;

const UI_POLL_INTERVAL: Duration = Duration::from_millis(60);

/// Full-screen cockpit over the event stream. All state comes from the
/// `PlanView`; this layer only draws it and watches for exit keys. After the
/// terminal event arrives the cockpit stays up until the operator dismisses
/// it.
pub fn run_cockpit(drain: &EventDrain, view: &mut PlanView) -> Result<(), String> {
    let mut terminal = setup_terminal()?;
    let result = run_event_loop(&mut terminal, drain, view);
    teardown_terminal(&mut terminal)?;
    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    drain: &EventDrain,
    view: &mut PlanView,
) -> Result<(), String> {
    loop {
        for event in drain.drain_available() {
            view.apply(&event);
        }
        draw_cockpit(terminal, view)?;

        if !event::poll(UI_POLL_INTERVAL).map_err(|e| format!("failed to poll events: {e}"))? {
            continue;
        }
        let Event::Key(key) = event::read().map_err(|e| format!("failed to read event: {e}"))?
        else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            break;
        }
        match key.code {
            KeyCode::Esc => break,
            KeyCode::Char('q') if view.is_finished() => break,
            _ => {}
        }
    }
    Ok(())
}

fn draw_cockpit(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    view: &PlanView,
) -> Result<(), String> {
    terminal
        .draw(|frame| {
            let sections = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(4),
                    Constraint::Min(8),
                    Constraint::Length(1),
                ])
                .split(frame.area());

            let header = Paragraph::new(vec![
                Line::raw(format!("Goal: {}", view.goal)),
                Line::raw(view.status_line()),
            ])
            .block(
                Block::default()
                    .title("Foreman")
                    .borders(Borders::ALL)
                    .border_style(if view.is_finished() {
                        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::Cyan)
                    }),
            );
            frame.render_widget(header, sections[0]);

            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(sections[1]);

            let plan_lines: Vec<Line> = view
                .plan_lines()
                .into_iter()
                .map(|line| {
                    let style = if line.starts_with("[✘]") {
                        Style::default().fg(Color::Red)
                    } else if line.starts_with("[✔]") {
                        Style::default().fg(Color::Green)
                    } else if line.starts_with("[▶]") {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default().fg(Color::Gray)
                    };
                    Line::styled(line, style)
                })
                .collect();
            let plan_widget = Paragraph::new(plan_lines)
                .block(Block::default().title("Plan").borders(Borders::ALL))
                .wrap(Wrap { trim: false });
            frame.render_widget(plan_widget, panes[0]);

            let visible = pane_tail(&view.log, panes[1].height);
            let log_lines: Vec<Line> = visible.iter().map(|line| Line::raw(line.clone())).collect();
            let log_widget = Paragraph::new(log_lines)
                .block(Block::default().title("Log").borders(Borders::ALL))
                .wrap(Wrap { trim: false });
            frame.render_widget(log_widget, panes[1]);

            let footer_hint = if view.is_finished() {
                "q to exit"
            } else {
                "Ctrl-C to abort"
            };
            let footer = Paragraph::new(format!(
                "Project: {} | {}",
                view.project_label, footer_hint
            ))
            .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(footer, sections[2]);
        })
        .map_err(|e| format!("failed to render cockpit: {e}"))?;
    Ok(())
}

fn pane_tail(log: &[String], pane_height: u16) -> &[String] {
    let visible_rows = pane_height.saturating_sub(2) as usize;
    let skip = log.len().saturating_sub(visible_rows);
    &log[skip..]
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, String> {
    enable_raw_mode().map_err(|e| format!("failed to enable raw mode: {e}"))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)
        .map_err(|e| format!("failed to enter alternate screen: {e}"))?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| format!("failed to initialize terminal: {e}"))
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), String> {
    disable_raw_mode().map_err(|e| format!("failed to disable raw mode: {e}"))?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)
        .map_err(|e| format!("failed to leave alternate screen: {e}"))?;
    terminal
        .show_cursor()
        .map_err(|e| format!("failed to restore cursor: {e}"))?;
    Ok(())
}
