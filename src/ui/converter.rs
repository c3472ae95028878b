//! Converter screen rendering
//!
//! Renders the rate card, the two converter fields, and the conversion table.

use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Field, FAILED_MESSAGE};
use crate::format::{display_rate_date, format_date, format_number};
use crate::rate::{LoadState, RateOrigin};

/// Renders the full converter screen
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(5), // Rate card
            Constraint::Length(6), // Converter
            Constraint::Min(4),    // Table
            Constraint::Length(1), // Footer
        ])
        .split(area);

    render_header(frame, chunks[0]);
    render_rate_card(frame, app, chunks[1]);
    render_converter(frame, app, chunks[2]);
    render_table(frame, app, chunks[3]);
    render_footer(frame, app, chunks[4]);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let today = format_date(Local::now().date_naive());
    let line = Line::from(vec![
        Span::styled(
            " Dólar a Lempira ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("· {}", today), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Rate text and date text for the current load state
fn rate_lines(status: &LoadState) -> (Span<'static>, Span<'static>) {
    match status {
        LoadState::Idle | LoadState::Loading => (
            Span::styled("L ---.--", Style::default().fg(Color::DarkGray)),
            Span::styled("cargando...", Style::default().fg(Color::DarkGray)),
        ),
        LoadState::Ready { record, .. } | LoadState::Degraded { record } => (
            Span::styled(
                format!("L {}", format_number(record.value(), 2)),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(display_rate_date(record.as_of_date())),
        ),
        LoadState::Failed => (
            Span::styled(
                "Error",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled("No disponible", Style::default().fg(Color::Red)),
        ),
    }
}

fn render_rate_card(frame: &mut Frame, app: &App, area: Rect) {
    let (rate, date) = rate_lines(&app.status);

    let mut title_spans = vec![Span::raw(" 1 USD ")];
    if let Some(advisory) = &app.advisory {
        title_spans.push(Span::styled(
            format!(" \u{26A0} {} ", advisory.message),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let source = match &app.status {
        LoadState::Ready {
            origin: RateOrigin::Cache,
            ..
        } => "cached",
        LoadState::Ready {
            origin: RateOrigin::Network,
            ..
        } => "live",
        LoadState::Degraded { .. } => "last known",
        _ => "",
    };

    let lines = vec![
        Line::from(rate),
        Line::from(vec![Span::raw("Updated: "), date]),
        Line::from(Span::styled(source, Style::default().fg(Color::DarkGray))),
    ];

    let border = if matches!(app.status, LoadState::Degraded { .. }) {
        Color::Yellow
    } else {
        Color::Cyan
    };
    let block = Block::default()
        .title(Line::from(title_spans))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn input_line(label: &str, prefix: &str, value: &str, focused: bool, enabled: bool) -> Line<'static> {
    let value_style = if !enabled {
        Style::default().fg(Color::DarkGray)
    } else if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let cursor = if focused && enabled { "\u{258F}" } else { "" };
    let marker = if focused { "\u{25B6} " } else { "  " };

    Line::from(vec![
        Span::styled(marker.to_string(), Style::default().fg(Color::Yellow)),
        Span::styled(format!("{:<6}", label), Style::default().fg(Color::Cyan)),
        Span::raw(prefix.to_string()),
        Span::styled(format!("{}{}", value, cursor), value_style),
    ])
}

fn render_converter(frame: &mut Frame, app: &App, area: Rect) {
    let enabled = app.inputs_enabled();
    let block = Block::default()
        .title(" Converter ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let lines = if enabled {
        vec![
            input_line("USD", "$ ", &app.usd_input, app.focus == Field::Usd, enabled),
            input_line("HNL", "L ", &app.local_input, app.focus == Field::Local, enabled),
            Line::from(Span::styled(
                "  s: swap   Tab: switch field",
                Style::default().fg(Color::DarkGray),
            )),
        ]
    } else {
        vec![
            Line::from(Span::styled(
                format!("\u{26A0} {}", FAILED_MESSAGE),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Check your internet connection and press r to retry.",
                Style::default().fg(Color::Red),
            )),
            input_line("USD", "$ ", &app.usd_input, false, enabled),
            input_line("HNL", "L ", &app.local_input, false, enabled),
        ]
    };

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Quick conversions ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.table.is_empty() {
        let placeholder = Paragraph::new("No rate available")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let lines: Vec<Line> = app
        .table
        .iter()
        .map(|row| {
            Line::from(vec![
                Span::styled(format!("  {:>8}", row.usd_display()), Style::default().fg(Color::Cyan)),
                Span::raw("   "),
                Span::raw(format!("{:>16}", row.local_display())),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let refreshed = app
        .last_refresh
        .map(|t| format!("Checked {}", t.format("%H:%M")))
        .unwrap_or_default();
    let line = Line::from(vec![
        Span::styled(
            " q: quit  r: refresh  ?: help ",
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(refreshed, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
