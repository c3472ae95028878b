//! Key help popup for the converter

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Key bindings grouped by section, in display order
const SECTIONS: [(&str, &[(&str, &str)]); 2] = [
    (
        "Converter",
        &[
            ("0-9 . ,", "Type an amount"),
            ("Backspace", "Delete last digit"),
            ("Delete", "Clear field"),
            ("Tab ↑ ↓", "Switch USD / HNL field"),
            ("s", "Swap amounts"),
        ],
    ),
    (
        "Rate",
        &[
            ("r", "Reload the exchange rate"),
            ("?", "Toggle this help"),
            ("q Esc", "Quit"),
        ],
    ),
];

const POPUP_WIDTH: u16 = 44;

fn help_lines() -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (title, keys) in SECTIONS {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.extend(keys.iter().map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!(" {:<11}", key), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ])
        }));
    }
    lines
}

/// Centers a `width` x `height` box in `area`, shrinking it to fit
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    popup
}

/// Draws the key help over whatever is on screen
pub fn render(frame: &mut Frame) {
    let lines = help_lines();
    // Two border rows plus the hint line
    let height = lines.len() as u16 + 3;
    let area = popup_area(frame.area(), POPUP_WIDTH, height);

    let block = Block::default()
        .title(" Keys ")
        .title_bottom(Line::from(" ? or Esc closes ").style(Style::default().fg(Color::DarkGray)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(render).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_lists_every_binding() {
        let content = draw(80, 24);

        assert!(content.contains("Keys"));
        for (_, keys) in SECTIONS {
            for (_, action) in keys {
                assert!(content.contains(action), "missing '{}'", action);
            }
        }
    }

    #[test]
    fn test_popup_is_centered_and_sized_to_content() {
        let area = popup_area(Rect::new(0, 0, 80, 24), POPUP_WIDTH, 10);
        assert_eq!(area, Rect::new(18, 7, POPUP_WIDTH, 10));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        draw(20, 5);
    }
}
