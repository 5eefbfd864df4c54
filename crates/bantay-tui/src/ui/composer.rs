use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::app::App;

/// Broadcast composer overlay. Visibility is the shared notification-store
/// flag, so the header badge and this overlay never disagree.
pub fn render(f: &mut Frame, app: &App) {
    let area = centered(f.area(), 60, 5);
    f.render_widget(Clear, area);

    let body = Paragraph::new(vec![
        Line::from(Span::raw(format!("> {}", app.composer_input))),
        Line::from(Span::styled(
            "Enter:Queue  Esc:Cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Broadcast to all units "),
    );
    f.render_widget(body, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
