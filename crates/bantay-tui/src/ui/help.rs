use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

pub fn render(f: &mut Frame) {
    let area = f.area();
    let width = 44.min(area.width);
    let height = 12.min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);

    let lines = vec![
        Line::from("  ↑/k ↓/j   move selection"),
        Line::from("  d / Enter dismiss selected alert"),
        Line::from("  D         dismiss all (mark read)"),
        Line::from("  s         toggle audible cues"),
        Line::from("  b         open broadcast composer"),
        Line::from("  r         retry connection"),
        Line::from("  q / ^C    quit"),
        Line::from(""),
        Line::from(Span::styled(
            "  any key closes this help",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Keys "),
    );
    f.render_widget(body, popup);
}
