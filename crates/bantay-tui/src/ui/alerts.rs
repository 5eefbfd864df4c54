use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use bantay_types::alert::AlertSeverity;

use crate::app::App;

pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if app.alerts.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "  No live alerts. Incoming incidents will appear here.",
            Style::default().fg(Color::DarkGray),
        )))
        .block(Block::default().borders(Borders::TOP));
        f.render_widget(empty, area);
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let visible = area.height.saturating_sub(1) as usize;

    // Keep the cursor on screen
    let start = app.cursor.saturating_sub(visible.saturating_sub(1));

    let lines: Vec<Line> = app
        .alerts
        .iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(i, alert)| {
            let selected = i == app.cursor;
            let marker = if selected { "▸" } else { " " };
            let text = format!(
                "{marker} {} {}  {} — {}",
                severity_tag(alert.severity),
                alert.timestamp.format("%H:%M:%S"),
                alert.title,
                alert.message,
            );
            let text = truncate(&text, width);
            let mut style = Style::default().fg(severity_color(alert.severity));
            if selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(Span::styled(text, style))
        })
        .collect();

    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::TOP))
        .wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}

fn severity_tag(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Critical => "[CRIT]",
        AlertSeverity::Warning => "[WARN]",
        AlertSeverity::Info => "[INFO]",
    }
}

fn severity_color(severity: AlertSeverity) -> Color {
    match severity {
        AlertSeverity::Critical => Color::Red,
        AlertSeverity::Warning => Color::Yellow,
        AlertSeverity::Info => Color::Blue,
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        if out.width() + 1 >= width {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}
