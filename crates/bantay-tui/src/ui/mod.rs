mod alerts;
mod composer;
mod help;

use ratatui::prelude::*;

use bantay_types::connection::ConnectionState;

use crate::app::App;

/// Main render function — header, alert panel, footer, overlays.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(1),   // alert panel
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    alerts::render(f, app, chunks[1]);
    render_footer(f, app, chunks[2]);

    if app.composer_open() {
        composer::render(f, app);
    }
    if app.show_help {
        help::render(f);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let urgent = app.client.urgent_alert_count();
    let badge_style = if urgent > 0 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let header = Line::from(vec![
        Span::styled(
            " Bantay Dispatch ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("⚠ {urgent} "), badge_style),
        Span::raw(format!("({} alerts)  ", app.alerts.len())),
        connection_indicator(app.connection),
    ]);
    f.render_widget(ratatui::widgets::Paragraph::new(header), area);
}

/// Persistent, non-alarming indicator: transient loss shows as a yellow
/// "reconnecting", never a modal.
fn connection_indicator(state: ConnectionState) -> Span<'static> {
    let (symbol, color) = match state {
        ConnectionState::Connected => ("● connected", Color::Green),
        ConnectionState::Connecting => ("◌ connecting", Color::Yellow),
        ConnectionState::Reconnecting => ("◌ reconnecting", Color::Yellow),
        ConnectionState::Disconnected => ("○ offline", Color::DarkGray),
        ConnectionState::Failed => ("✖ link failed — press r", Color::Red),
    };
    Span::styled(symbol, Style::default().fg(color))
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let footer = if app.status_line.is_empty() {
        Line::from(vec![
            Span::styled(" ↑↓", Style::default().fg(Color::Yellow)),
            Span::raw(":Select  "),
            Span::styled("d", Style::default().fg(Color::Yellow)),
            Span::raw(":Dismiss  "),
            Span::styled("D", Style::default().fg(Color::Yellow)),
            Span::raw(":Dismiss all  "),
            Span::styled("s", Style::default().fg(Color::Yellow)),
            Span::raw(if app.client.sound_enabled() {
                ":Mute  "
            } else {
                ":Unmute  "
            }),
            Span::styled("b", Style::default().fg(Color::Yellow)),
            Span::raw(":Broadcast  "),
            Span::styled("?", Style::default().fg(Color::Yellow)),
            Span::raw(":Help  "),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(":Quit"),
        ])
        .style(Style::default().fg(Color::DarkGray))
    } else {
        Line::from(Span::styled(
            format!(" {}", app.status_line),
            Style::default().fg(Color::Blue),
        ))
    };
    f.render_widget(ratatui::widgets::Paragraph::new(footer), area);
}
