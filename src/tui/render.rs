//! Rendering for the chat view.
//!
//! Pure functions from [`ChatApp`] state to ratatui widgets, kept free of
//! any connection or terminal-setup concerns so they can be exercised with
//! a `TestBackend`.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use super::app::{ChatApp, Phase, Speaker};

/// Render the whole chat view: status header, transcript, input line.
pub fn draw(frame: &mut Frame<'_>, app: &ChatApp) {
    let [header, transcript, input] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    draw_header(frame, header, app);
    draw_transcript(frame, transcript, app);
    draw_input(frame, input, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &ChatApp) {
    let (text, style) = match app.phase() {
        Phase::Connecting => (
            "Connecting...".to_string(),
            Style::default().fg(Color::Yellow),
        ),
        Phase::Listening { port } => (
            format!("Server started on port {port}. Waiting for a connection."),
            Style::default().fg(Color::Yellow),
        ),
        Phase::Active => (
            format!(
                "Connected to {} on port {}",
                app.peer().unwrap_or("?"),
                app.local_port().map_or_else(|| "?".to_string(), |p| p.to_string()),
            ),
            Style::default().fg(Color::Green),
        ),
        Phase::PeerClosed => (
            "The connection was closed by the other side. Press any key to exit.".to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Phase::Failed(err) => (
            format!("Connection error: {err}. Press any key to exit."),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_transcript(frame: &mut Frame<'_>, area: Rect, app: &ChatApp) {
    let peer_label = app.peer().unwrap_or("Peer");
    let lines: Vec<Line<'_>> = app
        .transcript()
        .iter()
        .map(|entry| {
            let stamp = Span::styled(
                format!("[{}] ", entry.at),
                Style::default().fg(Color::DarkGray),
            );
            match entry.speaker {
                Speaker::You => Line::from(vec![
                    stamp,
                    Span::styled(
                        "You: ",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(entry.text.clone()),
                ]),
                Speaker::Peer => Line::from(vec![
                    stamp,
                    Span::styled(
                        format!("{peer_label}: "),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(entry.text.clone()),
                ]),
                Speaker::Notice => Line::from(vec![
                    stamp,
                    Span::styled(
                        entry.text.clone(),
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::ITALIC),
                    ),
                ]),
            }
        })
        .collect();

    // Pin the view to the newest entries. Wrapped lines make this an
    // approximation, which is fine for a chat transcript.
    let inner_height = area.height.saturating_sub(2) as usize;
    let offset = lines.len().saturating_sub(inner_height) as u16;

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Messages"))
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(paragraph, area);
}

fn draw_input(frame: &mut Frame<'_>, area: Rect, app: &ChatApp) {
    let width = area.width.saturating_sub(2) as usize;
    let scroll = app.input().visual_scroll(width);
    let paragraph = Paragraph::new(app.input().value())
        .scroll((0, scroll as u16))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Message - Enter to send, Esc to close"),
        );
    frame.render_widget(paragraph, area);

    if app.phase() == &Phase::Active {
        let cursor_x = area.x + 1 + (app.input().visual_cursor().saturating_sub(scroll)) as u16;
        frame.set_cursor_position((cursor_x, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::{ConnectionEvent, Inbox};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render_to_text(app: &ChatApp) -> String {
        let backend = TestBackend::new(70, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_renders_listening_header() {
        let inbox = Inbox::new();
        let mut app = ChatApp::new();
        app.apply_event(ConnectionEvent::Listening { port: 4000 }, &inbox);

        let text = render_to_text(&app);
        assert!(text.contains("Server started on port 4000"));
    }

    #[test]
    fn test_renders_active_header_and_messages() {
        let inbox = Inbox::new();
        let mut app = ChatApp::new();
        app.apply_event(
            ConnectionEvent::Established {
                peer: "10.0.0.2:5000".to_string(),
                local_port: 4000,
            },
            &inbox,
        );
        inbox.push("hello there".to_string());
        app.apply_event(ConnectionEvent::InboxReady, &inbox);
        app.push_local("hi yourself".to_string());

        let text = render_to_text(&app);
        assert!(text.contains("Connected to 10.0.0.2:5000 on port 4000"));
        assert!(text.contains("10.0.0.2:5000: hello there"));
        assert!(text.contains("You: hi yourself"));
    }

    #[test]
    fn test_renders_peer_closed_state() {
        let inbox = Inbox::new();
        let mut app = ChatApp::new();
        app.apply_event(ConnectionEvent::PeerClosed, &inbox);

        let text = render_to_text(&app);
        assert!(text.contains("closed by the other side"));
        assert!(text.contains("Press any key to exit"));
    }
}
