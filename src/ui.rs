use picochat_core::{ConnectionStatus, Mode};
use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::app::{App, MessageKind};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, messages, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_messages(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = app.session.connection_status();
    let status_color = match status {
        ConnectionStatus::Checking => Color::Yellow,
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Failed(_) => Color::Red,
    };
    let mode_color = match app.session.current_mode() {
        Mode::Continuation => Color::Magenta,
        Mode::Chat => Color::Cyan,
    };

    let title = Line::from(vec![
        Span::styled(" picochat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!(" {} mode ", app.session.current_mode_label()),
            Style::default().bg(mode_color).fg(Color::Black),
        ),
        Span::raw("  "),
        Span::styled(status.label(), Style::default().fg(status_color)),
        Span::styled(
            format!("  {}", app.session.base_url()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size minus borders, used for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Messages ");

    let text = if app.messages.is_empty() {
        Text::from(Span::styled(
            "Type something and press Enter...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for (idx, msg) in app.messages.iter().enumerate() {
            let (label, color) = match msg.kind {
                MessageKind::User => ("You:", Color::Cyan),
                MessageKind::Assistant => ("AI:", Color::Yellow),
                MessageKind::System => ("System:", Color::DarkGray),
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));

            if app.placeholder == Some(idx) {
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat(app.animation_frame as usize + 1);
                lines.push(Line::from(Span::styled(
                    format!("{}{}", msg.content, dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                let style = match msg.kind {
                    MessageKind::System => Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
                    _ => Style::default(),
                };
                for line in msg.content.lines() {
                    lines.push(Line::from(Span::styled(line.to_string(), style)));
                }
            }
            lines.push(Line::default());
        }

        Text::from(lines)
    };

    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    frame.render_widget(paragraph, area);

    let scrollable = app.total_lines().saturating_sub(app.chat_height) as usize;
    let mut scrollbar_state = ScrollbarState::new(scrollable).position(app.scroll as usize);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        area,
        &mut scrollbar_state,
    );
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.is_busy() { Color::DarkGray } else { Color::Cyan };
    let title = if app.is_busy() {
        " Waiting for reply... "
    } else {
        match app.session.current_mode() {
            Mode::Continuation => " Text to continue ",
            Mode::Chat => " Message ",
        }
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Keep the cursor visible when the input is wider than the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let skip = app.cursor.saturating_sub(inner_width.saturating_sub(1));
    let visible: String = app
        .input
        .chars()
        .skip(skip)
        .map(|c| if c == '\n' { '⏎' } else { c })
        .collect();

    frame.render_widget(Paragraph::new(visible).block(block), area);

    if !app.is_busy() {
        let cursor_x = area.x + 1 + (app.cursor - skip) as u16;
        frame.set_cursor_position(Position::new(cursor_x, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let send_label = if app.can_send() { " send " } else { " (send) " };

    let hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(send_label, label_style),
        Span::styled(" ^T/F2 ", key_style),
        Span::styled(" mode ", label_style),
        Span::styled(" F3/F4 ", key_style),
        Span::styled(format!(" temp {:.1} ", app.params.temperature), label_style),
        Span::styled(" F5/F6 ", key_style),
        Span::styled(format!(" max tokens {} ", app.params.max_tokens), label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}
