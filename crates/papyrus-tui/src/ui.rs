use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ConnectionStatus, DisplayMessage, InputMode, MessageKind, MessageRole};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Body
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(f.size());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(30)])
        .split(chunks[1]);

    draw_header(f, app, chunks[0]);
    draw_messages(f, app, body[0]);
    draw_files(f, app, body[1]);
    draw_input(f, app, chunks[2]);
    draw_status_bar(f, app, chunks[3]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let status_color = match app.status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Disconnected => Color::Red,
        ConnectionStatus::Error => Color::Red,
    };

    let header_text = Line::from(vec![
        Span::styled(
            " Papyrus Chat",
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Cyan),
        ),
        Span::styled("  |  ", Style::default().fg(Color::Gray)),
        Span::styled(app.status.to_string(), Style::default().fg(status_color)),
        Span::styled("  |  ", Style::default().fg(Color::Gray)),
        Span::styled(app.session_id.as_str(), Style::default().fg(Color::DarkGray)),
        if app.busy {
            Span::styled("  ◐ Thinking...", Style::default().fg(Color::Yellow))
        } else {
            Span::raw("")
        },
    ]);

    let header = Paragraph::new(header_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}

fn draw_messages(f: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app.messages.iter().flat_map(format_message).collect();

    // scroll_offset 为距底部的行数
    let visible_height = area.height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(visible_height);
    let top = max_scroll.saturating_sub(app.scroll_offset.min(max_scroll));

    let messages = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Messages")
                .border_style(Style::default().fg(Color::Blue)),
        )
        .scroll((u16::try_from(top).unwrap_or(u16::MAX), 0));

    f.render_widget(messages, area);
}

fn format_message(msg: &DisplayMessage) -> Vec<Line<'_>> {
    let (prefix, style) = match msg.role {
        MessageRole::User => ("You: ", Style::default().fg(Color::Cyan)),
        MessageRole::Assistant => ("Bot: ", Style::default().fg(Color::Green)),
        MessageRole::System => ("* ", Style::default().fg(Color::Yellow)),
    };

    let mut lines = Vec::new();
    match msg.kind {
        MessageKind::File => lines.push(Line::from(vec![
            Span::styled(prefix, style),
            Span::styled(format!("📎 {}", msg.content), style.add_modifier(Modifier::BOLD)),
        ])),
        MessageKind::Text => {
            for (i, text) in msg.content.lines().enumerate() {
                let lead = if i == 0 { prefix } else { "     " };
                lines.push(Line::from(vec![
                    Span::styled(lead, style),
                    Span::styled(text, style),
                ]));
            }
        }
    }

    lines.push(Line::from(vec![Span::styled(
        format!("   └─ {} ", msg.timestamp.format("%H:%M:%S")),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )]));
    lines.push(Line::from(""));

    lines
}

fn draw_files(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Uploaded Files")
        .border_style(Style::default().fg(Color::Blue));

    if app.uploaded_files.is_empty() {
        let empty = Paragraph::new("No files uploaded yet.")
            .style(Style::default().fg(Color::Gray))
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .uploaded_files
        .iter()
        .map(|file| ListItem::new(format!("📎 {}", file.filename)))
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let (title, placeholder, color) = match app.input_mode {
        InputMode::Chat => ("Message", "Ask a question...", Color::Green),
        InputMode::Attach => ("Attach PDF (path)", "Path to a PDF file...", Color::Magenta),
    };

    let input_text = if app.busy {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::styled(
                "Waiting for the backend...",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    } else if app.input.is_empty() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(color)),
            Span::styled(
                placeholder,
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(color)),
            Span::styled(app.input.as_str(), Style::default().fg(Color::White)),
            Span::styled("▌", Style::default().fg(color)),
        ])
    };

    let input = Paragraph::new(input_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(color)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(input, area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.input_mode {
        InputMode::Chat => "[Enter] Send  [Ctrl+A] Attach  [Ctrl+L] Clear Chat  [Ctrl+D] Clear Files  [Ctrl+C] Quit",
        InputMode::Attach => "[Enter] Upload  [Ctrl+A/Esc] Cancel  [Ctrl+C] Quit",
    };

    let status = format!(
        " Messages: {} | Files: {} | {}",
        app.messages.len(),
        app.uploaded_files.len(),
        help_text
    );

    let status_bar = Paragraph::new(status)
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::REVERSED),
        );

    f.render_widget(status_bar, area);
}
