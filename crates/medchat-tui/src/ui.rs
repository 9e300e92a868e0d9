use medchat_core::message::basename;
use medchat_core::{AttachmentKind, ChatRole};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::{App, DialogFocus, InputMode, LogEntry};

/// Ensure the selected item in a list is visible by adjusting the ListState offset.
fn ensure_selected_visible(state: &mut ListState, visible_height: usize) {
    let visible_height = visible_height.max(1);

    if let Some(selected) = state.selected() {
        let min_offset = selected.saturating_sub(visible_height - 1);
        let max_offset = selected;

        let new_offset = state.offset().clamp(min_offset, max_offset);
        if new_offset != state.offset() {
            *state.offset_mut() = new_offset;
        }
    }
}

/// Wrap text to fit within a given width, returning multiple lines
/// Uses word boundaries for wrapping (doesn't break mid-word)
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(current_line);
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let preview_height = if app.attachment.is_some() { 3 } else { 0 };

    // Main layout: header, log, attachment preview, input, footer
    let [header_area, log_area, preview_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(preview_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_log(app, frame, log_area);
    if preview_height > 0 {
        render_attachment(app, frame, preview_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::Attach {
        render_attach_dialog(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" MedChat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.server_url.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if app.recording {
        spans.push(Span::styled(
            "  ● REC",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Lines for one log entry, already wrapped to `width`
fn entry_lines(entry: &LogEntry, width: usize) -> Vec<Line<'static>> {
    let message = &entry.message;
    let mut lines = Vec::new();

    let (label, label_color) = match message.role {
        ChatRole::User => ("You:", Color::Cyan),
        ChatRole::Assistant => ("Assistant:", Color::Yellow),
    };
    lines.push(Line::from(Span::styled(
        label,
        Style::default().fg(label_color).add_modifier(Modifier::BOLD),
    )));

    if let Some(path) = &message.file_path {
        match AttachmentKind::from_path(path) {
            AttachmentKind::Image => lines.push(Line::from(Span::styled(
                format!("[image] {}", path),
                Style::default().fg(Color::Magenta),
            ))),
            AttachmentKind::Pdf => lines.push(Line::from(Span::styled(
                format!("View PDF: {}", basename(path)),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            ))),
            AttachmentKind::None => {}
        }
    }

    if let Some(text) = entry.visible_text() {
        let style = if message.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        for paragraph in text.lines() {
            for line in wrap_text_to_width(paragraph, width) {
                lines.push(Line::from(Span::styled(line, style)));
            }
        }
    }

    if let Some(audio) = &message.audio_path {
        lines.push(Line::from(Span::styled(
            format!("[audio] {} (Ctrl+P to play)", basename(audio)),
            Style::default().fg(Color::Green),
        )));
    }

    lines.push(Line::default());
    lines
}

fn render_log(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store inner dimensions for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    let width = app.chat_width as usize;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let mut lines: Vec<Line> = Vec::new();
    if app.log.is_empty() && !app.thinking {
        lines.push(Line::from(Span::styled(
            "Ask a question, attach an image or PDF (Ctrl+A), or record audio (Ctrl+R)...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for entry in &app.log {
        lines.extend(entry_lines(entry, width));
    }

    if app.thinking {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let bottom = max_scroll(lines.len(), app.chat_height);
    if app.follow || app.scroll >= bottom {
        app.scroll = bottom;
        app.follow = true;
    }

    let log = Paragraph::new(lines).block(block).scroll((app.scroll, 0));
    frame.render_widget(log, area);
}

/// Topmost scroll offset that still fills the viewport
fn max_scroll(line_count: usize, height: u16) -> u16 {
    u16::try_from(line_count).unwrap_or(u16::MAX).saturating_sub(height)
}

fn render_attachment(app: &App, frame: &mut Frame, area: Rect) {
    let Some(file) = &app.attachment else {
        return;
    };

    let kind = match AttachmentKind::from_path(&file.file_path) {
        AttachmentKind::Image => "image",
        AttachmentKind::Pdf => "pdf",
        AttachmentKind::None => "file",
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Attachment (Ctrl+X to remove) ");

    let preview = Paragraph::new(Line::from(vec![
        Span::styled(format!("[{}] ", kind), Style::default().fg(Color::Magenta)),
        Span::raw(file.filename.clone()),
    ]))
    .block(block);

    frame.render_widget(preview, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.is_busy() { Color::DarkGray } else { Color::Yellow };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if app.input_mode == InputMode::Chat {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Chat => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Attach => (" ATTACH ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mic_label = if app.recording { " stop " } else { " record " };
    let hints: Vec<(&str, &str)> = match app.input_mode {
        InputMode::Chat => vec![
            ("Enter", " send "),
            ("^R", mic_label),
            ("^A", " attach "),
            ("^O", " open path "),
            ("^X", " remove "),
            ("^P", " play/view "),
            ("Esc", " quit "),
        ],
        InputMode::Attach => vec![
            ("↑↓", " select "),
            ("Enter", " use "),
            ("Del", " forget "),
            ("Tab", " path "),
            ("Esc", " close "),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_attach_dialog(app: &mut App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let list_height = app.recent_files.len().max(1) as u16 + 2;
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = (list_height + 3 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Attach File ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [list_area, path_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(inner);

    let list_focused = app.dialog_focus == DialogFocus::RecentFiles;
    let focus_color = |focused: bool| if focused { Color::Yellow } else { Color::DarkGray };

    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(focus_color(list_focused)))
        .title(" Recent files ");

    if app.recent_files.is_empty() {
        let empty = Paragraph::new(Span::styled(
            " No recent files",
            Style::default().fg(Color::DarkGray),
        ))
        .block(list_block);
        frame.render_widget(empty, list_area);
    } else {
        let items: Vec<ListItem> = app
            .recent_files
            .iter()
            .map(|file| {
                let icon = match AttachmentKind::from_path(&file.file_path) {
                    AttachmentKind::Pdf => "pdf",
                    _ => "img",
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("[{}] ", icon), Style::default().fg(Color::Magenta)),
                    Span::raw(file.filename.clone()),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(list_block)
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let visible_height = list_area.height.saturating_sub(2) as usize;
        ensure_selected_visible(&mut app.recent_state, visible_height);
        frame.render_stateful_widget(list, list_area, &mut app.recent_state);
    }

    let path_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(focus_color(!list_focused)))
        .title(" Path (type or drop a file) ");

    let inner_width = path_area.width.saturating_sub(2) as usize;
    let path_len = app.path_input.chars().count();
    let skip = path_len.saturating_sub(inner_width.saturating_sub(1));
    let visible: String = app.path_input.chars().skip(skip).collect();
    let visible_len = visible.chars().count() as u16;

    frame.render_widget(
        Paragraph::new(visible)
            .style(Style::default().fg(Color::Cyan))
            .block(path_block),
        path_area,
    );

    if !list_focused {
        frame.set_cursor_position((path_area.x + 1 + visible_len, path_area.y + 1));
    }
}
