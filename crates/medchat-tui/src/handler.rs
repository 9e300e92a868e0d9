use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use log::{info, warn};

use crate::app::{App, DialogFocus, InputMode};
use crate::bridge::Command;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
        AppEvent::View(update) => app.apply(update),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Chat => handle_chat_mode(app, key),
        InputMode::Attach => handle_attach_mode(app, key),
    }
}

fn handle_chat_mode(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('r') => app.dispatch(Command::ToggleRecording),
            KeyCode::Char('a') => app.open_attach_dialog(DialogFocus::RecentFiles),
            KeyCode::Char('o') => app.open_attach_dialog(DialogFocus::PathInput),
            KeyCode::Char('x') => app.dispatch(Command::CancelAttachment),
            KeyCode::Char('p') => open_latest_media(app),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.submit(),

        // Editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }

        // Scrolling the log
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        _ => {}
    }
}

fn handle_attach_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_attach_dialog(),
        KeyCode::Tab | KeyCode::BackTab => {
            app.dialog_focus = match app.dialog_focus {
                DialogFocus::RecentFiles => DialogFocus::PathInput,
                DialogFocus::PathInput => DialogFocus::RecentFiles,
            };
        }
        _ => match app.dialog_focus {
            DialogFocus::RecentFiles => handle_recent_list(app, key),
            DialogFocus::PathInput => handle_path_input(app, key),
        },
    }
}

fn handle_recent_list(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.recent_nav_down(),
        KeyCode::Up | KeyCode::Char('k') => app.recent_nav_up(),
        KeyCode::Enter => {
            if let Some(file) = app.selected_recent() {
                let command = Command::SelectRecent(file.file_path.clone());
                app.dispatch(command);
            }
        }
        KeyCode::Delete | KeyCode::Char('d') => {
            if let Some(file) = app.selected_recent() {
                let command = Command::RemoveRecent(file.file_path.clone());
                app.dispatch(command);
            }
        }
        _ => {}
    }
}

fn handle_path_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if let Some(path) = dropped_path(&app.path_input) {
                app.upload(path);
            }
        }
        KeyCode::Backspace => {
            app.path_input.pop();
        }
        KeyCode::Char(c) => {
            app.path_input.push(c);
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    match (app.input_mode, app.dialog_focus) {
        (InputMode::Attach, DialogFocus::PathInput) => app.path_input.push_str(text.trim()),
        (mode, _) => match dropped_path(text).filter(|path| path.is_file()) {
            Some(path) => {
                info!("Dropped file: {}", path.display());
                app.upload(path);
            }
            None if mode == InputMode::Chat => app.insert_text(text),
            None => {}
        },
    }
}

/// Turn pasted or typed text into a local path.
///
/// Terminals deliver a dropped file as its path, either quoted or with
/// spaces backslash-escaped.
pub fn dropped_path(text: &str) -> Option<PathBuf> {
    let text = text.trim();
    let unquoted = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .or_else(|| text.strip_prefix('"').and_then(|t| t.strip_suffix('"')));

    let path = match unquoted {
        Some(inner) => inner.to_string(),
        None => text.replace("\\ ", " "),
    };
    let path = path.strip_prefix("file://").map(str::to_string).unwrap_or(path);

    if path.is_empty() || path.contains('\n') {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

fn open_latest_media(app: &App) {
    let Some(url) = app.latest_media_url() else {
        return;
    };
    if let Err(e) = open::that(&url) {
        warn!("Failed to open {}: {}", url, e);
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
