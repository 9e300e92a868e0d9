use std::path::PathBuf;

use log::warn;
use medchat_core::{ChatMessage, FileRef};
use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::bridge::{Command, ViewEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Typing into the chat input
    Chat,
    /// Attach dialog is open
    Attach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogFocus {
    #[default]
    RecentFiles,
    PathInput,
}

/// A message in the log plus how much of its text has been revealed
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub message: ChatMessage,
    pub revealed: usize,
}

impl LogEntry {
    fn new(message: ChatMessage, animate: bool) -> Self {
        let revealed = if animate { 0 } else { char_len(&message) };
        Self { message, revealed }
    }

    pub fn is_revealing(&self) -> bool {
        self.revealed < char_len(&self.message)
    }

    /// Text visible so far
    pub fn visible_text(&self) -> Option<String> {
        self.message
            .text
            .as_ref()
            .map(|text| text.chars().take(self.revealed).collect())
    }
}

fn char_len(message: &ChatMessage) -> usize {
    message.text.as_ref().map(|t| t.chars().count()).unwrap_or(0)
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub server_url: String,

    // Chat input
    pub input: String,
    pub cursor: usize, // cursor position in input (chars)

    // Message log
    pub log: Vec<LogEntry>,
    pub thinking: bool,
    awaiting_reply: bool, // Send/UploadPath queued, controller has not answered yet
    pub scroll: u16,
    pub follow: bool, // stick to the bottom as messages arrive
    pub chat_height: u16,
    pub chat_width: u16,

    // Attachments
    pub attachment: Option<FileRef>,
    pub recent_files: Vec<FileRef>,
    pub recent_state: ListState,
    pub dialog_focus: DialogFocus,
    pub path_input: String,

    // Microphone
    pub recording: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    ticks: u32,

    commands: mpsc::UnboundedSender<Command>,
}

impl App {
    pub fn new(server_url: String, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Chat,
            server_url,

            input: String::new(),
            cursor: 0,

            log: Vec::new(),
            thinking: false,
            awaiting_reply: false,
            scroll: 0,
            follow: true,
            chat_height: 0,
            chat_width: 0,

            attachment: None,
            recent_files: Vec::new(),
            recent_state: ListState::default(),
            dialog_focus: DialogFocus::default(),
            path_input: String::new(),

            recording: false,

            animation_frame: 0,
            ticks: 0,

            commands,
        }
    }

    /// Hand a gesture to the controller task
    pub fn dispatch(&self, command: Command) {
        self.queue(command);
    }

    fn queue(&self, command: Command) -> bool {
        if self.commands.send(command).is_err() {
            warn!("Controller task is gone; dropping command");
            return false;
        }
        true
    }

    /// Apply an update pushed by the controller
    pub fn apply(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Message { message, animate } => {
                // Rejected uploads answer with an error message and no Thinking
                self.awaiting_reply = false;
                self.log.push(LogEntry::new(message, animate));
                self.follow = true;
            }
            ViewEvent::ShowThinking => {
                self.awaiting_reply = false;
                self.thinking = true;
                self.follow = true;
            }
            ViewEvent::RemoveThinking => self.thinking = false,
            ViewEvent::ClearInput => {
                self.input.clear();
                self.cursor = 0;
            }
            ViewEvent::ShowAttachment(file) => self.attachment = Some(file),
            ViewEvent::ClearAttachment => self.attachment = None,
            ViewEvent::RecentFiles(entries) => {
                self.recent_files = entries;
                self.clamp_recent_selection();
            }
            ViewEvent::OpenAttachDialog => {
                self.input_mode = InputMode::Attach;
                self.clamp_recent_selection();
            }
            ViewEvent::CloseAttachDialog => self.close_attach_dialog(),
            ViewEvent::Recording(recording) => self.recording = recording,
        }
    }

    /// Tick animation (called by Tick event)
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);

        // Typing reveal: one character per tick, for every message still revealing
        for entry in self.log.iter_mut().filter(|e| e.is_revealing()) {
            entry.revealed += 1;
        }

        if self.thinking && self.ticks % 10 == 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Whether a send would be rejected because a request is outstanding
    /// or already queued
    pub fn is_busy(&self) -> bool {
        self.thinking || self.awaiting_reply
    }

    // Chat actions

    pub fn submit(&mut self) {
        if self.is_busy() {
            return;
        }
        if self.input.trim().is_empty() && self.attachment.is_none() {
            return;
        }
        self.awaiting_reply = self.queue(Command::Send {
            input: self.input.clone(),
        });
    }

    pub fn upload(&mut self, path: PathBuf) {
        let queued = self.queue(Command::UploadPath {
            path,
            input: self.input.clone(),
        });
        self.awaiting_reply |= queued;
    }

    /// Insert pasted text at the cursor; line breaks become spaces
    pub fn insert_text(&mut self, text: &str) {
        let mut byte_pos = self
            .input
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len());
        for c in text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }) {
            self.input.insert(byte_pos, c);
            byte_pos += c.len_utf8();
            self.cursor += 1;
        }
    }

    /// Server URL of the newest attachment or audio clip in the log
    pub fn latest_media_url(&self) -> Option<String> {
        self.log
            .iter()
            .rev()
            .find_map(|e| e.message.audio_path.as_ref().or(e.message.file_path.as_ref()))
            .map(|path| self.media_url(path))
    }

    pub fn media_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.server_url.trim_end_matches('/'), path.trim_start_matches('/'))
        }
    }

    // Attach dialog

    pub fn open_attach_dialog(&mut self, focus: DialogFocus) {
        self.dialog_focus = focus;
        self.dispatch(Command::OpenAttachDialog);
    }

    pub fn close_attach_dialog(&mut self) {
        self.input_mode = InputMode::Chat;
        self.dialog_focus = DialogFocus::RecentFiles;
        self.path_input.clear();
    }

    pub fn selected_recent(&self) -> Option<&FileRef> {
        self.recent_state.selected().and_then(|i| self.recent_files.get(i))
    }

    pub fn recent_nav_down(&mut self) {
        let len = self.recent_files.len();
        if len > 0 {
            let i = self.recent_state.selected().unwrap_or(0);
            self.recent_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn recent_nav_up(&mut self) {
        let i = self.recent_state.selected().unwrap_or(0);
        self.recent_state.select(Some(i.saturating_sub(1)));
    }

    fn clamp_recent_selection(&mut self) {
        if self.recent_files.is_empty() {
            self.recent_state.select(None);
        } else {
            let i = self.recent_state.selected().unwrap_or(0);
            self.recent_state.select(Some(i.min(self.recent_files.len() - 1)));
        }
    }

    // Scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> (App, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new("http://localhost:5000".to_string(), tx), rx)
    }

    #[test]
    fn test_animated_message_reveals_one_char_per_tick() {
        let (mut app, _rx) = app();
        app.apply(ViewEvent::Message {
            message: ChatMessage::assistant("héllo", None),
            animate: true,
        });

        assert_eq!(app.log[0].visible_text().as_deref(), Some(""));
        app.tick();
        app.tick();
        assert_eq!(app.log[0].visible_text().as_deref(), Some("hé"));
        for _ in 0..10 {
            app.tick();
        }
        assert_eq!(app.log[0].visible_text().as_deref(), Some("héllo"));
        assert!(!app.log[0].is_revealing());
    }

    #[test]
    fn test_plain_message_is_fully_visible() {
        let (mut app, _rx) = app();
        app.apply(ViewEvent::Message {
            message: ChatMessage::error("Error: boom"),
            animate: false,
        });
        assert_eq!(app.log[0].visible_text().as_deref(), Some("Error: boom"));
    }

    #[test]
    fn test_submit_rejected_while_thinking() {
        let (mut app, mut rx) = app();
        app.input = "hello".to_string();
        app.apply(ViewEvent::ShowThinking);

        app.submit();
        assert!(rx.try_recv().is_err());

        app.apply(ViewEvent::RemoveThinking);
        app.submit();
        assert_eq!(
            rx.try_recv().unwrap(),
            Command::Send {
                input: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_double_enter_queues_one_send() {
        let (mut app, mut rx) = app();
        app.input = "hello".to_string();

        app.submit();
        app.submit();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        // Controller picks it up, then finishes
        app.apply(ViewEvent::ClearInput);
        app.apply(ViewEvent::ShowThinking);
        app.apply(ViewEvent::RemoveThinking);
        app.apply(ViewEvent::Message {
            message: ChatMessage::assistant("hi", None),
            animate: true,
        });

        app.input = "again".to_string();
        app.submit();
        assert_eq!(rx.try_recv().unwrap(), Command::Send { input: "again".to_string() });
    }

    #[test]
    fn test_rejected_upload_unblocks_send() {
        let (mut app, mut rx) = app();
        app.upload(PathBuf::from("/tmp/notes.txt"));
        assert!(rx.try_recv().is_ok());
        assert!(app.is_busy());

        app.apply(ViewEvent::Message {
            message: ChatMessage::error("Unsupported file type: text/plain."),
            animate: false,
        });
        assert!(!app.is_busy());
    }

    #[test]
    fn test_insert_text_at_cursor() {
        let (mut app, _rx) = app();
        app.input = "ab".to_string();
        app.cursor = 1;
        app.insert_text("é\nx");
        assert_eq!(app.input, "aé xb");
        assert_eq!(app.cursor, 4);
    }

    #[test]
    fn test_submit_ignores_empty_input_without_attachment() {
        let (mut app, mut rx) = app();
        app.input = "   ".to_string();
        app.submit();
        assert!(rx.try_recv().is_err());

        app.apply(ViewEvent::ShowAttachment(FileRef::new("x.png", "/files/x.png")));
        app.submit();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_dialog_open_and_close() {
        let (mut app, _rx) = app();
        app.apply(ViewEvent::RecentFiles(vec![
            FileRef::new("a.png", "/files/a.png"),
            FileRef::new("b.pdf", "/files/b.pdf"),
        ]));
        app.apply(ViewEvent::OpenAttachDialog);
        assert_eq!(app.input_mode, InputMode::Attach);

        app.recent_nav_down();
        app.recent_nav_down();
        assert_eq!(app.selected_recent().map(|f| f.filename.as_str()), Some("b.pdf"));

        app.apply(ViewEvent::RecentFiles(vec![FileRef::new("a.png", "/files/a.png")]));
        assert_eq!(app.selected_recent().map(|f| f.filename.as_str()), Some("a.png"));

        app.path_input = "/tmp/x".to_string();
        app.apply(ViewEvent::CloseAttachDialog);
        assert_eq!(app.input_mode, InputMode::Chat);
        assert!(app.path_input.is_empty());
    }

    #[test]
    fn test_media_url() {
        let (mut app, _rx) = app();
        assert_eq!(app.latest_media_url(), None);

        app.apply(ViewEvent::Message {
            message: ChatMessage::assistant("ok", Some("/static/uploads/response_1.mp3".to_string())),
            animate: false,
        });
        assert_eq!(
            app.latest_media_url().as_deref(),
            Some("http://localhost:5000/static/uploads/response_1.mp3")
        );
        assert_eq!(app.media_url("https://cdn/x.png"), "https://cdn/x.png");
    }
}
