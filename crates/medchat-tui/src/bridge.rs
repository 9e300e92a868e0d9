//! Glue between the terminal loop and the chat controller.
//!
//! The controller lives in its own task and takes `Command`s one at a time,
//! so two flows never interleave. It talks back through `ChannelView`, which
//! turns every `ChatView` call into a `ViewEvent` on the app's event channel.

use std::path::PathBuf;

use log::debug;
use medchat_core::{ChatBackend, ChatController, ChatMessage, ChatView, FileRef, Microphone};
use tokio::sync::mpsc;

use crate::tui::AppEvent;

/// User gestures the controller acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send { input: String },
    UploadPath { path: PathBuf, input: String },
    ToggleRecording,
    OpenAttachDialog,
    SelectRecent(String),
    RemoveRecent(String),
    CancelAttachment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Message { message: ChatMessage, animate: bool },
    ShowThinking,
    RemoveThinking,
    ClearInput,
    ShowAttachment(FileRef),
    ClearAttachment,
    RecentFiles(Vec<FileRef>),
    OpenAttachDialog,
    CloseAttachDialog,
    Recording(bool),
}

pub struct ChannelView {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl ChannelView {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, event: ViewEvent) {
        // The receiver only goes away on shutdown
        let _ = self.tx.send(AppEvent::View(event));
    }
}

impl ChatView for ChannelView {
    fn render_message(&mut self, message: &ChatMessage, animate: bool) {
        self.emit(ViewEvent::Message {
            message: message.clone(),
            animate,
        });
    }

    fn show_thinking(&mut self) {
        self.emit(ViewEvent::ShowThinking);
    }

    fn remove_thinking(&mut self) {
        self.emit(ViewEvent::RemoveThinking);
    }

    fn clear_input(&mut self) {
        self.emit(ViewEvent::ClearInput);
    }

    fn show_attachment(&mut self, attachment: &FileRef) {
        self.emit(ViewEvent::ShowAttachment(attachment.clone()));
    }

    fn clear_attachment(&mut self) {
        self.emit(ViewEvent::ClearAttachment);
    }

    fn render_recent_files(&mut self, entries: &[FileRef]) {
        self.emit(ViewEvent::RecentFiles(entries.to_vec()));
    }

    fn open_attach_dialog(&mut self) {
        self.emit(ViewEvent::OpenAttachDialog);
    }

    fn close_attach_dialog(&mut self) {
        self.emit(ViewEvent::CloseAttachDialog);
    }

    fn set_recording(&mut self, recording: bool) {
        self.emit(ViewEvent::Recording(recording));
    }
}

/// Drive the controller until the command channel closes
pub async fn run_controller<V, B, M>(
    mut controller: ChatController<V, B, M>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) where
    V: ChatView,
    B: ChatBackend,
    M: Microphone,
{
    while let Some(command) = commands.recv().await {
        debug!("Command: {:?}", command);
        match command {
            Command::Send { input } => controller.send_message(&input).await,
            Command::UploadPath { path, input } => controller.upload_path(&path, &input).await,
            Command::ToggleRecording => controller.toggle_recording().await,
            Command::OpenAttachDialog => controller.open_attach_dialog(),
            Command::SelectRecent(file_path) => controller.select_recent_file(&file_path),
            Command::RemoveRecent(file_path) => controller.remove_recent_file(&file_path),
            Command::CancelAttachment => controller.cancel_attachment(),
        }
    }
}
