//! The chat widget controller: maps user gestures to server calls and view
//! updates.
//!
//! Every flow runs to completion and turns its failures into rendered
//! messages; nothing here returns an error to the caller.

use std::path::Path;

use log::{debug, info, warn};

use crate::client::{ChatBackend, MessageRequest, UploadReply};
use crate::config::Config;
use crate::message::{ChatMessage, FileRef};
use crate::recent::RecentFiles;
use crate::recorder::{Microphone, Recorder, StopOutcome};
use crate::upload::FileUpload;
use crate::view::ChatView;

pub const MSG_RECORDING_TOO_SHORT: &str = "Recording too short. Please record for at least 1 second.";
pub const MSG_RECORDING_EMPTY: &str = "Recording is empty or too small. Please try again.";
pub const MSG_MICROPHONE_DENIED: &str = "Could not access microphone. Please check permissions.";
pub const MSG_NO_TRANSCRIPTION: &str = "Could not understand the audio. Please try again.";

pub struct ChatController<V, B, M> {
    view: V,
    backend: B,
    recorder: Recorder<M>,
    recent: RecentFiles,
    pending: Option<FileRef>,
    conversation_id: Option<i64>,
    generate_speech: bool,
    default_prompt: String,
}

impl<V, B, M> ChatController<V, B, M>
where
    V: ChatView,
    B: ChatBackend,
    M: Microphone,
{
    pub fn new(view: V, backend: B, microphone: M, recent: RecentFiles, config: &Config) -> Self {
        Self {
            view,
            backend,
            recorder: Recorder::new(microphone),
            recent,
            pending: None,
            conversation_id: None,
            generate_speech: config.generate_speech,
            default_prompt: config.default_prompt.clone(),
        }
    }

    pub fn pending_attachment(&self) -> Option<&FileRef> {
        self.pending.as_ref()
    }

    pub fn recent_files(&self) -> &RecentFiles {
        &self.recent
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn conversation_id(&self) -> Option<i64> {
        self.conversation_id
    }

    /// Push the persisted recent-files list to the view (startup)
    pub fn render_recent_files(&mut self) {
        self.view.render_recent_files(self.recent.entries());
    }

    // Send flow

    /// Send the typed text together with the pending attachment, if any.
    /// A no-op when both are empty.
    pub async fn send_message(&mut self, input: &str) {
        let text = input.trim();
        if text.is_empty() && self.pending.is_none() {
            return;
        }

        self.view.clear_input();

        let image_path = self.pending.as_ref().map(|f| f.file_path.clone());
        let user = ChatMessage::user(non_empty(text), image_path.clone(), None);
        let request = self.build_request(text.to_string(), image_path, None);

        self.dispatch(request, Some(user)).await;
        self.clear_pending();
    }

    // Upload flow

    /// Validate, upload, then either attach-and-send (images, PDFs) or
    /// transcribe-and-send (audio). `input` is the current chat input text.
    pub async fn handle_file_upload(&mut self, file: FileUpload, input: &str) {
        if let Err(e) = file.validate() {
            debug!("Rejected upload of {}: {}", file.filename, e);
            self.render_error(e.to_string());
            return;
        }

        let filename = file.filename.clone();
        self.view.show_thinking();
        let result = self.backend.upload(file).await;
        self.view.remove_thinking();

        match result {
            Ok(reply) => self.process_upload_reply(filename, reply, input).await,
            Err(e) => {
                warn!("Upload of {} failed: {}", filename, e);
                self.render_error(format!("Upload failed: {}", e));
            }
        }
    }

    /// Read a local file (picked or dropped) and run it through the upload flow
    pub async fn upload_path(&mut self, path: &Path, input: &str) {
        match FileUpload::from_path(path).await {
            Ok(file) => self.handle_file_upload(file, input).await,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                self.render_error(format!("Could not read {}: {}", path.display(), e));
            }
        }
    }

    async fn process_upload_reply(&mut self, filename: String, reply: UploadReply, input: &str) {
        let is_document = reply.is_document();
        if let Some(error) = reply.error {
            self.view.render_message(&ChatMessage::error(error), false);
            return;
        }

        if is_document {
            let Some(file_path) = reply.file_path else {
                self.render_error("Upload failed: the server did not return a file path".to_string());
                return;
            };
            self.send_document(FileRef::new(filename, file_path), input).await;
        } else {
            self.send_transcription(reply.transcription, reply.file_path).await;
        }
    }

    /// Image/PDF branch: attach, remember, close the dialog, auto-send
    async fn send_document(&mut self, file: FileRef, input: &str) {
        info!("Attached {} as {}", file.filename, file.file_path);
        self.display_attachment(file.clone());
        self.update_recent_files(file.clone());
        self.view.close_attach_dialog();

        let text = match input.trim() {
            "" => self.default_prompt.clone(),
            typed => typed.to_string(),
        };

        self.view.clear_input();
        let user = ChatMessage::user(Some(text.clone()), Some(file.file_path.clone()), None);
        let request = self.build_request(text, Some(file.file_path), None);

        self.dispatch(request, Some(user)).await;
        self.clear_pending();
    }

    /// Audio branch: the transcription becomes the user's message
    async fn send_transcription(&mut self, transcription: Option<String>, audio_path: Option<String>) {
        let Some(text) = transcription.as_deref().and_then(non_empty) else {
            self.render_error(MSG_NO_TRANSCRIPTION.to_string());
            return;
        };

        let user = ChatMessage::user(Some(text.clone()), None, audio_path.clone());
        self.view.render_message(&user, false);

        let request = self.build_request(text, None, audio_path);
        self.dispatch(request, None).await;
    }

    // Recording

    /// Microphone toggle: `Idle -> Recording` or `Recording -> Idle`
    pub async fn toggle_recording(&mut self) {
        if !self.recorder.is_recording() {
            match self.recorder.start().await {
                Ok(()) => self.view.set_recording(true),
                Err(e) => {
                    warn!("Error accessing microphone: {}", e);
                    self.render_error(MSG_MICROPHONE_DENIED.to_string());
                }
            }
            return;
        }

        let outcome = self.recorder.stop().await;
        self.view.set_recording(false);

        match outcome {
            StopOutcome::TooShort => self.render_error(MSG_RECORDING_TOO_SHORT.to_string()),
            StopOutcome::Empty => self.render_error(MSG_RECORDING_EMPTY.to_string()),
            StopOutcome::Failed(e) => {
                warn!("Recording failed: {}", e);
                self.render_error(format!("Recording failed: {}", e));
            }
            StopOutcome::Captured(clip) => self.handle_file_upload(clip, "").await,
        }
    }

    // Attachments and recent files

    pub fn open_attach_dialog(&mut self) {
        self.view.render_recent_files(self.recent.entries());
        self.view.open_attach_dialog();
    }

    /// Re-activate a recent file as the pending attachment (no auto-send)
    pub fn select_recent_file(&mut self, file_path: &str) {
        let Some(file) = self
            .recent
            .entries()
            .iter()
            .find(|f| f.file_path == file_path)
            .cloned()
        else {
            return;
        };

        self.display_attachment(file);
        self.view.close_attach_dialog();
    }

    pub fn remove_recent_file(&mut self, file_path: &str) {
        if let Err(e) = self.recent.remove(file_path) {
            warn!("{}", e);
        }
        self.view.render_recent_files(self.recent.entries());
    }

    pub fn cancel_attachment(&mut self) {
        self.clear_pending();
    }

    fn display_attachment(&mut self, file: FileRef) {
        self.view.show_attachment(&file);
        self.pending = Some(file);
    }

    fn clear_pending(&mut self) {
        if self.pending.take().is_some() {
            self.view.clear_attachment();
        }
    }

    fn update_recent_files(&mut self, file: FileRef) {
        if let Err(e) = self.recent.add(file) {
            warn!("{}", e);
        }
        self.view.render_recent_files(self.recent.entries());
    }

    // Shared plumbing

    fn build_request(&self, text: String, image_path: Option<String>, audio_path: Option<String>) -> MessageRequest {
        MessageRequest {
            text,
            image_path,
            audio_path,
            generate_speech: self.generate_speech,
            conversation_id: self.conversation_id,
        }
    }

    /// POST a message with the Thinking placeholder up. On success `echo` (the
    /// user's side) is rendered before the animated reply; on failure only an
    /// error message is.
    async fn dispatch(&mut self, request: MessageRequest, echo: Option<ChatMessage>) {
        self.view.show_thinking();
        let result = self.backend.send_message(&request).await;
        self.view.remove_thinking();

        match result {
            Ok(reply) => {
                if reply.conversation_id.is_some() {
                    self.conversation_id = reply.conversation_id;
                }
                if let Some(user) = echo {
                    self.view.render_message(&user, false);
                }
                let assistant = ChatMessage::assistant(reply.response, reply.audio);
                self.view.render_message(&assistant, true);
            }
            Err(e) => {
                warn!("Message request failed: {}", e);
                self.render_error(format!("Error: {}", e));
            }
        }
    }

    fn render_error(&mut self, text: String) {
        self.view.render_message(&ChatMessage::error(text), false);
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
