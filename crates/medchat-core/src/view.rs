use crate::message::{ChatMessage, FileRef};

/// Everything the controller asks of a front end.
///
/// Calls are fire-and-forget: a view never reports failure back, and the
/// controller never reads state out of it.
pub trait ChatView: Send {
    /// Append to the log and scroll to the bottom. With `animate`, the text is
    /// revealed a character at a time.
    fn render_message(&mut self, message: &ChatMessage, animate: bool);

    /// Show the transient "Thinking..." placeholder
    fn show_thinking(&mut self);
    fn remove_thinking(&mut self);

    fn clear_input(&mut self);

    /// Replace the pending-attachment preview
    fn show_attachment(&mut self, attachment: &FileRef);
    fn clear_attachment(&mut self);

    fn render_recent_files(&mut self, entries: &[FileRef]);
    fn open_attach_dialog(&mut self);
    fn close_attach_dialog(&mut self);

    fn set_recording(&mut self, recording: bool);
}
