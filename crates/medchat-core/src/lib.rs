pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod message;
pub mod recent;
pub mod recorder;
pub mod upload;
pub mod view;

// Re-export main types for convenience
pub use client::{ChatBackend, HttpChatClient, MessageReply, MessageRequest, UploadReply};
pub use config::Config;
pub use controller::ChatController;
pub use error::ChatError;
pub use message::{AttachmentKind, ChatMessage, ChatRole, FileRef};
pub use recent::RecentFiles;
pub use recorder::{CaptureSession, Microphone};
pub use upload::FileUpload;
pub use view::ChatView;
