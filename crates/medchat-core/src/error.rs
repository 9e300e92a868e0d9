use thiserror::Error;

/// Everything that can go wrong between a user gesture and a rendered reply.
///
/// The controller never lets one of these escape to the UI layer; each variant
/// is turned into an assistant error message instead.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Unsupported file type: {0}. Please upload an image, PDF, or audio file.")]
    UnsupportedFileType(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("microphone unavailable: {0}")]
    Microphone(String),

    #[error("could not save recent files: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;
