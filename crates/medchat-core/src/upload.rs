//! Files headed for the upload endpoint and the MIME allow-list they must pass.

use std::path::Path;

use crate::error::{ChatError, Result};

/// MIME types the upload endpoint accepts
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "audio/mpeg",
    "audio/wav",
    "audio/webm",
    "application/pdf",
];

/// A file's bytes plus the metadata the multipart form needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a local file, guessing its MIME type from the extension.
    /// Unknown extensions get `application/octet-stream` and fail validation later.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = mime_for_path(path).unwrap_or("application/octet-stream");

        Ok(Self::new(filename, mime_type, bytes))
    }

    pub fn validate(&self) -> Result<()> {
        if is_allowed_mime(&self.mime_type) {
            Ok(())
        } else {
            Err(ChatError::UnsupportedFileType(self.mime_type.clone()))
        }
    }
}

pub fn is_allowed_mime(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}

/// Map a file extension to one of the accepted MIME types
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "webm" => Some("audio/webm"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mime_for_known_extensions() {
        assert_eq!(mime_for_path(Path::new("scan.PNG")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("photo.jpg")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("note.mp3")), Some("audio/mpeg"));
        assert_eq!(mime_for_path(Path::new("labs.pdf")), Some("application/pdf"));
        assert_eq!(mime_for_path(Path::new("notes.txt")), None);
        assert_eq!(mime_for_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_validate_rejects_unlisted_mime() {
        let upload = FileUpload::new("notes.txt", "text/plain", b"hi".to_vec());
        let err = upload.validate().unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedFileType(ref m) if m == "text/plain"));

        let upload = FileUpload::new("scan.png", "image/png", vec![0; 8]);
        assert!(upload.validate().is_ok());
    }

    #[tokio::test]
    async fn test_from_path_reads_bytes_and_guesses_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.4").unwrap();

        let upload = FileUpload::from_path(&path).await.unwrap();
        assert_eq!(upload.filename, "report.pdf");
        assert_eq!(upload.mime_type, "application/pdf");
        assert_eq!(upload.bytes, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_from_path_unknown_extension_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let upload = FileUpload::from_path(&path).await.unwrap();
        assert_eq!(upload.mime_type, "application/octet-stream");
        assert!(upload.validate().is_err());
    }
}
