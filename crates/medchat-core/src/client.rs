use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::upload::FileUpload;

/// Body of `POST /chat/message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRequest {
    pub text: String,
    pub image_path: Option<String>,
    pub audio_path: Option<String>,
    pub generate_speech: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
}

/// Successful reply from `POST /chat/message`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageReply {
    pub response: String,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

/// Reply from `POST /chat/upload`; either `error` or the file fields are set
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReply {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub detected_language: Option<String>,
}

impl UploadReply {
    /// Images and PDFs become pending attachments; everything else is audio
    pub fn is_document(&self) -> bool {
        matches!(self.file_type.as_deref(), Some("image") | Some("pdf"))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// The two server endpoints the controller talks to
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_message(&self, request: &MessageRequest) -> Result<MessageReply>;
    async fn upload(&self, file: FileUpload) -> Result<UploadReply>;
}

#[derive(Clone)]
pub struct HttpChatClient {
    client: Client,
    base_url: String,
}

impl HttpChatClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    async fn send_message(&self, request: &MessageRequest) -> Result<MessageReply> {
        let url = self.endpoint("/chat/message");
        debug!("POST {} (image: {:?}, audio: {:?})", url, request.image_path, request.audio_path);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        parse_message_reply(status, &body)
    }

    async fn upload(&self, file: FileUpload) -> Result<UploadReply> {
        let url = self.endpoint("/chat/upload");
        info!("Uploading {} ({}, {} bytes)", file.filename, file.mime_type, file.bytes.len());

        let part = Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.mime_type)?;
        let form = Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        parse_upload_reply(status, &body)
    }
}

/// Non-2xx is a failure; a JSON `{error}` body supplies the reason when present
pub fn parse_message_reply(status: StatusCode, body: &str) -> Result<MessageReply> {
    if !status.is_success() {
        return Err(status_error(status, body));
    }
    Ok(serde_json::from_str(body)?)
}

/// The upload endpoint answers rejected files with `400 {error}`, which is
/// response content rather than a transport failure, so the body is parsed
/// whatever the status.
pub fn parse_upload_reply(status: StatusCode, body: &str) -> Result<UploadReply> {
    match serde_json::from_str::<UploadReply>(body) {
        Ok(reply) if status.is_success() || reply.error.is_some() => Ok(reply),
        Ok(_) => Err(status_error(status, body)),
        Err(e) if status.is_success() => Err(e.into()),
        Err(_) => Err(status_error(status, body)),
    }
}

fn status_error(status: StatusCode, body: &str) -> ChatError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    ChatError::Status {
        status: status.as_u16(),
        message,
    }
}
