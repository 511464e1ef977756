use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::{ServerConfig, TelegramConfig};

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("{0}")]
    Validation(String),
    #[error("Telegram bot token is not configured")]
    NotConfigured,
    #[error("Telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Telegram rejected the request: {0}")]
    Rejected(String),
}

/// Body of a send-document request; camelCase names are accepted too
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendDocumentRequest {
    #[serde(default, alias = "chatId")]
    pub chat_id: Option<Value>,
    #[serde(default, alias = "fileUrl")]
    pub file_url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendDocumentPayload<'a> {
    chat_id: &'a Value,
    document: String,
    caption: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendDocumentResponse {
    pub ok: bool,
    pub data: Value,
}

/// Thin client for the Bot API `sendDocument` method
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: Option<String>,
    base_url: String,
}

impl TelegramClient {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.filter(|t| !t.is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &TelegramConfig, server: &ServerConfig) -> Self {
        Self::new(config.api_base.clone(), config.bot_token.clone(), server.base_url.clone())
    }

    /// Absolute URL Telegram can fetch; relative paths are served by this API
    pub fn document_url(&self, file_url: &str) -> String {
        if file_url.starts_with("http://") || file_url.starts_with("https://") {
            file_url.to_string()
        } else {
            format!("{}/{}", self.base_url, file_url.trim_start_matches('/'))
        }
    }

    pub async fn send_document(
        &self,
        request: SendDocumentRequest,
    ) -> Result<SendDocumentResponse, TelegramError> {
        let chat_id = match request.chat_id {
            Some(Value::String(s)) if !s.trim().is_empty() => Value::String(s),
            Some(Value::Number(n)) => Value::Number(n),
            _ => return Err(TelegramError::Validation("Missing chat_id or file_url".to_string())),
        };
        let file_url = match request.file_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return Err(TelegramError::Validation("Missing chat_id or file_url".to_string())),
        };
        let token = self.bot_token.as_deref().ok_or(TelegramError::NotConfigured)?;

        let payload = SendDocumentPayload {
            chat_id: &chat_id,
            document: self.document_url(&file_url),
            caption: request.caption.as_deref().unwrap_or(""),
        };
        let endpoint = format!("{}/bot{}/sendDocument", self.api_base, token);
        let response = self.http.post(&endpoint).json(&payload).send().await?;
        let status = response.status();
        let data: Value = response.json().await?;

        let ok = data.get("ok").and_then(Value::as_bool).unwrap_or(false);
        if !status.is_success() || !ok {
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            tracing::warn!(
                "Telegram sendDocument to {} failed ({}): {}",
                chat_id,
                status,
                description
            );
            return Err(TelegramError::Rejected(description));
        }

        tracing::info!("Sent {} to Telegram chat {}", payload.document, chat_id);
        Ok(SendDocumentResponse { ok: true, data })
    }
}
