//! Telegram delivery of formatted token alerts.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram credentials are not configured")]
    MissingCredentials,

    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not decode telegram response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("telegram rejected the message: {0}")]
    Rejected(String),
}

/// Delivery seam for formatted alerts. A failed delivery is logged by the
/// caller and otherwise dropped; messages are never re-sent.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
    chat_id: i64,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, chat_id: i64) -> Result<Self, NotifyError> {
        let token = token.into();
        if token.is_empty() || chat_id == 0 {
            return Err(NotifyError::MissingCredentials);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            token,
            chat_id,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }
}

/// The envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

#[async_trait]
impl Notify for TelegramClient {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let chat_id = self.chat_id.to_string();
        let response = self
            .http
            .post(self.endpoint("sendMessage"))
            .form(&[
                ("chat_id", chat_id.as_str()),
                ("text", text),
                ("parse_mode", "HTML"),
            ])
            .send()
            .await?;

        let body = response.bytes().await?;
        let api: ApiResponse = serde_json::from_slice(&body)?;
        if !api.ok {
            return Err(NotifyError::Rejected(
                api.description.unwrap_or_else(|| "no description".into()),
            ));
        }
        Ok(())
    }
}
