//! Outbound delivery to chat webhooks.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::{future::Future, time::Duration};
use tracing::debug;

use crate::resolver::Destination;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to chat webhook failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat webhook returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Sends one text message to one destination.
pub trait Notify: Send + Sync + 'static {
    fn notify(
        &self,
        destination: &Destination,
        text: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    msg_type: &'static str,
    content: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    text: &'a str,
}

impl<'a> TextMessage<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            msg_type: "text",
            content: TextContent { text },
        }
    }
}

/// Posts `{"msg_type": "text", "content": {"text": ...}}` bodies over HTTP.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Notify for WebhookNotifier {
    async fn notify(&self, destination: &Destination, text: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(destination.as_str())
            .json(&TextMessage::new(text))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!("Chat webhook responded {}: {}", status, body);

        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status { status, body })
        }
    }
}
