//! HTTP chat transport.
//!
//! Posts the conversation to the backend's chat function and exposes the
//! streamed response as a [`ResponseBody`]. Works against a local Supabase
//! stack or any deployment exposing the same `/functions/v1/chat` endpoint.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use crownwell_config::AppConfig;
use crownwell_core::error::TransportError;
use crownwell_core::transport::{ChatRequest, ChatTransport, ResponseBody};
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

/// The reqwest-backed chat transport.
pub struct HttpChatTransport {
    endpoint: String,
    anon_key: String,
    client: reqwest::Client,
}

impl HttpChatTransport {
    /// Create a transport posting to `{base_url}{path}`.
    pub fn new(
        base_url: impl Into<String>,
        path: &str,
        anon_key: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        // Only the connect phase is bounded: a streamed answer may
        // legitimately run for minutes.
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {e}")))?;

        let base_url = base_url.into();
        Ok(Self {
            endpoint: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            anon_key: anon_key.into(),
            client,
        })
    }

    /// Build the transport from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        Self::new(
            config.base_url.clone(),
            &config.chat.endpoint,
            config.effective_anon_key(),
            Duration::from_secs(config.chat.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn open(&self, request: ChatRequest) -> Result<Box<dyn ResponseBody>, TransportError> {
        debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(TransportError::AuthenticationFailed(format!(
                "Chat backend rejected the anon key (status {})",
                status.as_u16()
            )));
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Chat backend returned error");
            return Err(TransportError::ApiError {
                status_code: status.as_u16(),
                message: error_body,
            });
        }

        Ok(Box::new(HttpBody {
            stream: Some(Box::pin(response.bytes_stream())),
        }))
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// A streamed HTTP response body. Dropping the inner stream closes the
/// connection.
struct HttpBody {
    stream: Option<ByteStream>,
}

#[async_trait]
impl ResponseBody for HttpBody {
    async fn next_chunk(&mut self) -> Option<Result<Bytes, TransportError>> {
        let stream = self.stream.as_mut()?;
        match stream.next().await? {
            Ok(bytes) => Some(Ok(bytes)),
            Err(e) => Some(Err(TransportError::StreamInterrupted(e.to_string()))),
        }
    }

    fn release(&mut self) -> Result<(), TransportError> {
        self.stream
            .take()
            .map(drop)
            .ok_or(TransportError::AlreadyReleased)
    }
}
