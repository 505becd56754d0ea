//! HTTP Completion Backend
//!
//! Streams completions from a hosted endpoint over HTTP. One POST per
//! submitted message, carrying the full conversation as JSON; the response
//! body is an open-ended UTF-8 text stream consumed until the connection
//! closes.
//!
//! # Status handling
//!
//! - 2xx: the body is streamed as chunks.
//! - 429: surfaced as [`BackendError::RateLimited`] so the engine can word
//!   the notification distinctly. No stream is opened.
//! - anything else: [`BackendError::Endpoint`] with the body text.
//!
//! No retries and no overall request timeout - the user watches the stream
//! and resubmits if it stalls, so only a connect timeout is applied.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use super::traits::{BackendError, CompletionBackend, CompletionRequest, StreamingToken};
use crate::config::EndpointConfig;

/// Completion backend talking to a hosted HTTP endpoint
#[derive(Clone)]
pub struct HttpCompletionBackend {
    /// Endpoint URL
    url: String,
    /// Optional bearer token
    api_key: Option<String>,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpCompletionBackend {
    /// Create a backend for the given endpoint URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            http_client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Set the bearer token sent with each request
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Create a backend from endpoint configuration
    ///
    /// Fails with [`BackendError::NotConfigured`] when no URL is set.
    pub fn from_config(config: &EndpointConfig) -> Result<Self, BackendError> {
        let url = config.url.clone().ok_or(BackendError::NotConfigured)?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            url,
            api_key: config.api_key.clone(),
            http_client,
        })
    }

    /// The endpoint URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn send_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<mpsc::Receiver<StreamingToken>, BackendError> {
        let (tx, rx) = mpsc::channel(100);

        let mut http_request = self.http_client.post(&self.url).json(request);
        if let Some(ref api_key) = self.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(BackendError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = response.bytes_stream();

        // Decode and forward chunks until the connection closes.
        tokio::spawn(async move {
            let mut decoder = Utf8ChunkDecoder::default();
            let mut full_response = String::new();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        let text = decoder.push(&bytes);
                        if text.is_empty() {
                            continue;
                        }
                        full_response.push_str(&text);
                        if tx.send(StreamingToken::Token(text)).await.is_err() {
                            // Receiver dropped, stop streaming
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamingToken::Error(e.to_string())).await;
                        return;
                    }
                }
            }

            // Clean close. Flush any bytes still held by the decoder.
            let tail = decoder.finish();
            if !tail.is_empty() {
                full_response.push_str(&tail);
                if tx.send(StreamingToken::Token(tail)).await.is_err() {
                    return;
                }
            }

            let _ = tx
                .send(StreamingToken::Complete {
                    message: full_response,
                })
                .await;
        });

        Ok(rx)
    }
}

/// Incremental UTF-8 decoder for byte chunks
///
/// Network chunk boundaries do not respect character boundaries, so a
/// multibyte sequence split across two chunks must be carried over rather
/// than lossily replaced.
#[derive(Debug, Default)]
struct Utf8ChunkDecoder {
    /// Bytes held back because they end in an incomplete sequence
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Feed a chunk, returning all complete text it yields
    fn push(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(text) => {
                    out.push_str(text);
                    self.carry.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.carry[..valid]).unwrap_or_default());

                    match e.error_len() {
                        // Truly invalid bytes: replace and keep going.
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + len);
                        }
                        // Incomplete sequence at the end: hold it for the
                        // next chunk.
                        None => {
                            self.carry.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is left (the stream is over, nothing more is coming)
    fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        tail
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_backend_from_config() {
        let config = EndpointConfig {
            url: Some("https://example.com/api/chat".to_string()),
            api_key: Some("secret".to_string()),
            connect_timeout_ms: 1000,
        };
        let backend = HttpCompletionBackend::from_config(&config).unwrap();
        assert_eq!(backend.url(), "https://example.com/api/chat");
        assert_eq!(backend.name(), "http");
    }

    #[test]
    fn test_backend_requires_url() {
        let config = EndpointConfig::default();
        assert!(matches!(
            HttpCompletionBackend::from_config(&config),
            Err(BackendError::NotConfigured)
        ));
    }

    #[test]
    fn test_decoder_plain_ascii() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.push(b"hello "), "hello ");
        assert_eq!(decoder.push(b"world"), "world");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decoder_multibyte_split_across_chunks() {
        // "é" is 0xC3 0xA9; split it over two pushes.
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.push(&[b'c', b'a', b'f', 0xC3]), "caf");
        assert_eq!(decoder.push(&[0xA9, b'!']), "é!");
    }

    #[test]
    fn test_decoder_four_byte_split_three_ways() {
        // "🦀" is F0 9F A6 80.
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.push(&[0xF0, 0x9F]), "");
        assert_eq!(decoder.push(&[0xA6]), "");
        assert_eq!(decoder.push(&[0x80]), "🦀");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::default();
        let out = decoder.push(&[b'a', 0xFF, b'b']);
        assert_eq!(out, "a\u{FFFD}b");
    }

    #[test]
    fn test_decoder_finish_flushes_incomplete_tail() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.push(&[0xC3]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }
}
