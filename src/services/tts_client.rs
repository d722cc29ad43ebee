//! Thin HTTP client for the upstream TTS contract (§6).
//!
//! `POST {server.url}/v1/audio/speech` with a fixed per-request timeout and
//! `Accept: audio/mpeg`; returns the raw response so the executor can apply
//! size validation and outcome classification.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::core::registry::{BatchParams, CleaningOptions};

const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Request payload sent to the upstream TTS endpoint.
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    pitch: f32,
    response_format: &'a str,
    cleaning_options: &'a CleaningOptions,
}

/// Raw result of a TTS call: either a response with status/body, or a
/// transport-level failure that never produced a response.
pub enum SpeechResponse {
    /// The server responded; may be a success or an error status.
    Responded {
        /// HTTP status code.
        status: u16,
        /// Response body bytes (audio on success, error JSON/text otherwise).
        body: Vec<u8>,
    },
    /// The request failed before a response was received.
    TransportError {
        /// Whether the error was specifically a timeout.
        is_timeout: bool,
        /// Lowercased error detail, used for outcome classification.
        detail_lower: String,
    },
}

/// Client wrapping a single `reqwest::Client` shared across all workers.
#[derive(Clone)]
pub struct TtsClient {
    http: Client,
}

impl TtsClient {
    /// Build a client with the fixed 300 s per-request timeout.
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client configuration is valid");
        Self { http }
    }

    /// Normalize a configured base URL so it ends in `/v1/audio/speech`.
    ///
    /// Parses with the `url` crate so malformed bases are rejected before
    /// a request is ever attempted; falls back to string-level joining if
    /// the base cannot be parsed as an absolute URL (e.g. a bare host
    /// without a scheme).
    pub fn normalize_url(base: &str) -> String {
        let trimmed = base.trim_end_matches('/');
        if trimmed.ends_with("/v1/audio/speech") {
            return trimmed.to_string();
        }
        match Url::parse(trimmed) {
            Ok(mut url) => {
                {
                    let mut segments = url
                        .path_segments_mut()
                        .expect("http(s) base URLs support path segments");
                    segments.pop_if_empty().push("v1").push("audio").push("speech");
                }
                url.to_string()
            }
            Err(_) => format!("{}/v1/audio/speech", trimmed),
        }
    }

    /// Call the upstream TTS endpoint for one task.
    pub async fn synthesize(
        &self,
        base_url: &str,
        api_key: &str,
        text: &str,
        params: &BatchParams,
    ) -> SpeechResponse {
        let url = Self::normalize_url(base_url);
        let payload = SpeechRequest {
            model: "tts-1",
            input: text,
            voice: &params.voice,
            speed: params.speed,
            pitch: params.pitch,
            response_format: &params.response_format,
            cleaning_options: &params.cleaning_options,
        };

        let result = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .header("Accept", "audio/mpeg")
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                SpeechResponse::Responded { status, body }
            }
            Err(err) => SpeechResponse::TransportError {
                is_timeout: err.is_timeout(),
                detail_lower: err.to_string().to_lowercase(),
            },
        }
    }
}

impl Default for TtsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_base_url() {
        assert_eq!(
            TtsClient::normalize_url("http://tts1.example.com"),
            "http://tts1.example.com/v1/audio/speech"
        );
    }

    #[test]
    fn normalizes_trailing_slash() {
        assert_eq!(
            TtsClient::normalize_url("http://tts1.example.com/"),
            "http://tts1.example.com/v1/audio/speech"
        );
    }

    #[test]
    fn leaves_fully_qualified_url_untouched() {
        assert_eq!(
            TtsClient::normalize_url("http://tts1.example.com/v1/audio/speech"),
            "http://tts1.example.com/v1/audio/speech"
        );
    }

    #[test]
    fn leaves_fully_qualified_url_with_trailing_slash_untouched() {
        assert_eq!(
            TtsClient::normalize_url("http://tts1.example.com/v1/audio/speech/"),
            "http://tts1.example.com/v1/audio/speech"
        );
    }
}
