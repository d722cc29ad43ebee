//! Outcome classification (C4, §4.4): turns a raw HTTP response or transport
//! error into a typed [`Outcome`] the retry policy and worker pool act on.
//!
//! Rate-limit detection is grounded on the original service's body-substring
//! matching rather than status code alone, since the upstream occasionally
//! reports rate limiting through a 500 with a descriptive body.

/// Failure class used to key retry caps and backoff formulas (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Generic failure, including audio-too-small.
    General,
    /// Rate-limited by the upstream server.
    RateLimited,
    /// Request timed out.
    Timeout,
}

/// Classified result of a single task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// HTTP 200 with an audio body that passed the size check.
    Success,
    /// HTTP 429/503, or a body/status combination indicating rate limiting.
    RateLimited,
    /// Request-timeout transport error, or a body mentioning "timeout".
    Timeout,
    /// Other transport error (connection refused, DNS failure, etc).
    Network,
    /// HTTP 200 but the audio body was smaller than the minimum accepted size.
    AudioTooSmall,
    /// Any other non-success HTTP status.
    OtherHttp(u16),
    /// The source file could not be read at all (missing, permissions, not
    /// valid text). Task-local terminal: fails the task without touching the
    /// retry budget, since no request was ever sent.
    SourceUnreadable,
    /// The upstream call succeeded but writing the audio file to disk failed.
    /// Distinct from `SourceUnreadable`: this is a local I/O failure on the
    /// write side, after a (possibly retryable) upstream response.
    LocalIo,
}

impl Outcome {
    /// Whether this outcome represents success.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Whether this outcome is task-local terminal: it fails the task
    /// immediately, bypassing the retry policy entirely.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::SourceUnreadable)
    }

    /// The failure class this outcome maps to, for retry-cap/backoff lookup.
    /// Returns `None` for `Success` and for terminal outcomes that never
    /// consult the retry policy.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Outcome::Success => None,
            Outcome::SourceUnreadable => None,
            Outcome::RateLimited => Some(FailureClass::RateLimited),
            Outcome::Timeout => Some(FailureClass::Timeout),
            Outcome::Network | Outcome::AudioTooSmall | Outcome::OtherHttp(_) | Outcome::LocalIo => {
                Some(FailureClass::General)
            }
        }
    }
}

const RATE_LIMIT_SUBSTRINGS: &[&str] = &["too many requests", "too many subrequests", "rate limit"];

/// Classify an HTTP response that the transport layer did not itself error on.
///
/// `body_lower` must already be lowercased by the caller (classification is
/// case-insensitive, matching the original substring checks).
pub fn classify_http(status: u16, body_lower: &str) -> Outcome {
    if status == 200 {
        // Size validation happens one layer up, where text length is known;
        // callers must check size before falling back to `Outcome::Success`.
        return Outcome::Success;
    }
    if status == 429 || status == 503 {
        return Outcome::RateLimited;
    }
    if RATE_LIMIT_SUBSTRINGS.iter().any(|s| body_lower.contains(s)) {
        return Outcome::RateLimited;
    }
    if status == 500 && body_lower.contains("too many") {
        return Outcome::RateLimited;
    }
    if body_lower.contains("timeout") {
        return Outcome::Timeout;
    }
    Outcome::OtherHttp(status)
}

/// Classify a transport-level error (the HTTP request never produced a response).
pub fn classify_transport_error(is_timeout: bool, detail_lower: &str) -> Outcome {
    if is_timeout || detail_lower.contains("timeout") {
        Outcome::Timeout
    } else {
        Outcome::Network
    }
}

/// Minimum accepted audio size for a given input text length (§4.4/§6).
pub fn min_audio_size(text_len: usize, min_size_bytes: u64, min_bytes_per_char: f32) -> u64 {
    let by_length = (text_len as f32 * min_bytes_per_char).ceil() as u64;
    min_size_bytes.max(by_length)
}
