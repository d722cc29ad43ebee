//! Shared integration-test helpers: a mock upstream TTS server and a
//! scratch directory generator, mirroring the wiremock-backed helper
//! pattern used throughout this crate's test suite.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

use mdtts_cli::core::worker::UpstreamServer;

/// Wraps a `wiremock::MockServer` standing in for one upstream TTS server.
#[allow(dead_code)]
pub struct MockTtsServer {
    server: MockServer,
}

#[allow(dead_code)]
impl MockTtsServer {
    /// Start a fresh mock server with no mounted expectations.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL, suitable for an [`UpstreamServer::url`] field.
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Mount a fixed-status, fixed-body response for every `/v1/audio/speech` call.
    pub async fn mock_fixed_response(&self, status: u16, body: Vec<u8>) {
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
            .mount(&self.server)
            .await;
    }

    /// Mount a responder that always fails with the given status and body,
    /// simulating a persistently unhealthy upstream (Scenario C).
    pub async fn mock_always_failing(&self, status: u16, body: &str) {
        self.mock_fixed_response(status, body.as_bytes().to_vec()).await;
    }

    /// Mount a responder that serves `first_n` failing responses before
    /// switching to a successful audio body (Scenario D: retry then succeed).
    pub async fn mock_fails_then_succeeds(&self, first_n: usize, audio_body: Vec<u8>) {
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .respond_with(FlakyResponder::new(first_n, audio_body))
            .mount(&self.server)
            .await;
    }

    /// Mount a responder that serves `first_n` HTTP-200 responses with a
    /// too-small `small_body`, then switches to a sufficiently large
    /// `audio_body` (Scenario D: audio-too-small retried as a general failure).
    pub async fn mock_undersized_then_sufficient(
        &self,
        first_n: usize,
        small_body: Vec<u8>,
        audio_body: Vec<u8>,
    ) {
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .respond_with(UndersizedResponder::new(first_n, small_body, audio_body))
            .mount(&self.server)
            .await;
    }

    /// Convert this mock server into an [`UpstreamServer`] record.
    pub fn as_upstream_server(&self, name: &str) -> UpstreamServer {
        UpstreamServer {
            name: name.to_string(),
            url: self.base_url(),
            api_key: "test-key".to_string(),
            enabled: true,
            concurrency: None,
        }
    }
}

/// Responder that fails `first_n` times, then serves a 200 with `audio_body`.
struct FlakyResponder {
    first_n: usize,
    audio_body: Vec<u8>,
    calls: std::sync::atomic::AtomicUsize,
}

impl FlakyResponder {
    fn new(first_n: usize, audio_body: Vec<u8>) -> Self {
        Self {
            first_n,
            audio_body,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n < self.first_n {
            ResponseTemplate::new(500).set_body_string("internal error, try again")
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.audio_body.clone())
        }
    }
}

/// Responder that serves `first_n` undersized 200s, then a sufficiently
/// large 200.
struct UndersizedResponder {
    first_n: usize,
    small_body: Vec<u8>,
    audio_body: Vec<u8>,
    calls: std::sync::atomic::AtomicUsize,
}

impl UndersizedResponder {
    fn new(first_n: usize, small_body: Vec<u8>, audio_body: Vec<u8>) -> Self {
        Self {
            first_n,
            small_body,
            audio_body,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

impl Respond for UndersizedResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n < self.first_n {
            ResponseTemplate::new(200).set_body_bytes(self.small_body.clone())
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.audio_body.clone())
        }
    }
}

/// A temporary upload directory pre-populated with `.md` source files.
#[allow(dead_code)]
pub struct ScratchDirectory {
    dir: TempDir,
}

#[allow(dead_code)]
impl ScratchDirectory {
    /// Create an empty scratch directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Root path of the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a Markdown source file with the given text body.
    pub fn write_markdown(&self, filename: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(filename);
        std::fs::write(&path, text).unwrap();
        path
    }

    /// Write a sibling output file, simulating an already-completed task.
    pub fn write_output(&self, filename: &str, extension: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(filename).with_extension(extension);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Serialize `servers` to a `servers.json` file and return its path.
    pub fn write_servers_file(&self, servers: &[UpstreamServer]) -> PathBuf {
        let path = self.dir.path().join("servers.json");
        std::fs::write(&path, serde_json::to_string(servers).unwrap()).unwrap();
        path
    }
}

/// A 4096-byte audio body, large enough to pass the default size check for
/// any input text under ~1365 characters (`min_bytes_per_char = 3.0`).
#[allow(dead_code)]
pub fn sufficient_audio_body() -> Vec<u8> {
    vec![0u8; 4096]
}
