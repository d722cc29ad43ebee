// src/cli/continue_args.rs
use clap::Args;
use std::path::PathBuf;

/// Arguments for `mdtts continue`: resume a directory by submitting only the
/// `.md` files that still lack a sibling `.mp3` output.
#[derive(Args, Debug, Clone)]
pub struct ContinueArgs {
    /// Directory to resume.
    pub directory: PathBuf,

    /// Path to a JSON file listing upstream TTS servers (the `api_servers` shape).
    #[arg(long)]
    pub servers: PathBuf,

    /// Voice label forwarded verbatim to every upstream request.
    #[arg(long)]
    pub voice: String,

    /// Playback speed multiplier.
    #[arg(long, default_value_t = 1.0)]
    pub speed: f32,

    /// Pitch parameter, forwarded opaquely to the upstream server.
    #[arg(long, default_value_t = 1.0)]
    pub pitch: f32,

    /// Requested output audio format.
    #[arg(long, default_value = "mp3")]
    pub response_format: String,

    /// Overrides the per-batch global permit count; 0 uses the worker count.
    #[arg(long, default_value_t = 0)]
    pub concurrency: usize,
}
