// src/cli/submit_args.rs
use clap::Args;
use std::path::PathBuf;

/// Arguments for `mdtts submit`: scan a directory for eligible `.md` files,
/// build a batch over every one of them, and run it to completion.
#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// Directory containing `.md` source files and, on completion, their `.mp3` outputs.
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
