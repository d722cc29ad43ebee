//! mdtts library root: a batch Markdown-to-speech dispatcher.
//!
//! Five cooperating subsystems in `core` (registry, worker pool, outcome
//! classifier, retry policy, adaptive controller, task executor, and the
//! dispatcher pairing loop) drive a batch of Markdown files through an
//! upstream TTS service, exposed through the `cli`/`commands` front end.

/// Crate version, as reported by `mdtts --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub type Result<T> = error::MdttsResult<T>;

pub mod services;
