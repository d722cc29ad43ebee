//! External service integrations for mdtts.
//!
//! # Modules
//!
//! - [`tts_client`] - HTTP client for the upstream TTS synthesis endpoint

pub mod tts_client;
