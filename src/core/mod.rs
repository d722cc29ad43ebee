//! Core dispatcher engine for mdtts.
//!
//! Five cooperating subsystems, in dependency order (leaves first):
//! - `registry` (C1) — the Batch Registry; sole source of truth for progress.
//! - `worker` (C2) — the Worker Pool; one entry per upstream TTS server.
//! - `outcome` — the outcome classification sum type shared by C4 and C5.
//! - `retry` (part of C5) — per-class retry caps and backoff formulas.
//! - `controller` (part of C5) — the sliding-window adaptive dispatch interval.
//! - `executor` (C4) — the per-task HTTP call, validation, and atomic write.
//! - `dispatcher` (C3) — the pairing loop tying all of the above together.
//! - `naming` — filename and batch-directory sanitization for the storage layer.
#![allow(dead_code)]

pub mod controller;
pub mod dispatcher;
pub mod executor;
pub mod naming;
pub mod outcome;
pub mod registry;
pub mod retry;
pub mod worker;
