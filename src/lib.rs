//! bzsync - push Braze content into Transifex for translation
//!
//! This crate provides the sync engine behind the `bzsync` CLI tool. One run
//! backs up the Transifex project as TMX, lists every Braze email template
//! and content block, and upserts one Transifex resource per item.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Settings file, credentials and resolved run configuration
//! - [`http`] - Transport, retry policy and pagination shared by both APIs
//! - [`braze`] - Braze REST fetcher for email templates and content blocks
//! - [`transifex`] - Transifex resources, uploads and TMX backups
//! - [`model`] - Source items and the run report
//! - [`sync`] - Run orchestration, phases, cancellation and progress events
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod braze;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod sync;
pub mod transifex;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
