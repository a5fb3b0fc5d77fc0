//! Core domain + application logic for the Telegram group image archiver.
//!
//! This crate is intentionally transport-agnostic. The Telegram client lives
//! behind ports (traits) implemented in adapter crates.

pub mod archive;
pub mod classify;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod utils;

pub use errors::{Error, Result};
