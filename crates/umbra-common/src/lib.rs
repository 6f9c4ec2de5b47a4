//! Common utilities for the umbra style engine.
//!
//! This crate provides shared infrastructure used by all umbra components:
//! - **Warning System** - deduplicated diagnostics for unsupported or malformed input

pub mod warning;
