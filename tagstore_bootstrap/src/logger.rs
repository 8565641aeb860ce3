// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Logger
//!
//! Tracing subscriber initialisation for the workspace binaries.  The level
//! comes from configuration (or the `--verbose` flag); the format is the
//! human-readable tracing default.  Applications log through the `tracing`
//! macros everywhere else.

use tracing::Level;

/// Initialises the global tracing subscriber.
///
/// `level` is one of `error`, `warn`, `info`, `debug`, `trace`; anything
/// unrecognised falls back to `info`.  Calling this twice is harmless: the
/// second initialisation is ignored.
pub fn init_logging(level: &str) {
    let level = parse_level(level);
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .finish();
    // Ignore the error if a subscriber is already installed (tests).
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn parse_level(level: &str) -> Level {
    match level.to_ascii_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(parse_level("nonsense"), Level::INFO);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
    }

    #[test]
    fn double_initialisation_is_harmless() {
        init_logging("info");
        init_logging("debug");
    }
}
