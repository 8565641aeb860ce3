// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Codes
//!
//! Unix exit code mapping for the workspace binaries, following the BSD
//! `sysexits.h` conventions where they fit.

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    /// Bad command line usage or arguments.
    Usage,
    /// Configuration file missing or invalid.
    Config,
    /// A backing service (database, cache, index) was unavailable.
    Unavailable,
    /// Any other runtime failure.
    Failure,
}

impl ExitCode {
    /// The numeric code handed to the OS.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Usage => 64,
            ExitCode::Config => 78,
            ExitCode::Unavailable => 69,
            ExitCode::Failure => 1,
        }
    }

    /// Terminates the process with this exit code.
    pub fn exit(self) -> ! {
        std::process::exit(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_sysexits() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Usage.code(), 64);
        assert_eq!(ExitCode::Config.code(), 78);
        assert_eq!(ExitCode::Unavailable.code(), 69);
    }
}
