// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Steckwerk.

use thiserror::Error;

/// Top-level error type for all Steckwerk operations.
///
/// "Not supported" and "already installed" are NOT errors; they are
/// ordinary provisioning outcomes (see `steckwerk-provision`).
#[derive(Debug, Error)]
pub enum SteckwerkError {
    // -- Device / input errors --
    #[error("device {0} has no serial number")]
    MissingSerial(String),

    #[error("unsafe {field} rejected: {value:?}")]
    UnsafeInput { field: &'static str, value: String },

    #[error("invalid USB id {0:?} (expected decimal or 0x-prefixed hex)")]
    InvalidId(String),

    // -- Spooler errors --
    #[error("printer not visible to the spooler yet (manufacturer {manufacturer}, serial {serial})")]
    NotDetected {
        manufacturer: String,
        serial: String,
    },

    #[error("no driver in the spooler catalog matches model {model:?}")]
    NoDriverFound { model: String },

    #[error("print spooler error: {0}")]
    Spooler(String),

    // -- External commands --
    #[error("failed to launch {program}: {source}")]
    CommandLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {status}: {stderr}")]
    CommandFailed {
        program: String,
        /// Exit code; -1 when the process was killed by a signal.
        status: i32,
        stderr: String,
    },

    #[error("{program} did not finish within {secs}s")]
    CommandTimeout { program: String, secs: u64 },

    // -- Hotplug feed --
    #[error("hotplug monitor error: {0}")]
    Monitor(String),

    // -- Startup preconditions --
    #[error(
        "you must run this program as root since it needs to modify {rules_dir} \
         and run `udevadm trigger`"
    )]
    NotRoot { rules_dir: String },

    // -- I/O / serialization --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SteckwerkError {
    /// Whether a later hotplug event for the same device could plausibly
    /// succeed without operator intervention.
    ///
    /// A freshly attached printer takes a moment to appear in the
    /// spooler's USB scan, and a busy CUPS can blow a command timeout;
    /// both clear on their own. Everything else needs a human.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NotDetected { .. } | Self::CommandTimeout { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SteckwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_detected_is_transient() {
        let err = SteckwerkError::NotDetected {
            manufacturer: "DYMO".into(),
            serial: "01010112345600".into(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn timeout_is_transient() {
        let err = SteckwerkError::CommandTimeout {
            program: "lpinfo".into(),
            secs: 120,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn unsafe_input_is_terminal() {
        let err = SteckwerkError::UnsafeInput {
            field: "serial",
            value: "bad\"serial".into(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn no_driver_is_terminal() {
        let err = SteckwerkError::NoDriverFound {
            model: "QL-9000".into(),
        };
        assert!(!err.is_transient());
    }
}
