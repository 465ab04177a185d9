//! Error types for the svgmap-clean library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SvgCleanError`] — **Fatal**: the run cannot proceed at all (input
//!   file missing, backup or write failed, bad configuration). Returned as
//!   `Err(SvgCleanError)` from [`crate::cleanup::clean_file`] and
//!   [`crate::cleanup::write_in_place`].
//!
//! * [`StageError`] — **Non-fatal**: a single pipeline stage raised or
//!   produced malformed XML. The driver logs it, rolls back to the last good
//!   document and stops; the failure is recorded in
//!   [`crate::output::CleanupReport`] instead of being propagated.
//!
//! Malformed XML itself is described by [`crate::tree::XmlError`].

use crate::tree::XmlError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the svgmap-clean library.
#[derive(Debug, Error)]
pub enum SvgCleanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input SVG was not found at the given path.
    #[error("SVG not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The input exists but could not be read as UTF-8 text.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the timestamped backup copy.
    #[error("Failed to back up '{path}': {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not overwrite the source file.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal failure of one pipeline stage.
///
/// The pipeline keeps the document from before the failing stage and stops.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    /// The stage itself could not complete.
    #[error("stage '{stage}' failed: {detail}")]
    Failed { stage: &'static str, detail: String },

    /// The stage completed but its output is not well-formed XML.
    #[error("invalid XML after stage '{stage}': {source}")]
    InvalidOutput {
        stage: &'static str,
        #[source]
        source: XmlError,
    },
}

impl StageError {
    /// Name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::Failed { stage, .. } | StageError::InvalidOutput { stage, .. } => stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let e = SvgCleanError::FileNotFound {
            path: PathBuf::from("public/data/worldmap.svg"),
        };
        assert!(e.to_string().contains("worldmap.svg"), "got: {e}");
    }

    #[test]
    fn stage_failed_display() {
        let e = StageError::Failed {
            stage: "remove_defs",
            detail: "boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("remove_defs"));
        assert!(msg.contains("boom"));
        assert_eq!(e.stage(), "remove_defs");
    }

    #[test]
    fn invalid_output_carries_position() {
        let e = StageError::InvalidOutput {
            stage: "add_iso_codes",
            source: XmlError::new(17, "unclosed element <g>"),
        };
        let msg = e.to_string();
        assert!(msg.contains("add_iso_codes"), "got: {msg}");
        assert!(msg.contains("byte 17"), "got: {msg}");
        assert_eq!(e.stage(), "add_iso_codes");
    }

    #[test]
    fn invalid_config_display() {
        let e = SvgCleanError::InvalidConfig("indent must not be empty".into());
        assert!(e.to_string().contains("indent must not be empty"));
    }
}
