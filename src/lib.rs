//! # svgmap-clean
//!
//! Normalise an SVG world map so every country shape can be themed from CSS
//! and addressed by its ISO 3166-1 alpha-2 code.
//!
//! ## Why this crate?
//!
//! Maps exported from drawing tools come wrapped in an extra `<svg>`, carry
//! inline fills and strokes, debug attributes, empty groups and `<defs>`
//! nobody uses. This crate rewrites such a file into a small, predictable
//! document: paint lives on the root only, each country path carries a
//! `data-iso` code, and the markup is consistently indented. Running it twice
//! gives the same bytes as running it once.
//!
//! ## Pipeline Overview
//!
//! ```text
//! SVG
//!  │
//!  ├─ 1. Protect   hold <text> blocks out behind comment placeholders
//!  ├─ 2. Stages    11 ordered rewrites, each validated; roll back on failure
//!  ├─ 3. Pretty    re-indent (falls back to unformatted output)
//!  ├─ 4. Restore   put <text> blocks back verbatim
//!  └─ 5. Output    dry-run preview, or backup + atomic in-place write
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use svgmap_clean::{clean_file, preview, CleanupConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CleanupConfig::builder()
//!         .input("public/data/worldmap.svg")
//!         .build()?;
//!     let output = clean_file(&config)?;
//!     println!("{}", preview(&output, 2000));
//!     eprintln!("stages: {}", output.report.completed_stages.join(", "));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `svgmap-clean` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! svgmap-clean = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cleanup;
pub mod config;
pub mod error;
pub mod iso;
pub mod names;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod protect;
pub mod tree;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cleanup::{clean_file, clean_str, clean_with_table, preview, run, write_in_place};
pub use config::{CleanupConfig, CleanupConfigBuilder, RootPaint, WriteMode};
pub use error::{StageError, SvgCleanError};
pub use iso::IsoTable;
pub use names::normalize_name;
pub use output::{CleanupOutput, CleanupReport, StageFailure};
pub use pipeline::pretty::pretty_print;
pub use pipeline::validate::validate;
pub use pipeline::{Pipeline, PipelineOutcome, PipelineState, Stage};
pub use progress::{CleanupProgressCallback, NoopProgressCallback, ProgressCallback};
pub use protect::ProtectedText;
pub use tree::XmlError;
