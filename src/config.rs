//! Configuration types for an SVG map cleanup run.
//!
//! Every knob lives in [`CleanupConfig`], built via its
//! [`CleanupConfigBuilder`]. File locations and attribute names are explicit
//! fields here rather than module-level constants, so tests and alternative
//! maps can drive the same pipeline without touching globals.

use crate::error::SvgCleanError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default map location, relative to the project root.
pub const DEFAULT_INPUT: &str = "public/data/worldmap.svg";

/// File name of the lookup table looked for next to the input.
pub const DEFAULT_ISO_TABLE_NAME: &str = "ISO3166-1.json";

/// Configuration for a cleanup run.
///
/// # Example
/// ```rust
/// use svgmap_clean::{CleanupConfig, WriteMode};
///
/// let config = CleanupConfig::builder()
///     .input("maps/world.svg")
///     .mode(WriteMode::InPlace)
///     .build()
///     .unwrap();
/// assert!(config.iso_table_path().ends_with("ISO3166-1.json"));
/// ```
#[derive(Clone)]
pub struct CleanupConfig {
    /// SVG file to clean. Default: `public/data/worldmap.svg`.
    pub input: PathBuf,

    /// Lookup table override. When `None`, `ISO3166-1.json` next to `input`.
    pub iso_table: Option<PathBuf>,

    /// Attribute that carries the inferred country code. Default: `data-iso`.
    pub code_attribute: String,

    /// Also accept a candidate that is itself a two-letter code from the
    /// lookup table (`id="fr"` → `FR`), after name lookup misses. Default: off.
    pub bare_codes: bool,

    /// Attributes starting with this prefix are stripped from drawable
    /// elements. Default: `data-geo`.
    pub debug_attribute_prefix: String,

    /// Attribute removed from every element. Default: `data-originalStrokeWidth`.
    pub legacy_attribute: String,

    /// Presentation attributes forced onto the root element.
    pub root_paint: RootPaint,

    /// Indentation unit for the pretty printer. Default: two spaces.
    pub indent: String,

    /// How many characters of output a dry run previews. Default: 2000.
    pub preview_chars: usize,

    /// Dry run (default) or overwrite with backup.
    pub mode: WriteMode,

    /// Optional per-stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            iso_table: None,
            code_attribute: "data-iso".to_string(),
            bare_codes: false,
            debug_attribute_prefix: "data-geo".to_string(),
            legacy_attribute: "data-originalStrokeWidth".to_string(),
            root_paint: RootPaint::default(),
            indent: "  ".to_string(),
            preview_chars: 2000,
            mode: WriteMode::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CleanupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupConfig")
            .field("input", &self.input)
            .field("iso_table", &self.iso_table)
            .field("code_attribute", &self.code_attribute)
            .field("bare_codes", &self.bare_codes)
            .field("debug_attribute_prefix", &self.debug_attribute_prefix)
            .field("legacy_attribute", &self.legacy_attribute)
            .field("root_paint", &self.root_paint)
            .field("indent", &self.indent)
            .field("preview_chars", &self.preview_chars)
            .field("mode", &self.mode)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn CleanupProgressCallback>"),
            )
            .finish()
    }
}

impl CleanupConfig {
    /// Create a new builder for `CleanupConfig`.
    pub fn builder() -> CleanupConfigBuilder {
        CleanupConfigBuilder {
            config: Self::default(),
        }
    }

    /// Effective lookup-table path: the override, else the default name in
    /// the input's directory.
    pub fn iso_table_path(&self) -> PathBuf {
        match &self.iso_table {
            Some(p) => p.clone(),
            None => self
                .input
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(DEFAULT_ISO_TABLE_NAME),
        }
    }
}

/// Builder for [`CleanupConfig`].
#[derive(Debug)]
pub struct CleanupConfigBuilder {
    config: CleanupConfig,
}

impl CleanupConfigBuilder {
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input = path.into();
        self
    }

    pub fn iso_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.iso_table = Some(path.into());
        self
    }

    pub fn code_attribute(mut self, name: impl Into<String>) -> Self {
        self.config.code_attribute = name.into();
        self
    }

    pub fn bare_codes(mut self, enabled: bool) -> Self {
        self.config.bare_codes = enabled;
        self
    }

    pub fn debug_attribute_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.debug_attribute_prefix = prefix.into();
        self
    }

    pub fn legacy_attribute(mut self, name: impl Into<String>) -> Self {
        self.config.legacy_attribute = name.into();
        self
    }

    pub fn root_paint(mut self, paint: RootPaint) -> Self {
        self.config.root_paint = paint;
        self
    }

    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.config.indent = indent.into();
        self
    }

    pub fn preview_chars(mut self, n: usize) -> Self {
        self.config.preview_chars = n;
        self
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CleanupConfig, SvgCleanError> {
        let c = &self.config;
        for (what, name) in [
            ("code attribute", &c.code_attribute),
            ("legacy attribute", &c.legacy_attribute),
            ("debug attribute prefix", &c.debug_attribute_prefix),
        ] {
            if !is_xml_name(name) {
                return Err(SvgCleanError::InvalidConfig(format!(
                    "{what} '{name}' is not a valid XML attribute name"
                )));
            }
        }
        if c.indent.is_empty() || !c.indent.chars().all(|ch| ch == ' ' || ch == '\t') {
            return Err(SvgCleanError::InvalidConfig(
                "indent must be one or more spaces or tabs".into(),
            ));
        }
        for (what, value) in [
            ("fill", &c.root_paint.fill),
            ("stroke", &c.root_paint.stroke),
            ("stroke-width", &c.root_paint.stroke_width),
        ] {
            if value.contains(['"', '<', '&']) {
                return Err(SvgCleanError::InvalidConfig(format!(
                    "root {what} '{value}' contains markup characters"
                )));
            }
        }
        Ok(self.config)
    }
}

fn is_xml_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

// ── Value types ──────────────────────────────────────────────────────────

/// Presentation attributes written onto the root `<svg>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootPaint {
    pub fill: String,
    pub stroke: String,
    pub stroke_width: String,
}

impl Default for RootPaint {
    fn default() -> Self {
        Self {
            fill: "#fff".to_string(),
            stroke: "#000".to_string(),
            stroke_width: "0.2".to_string(),
        }
    }
}

/// What to do with the cleaned document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WriteMode {
    /// Print a preview, write nothing. (default)
    #[default]
    DryRun,
    /// Write a timestamped backup, then overwrite the input.
    InPlace,
}
