//! Top-level entry points.
//!
//! A run is: hold `<text>` blocks out of the document, drive the stage
//! pipeline, pretty print, then put the `<text>` blocks back. Only I/O around
//! that can fail fatally; a failing stage is recorded in the report and the
//! run still produces a document.

use crate::config::{CleanupConfig, WriteMode};
use crate::error::SvgCleanError;
use crate::iso::IsoTable;
use crate::output::{CleanupOutput, CleanupReport, StageFailure};
use crate::pipeline::pretty::pretty_print;
use crate::pipeline::Pipeline;
use crate::protect::ProtectedText;
use crate::tree::XmlDocument;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Clean an SVG document held in memory.
///
/// The lookup table is loaded from [`CleanupConfig::iso_table_path`]; when it
/// is missing, code enrichment is skipped.
pub fn clean_str(svg: &str, config: &CleanupConfig) -> CleanupOutput {
    let table_path = config.iso_table_path();
    let table = IsoTable::load(&table_path);
    if table.is_none() {
        info!("No ISO table at {}; skipping code enrichment", table_path.display());
    }
    clean_with_table(svg, config, table)
}

/// Like [`clean_str`], with the lookup table supplied by the caller.
pub fn clean_with_table(svg: &str, config: &CleanupConfig, table: Option<IsoTable>) -> CleanupOutput {
    let start = Instant::now();

    // ── Step 1: Hold out <text> blocks ───────────────────────────────────
    let (protected_svg, protected) = ProtectedText::extract(svg);
    debug!("Protected {} <text> block(s)", protected.len());

    // ── Step 2: Stage pipeline ───────────────────────────────────────────
    let pipeline = Pipeline::from_config(config, table);
    let outcome = pipeline.run(protected_svg.as_str());

    // ── Step 3: Pretty print ─────────────────────────────────────────────
    info!("[stage] pretty_format");
    let (formatted, pretty_printed) = match pretty_print(&outcome.document, &config.indent) {
        Ok(s) => (s, true),
        Err(e) => {
            warn!("Pretty printing failed ({}); keeping unformatted output", e);
            (outcome.document.clone(), false)
        }
    };
    let coded_elements = count_coded(&outcome.document, &config.code_attribute);

    // ── Step 4: Restore <text> blocks ────────────────────────────────────
    let svg = protected.restore(&formatted);

    let report = CleanupReport {
        completed_stages: outcome.completed.iter().map(|s| s.to_string()).collect(),
        failure: outcome.failure.map(|(stage, error)| StageFailure {
            stage: stage.to_string(),
            error,
        }),
        protected_fragments: protected.len(),
        coded_elements,
        pretty_printed,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Cleanup finished: {}/{} stages, {} coded element(s), {}ms",
        report.completed_stages.len(),
        pipeline.stage_names().len(),
        report.coded_elements,
        report.duration_ms
    );

    CleanupOutput { svg, report }
}

fn count_coded(svg: &str, attribute: &str) -> usize {
    let Ok(mut doc) = XmlDocument::parse(svg) else {
        return 0;
    };
    let mut n = 0;
    doc.root.for_each_element_mut(&mut |el| {
        if el.has_attr(attribute) {
            n += 1;
        }
    });
    n
}

/// Read [`CleanupConfig::input`] and clean it.
///
/// # Errors
/// - [`SvgCleanError::FileNotFound`] if the input does not exist
/// - [`SvgCleanError::ReadFailed`] if it cannot be read as UTF-8
pub fn clean_file(config: &CleanupConfig) -> Result<CleanupOutput, SvgCleanError> {
    let path = &config.input;
    if !path.exists() {
        return Err(SvgCleanError::FileNotFound { path: path.clone() });
    }
    info!("Cleaning {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|e| SvgCleanError::ReadFailed {
        path: path.clone(),
        source: e,
    })?;
    Ok(clean_str(&text, config))
}

/// Clean the configured input and, in [`WriteMode::InPlace`], overwrite it.
/// Returns the output and the backup path if one was written.
pub fn run(config: &CleanupConfig) -> Result<(CleanupOutput, Option<PathBuf>), SvgCleanError> {
    let output = clean_file(config)?;
    let backup = match config.mode {
        WriteMode::DryRun => None,
        WriteMode::InPlace => Some(write_in_place(&config.input, &output)?),
    };
    Ok((output, backup))
}

/// `<path>.bak.<YYYYmmdd_HHMMSS>` in local time.
pub fn backup_path(path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".bak.{stamp}"));
    PathBuf::from(name)
}

/// Back up `path`, then replace it with `output.svg`.
///
/// Uses atomic write (temp file in the same directory + rename) so a failed
/// write never leaves a truncated file behind. Returns the backup path.
pub fn write_in_place(path: &Path, output: &CleanupOutput) -> Result<PathBuf, SvgCleanError> {
    let backup = backup_path(path);
    std::fs::copy(path, &backup).map_err(|e| SvgCleanError::BackupFailed {
        path: backup.clone(),
        source: e,
    })?;
    debug!("Backed up {} to {}", path.display(), backup.display());

    let write_err = |e: std::io::Error| SvgCleanError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let permissions = std::fs::metadata(path).map_err(write_err)?.permissions();
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(output.svg.as_bytes()).map_err(write_err)?;
    tmp.as_file().set_permissions(permissions).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Wrote {} (backup: {})", path.display(), backup.display());
    Ok(backup)
}

/// The first `chars` characters of the cleaned document.
pub fn preview(output: &CleanupOutput, chars: usize) -> &str {
    match output.svg.char_indices().nth(chars) {
        Some((end, _)) => &output.svg[..end],
        None => &output.svg,
    }
}
