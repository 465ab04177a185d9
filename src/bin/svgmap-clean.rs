//! CLI binary for svgmap-clean.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `CleanupConfig`, runs the cleanup and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use svgmap_clean::config::DEFAULT_INPUT;
use svgmap_clean::{
    preview, run, CleanupConfig, CleanupOutput, CleanupProgressCallback, ProgressCallback,
    SvgCleanError, WriteMode,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the stage list plus a log line
/// per stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos:>2}/{len} stages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Cleaning");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl CleanupProgressCallback for CliProgressCallback {
    fn on_pipeline_start(&self, total_stages: usize) {
        self.bar.set_length(total_stages as u64);
    }

    fn on_stage_start(&self, _index: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_stage_complete(&self, index: usize, name: &str, bytes: usize) {
        self.bar.println(format!(
            "  {} {:>2} [stage] {:<28} {}",
            green("✓"),
            index + 1,
            name,
            dim(&format!("{bytes:>8} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_stage_failed(&self, index: usize, name: &str, error: &str) {
        // Keep output tidy on very long parser messages.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>2} [stage] {:<28} {}",
            red("✗"),
            index + 1,
            name,
            red(&msg)
        ));
    }

    fn on_pipeline_complete(&self, completed: usize, total_stages: usize) {
        self.bar.finish_and_clear();
        if completed == total_stages {
            eprintln!("{} {} stages applied", green("✔"), bold(&completed.to_string()));
        } else {
            eprintln!(
                "{} {}/{} stages applied, rolled back to the last valid document",
                cyan("⚠"),
                bold(&completed.to_string()),
                total_stages
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Dry run on the default map, print a preview
  svgmap-clean

  # Clean a specific file in place (a timestamped backup is written first)
  svgmap-clean --in-place --file assets/world.svg

  # Use a lookup table from somewhere else
  svgmap-clean --iso-table data/ISO3166-1.json

  # Machine-readable report
  svgmap-clean --json > report.json

LOOKUP TABLE:
  A JSON object mapping ISO 3166-1 alpha-2 codes to country names, e.g.
  {"FR": "France", "ST": "São Tomé and Príncipe"}. By default it is read from
  ISO3166-1.json next to the input file. When missing, codes are not added.
  Elements are matched by name; --bare-codes also accepts ids that already
  are a code from the table.

EXIT CODES:
  0  cleanup ran (including when a stage was rolled back)
  1  I/O error (unreadable input, backup or write failed)
  2  input file not found

ENVIRONMENT VARIABLES:
  SVGMAP_FILE          Default for --file
  SVGMAP_ISO_TABLE     Default for --iso-table
  SVGMAP_BARE_CODES    Default for --bare-codes
  RUST_LOG             Override log filter (e.g. svgmap_clean=debug)
"#;

/// Normalise an SVG world map for CSS theming and ISO-code lookup.
#[derive(Parser, Debug)]
#[command(
    name = "svgmap-clean",
    version,
    about = "Normalise an SVG world map for CSS theming and ISO-code lookup",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Overwrite the input after writing a timestamped backup.
    #[arg(long)]
    in_place: bool,

    /// SVG file to clean.
    #[arg(long, env = "SVGMAP_FILE", default_value = DEFAULT_INPUT)]
    file: PathBuf,

    /// Code → name lookup table (default: ISO3166-1.json next to --file).
    #[arg(long, env = "SVGMAP_ISO_TABLE")]
    iso_table: Option<PathBuf>,

    /// Also treat ids that already are a table code (`id="fr"`) as that code.
    #[arg(long, env = "SVGMAP_BARE_CODES")]
    bare_codes: bool,

    /// Characters of the result to print in a dry run.
    #[arg(long, env = "SVGMAP_PREVIEW_CHARS", default_value_t = 2000)]
    preview_chars: usize,

    /// Print the full result and report as JSON instead of a preview.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SVGMAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SVGMAP_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "SVGMAP_NO_PROGRESS")]
    no_progress: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level stage logs when it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match execute(&cli, show_progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = match e.downcast_ref::<SvgCleanError>() {
                Some(SvgCleanError::FileNotFound { .. }) => 2,
                _ => 1,
            };
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::from(code)
        }
    }
}

fn execute(cli: &Cli, show_progress: bool) -> Result<()> {
    let config = build_config(cli, show_progress)?;
    let (output, backup) = run(&config)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        print_summary(&output);
    }

    match backup {
        Some(bak) => {
            if !cli.quiet {
                println!("Wrote {} (backup: {})", config.input.display(), bak.display());
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "Dry run - changes ready. Preview (head):\n")
                .and_then(|()| writeln!(handle, "{}", preview(&output, config.preview_chars)))
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

/// Map CLI args to `CleanupConfig`.
fn build_config(cli: &Cli, show_progress: bool) -> Result<CleanupConfig> {
    let mut builder = CleanupConfig::builder()
        .input(&cli.file)
        .preview_chars(cli.preview_chars)
        .bare_codes(cli.bare_codes)
        .mode(if cli.in_place {
            WriteMode::InPlace
        } else {
            WriteMode::DryRun
        });
    if let Some(ref table) = cli.iso_table {
        builder = builder.iso_table(table);
    }
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

fn print_summary(output: &CleanupOutput) {
    let report = &output.report;
    if let Some(ref failure) = report.failure {
        eprintln!(
            "{} stage {} failed: {}",
            cyan("⚠"),
            bold(&failure.stage),
            dim(&failure.error)
        );
    }
    eprintln!(
        "   {} coded elements  /  {} protected text blocks  —  {}ms total",
        dim(&report.coded_elements.to_string()),
        dim(&report.protected_fragments.to_string()),
        report.duration_ms,
    );
    if !report.pretty_printed {
        eprintln!("   {}", dim("pretty printing skipped: output is not well-formed"));
    }
}
