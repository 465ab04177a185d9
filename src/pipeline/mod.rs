//! Pipeline stages for SVG map cleanup.
//!
//! Each submodule implements one family of transformations. Every stage is a
//! pure `&str → String` rewrite; the driver in this module threads the
//! document through them in a fixed order and validates after each one.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ root paint ──▶ collapse ──▶ defs ──▶ enrich ──▶ attrs ──▶ style ──▶ groups ──▶ (line width)
//! ```
//!
//! 1. [`extract`]  — unwrap a nested `<svg>` inside an outer one
//! 2. [`root`]     — force fill / stroke / stroke-width on the root tag
//! 3. [`collapse`] — `<x> </x>` → `<x />`
//! 4. [`defs`]     — drop `<defs>` blocks
//! 5. [`enrich`]   — infer `data-iso` from id / name / data-name / `<title>`
//! 6. [`attrs`]    — strip `data-geo*`, strip the legacy stroke width,
//!    uppercase codes
//! 7. [`style`]    — remove fill / stroke / filter styling from drawables
//! 8. [`groups`]   — remove empty `<g>`
//!
//! Stages work on the parsed [`crate::tree`] first and fall back to a
//! conservative regex rewrite only when the input does not parse. Inside
//! [`Pipeline`] that only happens for the first stage, since every later
//! stage receives a document that already passed [`validate`]; the
//! fallbacks serve callers that run a [`Stage`] on its own, on input that
//! may be malformed.
//! [`validate`] is the gate applied after every stage; [`pretty`] runs once
//! at the end.

pub mod attrs;
pub mod collapse;
pub mod defs;
pub mod enrich;
pub mod extract;
pub mod groups;
pub mod pretty;
pub mod root;
pub mod style;
pub mod validate;

use crate::config::CleanupConfig;
use crate::error::StageError;
use crate::iso::IsoTable;
use crate::progress::ProgressCallback;
use crate::tree::{local_name, Element, XmlDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

/// Opening tag of a drawable element: `(<path|<g)(attributes)(> | />)`.
static RE_DRAWABLE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)(<(?:[A-Za-z_][-\w.]*:)?(?:path|g)\b)([^>]*?)(/?>)").unwrap()
});
/// Opening tag of any element.
static RE_ANY_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(<[A-Za-z_][-\w.:]*)([^>]*?)(/?>)").unwrap());
static RE_ATTR_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([^\s=/>"']+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// One transform step.
pub trait Stage {
    /// Stable identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Rewrite `svg`. An `Err` makes the driver roll back and stop.
    fn apply(&self, svg: &str) -> Result<String, StageError>;
}

/// Run `on_tree` against the parsed document and serialise it, or, when `svg`
/// does not parse, run `on_text` against the raw text instead. A tree edit
/// that changes nothing returns `svg` byte for byte.
pub(crate) fn rewrite(
    stage: &'static str,
    svg: &str,
    on_tree: impl FnOnce(&mut XmlDocument),
    on_text: impl FnOnce(&str) -> String,
) -> Result<String, StageError> {
    match XmlDocument::parse(svg) {
        Ok(mut doc) => {
            let before = doc.clone();
            on_tree(&mut doc);
            if doc == before {
                return Ok(svg.to_string());
            }
            Ok(doc.to_string())
        }
        Err(e) => {
            debug!("{}: input does not parse ({}), using text fallback", stage, e);
            Ok(on_text(svg))
        }
    }
}

/// `path`- or `g`-like element eligible for stripping and enrichment.
pub(crate) fn is_drawable(el: &Element) -> bool {
    el.is("path") || el.is("g")
}

// ── Text fallback helpers ────────────────────────────────────────────────────

/// `(name, raw value)` pairs of an attribute run such as ` id="a" d='M0'`.
pub(crate) fn attr_pairs(attrs: &str) -> impl Iterator<Item = (&str, &str)> {
    RE_ATTR_PAIR.captures_iter(attrs).filter_map(|caps| {
        let name = caps.get(1)?.as_str();
        let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
        Some((name, value))
    })
}

/// Raw value of the first attribute in `attrs` whose local name matches.
pub(crate) fn find_attr<'a>(attrs: &'a str, local: &str) -> Option<&'a str> {
    attr_pairs(attrs)
        .find(|(name, _)| local_name(name).eq_ignore_ascii_case(local))
        .map(|(_, value)| value)
}

/// Rewrite the attribute run of every `<path>`/`<g>` opening tag. `edit`
/// returns `None` to leave a tag untouched.
pub(crate) fn edit_drawable_tags(svg: &str, edit: impl Fn(&str) -> Option<String>) -> String {
    edit_tags(&RE_DRAWABLE_OPEN, svg, edit)
}

/// Same as [`edit_drawable_tags`] for every opening tag.
pub(crate) fn edit_all_tags(svg: &str, edit: impl Fn(&str) -> Option<String>) -> String {
    edit_tags(&RE_ANY_OPEN, svg, edit)
}

fn edit_tags(re: &Regex, svg: &str, edit: impl Fn(&str) -> Option<String>) -> String {
    re.replace_all(svg, |caps: &regex::Captures<'_>| match edit(&caps[2]) {
        Some(attrs) => {
            let attrs = attrs.trim();
            if attrs.is_empty() {
                format!("{}{}", &caps[1], &caps[3])
            } else {
                format!("{} {}{}", &caps[1], attrs, &caps[3])
            }
        }
        None => caps[0].to_string(),
    })
    .into_owned()
}

/// What to do with one attribute of a run.
pub(crate) enum AttrEdit {
    Keep,
    Drop,
    /// Replace the value (raw, written double-quoted).
    Set(String),
}

/// Apply `edit` to each `(name, raw value)` of an attribute run. Returns the
/// new run, or `None` if nothing changed.
pub(crate) fn edit_attr_run(attrs: &str, mut edit: impl FnMut(&str, &str) -> AttrEdit) -> Option<String> {
    let mut out = String::with_capacity(attrs.len());
    let mut last = 0;
    let mut changed = false;
    for caps in RE_ATTR_PAIR.captures_iter(attrs) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        match edit(name.as_str(), value) {
            AttrEdit::Keep => continue,
            AttrEdit::Drop => out.push_str(attrs[last..whole.start()].trim_end()),
            AttrEdit::Set(v) => {
                out.push_str(&attrs[last..whole.start()]);
                out.push_str(name.as_str());
                out.push_str("=\"");
                out.push_str(&v.replace('"', "&quot;"));
                out.push('"');
            }
        }
        last = whole.end();
        changed = true;
    }
    if !changed {
        return None;
    }
    out.push_str(&attrs[last..]);
    Some(out)
}

/// Reserved formatting stage; currently passes the document through.
#[derive(Debug, Default)]
pub struct NormalizeLineWidth;

impl Stage for NormalizeLineWidth {
    fn name(&self) -> &'static str {
        "normalize_line_width"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        Ok(svg.to_string())
    }
}

/// The fixed stage sequence for `config`. `table` is `None` when no lookup
/// resource is available, which turns enrichment into a no-op.
pub fn standard_stages(config: &CleanupConfig, table: Option<IsoTable>) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(extract::ExtractInnerSvg),
        Box::new(root::SetRootPaint::new(config.root_paint.clone())),
        Box::new(collapse::CollapseEmptyElements),
        Box::new(defs::RemoveDefs),
        Box::new(enrich::AddIsoCodes::new(
            table.map(|t| t.with_bare_codes(config.bare_codes)),
            &config.code_attribute,
        )),
        Box::new(attrs::RemoveDebugAttributes::new(&config.debug_attribute_prefix)),
        Box::new(attrs::RemoveLegacyAttribute::new(&config.legacy_attribute)),
        Box::new(attrs::UppercaseCodes::new(&config.code_attribute)),
        Box::new(style::StripVisualStyling),
        Box::new(groups::RemoveEmptyGroups),
        Box::new(NormalizeLineWidth),
    ]
}

// ── Driver ───────────────────────────────────────────────────────────────────

/// Driver state. `Running` carries the index of the next stage and the last
/// document that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Running { stage_index: usize, last_good: String },
    Done { document: String },
    Aborted { last_good: String, failed_stage: &'static str, error: String },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineState::Running { .. })
    }
}

/// Terminal outcome of [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    /// Final document (DONE) or the document from before the failing stage
    /// (ABORTED).
    pub document: String,
    /// Names of the stages whose output was accepted, in order.
    pub completed: Vec<&'static str>,
    /// The stage that failed and why, if the pipeline aborted.
    pub failure: Option<(&'static str, String)>,
}

impl PipelineOutcome {
    pub fn aborted(&self) -> bool {
        self.failure.is_some()
    }
}

/// Ordered stage sequence plus the validation gate between stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            progress: None,
        }
    }

    /// The standard sequence built from `config`, reporting to its callback.
    pub fn from_config(config: &CleanupConfig, table: Option<IsoTable>) -> Self {
        Self {
            stages: standard_stages(config, table),
            progress: config.progress_callback.clone(),
        }
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Advance one transition. Terminal states are returned unchanged.
    pub fn step(&self, state: PipelineState) -> PipelineState {
        let (stage_index, last_good) = match state {
            PipelineState::Running { stage_index, last_good } => (stage_index, last_good),
            terminal => return terminal,
        };
        let Some(stage) = self.stages.get(stage_index) else {
            return PipelineState::Done { document: last_good };
        };

        let name = stage.name();
        info!("[stage] {}", name);
        if let Some(ref cb) = self.progress {
            cb.on_stage_start(stage_index, name);
        }

        let result = stage.apply(&last_good).and_then(|out| {
            validate::validate(&out)
                .map(|()| out)
                .map_err(|source| StageError::InvalidOutput { stage: name, source })
        });

        match result {
            Ok(document) => {
                debug!("{} accepted ({} bytes)", name, document.len());
                if let Some(ref cb) = self.progress {
                    cb.on_stage_complete(stage_index, name, document.len());
                }
                PipelineState::Running {
                    stage_index: stage_index + 1,
                    last_good: document,
                }
            }
            Err(e) => {
                warn!("{}; keeping document from before '{}'", e, name);
                if let Some(ref cb) = self.progress {
                    cb.on_stage_failed(stage_index, name, &e.to_string());
                }
                PipelineState::Aborted {
                    last_good,
                    failed_stage: name,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn run(&self, input: impl Into<String>) -> PipelineOutcome {
        let total = self.stages.len();
        if let Some(ref cb) = self.progress {
            cb.on_pipeline_start(total);
        }

        let mut state = PipelineState::Running {
            stage_index: 0,
            last_good: input.into(),
        };
        let outcome = loop {
            let index = match &state {
                PipelineState::Running { stage_index, .. } => *stage_index,
                _ => total,
            };
            match self.step(state) {
                next @ PipelineState::Running { .. } => state = next,
                PipelineState::Done { document } => {
                    break PipelineOutcome {
                        document,
                        completed: self.stage_names(),
                        failure: None,
                    };
                }
                PipelineState::Aborted { last_good, failed_stage, error } => {
                    let mut completed = self.stage_names();
                    completed.truncate(index);
                    break PipelineOutcome {
                        document: last_good,
                        completed,
                        failure: Some((failed_stage, error)),
                    };
                }
            }
        };

        if let Some(ref cb) = self.progress {
            cb.on_pipeline_complete(outcome.completed.len(), total);
        }
        outcome
    }
}
