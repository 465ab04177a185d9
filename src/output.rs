//! Result types returned by [`crate::cleanup`].

use serde::{Deserialize, Serialize};

/// The cleaned document plus what happened while producing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupOutput {
    /// Final SVG text, with protected `<text>` blocks restored.
    pub svg: String,
    pub report: CleanupReport,
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Stages whose output was accepted, in order.
    pub completed_stages: Vec<String>,

    /// Set when a stage failed and the pipeline rolled back.
    pub failure: Option<StageFailure>,

    /// Number of `<text>` blocks held out of the pipeline.
    pub protected_fragments: usize,

    /// Elements carrying the code attribute in the final document.
    pub coded_elements: usize,

    /// False when pretty printing failed and the unformatted pipeline output
    /// was kept.
    pub pretty_printed: bool,

    pub duration_ms: u64,
}

impl CleanupReport {
    /// True when every stage ran.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// The stage that stopped the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serialises_failure() {
        let report = CleanupReport {
            completed_stages: vec!["extract_inner_svg".into()],
            failure: Some(StageFailure {
                stage: "set_root_paint".into(),
                error: "boom".into(),
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failure"]["stage"], "set_root_paint");
        assert_eq!(json["completed_stages"][0], "extract_inner_svg");
        assert!(!report.is_complete());
    }
}
