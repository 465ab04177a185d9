//! Validation gate: every stage's output must be well-formed XML.

use crate::tree::{self, XmlError};

/// `Ok(())` when `svg` parses as a well-formed document.
pub fn validate(svg: &str) -> Result<(), XmlError> {
    tree::parse(svg).map(|_| ())
}

/// Tuple form used for reporting: `(true, "OK")` or `(false, reason)`.
pub fn check(svg: &str) -> (bool, String) {
    match validate(svg) {
        Ok(()) => (true, "OK".to_string()),
        Err(e) => (false, e.to_string()),
    }
}
