//! Name → ISO 3166-1 alpha-2 code resolution.
//!
//! The lookup resource is a JSON object mapping a code to a display name:
//!
//! ```json
//! { "FR": "France", "ST": "São Tomé and Príncipe" }
//! ```
//!
//! Names are normalised with [`normalize_name`] and indexed; codes are
//! uppercased. With [`IsoTable::with_bare_codes`], two-letter codes from the
//! table are also accepted as candidates themselves (an element whose id is
//! already `fr` resolves to `FR`), but only after the name index missed.
//!
//! A missing or unreadable resource is not an error: callers get `None` from
//! [`IsoTable::load`] and enrichment simply does nothing.

use crate::names::normalize_name;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Immutable mapping from normalised country name to uppercase code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsoTable {
    by_name: HashMap<String, String>,
    by_code: HashMap<String, String>,
    bare_codes: bool,
}

impl IsoTable {
    /// Build from `(code, name)` pairs. Entries whose normalised name is empty
    /// are dropped; a later duplicate name overwrites an earlier one.
    pub fn from_entries<I, C, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: AsRef<str>,
        N: AsRef<str>,
    {
        let mut by_name = HashMap::new();
        let mut by_code = HashMap::new();
        for (code, name) in entries {
            let key = normalize_name(name.as_ref());
            if key.is_empty() {
                continue;
            }
            let code = code.as_ref().trim().to_uppercase();
            if code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
                by_code.insert(code.to_lowercase(), code.clone());
            }
            by_name.insert(key, code);
        }
        Self {
            by_name,
            by_code,
            bare_codes: false,
        }
    }

    /// Toggle resolution of candidates that are already a known code.
    pub fn with_bare_codes(mut self, enabled: bool) -> Self {
        self.bare_codes = enabled;
        self
    }

    /// Parse the JSON object form. Non-string values are skipped.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let map: Map<String, Value> = serde_json::from_str(json)?;
        let entries = map.iter().filter_map(|(code, name)| match name {
            Value::String(s) => Some((code.as_str(), s.as_str())),
            other => {
                debug!("Skipping ISO entry '{}': value is not a string ({})", code, other);
                None
            }
        });
        Ok(Self::from_entries(entries))
    }

    /// Load the table from disk. Any failure yields `None` ("no codes
    /// available") and is only logged at debug level.
    pub fn load(path: &Path) -> Option<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                debug!("ISO table {} unavailable: {}", path.display(), e);
                return None;
            }
        };
        match Self::from_json_str(&text) {
            Ok(table) => {
                debug!("Loaded {} ISO names from {}", table.len(), path.display());
                Some(table)
            }
            Err(e) => {
                debug!("ISO table {} is not a JSON object: {}", path.display(), e);
                None
            }
        }
    }

    /// Code for `candidate`, if its normalised form is a known name or,
    /// with bare codes enabled, a known two-letter code.
    pub fn resolve(&self, candidate: &str) -> Option<&str> {
        let key = normalize_name(candidate);
        if key.is_empty() {
            return None;
        }
        self.by_name
            .get(&key)
            .or_else(|| self.by_code.get(&key).filter(|_| self.bare_codes))
            .map(String::as_str)
    }

    /// Number of indexed names.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Resolve with an optional table and an optional candidate; absent table or
/// absent/empty candidate resolve to `None`.
pub fn resolve(candidate: Option<&str>, table: Option<&IsoTable>) -> Option<String> {
    let candidate = candidate.filter(|c| !c.trim().is_empty())?;
    table?.resolve(candidate).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn us_table() -> IsoTable {
        IsoTable::from_json_str(r#"{"us": "United States"}"#).unwrap()
    }

    #[test]
    fn resolves_with_loose_spacing() {
        let table = us_table();
        assert_eq!(resolve(Some("United   States"), Some(&table)).as_deref(), Some("US"));
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(resolve(Some("Unknown Place"), Some(&us_table())), None);
    }

    #[test]
    fn no_table_is_none() {
        assert_eq!(resolve(Some("United States"), None), None);
        assert_eq!(resolve(Some("France"), None), None);
    }

    #[test]
    fn empty_candidate_is_none() {
        let table = us_table();
        assert_eq!(resolve(None, Some(&table)), None);
        assert_eq!(resolve(Some(""), Some(&table)), None);
        assert_eq!(resolve(Some(" - "), Some(&table)), None);
    }

    #[test]
    fn later_duplicate_wins() {
        let table = IsoTable::from_json_str(r#"{"xa": "Georgia", "ge": "GEORGIA"}"#).unwrap();
        assert_eq!(table.resolve("georgia"), Some("GE"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn empty_names_and_non_strings_dropped() {
        let table = IsoTable::from_json_str(r#"{"aa": "", "bb": 3, "cc": "???", "fr": "France"}"#)
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("FRANCE"), Some("FR"));
    }

    #[test]
    fn bare_codes_ignored_by_default() {
        let table = IsoTable::from_json_str(r#"{"FR": "France", "NO": "Norway"}"#).unwrap();
        assert_eq!(table.resolve("FR"), None);
        assert_eq!(resolve(Some("no"), Some(&table)), None);
        assert_eq!(table.resolve("Norway"), Some("NO"));
    }

    #[test]
    fn bare_code_resolves_when_enabled() {
        let table = IsoTable::from_json_str(r#"{"FR": "France", "NOR": "Norway"}"#)
            .unwrap()
            .with_bare_codes(true);
        assert_eq!(table.resolve("FR"), Some("FR"));
        assert_eq!(table.resolve("fr"), Some("FR"));
        assert_eq!(table.resolve("nor"), None);
        assert_eq!(table.resolve("de"), None);
    }

    #[test]
    fn names_beat_codes() {
        // a name that normalises to a code-like key wins over the alias
        let table = IsoTable::from_json_str(r#"{"CI": "Ivory Coast", "XX": "ci"}"#)
            .unwrap()
            .with_bare_codes(true);
        assert_eq!(table.resolve("CI"), Some("XX"));
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(IsoTable::load(&dir.path().join("nope.json")).is_none());
    }

    #[test]
    fn load_garbage_is_none() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"[1, 2, 3]").unwrap();
        assert!(IsoTable::load(f.path()).is_none());
    }

    #[test]
    fn load_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all("{\"st\": \"São Tomé & Príncipe\"}".as_bytes()).unwrap();
        let table = IsoTable::load(f.path()).unwrap();
        assert_eq!(table.resolve("Sao Tome and Principe"), Some("ST"));
    }
}
