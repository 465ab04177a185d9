//! Country-name normalisation for loose matching.
//!
//! The same function keys the lookup table and normalises every runtime
//! query; any asymmetry between the two silently turns hits into misses.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static RE_NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Canonicalise a free-text country name.
///
/// Diacritics are stripped (NFKD + drop combining marks), the result is
/// lowercased, `&` becomes `and`, every run outside `[a-z0-9]` becomes one
/// space, and the ends are trimmed. Total and idempotent.
///
/// ```
/// use svgmap_clean::names::normalize_name;
/// assert_eq!(normalize_name("São Tomé & Príncipe"), "sao tome and principe");
/// ```
pub fn normalize_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let folded: String = name
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    // compatibility decomposition can reintroduce capitals (e.g. U+210C)
    let folded = folded.to_lowercase().replace('&', " and ");
    RE_NON_ALNUM
        .replace_all(&folded, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_diacritics_and_ampersand() {
        assert_eq!(normalize_name("São Tomé & Príncipe"), "sao tome and principe");
    }

    #[test]
    fn empty_is_empty() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("  -- "), "");
    }

    #[test]
    fn collapses_punctuation_runs() {
        assert_eq!(normalize_name("Korea, Republic of"), "korea republic of");
        assert_eq!(normalize_name("  Côte d'Ivoire  "), "cote d ivoire");
        assert_eq!(normalize_name("United   States"), "united states");
    }

    #[test]
    fn ampersand_without_spaces() {
        assert_eq!(normalize_name("Trinidad&Tobago"), "trinidad and tobago");
    }

    #[test]
    fn compatibility_forms_fold() {
        // fullwidth letters decompose to ASCII under NFKD
        assert_eq!(normalize_name("ＦＲＡＮＣＥ"), "france");
    }

    #[test]
    fn idempotent() {
        for s in [
            "São Tomé & Príncipe",
            "Åland Islands",
            "Bonaire, Sint Eustatius and Saba",
            "Curaçao",
            "Réunion",
            "",
            "???",
        ] {
            let once = normalize_name(s);
            assert_eq!(normalize_name(&once), once, "input: {s:?}");
        }
    }
}
