//! ISSN filter validation for batch runs.

use std::sync::LazyLock;

use regex::Regex;

/// Printed form of an ISSN: `NNNN-NNNC`, check character digit or `X`.
const ISSN_PATTERN: &str = r"^[0-9]{4}-[0-9]{3}[0-9Xx]$";

static ISSN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(ISSN_PATTERN).expect("valid regex"));

/// Whether `value` has the printed ISSN shape.
pub fn is_valid_issn(value: &str) -> bool {
    ISSN_RE.is_match(value)
}

/// Keep the well-formed ISSNs from `candidates`, upper-casing the check
/// character and dropping blanks and duplicates. Malformed entries are
/// logged and skipped.
pub fn checked_issns<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut issns: Vec<String> = Vec::new();
    for candidate in candidates {
        let candidate = candidate.as_ref().trim();
        if candidate.is_empty() {
            continue;
        }
        if !is_valid_issn(candidate) {
            tracing::warn!(issn = %candidate, "Ignoring malformed ISSN");
            continue;
        }
        let issn = candidate.to_uppercase();
        if !issns.contains(&issn) {
            issns.push(issn);
        }
    }
    issns
}
