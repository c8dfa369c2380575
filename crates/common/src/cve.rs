//! CVE identifier extraction and validation
//!
//! Scanner reports nest their findings arbitrarily deep, so extraction walks
//! the raw JSON structure instead of assuming a fixed report schema.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;

/// Report key whose value is a vulnerability identifier.
pub const VULNERABILITY_ID_KEY: &str = "VulnerabilityID";

/// Maximum nesting depth the extractor will descend into.
/// Branches deeper than this are skipped, not treated as an error.
const MAX_SCAN_DEPTH: usize = 128;

/// Canonical identifier scheme: CVE-YYYY-NNNN with a 4+ digit suffix.
static CVE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^CVE-\d{4}-\d{4,}$").expect("CVE pattern is valid"));

/// Validate a raw identifier string against the CVE naming scheme.
///
/// Surrounding whitespace is trimmed before matching. Returns the trimmed
/// identifier on success, `None` on failure. Never panics on input.
pub fn validate_cve_id(raw: &str) -> Option<&str> {
    let cleaned = raw.trim();
    if CVE_PATTERN.is_match(cleaned) {
        Some(cleaned)
    } else {
        None
    }
}

/// Collect every distinct value bound to [`VULNERABILITY_ID_KEY`] anywhere
/// in a nested report structure.
///
/// Mappings are inspected key by key, sequences element by element, scalars
/// terminate the walk. Non-string identifier values are skipped. The walk is
/// side-effect free, so repeated invocations on the same input yield the
/// same set.
pub fn extract_vulnerability_ids(report: &Value) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    walk(report, &mut ids, 0);
    ids
}

fn walk(value: &Value, ids: &mut BTreeSet<String>, depth: usize) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }

    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if key == VULNERABILITY_ID_KEY {
                    if let Value::String(id) = nested {
                        ids.insert(id.clone());
                    }
                } else {
                    walk(nested, ids, depth + 1);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, ids, depth + 1);
            }
        }
        // Scalars cannot contain nested identifiers.
        _ => {}
    }
}
