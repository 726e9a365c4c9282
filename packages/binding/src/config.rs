//! Configuration constants for document binding
//!
//! Limits applied to every inbound document before and during binding:
//! - Size limits (prevent memory exhaustion from oversized payloads)
//! - Nesting limits (prevent stack overflow while recursing into nested types)
//! - Diagnosis limits (bound the search for missing required elements)
//!
//! The document size limit can be overridden per binder with
//! [`crate::Binder::with_max_document_size`]; the others are compile-time
//! constants.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum raw document size in bytes (1 MB).
///
/// Catalogue messages are a few KB; 1 MB leaves ample headroom while keeping
/// a single malicious payload from exhausting memory.
pub const MAX_DOCUMENT_SIZE: usize = 1_000_000;

/// Maximum nesting depth of complex-typed elements.
///
/// Each nested complex field is one level. 32 levels is far beyond any
/// real schema and keeps recursion bounded on hostile input.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum number of elements the binder may hypothetically insert when
/// deciding whether an out-of-place child means "required element missing"
/// or "element not allowed here".
///
/// The search is also bounded by the number of automaton states, so this
/// only matters for very large content models.
pub const MAX_REPAIR_INSERTIONS: usize = 16;

/// Namespace of XML Schema instance attributes (`xsi:type`,
/// `xsi:schemaLocation`), which are never treated as schema attributes.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Lexical form of `xs:date` values accepted by the binder: four-digit
/// year, two-digit month and day, no sign and no timezone.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
pub(crate) static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid regex"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_pattern() {
        assert!(DATE_PATTERN.is_match("2020-01-01"));
        for date in ["2020-1-1", "+2020-01-01", "2020-01-1", "20200101", "2020-01-01Z", "٢٠٢٠-01-01"] {
            assert!(!DATE_PATTERN.is_match(date), "{date:?} should not match");
        }
    }

    #[test]
    fn test_constants_are_reasonable() {
        assert!(MAX_DOCUMENT_SIZE >= 100_000, "Should allow at least 100KB");
        assert!(MAX_DOCUMENT_SIZE <= 10_000_000, "Should not allow 10MB+");

        assert!(MAX_NESTING_DEPTH >= 8, "Should allow nested types");
        assert!(MAX_NESTING_DEPTH <= 128, "Should limit extreme nesting");

        assert!(MAX_REPAIR_INSERTIONS >= 1, "Should diagnose a missing element");
        assert!(MAX_REPAIR_INSERTIONS <= 64, "Should bound the repair search");
    }
}
