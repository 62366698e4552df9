//! Sequential `PREFIX-NNN` identifier allocation.

use std::collections::HashSet;

/// Largest number representable with the three-digit scheme.
pub const MAX_SEQUENCE: usize = 999;

/// Every identifier under the prefix is taken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no free identifier left under prefix {prefix}")]
pub struct AllocationExhausted {
    pub prefix: String,
}

/// Allocate the next identifier.
///
/// Starts at the roster size plus one and probes upward past identifiers that
/// are already taken, so gaps left by out-of-order records never collide.
pub fn allocate(prefix: &str, existing: &HashSet<&str>) -> Result<String, AllocationExhausted> {
    (existing.len() + 1..=MAX_SEQUENCE)
        .map(|n| format_id(prefix, n))
        .find(|candidate| !existing.contains(candidate.as_str()))
        .ok_or_else(|| AllocationExhausted {
            prefix: prefix.to_string(),
        })
}

fn format_id(prefix: &str, n: usize) -> String {
    format!("{}-{:03}", prefix, n)
}
