//! Issue-key extraction from free-form commit messages.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::IssueKey;

fn issue_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // `[0-9]` rather than `\d`: the regex crate's `\d` matches every Unicode digit.
    PATTERN.get_or_init(|| {
        Regex::new(r"\b[A-Z0-9]+-[0-9]+\b").expect("issue key pattern is a valid regex")
    })
}

/// Returns every issue key mentioned in `text`, in order of appearance.
///
/// Duplicates are preserved. Text without a key (including the empty string)
/// yields an empty vector.
///
/// ```
/// let keys = bridge::extract("AUDIGW-3897 - Implement loopback\n\nChange-Id: I4624d944\n");
/// assert_eq!(keys.len(), 1);
/// assert_eq!(keys[0].as_str(), "AUDIGW-3897");
/// ```
pub fn extract(text: &str) -> Vec<IssueKey> {
    issue_key_pattern()
        .find_iter(text)
        .filter_map(|m| IssueKey::new(m.as_str()))
        .collect()
}

/// Like [`extract`], but keeps only the first mention of each key.
pub fn extract_unique(text: &str) -> Vec<IssueKey> {
    let mut seen = HashSet::new();
    extract(text)
        .into_iter()
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
