//! Reduce raw vendor model identifiers to short display names.
//!
//! Identifiers loosely follow `provider - org/model-size-date`. Each
//! [`SplitLevel`] peels off one more layer, from the provider prefix down to
//! the trailing metadata tags.

use crate::types::SplitLevel;
use regex::Regex;
use std::sync::LazyLock;

const PROVIDER_DELIMITER: &str = " - ";
const VENDOR_DELIMITER: char = '/';

/// Upper bound on suffix strips for a single name.
const MAX_STRIP_PASSES: usize = 16;

/// A trailing metadata tag recognised by the suffix stripper.
pub struct SuffixRule {
    pub name: &'static str,
    regex: Regex,
}

impl SuffixRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
        }
    }

    /// Byte offset where this rule's suffix starts in `name`, if it matches.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.regex.find(name).map(|m| m.start())
    }
}

/// Suffix rules in priority order. Every pattern is anchored to the end of
/// the string and starts with a literal hyphen; the order matters. Digits
/// are ASCII only.
pub static SUFFIX_RULES: LazyLock<Vec<SuffixRule>> = LazyLock::new(|| {
    vec![
        SuffixRule::new("iso-date", r"-[0-9]{4}-[0-9]{2}-[0-9]{2}$"),
        SuffixRule::new("short-date", r"-[0-9]{2}-[0-9]{2}$"),
        SuffixRule::new("compact-date", r"-[0-9]{8}$"),
        SuffixRule::new("four-digit-tag", r"-[0-9]{4}$"),
        SuffixRule::new("active-params", r"-a[0-9]+[bB]$"),
        SuffixRule::new("size-tag", r"-[0-9]{1,4}[bBkK]$"),
        SuffixRule::new("keyword", r"(?i)-(preview|latest|instruct|online|free)$"),
    ]
});

/// Normalize a raw identifier at the given split level.
///
/// Absent or blank input gives an empty string. Otherwise the result is never
/// empty: if every stage strips the name away, the trimmed input is returned.
pub fn normalize(raw: Option<&str>, level: SplitLevel) -> String {
    let original = raw.map(str::trim).unwrap_or_default();
    if original.is_empty() {
        return String::new();
    }

    let mut name = original;
    if level >= SplitLevel::Provider {
        name = split_provider(name);
    }
    if level >= SplitLevel::Vendor {
        name = split_vendor(name);
    }
    if level >= SplitLevel::Suffixes {
        name = strip_suffixes(name);
    }

    if name.is_empty() {
        original.to_string()
    } else {
        name.to_string()
    }
}

/// Shorthand for [`normalize`] on a present string.
pub fn format_model_name(raw: &str, level: SplitLevel) -> String {
    normalize(Some(raw), level)
}

/// Text after the first `" - "`, or the input when there is none.
pub fn split_provider(name: &str) -> &str {
    match name.find(PROVIDER_DELIMITER) {
        Some(pos) => name[pos + PROVIDER_DELIMITER.len()..].trim(),
        None => name,
    }
}

/// Text after the first `/`; without one, a second provider split.
pub fn split_vendor(name: &str) -> &str {
    match name.split_once(VENDOR_DELIMITER) {
        Some((_, rest)) => rest.trim(),
        None => split_provider(name),
    }
}

/// Strip trailing metadata tags, first matching rule wins on every pass.
///
/// A strip that would leave nothing is discarded and ends the loop.
pub fn strip_suffixes(name: &str) -> &str {
    let mut current = name;
    for _ in 0..MAX_STRIP_PASSES {
        let Some(start) = SUFFIX_RULES.iter().find_map(|rule| rule.find(current)) else {
            break;
        };
        let stripped = current[..start].trim();
        if stripped.is_empty() {
            break;
        }
        current = stripped;
    }
    current
}
