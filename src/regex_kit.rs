//! Small composition helpers over `regex::Regex`.
//!
//! The `regex` crate has no sticky (`y`) flag and no built-in notion of
//! "anchor this pattern to both ends". Both are emulated here rather than
//! hand-rolled at every call site.

use regex::Regex;

use crate::error::GrammarError;

/// Anchors `pattern` so a full match is required end to end.
pub fn anchored(pattern: &str) -> Result<Regex, GrammarError> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| GrammarError::new(format!("bad pattern `{pattern}`: {e}")))
}

/// Joins alternatives with a non-capturing group around each branch, so
/// precedence between branches can't leak across the `|`.
pub fn alternation(patterns: &[&str]) -> String {
    patterns
        .iter()
        .map(|p| format!("(?:{p})"))
        .collect::<Vec<_>>()
        .join("|")
}

/// Wraps `pattern` in a single capturing group.
pub fn capture(pattern: &str) -> String {
    format!("({pattern})")
}

/// A regex matched against an explicit offset rather than searched for.
///
/// `regex` has no native sticky flag, so a match is only accepted when it
/// starts exactly at the requested offset; any match the engine finds
/// further into the haystack is rejected rather than skipped to.
pub struct StickyRegex {
    inner: Regex,
}

impl StickyRegex {
    pub fn new(pattern: &str) -> Result<Self, GrammarError> {
        let inner =
            Regex::new(pattern).map_err(|e| GrammarError::new(format!("bad pattern: {e}")))?;
        Ok(Self { inner })
    }

    /// Returns the matched text's length if `pattern` matches starting
    /// exactly at `offset` in `haystack`.
    pub fn match_at<'t>(&self, haystack: &'t str, offset: usize) -> Option<&'t str> {
        let slice = haystack.get(offset..)?;
        let m = self.inner.find(slice)?;
        if m.start() == 0 {
            Some(m.as_str())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_rejects_partial_matches() {
        let re = anchored(r"[0-9]+").unwrap();
        assert!(re.is_match("123"));
        assert!(!re.is_match("123abc"));
        assert!(!re.is_match("abc123"));
    }

    #[test]
    fn alternation_preserves_order() {
        let src = alternation(&["ab", "a"]);
        let re = Regex::new(&format!("^(?:{src})")).unwrap();
        // leftmost-first: "ab" is tried before "a" and wins when both match.
        assert_eq!(re.find("abc").unwrap().as_str(), "ab");
    }

    #[test]
    fn capture_wraps_in_one_group() {
        let src = capture("a|b");
        let re = Regex::new(&src).unwrap();
        let caps = re.captures("b").unwrap();
        assert_eq!(&caps[1], "b");
    }

    #[test]
    fn sticky_only_matches_at_requested_offset() {
        let re = StickyRegex::new(r"[0-9]+").unwrap();
        assert_eq!(re.match_at("12ab34", 0), Some("12"));
        // a number does occur later in the haystack, but not starting
        // exactly at offset 2 ('a'), so this must not skip ahead to it.
        assert_eq!(re.match_at("12ab34", 2), None);
        assert_eq!(re.match_at("12ab34", 4), Some("34"));
    }

    #[test]
    fn sticky_rejects_offset_past_the_end() {
        let re = StickyRegex::new(r"[0-9]+").unwrap();
        assert_eq!(re.match_at("12", 5), None);
    }
}
