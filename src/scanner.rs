//! The base parser: raw, non-memoized primitives for classifying the token
//! already sitting at a given stream position. The packrat substrate wraps
//! these into the memoized rule procedures (`NUMBER`, `STRING`, `IDENT`,
//! `HOLE`, `EOF`, and the `SKIP` loop) that grammar rules are built from.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::patterns;
use crate::regex_kit;
use crate::token::Element;

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| regex_kit::anchored(patterns::WHITESPACE).expect("static pattern"));
static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| regex_kit::anchored(patterns::COMMENT).expect("static pattern"));
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| regex_kit::anchored(patterns::NUMBER).expect("static pattern"));
static STRING_RE: Lazy<Regex> =
    Lazy::new(|| regex_kit::anchored(patterns::STRING).expect("static pattern"));
static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| regex_kit::anchored(patterns::IDENT).expect("static pattern"));

/// The placeholder a hole is rendered as when a template is printed for
/// diagnostics (`syntax_error()`'s "print the template with hole
/// placeholders substituted for visibility", §4.5).
pub const HOLE_GLYPH: char = '\u{25C6}';

/// Joins a template's raw segments back into one string, substituting
/// [`HOLE_GLYPH`] for every interpolation gap. Used only for diagnostics —
/// the actual lexing never goes through this.
pub fn render_template(segments: &[&str]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        out.push_str(seg);
        if i + 1 < segments.len() {
            out.push(HOLE_GLYPH);
        }
    }
    out
}

/// Used by the BNF bootstrap compiler, which walks its own Element stream
/// by hand rather than through the packrat substrate.
pub(crate) fn is_whitespace_text(text: &str) -> bool {
    WHITESPACE_RE.is_match(text)
}

pub(crate) fn is_comment_text(text: &str) -> bool {
    COMMENT_RE.is_match(text)
}

/// Holds the token stream a parse run walks, plus the set of string
/// literals that must never be accepted by the generic `IDENT` rule.
pub struct Scanner {
    pub stream: Vec<Element>,
    pub keywords: HashSet<String>,
}

impl Scanner {
    pub fn new(stream: Vec<Element>, keywords: HashSet<String>) -> Self {
        Self { stream, keywords }
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    fn token_text_at(&self, pos: usize) -> Option<&str> {
        self.stream
            .get(pos)
            .and_then(Element::as_token)
            .map(|t| t.text.as_str())
    }

    pub fn is_whitespace_at(&self, pos: usize) -> bool {
        self.token_text_at(pos)
            .is_some_and(|t| WHITESPACE_RE.is_match(t))
    }

    pub fn is_comment_at(&self, pos: usize) -> bool {
        self.token_text_at(pos)
            .is_some_and(|t| COMMENT_RE.is_match(t))
    }

    pub fn is_number_at(&self, pos: usize) -> bool {
        self.token_text_at(pos)
            .is_some_and(|t| NUMBER_RE.is_match(t))
    }

    pub fn is_string_at(&self, pos: usize) -> bool {
        self.token_text_at(pos)
            .is_some_and(|t| STRING_RE.is_match(t))
    }

    pub fn is_ident_at(&self, pos: usize) -> bool {
        self.token_text_at(pos).is_some_and(|t| {
            IDENT_RE.is_match(t) && !self.keywords.contains(t)
        })
    }

    pub fn is_literal_at(&self, pos: usize, literal: &str) -> bool {
        self.token_text_at(pos) == Some(literal)
    }

    pub fn is_hole_at(&self, pos: usize) -> Option<u32> {
        self.stream.get(pos).and_then(Element::as_hole)
    }

    pub fn is_eof_at(&self, pos: usize) -> bool {
        pos >= self.stream.len()
    }

    pub fn token_text(&self, pos: usize) -> Option<&str> {
        self.token_text_at(pos)
    }
}
