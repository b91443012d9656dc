//! Error types surfaced at the public boundary, plus the narrower internal
//! failure shapes that feed into them.

use std::fmt;

use crate::token::Position;

/// Everything that can go wrong while lexing, compiling a grammar, or
/// running a compiled grammar against input.
#[derive(Debug, Clone)]
pub enum Error {
    Lexical(LexError),
    GrammarUse(GrammarError),
    Syntax(SyntaxError),
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lexical(e) => write!(f, "{e}"),
            Error::GrammarUse(e) => write!(f, "{e}"),
            Error::Syntax(e) => write!(f, "{e}"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<LexError> for Error {
    fn from(e: LexError) -> Self {
        Error::Lexical(e)
    }
}

impl From<GrammarError> for Error {
    fn from(e: GrammarError) -> Self {
        Error::GrammarUse(e)
    }
}

impl From<SyntaxError> for Error {
    fn from(e: SyntaxError) -> Self {
        Error::Syntax(e)
    }
}

/// No lexeme starting at some offset matched any token pattern.
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

impl LexError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lex error at {}: {}", self.position, self.message)
    }
}

impl std::error::Error for LexError {}

/// A problem with the grammar definition itself: malformed BNF text, a
/// reference to an undefined rule, left recursion, or a malformed regex
/// composition.
#[derive(Debug, Clone)]
pub struct GrammarError {
    pub message: String,
}

impl GrammarError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn left_recursion(rule_name: &str) -> Self {
        Self::new(format!("Left recursion on rule: {rule_name}"))
    }

    pub fn undefined_rule(rule_name: &str) -> Self {
        Self::new(format!("reference to undefined rule `{rule_name}`"))
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grammar error: {}", self.message)
    }
}

impl std::error::Error for GrammarError {}

/// The compiled grammar failed to accept the input. Carries the furthest
/// position the parser reached and the set of terminals that would have
/// let it advance further.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub position: Option<Position>,
    pub expected: Vec<String>,
    pub message: String,
}

impl SyntaxError {
    /// `offending` names either the offending Token or, at end of stream,
    /// `"Unexpected EOF after <last_token>"` (§4.5's `syntax_error()`
    /// contract).
    pub fn new(position: Option<Position>, expected: Vec<String>, offending: String) -> Self {
        let message = if expected.is_empty() {
            offending
        } else {
            format!("{offending} (expected one of: {})", expected.join(", "))
        };
        Self {
            position,
            expected,
            message,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(pos) => write!(f, "syntax error at {pos}: {}", self.message),
            None => write!(f, "syntax error: {}", self.message),
        }
    }
}

impl std::error::Error for SyntaxError {}
