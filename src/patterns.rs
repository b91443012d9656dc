//! Regex source fragments shared by the lexer (which uses them to find
//! lexeme boundaries) and the scanner (which anchors them individually to
//! classify an already-lexed token's text).

pub const WHITESPACE: &str = r"[ \t\r\n]+";
pub const NUMBER: &str = r"[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?";
pub const STRING: &str = r#""(?:[^"\\]|\\.)*""#;
pub const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";
pub const PUNCT: &str = r"[(){}\[\],;]";
// `:` lives here, not in PUNCT, so `::=` lexes as one run instead of three
// one-char tokens.
pub const OPERATOR: &str = r"[+\-*/=<>!&|^~?.%:]+";
pub const COMMENT: &str = r"#[^\n]*";
