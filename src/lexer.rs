//! Turns template segments into a Token Stream, treating each interpolation
//! gap between segment `k` and segment `k + 1` as a first-class `Hole(k)`
//! element rather than splicing interpolated text into the lexeme stream.

use once_cell::sync::Lazy;

use crate::error::{Error, LexError};
use crate::patterns;
use crate::regex_kit::{self, StickyRegex};
use crate::token::{Element, Position, Token};

static TOKEN_RE: Lazy<StickyRegex> = Lazy::new(|| {
    let alt = regex_kit::alternation(&[
        patterns::WHITESPACE,
        patterns::STRING,
        patterns::NUMBER,
        patterns::IDENT,
        patterns::PUNCT,
        patterns::OPERATOR,
        patterns::COMMENT,
    ]);
    StickyRegex::new(&regex_kit::capture(&alt)).expect("static pattern")
});

/// Lexes every segment in order, interleaving a `Hole(k)` element between
/// segment `k` and segment `k + 1` for every gap but the last.
pub fn lex(segments: &[&str]) -> Result<Vec<Element>, Error> {
    let mut stream = Vec::new();
    for (seg_idx, segment) in segments.iter().enumerate() {
        lex_segment(seg_idx, segment, &mut stream)?;
        if seg_idx + 1 < segments.len() {
            stream.push(Element::Hole(seg_idx as u32));
        }
    }
    Ok(stream)
}

fn lex_segment(seg_idx: usize, segment: &str, out: &mut Vec<Element>) -> Result<(), Error> {
    let mut offset = 0;
    while offset < segment.len() {
        match TOKEN_RE.match_at(segment, offset) {
            Some(text) => {
                let len = text.len();
                let pos = Position::new(seg_idx, offset, offset + len);
                out.push(Element::Tok(Token::new(text.to_string(), pos)));
                offset += len;
            }
            None => {
                let pos = Position::new(seg_idx, offset, offset);
                return Err(Error::Lexical(LexError::new(
                    format!(
                        "no token pattern matches starting at {:?}",
                        &segment[offset..(offset + 1).min(segment.len())]
                    ),
                    pos,
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(stream: &[Element]) -> Vec<&str> {
        stream
            .iter()
            .filter_map(Element::as_token)
            .map(|t| t.text.as_str())
            .collect()
    }

    #[test]
    fn tokenization_totality() {
        let stream = lex(&["let x = 1 + 2"]).unwrap();
        let concatenated: String = stream
            .iter()
            .filter_map(Element::as_token)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(concatenated, "let x = 1 + 2");
        assert_eq!(
            tokens(&stream),
            vec!["let", " ", "x", " ", "=", " ", "1", " ", "+", " ", "2"]
        );
    }

    #[test]
    fn hole_placement() {
        let stream = lex(&["a ", " b ", " c"]).unwrap();
        let holes: Vec<u32> = stream.iter().filter_map(Element::as_hole).collect();
        assert_eq!(holes, vec![0, 1]);
        // a hole sits right after the whitespace token of the prior
        // segment and right before the whitespace token of the next one;
        // it is never merged into either.
        let hole_positions: Vec<usize> = stream
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Element::Hole(_)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hole_positions.len(), 2);
    }

    #[test]
    fn positions_are_contiguous_within_a_segment() {
        let stream = lex(&["1+2"]).unwrap();
        let toks: Vec<&Token> = stream.iter().filter_map(Element::as_token).collect();
        for pair in toks.windows(2) {
            assert_eq!(pair[0].pos.after, pair[1].pos.start);
        }
    }

    #[test]
    fn comment_runs_to_end_of_segment() {
        let stream = lex(&["1 # trailing comment"]).unwrap();
        let toks = tokens(&stream);
        assert_eq!(toks, vec!["1", " ", "# trailing comment"]);
    }

    #[test]
    fn unrecognized_byte_is_a_lexical_error() {
        let err = lex(&["1 @ 2"]).unwrap_err();
        assert!(matches!(err, Error::Lexical(_)));
    }

    #[test]
    fn no_segments_means_no_holes() {
        let stream = lex(&["only one segment"]).unwrap();
        assert!(stream.iter().all(|e| e.as_hole().is_none()));
    }

    #[test]
    fn production_separator_lexes_as_one_token() {
        let stream = lex(&["start ::= \"a\" ;"]).unwrap();
        assert_eq!(
            tokens(&stream),
            vec!["start", " ", "::=", " ", "\"a\"", " ", ";"]
        );
    }
}
