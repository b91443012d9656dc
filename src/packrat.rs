//! The packrat execution substrate: a memo table keyed by `(position,
//! rule)`, left-recursion detection via an in-progress sentinel, and
//! furthest-failure diagnostic tracking.

use std::collections::HashMap;

use crate::bnf::ast::{Alternative, Atom, Body};
use crate::config::ParserConfig;
use crate::error::{Error, GrammarError, SyntaxError};
use crate::grammar::Grammar;
use crate::scanner::Scanner;
use crate::token::{Element, Position as TokenPosition};
use crate::value::Value;

/// A rule or terminal pattern identity, interned at compile time so the
/// memo table can key on a cheap, hashable value instead of structural
/// equality or pointer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleRef {
    User(usize),
    Builtin(Builtin),
    Literal(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Number,
    String,
    Ident,
    Hole,
    Eof,
    Comment,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Number => "NUMBER",
            Builtin::String => "STRING",
            Builtin::Ident => "IDENT",
            Builtin::Hole => "HOLE",
            Builtin::Eof => "EOF",
            Builtin::Comment => "COMMENT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NUMBER" => Some(Builtin::Number),
            "STRING" => Some(Builtin::String),
            "IDENT" => Some(Builtin::Ident),
            "HOLE" => Some(Builtin::Hole),
            "EOF" => Some(Builtin::Eof),
            _ => None,
        }
    }
}

/// The result of running a rule or pattern at a position: either it
/// succeeded, advancing the cursor and producing a value, or it failed at
/// (at most) the given position.
#[derive(Debug, Clone)]
pub enum Outcome<V> {
    Success(usize, V),
    Failure(usize),
}

enum SeqOutcome<V> {
    Success(usize, Vec<V>),
    Failure(usize),
}

#[derive(Clone)]
enum MemoEntry<V> {
    InProgress,
    Done(Outcome<V>),
}

type MemoTable<V> = HashMap<usize, HashMap<RuleRef, MemoEntry<V>>>;

/// Tracks the furthest position any terminal failed at, and the set of
/// terminal names that would have let the parse advance past it. Rule
/// (procedure) failures move the furthest-position mark but contribute no
/// name, since a bare rule reference carries no printable terminal
/// identity useful in a diagnostic.
#[derive(Debug, Default, Clone)]
struct FailureTracker {
    max_pos: usize,
    names: Vec<String>,
}

impl FailureTracker {
    fn record(&mut self, pos: usize, name: Option<&str>) {
        if pos > self.max_pos {
            self.max_pos = pos;
            self.names.clear();
        }
        if pos == self.max_pos {
            if let Some(name) = name {
                let owned = name.to_string();
                if !self.names.contains(&owned) {
                    self.names.push(owned);
                }
            }
        }
    }
}

/// Hit/miss counters for the memo table, surfaced so callers can judge
/// whether a grammar is exhibiting the quadratic blowup packrat memoization
/// is meant to prevent.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
}

/// Owns the mutable state of a single parse run: the token stream, the
/// memo table, and the furthest-failure tracker. Short-lived, constructed
/// fresh by `Grammar::parse` for each call.
pub struct ParserContext<'g, V: Value> {
    pub scanner: Scanner,
    grammar: &'g Grammar<V>,
    memo: MemoTable<V>,
    stats: MemoStats,
    failures: FailureTracker,
    config: ParserConfig,
    /// The input template, rendered with hole placeholders, kept only so
    /// `syntax_error()` can log it for diagnostics (§4.5).
    template: String,
}

impl<'g, V: Value> ParserContext<'g, V> {
    pub fn new(scanner: Scanner, grammar: &'g Grammar<V>, config: ParserConfig) -> Self {
        Self::with_template(scanner, grammar, config, String::new())
    }

    pub fn with_template(
        scanner: Scanner,
        grammar: &'g Grammar<V>,
        config: ParserConfig,
        template: String,
    ) -> Self {
        Self {
            scanner,
            grammar,
            memo: HashMap::new(),
            stats: MemoStats::default(),
            failures: FailureTracker::default(),
            config,
            template,
        }
    }

    pub fn stats(&self) -> MemoStats {
        self.stats
    }

    /// The furthest position reached by any failing terminal, and the
    /// terminal names that would have let the parse advance past it.
    pub fn last_failures(&self) -> (usize, Vec<String>) {
        (self.failures.max_pos, self.failures.names.clone())
    }

    pub fn syntax_error(&self) -> Error {
        let (pos, names) = self.last_failures();
        let position = self.resolve_position(pos);
        let offending = self.offending_description(pos);
        log::warn!(
            "syntax error in `{}`: {offending}, expected one of {:?}",
            self.template,
            names
        );
        Error::Syntax(SyntaxError::new(position, names, offending))
    }

    fn resolve_position(&self, pos: usize) -> Option<TokenPosition> {
        self.scanner
            .stream
            .get(pos)
            .and_then(|el| el.as_token())
            .map(|t| t.pos)
            .or_else(|| {
                self.scanner
                    .stream
                    .last()
                    .and_then(|el| el.as_token())
                    .map(|t| TokenPosition::new(t.pos.segment, t.pos.after, t.pos.after))
            })
    }

    /// Names either the offending element at `pos`, or, when `pos` has run
    /// off the end of the stream, `"Unexpected EOF after <last token>"`
    /// (§4.5).
    fn offending_description(&self, pos: usize) -> String {
        match self.scanner.stream.get(pos) {
            Some(el) => format!("unexpected {el}"),
            None => match self.scanner.stream.iter().rev().find_map(Element::as_token) {
                Some(last) => format!("Unexpected EOF after {last}"),
                None => "Unexpected EOF".to_string(),
            },
        }
    }

    fn rule_name(&self, rule_ref: RuleRef) -> String {
        match rule_ref {
            RuleRef::User(id) => self.grammar.rule_name(id).to_string(),
            RuleRef::Builtin(b) => b.name().to_string(),
            RuleRef::Literal(id) => format!("{:?}", self.grammar.literal(id)),
        }
    }

    /// Runs `rule_ref` at `pos`, consulting and updating the memo table.
    /// A second call for the same `(pos, rule_ref)` reuses the first
    /// call's result, memoized or, while still in progress, reported as
    /// left recursion.
    pub fn run(&mut self, rule_ref: RuleRef, pos: usize) -> Result<Outcome<V>, Error> {
        if let Some(entry) = self.memo.get(&pos).and_then(|m| m.get(&rule_ref)) {
            match entry {
                MemoEntry::InProgress => {
                    return Err(Error::GrammarUse(GrammarError::left_recursion(
                        &self.rule_name(rule_ref),
                    )));
                }
                MemoEntry::Done(outcome) if self.config.memoize => {
                    self.stats.hits += 1;
                    if self.config.debug {
                        log::trace!("memo hit: {:?} @ {pos}", rule_ref);
                    }
                    return Ok(outcome.clone());
                }
                MemoEntry::Done(_) => {}
            }
        }

        self.stats.misses += 1;
        if self.config.debug {
            log::trace!("memo miss: {:?} @ {pos}", rule_ref);
        }
        // The in-progress marker is always recorded, even with
        // memoization disabled: it's what makes left recursion an error
        // instead of an infinite loop, which is a different concern than
        // reusing a finished result.
        self.memo
            .entry(pos)
            .or_default()
            .insert(rule_ref, MemoEntry::InProgress);

        let outcome = self.invoke(rule_ref, pos)?;

        if let Outcome::Failure(fail_pos) = &outcome {
            match rule_ref {
                RuleRef::Builtin(Builtin::Comment) => {
                    // incidental whitespace/comment probing, not a
                    // meaningful expectation for diagnostics.
                }
                RuleRef::User(_) => self.failures.record(*fail_pos, None),
                RuleRef::Builtin(b) => self.failures.record(*fail_pos, Some(b.name())),
                RuleRef::Literal(id) => {
                    self.failures.record(*fail_pos, Some(self.grammar.literal(id)))
                }
            };
        }

        self.memo
            .entry(pos)
            .or_default()
            .insert(rule_ref, MemoEntry::Done(outcome.clone()));
        Ok(outcome)
    }

    fn invoke(&mut self, rule_ref: RuleRef, pos: usize) -> Result<Outcome<V>, Error> {
        match rule_ref {
            RuleRef::Literal(id) => {
                let literal = self.grammar.literal(id).to_string();
                let pos = self.rule_skip(pos)?;
                if self.scanner.is_literal_at(pos, &literal) {
                    Ok(Outcome::Success(pos + 1, V::text(literal)))
                } else {
                    Ok(Outcome::Failure(pos))
                }
            }
            RuleRef::Builtin(b) => self.invoke_builtin(b, pos),
            RuleRef::User(id) => {
                let body = self.grammar.rule_body(id);
                self.eval_body(body, pos)
            }
        }
    }

    fn invoke_builtin(&mut self, b: Builtin, pos: usize) -> Result<Outcome<V>, Error> {
        if b == Builtin::Comment {
            // The comment rule is what `rule_skip` itself calls through
            // `run`; it must never trigger another skip or it would
            // recurse into itself.
            return Ok(if self.scanner.is_comment_at(pos) {
                Outcome::Success(pos + 1, V::text(String::new()))
            } else {
                Outcome::Failure(pos)
            });
        }
        let pos = self.rule_skip(pos)?;
        let outcome = match b {
            Builtin::Number => {
                if self.scanner.is_number_at(pos) {
                    let text = self.scanner.token_text(pos).unwrap().to_string();
                    Outcome::Success(pos + 1, V::text(text))
                } else {
                    Outcome::Failure(pos)
                }
            }
            Builtin::String => {
                if self.scanner.is_string_at(pos) {
                    let text = self.scanner.token_text(pos).unwrap().to_string();
                    Outcome::Success(pos + 1, V::text(text))
                } else {
                    Outcome::Failure(pos)
                }
            }
            Builtin::Ident => {
                if self.scanner.is_ident_at(pos) {
                    let text = self.scanner.token_text(pos).unwrap().to_string();
                    Outcome::Success(pos + 1, V::text(text))
                } else {
                    Outcome::Failure(pos)
                }
            }
            Builtin::Hole => match self.scanner.is_hole_at(pos) {
                Some(n) => Outcome::Success(pos + 1, V::hole(n)),
                None => Outcome::Failure(pos),
            },
            Builtin::Eof => {
                if self.scanner.is_eof_at(pos) {
                    Outcome::Success(pos, V::eof())
                } else {
                    Outcome::Failure(pos)
                }
            }
            Builtin::Comment => unreachable!("handled above"),
        };
        Ok(outcome)
    }

    /// Skips whitespace and comment tokens ahead of a terminal match.
    /// Whitespace is checked directly, never through `run`, since caching a
    /// result this cheap would only add memo-table pressure. Comments go
    /// through `run` so repeated probing of the same comment-laden
    /// position reuses the first scan.
    fn rule_skip(&mut self, pos: usize) -> Result<usize, Error> {
        let mut cur = pos;
        loop {
            let mut advanced = false;
            while self.scanner.is_whitespace_at(cur) {
                cur += 1;
                advanced = true;
            }
            match self.run(RuleRef::Builtin(Builtin::Comment), cur)? {
                Outcome::Success(new_pos, _) => {
                    cur = new_pos;
                    advanced = true;
                }
                Outcome::Failure(_) => {}
            }
            if !advanced {
                break;
            }
        }
        Ok(cur)
    }

    fn eval_body(&mut self, body: &Body<V>, pos: usize) -> Result<Outcome<V>, Error> {
        let mut furthest = pos;
        for alt in body {
            match self.eval_alternative(alt, pos)? {
                SeqOutcome::Success(new_pos, values) => {
                    let value = match &alt.action {
                        Some(action) => action(&values),
                        None => default_combine(values),
                    };
                    return Ok(Outcome::Success(new_pos, value));
                }
                SeqOutcome::Failure(fail_pos) => {
                    furthest = furthest.max(fail_pos);
                }
            }
        }
        Ok(Outcome::Failure(furthest))
    }

    fn eval_alternative(
        &mut self,
        alt: &Alternative<V>,
        pos: usize,
    ) -> Result<SeqOutcome<V>, Error> {
        let mut cur = pos;
        let mut values = Vec::with_capacity(alt.atoms.len());
        for atom in &alt.atoms {
            match self.eval_atom(atom, cur)? {
                Outcome::Success(new_pos, value) => {
                    cur = new_pos;
                    values.push(value);
                }
                Outcome::Failure(fail_pos) => return Ok(SeqOutcome::Failure(fail_pos)),
            }
        }
        Ok(SeqOutcome::Success(cur, values))
    }

    fn eval_atom(&mut self, atom: &Atom<V>, pos: usize) -> Result<Outcome<V>, Error> {
        match atom {
            Atom::Literal(id) => self.run(RuleRef::Literal(*id), pos),
            Atom::Rule(rule_ref) => self.run(*rule_ref, pos),
            Atom::Group(body) => self.eval_body(body, pos),
            Atom::Star(inner) => self.eval_repeat(inner, pos, false),
            Atom::Plus(inner) => self.eval_repeat(inner, pos, true),
            Atom::Opt(inner) => self.eval_opt(inner, pos),
            Atom::SepStar(elem, sep) => self.eval_sep(elem, sep, pos, false),
            Atom::SepPlus(elem, sep) => self.eval_sep(elem, sep, pos, true),
        }
    }

    fn eval_repeat(
        &mut self,
        inner: &Atom<V>,
        pos: usize,
        require_one: bool,
    ) -> Result<Outcome<V>, Error> {
        let mut cur = pos;
        let mut values = Vec::new();
        loop {
            match self.eval_atom(inner, cur)? {
                Outcome::Success(new_pos, value) => {
                    if new_pos == cur {
                        // zero-width success: stop rather than loop forever.
                        break;
                    }
                    cur = new_pos;
                    values.push(value);
                }
                Outcome::Failure(_) => break,
            }
        }
        if require_one && values.is_empty() {
            return Ok(Outcome::Failure(cur));
        }
        Ok(Outcome::Success(cur, V::seq(values)))
    }

    fn eval_opt(&mut self, inner: &Atom<V>, pos: usize) -> Result<Outcome<V>, Error> {
        match self.eval_atom(inner, pos)? {
            Outcome::Success(new_pos, value) => Ok(Outcome::Success(new_pos, V::seq(vec![value]))),
            Outcome::Failure(_) => Ok(Outcome::Success(pos, V::seq(Vec::new()))),
        }
    }

    fn eval_sep(
        &mut self,
        elem: &Atom<V>,
        sep: &Atom<V>,
        pos: usize,
        require_one: bool,
    ) -> Result<Outcome<V>, Error> {
        let mut values = Vec::new();
        let mut cur = match self.eval_atom(elem, pos)? {
            Outcome::Success(new_pos, value) => {
                values.push(value);
                new_pos
            }
            Outcome::Failure(fail_pos) => {
                return Ok(if require_one {
                    Outcome::Failure(fail_pos)
                } else {
                    Outcome::Success(pos, V::seq(values))
                });
            }
        };
        loop {
            let before_sep = cur;
            match self.eval_atom(sep, cur)? {
                Outcome::Success(after_sep, _) => match self.eval_atom(elem, after_sep)? {
                    Outcome::Success(new_pos, value) => {
                        values.push(value);
                        cur = new_pos;
                    }
                    Outcome::Failure(_) => {
                        // dangling separator: don't consume it.
                        cur = before_sep;
                        break;
                    }
                },
                Outcome::Failure(_) => break,
            }
        }
        Ok(Outcome::Success(cur, V::seq(values)))
    }
}

fn default_combine<V: Value>(mut values: Vec<V>) -> V {
    if values.len() == 1 {
        values.pop().unwrap()
    } else {
        V::seq(values)
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::Grammar;
    use crate::value::Tree;

    #[test]
    fn star_accepts_zero_repetitions() {
        let grammar = Grammar::<Tree>::compile(&["start ::= \"a\" * ;"], vec![]).unwrap();
        let result = grammar.parse(&[""], vec![]).unwrap();
        assert_eq!(result, Tree::Seq(vec![]));
    }

    #[test]
    fn plus_requires_at_least_one() {
        let grammar = Grammar::<Tree>::compile(&["start ::= \"a\" + ;"], vec![]).unwrap();
        assert!(grammar.parse(&[""], vec![]).is_err());
        let result = grammar.parse(&["a a a"], vec![]).unwrap();
        assert_eq!(result.items().len(), 3);
    }

    #[test]
    fn optional_is_present_or_empty_sequence() {
        let grammar = Grammar::<Tree>::compile(&["start ::= \"a\"? ;"], vec![]).unwrap();
        let present = grammar.parse(&["a"], vec![]).unwrap();
        assert_eq!(present.items(), &[Tree::Text("a".to_string())]);
        let absent = grammar.parse(&[""], vec![]).unwrap();
        assert_eq!(absent.items(), &[] as &[Tree]);
    }

    #[test]
    fn memo_hit_and_miss_counters_advance() {
        let grammar =
            Grammar::<Tree>::compile(&["start ::= (\"(\" start \")\") / \"a\" ;"], vec![])
                .unwrap();
        let (_, stats) = grammar
            .parse_with_stats(&["((a))"], vec![], crate::config::ParserConfig::default())
            .unwrap();
        assert!(stats.misses > 0);
    }
}
