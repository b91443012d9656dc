//! Compiles a BNF grammar-DSL template (§6.3's bootstrap meta-grammar) into
//! a `Grammar<V>`. Hand-written recursive descent rather than the packrat
//! substrate: the substrate doesn't exist yet from the DSL's point of view,
//! since compiling the DSL is what builds it.

use std::collections::HashMap;

use crate::bnf::ast::{Action, Alternative, Atom, Body, RuleDef};
use crate::error::{Error, GrammarError};
use crate::grammar::Grammar;
use crate::lexer;
use crate::packrat::{Builtin, RuleRef};
use crate::patterns;
use crate::regex_kit;
use crate::scanner::{is_comment_text, is_whitespace_text};
use crate::token::{Element, Position};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static STRING_RE: Lazy<Regex> =
    Lazy::new(|| regex_kit::anchored(patterns::STRING).expect("static pattern"));
static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| regex_kit::anchored(patterns::IDENT).expect("static pattern"));

enum RawAtom {
    Literal(String),
    RuleName(String),
    Group(RawBody),
    Star(Box<RawAtom>),
    Plus(Box<RawAtom>),
    Opt(Box<RawAtom>),
    SepStar(Box<RawAtom>, Box<RawAtom>),
    SepPlus(Box<RawAtom>, Box<RawAtom>),
}

struct RawAlternative {
    atoms: Vec<RawAtom>,
    action_hole: Option<u32>,
}

type RawBody = Vec<RawAlternative>;

struct RawProduction {
    name: String,
    body: RawBody,
}

/// A cursor over the bootstrap lexer's element stream. Whitespace and
/// comment tokens are skipped transparently; holes are never skipped, the
/// same discipline the compiled Scanner's SKIP rule follows.
struct Cursor<'s> {
    stream: &'s [Element],
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(stream: &'s [Element]) -> Self {
        Self { stream, pos: 0 }
    }

    fn skip_trivia(&mut self) {
        while let Some(Element::Tok(t)) = self.stream.get(self.pos) {
            if is_whitespace_text(&t.text) || is_comment_text(&t.text) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn peek_text(&mut self) -> Option<&'s str> {
        self.skip_trivia();
        self.stream
            .get(self.pos)
            .and_then(Element::as_token)
            .map(|t| t.text.as_str())
    }

    fn peek_hole(&mut self) -> Option<u32> {
        self.skip_trivia();
        self.stream.get(self.pos).and_then(Element::as_hole)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at_eof(&mut self) -> bool {
        self.skip_trivia();
        self.pos >= self.stream.len()
    }

    fn position(&self) -> Position {
        self.stream
            .get(self.pos)
            .and_then(Element::as_token)
            .map(|t| t.pos)
            .or_else(|| {
                self.stream
                    .last()
                    .and_then(Element::as_token)
                    .map(|t| Position::new(t.pos.segment, t.pos.after, t.pos.after))
            })
            .unwrap_or(Position::new(0, 0, 0))
    }

    fn expect_literal(&mut self, lit: &str) -> Result<(), Error> {
        if self.peek_text() == Some(lit) {
            self.bump();
            Ok(())
        } else {
            Err(Error::GrammarUse(GrammarError::new(format!(
                "expected `{lit}` at {}",
                self.position()
            ))))
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        match self.peek_text() {
            Some(t) if IDENT_RE.is_match(t) => {
                let name = t.to_string();
                self.bump();
                Ok(name)
            }
            _ => Err(Error::GrammarUse(GrammarError::new(format!(
                "expected an identifier at {}",
                self.position()
            )))),
        }
    }
}

fn parse_grammar(cursor: &mut Cursor) -> Result<Vec<RawProduction>, Error> {
    let mut productions = Vec::new();
    while !cursor.at_eof() {
        productions.push(parse_production(cursor)?);
    }
    if productions.is_empty() {
        return Err(Error::GrammarUse(GrammarError::new(
            "grammar defines no productions",
        )));
    }
    Ok(productions)
}

fn parse_production(cursor: &mut Cursor) -> Result<RawProduction, Error> {
    let name = cursor.expect_ident()?;
    cursor.expect_literal("::=")?;
    let body = parse_body(cursor)?;
    cursor.expect_literal(";")?;
    Ok(RawProduction { name, body })
}

fn parse_body(cursor: &mut Cursor) -> Result<RawBody, Error> {
    let mut alternatives = vec![parse_seq(cursor)?];
    while cursor.peek_text() == Some("/") {
        cursor.bump();
        alternatives.push(parse_seq(cursor)?);
    }
    Ok(alternatives)
}

fn parse_seq(cursor: &mut Cursor) -> Result<RawAlternative, Error> {
    let mut atoms = Vec::new();
    while let Some(atom) = try_parse_atom(cursor)? {
        atoms.push(atom);
    }
    let action_hole = cursor.peek_hole();
    if action_hole.is_some() {
        cursor.bump();
    }
    Ok(RawAlternative { atoms, action_hole })
}

fn try_parse_atom(cursor: &mut Cursor) -> Result<Option<RawAtom>, Error> {
    let Some(prim) = try_parse_prim(cursor)? else {
        return Ok(None);
    };
    let atom = match cursor.peek_text() {
        Some("*") => {
            cursor.bump();
            RawAtom::Star(Box::new(prim))
        }
        Some("+") => {
            cursor.bump();
            RawAtom::Plus(Box::new(prim))
        }
        Some("?") => {
            cursor.bump();
            RawAtom::Opt(Box::new(prim))
        }
        Some("**") => {
            cursor.bump();
            let sep = parse_prim(cursor)?;
            RawAtom::SepStar(Box::new(prim), Box::new(sep))
        }
        Some("++") => {
            cursor.bump();
            let sep = parse_prim(cursor)?;
            RawAtom::SepPlus(Box::new(prim), Box::new(sep))
        }
        _ => prim,
    };
    Ok(Some(atom))
}

fn parse_prim(cursor: &mut Cursor) -> Result<RawAtom, Error> {
    try_parse_prim(cursor)?.ok_or_else(|| {
        Error::GrammarUse(GrammarError::new(format!(
            "expected a string literal, rule name, or `(` at {}",
            cursor.position()
        )))
    })
}

fn try_parse_prim(cursor: &mut Cursor) -> Result<Option<RawAtom>, Error> {
    match cursor.peek_text() {
        Some(t) if STRING_RE.is_match(t) => {
            let unquoted = unquote(t)?;
            cursor.bump();
            Ok(Some(RawAtom::Literal(unquoted)))
        }
        Some("(") => {
            cursor.bump();
            let body = parse_body(cursor)?;
            cursor.expect_literal(")")?;
            Ok(Some(RawAtom::Group(body)))
        }
        Some(t) if IDENT_RE.is_match(t) => {
            let name = t.to_string();
            cursor.bump();
            Ok(Some(RawAtom::RuleName(name)))
        }
        _ => Ok(None),
    }
}

/// Strips the surrounding quotes and resolves `\"`/`\\` escapes in a
/// STRING token's text, producing the literal it denotes.
fn unquote(text: &str) -> Result<String, Error> {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| {
            Error::Internal(format!("STRING token `{text}` is not quote-delimited"))
        })?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Compiles a grammar-DSL template into a usable `Grammar<V>`. `actions`
/// supplies one semantic-action callable per hole in `segments`, in order.
pub fn compile<V: Value>(segments: &[&str], actions: Vec<Action<V>>) -> Result<Grammar<V>, Error> {
    let stream = lexer::lex(segments)?;
    let mut cursor = Cursor::new(&stream);
    let productions = parse_grammar(&mut cursor)?;

    let mut name_to_id = HashMap::new();
    for (id, prod) in productions.iter().enumerate() {
        if name_to_id.insert(prod.name.clone(), id).is_some() {
            return Err(Error::GrammarUse(GrammarError::new(format!(
                "rule `{}` is defined more than once",
                prod.name
            ))));
        }
    }

    let mut literals: Vec<String> = Vec::new();
    let mut literal_ids: HashMap<String, usize> = HashMap::new();
    let mut keywords = std::collections::HashSet::new();
    collect_literals_in_productions(&productions, &mut literals, &mut literal_ids, &mut keywords);

    log::debug!(
        "compiled grammar with {} rules, {} interned literals",
        productions.len(),
        literals.len()
    );

    let mut rules = Vec::with_capacity(productions.len());
    for prod in productions {
        let body = resolve_body(prod.body, &name_to_id, &literal_ids, &actions)?;
        rules.push(RuleDef {
            name: prod.name,
            body,
        });
    }

    Ok(Grammar::new(rules, literals, keywords, 0))
}

fn collect_literals_in_productions(
    productions: &[RawProduction],
    literals: &mut Vec<String>,
    literal_ids: &mut HashMap<String, usize>,
    keywords: &mut std::collections::HashSet<String>,
) {
    for prod in productions {
        for alt in &prod.body {
            for atom in &alt.atoms {
                collect_literals_in_atom(atom, literals, literal_ids, keywords);
            }
        }
    }
}

fn collect_literals_in_atom(
    atom: &RawAtom,
    literals: &mut Vec<String>,
    literal_ids: &mut HashMap<String, usize>,
    keywords: &mut std::collections::HashSet<String>,
) {
    match atom {
        RawAtom::Literal(lit) => {
            if !literal_ids.contains_key(lit) {
                literal_ids.insert(lit.clone(), literals.len());
                literals.push(lit.clone());
            }
            if IDENT_RE.is_match(lit) {
                keywords.insert(lit.clone());
            }
        }
        RawAtom::RuleName(_) => {}
        RawAtom::Group(body) => {
            for alt in body {
                for a in &alt.atoms {
                    collect_literals_in_atom(a, literals, literal_ids, keywords);
                }
            }
        }
        RawAtom::Star(inner)
        | RawAtom::Plus(inner)
        | RawAtom::Opt(inner) => {
            collect_literals_in_atom(inner, literals, literal_ids, keywords);
        }
        RawAtom::SepStar(elem, sep) | RawAtom::SepPlus(elem, sep) => {
            collect_literals_in_atom(elem, literals, literal_ids, keywords);
            collect_literals_in_atom(sep, literals, literal_ids, keywords);
        }
    }
}

fn resolve_body<V: Value>(
    body: RawBody,
    name_to_id: &HashMap<String, usize>,
    literal_ids: &HashMap<String, usize>,
    actions: &[Action<V>],
) -> Result<Body<V>, Error> {
    body.into_iter()
        .map(|alt| resolve_alternative(alt, name_to_id, literal_ids, actions))
        .collect()
}

fn resolve_alternative<V: Value>(
    alt: RawAlternative,
    name_to_id: &HashMap<String, usize>,
    literal_ids: &HashMap<String, usize>,
    actions: &[Action<V>],
) -> Result<Alternative<V>, Error> {
    let atoms = alt
        .atoms
        .into_iter()
        .map(|a| resolve_atom(a, name_to_id, literal_ids, actions))
        .collect::<Result<Vec<_>, _>>()?;
    let action = match alt.action_hole {
        Some(n) => Some(
            actions
                .get(n as usize)
                .cloned()
                .ok_or_else(|| GrammarError::new(format!("no action supplied for hole {n}")))?,
        ),
        None => None,
    };
    Ok(Alternative { atoms, action })
}

fn resolve_atom<V: Value>(
    atom: RawAtom,
    name_to_id: &HashMap<String, usize>,
    literal_ids: &HashMap<String, usize>,
    actions: &[Action<V>],
) -> Result<Atom<V>, Error> {
    Ok(match atom {
        RawAtom::Literal(lit) => Atom::Literal(literal_ids[&lit]),
        RawAtom::RuleName(name) => Atom::Rule(resolve_rule_ref(&name, name_to_id)?),
        RawAtom::Group(body) => Atom::Group(resolve_body(body, name_to_id, literal_ids, actions)?),
        RawAtom::Star(inner) => {
            Atom::Star(Box::new(resolve_atom(*inner, name_to_id, literal_ids, actions)?))
        }
        RawAtom::Plus(inner) => {
            Atom::Plus(Box::new(resolve_atom(*inner, name_to_id, literal_ids, actions)?))
        }
        RawAtom::Opt(inner) => {
            Atom::Opt(Box::new(resolve_atom(*inner, name_to_id, literal_ids, actions)?))
        }
        RawAtom::SepStar(elem, sep) => Atom::SepStar(
            Box::new(resolve_atom(*elem, name_to_id, literal_ids, actions)?),
            Box::new(resolve_atom(*sep, name_to_id, literal_ids, actions)?),
        ),
        RawAtom::SepPlus(elem, sep) => Atom::SepPlus(
            Box::new(resolve_atom(*elem, name_to_id, literal_ids, actions)?),
            Box::new(resolve_atom(*sep, name_to_id, literal_ids, actions)?),
        ),
    })
}

fn resolve_rule_ref(name: &str, name_to_id: &HashMap<String, usize>) -> Result<RuleRef, Error> {
    if let Some(builtin) = Builtin::from_name(name) {
        return Ok(RuleRef::Builtin(builtin));
    }
    if let Some(&id) = name_to_id.get(name) {
        return Ok(RuleRef::User(id));
    }
    Err(Error::GrammarUse(GrammarError::undefined_rule(name)))
}
