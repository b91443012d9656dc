//! The compiled form of a grammar rule's body: ordered choice of sequences
//! of atoms, each sequence carrying an optional semantic action.

use std::rc::Rc;

use crate::packrat::RuleRef;
use crate::value::Value;

/// A semantic action: takes the positional results of a sequence's atoms
/// and returns the value the sequence as a whole yields.
pub type Action<V> = Rc<dyn Fn(&[V]) -> V>;

pub enum Atom<V: Value> {
    /// An interned string literal, matched by exact token text.
    Literal(usize),
    /// A reference to another rule, user-defined or built in.
    Rule(RuleRef),
    /// A parenthesized sub-body, tried as ordered choice in place.
    Group(Body<V>),
    Star(Box<Atom<V>>),
    Plus(Box<Atom<V>>),
    Opt(Box<Atom<V>>),
    /// `elem ** sep`: zero or more `elem`, separated by `sep`.
    SepStar(Box<Atom<V>>, Box<Atom<V>>),
    /// `elem ++ sep`: one or more `elem`, separated by `sep`.
    SepPlus(Box<Atom<V>>, Box<Atom<V>>),
}

pub struct Alternative<V: Value> {
    pub atoms: Vec<Atom<V>>,
    pub action: Option<Action<V>>,
}

pub type Body<V> = Vec<Alternative<V>>;

pub struct RuleDef<V: Value> {
    pub name: String,
    pub body: Body<V>,
}
