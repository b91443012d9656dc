//! The parser-as-tag surface: a compiled grammar that is itself callable
//! like a template tag over a segments-plus-holes pair.

use std::collections::HashSet;

use crate::bnf::ast::{Action, Body, RuleDef};
use crate::bnf::compiler;
use crate::config::ParserConfig;
use crate::error::Error;
use crate::lexer;
use crate::packrat::{Builtin, Outcome, ParserContext, RuleRef};
use crate::scanner::Scanner;
use crate::value::Value;

/// An immutable, compiled rule-set. Cheap to share: a single `Grammar` may
/// back any number of concurrent parses, each with its own substrate state.
pub struct Grammar<V: Value> {
    rules: Vec<RuleDef<V>>,
    literals: Vec<String>,
    keywords: HashSet<String>,
    start: usize,
}

impl<V: Value> Grammar<V> {
    pub(crate) fn new(
        rules: Vec<RuleDef<V>>,
        literals: Vec<String>,
        keywords: HashSet<String>,
        start: usize,
    ) -> Self {
        Self {
            rules,
            literals,
            keywords,
            start,
        }
    }

    /// Compiles a grammar-DSL template (§6.3's bootstrap meta-grammar).
    /// `actions` supplies one semantic-action callable per hole in
    /// `segments`, in order.
    pub fn compile(segments: &[&str], actions: Vec<Action<V>>) -> Result<Self, Error> {
        compiler::compile(segments, actions)
    }

    pub(crate) fn rule_name(&self, id: usize) -> &str {
        &self.rules[id].name
    }

    pub(crate) fn rule_body(&self, id: usize) -> &Body<V> {
        &self.rules[id].body
    }

    pub(crate) fn literal(&self, id: usize) -> &str {
        &self.literals[id]
    }

    /// Parses `segments` (with `holes` interpolated at the gaps) against
    /// this grammar's start rule, requiring the whole input to be
    /// consumed.
    pub fn parse(&self, segments: &[&str], holes: Vec<V>) -> Result<V, Error> {
        self.parse_with_config(segments, holes, ParserConfig::default())
    }

    pub fn parse_with_config(
        &self,
        segments: &[&str],
        holes: Vec<V>,
        config: ParserConfig,
    ) -> Result<V, Error> {
        self.parse_with_stats(segments, holes, config).map(|(v, _)| v)
    }

    /// Same as [`Grammar::parse_with_config`], but also returns the memo
    /// table's hit/miss counters for this run. Exists mainly so tests and
    /// diagnostics can observe memoization behavior directly.
    pub fn parse_with_stats(
        &self,
        segments: &[&str],
        holes: Vec<V>,
        config: ParserConfig,
    ) -> Result<(V, crate::packrat::MemoStats), Error> {
        let stream = lexer::lex(segments)?;
        let scanner = Scanner::new(stream, self.keywords.clone());
        let template = crate::scanner::render_template(segments);
        let mut ctx = ParserContext::with_template(scanner, self, config, template);

        let start_outcome = ctx.run(RuleRef::User(self.start), 0)?;
        let (end_pos, value) = match start_outcome {
            Outcome::Success(end_pos, value) => (end_pos, value),
            Outcome::Failure(_) => return Err(ctx.syntax_error()),
        };

        match ctx.run(RuleRef::Builtin(Builtin::Eof), end_pos)? {
            Outcome::Success(_, _) => Ok((substitute_holes(value, &holes), ctx.stats())),
            Outcome::Failure(_) => Err(ctx.syntax_error()),
        }
    }
}

/// Walks a parse result, replacing every hole placeholder with the caller's
/// actual interpolated value. This is the static-typing-friendly
/// replacement for "apply the hole values to the top-level action if it's
/// a curried post-processor": rather than special-casing a function-typed
/// result, every hole left in the tree by the grammar's own actions gets
/// substituted uniformly. Grammars whose actions never emit a hole
/// placeholder are unaffected.
fn substitute_holes<V: Value>(value: V, holes: &[V]) -> V {
    if let Some(n) = value.as_hole() {
        return holes.get(n as usize).cloned().unwrap_or(value);
    }
    if let Some(items) = value.as_seq() {
        let substituted = items
            .iter()
            .cloned()
            .map(|v| substitute_holes(v, holes))
            .collect();
        return V::seq(substituted);
    }
    value
}

/// Declarative sugar for calling a grammar with a template. Segments and
/// hole expressions alternate, starting and ending with a string literal
/// segment: `parse_template!(grammar, "a ", expr, " b")`.
#[macro_export]
macro_rules! parse_template {
    ($grammar:expr, $($tail:tt)*) => {
        $crate::__parse_template_muncher!($grammar; []; []; $($tail)*)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __parse_template_muncher {
    ($grammar:expr; [$($segs:expr),*]; [$($holes:expr),*]; $last:literal) => {
        $grammar.parse(&[$($segs,)* $last], vec![$($holes),*])
    };
    ($grammar:expr; [$($segs:expr),*]; [$($holes:expr),*]; $seg:literal, $hole:expr, $($tail:tt)*) => {
        $crate::__parse_template_muncher!($grammar; [$($segs,)* $seg]; [$($holes,)* $hole]; $($tail)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Tree;

    #[test]
    fn substitute_holes_replaces_top_level_hole() {
        let holes = vec![Tree::Text("actual".to_string())];
        let result = substitute_holes(Tree::Hole(0), &holes);
        assert_eq!(result, Tree::Text("actual".to_string()));
    }

    #[test]
    fn substitute_holes_walks_nested_sequences() {
        let holes = vec![Tree::Text("a".to_string()), Tree::Text("b".to_string())];
        let tree = Tree::Seq(vec![Tree::Hole(1), Tree::Seq(vec![Tree::Hole(0)])]);
        let result = substitute_holes(tree, &holes);
        assert_eq!(
            result,
            Tree::Seq(vec![
                Tree::Text("b".to_string()),
                Tree::Seq(vec![Tree::Text("a".to_string())])
            ])
        );
    }

    #[test]
    fn substitute_holes_leaves_out_of_range_hole_untouched() {
        let result = substitute_holes(Tree::Hole(5), &[]);
        assert_eq!(result, Tree::Hole(5));
    }
}
