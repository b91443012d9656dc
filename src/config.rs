//! Runtime options for a parse run.

/// Small, explicit option struct rather than a builder: the few knobs a
/// parse run needs rarely grow, and the defaults are almost always right.
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    /// When set, the packrat substrate logs a trace line for every `run`
    /// call (rule name, position, hit/miss) in addition to the `debug!`
    /// lines it always emits for left recursion and grammar compilation.
    pub debug: bool,
    /// When false, the substrate never consults or populates the memo
    /// table: every `run` call is a miss. Parse results are unaffected;
    /// only the hit/miss counters change. Exists to exercise the
    /// memoization-equivalence property directly rather than as something
    /// a caller would reach for in normal use.
    pub memoize: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            debug: false,
            memoize: true,
        }
    }
}
