//! Cfg-Normalizer converts context-free grammars into Chomsky Normal Form.
//!
//! A grammar is a list of rules over single-letter symbols: uppercase letters
//! are nonterminals, lowercase letters are terminals and `\` is the empty
//! string. Normalization runs four stages in a fixed order, each producing a
//! new grammar: null elimination, unit elimination, useless-symbol elimination
//! and the CNF transform.
//!
//! # Example
//!
//! ```rust
//! use cfg_normalizer::{normalize, Grammar};
//!
//! let grammar = Grammar::parse_str("S -> aSb | \\").unwrap();
//! let cnf = normalize(&grammar).unwrap();
//!
//! assert!(cnf.is_cnf());
//! assert_eq!(
//!     cnf.to_string(),
//!     "C -> SB\nS -> AC\nS -> AB\nA -> a\nB -> b\n"
//! );
//! ```

pub mod cnf;
pub mod grammar;
pub mod nullable;
pub mod unit;
pub mod useless;
pub mod utils;

pub use cnf::{transform_into_cnf, CnfTransformer, SymbolAllocator};
pub use grammar::{Grammar, GrammarBuilder, GrammarConfig, Production, Symbol};
pub use nullable::{eliminate_null_productions, NullEliminator};
pub use unit::{eliminate_unit_productions, UnitEliminator};
pub use useless::{eliminate_useless_symbols, UselessSymbolEliminator};
pub use utils::{
    default_pass_registry, GrammarError, GrammarPass, PassChain, PassExt, PassRegistry, Result,
};

/// Run the full pipeline: null, unit and useless-symbol elimination, then CNF
pub fn normalize(grammar: &Grammar) -> Result<Grammar> {
    PassChain::standard().apply(grammar)
}
