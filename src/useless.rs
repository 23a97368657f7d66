use std::collections::BTreeSet;

use log::{debug, info};

use crate::grammar::{Grammar, Symbol};
use crate::utils::{GrammarPass, Result};

/// Nonterminals reachable from the start symbol
pub fn reachable_symbols(grammar: &Grammar) -> BTreeSet<char> {
    let mut reachable = BTreeSet::from([grammar.start_symbol()]);

    loop {
        let mut changed = false;
        for rule in grammar.rules() {
            if !reachable.contains(&rule.lhs) {
                continue;
            }
            for nt in rule.rhs.iter().filter_map(Symbol::as_nonterminal) {
                changed |= reachable.insert(nt);
            }
        }
        if !changed {
            break;
        }
    }

    debug!("reachable: {:?}", reachable);
    reachable
}

/// Nonterminals that derive at least one terminal string
pub fn productive_symbols(grammar: &Grammar) -> BTreeSet<char> {
    let mut productive = BTreeSet::new();

    loop {
        let mut changed = false;
        for rule in grammar.rules() {
            if productive.contains(&rule.lhs) {
                continue;
            }
            if rule.rhs.iter().all(|s| is_productive(s, &productive)) {
                productive.insert(rule.lhs);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    debug!("productive: {:?}", productive);
    productive
}

fn is_productive(symbol: &Symbol, productive: &BTreeSet<char>) -> bool {
    match symbol {
        Symbol::Terminal(_) => true,
        Symbol::NonTerminal(c) => productive.contains(c),
        Symbol::Null => false,
    }
}

/// Keep only rules whose head is reachable and whose body is productive.
///
/// Both sets are computed over the input rules and the filter runs once. A
/// symbol reachable only through a dropped rule keeps its own rules, e.g.
/// `S -> AB | a, A -> aA, B -> b` becomes `S -> a, B -> b`.
pub fn eliminate_useless_symbols(grammar: &Grammar) -> Grammar {
    let reachable = reachable_symbols(grammar);
    let productive = productive_symbols(grammar);

    let rules = grammar
        .rules()
        .iter()
        .filter(|rule| reachable.contains(&rule.lhs))
        .filter(|rule| rule.rhs.iter().all(|s| is_productive(s, &productive)))
        .cloned();

    let result = grammar.with_rules(rules);
    info!(
        "useless-symbol elimination: {} -> {} rules",
        grammar.len(),
        result.len()
    );
    result
}

/// Pipeline stage wrapping [`eliminate_useless_symbols`]
#[derive(Debug, Clone)]
pub struct UselessSymbolEliminator;

impl GrammarPass for UselessSymbolEliminator {
    fn apply(&self, grammar: &Grammar) -> Result<Grammar> {
        Ok(eliminate_useless_symbols(grammar))
    }

    fn name(&self) -> &str {
        "useless"
    }

    fn clone_box(&self) -> Box<dyn GrammarPass> {
        Box::new(self.clone())
    }
}
