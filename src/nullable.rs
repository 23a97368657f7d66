use std::collections::{BTreeSet, HashSet};

use log::{debug, info};

use crate::grammar::{Grammar, Production, Symbol};
use crate::utils::{GrammarPass, Result};

/// Nonterminals that can derive the empty string.
///
/// Least fixpoint: a nonterminal becomes nullable once one of its rules has
/// a right-hand side made only of the null marker and nullable nonterminals.
pub fn nullable_symbols(grammar: &Grammar) -> BTreeSet<char> {
    let mut nullable = BTreeSet::new();
    let mut pass = 0;

    loop {
        pass += 1;
        let mut changed = false;
        for rule in grammar.rules() {
            if nullable.contains(&rule.lhs) {
                continue;
            }
            if rule.rhs.iter().all(|s| is_nullable(s, &nullable)) {
                nullable.insert(rule.lhs);
                changed = true;
            }
        }
        debug!("nullable pass {}: {:?}", pass, nullable);
        if !changed {
            break;
        }
    }

    nullable
}

fn is_nullable(symbol: &Symbol, nullable: &BTreeSet<char>) -> bool {
    match symbol {
        Symbol::Null => true,
        Symbol::NonTerminal(c) => nullable.contains(c),
        Symbol::Terminal(_) => false,
    }
}

/// Every right-hand side obtained by deleting some nullable occurrences.
///
/// Built one symbol at a time: each partial body either keeps the symbol or,
/// if it is nullable, also drops it. Duplicate partial bodies are merged at
/// every step, so a run of identical nullable symbols grows linearly. The
/// original comes first; deletions that would leave nothing are skipped.
fn shortenings(rhs: &[Symbol], nullable: &BTreeSet<char>) -> Vec<Vec<Symbol>> {
    let mut partials: Vec<Vec<Symbol>> = vec![Vec::new()];

    for symbol in rhs {
        let droppable = is_nullable(symbol, nullable);
        let mut seen = HashSet::new();
        let mut next = Vec::new();
        for partial in partials {
            let mut kept = partial.clone();
            kept.push(*symbol);
            if seen.insert(kept.clone()) {
                next.push(kept);
            }
            if droppable && seen.insert(partial.clone()) {
                next.push(partial);
            }
        }
        partials = next;
    }

    partials.retain(|partial| !partial.is_empty());
    partials
}

/// Remove null productions, rewriting every rule that mentions a nullable
/// nonterminal into the variants with those occurrences deleted.
pub fn eliminate_null_productions(grammar: &Grammar) -> Grammar {
    let nullable = nullable_symbols(grammar);

    let mut rules = Vec::new();
    for rule in grammar.rules() {
        if rule.is_null() {
            continue;
        }
        for rhs in shortenings(&rule.rhs, &nullable) {
            rules.push(Production { lhs: rule.lhs, rhs });
        }
    }

    let result = grammar.with_rules(rules);
    info!(
        "null elimination: {} nullable, {} -> {} rules",
        nullable.len(),
        grammar.len(),
        result.len()
    );
    result
}

/// Pipeline stage wrapping [`eliminate_null_productions`]
#[derive(Debug, Clone)]
pub struct NullEliminator;

impl GrammarPass for NullEliminator {
    fn apply(&self, grammar: &Grammar) -> Result<Grammar> {
        Ok(eliminate_null_productions(grammar))
    }

    fn name(&self) -> &str {
        "null"
    }

    fn clone_box(&self) -> Box<dyn GrammarPass> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules_of(grammar: &Grammar) -> Vec<String> {
        grammar
            .rules()
            .iter()
            .map(|r| format!("{} -> {}", r.lhs, r.rhs_string(grammar.null_marker())))
            .collect()
    }

    #[test]
    fn test_nullable_chains_transitively() {
        let grammar = Grammar::parse_str("S -> Aa\nA -> B\nB -> C\nC -> \\").unwrap();
        assert_eq!(nullable_symbols(&grammar), BTreeSet::from(['A', 'B', 'C']));
    }

    #[test]
    fn test_nullable_needs_every_symbol() {
        let grammar = Grammar::parse_str("S -> AB\nA -> \\\nB -> b").unwrap();
        assert_eq!(nullable_symbols(&grammar), BTreeSet::from(['A']));
    }

    #[test]
    fn test_all_nullable_pair() {
        let grammar = Grammar::parse_str("S -> AB\nA -> \\\nB -> \\").unwrap();
        assert_eq!(nullable_symbols(&grammar), BTreeSet::from(['A', 'B', 'S']));

        let result = eliminate_null_productions(&grammar);
        assert_eq!(rules_of(&result), vec!["S -> AB", "S -> A", "S -> B"]);
        assert!(result.rules().iter().all(|r| !r.rhs.contains(&Symbol::Null)));
    }

    #[test]
    fn test_balanced_parens() {
        let grammar = Grammar::parse_str("S -> aSb | \\").unwrap();
        let result = eliminate_null_productions(&grammar);
        assert_eq!(rules_of(&result), vec!["S -> aSb", "S -> ab"]);
    }

    #[test]
    fn test_non_adjacent_nullables_vanish_together() {
        let grammar = Grammar::parse_str("S -> AbA\nA -> a | \\").unwrap();
        let result = eliminate_null_productions(&grammar);
        assert_eq!(
            rules_of(&result),
            vec!["S -> AbA", "S -> Ab", "S -> bA", "S -> b", "A -> a"]
        );
    }

    #[test]
    fn test_everything_nullable_leaves_empty_grammar() {
        let grammar = Grammar::parse_str("S -> \\").unwrap();
        let result = eliminate_null_productions(&grammar);
        assert!(result.is_empty());
        assert_eq!(result.start_symbol(), 'S');
    }

    #[test]
    fn test_rules_without_nullables_pass_through() {
        let grammar = Grammar::parse_str("S -> ab | Tc\nT -> t").unwrap();
        let result = eliminate_null_productions(&grammar);
        assert_eq!(result, grammar);
    }

    #[test]
    fn test_duplicate_shortenings_are_merged() {
        let grammar = Grammar::parse_str("S -> AA\nA -> a | \\").unwrap();
        let result = eliminate_null_productions(&grammar);
        assert_eq!(rules_of(&result), vec!["S -> AA", "S -> A", "A -> a"]);
    }

    #[test]
    fn test_long_run_of_nullables() {
        let body = "A".repeat(64);
        let grammar = Grammar::parse_str(&format!("S -> {}\nA -> a | \\", body)).unwrap();
        let result = eliminate_null_productions(&grammar);

        // one S rule per length 1..=64, plus A -> a
        assert_eq!(result.rules_for('S').count(), 64);
        assert_eq!(result.rules_for('S').next().unwrap().rhs.len(), 64);
        assert_eq!(result.len(), 65);
    }

    #[test]
    fn test_long_rhs_with_interleaved_nullables() {
        let grammar = Grammar::parse_str("S -> aAbAcAdAeA\nA -> x | \\").unwrap();
        let result = eliminate_null_productions(&grammar);

        // five independent nullable positions
        assert_eq!(result.rules_for('S').count(), 32);
        assert_eq!(rules_of(&result)[0], "S -> aAbAcAdAeA");
        assert!(rules_of(&result).contains(&"S -> abcde".to_string()));
    }
}
