use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::grammar::{Grammar, Production};
use crate::utils::{GrammarPass, Result};

/// For each nonterminal, the nonterminals reachable through unit rules alone,
/// itself included.
pub fn unit_closure(grammar: &Grammar) -> BTreeMap<char, BTreeSet<char>> {
    let mut closure: BTreeMap<char, BTreeSet<char>> = grammar
        .nonterminals()
        .into_iter()
        .map(|nt| (nt, BTreeSet::from([nt])))
        .collect();

    let unit_pairs: Vec<(char, char)> = grammar
        .rules()
        .iter()
        .filter(|rule| rule.is_unit())
        .filter_map(|rule| rule.rhs[0].as_nonterminal().map(|to| (rule.lhs, to)))
        .collect();

    let mut pass = 0;
    loop {
        pass += 1;
        let mut changed = false;
        for &(from, to) in &unit_pairs {
            let targets: Vec<char> = closure
                .get(&to)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
            let entry = closure.entry(from).or_default();
            for target in targets {
                changed |= entry.insert(target);
            }
        }
        debug!("unit closure pass {}: changed={}", pass, changed);
        if !changed {
            break;
        }
    }

    closure
}

/// Replace every unit rule `A -> B` by `A -> γ` for each non-unit rule
/// `C -> γ` with `C` in the unit closure of `A`.
pub fn eliminate_unit_productions(grammar: &Grammar) -> Grammar {
    let closure = unit_closure(grammar);

    let mut rules = Vec::new();
    for rule in grammar.rules() {
        if !rule.is_unit() {
            rules.push(rule.clone());
            continue;
        }
        let Some(reachable) = closure.get(&rule.lhs) else {
            continue;
        };
        for &target in reachable {
            for inherited in grammar.rules_for(target).filter(|r| !r.is_unit()) {
                rules.push(Production {
                    lhs: rule.lhs,
                    rhs: inherited.rhs.clone(),
                });
            }
        }
    }

    let result = grammar.with_rules(rules);
    info!(
        "unit elimination: {} -> {} rules",
        grammar.len(),
        result.len()
    );
    result
}

/// Pipeline stage wrapping [`eliminate_unit_productions`]
#[derive(Debug, Clone)]
pub struct UnitEliminator;

impl GrammarPass for UnitEliminator {
    fn apply(&self, grammar: &Grammar) -> Result<Grammar> {
        Ok(eliminate_unit_productions(grammar))
    }

    fn name(&self) -> &str {
        "unit"
    }

    fn clone_box(&self) -> Box<dyn GrammarPass> {
        Box::new(self.clone())
    }
}
