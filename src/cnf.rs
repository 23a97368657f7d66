use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::grammar::{Grammar, Production, Symbol};
use crate::utils::{GrammarError, GrammarPass, Result};

/// Hands out nonterminal names that do not occur in the grammar yet, and
/// remembers which fresh nonterminal stands for each terminal.
#[derive(Debug, Clone)]
pub struct SymbolAllocator {
    used: BTreeSet<char>,
    terminals: BTreeMap<char, char>,
}

impl SymbolAllocator {
    /// Start with every nonterminal of `grammar` (and its start symbol) taken
    pub fn for_grammar(grammar: &Grammar) -> Self {
        let mut used = grammar.nonterminals();
        used.insert(grammar.start_symbol());
        SymbolAllocator {
            used,
            terminals: BTreeMap::new(),
        }
    }

    /// The first unused letter in `A..=Z`, marked as used
    pub fn fresh(&mut self, purpose: &str) -> Result<char> {
        let name = ('A'..='Z')
            .find(|c| !self.used.contains(c))
            .ok_or_else(|| GrammarError::SymbolExhaustion(purpose.to_string()))?;
        self.used.insert(name);
        debug!("allocated {} for {}", name, purpose);
        Ok(name)
    }

    /// The nonterminal standing for `terminal`, allocated on first use
    pub fn terminal(&mut self, terminal: char) -> Result<char> {
        if let Some(&name) = self.terminals.get(&terminal) {
            return Ok(name);
        }
        let name = self.fresh(&format!("terminal '{}'", terminal))?;
        self.terminals.insert(terminal, name);
        Ok(name)
    }

    /// `N -> t` for every memoized terminal, ordered by terminal
    pub fn terminal_rules(&self) -> impl Iterator<Item = Production> + '_ {
        self.terminals.iter().map(|(&terminal, &name)| Production {
            lhs: name,
            rhs: vec![Symbol::Terminal(terminal)],
        })
    }
}

fn pair(lhs: char, first: char, second: char) -> Production {
    Production {
        lhs,
        rhs: vec![Symbol::NonTerminal(first), Symbol::NonTerminal(second)],
    }
}

/// Rewrite a null-free, unit-free, useful grammar into Chomsky Normal Form.
///
/// Fails with `SymbolExhaustion` when a fresh nonterminal is needed and every
/// uppercase letter is taken.
pub fn transform_into_cnf(grammar: &Grammar) -> Result<Grammar> {
    let mut allocator = SymbolAllocator::for_grammar(grammar);
    let mut rules = Vec::new();

    for rule in grammar.rules() {
        if rule.rhs.is_empty() {
            return Err(GrammarError::malformed(
                0,
                format!("empty right-hand side for {}", rule.lhs),
            ));
        }
        if rule.rhs.len() == 1 {
            rules.push(rule.clone());
            continue;
        }

        let names = rule
            .rhs
            .iter()
            .map(|symbol| match symbol {
                Symbol::NonTerminal(name) => Ok(*name),
                Symbol::Terminal(terminal) => allocator.terminal(*terminal),
                Symbol::Null => Err(GrammarError::malformed(
                    0,
                    format!("null marker inside a rule for {}", rule.lhs),
                )),
            })
            .collect::<Result<Vec<char>>>()?;

        let n = names.len();
        if n == 2 {
            rules.push(pair(rule.lhs, names[0], names[1]));
            continue;
        }

        // chain from the back to the front
        let purpose = format!("a rule for {}", rule.lhs);
        let mut last = allocator.fresh(&purpose)?;
        rules.push(pair(last, names[n - 2], names[n - 1]));
        for &name in names[1..n - 2].iter().rev() {
            let head = allocator.fresh(&purpose)?;
            rules.push(pair(head, name, last));
            last = head;
        }
        rules.push(pair(rule.lhs, names[0], last));
    }

    rules.extend(allocator.terminal_rules());

    let result = grammar.with_rules(rules);
    info!("cnf transform: {} -> {} rules", grammar.len(), result.len());
    Ok(result)
}

/// Pipeline stage wrapping [`transform_into_cnf`]
#[derive(Debug, Clone)]
pub struct CnfTransformer;

impl GrammarPass for CnfTransformer {
    fn apply(&self, grammar: &Grammar) -> Result<Grammar> {
        transform_into_cnf(grammar)
    }

    fn name(&self) -> &str {
        "cnf"
    }

    fn clone_box(&self) -> Box<dyn GrammarPass> {
        Box::new(self.clone())
    }
}
