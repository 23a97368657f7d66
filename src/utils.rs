use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;

use crate::cnf::CnfTransformer;
use crate::grammar::Grammar;
use crate::nullable::NullEliminator;
use crate::unit::UnitEliminator;
use crate::useless::UselessSymbolEliminator;

/// Custom error types for grammar normalization
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed rule on line {line}: {reason}")]
    MalformedRule { line: usize, reason: String },

    #[error("No unused nonterminal name left for {0}")]
    SymbolExhaustion(String),

    #[error("Unknown pass: {0}")]
    UnknownPass(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl GrammarError {
    /// Shorthand for a `MalformedRule` error
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        GrammarError::MalformedRule {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// A single grammar-to-grammar transformation stage
pub trait GrammarPass: fmt::Debug {
    /// Produce a new grammar from `grammar`, leaving the input untouched
    fn apply(&self, grammar: &Grammar) -> Result<Grammar>;

    /// Get the name of this pass
    fn name(&self) -> &str;

    /// Clone this pass as a box
    fn clone_box(&self) -> Box<dyn GrammarPass>;
}

impl Clone for Box<dyn GrammarPass> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Trait for creating pass chains
pub trait PassExt: GrammarPass + Sized {
    /// Run `other` on the output of this pass
    fn then<P: GrammarPass + 'static>(self, other: P) -> PassChain
    where
        Self: 'static,
    {
        PassChain::new(Box::new(self), Box::new(other))
    }
}

impl<T: GrammarPass + 'static> PassExt for T {}

/// A chain of passes applied in sequence, each consuming the previous output
#[derive(Debug)]
pub struct PassChain {
    passes: Vec<Box<dyn GrammarPass>>,
    name: String,
}

impl PassChain {
    /// Create a new pass chain from two passes
    pub fn new(first: Box<dyn GrammarPass>, second: Box<dyn GrammarPass>) -> Self {
        Self::from_passes(vec![first, second])
    }

    /// Create a chain from an ordered list of passes
    pub fn from_passes(passes: Vec<Box<dyn GrammarPass>>) -> Self {
        let name = passes
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join("+");
        PassChain { passes, name }
    }

    /// The four normalization stages in their mandatory order
    pub fn standard() -> Self {
        NullEliminator
            .then(UnitEliminator)
            .add(UselessSymbolEliminator)
            .add(CnfTransformer)
    }

    /// Add another pass to the end of the chain
    pub fn add<P: GrammarPass + 'static>(mut self, pass: P) -> Self {
        if self.name.is_empty() {
            self.name = pass.name().to_string();
        } else {
            self.name = format!("{}+{}", self.name, pass.name());
        }
        self.passes.push(Box::new(pass));
        self
    }

    /// Number of passes in the chain
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl GrammarPass for PassChain {
    fn apply(&self, grammar: &Grammar) -> Result<Grammar> {
        let mut current = grammar.clone();
        for pass in &self.passes {
            current = pass.apply(&current)?;
        }
        Ok(current)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clone_box(&self) -> Box<dyn GrammarPass> {
        let mut cloned = Vec::new();
        for pass in &self.passes {
            cloned.push(pass.clone_box());
        }
        Box::new(PassChain {
            passes: cloned,
            name: self.name.clone(),
        })
    }
}

/// Registry for managing and retrieving passes by name, in registration order
#[derive(Debug, Clone, Default)]
pub struct PassRegistry {
    passes: Vec<(String, Arc<Box<dyn GrammarPass>>)>,
}

impl PassRegistry {
    /// Create a new empty pass registry
    pub fn new() -> Self {
        PassRegistry { passes: Vec::new() }
    }

    /// Register a pass with a name
    pub fn register<P: GrammarPass + 'static>(&mut self, name: &str, pass: P) -> &mut Self {
        self.passes.push((name.to_string(), Arc::new(Box::new(pass))));
        self
    }

    /// Get a pass by name
    pub fn get(&self, name: &str) -> Option<Arc<Box<dyn GrammarPass>>> {
        self.passes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| Arc::clone(p))
    }

    /// Get a list of all registered pass names
    pub fn list_passes(&self) -> Vec<String> {
        self.passes.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Chain every registered pass up to and including `last`
    pub fn chain_until(&self, last: &str) -> Result<PassChain> {
        let end = self
            .passes
            .iter()
            .position(|(n, _)| n == last)
            .ok_or_else(|| GrammarError::UnknownPass(last.to_string()))?;
        let passes = self.passes[..=end]
            .iter()
            .map(|(_, p)| p.clone_box())
            .collect();
        Ok(PassChain::from_passes(passes))
    }

    /// Register the four normalization stages in pipeline order
    pub fn register_defaults(&mut self) -> &mut Self {
        self.register("null", NullEliminator)
            .register("unit", UnitEliminator)
            .register("useless", UselessSymbolEliminator)
            .register("cnf", CnfTransformer)
    }
}

/// Create a registry holding the standard pipeline stages
pub fn default_pass_registry() -> PassRegistry {
    let mut registry = PassRegistry::new();
    registry.register_defaults();
    registry
}

/// Trait extension for Option<T> to convert to GrammarError
pub trait OptionExt<T> {
    fn ok_or_malformed<F>(self, line: usize, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_malformed<F>(self, line: usize, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| GrammarError::malformed(line, f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grammar {
        Grammar::parse_str("S -> aSb | \\").unwrap()
    }

    #[test]
    fn test_standard_chain_order() {
        let chain = PassChain::standard();
        assert_eq!(chain.len(), 4);
        assert_eq!(chain.name(), "null+unit+useless+cnf");
    }

    #[test]
    fn test_chain_matches_manual_composition() {
        let grammar = sample();
        let chained = PassChain::standard().apply(&grammar).unwrap();

        let manual = NullEliminator.apply(&grammar).unwrap();
        let manual = UnitEliminator.apply(&manual).unwrap();
        let manual = UselessSymbolEliminator.apply(&manual).unwrap();
        let manual = CnfTransformer.apply(&manual).unwrap();

        assert_eq!(chained, manual);
    }

    #[test]
    fn test_pass_registry() {
        let registry = default_pass_registry();
        assert_eq!(
            registry.list_passes(),
            vec!["null", "unit", "useless", "cnf"]
        );

        let pass = registry.get("unit").unwrap();
        assert_eq!(pass.name(), "unit");
        assert!(registry.get("bogus").is_none());
    }

    #[test]
    fn test_chain_until() {
        let registry = default_pass_registry();
        let chain = registry.chain_until("useless").unwrap();
        assert_eq!(chain.name(), "null+unit+useless");

        let err = registry.chain_until("missing").unwrap_err();
        assert!(matches!(err, GrammarError::UnknownPass(name) if name == "missing"));
    }

    #[test]
    fn test_boxed_chain_clone() {
        let boxed: Box<dyn GrammarPass> = Box::new(PassChain::standard());
        let cloned = boxed.clone();
        assert_eq!(cloned.name(), boxed.name());
        assert_eq!(
            cloned.apply(&sample()).unwrap(),
            boxed.apply(&sample()).unwrap()
        );
    }

    #[test]
    fn test_option_ext() {
        let missing: Option<char> = None;
        let err = missing.ok_or_malformed(3, || "no lhs".to_string()).unwrap_err();
        assert_eq!(format!("{}", err), "Malformed rule on line 3: no lhs");
    }
}
