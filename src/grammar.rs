use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::{GrammarError, OptionExt, Result};

/// Represents a symbol in the grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// A nonterminal, always an uppercase ASCII letter
    NonTerminal(char),
    /// A terminal, always a lowercase ASCII letter
    Terminal(char),
    /// The empty string; only valid as a complete right-hand side
    Null,
}

impl Symbol {
    /// Classify a letter by case. Anything else is not a symbol.
    pub fn from_char(c: char) -> Option<Symbol> {
        if c.is_ascii_uppercase() {
            Some(Symbol::NonTerminal(c))
        } else if c.is_ascii_lowercase() {
            Some(Symbol::Terminal(c))
        } else {
            None
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self, Symbol::NonTerminal(_))
    }

    /// The nonterminal name, if this is a nonterminal
    pub fn as_nonterminal(&self) -> Option<char> {
        match self {
            Symbol::NonTerminal(c) => Some(*c),
            _ => None,
        }
    }

    /// Render the symbol using `null_marker` for the empty string
    pub fn to_char(&self, null_marker: char) -> char {
        match self {
            Symbol::NonTerminal(c) | Symbol::Terminal(c) => *c,
            Symbol::Null => null_marker,
        }
    }
}

/// Represents a production rule `lhs -> rhs` in the grammar
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Production {
    /// The nonterminal being rewritten
    pub lhs: char,
    /// The sequence of symbols it is rewritten to
    pub rhs: Vec<Symbol>,
}

impl Production {
    /// Create a production, checking that it is well formed
    pub fn new(lhs: char, rhs: Vec<Symbol>) -> Result<Self> {
        if !lhs.is_ascii_uppercase() {
            return Err(GrammarError::malformed(
                0,
                format!("left-hand side '{}' is not a nonterminal", lhs),
            ));
        }
        if rhs.is_empty() {
            return Err(GrammarError::malformed(0, "empty right-hand side"));
        }
        if rhs.len() > 1 && rhs.contains(&Symbol::Null) {
            return Err(GrammarError::malformed(
                0,
                "null marker mixed with other symbols",
            ));
        }
        Ok(Production { lhs, rhs })
    }

    /// `X -> \`
    pub fn is_null(&self) -> bool {
        self.rhs == [Symbol::Null]
    }

    /// `X -> Y` for a nonterminal `Y`
    pub fn is_unit(&self) -> bool {
        self.rhs.len() == 1 && self.rhs[0].is_nonterminal()
    }

    /// `X -> YZ` or `X -> a`
    pub fn is_cnf(&self) -> bool {
        match self.rhs.as_slice() {
            [single] => single.is_terminal(),
            [first, second] => first.is_nonterminal() && second.is_nonterminal(),
            _ => false,
        }
    }

    /// Right-hand side as text
    pub fn rhs_string(&self, null_marker: char) -> String {
        self.rhs.iter().map(|s| s.to_char(null_marker)).collect()
    }
}

/// Configuration options for reading and printing grammars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// The distinguished start nonterminal
    pub start_symbol: char,
    /// The character standing for the empty string in rule text
    pub null_marker: char,
    /// Whether to print rules sorted by `(lhs, rhs)` instead of storage order
    pub sorted_output: bool,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            start_symbol: 'S',
            null_marker: '\\',
            sorted_output: false,
        }
    }
}

impl GrammarConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GrammarConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the start symbol and null marker do not collide with letters
    pub fn validate(&self) -> Result<()> {
        if !self.start_symbol.is_ascii_uppercase() {
            return Err(GrammarError::Config(format!(
                "start symbol '{}' must be an uppercase letter",
                self.start_symbol
            )));
        }
        if self.null_marker.is_alphabetic()
            || self.null_marker.is_whitespace()
            || self.null_marker == '|'
        {
            return Err(GrammarError::Config(format!(
                "null marker '{}' must not be a letter, whitespace or '|'",
                self.null_marker
            )));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct GrammarView {
    start_symbol: char,
    rules: Vec<RuleView>,
}

#[derive(Serialize)]
struct RuleView {
    lhs: char,
    rhs: String,
}

/// A context-free grammar over single-character symbols
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    /// The rules, in storage order
    rules: Vec<Production>,
    /// The starting symbol for derivations
    start_symbol: char,
    /// Character used for the empty string when reading and printing
    null_marker: char,
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::with_config(&GrammarConfig::default())
    }
}

impl Grammar {
    /// Create a new empty grammar with a specified start symbol.
    /// Fails with `Config` unless the start symbol is an uppercase letter.
    pub fn new(start_symbol: char) -> Result<Self> {
        let config = GrammarConfig {
            start_symbol,
            ..GrammarConfig::default()
        };
        config.validate()?;
        Ok(Grammar::with_config(&config))
    }

    // Callers validate `config` first.
    fn with_config(config: &GrammarConfig) -> Self {
        Grammar {
            rules: Vec::new(),
            start_symbol: config.start_symbol,
            null_marker: config.null_marker,
        }
    }

    /// A grammar with the same start symbol and null marker but new rules.
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn with_rules<I>(&self, rules: I) -> Self
    where
        I: IntoIterator<Item = Production>,
    {
        let mut seen = HashSet::new();
        let rules = rules
            .into_iter()
            .filter(|rule| seen.insert(rule.clone()))
            .collect();
        Grammar {
            rules,
            start_symbol: self.start_symbol,
            null_marker: self.null_marker,
        }
    }

    /// Parse a grammar using the default configuration
    pub fn parse_str(input: &str) -> Result<Self> {
        Self::parse_with_config(input, &GrammarConfig::default())
    }

    /// Parse a grammar written as `L -> alt | alt ...` lines.
    ///
    /// Leading blank lines are skipped, a blank line after the first rule
    /// ends the grammar, and lines starting with `#` are comments.
    pub fn parse_with_config(input: &str, config: &GrammarConfig) -> Result<Self> {
        config.validate()?;
        let rule_regex = Regex::new(r"^([^\s>-]+)\s*->(.*)$")?;
        let mut grammar = Grammar::with_config(config);

        for (idx, line) in input.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if grammar.rules.is_empty() {
                    continue;
                }
                break;
            }
            if trimmed.starts_with('#') {
                continue;
            }

            let captures = rule_regex
                .captures(trimmed)
                .ok_or_malformed(line_no, || format!("expected 'X -> ...', got \"{}\"", trimmed))?;

            let head = &captures[1];
            let mut head_chars = head.chars();
            let lhs = match (head_chars.next(), head_chars.next()) {
                (Some(c), None) if c.is_ascii_uppercase() => c,
                _ => {
                    return Err(GrammarError::malformed(
                        line_no,
                        format!("left-hand side \"{}\" is not a single nonterminal", head),
                    ));
                }
            };

            let before = grammar.rules.len();
            for alternative in captures[2]
                .split(|c: char| c == '|' || c.is_whitespace())
                .filter(|s| !s.is_empty())
            {
                let rhs = Self::parse_rhs(alternative, config.null_marker, line_no)?;
                grammar.rules.push(Production { lhs, rhs });
            }
            if grammar.rules.len() == before {
                return Err(GrammarError::malformed(line_no, "empty right-hand side"));
            }
        }

        Ok(grammar)
    }

    /// Parse one alternative, e.g. `aSb` or the bare null marker
    pub fn parse_rhs(text: &str, null_marker: char, line_no: usize) -> Result<Vec<Symbol>> {
        if text.is_empty() {
            return Err(GrammarError::malformed(line_no, "empty right-hand side"));
        }
        if text.contains(null_marker) {
            if text.chars().count() == 1 {
                return Ok(vec![Symbol::Null]);
            }
            return Err(GrammarError::malformed(
                line_no,
                format!("null marker mixed with other symbols in \"{}\"", text),
            ));
        }
        text.chars()
            .map(|c| {
                Symbol::from_char(c).ok_or_malformed(line_no, || {
                    format!("'{}' is neither a letter nor the null marker", c)
                })
            })
            .collect()
    }

    /// Read a grammar until end of input or the first blank line after a rule
    pub fn from_reader<R: BufRead>(reader: R, config: &GrammarConfig) -> Result<Self> {
        let mut text = String::new();
        let mut seen_rule = false;
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() && seen_rule {
                break;
            }
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                seen_rule = true;
            }
            text.push_str(&line);
            text.push('\n');
        }
        Self::parse_with_config(&text, config)
    }

    /// Parse a grammar from a file
    pub fn from_file<P: AsRef<Path>>(path: P, config: &GrammarConfig) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(io::BufReader::new(file), config)
    }

    /// Add a rule written as text, e.g. `add_rule('S', "aSb")`
    pub fn add_rule(&mut self, lhs: char, rhs: &str) -> Result<&mut Self> {
        let symbols = Self::parse_rhs(rhs, self.null_marker, 0)?;
        self.rules.push(Production::new(lhs, symbols)?);
        Ok(self)
    }

    /// Get a reference to the grammar's rules
    pub fn rules(&self) -> &[Production] {
        &self.rules
    }

    /// Rules headed by `lhs`
    pub fn rules_for(&self, lhs: char) -> impl Iterator<Item = &Production> {
        self.rules.iter().filter(move |rule| rule.lhs == lhs)
    }

    /// Get the start symbol
    pub fn start_symbol(&self) -> char {
        self.start_symbol
    }

    pub fn null_marker(&self) -> char {
        self.null_marker
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every nonterminal mentioned on either side of a rule
    pub fn nonterminals(&self) -> BTreeSet<char> {
        let mut names = BTreeSet::new();
        for rule in &self.rules {
            names.insert(rule.lhs);
            names.extend(rule.rhs.iter().filter_map(Symbol::as_nonterminal));
        }
        names
    }

    /// Every terminal mentioned in a right-hand side
    pub fn terminals(&self) -> BTreeSet<char> {
        self.rules
            .iter()
            .flat_map(|rule| rule.rhs.iter())
            .filter_map(|symbol| match symbol {
                Symbol::Terminal(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Check if the grammar contains rules for a specific nonterminal
    pub fn has_non_terminal(&self, name: char) -> bool {
        self.rules.iter().any(|rule| rule.lhs == name)
    }

    /// True when every rule is `A -> BC` or `A -> a`
    pub fn is_cnf(&self) -> bool {
        self.rules.iter().all(Production::is_cnf)
    }

    /// A copy with rules sorted by `(lhs, rhs)`
    pub fn sorted(&self) -> Self {
        let mut sorted = self.clone();
        sorted.rules.sort();
        sorted
    }

    /// Render the grammar as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        let view = GrammarView {
            start_symbol: self.start_symbol,
            rules: self
                .rules
                .iter()
                .map(|rule| RuleView {
                    lhs: rule.lhs,
                    rhs: rule.rhs_string(self.null_marker),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&view)?)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{} -> {}", rule.lhs, rule.rhs_string(self.null_marker))?;
        }
        Ok(())
    }
}

/// Builder for constructing Grammar instances
pub struct GrammarBuilder {
    grammar: Grammar,
    error: Option<GrammarError>,
}

impl GrammarBuilder {
    /// Create a new grammar builder with a start symbol
    pub fn new(start_symbol: char) -> Self {
        let config = GrammarConfig {
            start_symbol,
            ..GrammarConfig::default()
        };
        let error = config.validate().err();
        GrammarBuilder {
            grammar: Grammar::with_config(&config),
            error,
        }
    }

    /// Set the start symbol and null marker from a configuration
    pub fn config(mut self, config: &GrammarConfig) -> Self {
        if let Err(err) = config.validate() {
            self.error.get_or_insert(err);
            return self;
        }
        self.grammar.start_symbol = config.start_symbol;
        self.grammar.null_marker = config.null_marker;
        self
    }

    /// Add one rule per alternative
    pub fn add_rule(mut self, lhs: char, alternatives: &[&str]) -> Self {
        for alternative in alternatives {
            if self.error.is_some() {
                break;
            }
            if let Err(err) = self.grammar.add_rule(lhs, alternative) {
                self.error = Some(err);
            }
        }
        self
    }

    /// Build the grammar, reporting the first malformed rule if any
    pub fn build(self) -> Result<Grammar> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.grammar),
        }
    }
}
