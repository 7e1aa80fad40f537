use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use tracing::debug;

use crate::utils::{GrammarError, Result};

/// Represents an element in the grammar, either a terminal or a non-terminal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    /// A terminal symbol (literal text, may carry `$name` placeholders)
    Terminal(String),
    /// A non-terminal symbol (reference to another rule)
    NonTerminal(String),
}

/// One alternative right-hand side of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    /// The sequence of elements in this production
    pub elements: Vec<Element>,
}

/// Configuration options for grammar enumeration
#[derive(Debug, Clone)]
pub struct GrammarConfig {
    /// Ceiling on the number of derivations any single non-terminal may expand to
    pub max_derivations: usize,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            max_derivations: 1_000_000,
        }
    }
}

/// A compiled context-free grammar
#[derive(Debug, Clone)]
pub struct Grammar {
    /// The rules mapping non-terminals to productions
    rules: HashMap<String, Vec<Production>>,
    /// The starting symbol for derivation
    start_symbol: String,
    /// Configuration options
    config: GrammarConfig,
}

impl Grammar {
    /// Create a new empty grammar with a specified start symbol
    pub fn new(start_symbol: &str) -> Self {
        Self::with_config(start_symbol, GrammarConfig::default())
    }

    /// Create a new empty grammar with custom configuration
    pub fn with_config(start_symbol: &str, config: GrammarConfig) -> Self {
        Grammar {
            rules: HashMap::new(),
            start_symbol: start_symbol.to_string(),
            config,
        }
    }

    /// Compile production-rule text of the form `LHS -> "a" B | "c"`.
    ///
    /// The left-hand side of the first production becomes the start symbol.
    /// Blank lines and lines starting with `#` are skipped, and repeated
    /// left-hand sides append alternatives to the existing rule.
    pub fn compile(text: &str) -> std::result::Result<Self, GrammarError> {
        Self::compile_with_config(text, GrammarConfig::default())
    }

    /// Compile production-rule text with custom configuration
    pub fn compile_with_config(
        text: &str,
        config: GrammarConfig,
    ) -> std::result::Result<Self, GrammarError> {
        let mut grammar: Option<Grammar> = None;

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (lhs, rhs) = trimmed.split_once("->").ok_or_else(|| GrammarError::Parse {
                line: line_no,
                message: "expected `->`".to_string(),
            })?;

            let lhs = lhs.trim();
            if !is_valid_name(lhs) {
                return Err(GrammarError::Parse {
                    line: line_no,
                    message: format!("invalid left-hand side `{}`", lhs),
                });
            }

            let alternatives = tokenize_alternatives(rhs, line_no)?;
            let target =
                grammar.get_or_insert_with(|| Grammar::with_config(lhs, config.clone()));

            for elements in alternatives {
                if elements.is_empty() {
                    return Err(GrammarError::EmptyProduction(trimmed.to_string()));
                }
                target.push_production(lhs, Production { elements });
            }
        }

        let grammar = grammar.ok_or(GrammarError::EmptyGrammar)?;
        grammar.validate()?;
        Ok(grammar)
    }

    /// Load and compile a grammar from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::compile(&text)?)
    }

    /// Parse a single alternative such as `"make" TT "better"`
    pub fn parse_production(elements_str: &str) -> std::result::Result<Production, GrammarError> {
        let mut alternatives = tokenize_alternatives(elements_str, 1)?;

        if alternatives.len() != 1 {
            return Err(GrammarError::Parse {
                line: 1,
                message: "expected a single alternative".to_string(),
            });
        }

        let elements = alternatives.remove(0);
        if elements.is_empty() {
            return Err(GrammarError::EmptyProduction(elements_str.to_string()));
        }

        Ok(Production { elements })
    }

    /// Add one alternative to a rule
    pub fn add_rule(
        &mut self,
        non_terminal: &str,
        alternative: &str,
    ) -> std::result::Result<&mut Self, GrammarError> {
        let production = Self::parse_production(alternative)?;
        self.push_production(non_terminal, production);
        Ok(self)
    }

    fn push_production(&mut self, non_terminal: &str, production: Production) {
        self.rules
            .entry(non_terminal.to_string())
            .or_default()
            .push(production);
    }

    /// Check that the start symbol and every referenced non-terminal have a rule
    pub fn validate(&self) -> std::result::Result<(), GrammarError> {
        if !self.rules.contains_key(&self.start_symbol) {
            return Err(GrammarError::UnknownNonTerminal {
                name: self.start_symbol.clone(),
                referenced_by: "start symbol".to_string(),
            });
        }

        let mut names: Vec<&String> = self.rules.keys().collect();
        names.sort();

        for name in names {
            for production in &self.rules[name] {
                for element in &production.elements {
                    if let Element::NonTerminal(referenced) = element {
                        if !self.rules.contains_key(referenced) {
                            return Err(GrammarError::UnknownNonTerminal {
                                name: referenced.clone(),
                                referenced_by: name.clone(),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Enumerate every distinct terminal sequence derivable from the start symbol.
    ///
    /// Alternatives are expanded in declaration order and each sequence is
    /// reported once, at its first derivation. Expansions are memoized per
    /// non-terminal. A non-terminal that derives itself fails with
    /// [`GrammarError::RecursiveGrammar`] and any expansion larger than
    /// [`GrammarConfig::max_derivations`] fails with
    /// [`GrammarError::TooManyDerivations`].
    pub fn enumerate(&self) -> std::result::Result<Vec<Vec<String>>, GrammarError> {
        let mut enumerator = Enumerator {
            grammar: self,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        };

        let derivations = enumerator.expand(&self.start_symbol, "start symbol")?;
        debug!(
            start = %self.start_symbol,
            derivations = derivations.len(),
            "enumerated grammar"
        );

        Ok(derivations.as_ref().clone())
    }

    /// Check if the grammar contains a specific non-terminal
    pub fn has_non_terminal(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Get a reference to the grammar's rules
    pub fn rules(&self) -> &HashMap<String, Vec<Production>> {
        &self.rules
    }

    /// Get the start symbol
    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    /// Get a reference to the grammar's configuration
    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    /// Set a new configuration
    pub fn set_config(&mut self, config: GrammarConfig) {
        self.config = config;
    }
}

impl FromStr for Grammar {
    type Err = GrammarError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Grammar::compile(s)
    }
}

type Derivations = Rc<Vec<Vec<String>>>;

struct Enumerator<'g> {
    grammar: &'g Grammar,
    memo: HashMap<&'g str, Derivations>,
    in_progress: HashSet<&'g str>,
}

impl<'g> Enumerator<'g> {
    fn expand(
        &mut self,
        symbol: &'g str,
        referenced_by: &str,
    ) -> std::result::Result<Derivations, GrammarError> {
        if let Some(done) = self.memo.get(symbol) {
            return Ok(Rc::clone(done));
        }

        if !self.in_progress.insert(symbol) {
            return Err(GrammarError::RecursiveGrammar(symbol.to_string()));
        }

        let grammar = self.grammar;
        let productions =
            grammar
                .rules
                .get(symbol)
                .ok_or_else(|| GrammarError::UnknownNonTerminal {
                    name: symbol.to_string(),
                    referenced_by: referenced_by.to_string(),
                })?;

        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut out = Vec::new();

        for production in productions {
            let mut partial: Vec<Vec<String>> = vec![Vec::new()];

            for element in &production.elements {
                match element {
                    Element::Terminal(text) => {
                        for seq in &mut partial {
                            seq.push(text.clone());
                        }
                    }
                    Element::NonTerminal(name) => {
                        let tails = self.expand(name, symbol)?;
                        self.check_limit(partial.len().saturating_mul(tails.len()))?;

                        let mut next = Vec::with_capacity(partial.len() * tails.len());
                        for head in &partial {
                            for tail in tails.iter() {
                                let mut seq = Vec::with_capacity(head.len() + tail.len());
                                seq.extend_from_slice(head);
                                seq.extend_from_slice(tail);
                                next.push(seq);
                            }
                        }
                        partial = next;
                    }
                }
            }

            for seq in partial {
                if !seen.contains(&seq) {
                    seen.insert(seq.clone());
                    out.push(seq);
                }
            }
            self.check_limit(out.len())?;
        }

        self.in_progress.remove(symbol);
        let out = Rc::new(out);
        self.memo.insert(symbol, Rc::clone(&out));
        Ok(out)
    }

    fn check_limit(&self, count: usize) -> std::result::Result<(), GrammarError> {
        let limit = self.grammar.config.max_derivations;
        if count > limit {
            return Err(GrammarError::TooManyDerivations { limit });
        }
        Ok(())
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '/'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '/' | '^' | '<' | '>' | '-')
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => is_name_start(first) && chars.all(is_name_char),
        None => false,
    }
}

/// Split a right-hand side into its `|`-separated alternatives
fn tokenize_alternatives(
    rhs: &str,
    line: usize,
) -> std::result::Result<Vec<Vec<Element>>, GrammarError> {
    let mut alternatives = Vec::new();
    let mut current = Vec::new();
    let mut chars = rhs.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '|' {
            chars.next();
            alternatives.push(std::mem::take(&mut current));
        } else if c == '"' || c == '\'' {
            chars.next();
            let start = pos + c.len_utf8();
            let end = loop {
                match chars.next() {
                    Some((end, ch)) if ch == c => break end,
                    Some(_) => continue,
                    None => {
                        return Err(GrammarError::Parse {
                            line,
                            message: format!("unterminated quote starting at column {}", pos + 1),
                        });
                    }
                }
            };
            current.push(Element::Terminal(rhs[start..end].to_string()));
        } else if is_name_start(c) {
            let start = pos;
            let mut end = pos;
            while let Some(&(idx, ch)) = chars.peek() {
                if !is_name_char(ch) {
                    break;
                }
                end = idx + ch.len_utf8();
                chars.next();
            }
            current.push(Element::NonTerminal(rhs[start..end].to_string()));
        } else {
            return Err(GrammarError::Parse {
                line,
                message: format!("unexpected character `{}` at column {}", c, pos + 1),
            });
        }
    }

    alternatives.push(current);
    Ok(alternatives)
}

/// Builder for constructing Grammar instances
pub struct GrammarBuilder {
    grammar: Grammar,
    error: Option<GrammarError>,
}

impl GrammarBuilder {
    /// Create a new grammar builder with default config
    pub fn new(start_symbol: &str) -> Self {
        GrammarBuilder {
            grammar: Grammar::new(start_symbol),
            error: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: GrammarConfig) -> Self {
        self.grammar.config = config;
        self
    }

    /// Add one alternative to a rule; the first parse error is reported by `build`
    pub fn add_rule(mut self, non_terminal: &str, alternative: &str) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.grammar.add_rule(non_terminal, alternative) {
                self.error = Some(err);
            }
        }
        self
    }

    /// Build and validate the grammar
    pub fn build(self) -> std::result::Result<Grammar, GrammarError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.grammar.validate()?;
        Ok(self.grammar)
    }
}
