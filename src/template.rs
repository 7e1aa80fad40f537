//! Joining derivations into template strings and binding `$name` placeholders.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;

use crate::grammar::Grammar;
use crate::utils::{Result, SampleError};

/// `$$`, `$name`, `${name}`, or a bare `$` that starts none of those.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$(?:(?P<escaped>\$)|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<invalid>))",
    )
    .expect("placeholder pattern is valid")
});

/// Join derivation tokens into a sentence.
///
/// A single space goes before every token that starts with an alphanumeric
/// character, `$` or a backtick, except the first token. Backticks become
/// double quotes, so `` "the word" "`$nouns`" `` renders as `the word "..."`.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();

    for (idx, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        if idx > 0 && token.starts_with(|c: char| c.is_alphanumeric() || c == '$' || c == '`') {
            out.push(' ');
        }
        out.push_str(&token.replace('`', "\""));
    }

    out
}

/// Every distinct placeholder name referenced by `text`
pub fn extract_placeholders(text: &str) -> Result<HashSet<String>, SampleError> {
    Ok(scan_placeholders(text)?.into_iter().collect())
}

/// Distinct placeholder names in first-seen order
fn scan_placeholders(text: &str) -> Result<Vec<String>, SampleError> {
    let mut names: Vec<String> = Vec::new();

    for caps in PLACEHOLDER.captures_iter(text) {
        if caps.name("invalid").is_some() {
            return Err(SampleError::InvalidPlaceholder {
                template: text.to_string(),
                position: caps.get(0).map_or(0, |m| m.start()),
            });
        }

        if let Some(name) = caps.name("named").or_else(|| caps.name("braced")) {
            if !names.iter().any(|n| n == name.as_str()) {
                names.push(name.as_str().to_string());
            }
        }
    }

    Ok(names)
}

/// A joined derivation with its placeholder names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
    placeholders: Vec<String>,
}

impl PromptTemplate {
    /// Parse a template string, rejecting malformed placeholders
    pub fn new(text: impl Into<String>) -> Result<Self, SampleError> {
        let text = text.into();
        let placeholders = scan_placeholders(&text)?;
        Ok(PromptTemplate { text, placeholders })
    }

    /// Join a derivation and parse the result
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, SampleError> {
        Self::new(join_tokens(tokens))
    }

    /// Get the template text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Distinct placeholder names, in order of first occurrence
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Replace every placeholder with its binding in a single pass.
    ///
    /// Bound values are inserted verbatim; a `$` inside a value is never
    /// expanded. `$$` renders as `$`. Fails without producing any output
    /// when a placeholder has no binding.
    pub fn substitute(&self, bindings: &HashMap<String, String>) -> Result<String, SampleError> {
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&self.text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&self.text[last..whole.start()]);

            if caps.name("escaped").is_some() {
                out.push('$');
            } else if let Some(name) = caps.name("named").or_else(|| caps.name("braced")) {
                let value =
                    bindings
                        .get(name.as_str())
                        .ok_or_else(|| SampleError::UnknownCategory {
                            placeholder: name.as_str().to_string(),
                            template: self.text.clone(),
                        })?;
                out.push_str(value);
            } else {
                return Err(SampleError::InvalidPlaceholder {
                    template: self.text.clone(),
                    position: whole.start(),
                });
            }

            last = whole.end();
        }

        out.push_str(&self.text[last..]);
        Ok(out)
    }
}

/// Which derivations of a grammar become templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationFilter {
    #[default]
    KeepAll,
    /// Drop derivations in which the same placeholder-bearing terminal occurs
    /// twice, e.g. `make it $qualities and $qualities`.
    RejectRepeatedSlots,
}

impl DerivationFilter {
    /// Check if a derivation passes this filter
    pub fn accepts<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        match self {
            DerivationFilter::KeepAll => true,
            DerivationFilter::RejectRepeatedSlots => {
                let mut slots: HashSet<&str> = HashSet::new();
                for token in tokens {
                    let token: &str = token.as_ref();
                    if token.contains('$') && !slots.insert(token) {
                        return false;
                    }
                }
                true
            }
        }
    }
}

/// All templates enumerated from one grammar
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<PromptTemplate>,
}

impl TemplateSet {
    /// Create a set from resolved templates
    pub fn new(templates: Vec<PromptTemplate>) -> Self {
        TemplateSet { templates }
    }

    /// Enumerate a grammar and join every accepted derivation
    pub fn from_grammar(grammar: &Grammar, filter: DerivationFilter) -> Result<Self> {
        let derivations = grammar.enumerate()?;
        Ok(Self::from_derivations(&derivations, filter)?)
    }

    /// Build templates from token sequences, dropping filtered ones
    pub fn from_derivations<S: AsRef<str>>(
        derivations: &[Vec<S>],
        filter: DerivationFilter,
    ) -> Result<Self, SampleError> {
        let templates = derivations
            .iter()
            .filter(|tokens| filter.accepts(tokens.as_slice()))
            .map(|tokens| PromptTemplate::from_tokens(tokens.as_slice()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TemplateSet { templates })
    }

    /// Get the templates
    pub fn templates(&self) -> &[PromptTemplate] {
        &self.templates
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Pick one template uniformly
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&PromptTemplate> {
        self.templates.choose(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_join_tokens_spacing() {
        assert_eq!(join_tokens(&["make", "this text", "better"]), "make this text better");
        assert_eq!(join_tokens(&["$authors", "'s", "prose"]), "$authors's prose");
        assert_eq!(join_tokens(&["make", "it", "", "more"]), "make it more");
        assert_eq!(join_tokens(&["", "start"]), " start");
        assert_eq!(join_tokens::<&str>(&[]), "");
    }

    #[test]
    fn test_join_tokens_backticks() {
        assert_eq!(
            join_tokens(&["inject", "the word", "`$nouns`", "into", "it"]),
            "inject the word \"$nouns\" into it"
        );
    }

    #[test]
    fn test_extract_placeholders() {
        let names = extract_placeholders("rewrite the $text as ${code} for $text $$5").unwrap();
        let expected: HashSet<String> = ["text", "code"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names, expected);

        assert!(extract_placeholders("no placeholders here").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_placeholder() {
        assert_eq!(
            PromptTemplate::new("costs $5").unwrap_err(),
            SampleError::InvalidPlaceholder {
                template: "costs $5".to_string(),
                position: 6,
            }
        );
        assert!(PromptTemplate::new("trailing $").is_err());
    }

    #[test]
    fn test_substitute() {
        let template = PromptTemplate::new("make ${a} and $b, then $a again").unwrap();
        assert_eq!(template.placeholders(), ["a", "b"]);

        let out = template
            .substitute(&bindings(&[("a", "X"), ("b", "Y")]))
            .unwrap();
        assert_eq!(out, "make X and Y, then X again");
    }

    #[test]
    fn test_substitute_is_single_pass() {
        let template = PromptTemplate::new("say $a for $$1").unwrap();
        let out = template
            .substitute(&bindings(&[("a", "$b"), ("b", "never")]))
            .unwrap();
        assert_eq!(out, "say $b for $1");
    }

    #[test]
    fn test_substitute_missing_binding() {
        let template = PromptTemplate::new("make $a and $b").unwrap();
        let err = template.substitute(&bindings(&[("a", "X")])).unwrap_err();
        assert_eq!(
            err,
            SampleError::UnknownCategory {
                placeholder: "b".to_string(),
                template: "make $a and $b".to_string(),
            }
        );
    }

    #[test]
    fn test_reject_repeated_slots() {
        let filter = DerivationFilter::RejectRepeatedSlots;
        assert!(filter.accepts(&["make", "it", "$qualities"]));
        assert!(filter.accepts(&["make", "the $text", "$qualities"]));
        assert!(!filter.accepts(&["make", "it", "$qualities", "and", "$qualities"]));
        assert!(DerivationFilter::KeepAll.accepts(&["$q", "$q"]));
    }

    #[test]
    fn test_template_set_from_grammar() {
        let grammar = Grammar::compile(
            r#"
            S -> "make" TT Q | "make" TT Q "and" Q
            TT -> "it" | "the $text"
            Q -> "$qualities"
            "#,
        )
        .unwrap();

        let all = TemplateSet::from_grammar(&grammar, DerivationFilter::KeepAll).unwrap();
        assert_eq!(all.len(), 4);

        let filtered =
            TemplateSet::from_grammar(&grammar, DerivationFilter::RejectRepeatedSlots).unwrap();
        let mut texts: Vec<&str> = filtered.templates().iter().map(|t| t.text()).collect();
        texts.sort();
        assert_eq!(texts, vec!["make it $qualities", "make the $text $qualities"]);
    }
}
