use std::io;
use thiserror::Error;

/// Errors raised while compiling or enumerating a grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Empty production: {0}")]
    EmptyProduction(String),

    #[error("Grammar has no productions")]
    EmptyGrammar,

    #[error("Unknown non-terminal: {name} (referenced by {referenced_by})")]
    UnknownNonTerminal { name: String, referenced_by: String },

    #[error("Recursive grammar: {0} derives itself")]
    RecursiveGrammar(String),

    #[error("Enumeration exceeded {limit} derivations")]
    TooManyDerivations { limit: usize },
}

/// Errors raised while resolving templates against the word bank
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("Unknown category `{placeholder}` in template: {template}")]
    UnknownCategory { placeholder: String, template: String },

    #[error("Category `{0}` has no candidates")]
    EmptyCategory(String),

    #[error("Invalid placeholder at byte {position} in template: {template}")]
    InvalidPlaceholder { template: String, position: usize },

    #[error("Unknown prompt type: {0}")]
    UnknownPromptType(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum PromptGenError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for prompt generation
pub type Result<T, E = PromptGenError> = std::result::Result<T, E>;

/// Upper-case the first character, leaving the rest untouched
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character, leaving the rest untouched
pub fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-case the first character and lower-case the rest
pub fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Trait extension for Option<T> to convert to SampleError
pub trait OptionExt<T> {
    fn ok_or_unknown_type(self, prompt_type: &str) -> Result<T, SampleError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unknown_type(self, prompt_type: &str) -> Result<T, SampleError> {
        self.ok_or_else(|| SampleError::UnknownPromptType(prompt_type.to_string()))
    }
}
