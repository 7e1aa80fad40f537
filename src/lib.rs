//! Prompt-Gen synthesizes instruction prompts from context-free grammars.
//!
//! Each grammar is compiled and exhaustively enumerated into templates whose
//! `$name` placeholders are filled from a word bank of categorized word lists.
//! Resolved prompts then pass through a chain of probabilistic mutations and
//! the run is deduplicated into a corpus.
//!
//! # Example
//!
//! ```rust
//! use prompt_gen::{Grammar, join_tokens};
//!
//! let grammar = Grammar::compile(r#"
//!     SENTENCE -> "make" TT "better"
//!     TT -> "this text" | "it"
//! "#).unwrap();
//!
//! let mut sentences: Vec<String> = grammar
//!     .enumerate()
//!     .unwrap()
//!     .iter()
//!     .map(|tokens| join_tokens(tokens))
//!     .collect();
//! sentences.sort();
//!
//! assert_eq!(sentences, vec!["make it better", "make this text better"]);
//! ```

pub mod config;
pub mod corpus;
pub mod grammar;
pub mod mutate;
pub mod prompts;
pub mod sampler;
pub mod template;
pub mod utils;
pub mod wordbank;

pub use config::{GeneratorConfig, MutationConfig};
pub use corpus::{Corpus, CorpusGenerator, dedup};
pub use grammar::{Element, Grammar, GrammarBuilder, GrammarConfig, Production};
pub use mutate::{MutationPipeline, MutationStage, ProbabilityBands};
pub use sampler::{PromptSampler, TemplateLibrary, TypeWeights};
pub use template::{DerivationFilter, PromptTemplate, TemplateSet, extract_placeholders, join_tokens};
pub use utils::{GrammarError, PromptGenError, Result, SampleError, capitalize};
pub use wordbank::WordBank;
