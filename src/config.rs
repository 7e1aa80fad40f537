use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::grammar::GrammarConfig;
use crate::prompts::{
    DEFAULT_WEIGHTS, KEEP_QUALITY_PROMPTS, OTHER_PROMPTS, PRESERVE_PROMPTS, REPHRASE_COMMANDS,
};
use crate::utils::{PromptGenError, Result};

/// Probabilities and word lists of the mutation chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Chance of `Please ...`
    pub please_probability: f64,
    /// Chance of `Command: ...`, taken from the mass after `please_probability`
    pub command_probability: f64,
    pub preserve_probability: f64,
    pub keep_quality_probability: f64,
    /// Prompt type drawn for the preserve clause
    pub preserve_type: String,
    /// Prompt type drawn for the keep-quality clause
    pub keep_quality_type: String,
    pub commands: Vec<String>,
    /// Terminal marks with relative weights
    pub punctuation: Vec<(String, u32)>,
    /// Prompt types that never receive a trailing clause
    pub skip_clause_types: Vec<String>,
}

impl Default for MutationConfig {
    fn default() -> Self {
        MutationConfig {
            please_probability: 0.05,
            command_probability: 0.01,
            preserve_probability: 0.01,
            keep_quality_probability: 0.01,
            preserve_type: PRESERVE_PROMPTS.to_string(),
            keep_quality_type: KEEP_QUALITY_PROMPTS.to_string(),
            commands: REPHRASE_COMMANDS.iter().map(|c| c.to_string()).collect(),
            punctuation: vec![
                (".".to_string(), 48),
                ("...".to_string(), 1),
                ("!".to_string(), 1),
            ],
            skip_clause_types: vec![OTHER_PROMPTS.to_string()],
        }
    }
}

impl MutationConfig {
    /// Check probabilities and punctuation weights
    pub fn validate(&self) -> Result<()> {
        let probabilities = [
            ("please_probability", self.please_probability),
            ("command_probability", self.command_probability),
            ("preserve_probability", self.preserve_probability),
            ("keep_quality_probability", self.keep_quality_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(PromptGenError::Config(format!(
                    "{} must lie in [0, 1], got {}",
                    name, p
                )));
            }
        }

        if self.please_probability + self.command_probability > 1.0 {
            return Err(PromptGenError::Config(
                "prefix probabilities sum above 1".to_string(),
            ));
        }
        if self.preserve_probability + self.keep_quality_probability > 1.0 {
            return Err(PromptGenError::Config(
                "clause probabilities sum above 1".to_string(),
            ));
        }
        if self.punctuation.iter().all(|(_, weight)| *weight == 0) {
            return Err(PromptGenError::Config(
                "punctuation needs at least one positive weight".to_string(),
            ));
        }

        Ok(())
    }
}

/// Settings of one generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of draws before deduplication
    pub sample_size: usize,
    /// Seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
    /// Selection weight per prompt type
    pub weights: BTreeMap<String, u32>,
    /// Ceiling on derivations per grammar
    pub max_derivations: usize,
    pub mutation: MutationConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            sample_size: 10_000,
            seed: None,
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
            max_derivations: GrammarConfig::default().max_derivations,
            mutation: MutationConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check sample size, weights and mutation settings
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(PromptGenError::Config(
                "sample_size must be positive".to_string(),
            ));
        }
        if self.weights.values().all(|weight| *weight == 0) {
            return Err(PromptGenError::Config(
                "at least one prompt type needs a positive weight".to_string(),
            ));
        }
        if self.max_derivations == 0 {
            return Err(PromptGenError::Config(
                "max_derivations must be positive".to_string(),
            ));
        }
        self.mutation.validate()
    }

    /// Grammar limits derived from this configuration
    pub fn grammar_config(&self) -> GrammarConfig {
        GrammarConfig {
            max_derivations: self.max_derivations,
        }
    }
}
