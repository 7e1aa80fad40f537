//! Weighted prompt-type selection and template resolution.

use std::collections::HashMap;

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use tracing::debug;

use crate::template::{PromptTemplate, TemplateSet};
use crate::utils::{OptionExt, SampleError};
use crate::wordbank::WordBank;

/// Enumerated template sets keyed by prompt type
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    sets: HashMap<String, TemplateSet>,
}

impl TemplateLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        TemplateLibrary {
            sets: HashMap::new(),
        }
    }

    /// Add or replace the template set of a prompt type
    pub fn insert(&mut self, prompt_type: &str, set: TemplateSet) {
        self.sets.insert(prompt_type.to_string(), set);
    }

    /// Get the template set of a prompt type
    pub fn get(&self, prompt_type: &str) -> Option<&TemplateSet> {
        self.sets.get(prompt_type)
    }

    /// Prompt types, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of prompt types
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Check if the library is empty
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Prompt types with integer selection weights
#[derive(Debug, Clone)]
pub struct TypeWeights {
    names: Vec<String>,
    weights: Vec<u32>,
    index: WeightedIndex<u32>,
}

impl TypeWeights {
    /// Types with weight 0 are dropped; at least one positive weight is required
    pub fn new<S, I>(weights: I) -> Result<Self, SampleError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, u32)>,
    {
        let mut pairs: Vec<(String, u32)> = weights
            .into_iter()
            .map(|(name, weight)| (name.into(), weight))
            .filter(|(_, weight)| *weight > 0)
            .collect();
        pairs.sort();
        pairs.dedup_by(|a, b| a.0 == b.0);

        if pairs.is_empty() {
            return Err(SampleError::InvalidWeights(
                "at least one type needs a positive weight".to_string(),
            ));
        }

        let (names, weights): (Vec<String>, Vec<u32>) = pairs.into_iter().unzip();
        let index = WeightedIndex::new(&weights)
            .map_err(|err| SampleError::InvalidWeights(err.to_string()))?;

        Ok(TypeWeights {
            names,
            weights,
            index,
        })
    }

    /// Draw one type with probability proportional to its weight
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.names[self.index.sample(rng)]
    }

    /// Draw `count` independent types
    pub fn sample_n<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<&str> {
        (0..count).map(|_| self.sample(rng)).collect()
    }

    /// Get the enabled type names, sorted
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Get the weight of a type
    pub fn weight(&self, name: &str) -> Option<u32> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.weights[idx])
    }
}

/// Draws prompts by binding template placeholders to word-bank candidates
#[derive(Debug, Clone)]
pub struct PromptSampler {
    library: TemplateLibrary,
    word_bank: WordBank,
}

impl PromptSampler {
    /// Create a sampler over a library and word bank
    pub fn new(library: TemplateLibrary, word_bank: WordBank) -> Self {
        PromptSampler { library, word_bank }
    }

    /// Get the template library
    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// Get the word bank
    pub fn word_bank(&self) -> &WordBank {
        &self.word_bank
    }

    /// Pick a template of `prompt_type` uniformly and resolve it
    pub fn draw<R: Rng + ?Sized>(
        &self,
        prompt_type: &str,
        rng: &mut R,
    ) -> Result<String, SampleError> {
        let template = self
            .library
            .get(prompt_type)
            .ok_or_unknown_type(prompt_type)?
            .choose(rng)
            .ok_or_unknown_type(prompt_type)?;

        self.resolve(template, rng)
    }

    /// Bind every placeholder to one uniform draw from its category and substitute
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        template: &PromptTemplate,
        rng: &mut R,
    ) -> Result<String, SampleError> {
        let mut bindings = HashMap::with_capacity(template.placeholders().len());

        for name in template.placeholders() {
            let value = self
                .word_bank
                .choose(name, rng)
                .map_err(|err| with_template(err, template))?;
            bindings.insert(name.clone(), value.to_string());
        }

        template.substitute(&bindings)
    }

    /// Verify that every placeholder of every template has a non-empty category
    pub fn check_bindings(&self) -> Result<(), SampleError> {
        for prompt_type in self.library.types() {
            let Some(set) = self.library.get(prompt_type) else {
                continue;
            };

            for template in set.templates() {
                for name in template.placeholders() {
                    match self.word_bank.get(name) {
                        None => {
                            return Err(SampleError::UnknownCategory {
                                placeholder: name.clone(),
                                template: template.text().to_string(),
                            });
                        }
                        Some([]) => return Err(SampleError::EmptyCategory(name.clone())),
                        Some(_) => {}
                    }
                }
            }

            debug!(prompt_type, templates = set.len(), "bindings checked");
        }

        Ok(())
    }
}

fn with_template(err: SampleError, template: &PromptTemplate) -> SampleError {
    match err {
        SampleError::UnknownCategory { placeholder, .. } => SampleError::UnknownCategory {
            placeholder,
            template: template.text().to_string(),
        },
        other => other,
    }
}
