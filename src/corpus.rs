//! Draw loop, capitalization and deduplication of the final prompt set.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::mutate::MutationPipeline;
use crate::prompts::{builtin_library, install_default_categories};
use crate::sampler::{PromptSampler, TypeWeights};
use crate::utils::{Result, SampleError, capitalize};
use crate::wordbank::WordBank;

/// Collapse exact duplicates, keeping the first occurrence of each prompt
pub fn dedup(prompts: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(prompts.len());
    prompts
        .into_iter()
        .filter(|prompt| seen.insert(prompt.clone()))
        .collect()
}

/// The unique prompts of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    prompts: Vec<String>,
}

impl Corpus {
    /// Build a corpus from raw draws, dropping duplicates
    pub fn from_prompts(prompts: Vec<String>) -> Self {
        Corpus {
            prompts: dedup(prompts),
        }
    }

    /// Get the prompts in first-seen order
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Number of unique prompts
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Check if the corpus holds no prompts
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Consume the corpus into its prompts
    pub fn into_inner(self) -> Vec<String> {
        self.prompts
    }

    /// Write the prompts as a JSON array with one-space indentation
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);

        self.serialize(&mut serializer)?;
        serializer.into_inner().flush()?;

        info!(
            path = %path.as_ref().display(),
            prompts = self.len(),
            "wrote corpus"
        );
        Ok(())
    }
}

/// Sampler, mutation chain and type weights wired together
#[derive(Debug, Clone)]
pub struct CorpusGenerator {
    sampler: PromptSampler,
    pipeline: MutationPipeline,
    weights: TypeWeights,
}

impl CorpusGenerator {
    /// Create a generator from its parts
    pub fn new(sampler: PromptSampler, pipeline: MutationPipeline, weights: TypeWeights) -> Self {
        CorpusGenerator {
            sampler,
            pipeline,
            weights,
        }
    }

    /// Build the generator for the built-in grammars.
    ///
    /// All grammars are enumerated and every placeholder is checked against
    /// the word bank before this returns.
    pub fn from_config(config: &GeneratorConfig, mut word_bank: WordBank) -> Result<Self> {
        config.validate()?;
        install_default_categories(&mut word_bank);

        let library = builtin_library(&config.grammar_config())?;
        let weights = TypeWeights::new(
            config
                .weights
                .iter()
                .map(|(name, weight)| (name.as_str(), *weight)),
        )?;
        for prompt_type in weights.names() {
            if library.get(prompt_type).is_none() {
                return Err(SampleError::UnknownPromptType(prompt_type.clone()).into());
            }
        }

        let sampler = PromptSampler::new(library, word_bank);
        sampler.check_bindings()?;

        let pipeline = MutationPipeline::from_config(&config.mutation)?;
        Ok(Self::new(sampler, pipeline, weights))
    }

    /// Get the sampler
    pub fn sampler(&self) -> &PromptSampler {
        &self.sampler
    }

    /// Get the type weights
    pub fn weights(&self) -> &TypeWeights {
        &self.weights
    }

    /// One draw: type, template, bindings, mutations, capitalization
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Result<String, SampleError> {
        let prompt_type = self.weights.sample(rng);
        self.draw_type(prompt_type, rng)
    }

    /// One draw of a given type
    pub fn draw_type<R: Rng>(&self, prompt_type: &str, rng: &mut R) -> Result<String, SampleError> {
        let prompt = self.sampler.draw(prompt_type, rng)?;
        let prompt = self
            .pipeline
            .mutate(prompt, prompt_type, &self.sampler, rng)?;
        Ok(capitalize(&prompt))
    }

    /// Draw `sample_size` prompts and deduplicate them
    pub fn generate<R: Rng>(&self, sample_size: usize, rng: &mut R) -> Result<Corpus, SampleError> {
        let prompt_types = self.weights.sample_n(sample_size, rng);

        let mut prompts = Vec::with_capacity(sample_size);
        for prompt_type in prompt_types {
            prompts.push(self.draw_type(prompt_type, rng)?);
        }
        debug!(draws = prompts.len(), "sampling finished");

        let corpus = Corpus::from_prompts(prompts);
        info!(
            draws = sample_size,
            unique = corpus.len(),
            "generated corpus"
        );
        Ok(corpus)
    }
}
