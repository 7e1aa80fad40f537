//! Probabilistic post-processing of resolved prompts.
//!
//! Every stage makes its decision from one fresh uniform draw in `[0, 1)`
//! matched against a [`ProbabilityBands`] table, so the probability mass of
//! each effect can be read straight off the configuration.

use std::fmt;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::config::MutationConfig;
use crate::sampler::PromptSampler;
use crate::utils::{PromptGenError, SampleError, capitalize_word, lowercase_first};

/// Ordered `(cumulative threshold, effect)` pairs
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityBands<E> {
    bands: Vec<(f64, E)>,
}

impl<E> Default for ProbabilityBands<E> {
    fn default() -> Self {
        ProbabilityBands { bands: Vec::new() }
    }
}

impl<E> ProbabilityBands<E> {
    /// Create an empty band table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect taking the next `probability` of the mass
    pub fn band(mut self, probability: f64, effect: E) -> Self {
        let threshold = self.total() + probability;
        self.bands.push((threshold, effect));
        self
    }

    /// Probability that any effect fires
    pub fn total(&self) -> f64 {
        self.bands.last().map_or(0.0, |(threshold, _)| *threshold)
    }

    /// The first effect whose threshold lies above `draw`
    pub fn select(&self, draw: f64) -> Option<&E> {
        self.bands
            .iter()
            .find(|(threshold, _)| draw < *threshold)
            .map(|(_, effect)| effect)
    }

    /// Select with a fresh uniform draw
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&E> {
        self.select(rng.gen_range(0.0..1.0))
    }
}

/// What a stage may consult besides the prompt itself
pub struct MutationContext<'a> {
    pub prompt_type: &'a str,
    pub sampler: &'a PromptSampler,
}

/// One transform of the mutation chain
pub trait MutationStage: Send + Sync + fmt::Debug {
    /// Transform the prompt
    fn apply(
        &self,
        prompt: String,
        ctx: &MutationContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<String, SampleError>;

    /// Get the name of this stage
    fn name(&self) -> &str;

    /// Check if this stage runs for a given prompt type
    fn applies_to(&self, _prompt_type: &str) -> bool {
        true
    }

    /// Clone this stage as a box
    fn clone_box(&self) -> Box<dyn MutationStage>;
}

impl Clone for Box<dyn MutationStage> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixEffect {
    /// `Please make it ...`
    Please,
    /// `Rewrite: make it ...`
    Command,
}

/// Prepends a politeness marker or a rephrase command
#[derive(Debug, Clone)]
pub struct CommandPrefix {
    bands: ProbabilityBands<PrefixEffect>,
    commands: Vec<String>,
}

impl CommandPrefix {
    /// Create a prefix stage from the two band probabilities
    pub fn new(please_probability: f64, command_probability: f64, commands: Vec<String>) -> Self {
        CommandPrefix {
            bands: ProbabilityBands::new()
                .band(please_probability, PrefixEffect::Please)
                .band(command_probability, PrefixEffect::Command),
            commands,
        }
    }

    /// Apply a decided effect; a command the prompt already starts with is not repeated
    pub fn prefix(&self, prompt: String, effect: PrefixEffect, command: &str) -> String {
        match effect {
            PrefixEffect::Please => format!("Please {}", lowercase_first(&prompt)),
            PrefixEffect::Command => {
                if prompt.to_lowercase().starts_with(&command.to_lowercase()) {
                    prompt
                } else {
                    format!("{}: {}", capitalize_word(command), lowercase_first(&prompt))
                }
            }
        }
    }
}

impl MutationStage for CommandPrefix {
    fn apply(
        &self,
        prompt: String,
        _ctx: &MutationContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<String, SampleError> {
        let Some(&effect) = self.bands.roll(rng) else {
            return Ok(prompt);
        };

        let command = match effect {
            PrefixEffect::Please => "",
            PrefixEffect::Command => match self.commands.choose(rng) {
                Some(command) => command.as_str(),
                None => return Ok(prompt),
            },
        };

        Ok(self.prefix(prompt, effect, command))
    }

    fn name(&self) -> &str {
        "command_prefix"
    }

    fn clone_box(&self) -> Box<dyn MutationStage> {
        Box::new(self.clone())
    }
}

/// Appends a clause drawn from another prompt type
#[derive(Debug, Clone)]
pub struct ClauseInjection {
    bands: ProbabilityBands<String>,
    skip_types: Vec<String>,
}

impl ClauseInjection {
    /// Create a clause stage skipping the given prompt types
    pub fn new(bands: ProbabilityBands<String>, skip_types: Vec<String>) -> Self {
        ClauseInjection { bands, skip_types }
    }
}

impl MutationStage for ClauseInjection {
    fn apply(
        &self,
        prompt: String,
        ctx: &MutationContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<String, SampleError> {
        match self.bands.roll(rng) {
            Some(clause_type) => {
                let clause = ctx.sampler.draw(clause_type, rng)?;
                Ok(format!("{} {}", prompt, clause))
            }
            None => Ok(prompt),
        }
    }

    fn name(&self) -> &str {
        "clause_injection"
    }

    fn applies_to(&self, prompt_type: &str) -> bool {
        !self.skip_types.iter().any(|skip| skip == prompt_type)
    }

    fn clone_box(&self) -> Box<dyn MutationStage> {
        Box::new(self.clone())
    }
}

/// Appends one weighted terminal mark
#[derive(Debug, Clone)]
pub struct TerminalPunctuation {
    marks: Vec<String>,
    index: WeightedIndex<u32>,
}

impl TerminalPunctuation {
    /// Create a punctuation stage from weighted marks
    pub fn new<S: Into<String>>(
        marks: impl IntoIterator<Item = (S, u32)>,
    ) -> Result<Self, SampleError> {
        let (marks, weights): (Vec<String>, Vec<u32>) = marks
            .into_iter()
            .map(|(mark, weight)| (mark.into(), weight))
            .unzip();
        let index = WeightedIndex::new(&weights)
            .map_err(|err| SampleError::InvalidWeights(format!("punctuation: {}", err)))?;

        Ok(TerminalPunctuation { marks, index })
    }

    /// Draw one mark by weight
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.marks[self.index.sample(rng)]
    }
}

impl MutationStage for TerminalPunctuation {
    fn apply(
        &self,
        mut prompt: String,
        _ctx: &MutationContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<String, SampleError> {
        prompt.push_str(self.choose(rng));
        Ok(prompt)
    }

    fn name(&self) -> &str {
        "terminal_punctuation"
    }

    fn clone_box(&self) -> Box<dyn MutationStage> {
        Box::new(self.clone())
    }
}

/// Stages applied in sequence
#[derive(Debug, Clone, Default)]
pub struct MutationPipeline {
    stages: Vec<Box<dyn MutationStage>>,
}

impl MutationPipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another stage to the end of the chain
    pub fn add<S: MutationStage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Command prefix, clause injection, then terminal punctuation
    pub fn from_config(config: &MutationConfig) -> Result<Self, PromptGenError> {
        let clauses = ProbabilityBands::new()
            .band(config.preserve_probability, config.preserve_type.clone())
            .band(
                config.keep_quality_probability,
                config.keep_quality_type.clone(),
            );

        Ok(MutationPipeline::new()
            .add(CommandPrefix::new(
                config.please_probability,
                config.command_probability,
                config.commands.clone(),
            ))
            .add(ClauseInjection::new(
                clauses,
                config.skip_clause_types.clone(),
            ))
            .add(TerminalPunctuation::new(config.punctuation.iter().cloned())?))
    }

    /// Get the stage names in order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every applicable stage in order
    pub fn mutate<R: Rng>(
        &self,
        prompt: String,
        prompt_type: &str,
        sampler: &PromptSampler,
        rng: &mut R,
    ) -> Result<String, SampleError> {
        let ctx = MutationContext {
            prompt_type,
            sampler,
        };
        let rng: &mut dyn RngCore = rng;

        let mut prompt = prompt;
        for stage in &self.stages {
            if stage.applies_to(prompt_type) {
                prompt = stage.apply(prompt, &ctx, rng)?;
            }
        }
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use crate::sampler::TemplateLibrary;
    use crate::template::{DerivationFilter, TemplateSet};
    use crate::wordbank::WordBank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn empty_sampler() -> PromptSampler {
        PromptSampler::new(TemplateLibrary::new(), WordBank::new())
    }

    fn clause_sampler() -> PromptSampler {
        let mut library = TemplateLibrary::new();
        let grammar = Grammar::compile(r#"P -> "while keeping the" "$text""#).unwrap();
        library.insert(
            "preserve_prompts",
            TemplateSet::from_grammar(&grammar, DerivationFilter::KeepAll).unwrap(),
        );
        let mut bank = WordBank::new();
        bank.insert("text", ["passage"]);
        PromptSampler::new(library, bank)
    }

    fn ctx<'a>(prompt_type: &'a str, sampler: &'a PromptSampler) -> MutationContext<'a> {
        MutationContext {
            prompt_type,
            sampler,
        }
    }

    #[test]
    fn test_probability_bands() {
        let bands = ProbabilityBands::new().band(0.05, "please").band(0.01, "command");

        assert_eq!(bands.select(0.0), Some(&"please"));
        assert_eq!(bands.select(0.049), Some(&"please"));
        assert_eq!(bands.select(0.05), Some(&"command"));
        assert_eq!(bands.select(0.0599), Some(&"command"));
        assert_eq!(bands.select(0.0601), None);
        assert_eq!(bands.select(0.99), None);
        assert!((bands.total() - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_please_prefix() {
        let stage = CommandPrefix::new(1.0, 0.0, vec!["rewrite".to_string()]);
        let sampler = empty_sampler();
        let mut rng = StdRng::seed_from_u64(1);

        let out = stage
            .apply("Make it better".to_string(), &ctx("tone_prompts", &sampler), &mut rng)
            .unwrap();
        assert_eq!(out, "Please make it better");
    }

    #[test]
    fn test_command_prefix() {
        let stage = CommandPrefix::new(0.0, 1.0, vec!["rewrite".to_string()]);
        let sampler = empty_sampler();
        let mut rng = StdRng::seed_from_u64(2);

        let out = stage
            .apply("Make it better".to_string(), &ctx("tone_prompts", &sampler), &mut rng)
            .unwrap();
        assert_eq!(out, "Rewrite: make it better");
    }

    #[test]
    fn test_command_prefix_is_not_duplicated() {
        let stage = CommandPrefix::new(0.0, 1.0, vec!["rewrite".to_string()]);
        let sampler = empty_sampler();
        let mut rng = StdRng::seed_from_u64(3);

        let out = stage
            .apply(
                "REWRITE the text above".to_string(),
                &ctx("tone_prompts", &sampler),
                &mut rng,
            )
            .unwrap();
        assert_eq!(out, "REWRITE the text above");
    }

    #[test]
    fn test_no_prefix_outside_bands() {
        let stage = CommandPrefix::new(0.0, 0.0, vec!["rewrite".to_string()]);
        let sampler = empty_sampler();
        let mut rng = StdRng::seed_from_u64(4);

        for _ in 0..50 {
            let out = stage
                .apply("Make it".to_string(), &ctx("tone_prompts", &sampler), &mut rng)
                .unwrap();
            assert_eq!(out, "Make it");
        }
    }

    #[test]
    fn test_clause_injection() {
        let stage = ClauseInjection::new(
            ProbabilityBands::new().band(1.0, "preserve_prompts".to_string()),
            vec!["other_prompts".to_string()],
        );
        let sampler = clause_sampler();
        let mut rng = StdRng::seed_from_u64(5);

        let out = stage
            .apply("Make it formal".to_string(), &ctx("tone_prompts", &sampler), &mut rng)
            .unwrap();
        assert_eq!(out, "Make it formal while keeping the passage");
        assert!(!stage.applies_to("other_prompts"));
        assert!(stage.applies_to("tone_prompts"));
    }

    #[test]
    fn test_clause_injection_propagates_unknown_type() {
        let stage = ClauseInjection::new(
            ProbabilityBands::new().band(1.0, "keep_quality_prompts".to_string()),
            Vec::new(),
        );
        let sampler = clause_sampler();
        let mut rng = StdRng::seed_from_u64(6);

        let err = stage
            .apply("Make it".to_string(), &ctx("tone_prompts", &sampler), &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            SampleError::UnknownPromptType("keep_quality_prompts".to_string())
        );
    }

    #[test]
    fn test_punctuation_distribution() {
        let stage = TerminalPunctuation::new([(".", 48), ("...", 1), ("!", 1)]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let total = 100_000;
        let (mut dot, mut ellipsis, mut bang) = (0usize, 0usize, 0usize);
        for _ in 0..total {
            match stage.choose(&mut rng) {
                "." => dot += 1,
                "..." => ellipsis += 1,
                "!" => bang += 1,
                other => panic!("unexpected mark {}", other),
            }
        }

        let share = |count: usize| count as f64 / total as f64;
        assert!((share(dot) - 0.96).abs() < 0.005);
        assert!((share(ellipsis) - 0.02).abs() < 0.003);
        assert!((share(bang) - 0.02).abs() < 0.003);
    }

    #[test]
    fn test_pipeline_order() {
        let pipeline = MutationPipeline::new()
            .add(CommandPrefix::new(1.0, 0.0, Vec::new()))
            .add(ClauseInjection::new(
                ProbabilityBands::new().band(1.0, "preserve_prompts".to_string()),
                vec!["other_prompts".to_string()],
            ))
            .add(TerminalPunctuation::new([("!", 1)]).unwrap());
        let sampler = clause_sampler();
        let mut rng = StdRng::seed_from_u64(8);

        assert_eq!(
            pipeline.stage_names(),
            ["command_prefix", "clause_injection", "terminal_punctuation"]
        );

        let out = pipeline
            .mutate("Make it formal".to_string(), "tone_prompts", &sampler, &mut rng)
            .unwrap();
        assert_eq!(out, "Please make it formal while keeping the passage!");

        let out = pipeline
            .mutate("Make it formal".to_string(), "other_prompts", &sampler, &mut rng)
            .unwrap();
        assert_eq!(out, "Please make it formal!");
    }

    #[test]
    fn test_from_config_defaults() {
        let pipeline = MutationPipeline::from_config(&MutationConfig::default()).unwrap();
        assert_eq!(pipeline.stage_names().len(), 3);
    }
}
