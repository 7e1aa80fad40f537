use prompt_gen::{CorpusGenerator, GeneratorConfig, WordBank};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;

/// Generate a small corpus from the built-in grammars with an in-memory word bank
fn main() -> Result<(), Box<dyn Error>> {
    let mut bank = WordBank::new();
    bank.insert("mostly_fictional", ["a fairy tale", "a ghost story"]);
    bank.insert("other_media", ["a tweet", "a haiku", "a screenplay"]);
    bank.insert("authors", ["Jane Austen", "Ernest Hemingway"]);
    bank.insert("tone", ["formal", "sarcastic", "cheerful"]);
    bank.insert("to_inject", ["a plot twist", "some humor"]);
    bank.insert("nouns_catchy", ["banana", "volcano"]);
    bank.insert("themes", ["betrayal", "friendship"]);
    bank.insert("to_replace", ["noun", "adjective"]);
    bank.insert("things", ["a pirate term", "a fruit"]);
    bank.insert("code", ["Python", "YAML"]);
    bank.insert("qualities", ["clearer", "more concise"]);
    bank.insert("accents", ["a Scottish accent", "Cockney slang"]);

    let config = GeneratorConfig {
        sample_size: 20,
        seed: Some(2024),
        ..GeneratorConfig::default()
    };
    let generator = CorpusGenerator::from_config(&config, bank)?;

    let mut rng = StdRng::seed_from_u64(2024);
    let corpus = generator.generate(config.sample_size, &mut rng)?;

    println!("Generated {} unique prompts:", corpus.len());
    for (i, prompt) in corpus.prompts().iter().enumerate() {
        println!("{}. {}", i + 1, prompt);
    }

    Ok(())
}
