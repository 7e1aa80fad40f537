use clap::{Parser, Subcommand};
use prompt_gen::prompts::{BUILTIN_GRAMMARS, builtin_grammar};
use prompt_gen::{CorpusGenerator, GeneratorConfig, WordBank};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Grammar-based prompt corpus generator
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of draws before deduplication
    #[arg(long, alias = "sample_size")]
    sample_size: Option<usize>,

    /// Directory of `<category>.json` word lists
    #[arg(long, default_value = "prompt_parts")]
    parts_dir: PathBuf,

    /// Where to write the JSON corpus
    #[arg(short, long, default_value = "prompts_cfg.json")]
    output: PathBuf,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the enumerated templates of one built-in grammar
    Templates {
        /// Prompt type, e.g. tone_prompts
        prompt_type: String,

        /// Print at most this many templates
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the number of templates per built-in grammar
    Stats,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::from_json_file(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(sample_size) = cli.sample_size {
        config.sample_size = sample_size;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate()?;

    if let Some(command) = cli.command {
        match command {
            Commands::Templates { prompt_type, limit } => {
                let grammar = builtin_grammar(&prompt_type)
                    .ok_or_else(|| format!("Unknown prompt type: {}", prompt_type))?;
                let set = grammar.templates(&config.grammar_config())?;

                let limit = limit.unwrap_or(set.len());
                for (i, template) in set.templates().iter().take(limit).enumerate() {
                    println!("{}. {}", i + 1, template.text());
                }
            }
            Commands::Stats => {
                for grammar in BUILTIN_GRAMMARS {
                    let set = grammar.templates(&config.grammar_config())?;
                    println!("{:<22} {}", grammar.prompt_type, set.len());
                }
            }
        }
        return Ok(());
    }

    let word_bank = WordBank::from_dir(&cli.parts_dir)?;
    let generator = CorpusGenerator::from_config(&config, word_bank)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(sample_size = config.sample_size, "sampling prompts");
    let corpus = generator.generate(config.sample_size, &mut rng)?;
    corpus.write_json(&cli.output)?;

    println!(
        "Wrote {} unique prompts to {}",
        corpus.len(),
        cli.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_size_flag_spellings() {
        let cli = Cli::try_parse_from(["prompt-gen", "--sample-size", "500"]).unwrap();
        assert_eq!(cli.sample_size, Some(500));

        let cli = Cli::try_parse_from(["prompt-gen", "--sample_size", "700"]).unwrap();
        assert_eq!(cli.sample_size, Some(700));
    }

    #[test]
    fn test_defaults_and_subcommand() {
        let cli = Cli::try_parse_from(["prompt-gen", "templates", "tone_prompts", "--limit", "3"])
            .unwrap();
        assert_eq!(cli.parts_dir, PathBuf::from("prompt_parts"));
        assert_eq!(cli.output, PathBuf::from("prompts_cfg.json"));
        assert!(matches!(
            cli.command,
            Some(Commands::Templates { ref prompt_type, limit: Some(3) }) if prompt_type == "tone_prompts"
        ));
    }
}
