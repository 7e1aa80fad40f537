use prompt_gen::{DerivationFilter, Grammar, PromptSampler, TemplateLibrary, TemplateSet, WordBank};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;

/// Enumerate a hand-written grammar and resolve a few of its templates
fn main() -> Result<(), Box<dyn Error>> {
    let grammar = Grammar::compile(
        r#"
        # polite requests about a document
        SENTENCE -> VERB TT "for" AUDIENCE | VERB TT
        VERB -> "simplify" | "explain" | "proofread"
        TT -> "this $text" | "it"
        AUDIENCE -> "a child" | "$audience"
        "#,
    )?;

    let derivations = grammar.enumerate()?;
    println!("{} derivations:", derivations.len());

    let templates = TemplateSet::from_derivations(&derivations, DerivationFilter::KeepAll)?;
    for (i, template) in templates.templates().iter().enumerate() {
        println!("{}. {}", i + 1, template.text());
    }

    let mut library = TemplateLibrary::new();
    library.insert("request_prompts", templates);

    let mut bank = WordBank::new();
    bank.insert("text", ["letter", "report"]);
    bank.insert("audience", ["a lawyer", "my grandmother"]);

    let sampler = PromptSampler::new(library, bank);
    sampler.check_bindings()?;

    let mut rng = StdRng::seed_from_u64(7);
    println!("\nResolved prompts:");
    for i in 1..=5 {
        println!("{}. {}", i, sampler.draw("request_prompts", &mut rng)?);
    }

    Ok(())
}
