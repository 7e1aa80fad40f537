//! Benchmarks for grammar enumeration and prompt drawing.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use prompt_gen::prompts::{BUILTIN_GRAMMARS, builtin_library, install_default_categories};
use prompt_gen::{GrammarConfig, PromptSampler, WordBank};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn bench_enumerate(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumerate");
    let config = GrammarConfig::default();

    for grammar in BUILTIN_GRAMMARS {
        let compiled = grammar.compile(&config).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(grammar.prompt_type),
            &compiled,
            |b, compiled| b.iter(|| black_box(compiled.enumerate().unwrap())),
        );
    }

    group.finish();
}

fn bench_draw(c: &mut Criterion) {
    let library = builtin_library(&GrammarConfig::default()).unwrap();
    let mut bank = WordBank::new();
    for name in [
        "mostly_fictional",
        "other_media",
        "authors",
        "tone",
        "to_inject",
        "nouns",
        "themes",
        "to_replace",
        "things",
        "code",
        "qualities",
        "accents",
    ] {
        bank.insert(name, [format!("{} one", name), format!("{} two", name)]);
    }
    install_default_categories(&mut bank);

    let sampler = PromptSampler::new(library, bank);
    let mut rng = StdRng::seed_from_u64(42);

    c.bench_function("draw_inject_prompt", |b| {
        b.iter(|| black_box(sampler.draw("inject_prompts", &mut rng).unwrap()))
    });
}

criterion_group!(benches, bench_enumerate, bench_draw);
criterion_main!(benches);
