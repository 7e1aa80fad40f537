//! Built-in prompt grammars, weights and word lists.

use tracing::{debug, info};

use crate::grammar::{Grammar, GrammarConfig};
use crate::sampler::TemplateLibrary;
use crate::template::{DerivationFilter, TemplateSet};
use crate::utils::Result;
use crate::wordbank::WordBank;

pub const FICTION_PROMPTS: &str = "fiction_prompts";
pub const NEW_MEDIUM_PROMPTS: &str = "new_medium_prompts";
pub const AUTHOR_PROMPTS: &str = "author_prompts";
pub const TONE_PROMPTS: &str = "tone_prompts";
pub const INJECT_PROMPTS: &str = "inject_prompts";
pub const REPLACE_PROMPTS: &str = "replace_prompts";
pub const SUMMARY_PROMPTS: &str = "summary_prompts";
pub const CODE_PROMPTS: &str = "code_prompts";
pub const QUALITY_PROMPTS: &str = "quality_prompts";
pub const ACCENT_PROMPTS: &str = "accent_prompts";
pub const PRESERVE_PROMPTS: &str = "preserve_prompts";
pub const KEEP_QUALITY_PROMPTS: &str = "keep_quality_prompts";

/// Prompt type exempt from clause injection
pub const OTHER_PROMPTS: &str = "other_prompts";

/// Rephrase commands, used both as the `rephrase_1` category and as prefixes
pub const REPHRASE_COMMANDS: &[&str] = &[
    "reformulate",
    "rewrite",
    "reimagine",
    "recreate",
    "rephrase",
    "paraphrase",
    "update",
];

pub const TEXT_NOUNS: &[&str] = &["text", "article", "passage", "piece of text"];

/// Selection weights of the directly sampled types
pub const DEFAULT_WEIGHTS: &[(&str, u32)] = &[
    (TONE_PROMPTS, 45),
    (INJECT_PROMPTS, 20),
    (REPLACE_PROMPTS, 20),
    (SUMMARY_PROMPTS, 5),
    (CODE_PROMPTS, 5),
    (QUALITY_PROMPTS, 18),
    (FICTION_PROMPTS, 20),
    (NEW_MEDIUM_PROMPTS, 80),
    (AUTHOR_PROMPTS, 14),
    (ACCENT_PROMPTS, 15),
];

const FICTION_GRAMMAR: &str = r#"
SENTENCE -> CONV
CONV -> CONVI | CONVA
CONVI -> CWI TT INTO CONVTEXT
CONVA -> CWA TT AS CONVTEXT
AS -> "as" | "in the style of" | "using the tone and structure of" | "as if it were"
INTO -> "to" | "into"
TT -> "this $text" | "this" | "it" | "the $text above" | "the $text"
CWI -> "convert" | "transform" | "make" | "turn" | "remake"
CWA -> "express" | "present" | "$rephrase_1"
CONVTEXT -> "$mostly_fictional"
"#;

const NEW_MEDIUM_GRAMMAR: &str = r#"
SENTENCE -> CONV
CONV -> CONVI | CONVA
CONVI -> CWI TT INTO CONVTEXT
CONVA -> CWA TT AS CONVTEXT
AS -> "as" | "in the style of" | "using the tone and structure of" | "as if it were"
INTO -> "to" | "into"
TT -> "this $text" | "this" | "it" | "the $text above" | "the $text" | "the above $text"
CWI -> "convert" | "transform" | "make" | "turn" | "remake"
CWA -> "express" | "present" | "$rephrase_1"
CONVTEXT -> "$other_media"
"#;

const AUTHOR_GRAMMAR: &str = r#"
SENTENCE -> CONVA | CONVB | CONVC

CONVA -> CWA TT WITH "the" STYLE "of" AUTHOR
CONVB -> CWA TT AS AUTHOR
CONVC -> CWA TT AS AUTHOR "'s" STYLE

AS -> "as if it was written by" | "copying" | "in a way that imitates" | "as a tribute to" | "mimicking"
WITH -> "with" | "borrowing" | "imitating" | "copying" | "in a way inspired by"
STYLE -> "writing style" | "prose" | "authoring technique" | "writing technique" | "writing"
TT -> "this $text" | "this" | "it" | "the $text above" | "the $text" | "the above $text"
CWA -> "$rephrase_1"
AUTHOR -> "$authors"
"#;

const TONE_GRAMMAR: &str = r#"
SENTENCE -> CONV
CONV -> CONVM | CONVR
CONVM -> CWM TT ADV
CONVR -> CWR TT ADV_MANNER
ADV -> ADV_MAIN TONE
ADV_SUP -> "a bit" | "slightly" | ""
ADV_MAIN -> ADV_SUP ADV_DIRECTION
ADV_DIRECTION -> "more" | "less"
TONE -> "$tone"
TT -> "this $text" | "this" | "it" | "the $text above" | "the $text"
CWM -> "make"
CWR -> "reformulate" | "rewrite" | "express" | "present" | "recreate" | "articulate" | "re-generate" | "reconstruct" | "rephrase"
TONE_WORD -> "tone" | "manner" | "style" | "way" | "fashion" | "approach"
ADV_MANNER -> "in a" TONE TONE_WORD
"#;

const INJECT_GRAMMAR: &str = r#"
SENTENCE -> CONVI | CONVR
CONVI -> CONVINJ | CONVADD
CONVINJ -> CWI INJECT INTO TT
CONVADD -> CWA INJECT "to" TT
CONVR -> CWR TT "with" INJECT ADDED

TT -> "this $text" | "this" | "it" | "the $text above" | "the $text" | "the above $text"
CWI -> "inject" | "incorporate" | "insert" | "instill"
CWA -> "add" | "append"
CWR -> "reformulate" | "rewrite" | "present" | "recreate" | "re-generate" | "reconstruct" | "rephrase" | "remake"
INJECT -> "$to_inject" | THEWORD "`$nouns`" | THETHEME
THETHEME -> "the theme of $themes" | "$themes" | "themes of $themes"
THEWORD -> "the word" | "the noun"
INTO -> "inside" | "in" | "into" | "to"
ADDED -> "added" | "injected to it" | "inserted" | "attached" | "imbued to it" | "shoehorned into it" | "forced into it" | "taking the center" | "being featured"
"#;

const REPLACE_GRAMMAR: &str = r#"
SENTENCE -> CONV | REP
REP -> CWR EVERY TO_REPLACE "in" TT WITH SOMETHING
CONV -> CWC EVERY TO_REPLACE "in" TT INTO SOMETHING
CWR -> "replace" | "substitute" | "swap" | "exchange"
CWC -> "convert" | "transform"
EVERY -> "every"
TO_REPLACE -> "$to_replace"
SOMETHING -> THING | THEWORD "`$nouns`"
THEWORD -> "the word" | "the noun"
THING -> "$things"
TT -> "this $text" | "this" | "it" | "the $text above" | "the $text" | "the above $text"
WITH -> "with"
INTO -> "into" | "to"
"#;

const SUMMARY_GRAMMAR: &str = r#"
SENTENCE -> SUM
SUM -> CWS TT
CWS -> "summarize" | "shorten" | "condense" | "sum up" | MS
MS -> MAKE "a summary of"
MAKE -> "make" | "create" | "write" | "generate" | "give me"
TT -> "this $text" | "this" | "it" | "the $text above" | "the $text" | "the above $text"
"#;

const CODE_GRAMMAR: &str = r#"
SENTENCE -> TRANS | REF1 | REF2
TRANS -> CWT TT TO CODE
REF1 -> CWR TT AS "a" CODE FILE
REF2 -> CWR TT IN CODE
CWT -> "transform" | "translate" | "convert"
CWR -> "rewrite" | "reformat" | "reconstruct" | "re-generate"
TT -> "this $text" | "this" | "it" | "the $text above" | "the $text" | "the above $text"
TO -> "to"
IN -> "in"
AS -> "as"
FILE -> "snippet" | "file"
CODE -> "$code"
"#;

const QUALITY_GRAMMAR: &str = r#"
SENTENCE -> CONV | CONV2
CONV -> CWI TT QUALITY
CONV2 -> CWI TT QUALITY "and" QUALITY
TT -> "this $text" | "this" | "it" | "the $text above" | "the $text" | "the above $text"
CWI -> "make"
QUALITY -> "$qualities"
"#;

const ACCENT_GRAMMAR: &str = r#"
SENTENCE -> CONV1
CONV1 -> CWR TT IN ACCENT_NAME
IN -> "in"
TT -> "this $text" | "this" | "it" | "the $text above" | "the $text" | "the above $text"
CWR -> "reformulate" | "rewrite" | "express" | "present" | "recreate" | "articulate" | "re-generate" | "reconstruct" | "rephrase" | "translate"
ACCENT_NAME -> "$accents"
"#;

const PRESERVE_GRAMMAR: &str = r#"
PHRASE -> P1 | P2
P1 -> WHILE PRESERVING "the" CORE "of" "the" ORIG "$text"
P2 -> WHILE PRESERVING "the" TRUE IDEA BEHIND "the" ORIG "$text"
WHILE -> "while"
BEHIND -> "of" | "behind"
PRESERVING -> "preserving" | "retaining" | "remaining faithful to" | "respecting" | "keeping" | "upholding" | "staying true to" | "sticking to"
TRUE -> "raw" | "core" | "original" | "true" | "primary" | "fundamental"
IDEA -> "idea" | "meaning" | "context" | "message"
CORE -> "meaning" | "core" | "spirit" | "true meaning" | "authenticity" | "core idea" | "actual content" | "core content" | "essence"
ORIG -> "original" | "initial" | "actual" | "given" | "transformed"
"#;

const KEEP_QUALITY_GRAMMAR: &str = r#"
PHRASE -> P1
P1 -> WHILE VERBING QUALITY "of the" ORIG "$text"
WHILE -> "while" | "meanwhile" | "while at the same time"
VERBING -> PRESERVING | IMPROVING
PRESERVING -> "preserving" | "retaining" | "respecting" | "keeping" | "upholding" | "protecting"
IMPROVING -> "improving" | "enhancing"
QUALITY -> "the quality" | "the overall quality" | "the stylistic quality" | "the logic and consistency" | "the coherence" | "the integrity"
ORIG -> "original" | "initial" | "actual" | "given" | "transformed"
"#;

/// A built-in grammar and how its derivations become templates
#[derive(Debug, Clone, Copy)]
pub struct PromptGrammar {
    pub prompt_type: &'static str,
    pub source: &'static str,
    pub filter: DerivationFilter,
}

/// Every built-in grammar, keyed by prompt type
pub const BUILTIN_GRAMMARS: &[PromptGrammar] = &[
    PromptGrammar {
        prompt_type: FICTION_PROMPTS,
        source: FICTION_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: NEW_MEDIUM_PROMPTS,
        source: NEW_MEDIUM_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: AUTHOR_PROMPTS,
        source: AUTHOR_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: TONE_PROMPTS,
        source: TONE_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: INJECT_PROMPTS,
        source: INJECT_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: REPLACE_PROMPTS,
        source: REPLACE_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: SUMMARY_PROMPTS,
        source: SUMMARY_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: CODE_PROMPTS,
        source: CODE_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: QUALITY_PROMPTS,
        source: QUALITY_GRAMMAR,
        filter: DerivationFilter::RejectRepeatedSlots,
    },
    PromptGrammar {
        prompt_type: ACCENT_PROMPTS,
        source: ACCENT_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: PRESERVE_PROMPTS,
        source: PRESERVE_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
    PromptGrammar {
        prompt_type: KEEP_QUALITY_PROMPTS,
        source: KEEP_QUALITY_GRAMMAR,
        filter: DerivationFilter::KeepAll,
    },
];

/// Look up a built-in grammar by prompt type
pub fn builtin_grammar(prompt_type: &str) -> Option<&'static PromptGrammar> {
    BUILTIN_GRAMMARS
        .iter()
        .find(|grammar| grammar.prompt_type == prompt_type)
}

impl PromptGrammar {
    /// Compile this grammar with the given limits
    pub fn compile(&self, config: &GrammarConfig) -> Result<Grammar> {
        Ok(Grammar::compile_with_config(self.source, config.clone())?)
    }

    /// Compile, enumerate and join this grammar
    pub fn templates(&self, config: &GrammarConfig) -> Result<TemplateSet> {
        let grammar = self.compile(config)?;
        let set = TemplateSet::from_grammar(&grammar, self.filter)?;
        debug!(
            prompt_type = self.prompt_type,
            templates = set.len(),
            "built templates"
        );
        Ok(set)
    }
}

/// Compile and enumerate every built-in grammar
pub fn builtin_library(config: &GrammarConfig) -> Result<TemplateLibrary> {
    let mut library = TemplateLibrary::new();
    for grammar in BUILTIN_GRAMMARS {
        library.insert(grammar.prompt_type, grammar.templates(config)?);
    }

    info!(types = library.len(), "enumerated built-in grammars");
    Ok(library)
}

/// Add the categories the built-in grammars expect beyond the loaded files
pub fn install_default_categories(bank: &mut WordBank) {
    bank.insert_default("rephrase_1", REPHRASE_COMMANDS.iter().copied());
    bank.insert_default("text", TEXT_NOUNS.iter().copied());
    bank.derive("nouns", &["nouns_catchy", "nouns_mathy", "nouns_everyday"]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_builtin_grammar_enumerates() {
        let config = GrammarConfig::default();
        for grammar in BUILTIN_GRAMMARS {
            let set = grammar.templates(&config).unwrap();
            assert!(!set.is_empty(), "{} has no templates", grammar.prompt_type);
        }
    }

    #[test]
    fn test_summary_templates_are_complete() {
        let set = builtin_grammar(SUMMARY_PROMPTS)
            .unwrap()
            .templates(&GrammarConfig::default())
            .unwrap();

        // (4 verbs + 5 "make a summary of" forms) x 6 targets
        assert_eq!(set.len(), 54);
        let texts: HashSet<&str> = set.templates().iter().map(|t| t.text()).collect();
        assert!(texts.contains("summarize this $text"));
        assert!(texts.contains("give me a summary of the above $text"));
    }

    #[test]
    fn test_quality_templates_skip_repeated_qualities() {
        let set = builtin_grammar(QUALITY_PROMPTS)
            .unwrap()
            .templates(&GrammarConfig::default())
            .unwrap();

        assert_eq!(set.len(), 6);
        assert!(set.templates().iter().all(|t| !t.text().contains(" and ")));
    }

    #[test]
    fn test_inject_templates_quote_nouns() {
        let set = builtin_grammar(INJECT_PROMPTS)
            .unwrap()
            .templates(&GrammarConfig::default())
            .unwrap();

        let texts: HashSet<&str> = set.templates().iter().map(|t| t.text()).collect();
        assert!(texts.contains("inject the word \"$nouns\" into it"));
        assert!(texts.iter().all(|t| !t.contains('`')));
    }

    #[test]
    fn test_tone_templates_handle_empty_terminal() {
        let set = builtin_grammar(TONE_PROMPTS)
            .unwrap()
            .templates(&GrammarConfig::default())
            .unwrap();

        let texts: HashSet<&str> = set.templates().iter().map(|t| t.text()).collect();
        assert!(texts.contains("make it more $tone"));
        assert!(texts.contains("make it a bit less $tone"));
        assert!(texts.contains("rewrite this in a $tone manner"));
    }

    #[test]
    fn test_author_possessive_has_no_space() {
        let set = builtin_grammar(AUTHOR_PROMPTS)
            .unwrap()
            .templates(&GrammarConfig::default())
            .unwrap();

        assert!(
            set.templates()
                .iter()
                .any(|t| t.text() == "$rephrase_1 it copying $authors's prose")
        );
    }

    #[test]
    fn test_default_categories() {
        let mut bank = WordBank::new();
        bank.insert("nouns_everyday", ["spoon"]);
        bank.insert("text", ["essay"]);
        install_default_categories(&mut bank);

        assert_eq!(bank.get("rephrase_1").unwrap().len(), REPHRASE_COMMANDS.len());
        assert_eq!(bank.get("text").unwrap(), ["essay"]);
        assert_eq!(bank.get("nouns").unwrap(), ["spoon"]);
    }

    #[test]
    fn test_default_weights_reference_builtin_types() {
        for (prompt_type, _) in DEFAULT_WEIGHTS {
            assert!(builtin_grammar(prompt_type).is_some());
        }
    }
}
