use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::utils::{Result, SampleError};

/// Read-only mapping from category name to candidate strings
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    categories: HashMap<String, Vec<String>>,
}

impl WordBank {
    /// Create an empty word bank
    pub fn new() -> Self {
        WordBank {
            categories: HashMap::new(),
        }
    }

    /// Load every `<category>.json` file in `dir`; each must hold a JSON array of strings
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut bank = WordBank::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            let words: Vec<String> = serde_json::from_str(&content)?;
            if words.is_empty() {
                warn!(category = name, "category file is empty");
            }
            debug!(category = name, words = words.len(), "loaded category");
            bank.insert(name, words);
        }

        info!(
            dir = %dir.display(),
            categories = bank.len(),
            "loaded word bank"
        );
        Ok(bank)
    }

    /// Add or replace a category
    pub fn insert<S: Into<String>>(&mut self, name: &str, words: impl IntoIterator<Item = S>) {
        self.categories.insert(
            name.to_string(),
            words.into_iter().map(Into::into).collect(),
        );
    }

    /// Add a category only if it does not exist yet
    pub fn insert_default<S: Into<String>>(
        &mut self,
        name: &str,
        words: impl IntoIterator<Item = S>,
    ) {
        if !self.contains(name) {
            self.insert(name, words);
        }
    }

    /// Build `name` by concatenating `sources` in order.
    ///
    /// Missing sources are skipped. Nothing is derived when `name` already
    /// exists or none of the sources do. Returns whether a category was added.
    pub fn derive(&mut self, name: &str, sources: &[&str]) -> bool {
        if self.contains(name) {
            return false;
        }

        let present: Vec<&Vec<String>> = sources
            .iter()
            .filter_map(|source| self.categories.get(*source))
            .collect();
        if present.is_empty() {
            return false;
        }

        let words: Vec<String> = present.into_iter().flatten().cloned().collect();
        self.categories.insert(name.to_string(), words);
        true
    }

    /// Get the words of a category
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.categories.get(name).map(Vec::as_slice)
    }

    /// Check if a category exists
    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Category names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.categories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Check if the word bank is empty
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Draw one candidate uniformly from a category.
    ///
    /// A missing category is reported as [`SampleError::UnknownCategory`]
    /// with an empty template; callers that know the template fill it in.
    pub fn choose<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Result<&str, SampleError> {
        let words = self
            .categories
            .get(name)
            .ok_or_else(|| SampleError::UnknownCategory {
                placeholder: name.to_string(),
                template: String::new(),
            })?;

        words
            .choose(rng)
            .map(String::as_str)
            .ok_or_else(|| SampleError::EmptyCategory(name.to_string()))
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for WordBank {
    fn from_iter<I: IntoIterator<Item = (S, Vec<String>)>>(iter: I) -> Self {
        WordBank {
            categories: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_insert_and_choose() {
        let mut bank = WordBank::new();
        bank.insert("tone", ["formal", "casual"]);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let word = bank.choose("tone", &mut rng).unwrap();
            assert!(word == "formal" || word == "casual");
        }
    }

    #[test]
    fn test_choose_errors() {
        let mut bank = WordBank::new();
        bank.insert::<&str>("empty", []);
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(
            bank.choose("empty", &mut rng).unwrap_err(),
            SampleError::EmptyCategory("empty".to_string())
        );
        assert!(matches!(
            bank.choose("missing", &mut rng),
            Err(SampleError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_derive() {
        let mut bank = WordBank::new();
        bank.insert("nouns_catchy", ["banana"]);
        bank.insert("nouns_mathy", ["vector", "ring"]);

        assert!(bank.derive("nouns", &["nouns_catchy", "nouns_mathy", "nouns_everyday"]));
        assert_eq!(bank.get("nouns").unwrap(), ["banana", "vector", "ring"]);

        assert!(!bank.derive("nouns", &["nouns_mathy"]));
        assert!(!bank.derive("others", &["missing"]));
        assert!(!bank.contains("others"));
    }

    #[test]
    fn test_insert_default_keeps_existing() {
        let mut bank = WordBank::new();
        bank.insert("text", ["essay"]);
        bank.insert_default("text", ["text", "article"]);
        assert_eq!(bank.get("text").unwrap(), ["essay"]);
    }
}
