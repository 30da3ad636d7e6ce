// File: src/core/deriver.rs
use crate::core::dictionary::WordTable;
use crate::core::letters::LetterMultiset;
use crate::core::types::TaggedWord;
use tracing::debug;

/// Derives shorter words from the letters of an already found word.
///
/// "Next longest, first found": lengths are tried from `parent.len() - 1`
/// down to 1 and, within a length, words are taken in dictionary order.
/// Derivation only ever sees the parent's letters, never the source strand.
#[derive(Debug, Clone)]
pub struct HierarchicalWordDeriver {
    secondary_limit: usize,
}

impl Default for HierarchicalWordDeriver {
    fn default() -> Self {
        Self::new(2)
    }
}

impl HierarchicalWordDeriver {
    pub fn new(secondary_limit: usize) -> Self {
        Self { secondary_limit }
    }

    /// Up to `secondary_limit` words formable from `primary`'s letters.
    pub fn derive_secondary(&self, table: &WordTable, primary: &str) -> Vec<String> {
        derive_from(table, primary, self.secondary_limit)
    }

    /// At most one word formable from `secondary`'s letters.
    pub fn derive_tertiary(&self, table: &WordTable, secondary: &str) -> Option<String> {
        derive_from(table, secondary, 1).into_iter().next()
    }

    /// Secondary words for every primary, then one tertiary per secondary.
    /// Empty input gives empty output.
    pub fn expand(
        &self,
        table: &WordTable,
        primaries: &[TaggedWord],
    ) -> (Vec<TaggedWord>, Vec<TaggedWord>) {
        let secondaries: Vec<TaggedWord> = primaries
            .iter()
            .flat_map(|primary| {
                self.derive_secondary(table, &primary.word)
                    .into_iter()
                    .filter_map(move |word| primary.derive(word))
            })
            .collect();

        let tertiaries: Vec<TaggedWord> = secondaries
            .iter()
            .filter_map(|secondary| {
                self.derive_tertiary(table, &secondary.word)
                    .and_then(|word| secondary.derive(word))
            })
            .collect();

        debug!(
            primary = primaries.len(),
            secondary = secondaries.len(),
            tertiary = tertiaries.len(),
            "Derived word hierarchy"
        );
        (secondaries, tertiaries)
    }
}

fn derive_from(table: &WordTable, parent: &str, limit: usize) -> Vec<String> {
    let parent = parent.trim().to_uppercase();
    let letters = match LetterMultiset::from_word(&parent) {
        Some(letters) if !letters.is_empty() => letters,
        _ => return Vec::new(),
    };

    let mut found: Vec<String> = Vec::new();
    for len in (1..parent.len()).rev() {
        for entry in table.of_length(len) {
            if found.len() >= limit {
                return found;
            }
            if entry.word == parent || found.contains(&entry.word) {
                continue;
            }
            if letters.contains(&entry.letters) {
                found.push(entry.word.clone());
            }
        }
    }
    found
}
