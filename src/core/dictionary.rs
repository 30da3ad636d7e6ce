// --- File: src/core/dictionary.rs
use crate::core::letters::LetterMultiset;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Index of a word inside one loaded `WordTable`.
pub type WordId = usize;

const BUNDLED_WORDS: &str = include_str!("../../data/words.txt");

/// A dictionary word together with its precomputed letter counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub letters: LetterMultiset,
}

impl WordEntry {
    pub fn len(&self) -> usize {
        self.word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }
}

// --- WordTable: the immutable result of one load ---

/// Words stored shortest-first, alphabetical within a length, so every
/// length is one contiguous slice. That order is the dictionary's iteration
/// order and keeps every first-found search reproducible.
///
/// Serialized as its word list. Deserializing goes back through
/// `from_words`, so a table read from disk is sorted and indexed no matter
/// what order the stored words were in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct WordTable {
    entries: Vec<WordEntry>,
    /// length -> [start, end) into `entries`
    by_length: BTreeMap<usize, (usize, usize)>,
    members: HashMap<String, WordId>,
}

impl From<Vec<String>> for WordTable {
    fn from(words: Vec<String>) -> Self {
        Self::from_words(words)
    }
}

impl From<WordTable> for Vec<String> {
    fn from(table: WordTable) -> Self {
        table.entries.into_iter().map(|entry| entry.word).collect()
    }
}

impl WordTable {
    /// Normalizes to uppercase, drops blanks, duplicates and anything with a
    /// character outside A-Z.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rejected = 0usize;
        let mut entries: Vec<WordEntry> = Vec::new();
        for raw in words {
            let word = raw.as_ref().trim().to_uppercase();
            if word.is_empty() {
                continue;
            }
            match LetterMultiset::from_word(&word) {
                Some(letters) => entries.push(WordEntry { word, letters }),
                None => rejected += 1,
            }
        }
        if rejected > 0 {
            debug!(rejected, "Skipped dictionary entries with non A-Z characters");
        }

        entries.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.word.cmp(&b.word)));
        entries.dedup_by(|a, b| a.word == b.word);

        let mut table = Self { entries, ..Self::default() };
        table.reindex();
        table
    }

    /// Rebuilds the lookup structures from `entries`.
    fn reindex(&mut self) {
        self.by_length.clear();
        self.members.clear();
        for (id, entry) in self.entries.iter().enumerate() {
            self.members.insert(entry.word.clone(), id);
            let span = self.by_length.entry(entry.len()).or_insert((id, id));
            span.1 = id + 1;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.members.contains_key(&word.trim().to_uppercase())
    }

    pub fn get(&self, id: WordId) -> Option<&WordEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordEntry> {
        self.entries.iter()
    }

    pub fn of_length(&self, len: usize) -> &[WordEntry] {
        match self.by_length.get(&len) {
            Some(&(start, end)) => &self.entries[start..end],
            None => &[],
        }
    }

    /// Longest words first; alphabetical within a length.
    pub fn longest_first(&self) -> impl Iterator<Item = &WordEntry> {
        self.by_length
            .values()
            .rev()
            .flat_map(move |&(start, end)| self.entries[start..end].iter())
    }

    pub fn max_len(&self) -> usize {
        self.by_length.keys().next_back().copied().unwrap_or(0)
    }
}

// --- DictionaryIndex: the live, swappable dictionary ---

/// The process-wide dictionary. Loads replace the whole table at once;
/// readers take an `Arc` snapshot and never hold the lock while searching.
#[derive(Debug, Default)]
pub struct DictionaryIndex {
    table: RwLock<Arc<WordTable>>,
}

impl DictionaryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index preloaded with the bundled English word list.
    pub fn bundled() -> Self {
        let index = Self::new();
        index.load_from_text(BUNDLED_WORDS);
        index
    }

    /// Replaces the live word set. Loading the same source twice is a no-op
    /// in effect. Returns the number of distinct words now loaded.
    pub fn load_from<I, S>(&self, words: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.install(WordTable::from_words(words))
    }

    /// Newline-delimited word list.
    pub fn load_from_text(&self, text: &str) -> usize {
        self.load_from(text.lines())
    }

    pub fn load_from_path(&self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.load_from_text(&text))
    }

    /// Swaps in a built table. Every `WordTable` is already sorted and
    /// indexed, whether it came from `from_words` or from a snapshot.
    pub fn install(&self, table: WordTable) -> usize {
        let count = table.len();
        let mut live = self.table.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *live = Arc::new(table);
        drop(live);

        if count == 0 {
            warn!("Dictionary loaded with no usable words; every cycle will be empty");
        } else {
            info!(words = count, "Dictionary loaded");
        }
        count
    }

    /// The table as of now. Later loads do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<WordTable> {
        self.table
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.snapshot().contains(word)
    }

    pub fn all(&self) -> Vec<String> {
        self.snapshot().iter().map(|e| e.word.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_normalizes_and_dedupes() {
        let index = DictionaryIndex::new();
        let count = index.load_from(["cab", "CAB", " ab ", "", "ba", "don't"]);
        assert_eq!(count, 3);
        assert!(index.contains("Cab"));
        assert!(index.contains("AB"));
        assert!(!index.contains("DONT"));
        assert_eq!(index.all(), vec!["AB", "BA", "CAB"]);
    }

    #[test]
    fn reload_is_idempotent() {
        let index = DictionaryIndex::new();
        index.load_from_text("star\nrats\narts\n");
        let first: Vec<bool> = ["STAR", "TSAR", "ARTS"].iter().map(|w| index.contains(w)).collect();
        index.load_from_text("star\nrats\narts\n");
        let second: Vec<bool> = ["STAR", "TSAR", "ARTS"].iter().map(|w| index.contains(w)).collect();
        assert_eq!(first, second);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn load_replaces_previous_words() {
        let index = DictionaryIndex::new();
        index.load_from(["ONE"]);
        let before = index.snapshot();
        index.load_from(["TWO"]);
        assert!(!index.contains("ONE"));
        assert!(index.contains("TWO"));
        assert!(before.contains("ONE"));
    }

    #[test]
    fn length_buckets_are_contiguous() {
        let table = WordTable::from_words(["CART", "A", "CAR", "ART", "ARC", "AT"]);
        assert_eq!(table.max_len(), 4);
        let threes: Vec<&str> = table.of_length(3).iter().map(|e| e.word.as_str()).collect();
        assert_eq!(threes, vec!["ARC", "ART", "CAR"]);
        assert!(table.of_length(7).is_empty());

        let order: Vec<&str> = table.longest_first().map(|e| e.word.as_str()).collect();
        assert_eq!(order, vec!["CART", "ARC", "ART", "CAR", "AT", "A"]);
    }

    #[test]
    fn deserialized_table_is_sorted_and_indexed() {
        let stored = vec!["STAR".to_string(), "a".to_string(), "ART".to_string(), "STAR".to_string()];
        let bytes = bincode::serialize(&stored).unwrap();
        let table: WordTable = bincode::deserialize(&bytes).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.contains("star"));
        assert!(table.contains("A"));
        let order: Vec<&str> = table.longest_first().map(|e| e.word.as_str()).collect();
        assert_eq!(order, vec!["STAR", "ART", "A"]);
        assert_eq!(table.of_length(3).len(), 1);
    }

    #[test]
    fn bundled_list_is_usable() {
        let index = DictionaryIndex::bundled();
        assert!(index.len() > 500);
        assert!(index.contains("star"));
    }
}
