// File: src/core/matcher.rs
use crate::core::dictionary::WordTable;
use crate::core::letters::{Letter, LetterMultiset, Strand};
use tracing::debug;

/// True iff `word` can be spelled from `letters`, each letter used at most as
/// often as it occurs. Every search below is built on this check.
pub fn can_form(word: &str, letters: &LetterMultiset) -> bool {
    match LetterMultiset::from_word(word) {
        Some(needed) => letters.contains(&needed),
        None => false,
    }
}

/// Finds dictionary words formable from a bag of letters.
#[derive(Debug, Clone)]
pub struct WordMatcher {
    /// Stop collecting greedy candidates after this many matches.
    candidate_cap: Option<usize>,
}

impl Default for WordMatcher {
    fn default() -> Self {
        Self::new(Some(50))
    }
}

impl WordMatcher {
    pub fn new(candidate_cap: Option<usize>) -> Self {
        Self { candidate_cap }
    }

    /// Every word formable from the strand. Matches may share letters; this
    /// reports what is possible, not a disjoint cover.
    /// Ordered by length descending, then alphabetically.
    pub fn find_all_words(&self, table: &WordTable, strand: &Strand) -> Vec<String> {
        self.find_all_in(table, &strand.multiset())
    }

    pub fn find_all_in(&self, table: &WordTable, letters: &LetterMultiset) -> Vec<String> {
        if letters.is_empty() {
            return Vec::new();
        }
        // longest_first() already yields (length desc, alphabetical)
        table
            .longest_first()
            .filter(|entry| letters.contains(&entry.letters))
            .map(|entry| entry.word.clone())
            .collect()
    }

    /// Same search as `find_all_words`, yielding to the scheduler every
    /// `yield_every` dictionary entries so a large table cannot starve it.
    pub async fn find_all_words_yielding(
        &self,
        table: &WordTable,
        strand: &Strand,
        yield_every: usize,
    ) -> Vec<String> {
        let letters = strand.multiset();
        if letters.is_empty() {
            return Vec::new();
        }
        let yield_every = yield_every.max(1);
        let mut found = Vec::new();
        for (checked, entry) in table.longest_first().enumerate() {
            if checked > 0 && checked % yield_every == 0 {
                tokio::task::yield_now().await;
            }
            if letters.contains(&entry.letters) {
                found.push(entry.word.clone());
            }
        }
        found
    }

    /// Up to `max_words` words that can all be spelled at once from disjoint
    /// portions of `letters`.
    ///
    /// Candidates are scanned longest first (alphabetical within a length) and
    /// capped; each is accepted iff it still fits in what the previously
    /// accepted words left over. Greedy, not an optimal cover.
    pub fn find_independent_words(
        &self,
        table: &WordTable,
        letters: &[Letter],
        max_words: usize,
    ) -> Vec<String> {
        if letters.is_empty() || max_words == 0 {
            return Vec::new();
        }
        let pool = LetterMultiset::from_letters(letters);

        let cap = self.candidate_cap.unwrap_or(usize::MAX);
        let candidates: Vec<_> = table
            .longest_first()
            .filter(|entry| pool.contains(&entry.letters))
            .take(cap)
            .collect();

        let mut remaining = pool;
        let mut selected = Vec::new();
        for entry in candidates.iter() {
            if selected.len() >= max_words {
                break;
            }
            if remaining.try_consume(&entry.letters) {
                selected.push(entry.word.clone());
            }
        }

        debug!(
            candidates = candidates.len(),
            selected = selected.len(),
            "Greedy independent word selection"
        );
        selected
    }
}
