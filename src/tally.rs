// File: src/tally.rs
use crate::core::types::{SourceType, TaggedWord};
use std::collections::HashMap;

/// Counts how often each word turned up across a cycle's sequences and
/// applies the noise rule: keep a word seen at least `min_repeat` times,
/// or seen once and at least `min_single_len` letters long.
pub struct WordTally {
    min_repeat: u32,
    min_single_len: usize,
}

impl Default for WordTally {
    fn default() -> Self {
        Self::new(2, 4)
    }
}

impl WordTally {
    pub fn new(min_repeat: u32, min_single_len: usize) -> Self {
        Self { min_repeat, min_single_len }
    }

    /// One match list per strand in, unique surviving words out, each with
    /// its frequency. First-seen order is kept.
    pub fn tally_strands(&self, per_strand: &[Vec<String>]) -> Vec<(TaggedWord, u32)> {
        let tagged = per_strand
            .iter()
            .flatten()
            .map(|word| TaggedWord::primary(word.clone(), SourceType::Strand, 0));
        count_unique(tagged)
            .into_iter()
            .filter(|(tagged, frequency)| self.keeps(&tagged.word, *frequency))
            .collect()
    }

    /// Dedupes a tagged hierarchy by word text without filtering. The first
    /// occurrence (primaries come first) keeps its tags.
    pub fn tally_tagged(&self, words: Vec<TaggedWord>) -> Vec<(TaggedWord, u32)> {
        count_unique(words)
    }

    fn keeps(&self, word: &str, frequency: u32) -> bool {
        frequency >= self.min_repeat || (frequency == 1 && word.len() >= self.min_single_len)
    }
}

fn count_unique(words: impl IntoIterator<Item = TaggedWord>) -> Vec<(TaggedWord, u32)> {
    let mut order: Vec<(TaggedWord, u32)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for tagged in words {
        match positions.get(&tagged.word) {
            Some(&at) => order[at].1 += 1,
            None => {
                positions.insert(tagged.word.clone(), order.len());
                order.push((tagged, 1));
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn short_words_need_a_repeat() {
        let per_strand = vec![
            words(&["STAR", "RAT", "AT"]),
            words(&["RAT", "TO"]),
            words(&["STONE"]),
        ];
        let kept: Vec<(String, u32)> = WordTally::default()
            .tally_strands(&per_strand)
            .into_iter()
            .map(|(t, f)| (t.word, f))
            .collect();
        assert_eq!(
            kept,
            vec![("STAR".to_string(), 1), ("RAT".to_string(), 2), ("STONE".to_string(), 1)]
        );
    }

    #[test]
    fn tagged_dedupe_keeps_first_tags() {
        let primary = TaggedWord::primary("CART", SourceType::Row, 1);
        let derived = primary.derive("ART").unwrap();
        let again = TaggedWord::primary("ART", SourceType::Column, 4);
        let counted = WordTally::default().tally_tagged(vec![primary, derived.clone(), again]);
        assert_eq!(counted.len(), 2);
        assert_eq!(counted[1].0, derived);
        assert_eq!(counted[1].1, 2);
    }

    #[test]
    fn nothing_in_nothing_out() {
        assert!(WordTally::default().tally_strands(&[]).is_empty());
        assert!(WordTally::default().tally_strands(&[vec![], vec![]]).is_empty());
    }
}
