//! Property-based tests for matching, derivation and scoring.

use oracle_core::core::deriver::HierarchicalWordDeriver;
use oracle_core::core::dictionary::WordTable;
use oracle_core::core::letters::{Letter, LetterMultiset, Strand};
use oracle_core::core::matcher::{can_form, WordMatcher};
use oracle_core::oracle::bits::RandomBitSource;
use oracle_core::oracle::entropy::SeededEntropy;
use oracle_core::oracle::scorer::SignificanceScorer;
use oracle_core::DictionaryIndex;
use proptest::prelude::*;
use std::sync::{Arc, OnceLock};

fn bundled() -> Arc<WordTable> {
    static TABLE: OnceLock<Arc<WordTable>> = OnceLock::new();
    TABLE
        .get_or_init(|| DictionaryIndex::bundled().snapshot())
        .clone()
}

/// Strategy: a strand of 0-20 letters, skewed toward common letters so
/// that real words show up.
fn strand_strategy() -> impl Strategy<Value = Strand> {
    let letter = prop_oneof![
        3 => prop::sample::select(b"EARIOTNSLC".to_vec()),
        1 => prop::sample::select(b"ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_vec()),
    ];
    prop::collection::vec(letter, 0..=20).prop_map(|bytes| {
        Strand::new(
            bytes
                .into_iter()
                .filter_map(|b| Letter::from_char(b as char))
                .collect(),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // 1. Every reported word can be spelled from the strand
    #[test]
    fn found_words_are_formable(strand in strand_strategy()) {
        let table = bundled();
        let letters = strand.multiset();
        for word in WordMatcher::default().find_all_words(&table, &strand) {
            prop_assert!(can_form(&word, &letters), "{word} not formable from {strand}");
        }
    }

    // 2. Nothing formable is missed, nothing unformable is reported
    #[test]
    fn exhaustive_matching_is_exact(strand in strand_strategy()) {
        let table = bundled();
        let letters = strand.multiset();
        let found = WordMatcher::default().find_all_words(&table, &strand);
        let expected = table.iter().filter(|e| letters.contains(&e.letters)).count();
        prop_assert_eq!(found.len(), expected);
    }

    // 3. Greedy words never consume more letters than the strand holds
    #[test]
    fn greedy_words_are_disjoint(strand in strand_strategy(), max in 0usize..5) {
        let table = bundled();
        let words = WordMatcher::default().find_independent_words(&table, strand.letters(), max);
        prop_assert!(words.len() <= max);
        let mut used = LetterMultiset::new();
        for word in &words {
            used.add(&LetterMultiset::from_word(word).unwrap());
        }
        prop_assert!(strand.multiset().contains(&used));
    }

    // 4. Derived words are strictly shorter sub-multisets of their parent
    #[test]
    fn derivation_shrinks(strand in strand_strategy()) {
        let table = bundled();
        let deriver = HierarchicalWordDeriver::default();
        for primary in WordMatcher::default().find_independent_words(&table, strand.letters(), 3) {
            let parent = LetterMultiset::from_word(&primary).unwrap();
            let secondaries = deriver.derive_secondary(&table, &primary);
            prop_assert!(secondaries.len() <= 2);
            for secondary in secondaries {
                prop_assert!(secondary.len() < primary.len());
                prop_assert_ne!(&secondary, &primary);
                prop_assert!(can_form(&secondary, &parent));
                if let Some(tertiary) = deriver.derive_tertiary(&table, &secondary) {
                    prop_assert!(tertiary.len() < secondary.len());
                    prop_assert!(can_form(&tertiary, &LetterMultiset::from_word(&secondary).unwrap()));
                }
            }
        }
    }

    // 5. Scores stay within the sample count
    #[test]
    fn scores_are_bounded(seed in any::<u64>(), samples in 1u32..200) {
        let scorer = SignificanceScorer::with_samples(
            Arc::new(RandomBitSource::alternating(65_000).unwrap()),
            Arc::new(SeededEntropy::new(seed)),
            samples,
            samples / 2 + 1,
        );
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let first = scorer.score("STAR").await.unwrap();
            let second = scorer.score("STAR").await.unwrap();
            prop_assert!(first <= samples && second <= samples);
            prop_assert!(scorer.score_cycle().await.unwrap() <= samples / 2 + 1);
            Ok(())
        })?;
    }

    // 6. Loading the same words twice answers membership the same way
    #[test]
    fn reloading_is_idempotent(words in prop::collection::vec("[a-zA-Z]{1,8}", 0..40), query in "[A-Z]{1,8}") {
        let index = DictionaryIndex::new();
        let first = index.load_from(words.iter());
        let before = index.contains(&query);
        let second = index.load_from(words.iter());
        prop_assert_eq!(first, second);
        prop_assert_eq!(before, index.contains(&query));
        for word in &words {
            prop_assert!(index.contains(word));
        }
    }
}

#[test]
fn empty_inputs_give_empty_results() {
    let table = bundled();
    let matcher = WordMatcher::default();
    assert!(matcher.find_all_words(&table, &Strand::default()).is_empty());
    assert!(matcher.find_independent_words(&table, &[], 3).is_empty());
}
