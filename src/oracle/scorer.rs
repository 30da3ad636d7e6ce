// File: src/oracle/scorer.rs
use crate::core::types::{ScoredWord, TaggedWord};
use crate::error::{OracleError, Result};
use crate::oracle::bits::RandomBitSource;
use crate::oracle::entropy::EntropySource;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

pub const WORD_SAMPLES: u32 = 100;
pub const ATTENTION_SAMPLES: u32 = 50;

/// Scores words by sampling the bit table.
///
/// Every call samples afresh. Nothing is memoized: the same word scored
/// twice, in one cycle or across cycles, gets two independent scores.
#[derive(Clone)]
pub struct SignificanceScorer {
    bits: Arc<RandomBitSource>,
    entropy: Arc<dyn EntropySource>,
    word_samples: u32,
    attention_samples: u32,
}

impl SignificanceScorer {
    pub fn new(bits: Arc<RandomBitSource>, entropy: Arc<dyn EntropySource>) -> Self {
        Self::with_samples(bits, entropy, WORD_SAMPLES, ATTENTION_SAMPLES)
    }

    pub fn with_samples(
        bits: Arc<RandomBitSource>,
        entropy: Arc<dyn EntropySource>,
        word_samples: u32,
        attention_samples: u32,
    ) -> Self {
        Self {
            bits,
            entropy,
            word_samples,
            attention_samples,
        }
    }

    pub fn word_samples(&self) -> u32 {
        self.word_samples
    }

    pub fn attention_samples(&self) -> u32 {
        self.attention_samples
    }

    /// Raw significance of `word`, in `0..=word_samples`.
    pub async fn score(&self, word: &str) -> Result<u32> {
        if word.trim().is_empty() {
            return Err(OracleError::InvalidWord(word.to_string()));
        }
        self.bits.sample_sum(self.word_samples, self.entropy.as_ref())
    }

    /// Attention for a whole cycle, in `0..=attention_samples`. Not tied to
    /// any word.
    pub async fn score_cycle(&self) -> Result<u32> {
        self.bits.sample_sum(self.attention_samples, self.entropy.as_ref())
    }

    /// Scores all words concurrently. A word whose scoring fails is dropped
    /// and the rest of the batch is kept. Output keeps input order.
    pub async fn score_all(&self, words: Vec<(TaggedWord, u32)>) -> Vec<ScoredWord> {
        let total = words.len();
        let scored = join_all(words.into_iter().map(|(tagged, frequency)| async move {
            match self.score(&tagged.word).await {
                Ok(score) => Some(ScoredWord {
                    tagged,
                    score,
                    samples: self.word_samples,
                    frequency,
                }),
                Err(err) => {
                    warn!(word = %tagged.word, error = %err, "Dropping word that could not be scored");
                    None
                }
            }
        }))
        .await;

        let scored: Vec<ScoredWord> = scored.into_iter().flatten().collect();
        debug!(total, scored = scored.len(), "Scored words");
        scored
    }
}
