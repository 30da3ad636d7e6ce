// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic identifier assigned to every emitted cycle.
pub type GridNumber = u64;

/// Tier of a word within the derivation hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordLevel {
    Primary,
    Secondary,
    Tertiary,
}

impl WordLevel {
    /// Numeric tier, 1 for primary words.
    pub fn depth(self) -> u8 {
        match self {
            WordLevel::Primary => 1,
            WordLevel::Secondary => 2,
            WordLevel::Tertiary => 3,
        }
    }

    /// The tier a word derived from this one lands in.
    pub fn next(self) -> Option<WordLevel> {
        match self {
            WordLevel::Primary => Some(WordLevel::Secondary),
            WordLevel::Secondary => Some(WordLevel::Tertiary),
            WordLevel::Tertiary => None,
        }
    }
}

/// Where a word's letters came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Strand,
    Row,
    Column,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceType::Strand => "strand",
            SourceType::Row => "row",
            SourceType::Column => "column",
        };
        f.write_str(name)
    }
}

/// A found word plus its provenance.
///
/// Level 1 words have no parent. Level 2 and 3 words always name the word
/// whose letters they were derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedWord {
    pub word: String,
    pub level: WordLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub source_type: SourceType,
    pub source_index: usize,
}

impl TaggedWord {
    pub fn primary(word: impl Into<String>, source_type: SourceType, source_index: usize) -> Self {
        Self {
            word: word.into(),
            level: WordLevel::Primary,
            parent: None,
            source_type,
            source_index,
        }
    }

    /// Tags `word` as derived from `self`, inheriting its provenance.
    /// Returns `None` when `self` is already at the deepest tier.
    pub fn derive(&self, word: impl Into<String>) -> Option<Self> {
        let level = self.level.next()?;
        Some(Self {
            word: word.into(),
            level,
            parent: Some(self.word.clone()),
            source_type: self.source_type,
            source_index: self.source_index,
        })
    }
}

/// A tagged word with its significance score for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredWord {
    #[serde(flatten)]
    pub tagged: TaggedWord,
    /// Raw sum of sampled bits, `0..=samples`.
    pub score: u32,
    /// Number of bits sampled to produce `score`.
    pub samples: u32,
    /// Occurrences of the word across this cycle's sequences.
    pub frequency: u32,
}

impl ScoredWord {
    pub fn word(&self) -> &str {
        &self.tagged.word
    }

    /// Score on the 0..=100 threshold scale.
    pub fn percent(&self) -> u32 {
        to_percent(self.score, self.samples)
    }
}

/// The single output of one generation tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleResult {
    pub grid_number: GridNumber,
    pub words: Vec<ScoredWord>,
    /// Raw attention score, `0..=attention_samples`.
    pub attention_score: u32,
    pub attention_samples: u32,
    pub emoji: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Words that were scored before the threshold was applied.
    pub total_words_evaluated: usize,
    /// True when the cycle failed and was replaced by an empty result.
    #[serde(default)]
    pub degraded: bool,
}

impl CycleResult {
    pub fn attention_percent(&self) -> u32 {
        to_percent(self.attention_score, self.attention_samples)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

pub(crate) fn to_percent(score: u32, samples: u32) -> u32 {
    if samples == 0 {
        return 0;
    }
    ((u64::from(score) * 100) / u64::from(samples)) as u32
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
