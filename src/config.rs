//! Oracle configuration

use crate::core::letters::Letter;
use crate::error::{OracleError, Result};
use crate::oracle::bits::BitPattern;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which generation pipeline a cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    /// Independent strands, exhaustive matching, frequency filter.
    Strands,
    /// Square grid, greedy words per row and column, derived tiers.
    Grid,
}

impl std::str::FromStr for PipelineVariant {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strands" | "strand" => Ok(PipelineVariant::Strands),
            "grid" => Ok(PipelineVariant::Grid),
            other => Err(OracleError::Config(format!("unknown pipeline variant {other:?}"))),
        }
    }
}

/// Oracle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub variant: PipelineVariant,

    /// Strands per cycle (strand variant)
    pub strand_count: usize,

    /// Letters per strand
    pub strand_length: usize,

    /// Rows and columns of the grid (grid variant)
    pub grid_size: usize,

    /// Passes over the alphabet when building the letter pool
    pub pool_cycles: usize,

    /// Copies of each letter per pass
    pub pool_repeats: usize,

    pub bit_source_len: usize,
    pub bit_pattern: BitPattern,

    /// Bits sampled per word score
    pub word_samples: u32,

    /// Bits sampled per attention score
    pub attention_samples: u32,

    pub max_independent_words: usize,

    /// Greedy candidate cap; `None` scans the whole dictionary
    pub candidate_cap: Option<usize>,

    pub secondary_limit: usize,
    pub min_repeat_frequency: u32,
    pub min_single_length: usize,

    /// Word threshold, 0..=100
    pub threshold: u32,

    /// Message log attention threshold, raw 0..=attention_samples
    pub attention_threshold: u32,

    pub tick_interval_ms: u64,
    pub log_capacity: usize,
    pub fallback_letter: char,
    pub fallback_glyph: String,

    /// Attention reported by a cycle that failed
    pub degraded_attention: u32,

    /// Dictionary entries scanned between cooperative yields
    pub yield_every: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            variant: PipelineVariant::Strands,
            strand_count: 5,
            strand_length: 20,
            grid_size: 20,
            pool_cycles: 500,
            pool_repeats: 5,
            bit_source_len: 65_000,
            bit_pattern: BitPattern::Alternating,
            word_samples: 100,
            attention_samples: 50,
            max_independent_words: 3,
            candidate_cap: Some(50),
            secondary_limit: 2,
            min_repeat_frequency: 2,
            min_single_length: 4,
            threshold: 66,
            attention_threshold: 15,
            tick_interval_ms: 1000,
            log_capacity: 50,
            fallback_letter: 'E',
            fallback_glyph: crate::core::glyphs::FALLBACK_GLYPH.to_string(),
            degraded_attention: 0,
            yield_every: 2048,
        }
    }
}

impl OracleConfig {
    /// Load configuration from file. A missing file gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        let config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/strand-oracle/config.json`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("strand-oracle").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(OracleError::Config(msg.to_string()));
        if self.strand_count == 0 || self.strand_length == 0 {
            return fail("strands need a positive count and length");
        }
        if self.grid_size == 0 {
            return fail("grid_size must be positive");
        }
        if self.pool_cycles == 0 || self.pool_repeats == 0 {
            return fail("letter pool must not be empty");
        }
        if self.bit_source_len == 0 {
            return fail("bit_source_len must be positive");
        }
        if self.word_samples == 0 || self.attention_samples == 0 {
            return fail("sample counts must be positive");
        }
        if self.threshold > 100 {
            return fail("threshold is on a 0..=100 scale");
        }
        if self.attention_threshold > self.attention_samples {
            return fail("attention_threshold exceeds attention_samples");
        }
        if self.degraded_attention > self.attention_samples {
            return fail("degraded_attention exceeds attention_samples");
        }
        if Letter::from_char(self.fallback_letter).is_none() {
            return fail("fallback_letter must be A-Z");
        }
        Ok(())
    }

    pub fn fallback_letter(&self) -> Letter {
        Letter::from_char(self.fallback_letter).unwrap_or(Letter::DEFAULT_FALLBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = OracleConfig::default();
        config.validate().unwrap();
        assert_eq!(config.strand_count * config.strand_length, 100);
        assert_eq!(config.pool_cycles * config.pool_repeats * 26, 65_000);
        assert_eq!(config.fallback_letter().as_char(), 'E');
    }

    #[test]
    fn load_missing_config_gives_defaults() {
        let config = OracleConfig::load(Some(Path::new("/nonexistent/oracle/config.json"))).unwrap();
        assert_eq!(config, OracleConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "variant": "grid", "threshold": 80 }"#).unwrap();
        let config = OracleConfig::load(Some(&path)).unwrap();
        assert_eq!(config.variant, PipelineVariant::Grid);
        assert_eq!(config.threshold, 80);
        assert_eq!(config.word_samples, 100);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = OracleConfig::default();
        config.threshold = 101;
        assert!(config.validate().is_err());

        let mut config = OracleConfig::default();
        config.word_samples = 0;
        assert!(config.validate().is_err());

        let mut config = OracleConfig::default();
        config.fallback_letter = '7';
        assert!(config.validate().is_err());
    }

    #[test]
    fn variant_parses_from_cli_text() {
        assert_eq!("Grid".parse::<PipelineVariant>().unwrap(), PipelineVariant::Grid);
        assert!("spiral".parse::<PipelineVariant>().is_err());
    }
}
