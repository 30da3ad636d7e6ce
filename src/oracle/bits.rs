// File: src/oracle/bits.rs
use crate::error::{OracleError, Result};
use crate::oracle::entropy::EntropySource;
use serde::{Deserialize, Serialize};

/// How the bit table is filled at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitPattern {
    /// Repeating runs of five ones then five zeros.
    Alternating,
    /// Bits taken from the entropy source.
    Entropy,
}

/// A fixed table of bits that scores are sampled from. Exactly half ones
/// for `Alternating`, close to half for `Entropy`, so sampled scores
/// cluster around half the sample count.
#[derive(Debug, Clone)]
pub struct RandomBitSource {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

impl RandomBitSource {
    pub fn build(pattern: BitPattern, len: usize, entropy: &dyn EntropySource) -> Result<Self> {
        match pattern {
            BitPattern::Alternating => Self::alternating(len),
            BitPattern::Entropy => Self::from_entropy(len, entropy),
        }
    }

    pub fn alternating(len: usize) -> Result<Self> {
        Self::from_bits((0..len).map(|i| i % 10 < 5))
    }

    pub fn from_entropy(len: usize, entropy: &dyn EntropySource) -> Result<Self> {
        let mut draws = vec![0u32; len.div_ceil(32)];
        entropy.fill_u32(&mut draws)?;
        Self::from_bits((0..len).map(|i| (draws[i / 32] >> (i % 32)) & 1 == 1))
    }

    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Result<Self> {
        let mut words = Vec::new();
        let mut len = 0usize;
        let mut ones = 0usize;
        for bit in bits {
            if len % 64 == 0 {
                words.push(0u64);
            }
            if bit {
                words[len / 64] |= 1 << (len % 64);
                ones += 1;
            }
            len += 1;
        }
        if len == 0 {
            return Err(OracleError::EmptyBitSource);
        }
        Ok(Self { words, len, ones })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ones(&self) -> usize {
        self.ones
    }

    /// Fraction of entries that are 1.
    pub fn density(&self) -> f64 {
        self.ones as f64 / self.len as f64
    }

    pub fn get(&self, index: usize) -> bool {
        let index = index % self.len;
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Draws `samples` random positions in one batched call and sums the
    /// bits found there.
    pub fn sample_sum(&self, samples: u32, entropy: &dyn EntropySource) -> Result<u32> {
        let mut draws = vec![0u32; samples as usize];
        entropy.fill_u32(&mut draws)?;
        Ok(draws.iter().filter(|&&draw| self.get(draw as usize)).count() as u32)
    }
}
