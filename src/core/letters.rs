// File: src/core/letters.rs
use crate::error::{OracleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ALPHABET_LEN: usize = 26;

/// One of the 26 uppercase Latin letters, stored as its alphabet index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Letter(u8);

impl Letter {
    /// Substituted for a letter that could not be drawn.
    pub const DEFAULT_FALLBACK: Letter = Letter(b'E' - b'A');

    /// Case-insensitive; anything outside A-Z is rejected.
    pub fn from_char(c: char) -> Option<Self> {
        let upper = c.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Some(Letter(upper as u8 - b'A'))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_char(self) -> char {
        (b'A' + self.0) as char
    }

    pub fn all() -> impl Iterator<Item = Letter> {
        (0..ALPHABET_LEN as u8).map(Letter)
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Letter -> count. The unit of every "can this word be formed" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LetterMultiset {
    counts: [u16; ALPHABET_LEN],
}

impl LetterMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_letters<'a>(letters: impl IntoIterator<Item = &'a Letter>) -> Self {
        let mut set = Self::new();
        for letter in letters {
            set.insert(*letter);
        }
        set
    }

    /// Builds the multiset of a word. Returns `None` if the word holds a
    /// character outside A-Z, since no strand can ever supply it.
    pub fn from_word(word: &str) -> Option<Self> {
        let mut set = Self::new();
        for c in word.chars() {
            set.insert(Letter::from_char(c)?);
        }
        Some(set)
    }

    pub fn insert(&mut self, letter: Letter) {
        self.counts[letter.index()] = self.counts[letter.index()].saturating_add(1);
    }

    pub fn count(&self, letter: Letter) -> u16 {
        self.counts[letter.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// True iff every letter of `other` is available here at least as often.
    pub fn contains(&self, other: &LetterMultiset) -> bool {
        self.counts
            .iter()
            .zip(other.counts.iter())
            .all(|(have, need)| have >= need)
    }

    /// Removes `other` from `self`, failing without mutation if it does not fit.
    pub fn try_consume(&mut self, other: &LetterMultiset) -> bool {
        if !self.contains(other) {
            return false;
        }
        for (have, need) in self.counts.iter_mut().zip(other.counts.iter()) {
            *have -= need;
        }
        true
    }

    pub fn add(&mut self, other: &LetterMultiset) {
        for (have, more) in self.counts.iter_mut().zip(other.counts.iter()) {
            *have = have.saturating_add(*more);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Letter, u16)> + '_ {
        Letter::all().filter_map(|l| {
            let count = self.count(l);
            (count > 0).then_some((l, count))
        })
    }
}

/// An ordered, fixed-length sequence of letters drawn for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Strand {
    letters: Vec<Letter>,
}

impl Strand {
    pub fn new(letters: Vec<Letter>) -> Self {
        Self { letters }
    }

    pub fn letters(&self) -> &[Letter] {
        &self.letters
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn multiset(&self) -> LetterMultiset {
        LetterMultiset::from_letters(&self.letters)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for letter in &self.letters {
            write!(f, "{}", letter)?;
        }
        Ok(())
    }
}

impl FromStr for Strand {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        s.chars()
            .map(|c| Letter::from_char(c).ok_or_else(|| OracleError::InvalidWord(s.to_string())))
            .collect::<Result<Vec<_>>>()
            .map(Strand::new)
    }
}

/// The precomputed array every strand letter is drawn from.
///
/// Built once per process by repeating the alphabet, so each letter occurs
/// with the frequency it was given.
#[derive(Debug, Clone)]
pub struct LetterPool {
    letters: Vec<Letter>,
}

impl LetterPool {
    /// `cycles` passes over the alphabet, each letter repeated `repeats` times
    /// per pass. 500 x 5 gives the 65,000-entry pool.
    pub fn uniform(cycles: usize, repeats: usize) -> Result<Self> {
        let mut letters = Vec::with_capacity(cycles * repeats * ALPHABET_LEN);
        for _ in 0..cycles {
            for letter in Letter::all() {
                letters.extend(std::iter::repeat(letter).take(repeats));
            }
        }
        Self::from_letters(letters)
    }

    /// Pool with an explicit count per letter, laid out in the given order.
    pub fn from_counts(counts: &[(char, usize)]) -> Result<Self> {
        let mut letters = Vec::new();
        for &(c, n) in counts {
            let letter = Letter::from_char(c).ok_or_else(|| OracleError::InvalidWord(c.to_string()))?;
            letters.extend(std::iter::repeat(letter).take(n));
        }
        Self::from_letters(letters)
    }

    pub fn from_letters(letters: Vec<Letter>) -> Result<Self> {
        if letters.is_empty() {
            return Err(OracleError::EmptyLetterPool);
        }
        Ok(Self { letters })
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Reads the entry a raw random draw lands on.
    pub fn pick(&self, draw: u32) -> Letter {
        self.letters[draw as usize % self.letters.len()]
    }

    pub fn frequencies(&self) -> LetterMultiset {
        LetterMultiset::from_letters(&self.letters)
    }
}
