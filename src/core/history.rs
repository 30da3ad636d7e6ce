// File: src/core/history.rs
use crate::core::types::CycleResult;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded history of emitted cycles, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLog {
    capacity: usize,
    entries: VecDeque<CycleResult>,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Records a cycle, evicting the oldest entry once full.
    pub fn push(&mut self, result: CycleResult) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&CycleResult> {
        self.entries.front()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CycleResult> {
        self.entries.iter()
    }

    /// Entries whose raw attention score reaches `attention_threshold`,
    /// optionally without the cycles that kept no words.
    pub fn visible(
        &self,
        attention_threshold: u32,
        hide_empty: bool,
    ) -> impl Iterator<Item = &CycleResult> {
        self.entries.iter().filter(move |entry| {
            entry.attention_score >= attention_threshold && !(hide_empty && entry.is_empty())
        })
    }

    /// Plain-text rendering of the visible entries.
    pub fn transcript(&self, attention_threshold: u32, hide_empty: bool) -> String {
        let blocks: Vec<String> = self
            .visible(attention_threshold, hide_empty)
            .map(render_entry)
            .collect();
        blocks.join("\n\n")
    }
}

fn render_entry(entry: &CycleResult) -> String {
    let mut out = format!(
        "Grid #{} | Attention Score: {}/{} | Cosmic Score: {}\n",
        entry.grid_number,
        entry.attention_score,
        entry.attention_samples,
        entry.words.len()
    );
    let words: Vec<String> = entry
        .words
        .iter()
        .map(|w| format!("{} ({})", w.word(), w.score))
        .collect();
    out.push_str(&words.join(" | "));
    out
}
