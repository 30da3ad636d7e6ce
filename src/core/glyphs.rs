// File: src/core/glyphs.rs
use crate::core::letters::{Letter, LetterPool};
use crate::oracle::entropy::EntropySource;
use std::sync::Arc;
use tracing::warn;

pub const FALLBACK_GLYPH: &str = "😶";

/// Decorates each cycle with one display glyph. Opaque to the core.
pub trait GlyphProvider: Send + Sync {
    fn pick_glyph(&self) -> Option<String>;
}

impl<F> GlyphProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn pick_glyph(&self) -> Option<String> {
        self()
    }
}

/// The mood glyph shown for a letter.
pub fn glyph_for(letter: Letter) -> &'static str {
    match letter.as_char() {
        'A' => "😡", 'B' => "😬", 'C' => "😎", 'D' => "😢",
        'E' => "😳", 'F' => "😨", 'G' => "🤢", 'H' => "😂",
        'I' => "😶", 'J' => "😏", 'K' => "🔪", 'L' => "❤️",
        'M' => "🪖", 'N' => "❌", 'O' => "😮", 'P' => "😱",
        'Q' => "🤨", 'R' => "😤", 'S' => "😈", 'T' => "🥱",
        'U' => "😓", 'V' => "😍", 'W' => "😵", 'X' => "😖",
        'Y' => "✅", 'Z' => "🧘",
        _ => FALLBACK_GLYPH,
    }
}

/// Picks a glyph by drawing one letter from the letter pool.
#[derive(Clone)]
pub struct PoolGlyphs {
    pool: Arc<LetterPool>,
    entropy: Arc<dyn EntropySource>,
}

impl PoolGlyphs {
    pub fn new(pool: Arc<LetterPool>, entropy: Arc<dyn EntropySource>) -> Self {
        Self { pool, entropy }
    }
}

impl GlyphProvider for PoolGlyphs {
    fn pick_glyph(&self) -> Option<String> {
        match self.entropy.next_u32() {
            Ok(draw) => Some(glyph_for(self.pool.pick(draw)).to_string()),
            Err(err) => {
                warn!(error = %err, "Glyph draw failed");
                None
            }
        }
    }
}
