// File: src/core/generator.rs
use crate::core::letters::{Letter, LetterPool, Strand};
use crate::oracle::entropy::EntropySource;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

pub const STRAND_LENGTH: usize = 20;

/// Draws strands of letters from the shared pool with a CSPRNG.
#[derive(Clone)]
pub struct LetterGenerator {
    pool: Arc<LetterPool>,
    entropy: Arc<dyn EntropySource>,
    fallback: Letter,
}

impl LetterGenerator {
    pub fn new(pool: Arc<LetterPool>, entropy: Arc<dyn EntropySource>, fallback: Letter) -> Self {
        Self { pool, entropy, fallback }
    }

    pub fn pool(&self) -> &LetterPool {
        &self.pool
    }

    /// `count` independent strands of `length` letters. Strands are drawn
    /// concurrently; each keeps its letters in position order.
    pub async fn generate_strands(&self, count: usize, length: usize) -> Vec<Strand> {
        let strands = join_all((0..count).map(|index| async move { self.draw_strand(index, length) })).await;
        debug!(count, length, "Generated strands");
        strands
    }

    pub async fn generate_three_strands(&self) -> Vec<Strand> {
        self.generate_strands(3, STRAND_LENGTH).await
    }

    pub async fn generate_five_strands(&self) -> Vec<Strand> {
        self.generate_strands(5, STRAND_LENGTH).await
    }

    /// First strand of a five-strand batch.
    pub async fn generate_strand(&self) -> Strand {
        self.generate_five_strands()
            .await
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// One batched draw for the whole strand. If the batch fails, each
    /// position is drawn on its own and a failed draw becomes the fallback
    /// letter, so a single bad draw never fails the strand.
    fn draw_strand(&self, index: usize, length: usize) -> Strand {
        let mut draws = vec![0u32; length];
        if let Err(err) = self.entropy.fill_u32(&mut draws) {
            warn!(strand = index, error = %err, "Batched letter draw failed, drawing per position");
            let letters = (0..length)
                .map(|position| match self.entropy.next_u32() {
                    Ok(draw) => self.pool.pick(draw),
                    Err(err) => {
                        warn!(strand = index, position, error = %err, "Letter draw failed, using fallback");
                        self.fallback
                    }
                })
                .collect();
            return Strand::new(letters);
        }
        Strand::new(draws.into_iter().map(|draw| self.pool.pick(draw)).collect())
    }
}

/// Columns of a square grid whose rows are `rows`. Ragged rows are read up
/// to the first row's length; short rows simply contribute nothing.
pub fn grid_columns(rows: &[Strand]) -> Vec<Strand> {
    let width = rows.first().map(Strand::len).unwrap_or(0);
    (0..width)
        .map(|column| {
            Strand::new(
                rows.iter()
                    .filter_map(|row| row.letters().get(column).copied())
                    .collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::entropy::testing::{BatchFailingEntropy, DeadEntropy};
    use crate::oracle::entropy::SeededEntropy;

    fn generator(entropy: Arc<dyn EntropySource>) -> LetterGenerator {
        let pool = Arc::new(LetterPool::uniform(500, 5).unwrap());
        LetterGenerator::new(pool, entropy, Letter::from_char('E').unwrap())
    }

    #[tokio::test]
    async fn strands_have_requested_shape() {
        let gen = generator(Arc::new(SeededEntropy::new(1)));
        let strands = gen.generate_strands(5, 20).await;
        assert_eq!(strands.len(), 5);
        assert!(strands.iter().all(|s| s.len() == 20));
        assert_eq!(gen.generate_three_strands().await.len(), 3);
        assert_eq!(gen.generate_strand().await.len(), STRAND_LENGTH);
    }

    #[tokio::test]
    async fn strands_come_from_the_pool() {
        let pool = Arc::new(LetterPool::from_counts(&[('A', 2), ('B', 2), ('C', 2)]).unwrap());
        let gen = LetterGenerator::new(pool, Arc::new(SeededEntropy::new(9)), Letter::from_char('E').unwrap());
        for strand in gen.generate_strands(3, 20).await {
            assert!(strand.to_string().chars().all(|c| "ABC".contains(c)));
        }
    }

    #[tokio::test]
    async fn dead_entropy_falls_back_without_failing() {
        let gen = generator(Arc::new(DeadEntropy));
        let strands = gen.generate_strands(2, 20).await;
        assert_eq!(strands.len(), 2);
        assert!(strands.iter().all(|s| s.to_string() == "E".repeat(20)));
    }

    #[tokio::test]
    async fn failed_batch_is_redrawn_per_position() {
        let gen = generator(Arc::new(BatchFailingEntropy(SeededEntropy::new(3))));
        let strand = gen.generate_strand().await;
        assert_eq!(strand.len(), 20);
        assert_ne!(strand.to_string(), "E".repeat(20));
    }

    #[test]
    fn columns_read_down_the_rows() {
        let rows: Vec<Strand> = ["CAT", "ODE", "WRY"].iter().map(|r| r.parse().unwrap()).collect();
        let columns: Vec<String> = grid_columns(&rows).iter().map(Strand::to_string).collect();
        assert_eq!(columns, vec!["COW", "ADR", "TEY"]);
        assert!(grid_columns(&[]).is_empty());
    }
}
