use crate::config::{OracleConfig, PipelineVariant};
use crate::core::deriver::HierarchicalWordDeriver;
use crate::core::dictionary::{DictionaryIndex, WordTable};
use crate::core::generator::{grid_columns, LetterGenerator};
use crate::core::glyphs::{GlyphProvider, PoolGlyphs};
use crate::core::letters::{LetterPool, Strand};
use crate::core::matcher::WordMatcher;
use crate::core::threshold::{LiveThreshold, ThresholdProvider};
use crate::core::types::{now_millis, CycleResult, GridNumber, ScoredWord, SourceType, TaggedWord};
use crate::error::{OracleError, Result};
use crate::oracle::bits::RandomBitSource;
use crate::oracle::entropy::{EntropySource, OsEntropy};
use crate::oracle::scorer::SignificanceScorer;
use crate::tally::WordTally;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument};

/// Stage of the cycle currently running, or `Idle` between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CycleStage {
    Idle,
    GeneratingStrands,
    MatchingWords,
    DerivingHierarchy,
    Scoring,
    Filtering,
    Emitted,
}

impl CycleStage {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => CycleStage::GeneratingStrands,
            2 => CycleStage::MatchingWords,
            3 => CycleStage::DerivingHierarchy,
            4 => CycleStage::Scoring,
            5 => CycleStage::Filtering,
            6 => CycleStage::Emitted,
            _ => CycleStage::Idle,
        }
    }
}

/// Receives every emitted cycle, exactly once per cycle.
pub trait CycleSink: Send + Sync {
    fn on_cycle_complete(&self, result: &CycleResult);
}

impl<F> CycleSink for F
where
    F: Fn(&CycleResult) + Send + Sync,
{
    fn on_cycle_complete(&self, result: &CycleResult) {
        self(result)
    }
}

/// Forwards cycles into an unbounded channel.
pub struct ChannelSink(pub mpsc::UnboundedSender<CycleResult>);

impl CycleSink for ChannelSink {
    fn on_cycle_complete(&self, result: &CycleResult) {
        if self.0.send(result.clone()).is_err() {
            debug!(grid_number = result.grid_number, "Cycle receiver dropped");
        }
    }
}

/// Releases the single-flight flag even if the cycle future is dropped.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// The orchestrator owns every collaborator a cycle needs; nothing is ambient.
pub struct CycleOrchestrator {
    config: OracleConfig,
    dictionary: Arc<DictionaryIndex>,
    generator: LetterGenerator,
    matcher: WordMatcher,
    deriver: HierarchicalWordDeriver,
    tally: WordTally,
    scorer: SignificanceScorer,
    threshold: Arc<dyn ThresholdProvider>,
    glyphs: Arc<dyn GlyphProvider>,
    sink: Arc<dyn CycleSink>,
    counter: AtomicU64,
    in_flight: AtomicBool,
    streaming: AtomicBool,
    stage: AtomicU8,
}

impl CycleOrchestrator {
    pub fn builder(config: OracleConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &Arc<DictionaryIndex> {
        &self.dictionary
    }

    pub fn generator(&self) -> &LetterGenerator {
        &self.generator
    }

    pub fn scorer(&self) -> &SignificanceScorer {
        &self.scorer
    }

    pub fn stage(&self) -> CycleStage {
        CycleStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    /// Grid number of the most recently started cycle, 0 before the first.
    pub fn grid_number(&self) -> GridNumber {
        self.counter.load(Ordering::Acquire)
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    /// Refuses new cycles from the next tick on. A cycle already running
    /// still completes and emits.
    pub fn stop(&self) {
        if self.streaming.swap(false, Ordering::AcqRel) {
            info!("Streaming stopped");
        }
    }

    pub fn start(&self) {
        if !self.streaming.swap(true, Ordering::AcqRel) {
            info!("Streaming started");
        }
    }

    /// Runs one full cycle for one tick and hands the result to the sink.
    ///
    /// Refuses to start (without consuming a grid number) while stopped or
    /// while another cycle is in flight. Once started, the cycle always
    /// emits exactly once. Failed draws, sequences and scores are dropped
    /// inside the cycle; a panic becomes an empty, degraded result.
    pub async fn run_once(&self) -> Result<CycleResult> {
        if !self.is_streaming() {
            return Err(OracleError::Stopped);
        }
        let _flight = FlightGuard::acquire(&self.in_flight)
            .ok_or_else(|| OracleError::CycleInFlight(self.grid_number()))?;

        let grid_number = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        let span = tracing::info_span!("cycle", grid_number);

        let outcome = AssertUnwindSafe(self.execute(grid_number).instrument(span))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                error!(grid_number, "Cycle panicked, emitting empty result");
                self.degraded(grid_number)
            }
        };

        self.set_stage(CycleStage::Emitted);
        self.sink.on_cycle_complete(&result);
        self.set_stage(CycleStage::Idle);
        info!(
            grid_number,
            words = result.words.len(),
            evaluated = result.total_words_evaluated,
            attention = result.attention_score,
            "Cycle emitted"
        );
        Ok(result)
    }

    async fn execute(&self, grid_number: GridNumber) -> CycleResult {
        let table = self.dictionary.snapshot();
        if table.is_empty() {
            warn!("Dictionary is empty, cycle will find no words");
        }

        let candidates = match self.config.variant {
            PipelineVariant::Strands => self.strand_words(&table).await,
            PipelineVariant::Grid => self.grid_words(&table).await,
        };

        // matching and derivation are finished; only now are words scored
        self.set_stage(CycleStage::Scoring);
        let (scored, attention) =
            tokio::join!(self.scorer.score_all(candidates), self.scorer.score_cycle());
        let attention_score = attention.unwrap_or_else(|err| {
            warn!(error = %err, "Attention scoring failed, using default");
            self.config.degraded_attention
        });

        self.set_stage(CycleStage::Filtering);
        let total_words_evaluated = scored.len();
        // read at filter time; the slider may have moved while scoring ran
        let threshold = self.threshold.threshold();
        let mut words: Vec<ScoredWord> = scored
            .into_iter()
            .filter(|word| word.percent() >= threshold)
            .collect();
        rank(&mut words);
        debug!(threshold, kept = words.len(), total_words_evaluated, "Filtered words");

        CycleResult {
            grid_number,
            words,
            attention_score,
            attention_samples: self.scorer.attention_samples(),
            emoji: self.glyph(),
            timestamp: now_millis(),
            total_words_evaluated,
            degraded: false,
        }
    }

    /// Exhaustive matches per strand, then the repeat/length noise filter.
    async fn strand_words(&self, table: &Arc<WordTable>) -> Vec<(TaggedWord, u32)> {
        self.set_stage(CycleStage::GeneratingStrands);
        let strands = self
            .generator
            .generate_strands(self.config.strand_count, self.config.strand_length)
            .await;
        for (index, strand) in strands.iter().enumerate() {
            debug!(strand = index, letters = %strand, "Strand drawn");
        }

        self.set_stage(CycleStage::MatchingWords);
        let yield_every = self.config.yield_every;
        let per_strand = self
            .match_each(table, strands, move |matcher, table, strand| async move {
                matcher.find_all_words_yielding(&table, &strand, yield_every).await
            })
            .await;

        let kept = self.tally.tally_strands(&per_strand);
        debug!(
            matched = per_strand.iter().map(Vec::len).sum::<usize>(),
            kept = kept.len(),
            "Tallied strand matches"
        );
        kept
    }

    /// Greedy words per row and column, then secondary and tertiary tiers.
    async fn grid_words(&self, table: &Arc<WordTable>) -> Vec<(TaggedWord, u32)> {
        self.set_stage(CycleStage::GeneratingStrands);
        let size = self.config.grid_size;
        let rows = self.generator.generate_strands(size, size).await;
        let columns = grid_columns(&rows);

        self.set_stage(CycleStage::MatchingWords);
        let max_words = self.config.max_independent_words;
        let greedy = move |matcher: WordMatcher, table: Arc<WordTable>, strand: Strand| async move {
            matcher.find_independent_words(&table, strand.letters(), max_words)
        };
        let row_words = self.match_each(table, rows, greedy).await;
        let column_words = self.match_each(table, columns, greedy).await;

        let primaries: Vec<TaggedWord> = tag_sequences(row_words, SourceType::Row)
            .chain(tag_sequences(column_words, SourceType::Column))
            .collect();

        self.set_stage(CycleStage::DerivingHierarchy);
        tokio::task::yield_now().await;
        let (secondaries, tertiaries) = self.deriver.expand(table, &primaries);

        let mut all = primaries;
        all.extend(secondaries);
        all.extend(tertiaries);
        self.tally.tally_tagged(all)
    }

    /// Runs `search` on every sequence concurrently. A sequence whose task
    /// fails is logged and contributes no words; the others carry on.
    async fn match_each<F, Fut>(
        &self,
        table: &Arc<WordTable>,
        sequences: Vec<Strand>,
        search: F,
    ) -> Vec<Vec<String>>
    where
        F: Fn(WordMatcher, Arc<WordTable>, Strand) -> Fut,
        Fut: std::future::Future<Output = Vec<String>> + Send + 'static,
    {
        let mut results = vec![Vec::new(); sequences.len()];
        let mut tasks = JoinSet::new();
        for (index, sequence) in sequences.into_iter().enumerate() {
            let search = search(self.matcher.clone(), Arc::clone(table), sequence);
            tasks.spawn(async move { (index, search.await) });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, words)) => results[index] = words,
                Err(err) => warn!(error = %err, "Word matching failed for one sequence"),
            }
        }
        results
    }

    fn degraded(&self, grid_number: GridNumber) -> CycleResult {
        CycleResult {
            grid_number,
            words: Vec::new(),
            attention_score: self.config.degraded_attention,
            attention_samples: self.scorer.attention_samples(),
            emoji: self.glyph(),
            timestamp: now_millis(),
            total_words_evaluated: 0,
            degraded: true,
        }
    }

    fn glyph(&self) -> String {
        std::panic::catch_unwind(AssertUnwindSafe(|| self.glyphs.pick_glyph()))
            .ok()
            .flatten()
            .unwrap_or_else(|| self.config.fallback_glyph.clone())
    }

    fn set_stage(&self, stage: CycleStage) {
        self.stage.store(stage as u8, Ordering::Release);
    }
}

fn tag_sequences(
    per_sequence: Vec<Vec<String>>,
    source_type: SourceType,
) -> impl Iterator<Item = TaggedWord> {
    per_sequence.into_iter().enumerate().flat_map(move |(index, words)| {
        words
            .into_iter()
            .map(move |word| TaggedWord::primary(word, source_type, index))
    })
}

/// Highest score first, then longer words, then alphabetical.
fn rank(words: &mut [ScoredWord]) {
    words.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.word().len().cmp(&a.word().len()))
            .then_with(|| a.word().cmp(b.word()))
    });
}

/// Assembles a `CycleOrchestrator`, defaulting every collaborator that is
/// not supplied from the configuration.
pub struct OrchestratorBuilder {
    config: OracleConfig,
    dictionary: Option<Arc<DictionaryIndex>>,
    entropy: Option<Arc<dyn EntropySource>>,
    pool: Option<LetterPool>,
    bits: Option<RandomBitSource>,
    threshold: Option<Arc<dyn ThresholdProvider>>,
    glyphs: Option<Arc<dyn GlyphProvider>>,
    sink: Option<Arc<dyn CycleSink>>,
}

impl OrchestratorBuilder {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            dictionary: None,
            entropy: None,
            pool: None,
            bits: None,
            threshold: None,
            glyphs: None,
            sink: None,
        }
    }

    pub fn dictionary(mut self, dictionary: Arc<DictionaryIndex>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = Some(entropy);
        self
    }

    pub fn pool(mut self, pool: LetterPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn bits(mut self, bits: RandomBitSource) -> Self {
        self.bits = Some(bits);
        self
    }

    pub fn threshold(mut self, threshold: Arc<dyn ThresholdProvider>) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn glyphs(mut self, glyphs: Arc<dyn GlyphProvider>) -> Self {
        self.glyphs = Some(glyphs);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn CycleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<CycleOrchestrator> {
        let config = self.config;
        config.validate()?;

        let entropy = self.entropy.unwrap_or_else(|| Arc::new(OsEntropy));
        let pool = match self.pool {
            Some(pool) => pool,
            None => LetterPool::uniform(config.pool_cycles, config.pool_repeats)?,
        };
        let pool = Arc::new(pool);
        let bits = match self.bits {
            Some(bits) => bits,
            None => RandomBitSource::build(config.bit_pattern, config.bit_source_len, entropy.as_ref())?,
        };
        debug!(pool = pool.len(), bits = bits.len(), density = bits.density(), "Oracle tables ready");

        let dictionary = self
            .dictionary
            .unwrap_or_else(|| Arc::new(DictionaryIndex::bundled()));
        if dictionary.is_empty() {
            warn!("Orchestrator built over an empty dictionary");
        }

        let generator = LetterGenerator::new(Arc::clone(&pool), Arc::clone(&entropy), config.fallback_letter());
        let scorer = SignificanceScorer::with_samples(
            Arc::new(bits),
            Arc::clone(&entropy),
            config.word_samples,
            config.attention_samples,
        );
        let glyphs = self
            .glyphs
            .unwrap_or_else(|| Arc::new(PoolGlyphs::new(Arc::clone(&pool), Arc::clone(&entropy))));
        let threshold = self
            .threshold
            .unwrap_or_else(|| Arc::new(LiveThreshold::new(config.threshold)));
        let sink = self.sink.unwrap_or_else(|| Arc::new(|_: &CycleResult| {}));

        Ok(CycleOrchestrator {
            matcher: WordMatcher::new(config.candidate_cap),
            deriver: HierarchicalWordDeriver::new(config.secondary_limit),
            tally: WordTally::new(config.min_repeat_frequency, config.min_single_length),
            config,
            dictionary,
            generator,
            scorer,
            threshold,
            glyphs,
            sink,
            counter: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
            streaming: AtomicBool::new(true),
            stage: AtomicU8::new(CycleStage::Idle as u8),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WordLevel;
    use crate::oracle::entropy::SeededEntropy;
    use std::sync::Mutex;

    fn collecting_sink() -> (Arc<Mutex<Vec<CycleResult>>>, Arc<dyn CycleSink>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |result: &CycleResult| sink_seen.lock().unwrap().push(result.clone());
        (seen, Arc::new(sink))
    }

    fn dictionary(words: &[&str]) -> Arc<DictionaryIndex> {
        let index = DictionaryIndex::new();
        index.load_from(words.iter().copied());
        Arc::new(index)
    }

    #[tokio::test]
    async fn grid_numbers_increase_by_one_per_cycle() {
        let (seen, sink) = collecting_sink();
        let orchestrator = CycleOrchestrator::builder(OracleConfig::default())
            .dictionary(dictionary(&["STAR", "RATS", "ART", "AT"]))
            .entropy(Arc::new(SeededEntropy::new(1)))
            .sink(sink)
            .build()
            .unwrap();

        for expected in 1..=3 {
            let result = orchestrator.run_once().await.unwrap();
            assert_eq!(result.grid_number, expected);
        }
        let numbers: Vec<u64> = seen.lock().unwrap().iter().map(|r| r.grid_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(orchestrator.stage(), CycleStage::Idle);
    }

    #[tokio::test]
    async fn stopped_orchestrator_refuses_without_counting() {
        let orchestrator = CycleOrchestrator::builder(OracleConfig::default())
            .dictionary(dictionary(&["A"]))
            .entropy(Arc::new(SeededEntropy::new(2)))
            .build()
            .unwrap();
        orchestrator.stop();
        assert!(matches!(orchestrator.run_once().await, Err(OracleError::Stopped)));
        assert_eq!(orchestrator.grid_number(), 0);
        orchestrator.start();
        assert_eq!(orchestrator.run_once().await.unwrap().grid_number, 1);
    }

    #[tokio::test]
    async fn threshold_zero_keeps_every_scored_word() {
        let orchestrator = CycleOrchestrator::builder(OracleConfig::default())
            .dictionary(dictionary(&["A", "E", "I", "O", "U"]))
            .entropy(Arc::new(SeededEntropy::new(3)))
            .threshold(Arc::new(|| 0u32))
            .build()
            .unwrap();
        let result = orchestrator.run_once().await.unwrap();
        assert_eq!(result.words.len(), result.total_words_evaluated);
        for pair in result.words.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn grid_variant_emits_tagged_hierarchy() {
        let config = OracleConfig {
            variant: PipelineVariant::Grid,
            grid_size: 8,
            ..OracleConfig::default()
        };
        let pool = LetterPool::from_counts(&[('C', 1), ('A', 1), ('R', 1), ('T', 1)]).unwrap();
        let orchestrator = CycleOrchestrator::builder(config)
            .dictionary(dictionary(&["CART", "CAR", "ART", "ARC", "AT", "A"]))
            .entropy(Arc::new(SeededEntropy::new(4)))
            .pool(pool)
            .threshold(Arc::new(|| 0u32))
            .build()
            .unwrap();

        let result = orchestrator.run_once().await.unwrap();
        assert!(!result.words.is_empty());
        for word in &result.words {
            match word.tagged.level {
                WordLevel::Primary => assert!(word.tagged.parent.is_none()),
                _ => {
                    let parent = word.tagged.parent.as_deref().unwrap();
                    assert!(parent.len() > word.word().len());
                }
            }
            assert!(matches!(word.tagged.source_type, SourceType::Row | SourceType::Column));
        }
    }

    #[tokio::test]
    async fn failed_sequence_leaves_the_others_intact() {
        let orchestrator = CycleOrchestrator::builder(OracleConfig::default())
            .dictionary(dictionary(&["CAT", "DOG", "EMU"]))
            .entropy(Arc::new(SeededEntropy::new(6)))
            .build()
            .unwrap();
        let table = orchestrator.dictionary().snapshot();
        let sequences: Vec<Strand> = ["CATX", "DOGX", "EMUX"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();

        let found = orchestrator
            .match_each(&table, sequences, |matcher, table, strand| async move {
                if strand.to_string() == "DOGX" {
                    panic!("matcher blew up");
                }
                matcher.find_all_words(&table, &strand)
            })
            .await;

        assert_eq!(found, vec![vec!["CAT".to_string()], Vec::new(), vec!["EMU".to_string()]]);
    }

    #[test]
    fn ranking_orders_by_score_then_length() {
        let make = |word: &str, score| ScoredWord {
            tagged: TaggedWord::primary(word, SourceType::Strand, 0),
            score,
            samples: 100,
            frequency: 1,
        };
        let mut words = vec![make("AT", 60), make("STAR", 60), make("ZOO", 70), make("ART", 60)];
        rank(&mut words);
        let order: Vec<&str> = words.iter().map(|w| w.word()).collect();
        assert_eq!(order, vec!["ZOO", "STAR", "ART", "AT"]);
    }
}
